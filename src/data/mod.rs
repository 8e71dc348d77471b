// ============================================================
// Layer 4 — Data Pipeline
// ============================================================
// Everything from CSV tables to device-ready tensor batches.
//
// The pipeline flows in this order:
//
//   CSV tables
//       │
//       ▼
//   CsvImageSource    → reads pixel rows, shifts labels to 0-index
//       │
//       ▼
//   Augmentor         → (optional) seeded flips + affine warp
//       │
//       ▼
//   splitter          → stratified train / validation partition
//       │
//       ▼
//   SampleStore       → holds rows, preprocesses on access
//       │
//       ▼
//   BatchSource       → fixed-size (optionally shuffled) traversal
//       │
//       ▼
//   ImageBatcher      → stacks samples into [N, 1, H, W] tensors
//
// Each module is responsible for exactly one step.

/// Reads pixel/label CSV tables
pub mod loader;

/// Seeded whole-batch image augmentation
pub mod augment;

/// Stratified, seeded train/validation split
pub mod splitter;

/// Cast, scale, reshape of a raw pixel row
pub mod preprocessor;

/// In-memory sample store (implements Burn's Dataset trait)
pub mod dataset;

/// Implements Burn's Batcher trait to create tensor batches
pub mod batcher;

/// Batched, restartable traversal of a store
pub mod batch_source;
