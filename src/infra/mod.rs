// ============================================================
// Layer 6 — Infrastructure Layer
// ============================================================
// Run artifacts written to the output directory:
//
//   checkpoint.rs — best model weights (Burn CompactRecorder),
//                   model/train configs and the run record as
//                   JSON, plus loading them back for evaluation
//
//   metrics.rs    — per-epoch loss and accuracy as CSV
//
//   graph.rs      — two-panel learning-curve PNG (plotters)
//
// Reference: Rust Book §9 (Error Handling with anyhow)
//            Burn Book §5 (Checkpointing)

/// Model, config and run-record persistence
pub mod checkpoint;

/// Training metrics CSV logger
pub mod metrics;

/// Learning-curve rendering
pub mod graph;
