// ============================================================
// Layer 3 — Domain Layer
// ============================================================
// Plain Rust structs, enums and traits describing the
// problem: images, labels, partitions and failures.
//
// Rules for this layer:
//   - NO Burn framework types allowed here
//   - NO file I/O
//   - Only plain Rust structs, enums, and traits

// Failure taxonomy shared by every layer
pub mod error;

// Raw and transformed image samples
pub mod sample;

// Core abstractions (traits) that other layers implement
pub mod traits;
