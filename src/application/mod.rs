// ============================================================
// Layer 2 — Application / Use Cases
// ============================================================
// Orchestrates the other layers to accomplish one goal each.
//
// Rules for this layer:
//   - No ML math or model code here
//   - No printing here (that's Layer 1)
//   - Only workflow coordination
//
// Reference: Clean Architecture pattern

// Load, split, fit, save artifacts, score the test set
pub mod train_use_case;

// Re-score a saved run on the test partition
pub mod evaluate_use_case;
