// ============================================================
// Layer 5 — ML / Model Layer (Burn)
// ============================================================
// Model, optimizer and training code built on Burn.
//
//   model.rs     — ImageClassifier contract and the CharCnn
//                  architecture: three conv → ReLU → max-pool
//                  blocks, global pooling, optional hidden
//                  layers, linear head
//
//   optim.rs     — zero_gradients / backward / step wrapper
//                  around Burn's Adam
//
//   scheduler.rs — per-epoch learning-rate policies
//
//   trainer.rs   — fit loop: train and valid phases, history,
//                  best-snapshot tracking, early stopping
//
//   evaluator.rs — test-set prediction and accuracy scoring
//
// Reference: Burn Book §3 (Building Blocks)
//            Burn Book §5 (Training)

/// Classifier contract and CNN architecture
pub mod model;

/// Optimizer wrapper and Adam factory
pub mod optim;

/// Learning-rate schedulers
pub mod scheduler;

/// Fit loop with early stopping
pub mod trainer;

/// Prediction and scoring on held-out data
pub mod evaluator;
