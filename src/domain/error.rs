// ============================================================
// Layer 3 — Pipeline Error Taxonomy
// ============================================================
// Every failure the training core can raise. All of them are
// fatal: callers propagate them with `?` and never retry.
//
//   DataShape       — row-count mismatch, wrong pixel count,
//                     bad label values, empty split
//   Configuration   — invalid hyperparameters, caught before
//                     any data is read or model is built
//   IndexOutOfRange — a store or batch source indexed past its end
//   ScoringShape    — predictions and labels of different length

use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum PipelineError {
    #[error("data shape error: {0}")]
    DataShape(String),

    #[error("configuration error: {0}")]
    Configuration(String),

    #[error("index {index} out of range for store of length {len}")]
    IndexOutOfRange { index: usize, len: usize },

    #[error("scoring shape mismatch: {predictions} predictions vs {labels} labels")]
    ScoringShape { predictions: usize, labels: usize },
}

impl PipelineError {
    pub fn data_shape(msg: impl Into<String>) -> Self {
        Self::DataShape(msg.into())
    }

    pub fn config(msg: impl Into<String>) -> Self {
        Self::Configuration(msg.into())
    }
}

pub type PipelineResult<T> = std::result::Result<T, PipelineError>;
