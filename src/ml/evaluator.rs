// ============================================================
// Layer 5 — Evaluator
// ============================================================
// Runs a trained classifier over a test set and scores it.
//
//   BatchSource (unshuffled) → forward → argmax(1) → Vec<usize>
//
// Predictions come back in the store's order because the test
// source never shuffles; `predict` still checks the count so a
// partial pass can never be scored.
use std::marker::PhantomData;

use burn::prelude::*;

use crate::data::batch_source::BatchSource;
use crate::domain::error::{PipelineError, PipelineResult};
use crate::ml::model::ImageClassifier;

pub struct Evaluator<B: Backend, M: ImageClassifier<B>> {
    model:   M,
    _marker: PhantomData<B>,
}

impl<B: Backend, M: ImageClassifier<B>> Evaluator<B, M> {
    pub fn new(model: M) -> Self {
        Self { model, _marker: PhantomData }
    }

    /// Predicted class per sample, in dataset order.
    pub fn predict(&self, source: &mut BatchSource<B>) -> PipelineResult<Vec<usize>> {
        let expected        = source.sample_count();
        let mut predictions = Vec::with_capacity(expected);

        for batch in source.iter() {
            let batch  = batch?;
            let logits = self.model.forward(batch.images);
            predictions.extend(
                logits
                    .argmax(1)
                    .flatten::<1>(0, 1)
                    .into_data()
                    .iter::<i64>()
                    .map(|class| class as usize),
            );
        }

        if predictions.len() != expected {
            return Err(PipelineError::data_shape(format!(
                "produced {} predictions for {expected} samples",
                predictions.len()
            )));
        }
        tracing::debug!("Predicted {} samples", predictions.len());
        Ok(predictions)
    }
}

/// Fraction of positions where prediction and truth agree.
///
/// Empty input scores 0.0.
pub fn score(predictions: &[usize], labels: &[usize]) -> PipelineResult<f64> {
    if predictions.len() != labels.len() {
        return Err(PipelineError::ScoringShape {
            predictions: predictions.len(),
            labels:      labels.len(),
        });
    }
    if predictions.is_empty() {
        return Ok(0.0);
    }
    let hits = predictions.iter().zip(labels).filter(|(p, t)| p == t).count();
    Ok(hits as f64 / predictions.len() as f64)
}
