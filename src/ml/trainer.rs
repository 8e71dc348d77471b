// ============================================================
// Layer 5 — Training Loop
// ============================================================
// Epoch loop with best-model tracking and early stopping.
//
//   RUNNING(epoch) ─ train phase ─ valid phase ─┬─ IMPROVED ─┐
//                                               └─ STALLED ──┤
//        ▲                                                   │
//        └──────── epoch += 1 ◄── not done ◄─────────────────┤
//                                                            ▼
//                         stalls >= patience or epoch == max → DONE
//
// `fit` drives anything implementing `EpochLearner`;
// `ClassifierLearner` is the Burn implementation:
//   - training uses the Autodiff backend for gradients
//   - model.valid() gives the inner backend model for validation,
//     so no gradients are tracked there
//   - argmax(1) returns [batch, 1] so we flatten before .equal()
//
// Reference: Burn Book §5, Kingma & Ba (2015) Adam

use burn::{
    module::AutodiffModule,
    nn::loss::CrossEntropyLossConfig,
    optim::Optimizer,
    prelude::*,
    tensor::backend::AutodiffBackend,
};
use serde::{Deserialize, Serialize};

use crate::data::batch_source::BatchSource;
use crate::domain::error::{PipelineError, PipelineResult};
use crate::ml::model::ImageClassifier;
use crate::ml::optim::ModelOptimizer;
use crate::ml::scheduler::LrScheduler;

// ─── Metrics and History ─────────────────────────────────────────────────────

/// Size-weighted mean loss and accuracy over one phase.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PhaseMetrics {
    pub loss:     f64,
    pub accuracy: f64,
}

/// Running sums for one phase; every batch counts by its size.
#[derive(Debug, Default)]
pub struct MetricAccumulator {
    loss_sum: f64,
    correct:  usize,
    seen:     usize,
}

impl MetricAccumulator {
    pub fn add(&mut self, batch_loss: f64, correct: usize, batch_size: usize) {
        self.loss_sum += batch_loss * batch_size as f64;
        self.correct  += correct;
        self.seen     += batch_size;
    }

    pub fn finish(self) -> PhaseMetrics {
        if self.seen == 0 {
            return PhaseMetrics { loss: f64::NAN, accuracy: 0.0 };
        }
        PhaseMetrics {
            loss:     self.loss_sum / self.seen as f64,
            accuracy: self.correct as f64 / self.seen as f64,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PhasePair {
    pub train: f64,
    pub valid: f64,
}

/// Per-epoch loss and accuracy, one entry per completed epoch.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct History {
    pub loss:     Vec<PhasePair>,
    pub accuracy: Vec<PhasePair>,
}

impl History {
    fn push(&mut self, train: PhaseMetrics, valid: PhaseMetrics) {
        self.loss.push(PhasePair { train: train.loss, valid: valid.loss });
        self.accuracy.push(PhasePair { train: train.accuracy, valid: valid.accuracy });
    }

    pub fn epochs(&self) -> usize {
        self.loss.len()
    }
}

// ─── Training State Machine ──────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EpochOutcome {
    Improved,
    Stalled,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum StopReason {
    EarlyStopping,
    MaxEpochs,
}

#[derive(Debug, Clone, PartialEq)]
pub struct FitConfig {
    pub epochs:                  usize,
    pub early_stopping_patience: usize,
    pub verbose:                 bool,
}

impl FitConfig {
    pub fn validate(&self) -> PipelineResult<()> {
        if self.epochs == 0 {
            return Err(PipelineError::config("epochs must be positive"));
        }
        if self.early_stopping_patience == 0 {
            return Err(PipelineError::config("early stopping patience must be positive"));
        }
        Ok(())
    }
}

/// Mutable state of one `fit` call.
#[derive(Debug, Clone)]
pub struct TrainingState<S> {
    pub epoch:                      usize,
    pub best_valid_loss:            f64,
    pub best_params:                Option<S>,
    pub best_epoch:                 usize,
    pub epochs_without_improvement: usize,
}

impl<S> TrainingState<S> {
    pub fn new() -> Self {
        Self {
            epoch:                      1,
            best_valid_loss:            f64::INFINITY,
            best_params:                None,
            best_epoch:                 0,
            epochs_without_improvement: 0,
        }
    }

    /// Record this epoch's validation loss. `snapshot` is only called on
    /// strict improvement.
    pub fn observe(&mut self, valid_loss: f64, snapshot: impl FnOnce() -> S) -> EpochOutcome {
        if valid_loss < self.best_valid_loss {
            self.best_valid_loss            = valid_loss;
            self.best_params                = Some(snapshot());
            self.best_epoch                 = self.epoch;
            self.epochs_without_improvement = 0;
            EpochOutcome::Improved
        } else {
            self.epochs_without_improvement += 1;
            EpochOutcome::Stalled
        }
    }

    pub fn stop_reason(&self, config: &FitConfig) -> Option<StopReason> {
        if self.epochs_without_improvement >= config.early_stopping_patience {
            Some(StopReason::EarlyStopping)
        } else if self.epoch >= config.epochs {
            Some(StopReason::MaxEpochs)
        } else {
            None
        }
    }
}

impl<S> Default for TrainingState<S> {
    fn default() -> Self {
        Self::new()
    }
}

// ─── Fit Loop ─────────────────────────────────────────────────────────────────

/// One epoch's worth of work, split into the two phases the loop needs.
pub trait EpochLearner {
    type Snapshot;

    fn train_epoch(&mut self) -> PipelineResult<PhaseMetrics>;
    fn valid_epoch(&mut self) -> PipelineResult<PhaseMetrics>;
    /// Independent copy of the current parameters.
    fn snapshot(&self) -> Self::Snapshot;
    fn learning_rate(&self) -> f64;
    fn set_learning_rate(&mut self, lr: f64);
}

#[derive(Debug, Clone)]
pub struct FitOutcome<S> {
    pub history:         History,
    pub best_params:     S,
    pub best_epoch:      usize,
    pub best_valid_loss: f64,
    pub stop_reason:     StopReason,
}

pub fn fit<L: EpochLearner>(
    learner:       &mut L,
    config:        &FitConfig,
    mut scheduler: Option<&mut dyn LrScheduler>,
) -> PipelineResult<FitOutcome<L::Snapshot>> {
    config.validate()?;

    let mut state   = TrainingState::new();
    let mut history = History::default();

    let stop_reason = loop {
        // ── Train + validation phases ────────────────────────────────────────
        let train = learner.train_epoch()?;
        let valid = learner.valid_epoch()?;
        history.push(train, valid);

        // ── Scheduler ────────────────────────────────────────────────────────
        if let Some(s) = scheduler.as_deref_mut() {
            let lr = s.step(state.epoch, learner.learning_rate(), valid.loss);
            learner.set_learning_rate(lr);
        }

        // ── Improvement check ────────────────────────────────────────────────
        let outcome = state.observe(valid.loss, || learner.snapshot());

        if config.verbose {
            println!(
                "Epoch {:>3}/{} | train_loss={:.4} | val_loss={:.4} | train_acc={:.1}% | val_acc={:.1}%{}",
                state.epoch,
                config.epochs,
                train.loss,
                valid.loss,
                train.accuracy * 100.0,
                valid.accuracy * 100.0,
                if outcome == EpochOutcome::Improved { " | best" } else { "" },
            );
        }
        tracing::debug!(
            "epoch {} {:?}, best {:.6} at epoch {}, stalls {}",
            state.epoch,
            outcome,
            state.best_valid_loss,
            state.best_epoch,
            state.epochs_without_improvement,
        );

        // ── Termination check ────────────────────────────────────────────────
        if let Some(reason) = state.stop_reason(config) {
            break reason;
        }
        state.epoch += 1;
    };

    if stop_reason == StopReason::EarlyStopping {
        tracing::info!(
            "Early stopping at epoch {}: no improvement for {} epochs",
            state.epoch,
            state.epochs_without_improvement
        );
    }

    // Never improved (every validation loss was NaN): keep the final weights.
    let best_params = match state.best_params {
        Some(p) => p,
        None => {
            tracing::warn!("Validation loss never improved; keeping final parameters");
            state.best_epoch = state.epoch;
            learner.snapshot()
        }
    };

    Ok(FitOutcome {
        history,
        best_params,
        best_epoch: state.best_epoch,
        best_valid_loss: state.best_valid_loss,
        stop_reason,
    })
}

// ─── Burn Learner ─────────────────────────────────────────────────────────────

/// Number of rows whose argmax matches the label.
pub fn count_correct<B: Backend>(logits: Tensor<B, 2>, labels: Tensor<B, 1, Int>) -> usize {
    let correct: i64 = logits
        .argmax(1)
        .flatten::<1>(0, 1)
        .equal(labels)
        .int()
        .sum()
        .into_scalar()
        .elem::<i64>();
    correct as usize
}

/// Trains a Burn model on the Autodiff backend, validates on its inner backend.
pub struct ClassifierLearner<B, M, O>
where
    B: AutodiffBackend,
    M: AutodiffModule<B>,
    O: Optimizer<M, B>,
{
    model: M,
    optim: ModelOptimizer<M, B, O>,
    train: BatchSource<B>,
    valid: BatchSource<B::InnerBackend>,
}

impl<B, M, O> ClassifierLearner<B, M, O>
where
    B: AutodiffBackend,
    M: AutodiffModule<B> + ImageClassifier<B>,
    M::InnerModule: ImageClassifier<B::InnerBackend>,
    O: Optimizer<M, B>,
{
    pub fn new(
        model: M,
        optim: ModelOptimizer<M, B, O>,
        train: BatchSource<B>,
        valid: BatchSource<B::InnerBackend>,
    ) -> PipelineResult<Self> {
        if train.sample_count() == 0 || valid.sample_count() == 0 {
            return Err(PipelineError::data_shape(format!(
                "train and valid sets must be non-empty (got {} / {})",
                train.sample_count(),
                valid.sample_count()
            )));
        }
        tracing::debug!(
            "{} train batches, {} valid batches per epoch",
            train.num_batches(),
            valid.num_batches()
        );
        Ok(Self { model, optim, train, valid })
    }
}

impl<B, M, O> EpochLearner for ClassifierLearner<B, M, O>
where
    B: AutodiffBackend,
    M: AutodiffModule<B> + ImageClassifier<B>,
    M::InnerModule: ImageClassifier<B::InnerBackend>,
    O: Optimizer<M, B>,
{
    type Snapshot = M;

    fn train_epoch(&mut self) -> PipelineResult<PhaseMetrics> {
        let mut model = self.model.clone();
        let mut acc   = MetricAccumulator::default();

        for batch in self.train.iter() {
            let batch  = batch?;
            let size   = batch.size();
            let labels = batch
                .labels
                .ok_or_else(|| PipelineError::data_shape("training batch has no labels"))?;

            let logits = model.forward(batch.images);
            let ce     = CrossEntropyLossConfig::new().init(&logits.device());
            let loss   = ce.forward(logits.clone(), labels.clone());

            let loss_val: f64 = loss.clone().into_scalar().elem::<f64>();
            let correct       = count_correct(logits, labels);

            // Backward pass + Adam update
            self.optim.zero_gradients();
            self.optim.backward(loss, &model);
            model = self.optim.step(model);

            acc.add(loss_val, correct, size);
        }

        self.model = model;
        Ok(acc.finish())
    }

    fn valid_epoch(&mut self) -> PipelineResult<PhaseMetrics> {
        // model.valid() → inner backend, no autodiff graph
        let model   = self.model.valid();
        let mut acc = MetricAccumulator::default();

        for batch in self.valid.iter() {
            let batch  = batch?;
            let size   = batch.size();
            let labels = batch
                .labels
                .ok_or_else(|| PipelineError::data_shape("validation batch has no labels"))?;

            let logits = model.forward(batch.images);
            let ce     = CrossEntropyLossConfig::new().init(&logits.device());
            let loss: f64 = ce
                .forward(logits.clone(), labels.clone())
                .into_scalar()
                .elem::<f64>();

            acc.add(loss, count_correct(logits, labels), size);
        }

        Ok(acc.finish())
    }

    fn snapshot(&self) -> M {
        self.model.clone()
    }

    fn learning_rate(&self) -> f64 {
        self.optim.learning_rate()
    }

    fn set_learning_rate(&mut self, lr: f64) {
        self.optim.set_learning_rate(lr);
    }
}
