// ============================================================
// Layer 2 — TrainUseCase
// ============================================================
// Orchestrates the full training pipeline in order:
//
//   Step 1: Validate configuration      (no I/O before this)
//   Step 2: Load the train partition    (Layer 4 - data)
//   Step 3: Augment the pool (optional) (Layer 4 - data)
//   Step 4: Stratified train/val split  (Layer 4 - data)
//   Step 5: Build stores and sources    (Layer 4 - data)
//   Step 6: Build model and optimizer   (Layer 5 - ml)
//   Step 7: Fit with early stopping     (Layer 5 - ml)
//   Step 8: Save artifacts              (Layer 6 - infra)
//   Step 9: Score the best model on the test partition
//
// The pipeline is generic over the Burn backend; the CLI runs
// it on Wgpu, tests run it on NdArray.
//
// Reference: Burn Book §5 (Training)

use anyhow::{Context, Result};
use burn::{module::AutodiffModule, tensor::backend::AutodiffBackend};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::data::{
    augment::Augmentor,
    batch_source::BatchSource,
    dataset::SampleStore,
    loader::CsvImageSource,
    preprocessor::Preprocessor,
    splitter::{self, DEFAULT_VALID_FRACTION},
};
use crate::domain::{
    error::{PipelineError, PipelineResult},
    sample::{DataVariant, ImageShape, Mode, Partition},
    traits::{ImageAugment, LabeledImageSource},
};
use crate::infra::{
    checkpoint::{CheckpointManager, RunRecord},
    graph::save_history_graph,
    metrics::MetricsLogger,
};
use crate::ml::{
    evaluator::{score, Evaluator},
    model::CharCnnConfig,
    optim::adam,
    scheduler::{ConstantLr, LrScheduler, StepDecay},
    trainer::{fit, ClassifierLearner, FitConfig, StopReason},
};

pub type TrainBackend = burn::backend::Autodiff<burn::backend::Wgpu>;

// ─── Training Configuration ──────────────────────────────────────────────────
// All settings for one run. Serialisable so the effective
// configuration is stored next to the artifacts.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrainConfig {
    pub data_dir:                PathBuf,
    pub output_dir:              PathBuf,
    pub data_source_variant:     DataVariant,
    pub has_header:              bool,
    pub image_height:            usize,
    pub image_width:             usize,
    pub hidden_layer_sizes:      Vec<usize>,
    pub conv_filter_sizes:       Vec<usize>,
    pub conv_channels:           Vec<usize>,
    pub epochs:                  usize,
    pub learning_rate:           f64,
    pub weight_decay:            f64,
    pub batch_size:              usize,
    pub early_stopping_patience: usize,
    pub augment:                 bool,
    pub seed:                    u64,
    pub valid_fraction:          f64,
    /// Decay the learning rate every `lr_step` epochs; `None` keeps it constant.
    pub lr_step:                 Option<usize>,
    pub lr_gamma:                f64,
    pub verbose:                 bool,
}

impl Default for TrainConfig {
    fn default() -> Self {
        Self {
            data_dir:                PathBuf::from("data"),
            output_dir:              PathBuf::from("artifacts"),
            data_source_variant:     DataVariant::Primary,
            has_header:              true,
            image_height:            32,
            image_width:             32,
            hidden_layer_sizes:      Vec::new(),
            conv_filter_sizes:       vec![4, 4, 4],
            conv_channels:           vec![32, 64, 128],
            epochs:                  10,
            learning_rate:           1e-3,
            weight_decay:            0.0,
            batch_size:              64,
            early_stopping_patience: 5,
            augment:                 false,
            seed:                    42,
            valid_fraction:          DEFAULT_VALID_FRACTION,
            lr_step:                 None,
            lr_gamma:                0.1,
            verbose:                 true,
        }
    }
}

impl TrainConfig {
    /// Reject invalid settings before any data is read.
    pub fn validate(&self) -> PipelineResult<()> {
        if self.epochs == 0 {
            return Err(PipelineError::config("epochs must be positive"));
        }
        if self.batch_size == 0 {
            return Err(PipelineError::config("batch size must be positive"));
        }
        if self.early_stopping_patience == 0 {
            return Err(PipelineError::config("early stopping patience must be positive"));
        }
        if !(self.learning_rate > 0.0) {
            return Err(PipelineError::config("learning rate must be positive"));
        }
        if !(self.weight_decay >= 0.0) {
            return Err(PipelineError::config("weight decay must be non-negative"));
        }
        if !(0.0..=1.0).contains(&self.valid_fraction) {
            return Err(PipelineError::config("validation fraction must lie in [0, 1]"));
        }
        if self.image_height == 0 || self.image_width == 0 {
            return Err(PipelineError::config("image dimensions must be positive"));
        }
        if self.lr_step == Some(0) || !(self.lr_gamma > 0.0) {
            return Err(PipelineError::config("lr step must be positive and lr gamma > 0"));
        }
        self.model_config(1).map(|_| ())
    }

    pub fn image_shape(&self) -> ImageShape {
        ImageShape::new(self.image_height, self.image_width)
    }

    /// Architecture for `num_classes` outputs. Filter and channel lists must
    /// hold exactly three entries.
    pub fn model_config(&self, num_classes: usize) -> PipelineResult<CharCnnConfig> {
        let [f1, f2, f3] = self.conv_filter_sizes[..] else {
            return Err(PipelineError::config(format!(
                "expected 3 conv filter sizes, got {}",
                self.conv_filter_sizes.len()
            )));
        };
        let [c1, c2, c3] = self.conv_channels[..] else {
            return Err(PipelineError::config(format!(
                "expected 3 conv channel widths, got {}",
                self.conv_channels.len()
            )));
        };
        let cfg = CharCnnConfig::new(num_classes)
            .with_filter_sizes([f1, f2, f3])
            .with_channels([c1, c2, c3])
            .with_hidden_layers(self.hidden_layer_sizes.clone());
        cfg.validate()?;
        Ok(cfg)
    }

    pub fn source(&self) -> CsvImageSource {
        CsvImageSource::new(&self.data_dir, self.data_source_variant, self.image_shape())
            .has_header(self.has_header)
    }
}

/// What a finished run reports back to the caller.
#[derive(Debug, Clone, PartialEq)]
pub struct TrainReport {
    pub epochs_run:      usize,
    pub best_epoch:      usize,
    pub best_valid_loss: f64,
    pub stop_reason:     StopReason,
    pub test_accuracy:   f64,
}

// ─── TrainUseCase ─────────────────────────────────────────────────────────────
pub struct TrainUseCase {
    config: TrainConfig,
}

impl TrainUseCase {
    pub fn new(config: TrainConfig) -> Self {
        Self { config }
    }

    /// Run on the default GPU device.
    pub fn execute(&self) -> Result<TrainReport> {
        self.execute_on::<TrainBackend>(&Default::default())
    }

    /// Execute the full training pipeline end to end on backend `B`.
    pub fn execute_on<B: AutodiffBackend>(&self, device: &B::Device) -> Result<TrainReport> {
        let cfg = &self.config;

        // ── Step 1: Validate before touching disk ────────────────────────────
        cfg.validate()?;
        let shape = cfg.image_shape();

        // ── Step 2: Load the training partition ──────────────────────────────
        let source = cfg.source();
        let raw    = source.load(Partition::Train)?;
        if raw.is_empty() {
            return Err(PipelineError::data_shape("training partition is empty").into());
        }
        let num_classes = raw.num_classes();
        tracing::info!("Loaded {} training images, {} classes", raw.len(), num_classes);

        // ── Step 3: Augmentation replaces the pool ───────────────────────────
        let images = if cfg.augment {
            tracing::info!("Augmenting training pool (seed {})", cfg.seed);
            Augmentor::new(cfg.seed).augment(&raw.images, raw.shape)
        } else {
            raw.images
        };

        // ── Step 4: Stratified split ─────────────────────────────────────────
        let split = splitter::split(&images, &raw.labels, cfg.valid_fraction, cfg.seed)?;
        tracing::info!(
            "Split: {} train, {} validation",
            split.train_images.len(),
            split.valid_images.len()
        );

        // ── Step 5: Stores and batch sources ─────────────────────────────────
        let preprocessor = Preprocessor::new(shape);
        let train_store  = SampleStore::new(split.train_images, Some(split.train_labels), preprocessor.clone(), Mode::Train)?;
        let valid_store  = SampleStore::new(split.valid_images, Some(split.valid_labels), preprocessor.clone(), Mode::Valid)?;

        let train_source = BatchSource::<B>::shuffled(train_store, cfg.batch_size, device.clone(), cfg.seed)?;
        let valid_source = BatchSource::<B::InnerBackend>::sequential(valid_store, cfg.batch_size, device.clone())?;

        // ── Step 6: Model and optimizer ──────────────────────────────────────
        let model_cfg = cfg.model_config(num_classes)?;
        let model     = model_cfg.init::<B>(device);
        let optim     = adam(cfg.learning_rate, cfg.weight_decay);
        let mut learner = ClassifierLearner::new(model, optim, train_source, valid_source)?;

        // ── Step 7: Fit ──────────────────────────────────────────────────────
        let fit_cfg = FitConfig {
            epochs:                  cfg.epochs,
            early_stopping_patience: cfg.early_stopping_patience,
            verbose:                 cfg.verbose,
        };
        let mut scheduler: Box<dyn LrScheduler> = match cfg.lr_step {
            Some(step) => Box::new(StepDecay::new(step, cfg.lr_gamma)),
            None       => Box::new(ConstantLr),
        };
        let outcome = fit(&mut learner, &fit_cfg, Some(scheduler.as_mut()))?;
        tracing::info!(
            "Training finished after {} epochs ({:?}); best val_loss {:.4} at epoch {}",
            outcome.history.epochs(),
            outcome.stop_reason,
            outcome.best_valid_loss,
            outcome.best_epoch
        );

        // ── Step 8: Artifacts ────────────────────────────────────────────────
        let best = outcome.best_params.valid();
        let ckpt = CheckpointManager::new(&cfg.output_dir)?;
        ckpt.save_config(cfg)?;
        ckpt.save_model(&best, &model_cfg)?;
        let metrics = MetricsLogger::new(&cfg.output_dir)?;
        metrics.log_history(&outcome.history)?;
        tracing::info!("Metrics written to {}", metrics.csv_path().display());
        save_history_graph(&outcome.history, ckpt.dir())?;

        // ── Step 9: Test-set accuracy with the best snapshot ─────────────────
        let test = source.load(Partition::Test).context("Cannot load test partition")?;
        let test_store  = SampleStore::unlabeled(test.images, preprocessor)?;
        let mut tests   = BatchSource::<B::InnerBackend>::sequential(test_store, cfg.batch_size, device.clone())?;
        let predictions = Evaluator::new(best).predict(&mut tests)?;
        let accuracy    = score(&predictions, &test.labels)?;

        ckpt.save_record(&RunRecord {
            history:         outcome.history.clone(),
            best_epoch:      outcome.best_epoch,
            best_valid_loss: outcome.best_valid_loss,
            stop_reason:     outcome.stop_reason,
            test_accuracy:   Some(accuracy),
        })?;

        Ok(TrainReport {
            epochs_run:      outcome.history.epochs(),
            best_epoch:      outcome.best_epoch,
            best_valid_loss: outcome.best_valid_loss,
            stop_reason:     outcome.stop_reason,
            test_accuracy:   accuracy,
        })
    }
}
