// ============================================================
// Layer 2 — Evaluate Use Case
// ============================================================
// Re-scores a finished run without retraining:
//   1. Read train_config.json from the run directory
//   2. Rebuild the model and restore the best weights
//   3. Load the test partition the run was configured with
//   4. Predict in order and report accuracy

use anyhow::Result;
use burn::prelude::Backend;
use std::path::{Path, PathBuf};

use crate::application::train_use_case::TrainConfig;
use crate::data::{batch_source::BatchSource, dataset::SampleStore, preprocessor::Preprocessor};
use crate::domain::{sample::Partition, traits::LabeledImageSource};
use crate::infra::checkpoint::CheckpointManager;
use crate::ml::evaluator::{score, Evaluator};

pub type EvalBackend = burn::backend::Wgpu;

pub struct EvaluateUseCase {
    ckpt:   CheckpointManager,
    config: TrainConfig,
}

impl EvaluateUseCase {
    /// `data_dir` overrides the directory recorded in the run's config.
    pub fn new(run_dir: impl AsRef<Path>, data_dir: Option<PathBuf>) -> Result<Self> {
        let ckpt       = CheckpointManager::new(run_dir)?;
        let mut config = ckpt.load_config()?;
        if let Some(dir) = data_dir {
            config.data_dir = dir;
        }
        // history.json is absent when a run died before scoring
        match ckpt.load_record() {
            Ok(record) => tracing::info!(
                "Run stopped after {} epochs ({:?}); best epoch {}",
                record.history.epochs(),
                record.stop_reason,
                record.best_epoch
            ),
            Err(e) => tracing::debug!("No run record: {e:#}"),
        }
        Ok(Self { ckpt, config })
    }

    pub fn accuracy(&self) -> Result<f64> {
        self.accuracy_on::<EvalBackend>(&Default::default())
    }

    pub fn accuracy_on<B: Backend>(&self, device: &B::Device) -> Result<f64> {
        let model = self.ckpt.load_model::<B>(device)?;
        let test  = self.config.source().load(Partition::Test)?;
        tracing::info!("Evaluating on {} test images", test.len());

        let store = SampleStore::unlabeled(test.images, Preprocessor::new(self.config.image_shape()))?;
        let mut source  = BatchSource::<B>::sequential(store, self.config.batch_size, device.clone())?;
        let predictions = Evaluator::new(model).predict(&mut source)?;
        Ok(score(&predictions, &test.labels)?)
    }
}
