// ============================================================
// Layer 6 — Checkpoint Manager
// ============================================================
// Persists everything a finished run produced.
//
// What gets saved per run:
//   1. best_model.mpk       — weights of the best validation epoch
//   2. model_config.json    — CharCnnConfig needed to rebuild it
//   3. train_config.json    — the effective TrainConfig
//   4. history.json         — per-epoch history + stop summary
//
// File layout:
//   artifacts/
//     best_model.mpk
//     model_config.json
//     train_config.json
//     history.json
//     metrics.csv           ← written by MetricsLogger
//     Graphs.png            ← written by graph::save_history_graph
//
// Loading rebuilds the model from model_config.json before the
// weights are restored; a mismatched architecture fails in Burn.
//
// Reference: Burn Book §5 (Records and Checkpointing)

use anyhow::{Context, Result};
use std::{
    fs,
    path::{Path, PathBuf},
};
use burn::{
    prelude::*,
    record::{CompactRecorder, Recorder},
};
use serde::{Deserialize, Serialize};

use crate::application::train_use_case::TrainConfig;
use crate::ml::model::{CharCnn, CharCnnConfig};
use crate::ml::trainer::{History, StopReason};

const MODEL_FILE:        &str = "best_model";
const MODEL_CONFIG_FILE: &str = "model_config.json";
const TRAIN_CONFIG_FILE: &str = "train_config.json";
const HISTORY_FILE:      &str = "history.json";

/// Summary written next to the per-epoch metrics.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunRecord {
    pub history:         History,
    pub best_epoch:      usize,
    pub best_valid_loss: f64,
    pub stop_reason:     StopReason,
    pub test_accuracy:   Option<f64>,
}

pub struct CheckpointManager {
    dir: PathBuf,
}

impl CheckpointManager {
    pub fn new(dir: impl AsRef<Path>) -> Result<Self> {
        let dir = dir.as_ref().to_path_buf();
        fs::create_dir_all(&dir)
            .with_context(|| format!("Cannot create output directory '{}'", dir.display()))?;
        Ok(Self { dir })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Save the best model's weights and its architecture config.
    pub fn save_model<B: Backend>(&self, model: &CharCnn<B>, config: &CharCnnConfig) -> Result<()> {
        let path = self.dir.join(MODEL_FILE);

        CompactRecorder::new()
            .record(model.clone().into_record(), path.clone())
            .with_context(|| format!("Failed to save model to '{}'", path.display()))?;

        let config_path = self.dir.join(MODEL_CONFIG_FILE);
        config
            .save(&config_path)
            .with_context(|| format!("Cannot write '{}'", config_path.display()))?;

        tracing::debug!("Saved best model to '{}'", path.display());
        Ok(())
    }

    /// Rebuild the saved architecture and restore its weights.
    pub fn load_model<B: Backend>(&self, device: &B::Device) -> Result<CharCnn<B>> {
        let config_path = self.dir.join(MODEL_CONFIG_FILE);
        let config = CharCnnConfig::load(&config_path).map_err(|e| {
            anyhow::anyhow!(
                "Cannot read '{}': {e}. Have you run 'train' first?",
                config_path.display()
            )
        })?;

        let path   = self.dir.join(MODEL_FILE);
        let record = CompactRecorder::new()
            .load(path.clone(), device)
            .with_context(|| format!("Cannot load model '{}'", path.display()))?;

        tracing::info!("Loaded model from '{}'", path.display());
        Ok(config.init::<B>(device).load_record(record))
    }

    pub fn save_config(&self, cfg: &TrainConfig) -> Result<()> {
        self.write_json(TRAIN_CONFIG_FILE, cfg)
    }

    pub fn load_config(&self) -> Result<TrainConfig> {
        self.read_json(TRAIN_CONFIG_FILE)
    }

    pub fn save_record(&self, record: &RunRecord) -> Result<()> {
        self.write_json(HISTORY_FILE, record)
    }

    pub fn load_record(&self) -> Result<RunRecord> {
        self.read_json(HISTORY_FILE)
    }

    fn write_json<T: Serialize>(&self, name: &str, value: &T) -> Result<()> {
        let path = self.dir.join(name);
        let json = serde_json::to_string_pretty(value)?;
        fs::write(&path, json).with_context(|| format!("Cannot write '{}'", path.display()))?;
        tracing::debug!("Wrote '{}'", path.display());
        Ok(())
    }

    fn read_json<T: for<'de> Deserialize<'de>>(&self, name: &str) -> Result<T> {
        let path = self.dir.join(name);
        let json = fs::read_to_string(&path)
            .with_context(|| format!("Cannot read '{}'. Have you run 'train' first?", path.display()))?;
        serde_json::from_str(&json).with_context(|| format!("Malformed '{}'", path.display()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ml::model::ImageClassifier;
    use crate::ml::trainer::PhasePair;
    use burn::backend::NdArray;

    type TestBackend = NdArray;

    #[test]
    fn test_config_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let ckpt = CheckpointManager::new(dir.path()).unwrap();
        let cfg = TrainConfig { epochs: 3, batch_size: 16, ..TrainConfig::default() };
        ckpt.save_config(&cfg).unwrap();
        assert_eq!(ckpt.load_config().unwrap(), cfg);
    }

    #[test]
    fn test_record_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let ckpt = CheckpointManager::new(dir.path()).unwrap();
        let record = RunRecord {
            history: History {
                loss:     vec![PhasePair { train: 1.0, valid: 0.5 }],
                accuracy: vec![PhasePair { train: 0.5, valid: 0.75 }],
            },
            best_epoch:      1,
            best_valid_loss: 0.5,
            stop_reason:     StopReason::MaxEpochs,
            test_accuracy:   Some(0.8),
        };
        ckpt.save_record(&record).unwrap();
        assert_eq!(ckpt.load_record().unwrap(), record);
    }

    #[test]
    fn test_model_round_trip_gives_same_logits() {
        let dir = tempfile::tempdir().unwrap();
        let ckpt = CheckpointManager::new(dir.path()).unwrap();
        let device = Default::default();

        let config = CharCnnConfig::new(3).with_channels([2, 2, 2]).with_hidden_layers(vec![4]);
        let model: CharCnn<TestBackend> = config.init(&device);
        ckpt.save_model(&model, &config).unwrap();
        let loaded: CharCnn<TestBackend> = ckpt.load_model(&device).unwrap();

        let input = || Tensor::<TestBackend, 4>::ones([1, 1, 8, 8], &device);
        let a: Vec<f32> = model.forward(input()).into_data().iter::<f32>().collect();
        let b: Vec<f32> = loaded.forward(input()).into_data().iter::<f32>().collect();
        for (x, y) in a.iter().zip(&b) {
            assert!((x - y).abs() < 1e-2, "{x} vs {y}");
        }
    }

    #[test]
    fn test_missing_files_report_context() {
        let dir = tempfile::tempdir().unwrap();
        let ckpt = CheckpointManager::new(dir.path()).unwrap();
        let err = ckpt.load_config().unwrap_err();
        assert!(err.to_string().contains("train_config.json"));
        assert!(ckpt.load_model::<TestBackend>(&Default::default()).is_err());
    }
}
