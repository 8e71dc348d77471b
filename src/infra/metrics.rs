// ============================================================
// Layer 6 — Metrics Logger
// ============================================================
// Records training metrics to a CSV file after each epoch.
//
// Metrics recorded per epoch:
//   - epoch:      the epoch number (1, 2, 3, ...)
//   - train_loss: size-weighted cross-entropy on the training set
//   - val_loss:   size-weighted cross-entropy on the validation set
//   - train_acc:  fraction of training samples classified correctly
//   - val_acc:    fraction of validation samples classified correctly
//
// Output file: <output_dir>/metrics.csv
//
// Example CSV output:
//   epoch,train_loss,val_loss,train_acc,val_acc
//   1,3.124500,3.089200,0.123000,0.118000
//   2,2.890100,2.854300,0.184000,0.172000
//
// Each run starts a fresh file; the history of one fit is
// exactly the rows written.
//
// Reference: Rust Book §12 (I/O and File Handling)

use anyhow::{Context, Result};
use std::{
    fs::{self, OpenOptions},
    io::Write,
    path::{Path, PathBuf},
};
use serde::{Deserialize, Serialize};

use crate::ml::trainer::History;

/// One row of metrics data for a single training epoch
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EpochMetrics {
    /// The epoch number (starts at 1)
    pub epoch: usize,

    pub train_loss: f64,

    /// Should track train_loss; divergence indicates overfitting
    pub val_loss: f64,

    /// Range: [0.0, 1.0]
    pub train_acc: f64,

    /// Range: [0.0, 1.0]
    pub val_acc: f64,
}

impl EpochMetrics {
    pub fn new(
        epoch:      usize,
        train_loss: f64,
        val_loss:   f64,
        train_acc:  f64,
        val_acc:    f64,
    ) -> Self {
        Self { epoch, train_loss, val_loss, train_acc, val_acc }
    }

    /// One row per recorded epoch, numbered from 1.
    pub fn from_history(history: &History) -> Vec<Self> {
        history
            .loss
            .iter()
            .zip(&history.accuracy)
            .enumerate()
            .map(|(i, (loss, acc))| Self::new(i + 1, loss.train, loss.valid, acc.train, acc.valid))
            .collect()
    }
}

/// Logs epoch metrics to a CSV file for later analysis.
pub struct MetricsLogger {
    csv_path: PathBuf,
}

impl MetricsLogger {
    /// Create the directory and a fresh CSV with its header row.
    pub fn new(dir: impl AsRef<Path>) -> Result<Self> {
        let dir = dir.as_ref();
        fs::create_dir_all(dir)
            .with_context(|| format!("Cannot create output directory '{}'", dir.display()))?;

        let csv_path = dir.join("metrics.csv");
        let mut f = fs::File::create(&csv_path)
            .with_context(|| format!("Cannot create '{}'", csv_path.display()))?;
        writeln!(f, "epoch,train_loss,val_loss,train_acc,val_acc")?;
        tracing::debug!("Created metrics CSV: '{}'", csv_path.display());

        Ok(Self { csv_path })
    }

    /// Append one epoch's metrics as a new row in the CSV.
    pub fn log(&self, m: &EpochMetrics) -> Result<()> {
        let mut f = OpenOptions::new()
            .append(true)
            .open(&self.csv_path)?;

        writeln!(
            f,
            "{},{:.6},{:.6},{:.6},{:.6}",
            m.epoch,
            m.train_loss,
            m.val_loss,
            m.train_acc,
            m.val_acc,
        )?;

        tracing::debug!(
            "Logged epoch {} metrics: train_loss={:.4}, val_loss={:.4}",
            m.epoch,
            m.train_loss,
            m.val_loss,
        );

        Ok(())
    }

    pub fn log_history(&self, history: &History) -> Result<()> {
        for row in EpochMetrics::from_history(history) {
            self.log(&row)?;
        }
        Ok(())
    }

    pub fn csv_path(&self) -> &Path {
        &self.csv_path
    }
}

// ─── Unit Tests ───────────────────────────────────────────────────────────────
#[cfg(test)]
mod tests {
    use super::*;
    use crate::ml::trainer::PhasePair;

    fn history() -> History {
        History {
            loss: vec![
                PhasePair { train: 2.0, valid: 2.5 },
                PhasePair { train: 1.5, valid: 2.25 },
            ],
            accuracy: vec![
                PhasePair { train: 0.25, valid: 0.125 },
                PhasePair { train: 0.5, valid: 0.375 },
            ],
        }
    }

    #[test]
    fn test_rows_follow_history() {
        let rows = EpochMetrics::from_history(&history());
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[1], EpochMetrics::new(2, 1.5, 2.25, 0.5, 0.375));
    }

    #[test]
    fn test_csv_contents() {
        let dir = tempfile::tempdir().unwrap();
        let logger = MetricsLogger::new(dir.path()).unwrap();
        logger.log_history(&history()).unwrap();

        let text = fs::read_to_string(logger.csv_path()).unwrap();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines[0], "epoch,train_loss,val_loss,train_acc,val_acc");
        assert_eq!(lines[1], "1,2.000000,2.500000,0.250000,0.125000");
        assert_eq!(lines.len(), 3);
    }

    #[test]
    fn test_new_run_truncates_previous_file() {
        let dir = tempfile::tempdir().unwrap();
        MetricsLogger::new(dir.path()).unwrap().log_history(&history()).unwrap();
        let logger = MetricsLogger::new(dir.path()).unwrap();
        let text = fs::read_to_string(logger.csv_path()).unwrap();
        assert_eq!(text.lines().count(), 1);
    }
}
