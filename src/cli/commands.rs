// ============================================================
// Layer 1 — CLI Commands and Arguments
// ============================================================
// Defines the two subcommands, `train` and `evaluate`, and
// all their configurable flags. Short flag names (--hl, --fs,
// --bs, --wd, --early) are kept for compatibility with
// existing run scripts.
//
// Reference: Rust Book §12 (Building a CLI Program)

use clap::{Args, Subcommand, ValueEnum};
use std::path::PathBuf;

use crate::application::train_use_case::TrainConfig;
use crate::domain::{
    error::{PipelineError, PipelineResult},
    sample::DataVariant,
};

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Train the character CNN, save artifacts and report test accuracy
    Train(TrainArgs),

    /// Score the best model of a finished run on the test partition
    Evaluate(EvaluateArgs),
}

#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum VariantArg {
    /// Train Images.csv / Train Labels.csv / Test Images.csv / Test Labels.csv
    Primary,
    /// csvTrainImages 13440x1024.csv and friends
    Alternate,
}

impl From<VariantArg> for DataVariant {
    fn from(v: VariantArg) -> Self {
        match v {
            VariantArg::Primary   => DataVariant::Primary,
            VariantArg::Alternate => DataVariant::Alternate,
        }
    }
}

#[derive(Args, Debug)]
pub struct TrainArgs {
    /// Directory holding the CSV tables
    #[arg(long, default_value = "data")]
    pub data_dir: PathBuf,

    /// Directory for model, metrics, graphs and run record
    #[arg(long, default_value = "artifacts")]
    pub output_dir: PathBuf,

    /// Hidden layers as a count followed by sizes: `--hl 1 256` or `--hl 2 256 128`
    #[arg(long = "hl", num_args = 2..=3, value_name = "N SIZES")]
    pub hidden_layers: Option<Vec<usize>>,

    /// Kernel size of each of the three conv blocks
    #[arg(long = "fs", num_args = 3, default_values_t = [4, 4, 4])]
    pub filter_sizes: Vec<usize>,

    /// Output channels of each of the three conv blocks
    #[arg(long, num_args = 3, default_values_t = [32, 64, 128])]
    pub channels: Vec<usize>,

    #[arg(long, default_value_t = 10)]
    pub epochs: usize,

    /// Adam learning rate
    #[arg(long, default_value_t = 1e-3)]
    pub lr: f64,

    /// Adam weight decay
    #[arg(long = "wd", default_value_t = 0.0)]
    pub weight_decay: f64,

    #[arg(long = "bs", default_value_t = 64)]
    pub batch_size: usize,

    /// Epochs without validation improvement before stopping
    #[arg(long = "early", default_value_t = 5)]
    pub early_stopping: usize,

    /// Replace the training pool with a seeded augmented copy
    #[arg(long)]
    pub augment: bool,

    #[arg(long, value_enum, default_value_t = VariantArg::Primary)]
    pub variant: VariantArg,

    /// Shorthand for `--variant alternate`
    #[arg(long, conflicts_with = "variant")]
    pub kaggle: bool,

    /// The CSV tables have no header row
    #[arg(long)]
    pub no_header: bool,

    #[arg(long, default_value_t = 42)]
    pub seed: u64,

    /// Fraction of the training pool held out for validation
    #[arg(long, default_value_t = 0.2)]
    pub valid_fraction: f64,

    /// Image height in pixels
    #[arg(long, default_value_t = 32)]
    pub height: usize,

    /// Image width in pixels
    #[arg(long, default_value_t = 32)]
    pub width: usize,

    /// Multiply the learning rate by --lr-gamma every N epochs
    #[arg(long)]
    pub lr_step: Option<usize>,

    #[arg(long, default_value_t = 0.1)]
    pub lr_gamma: f64,

    /// Suppress per-epoch progress lines
    #[arg(long, short)]
    pub quiet: bool,
}

impl TrainArgs {
    /// Convert into the application config, checking the `--hl` count.
    pub fn into_config(self) -> PipelineResult<TrainConfig> {
        let hidden_layer_sizes = match self.hidden_layers {
            Some(values) => parse_hidden_layers(&values)?,
            None => Vec::new(),
        };
        let variant = if self.kaggle { DataVariant::Alternate } else { self.variant.into() };

        Ok(TrainConfig {
            data_dir:                self.data_dir,
            output_dir:              self.output_dir,
            data_source_variant:     variant,
            has_header:              !self.no_header,
            image_height:            self.height,
            image_width:             self.width,
            hidden_layer_sizes,
            conv_filter_sizes:       self.filter_sizes,
            conv_channels:           self.channels,
            epochs:                  self.epochs,
            learning_rate:           self.lr,
            weight_decay:            self.weight_decay,
            batch_size:              self.batch_size,
            early_stopping_patience: self.early_stopping,
            augment:                 self.augment,
            seed:                    self.seed,
            valid_fraction:          self.valid_fraction,
            lr_step:                 self.lr_step,
            lr_gamma:                self.lr_gamma,
            verbose:                 !self.quiet,
        })
    }
}

/// `[count, size...]` → sizes, where count is 1 or 2 and matches the sizes given.
pub fn parse_hidden_layers(values: &[usize]) -> PipelineResult<Vec<usize>> {
    match values {
        [1, a] => Ok(vec![*a]),
        [2, a, b] => Ok(vec![*a, *b]),
        _ => Err(PipelineError::config(format!(
            "--hl expects `1 n` or `2 n m`, got {values:?}"
        ))),
    }
}

#[derive(Args, Debug)]
pub struct EvaluateArgs {
    /// Output directory of a finished training run
    #[arg(long, default_value = "artifacts")]
    pub run_dir: PathBuf,

    /// Read the test CSVs from here instead of the run's data directory
    #[arg(long)]
    pub data_dir: Option<PathBuf>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cli::Cli;
    use clap::Parser;

    fn train_args(argv: &[&str]) -> TrainArgs {
        let mut full = vec!["glyph-trainer", "train"];
        full.extend_from_slice(argv);
        match Cli::try_parse_from(full).unwrap().command {
            Commands::Train(args) => args,
            other => panic!("expected train, got {other:?}"),
        }
    }

    #[test]
    fn test_defaults_match_train_config() {
        let cfg = train_args(&[]).into_config().unwrap();
        assert_eq!(cfg, TrainConfig::default());
    }

    #[test]
    fn test_short_flags() {
        let cfg = train_args(&[
            "--hl", "2", "256", "128", "--fs", "3", "5", "3", "--epochs", "7",
            "--lr", "0.01", "--wd", "0.0001", "--bs", "32", "--early", "2", "--kaggle",
        ])
        .into_config()
        .unwrap();

        assert_eq!(cfg.hidden_layer_sizes, vec![256, 128]);
        assert_eq!(cfg.conv_filter_sizes, vec![3, 5, 3]);
        assert_eq!(cfg.epochs, 7);
        assert_eq!(cfg.learning_rate, 0.01);
        assert_eq!(cfg.weight_decay, 0.0001);
        assert_eq!(cfg.batch_size, 32);
        assert_eq!(cfg.early_stopping_patience, 2);
        assert_eq!(cfg.data_source_variant, DataVariant::Alternate);
    }

    #[test]
    fn test_single_hidden_layer() {
        let cfg = train_args(&["--hl", "1", "64"]).into_config().unwrap();
        assert_eq!(cfg.hidden_layer_sizes, vec![64]);
    }

    #[test]
    fn test_hidden_layer_count_must_match() {
        assert!(parse_hidden_layers(&[2, 64]).is_err());
        assert!(parse_hidden_layers(&[1, 64, 32]).is_err());
        assert!(parse_hidden_layers(&[3, 1, 1]).is_err());
    }

    #[test]
    fn test_filter_sizes_need_three_values() {
        let argv = ["glyph-trainer", "train", "--fs", "3", "3"];
        assert!(Cli::try_parse_from(argv).is_err());
    }

    #[test]
    fn test_evaluate_args() {
        let cli = Cli::try_parse_from(["glyph-trainer", "evaluate", "--run-dir", "runs/a"]).unwrap();
        match cli.command {
            Commands::Evaluate(args) => {
                assert_eq!(args.run_dir, PathBuf::from("runs/a"));
                assert!(args.data_dir.is_none());
            }
            other => panic!("expected evaluate, got {other:?}"),
        }
    }
}
