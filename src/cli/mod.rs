// ============================================================
// Layer 1 — CLI / Presentation Layer
// ============================================================
// Entry point for all user interaction, parsed with `clap`.
// All business logic is delegated to Layer 2 (application).
//
// Two commands are supported:
//   1. `train`    — fits the CNN on the CSV dataset
//   2. `evaluate` — re-scores a saved run on the test set
//
// Reference: Rust Book §12 (CLI programs)

pub mod commands;

use anyhow::Result;
use clap::Parser;
use commands::{Commands, EvaluateArgs, TrainArgs};

#[derive(Parser, Debug)]
#[command(
    name = "glyph-trainer",
    version = "0.1.0",
    about = "Train a CNN on handwritten-character CSV images and report test accuracy."
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

impl Cli {
    /// Route to the matching use case; this layer only prints.
    pub fn run(self) -> Result<()> {
        match self.command {
            Commands::Train(args)    => run_train(args),
            Commands::Evaluate(args) => run_evaluate(args),
        }
    }
}

fn run_train(args: TrainArgs) -> Result<()> {
    use crate::application::train_use_case::TrainUseCase;

    let config = args.into_config()?;
    tracing::info!("Starting training on data in: {}", config.data_dir.display());

    let report = TrainUseCase::new(config).execute()?;

    println!(
        "Best epoch {} (val_loss {:.4}), stopped after {} epochs ({:?})",
        report.best_epoch, report.best_valid_loss, report.epochs_run, report.stop_reason
    );
    println!("Test Set Accuracy : {:.5}", report.test_accuracy);
    Ok(())
}

fn run_evaluate(args: EvaluateArgs) -> Result<()> {
    use crate::application::evaluate_use_case::EvaluateUseCase;

    let use_case = EvaluateUseCase::new(&args.run_dir, args.data_dir)?;
    println!("Test Set Accuracy : {:.5}", use_case.accuracy()?);
    Ok(())
}
