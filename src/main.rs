//! AutoML CLI
//!
//! Finds the model that works best for the data provided, then reports
//! the winning trial and where its artifact landed.
//!
//! # Usage
//!
//! ```bash
//! # Classify, 10 trials of 5-fold cross-validation
//! automl --train-data train.csv --target label
//!
//! # Regression with a fast hold-out split and debug logs
//! automl --train-data prices.csv --target price \
//!     --task regression --fast-mode --log
//! ```

use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;
use tracing_subscriber::EnvFilter;

use automl::{AutoMl, AutoMlConfig, Dataset, Task};

/// Find a model that works best for the provided training data.
#[derive(Parser, Debug)]
#[command(name = "automl")]
#[command(version)]
#[command(about = "Search over model families and hyperparameters for a tabular dataset")]
struct Cli {
    /// Path to the training data (CSV with a header row).
    #[arg(long, value_name = "PATH")]
    train_data: PathBuf,

    /// Name of the target column in the training data.
    #[arg(long, value_name = "COLUMN")]
    target: String,

    /// Type of the task.
    #[arg(long, value_enum, default_value_t = Task::Classification)]
    task: Task,

    /// Emit debug-level logs.
    #[arg(long)]
    log: bool,

    /// Use a single train/validation split instead of 5-fold
    /// cross-validation.
    #[arg(long)]
    fast_mode: bool,

    /// Number of trials to run.
    #[arg(long, default_value_t = 10)]
    n_trials: usize,

    /// Experiment name reported to tracking sinks.
    #[arg(long, default_value = "automl")]
    experiment_name: String,

    /// Directory for model artifacts and the trial journal.
    #[arg(long, default_value = "model")]
    artifact_dir: PathBuf,
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    let filter = if cli.log { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter)))
        .init();

    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {e}");
            ExitCode::FAILURE
        }
    }
}

fn run(cli: Cli) -> automl::Result<()> {
    let dataset = Dataset::from_csv(&cli.train_data, &cli.target, cli.task)?;
    tracing::info!(
        rows = dataset.n_rows(),
        features = dataset.n_features(),
        task = %dataset.task(),
        "loaded training data"
    );

    let config = AutoMlConfig::new(cli.task)
        .with_n_trials(cli.n_trials)
        .with_fast_mode(cli.fast_mode)
        .with_experiment_name(cli.experiment_name)
        .with_artifact_dir(cli.artifact_dir);

    let mut engine = AutoMl::new(dataset, config);
    engine.fit()?;

    if let Some(best) = engine.best_trial() {
        println!("Best trial: #{}", best.index);
        println!("  family: {}", best.family);
        println!("  score:  {:.6}", best.score);
        for (name, value) in best.assignment.iter() {
            println!("  {name}: {value}");
        }
        if let Some(artifact) = &best.artifact {
            println!("  artifact: {}", artifact.display());
        }
    }

    Ok(())
}
