use anyhow::{Context, Result};
use clap::Parser;
use log::{error, info};
use std::path::PathBuf;
use std::process::ExitCode;

use trainer::{train, RunContext, StopReason, TrainingConfig};

/// Fine-tune a pretrained transformer for text classification.
#[derive(Parser, Debug)]
#[command(name = "classifier-train", author, version, about, long_about = None)]
struct Cli {
    /// JSONL (or CSV) file with `text` and `label` fields
    data_path: PathBuf,

    /// Training configuration (JSON, or YAML by extension)
    config_path: PathBuf,
}

fn main() -> ExitCode {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(err) if !err.use_stderr() => err.exit(),
        Err(err) => {
            eprintln!("{err}");
            return ExitCode::from(1);
        }
    };

    match run(&cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("Training failed: {e:#}");
            ExitCode::from(1)
        }
    }
}

fn run(cli: &Cli) -> Result<()> {
    let config = TrainingConfig::from_file(&cli.config_path)
        .with_context(|| format!("loading config from {}", cli.config_path.display()))?;

    info!("Config: {:?}", config);
    info!("Data path: {}", cli.data_path.display());

    let ctx = RunContext::detect();
    let summary = train(&cli.data_path, &config, &ctx)?;

    match (summary.best_f1, summary.best_epoch) {
        (Some(f1), Some(epoch)) => info!("Best validation F1 {:.4} at epoch {}", f1, epoch + 1),
        _ => info!("Validation F1 never improved; no checkpoint written"),
    }
    if summary.stop_reason == StopReason::EarlyStop {
        info!("Stopped early after {} of {} epochs", summary.history.len(), config.epochs);
    }
    Ok(())
}
