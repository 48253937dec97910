use anyhow::Result;
use clap::Parser;
use log::{error, info};
use std::path::PathBuf;
use std::process::ExitCode;

use data_prep::{prepare, DataLayout, Downloader, Prepared, DEFAULT_DATA_DIR, DEFAULT_MANIFEST_PATH};

/// Download and combine JSONL training shards.
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Data access manifest listing the source URLs
    #[arg(short, long, default_value = DEFAULT_MANIFEST_PATH)]
    manifest: PathBuf,

    /// Directory for shards and the combined dataset
    #[arg(short, long, default_value = DEFAULT_DATA_DIR)]
    data_dir: PathBuf,
}

fn main() -> ExitCode {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let cli = Cli::parse();

    match run(&cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("{e:#}");
            ExitCode::from(1)
        }
    }
}

fn run(cli: &Cli) -> Result<()> {
    let layout = DataLayout::new(&cli.manifest, &cli.data_dir);
    let downloader = Downloader::new()?;

    match prepare(&layout, &downloader)? {
        Prepared::Mock { path, samples } => {
            info!("Wrote {} synthetic samples to {}", samples, path.display())
        }
        Prepared::Combined { path, shards, lines } => {
            info!("Combined {} shards ({} lines) into {}", shards, lines, path.display())
        }
    }
    Ok(())
}
