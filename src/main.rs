use anyhow::{Context, Result};
use clap::Parser;
use std::path::PathBuf;

use clickmaker_lib::config::{BatchConfig, DEFAULT_CONFIG_FILE};
use clickmaker_lib::error::ConfigError;
use clickmaker_lib::{logger, Batch};

#[derive(Parser, Debug)]
#[command(name = "clickmaker")]
#[command(about = "Render click tracks with spoken bar cues for MIDI scores", long_about = None)]
struct Args {
    /// Batch configuration file (a template is written if it does not exist)
    #[arg(short, long, default_value = DEFAULT_CONFIG_FILE)]
    config: PathBuf,

    /// Suppress informational messages (only errors)
    #[arg(short, long)]
    quiet: bool,

    /// Show debug messages
    #[arg(short, long)]
    verbose: bool,
}

fn main() -> Result<()> {
    let args = Args::parse();

    logger::init(logger::level_for(args.quiet, args.verbose))
        .context("Failed to install logger")?;

    let config = match BatchConfig::load(&args.config) {
        Ok(config) => config,
        Err(ConfigError::Missing(path)) => {
            let schema = BatchConfig::write_template(&path)?;
            eprintln!(
                "No configuration found. Wrote a template to {} (schema: {}); edit it and rerun.",
                path.display(),
                schema.display()
            );
            return Ok(());
        }
        Err(e) => return Err(e.into()),
    };

    let batch = Batch::new(config)?;
    let report = batch.run();

    if !report.is_success() {
        eprintln!("{} scores failed:", report.failures.len());
        for failure in &report.failures {
            eprintln!(
                "{}: [{}] {}",
                failure.score.display(),
                failure.error.kind(),
                failure.error
            );
        }
        std::process::exit(1);
    }

    Ok(())
}
