pub mod chart;
pub mod cli;
pub mod dataset;
pub mod error;
pub mod insight;
pub mod parse;
pub mod pipeline;
pub mod profile;
pub mod report;
pub mod stats;

use std::{env, sync::OnceLock};

use anyhow::Result;
use clap::Parser;
use log::{LevelFilter, info};

use crate::cli::Cli;

static LOGGER: OnceLock<()> = OnceLock::new();

fn init_logging() {
    LOGGER.get_or_init(|| {
        let mut builder = env_logger::Builder::from_env(env_logger::Env::default());
        if env::var("RUST_LOG").is_err() {
            builder.filter_module("csv_profiler", LevelFilter::Info);
        }
        let _ = builder.format_timestamp_millis().try_init();
    });
}

pub fn run() -> Result<()> {
    init_logging();
    let cli = Cli::parse();
    let config = cli.to_config();
    info!("Profiling '{}'", cli.input.display());
    let outcome = pipeline::profile_csv(&cli.input, &cli.output_dir, &config)?;
    println!("{}", outcome.report_path.display());
    Ok(())
}
