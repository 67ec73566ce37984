mod color;
mod config;
mod data;
mod pipeline;
mod plot;
mod stats;

use anyhow::{Context, Result};

use config::AnalysisConfig;

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let base = std::env::current_dir().context("resolving working directory")?;
    let config = AnalysisConfig::load(&base)?;
    log::debug!("Configuration: {config:?}");

    let report = pipeline::run(&config)?;
    log::info!(
        "Done: {} ribosomal genes, {} conditions, {} image(s) in {}",
        report.genes,
        report.conditions.len(),
        report.images.len(),
        config.output_dir.display()
    );
    Ok(())
}
