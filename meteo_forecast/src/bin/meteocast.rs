//! meteocast CLI: build features, fit the forecast ensemble and score it.

use anyhow::{Context, Result};
use clap::Parser;
use meteo_features::{open_store, FeatureArtifact};
use meteo_forecast::{ForecastPipeline, PipelineConfig};
use std::path::PathBuf;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

#[derive(Parser)]
#[command(name = "meteocast")]
#[command(author, version)]
#[command(about = "Multi-horizon daily temperature forecasts from weather observations")]
#[command(long_about = "Builds leakage-safe lag, rolling, climatology and cross-location
features from daily observations, fits a multi-horizon ensemble on the
training window and reports per-horizon errors on the test window.

EXAMPLES:
  # Run with a JSON configuration
  meteocast --config run.json --observations weather.csv

  # Keep the feature table and write the report
  meteocast --config run.json --observations weather.parquet \\
      --artifact features.parquet --report report.json

Set RUST_LOG (e.g. RUST_LOG=debug) to change the log level.")]
struct Cli {
    /// Pipeline configuration (JSON)
    #[arg(long, value_name = "FILE")]
    config: PathBuf,

    /// Observation table (.csv, .parquet or .pq)
    #[arg(long, value_name = "FILE")]
    observations: PathBuf,

    /// Write the feature table here (.csv, .parquet or .pq)
    #[arg(long, value_name = "FILE")]
    artifact: Option<PathBuf>,

    /// Write the run report here (JSON)
    #[arg(long, value_name = "FILE")]
    report: Option<PathBuf>,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer())
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let config = PipelineConfig::from_json_file(&cli.config)
        .with_context(|| format!("Failed to load config {}", cli.config.display()))?;
    let pipeline = ForecastPipeline::new(config).context("Invalid configuration")?;

    let store = open_store(&cli.observations)
        .with_context(|| format!("Failed to open {}", cli.observations.display()))?;
    let dataset = pipeline
        .build(store.as_ref())
        .context("Feature construction failed")?;
    println!("{}", dataset.drop_report);
    println!("{}", dataset.split_report);

    if let Some(path) = &cli.artifact {
        FeatureArtifact::write(&dataset.table, path)
            .with_context(|| format!("Failed to write feature table {}", path.display()))?;
        info!("Wrote {} rows to {}", dataset.table.len(), path.display());
    }

    let report = pipeline
        .train_and_evaluate(&dataset)
        .context("Training or evaluation failed")?;
    println!("Model: {} ({})", report.model, report.strategy);
    for score in &report.cv_scores {
        println!("CV {}", score);
    }
    println!("{}", report.evaluation);

    if let Some(path) = &cli.report {
        report
            .to_json_file(path)
            .with_context(|| format!("Failed to write report {}", path.display()))?;
        info!("Wrote report to {}", path.display());
    }

    Ok(())
}
