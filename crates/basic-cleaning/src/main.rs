use std::path::PathBuf;

use anyhow::{Context, Result};
use basic_cleaning_core::config::DEFAULT_OUTPUT_FILE;
use basic_cleaning_core::{pipeline, CleaningConfig, LocalArtifactStore, StoreConfig};
use clap::Parser;
use tracing::info;
use tracing_subscriber::EnvFilter;

/// Download the raw dataset, apply basic data cleaning, and publish the
/// result as a new artifact.
#[derive(Parser, Debug)]
#[command(author, version, about = "Basic data cleaning step", long_about = None)]
struct Cli {
    /// Input artifact (raw data CSV file in the artifact store)
    #[arg(long = "input_artifact")]
    input_artifact: String,

    /// Name for the output artifact
    #[arg(long = "output_artifact")]
    output_artifact: String,

    /// Type for the output artifact
    #[arg(long = "output_type")]
    output_type: String,

    /// Description for the output artifact
    #[arg(long = "output_description")]
    output_description: String,

    /// Minimum price to consider (drop prices below this)
    #[arg(long = "min_price", allow_negative_numbers = true)]
    min_price: f64,

    /// Maximum price to consider (drop prices above this)
    #[arg(long = "max_price", allow_negative_numbers = true)]
    max_price: f64,

    /// Local path the cleaned CSV is written to before publishing
    #[arg(long = "output_file", default_value = DEFAULT_OUTPUT_FILE)]
    output_file: PathBuf,

    /// Artifact store directory (defaults to ARTIFACT_STORE_ROOT or ./artifacts)
    #[arg(long = "store_root")]
    store_root: Option<PathBuf>,
}

impl Cli {
    fn into_parts(self) -> (CleaningConfig, Option<PathBuf>) {
        let config = CleaningConfig {
            input_artifact: self.input_artifact,
            output_artifact: self.output_artifact,
            output_type: self.output_type,
            output_description: self.output_description,
            min_price: self.min_price,
            max_price: self.max_price,
            output_file: self.output_file,
        };
        (config, self.store_root)
    }
}

fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .json()
        .init();

    let (config, store_root) = Cli::parse().into_parts();
    let store_config = match store_root {
        Some(root) => StoreConfig { root },
        None => StoreConfig::from_env(),
    };
    info!(store_root = %store_config.root.display(), "Using local artifact store");
    let store = LocalArtifactStore::from_config(&store_config);

    let report = pipeline::run(&store, &config).context("basic cleaning failed")?;

    info!(
        input = %report.input.reference(),
        output = %report.output.reference(),
        rows_read = report.rows_read,
        rows_kept = report.rows_kept,
        reviews_missing = report.reviews_missing,
        "Basic cleaning complete"
    );
    Ok(())
}
