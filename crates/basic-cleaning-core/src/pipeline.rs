//! The cleaning step: fetch the raw listings, drop price outliers, normalize
//! review dates, and publish the cleaned table.

use std::path::PathBuf;

use tracing::info;

use crate::cleaning;
use crate::config::CleaningConfig;
use crate::dataset;
use crate::error::{CleaningError, Result};
use crate::store::{ArtifactManifest, ArtifactRef, ArtifactStore, PublishRequest, StoreError};

#[derive(Debug, Clone)]
pub struct CleaningReport {
    pub input: ArtifactManifest,
    pub output: ArtifactManifest,
    pub output_file: PathBuf,
    pub rows_read: usize,
    pub rows_kept: usize,
    pub reviews_missing: usize,
}

pub fn run(store: &dyn ArtifactStore, config: &CleaningConfig) -> Result<CleaningReport> {
    config.validate()?;

    let input_ref = config
        .input_artifact
        .parse::<ArtifactRef>()
        .map_err(|err: StoreError| CleaningError::ArtifactNotFound(err.to_string()))?;

    info!(artifact = %input_ref, "Downloading artifact");
    let fetched = store.fetch(&input_ref).map_err(fetch_error)?;

    info!(path = %fetched.path.display(), "Reading data");
    let raw = dataset::read_dataset(&fetched.path)?;

    info!(
        min_price = config.min_price,
        max_price = config.max_price,
        "Dropping price outliers"
    );
    let mut cleaned = cleaning::clean(raw, config.min_price, config.max_price)?;
    info!(
        rows = cleaned.rows_kept(),
        dropped = cleaned.rows_read - cleaned.rows_kept(),
        "Dataset size after dropping price outliers"
    );
    info!(
        parsed = cleaned.reviews.parsed,
        missing = cleaned.reviews.missing,
        "Converted last_review to datetime"
    );

    info!(path = %config.output_file.display(), "Saving cleaned data");
    dataset::write_dataset(
        &mut cleaned.frame,
        &config.output_file,
        cleaned.reviews.csv_format(),
    )?;

    info!(artifact = %config.output_artifact, "Creating artifact");
    let request = PublishRequest {
        name: config.output_artifact.clone(),
        artifact_type: config.output_type.clone(),
        description: config.output_description.clone(),
        file: config.output_file.clone(),
        aliases: Vec::new(),
        inputs: vec![fetched.manifest.reference()],
        metadata: config.to_metadata()?,
    };
    let output = store
        .publish(request)
        .map_err(|err| CleaningError::PublishError(err.to_string()))?;

    Ok(CleaningReport {
        input: fetched.manifest,
        output,
        output_file: config.output_file.clone(),
        rows_read: cleaned.rows_read,
        rows_kept: cleaned.rows_kept(),
        reviews_missing: cleaned.reviews.missing,
    })
}

fn fetch_error(err: StoreError) -> CleaningError {
    match err {
        StoreError::NotFound(_) | StoreError::InvalidReference(_) => {
            CleaningError::ArtifactNotFound(err.to_string())
        }
        other => CleaningError::Store(other),
    }
}
