// crates/basic-cleaning-core/src/error.rs

use thiserror::Error;

#[derive(Error, Debug)]
pub enum CleaningError {
    #[error("Artifact not found: {0}")]
    ArtifactNotFound(String),

    #[error("Malformed input: {0}")]
    MalformedInput(String),

    #[error("Failed to publish artifact: {0}")]
    PublishError(String),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Artifact store error: {0}")]
    Store(#[from] crate::store::StoreError),

    #[error("File I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Polars operation failed: {0}")]
    Polars(#[from] polars::error::PolarsError),

    #[error("JSON serialization/deserialization error: {0}")]
    Json(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, CleaningError>;
