//! Versioned artifact storage used to fetch inputs and publish outputs.

mod local;
mod reference;

use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

pub use local::LocalArtifactStore;
pub use reference::{ArtifactRef, VersionSpec};

pub const MANIFEST_FILE: &str = "manifest.json";

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("artifact not found: {0}")]
    NotFound(String),
    #[error("artifact conflict: {0}")]
    Conflict(String),
    #[error("invalid artifact reference: {0}")]
    InvalidReference(String),
    #[error("I/O error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("unreadable manifest {path}: {source}")]
    Manifest {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

impl StoreError {
    fn io(path: &Path, source: std::io::Error) -> Self {
        Self::Io {
            path: path.to_path_buf(),
            source,
        }
    }
}

/// Metadata stored alongside every artifact version.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ArtifactManifest {
    pub name: String,
    pub version: u32,
    pub artifact_type: String,
    pub description: String,
    pub file_name: String,
    /// blake3 digest of the file contents, hex encoded.
    pub digest: String,
    pub size_bytes: u64,
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub aliases: Vec<String>,
    /// Artifact versions consumed by the run that produced this one.
    #[serde(default)]
    pub inputs: Vec<ArtifactRef>,
    #[serde(default)]
    pub metadata: serde_json::Value,
}

impl ArtifactManifest {
    pub fn reference(&self) -> ArtifactRef {
        ArtifactRef {
            name: self.name.clone(),
            version: VersionSpec::Number(self.version),
        }
    }
}

#[derive(Debug, Clone)]
pub struct FetchedArtifact {
    pub manifest: ArtifactManifest,
    /// Local path of the artifact's file.
    pub path: PathBuf,
}

#[derive(Debug, Clone)]
pub struct PublishRequest {
    pub name: String,
    pub artifact_type: String,
    pub description: String,
    pub file: PathBuf,
    pub aliases: Vec<String>,
    pub inputs: Vec<ArtifactRef>,
    pub metadata: serde_json::Value,
}

impl PublishRequest {
    pub fn new(
        name: impl Into<String>,
        artifact_type: impl Into<String>,
        description: impl Into<String>,
        file: impl Into<PathBuf>,
    ) -> Self {
        Self {
            name: name.into(),
            artifact_type: artifact_type.into(),
            description: description.into(),
            file: file.into(),
            aliases: Vec::new(),
            inputs: Vec::new(),
            metadata: serde_json::Value::Null,
        }
    }
}

pub trait ArtifactStore: Send + Sync {
    /// Resolve `reference` to a concrete version and return its local file.
    fn fetch(&self, reference: &ArtifactRef) -> Result<FetchedArtifact, StoreError>;

    /// Store `request.file` as a new version of `request.name`.
    fn publish(&self, request: PublishRequest) -> Result<ArtifactManifest, StoreError>;

    /// All versions of `name`, oldest first.
    fn list_versions(&self, name: &str) -> Result<Vec<ArtifactManifest>, StoreError>;
}
