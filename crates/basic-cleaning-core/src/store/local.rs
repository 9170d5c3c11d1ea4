use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use chrono::Utc;
use tracing::{debug, info};

use super::{
    ArtifactManifest, ArtifactRef, ArtifactStore, FetchedArtifact, PublishRequest, StoreError,
    VersionSpec, MANIFEST_FILE,
};
use crate::config::StoreConfig;

/// Artifact store backed by a directory tree:
/// `<root>/<name>/v<N>/{<file>, manifest.json}`.
#[derive(Debug, Clone)]
pub struct LocalArtifactStore {
    root: PathBuf,
}

impl LocalArtifactStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn from_config(config: &StoreConfig) -> Self {
        Self::new(config.root.clone())
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn artifact_dir(&self, name: &str) -> PathBuf {
        self.root.join(name)
    }

    fn version_dir(&self, name: &str, version: u32) -> PathBuf {
        self.artifact_dir(name).join(format!("v{version}"))
    }

    /// Versions on disk, oldest first. A missing artifact yields an empty list.
    fn load_versions(&self, name: &str) -> Result<Vec<ArtifactManifest>, StoreError> {
        let dir = self.artifact_dir(name);
        let entries = match fs::read_dir(&dir) {
            Ok(entries) => entries,
            Err(err) if err.kind() == ErrorKind::NotFound => return Ok(Vec::new()),
            Err(err) => return Err(StoreError::io(&dir, err)),
        };

        let mut manifests = Vec::new();
        for entry in entries {
            let entry = entry.map_err(|err| StoreError::io(&dir, err))?;
            let file_name = entry.file_name();
            let Some(dir_name) = file_name.to_str() else {
                continue;
            };
            // staging directories start with '.'
            if !dir_name.starts_with('v') {
                continue;
            }
            let manifest_path = entry.path().join(MANIFEST_FILE);
            if !manifest_path.is_file() {
                continue;
            }
            manifests.push(read_manifest(&manifest_path)?);
        }

        manifests.sort_by_key(|manifest| manifest.version);
        Ok(manifests)
    }

    fn resolve(&self, reference: &ArtifactRef) -> Result<ArtifactManifest, StoreError> {
        ArtifactRef::validate_name(&reference.name)?;
        let versions = self.load_versions(&reference.name)?;

        let found = match &reference.version {
            VersionSpec::Latest => versions.into_iter().last(),
            VersionSpec::Number(number) => versions
                .into_iter()
                .find(|manifest| manifest.version == *number),
            VersionSpec::Alias(alias) => versions
                .into_iter()
                .find(|manifest| manifest.aliases.iter().any(|a| a == alias)),
        };

        found.ok_or_else(|| StoreError::NotFound(reference.to_string()))
    }

    /// Point `aliases` at `target`, removing them from every other version.
    fn move_aliases(
        &self,
        versions: &mut [ArtifactManifest],
        target: u32,
        aliases: &[String],
    ) -> Result<(), StoreError> {
        if aliases.is_empty() {
            return Ok(());
        }

        for manifest in versions.iter_mut() {
            let before = manifest.aliases.clone();
            if manifest.version == target {
                for alias in aliases {
                    if !manifest.aliases.contains(alias) {
                        manifest.aliases.push(alias.clone());
                    }
                }
            } else {
                manifest.aliases.retain(|alias| !aliases.contains(alias));
            }

            if manifest.aliases != before {
                let path = self
                    .version_dir(&manifest.name, manifest.version)
                    .join(MANIFEST_FILE);
                write_manifest(&path, manifest)?;
            }
        }
        Ok(())
    }
}

impl ArtifactStore for LocalArtifactStore {
    fn fetch(&self, reference: &ArtifactRef) -> Result<FetchedArtifact, StoreError> {
        let manifest = self.resolve(reference)?;
        let path = self
            .version_dir(&manifest.name, manifest.version)
            .join(&manifest.file_name);
        if !path.is_file() {
            return Err(StoreError::NotFound(format!(
                "{} (file {} is missing)",
                manifest.reference(),
                path.display()
            )));
        }

        debug!(artifact = %manifest.reference(), path = %path.display(), "Resolved artifact");
        Ok(FetchedArtifact { manifest, path })
    }

    fn publish(&self, request: PublishRequest) -> Result<ArtifactManifest, StoreError> {
        ArtifactRef::validate_name(&request.name)?;
        for alias in &request.aliases {
            ArtifactRef::validate_alias(alias)?;
        }
        let file_name = request
            .file
            .file_name()
            .and_then(|name| name.to_str())
            .map(str::to_string)
            .ok_or_else(|| {
                StoreError::InvalidReference(format!(
                    "{} does not name a file",
                    request.file.display()
                ))
            })?;

        let contents = fs::read(&request.file).map_err(|err| StoreError::io(&request.file, err))?;
        let digest = blake3::hash(&contents).to_hex().to_string();

        let mut versions = self.load_versions(&request.name)?;
        if let Some(existing) = versions
            .iter()
            .find(|manifest| manifest.artifact_type != request.artifact_type)
        {
            return Err(StoreError::Conflict(format!(
                "artifact '{}' already exists with type '{}', cannot publish type '{}'",
                request.name, existing.artifact_type, request.artifact_type
            )));
        }

        if let Some(latest) = versions.last() {
            if latest.digest == digest && latest.file_name == file_name {
                let version = latest.version;
                info!(
                    artifact = %latest.reference(),
                    digest = %digest,
                    "Content unchanged, reusing existing version"
                );
                self.move_aliases(&mut versions, version, &request.aliases)?;
                return versions
                    .pop()
                    .ok_or_else(|| StoreError::NotFound(request.name.clone()));
            }
        }

        let version = versions.last().map_or(0, |latest| latest.version + 1);
        let manifest = ArtifactManifest {
            name: request.name.clone(),
            version,
            artifact_type: request.artifact_type,
            description: request.description,
            file_name: file_name.clone(),
            digest,
            size_bytes: contents.len() as u64,
            created_at: Utc::now(),
            aliases: request.aliases.clone(),
            inputs: request.inputs,
            metadata: request.metadata,
        };

        let artifact_dir = self.artifact_dir(&request.name);
        let staging = artifact_dir.join(format!(".staging-v{version}-{}", std::process::id()));
        let target = self.version_dir(&request.name, version);

        fs::create_dir_all(&staging).map_err(|err| StoreError::io(&staging, err))?;
        let staged = fs::write(staging.join(&file_name), &contents)
            .map_err(|err| StoreError::io(&staging, err))
            .and_then(|()| write_manifest(&staging.join(MANIFEST_FILE), &manifest));
        if let Err(err) = staged {
            let _ = fs::remove_dir_all(&staging);
            return Err(err);
        }

        if target.exists() {
            let _ = fs::remove_dir_all(&staging);
            return Err(StoreError::Conflict(format!(
                "{} was created by another publisher",
                manifest.reference()
            )));
        }
        if let Err(err) = fs::rename(&staging, &target) {
            let _ = fs::remove_dir_all(&staging);
            return Err(StoreError::io(&target, err));
        }

        versions.push(manifest);
        self.move_aliases(&mut versions, version, &request.aliases)?;

        let published = versions
            .pop()
            .ok_or_else(|| StoreError::NotFound(request.name.clone()))?;
        info!(
            artifact = %published.reference(),
            artifact_type = %published.artifact_type,
            size_bytes = published.size_bytes,
            "Published artifact"
        );
        Ok(published)
    }

    fn list_versions(&self, name: &str) -> Result<Vec<ArtifactManifest>, StoreError> {
        ArtifactRef::validate_name(name)?;
        let versions = self.load_versions(name)?;
        if versions.is_empty() {
            return Err(StoreError::NotFound(name.to_string()));
        }
        Ok(versions)
    }
}

fn read_manifest(path: &Path) -> Result<ArtifactManifest, StoreError> {
    let bytes = fs::read(path).map_err(|err| StoreError::io(path, err))?;
    serde_json::from_slice(&bytes).map_err(|source| StoreError::Manifest {
        path: path.to_path_buf(),
        source,
    })
}

fn write_manifest(path: &Path, manifest: &ArtifactManifest) -> Result<(), StoreError> {
    let bytes = serde_json::to_vec_pretty(manifest).map_err(|source| StoreError::Manifest {
        path: path.to_path_buf(),
        source,
    })?;
    fs::write(path, bytes).map_err(|err| StoreError::io(path, err))
}
