use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use super::StoreError;

const LATEST: &str = "latest";

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum VersionSpec {
    Latest,
    Number(u32),
    Alias(String),
}

/// `name`, `name:latest`, `name:v3` or `name:<alias>`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct ArtifactRef {
    pub name: String,
    pub version: VersionSpec,
}

impl ArtifactRef {
    pub fn latest(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            version: VersionSpec::Latest,
        }
    }

    pub fn validate_name(name: &str) -> Result<(), StoreError> {
        let valid = !name.is_empty()
            && !name.starts_with('.')
            && name
                .chars()
                .all(|c| !matches!(c, '/' | '\\' | ':') && !c.is_control());
        if valid {
            Ok(())
        } else {
            Err(StoreError::InvalidReference(format!(
                "'{name}' is not a valid artifact name"
            )))
        }
    }

    /// Aliases share the name rules and may not shadow `latest` or `vN`.
    pub fn validate_alias(alias: &str) -> Result<(), StoreError> {
        Self::validate_name(alias)?;
        if alias == LATEST || parse_version_number(alias).is_some() {
            return Err(StoreError::InvalidReference(format!(
                "'{alias}' is reserved and cannot be used as an alias"
            )));
        }
        Ok(())
    }
}

fn parse_version_number(value: &str) -> Option<u32> {
    value
        .strip_prefix('v')
        .filter(|digits| !digits.is_empty() && digits.bytes().all(|b| b.is_ascii_digit()))
        .and_then(|digits| digits.parse().ok())
}

impl FromStr for ArtifactRef {
    type Err = StoreError;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        let raw = raw.trim();
        let (name, version) = match raw.split_once(':') {
            Some((name, LATEST)) => (name, VersionSpec::Latest),
            Some((name, version)) => {
                let spec = match parse_version_number(version) {
                    Some(number) => VersionSpec::Number(number),
                    None => {
                        Self::validate_alias(version)?;
                        VersionSpec::Alias(version.to_string())
                    }
                };
                (name, spec)
            }
            None => (raw, VersionSpec::Latest),
        };

        Self::validate_name(name)?;
        Ok(Self {
            name: name.to_string(),
            version,
        })
    }
}

impl fmt::Display for ArtifactRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.version {
            VersionSpec::Latest => write!(f, "{}:{LATEST}", self.name),
            VersionSpec::Number(number) => write!(f, "{}:v{number}", self.name),
            VersionSpec::Alias(alias) => write!(f, "{}:{alias}", self.name),
        }
    }
}

impl TryFrom<String> for ArtifactRef {
    type Error = StoreError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<ArtifactRef> for String {
    fn from(value: ArtifactRef) -> Self {
        value.to_string()
    }
}
