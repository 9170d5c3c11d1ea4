use std::env;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::error::{CleaningError, Result};

pub const DEFAULT_OUTPUT_FILE: &str = "clean_sample.csv";
pub const JOB_TYPE: &str = "basic_cleaning";

const STORE_ROOT_VARS: &[&str] = &["ARTIFACT_STORE_ROOT", "BASIC_CLEANING_ARTIFACT_ROOT"];

/// Where the local artifact store keeps its files.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoreConfig {
    pub root: PathBuf,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            root: PathBuf::from("artifacts"),
        }
    }
}

impl StoreConfig {
    /// Read the store root from the environment, falling back to `./artifacts`.
    pub fn from_env() -> Self {
        STORE_ROOT_VARS
            .iter()
            .find_map(|var| env::var(var).ok().filter(|value| !value.trim().is_empty()))
            .map(|root| Self {
                root: PathBuf::from(root),
            })
            .unwrap_or_default()
    }
}

/// Arguments of one cleaning run. Serialized into the output manifest as the
/// run configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CleaningConfig {
    pub input_artifact: String,
    pub output_artifact: String,
    pub output_type: String,
    pub output_description: String,
    pub min_price: f64,
    pub max_price: f64,
    pub output_file: PathBuf,
}

impl CleaningConfig {
    pub fn validate(&self) -> Result<()> {
        for (field, value) in [
            ("input_artifact", &self.input_artifact),
            ("output_artifact", &self.output_artifact),
            ("output_type", &self.output_type),
        ] {
            if value.trim().is_empty() {
                return Err(CleaningError::InvalidConfig(format!(
                    "{field} cannot be empty"
                )));
            }
        }

        if !self.min_price.is_finite() || !self.max_price.is_finite() {
            return Err(CleaningError::InvalidConfig(format!(
                "price bounds must be finite numbers (got {} and {})",
                self.min_price, self.max_price
            )));
        }

        if self.output_file.as_os_str().is_empty() {
            return Err(CleaningError::InvalidConfig(
                "output_file cannot be empty".into(),
            ));
        }

        Ok(())
    }

    pub fn to_metadata(&self) -> Result<serde_json::Value> {
        Ok(serde_json::json!({
            "job_type": JOB_TYPE,
            "config": serde_json::to_value(self)?,
        }))
    }
}
