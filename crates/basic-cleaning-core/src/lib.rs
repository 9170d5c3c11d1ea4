pub mod cleaning;
pub mod config;
pub mod dataset;
pub mod dates;
pub mod error;
pub mod pipeline;
pub mod store;

pub use config::{CleaningConfig, StoreConfig};
pub use error::{CleaningError, Result};
pub use pipeline::{run, CleaningReport};
pub use store::{ArtifactRef, ArtifactStore, LocalArtifactStore};
