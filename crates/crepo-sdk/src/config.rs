use std::path::Path;

use crepo_store::VersionIdStrategy;
use crepo_types::validate_bucket_name;
use serde::{Deserialize, Serialize};

use crate::error::{SdkError, SdkResult};

pub const DEFAULT_BUCKET: &str = "default";

/// Settings for a [`ContentRepoClient`](crate::ContentRepoClient) and the
/// in-memory engine behind it.
///
/// ```toml
/// bucket = "corpus"
/// initial_buckets = ["corpus", "scratch"]
/// create_bucket_if_missing = false
/// version_ids = "random"
/// ```
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ClientConfig {
    /// Bucket every key-based call is scoped to.
    pub bucket: String,
    /// Buckets the engine creates at startup and after every reset.
    pub initial_buckets: Vec<String>,
    pub create_bucket_if_missing: bool,
    pub version_ids: VersionIdStrategy,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            bucket: DEFAULT_BUCKET.into(),
            initial_buckets: vec![DEFAULT_BUCKET.into()],
            create_bucket_if_missing: true,
            version_ids: VersionIdStrategy::default(),
        }
    }
}

impl ClientConfig {
    pub fn for_bucket(bucket: impl Into<String>) -> Self {
        let bucket = bucket.into();
        Self {
            initial_buckets: vec![bucket.clone()],
            bucket,
            ..Self::default()
        }
    }

    pub fn from_toml_str(text: &str) -> SdkResult<Self> {
        let config: Self = toml::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_file(path: impl AsRef<Path>) -> SdkResult<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|source| SdkError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml_str(&text)
    }

    /// Reject names the engine would refuse anyway, before anything is built.
    pub fn validate(&self) -> SdkResult<()> {
        for name in std::iter::once(&self.bucket).chain(&self.initial_buckets) {
            validate_bucket_name(name).map_err(|e| SdkError::Config(e.to_string()))?;
        }
        Ok(())
    }
}
