use std::fmt;

use serde::{Deserialize, Serialize};

use crate::version_id::VersionId;

/// A key-space slot: one (bucket, key) pair, irrespective of version.
///
/// Used for "latest" and "all versions" queries.
#[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RepoId {
    bucket_name: String,
    key: String,
}

impl RepoId {
    pub fn new(bucket_name: impl Into<String>, key: impl Into<String>) -> Self {
        Self {
            bucket_name: bucket_name.into(),
            key: key.into(),
        }
    }

    pub fn bucket_name(&self) -> &str {
        &self.bucket_name
    }

    pub fn key(&self) -> &str {
        &self.key
    }

    /// Locate one exact version under this slot.
    pub fn version(&self, version_id: VersionId) -> RepoVersion {
        RepoVersion {
            id: self.clone(),
            version_id,
        }
    }

    /// Locate one version under this slot by its chain ordinal.
    pub fn number(&self, number: u32) -> RepoVersionNumber {
        RepoVersionNumber {
            id: self.clone(),
            number,
        }
    }

    /// Locate the first version under this slot carrying `tag`.
    pub fn tag(&self, tag: impl Into<String>) -> RepoVersionTag {
        RepoVersionTag {
            id: self.clone(),
            tag: tag.into(),
        }
    }
}

impl fmt::Debug for RepoId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "RepoId({self})")
    }
}

impl fmt::Display for RepoId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.bucket_name, self.key)
    }
}

/// One exact version anywhere in a chain, located by its [`VersionId`].
#[derive(Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RepoVersion {
    #[serde(flatten)]
    id: RepoId,
    version_id: VersionId,
}

impl RepoVersion {
    pub fn new(bucket_name: impl Into<String>, key: impl Into<String>, version_id: VersionId) -> Self {
        RepoId::new(bucket_name, key).version(version_id)
    }

    pub fn id(&self) -> &RepoId {
        &self.id
    }

    pub fn version_id(&self) -> VersionId {
        self.version_id
    }
}

impl fmt::Debug for RepoVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "RepoVersion({self})")
    }
}

impl fmt::Display for RepoVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}@{}", self.id, self.version_id)
    }
}

/// One version located by its chain-relative ordinal.
#[derive(Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RepoVersionNumber {
    #[serde(flatten)]
    id: RepoId,
    number: u32,
}

impl RepoVersionNumber {
    pub fn new(bucket_name: impl Into<String>, key: impl Into<String>, number: u32) -> Self {
        RepoId::new(bucket_name, key).number(number)
    }

    pub fn id(&self) -> &RepoId {
        &self.id
    }

    pub fn number(&self) -> u32 {
        self.number
    }
}

impl fmt::Debug for RepoVersionNumber {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "RepoVersionNumber({self})")
    }
}

impl fmt::Display for RepoVersionNumber {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}#{}", self.id, self.number)
    }
}

/// "The version in this chain carrying this tag."
///
/// Tags are not unique within a chain. Resolution picks the first match in
/// chain order, so callers must not rely on a tag naming a single version.
#[derive(Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RepoVersionTag {
    #[serde(flatten)]
    id: RepoId,
    tag: String,
}

impl RepoVersionTag {
    pub fn new(bucket_name: impl Into<String>, key: impl Into<String>, tag: impl Into<String>) -> Self {
        RepoId::new(bucket_name, key).tag(tag)
    }

    pub fn id(&self) -> &RepoId {
        &self.id
    }

    pub fn tag(&self) -> &str {
        &self.tag
    }
}

impl fmt::Debug for RepoVersionTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "RepoVersionTag({self})")
    }
}

impl fmt::Display for RepoVersionTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.id, self.tag)
    }
}
