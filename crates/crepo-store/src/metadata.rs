//! Immutable metadata snapshots handed back to callers.
//!
//! Snapshots are copies taken while the bucket lock is held; later changes
//! to the stored version (a soft delete, say) do not show through them.
//! They serialize to the repository's JSON shape with camelCase keys, and
//! optional fields that are unset are left out.

use chrono::{DateTime, Utc};
use crepo_crypto::Checksum;
use crepo_types::{RepoId, RepoVersion, RepoVersionNumber, Status, VersionId};
use serde::{Deserialize, Serialize};

/// Fields shared by object and collection versions.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VersionMetadata {
    pub bucket_name: String,
    pub key: String,
    pub version_id: VersionId,
    pub version_number: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tag: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_metadata: Option<String>,
    pub status: Status,
    pub creation_time: DateTime<Utc>,
    pub modification_time: DateTime<Utc>,
}

impl VersionMetadata {
    pub fn repo_id(&self) -> RepoId {
        RepoId::new(self.bucket_name.clone(), self.key.clone())
    }

    pub fn repo_version(&self) -> RepoVersion {
        self.repo_id().version(self.version_id)
    }

    pub fn repo_version_number(&self) -> RepoVersionNumber {
        self.repo_id().number(self.version_number)
    }
}

/// Snapshot of one object version. Content is fetched separately.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ObjectMetadata {
    #[serde(flatten)]
    pub version: VersionMetadata,
    pub checksum: Checksum,
    pub size: u64,
    pub content_type: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub download_name: Option<String>,
}

/// Snapshot of one collection version, with a snapshot of each member.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CollectionMetadata {
    #[serde(flatten)]
    pub version: VersionMetadata,
    pub objects: Vec<ObjectMetadata>,
}

impl CollectionMetadata {
    /// Locators of the member object versions, in member order.
    pub fn members(&self) -> Vec<RepoVersion> {
        self.objects.iter().map(|o| o.version.repo_version()).collect()
    }
}

/// Summary of one bucket.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BucketInfo {
    pub bucket_name: String,
    /// Object versions stored, deleted ones included.
    pub total_objects: usize,
    /// Collection versions stored, deleted ones included.
    pub total_collections: usize,
}

/// Static facts about the repository backend.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RepoConfigInfo {
    pub version: String,
    pub has_x_reproxy: bool,
}

/// Live counters of the repository backend.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RepoStatus {
    pub bucket_count: usize,
}
