use bytes::Bytes;
use crepo_types::{RepoId, RepoVersion, RepoVersionNumber, RepoVersionTag};

use crate::error::RepoResult;
use crate::input::{RepoCollectionInput, RepoObjectInput};
use crate::metadata::{
    BucketInfo, CollectionMetadata, ObjectMetadata, RepoConfigInfo, RepoStatus,
};
use crate::query::ListQuery;

/// The operation set of a versioned content repository.
///
/// Application code talks to this trait; the remote HTTP client and the
/// in-memory engine both implement it, and must be interchangeable behind
/// it. All implementations must satisfy these rules:
///
/// - A key's version ordinals run 0, 1, 2, ... with no gaps, and are never
///   reused or renumbered, deletions included.
/// - Delete is a soft status flip on one version. Deleting a version that is
///   already deleted returns `Ok(false)`.
/// - "Latest" is the newest version whose status is `USED`, not the highest
///   ordinal.
/// - Lookups by exact version, ordinal, or tag ignore status. Tag lookup
///   returns the first match in chain order.
/// - Returned metadata is a snapshot, never a live view. Content bytes come
///   only from the `read_*` operations.
/// - Failures are synchronous and never partial: a collection create with
///   one bad reference appends nothing.
pub trait ContentRepoService: Send + Sync {
    // ---- Config ----

    /// Whether the backend can hand out proxy redirect URLs for content.
    fn has_x_reproxy(&self) -> bool;

    fn repo_config(&self) -> RepoResult<RepoConfigInfo>;

    fn repo_status(&self) -> RepoResult<RepoStatus>;

    // ---- Buckets ----

    fn buckets(&self) -> RepoResult<Vec<BucketInfo>>;

    fn bucket(&self, name: &str) -> RepoResult<BucketInfo>;

    /// Fails with `AlreadyExists` if the bucket is present.
    fn create_bucket(&self, name: &str) -> RepoResult<BucketInfo>;

    // ---- Object content ----

    fn read_latest_object(&self, id: &RepoId) -> RepoResult<Bytes>;

    fn read_object(&self, version: &RepoVersion) -> RepoResult<Bytes>;

    fn read_object_by_number(&self, number: &RepoVersionNumber) -> RepoResult<Bytes>;

    // ---- Object metadata ----

    fn latest_object(&self, id: &RepoId) -> RepoResult<ObjectMetadata>;

    fn object(&self, version: &RepoVersion) -> RepoResult<ObjectMetadata>;

    fn object_by_number(&self, number: &RepoVersionNumber) -> RepoResult<ObjectMetadata>;

    fn object_by_tag(&self, tag: &RepoVersionTag) -> RepoResult<ObjectMetadata>;

    /// Every version of the key in creation order, deleted ones included.
    fn object_versions(&self, id: &RepoId) -> RepoResult<Vec<ObjectMetadata>>;

    fn list_objects(&self, bucket: &str, query: &ListQuery) -> RepoResult<Vec<ObjectMetadata>>;

    // ---- Object mutation ----

    /// Fails with `AlreadyExists` if the key has any version.
    fn create_object(&self, input: RepoObjectInput) -> RepoResult<ObjectMetadata>;

    /// Fails with `NotFound` if the key has no version.
    fn version_object(&self, input: RepoObjectInput) -> RepoResult<ObjectMetadata>;

    /// Creates ordinal 0 or appends the next ordinal, whichever applies.
    fn auto_create_object(&self, input: RepoObjectInput) -> RepoResult<ObjectMetadata>;

    fn delete_latest_object(&self, id: &RepoId) -> RepoResult<bool>;

    fn delete_object(&self, version: &RepoVersion) -> RepoResult<bool>;

    fn delete_object_by_number(&self, number: &RepoVersionNumber) -> RepoResult<bool>;

    // ---- Collections ----

    fn latest_collection(&self, id: &RepoId) -> RepoResult<CollectionMetadata>;

    fn collection(&self, version: &RepoVersion) -> RepoResult<CollectionMetadata>;

    fn collection_by_number(&self, number: &RepoVersionNumber) -> RepoResult<CollectionMetadata>;

    fn collection_by_tag(&self, tag: &RepoVersionTag) -> RepoResult<CollectionMetadata>;

    fn collection_versions(&self, id: &RepoId) -> RepoResult<Vec<CollectionMetadata>>;

    fn list_collections(
        &self,
        bucket: &str,
        query: &ListQuery,
    ) -> RepoResult<Vec<CollectionMetadata>>;

    /// Every member must resolve, or the call fails with
    /// `DanglingReference` and nothing is appended.
    fn create_collection(&self, input: RepoCollectionInput) -> RepoResult<CollectionMetadata>;

    fn version_collection(&self, input: RepoCollectionInput) -> RepoResult<CollectionMetadata>;

    fn auto_create_collection(&self, input: RepoCollectionInput)
        -> RepoResult<CollectionMetadata>;

    fn delete_collection(&self, version: &RepoVersion) -> RepoResult<bool>;

    fn delete_collection_by_number(&self, number: &RepoVersionNumber) -> RepoResult<bool>;
}
