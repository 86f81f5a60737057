use std::collections::{HashMap, HashSet};
use std::sync::{Arc, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

use bytes::Bytes;
use chrono::Utc;
use crepo_types::{validate_bucket_name, RepoId, RepoVersion, RepoVersionNumber, RepoVersionTag};
use tracing::{debug, info};

use crate::bucket::Bucket;
use crate::chain::Chains;
use crate::content::DEFAULT_FILE_CONTENT_TYPE;
use crate::entity::{CollectionVersion, EntityCore, ObjectVersion, Versioned};
use crate::error::{RepoError, RepoResult};
use crate::generator::{SequentialIdGenerator, VersionIdGenerator};
use crate::input::{RepoCollectionInput, RepoObjectInput};
use crate::metadata::{
    BucketInfo, CollectionMetadata, ObjectMetadata, RepoConfigInfo, RepoStatus, VersionMetadata,
};
use crate::query::ListQuery;
use crate::traits::ContentRepoService;

/// In-memory reference implementation of [`ContentRepoService`].
///
/// Intended for tests and local simulation of a repository server; nothing
/// is persisted. Each bucket sits behind its own `RwLock`: creates, versions
/// and deletes serialize on the bucket's write lock, which keeps ordinal
/// allocation gap-free, while reads and listings share its read lock and see
/// one consistent snapshot for the whole call.
///
/// Collection members may live in any bucket. A member is resolved under its
/// own bucket's read lock, and a collection is copied out of its bucket
/// before its members are resolved, so no operation holds two bucket locks
/// at once.
pub struct InMemoryContentRepo {
    buckets: RwLock<HashMap<String, Arc<RwLock<Bucket>>>>,
    initial_buckets: Vec<String>,
    ids: Box<dyn VersionIdGenerator>,
}

/// A collection version copied out of its bucket, members not yet resolved.
struct CollectionDraft {
    version: VersionMetadata,
    members: Vec<RepoVersion>,
}

impl CollectionDraft {
    fn of(collection: &CollectionVersion) -> Self {
        Self {
            version: collection.core().metadata(),
            members: collection.members().to_vec(),
        }
    }
}

/// What a write requires of the key's chain before appending.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Existence {
    MustBeAbsent,
    MustExist,
    Any,
}

impl InMemoryContentRepo {
    /// An empty repository with debug-friendly sequential version ids.
    pub fn new() -> Self {
        Self {
            buckets: RwLock::new(HashMap::new()),
            initial_buckets: Vec::new(),
            ids: Box::new(SequentialIdGenerator::new()),
        }
    }

    /// A repository that (re)creates `initial_buckets` on construction and
    /// on every [`clear`](Self::clear).
    pub fn with_initial_buckets<I, S>(initial_buckets: I) -> RepoResult<Self>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::with_generator(initial_buckets, Box::new(SequentialIdGenerator::new()))
    }

    /// Like [`with_initial_buckets`](Self::with_initial_buckets), with an
    /// explicit version id generator.
    pub fn with_generator<I, S>(
        initial_buckets: I,
        ids: Box<dyn VersionIdGenerator>,
    ) -> RepoResult<Self>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut seen = HashSet::new();
        let mut initial = Vec::new();
        for name in initial_buckets {
            let name = name.into();
            validate_bucket_name(&name)?;
            if seen.insert(name.clone()) {
                initial.push(name);
            }
        }

        let repo = Self {
            buckets: RwLock::new(HashMap::new()),
            initial_buckets: initial,
            ids,
        };
        repo.clear();
        Ok(repo)
    }

    /// Drop every bucket and recreate the initial ones.
    pub fn clear(&self) {
        let mut buckets = write_lock(&self.buckets);
        buckets.clear();
        for name in &self.initial_buckets {
            buckets.insert(name.clone(), Arc::new(RwLock::new(Bucket::new(name.clone()))));
        }
        info!(initial = self.initial_buckets.len(), "repository cleared");
    }

    pub fn has_bucket(&self, name: &str) -> bool {
        read_lock(&self.buckets).contains_key(name)
    }

    fn bucket_handle(&self, name: &str) -> RepoResult<Arc<RwLock<Bucket>>> {
        read_lock(&self.buckets)
            .get(name)
            .cloned()
            .ok_or_else(|| RepoError::BucketNotFound(name.to_string()))
    }

    fn read_bucket<T>(&self, name: &str, f: impl FnOnce(&Bucket) -> RepoResult<T>) -> RepoResult<T> {
        let handle = self.bucket_handle(name)?;
        let bucket = read_lock(&handle);
        f(&bucket)
    }

    fn write_bucket<T>(
        &self,
        name: &str,
        f: impl FnOnce(&mut Bucket) -> RepoResult<T>,
    ) -> RepoResult<T> {
        let handle = self.bucket_handle(name)?;
        let mut bucket = write_lock(&handle);
        f(&mut bucket)
    }

    fn put_object(&self, input: RepoObjectInput, existence: Existence) -> RepoResult<ObjectMetadata> {
        input.validate()?;
        let RepoObjectInput {
            id,
            content,
            content_type,
            download_name,
            tag,
            user_metadata,
        } = input;
        let content_type = content_type
            .filter(|t| !t.is_empty())
            .unwrap_or_else(|| DEFAULT_FILE_CONTENT_TYPE.to_string());

        let handle = self.bucket_handle(id.bucket_name())?;
        let content = content.drain().map_err(|source| RepoError::ContentRead {
            id: id.clone(),
            source,
        })?;

        let mut bucket = write_lock(&handle);
        check_existence(&bucket.objects, &id, existence)?;

        let number = bucket.objects.next_number(id.key());
        let core = EntityCore::new(
            id.version(self.ids.next_id()),
            number,
            tag,
            user_metadata,
            Utc::now(),
        );
        let created = bucket.objects.append(
            id.key(),
            ObjectVersion::new(core, content, content_type, download_name),
        );
        let meta = created.metadata();
        debug!(
            bucket = %meta.version.bucket_name,
            key = %meta.version.key,
            number,
            version = %meta.version.version_id,
            size = meta.size,
            "object version created"
        );
        Ok(meta)
    }

    fn put_collection(
        &self,
        input: RepoCollectionInput,
        existence: Existence,
    ) -> RepoResult<CollectionMetadata> {
        input.validate()?;
        let RepoCollectionInput {
            id,
            objects,
            tag,
            user_metadata,
        } = input;

        // Object versions are never removed, so a member resolved before the
        // write lock is taken is still there once it is held.
        let mut seen = HashSet::new();
        let mut members = Vec::with_capacity(objects.len());
        let mut snapshots = Vec::with_capacity(objects.len());
        for reference in objects {
            if seen.insert(reference.clone()) {
                snapshots.push(self.member(&id, &reference)?);
                members.push(reference);
            }
        }

        self.write_bucket(id.bucket_name(), |bucket| {
            check_existence(&bucket.collections, &id, existence)?;

            let number = bucket.collections.next_number(id.key());
            let core = EntityCore::new(
                id.version(self.ids.next_id()),
                number,
                tag,
                user_metadata,
                Utc::now(),
            );
            let member_count = members.len();
            let created = bucket
                .collections
                .append(id.key(), CollectionVersion::new(core, members));
            let meta = CollectionMetadata {
                version: created.core().metadata(),
                objects: snapshots,
            };
            debug!(
                bucket = %id.bucket_name(),
                key = %id.key(),
                number,
                version = %meta.version.version_id,
                members = member_count,
                "collection version created"
            );
            Ok(meta)
        })
    }

    /// Snapshot one collection member from its own bucket.
    fn member(&self, collection: &RepoId, reference: &RepoVersion) -> RepoResult<ObjectMetadata> {
        let dangling = || RepoError::DanglingReference {
            collection: collection.clone(),
            reference: reference.clone(),
        };
        let handle = self
            .bucket_handle(reference.id().bucket_name())
            .map_err(|_| dangling())?;
        let bucket = read_lock(&handle);
        bucket
            .objects
            .by_version(reference.id().key(), reference.version_id())
            .map(ObjectVersion::metadata)
            .ok_or_else(dangling)
    }

    fn resolve(&self, draft: CollectionDraft) -> RepoResult<CollectionMetadata> {
        let collection = draft.version.repo_id();
        let objects = draft
            .members
            .iter()
            .map(|reference| self.member(&collection, reference))
            .collect::<RepoResult<Vec<_>>>()?;
        Ok(CollectionMetadata {
            version: draft.version,
            objects,
        })
    }

    fn read_collection(
        &self,
        bucket: &str,
        find: impl FnOnce(&Chains<CollectionVersion>) -> RepoResult<CollectionDraft>,
    ) -> RepoResult<CollectionMetadata> {
        let draft = self.read_bucket(bucket, |b| find(&b.collections))?;
        self.resolve(draft)
    }
}

impl Default for InMemoryContentRepo {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for InMemoryContentRepo {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let count = read_lock(&self.buckets).len();
        f.debug_struct("InMemoryContentRepo")
            .field("bucket_count", &count)
            .field("ids", &self.ids)
            .finish()
    }
}

// Every mutation is a single push or a single status flip, so a poisoned
// lock never guards a half-written chain.
fn read_lock<T>(lock: &RwLock<T>) -> RwLockReadGuard<'_, T> {
    lock.read().unwrap_or_else(PoisonError::into_inner)
}

fn write_lock<T>(lock: &RwLock<T>) -> RwLockWriteGuard<'_, T> {
    lock.write().unwrap_or_else(PoisonError::into_inner)
}

fn check_existence<E: Versioned>(
    chains: &Chains<E>,
    id: &RepoId,
    existence: Existence,
) -> RepoResult<()> {
    let exists = chains.contains_key(id.key());
    match existence {
        Existence::MustBeAbsent if exists => Err(RepoError::KeyAlreadyExists(id.clone())),
        Existence::MustExist if !exists => Err(RepoError::KeyNotFound(id.clone())),
        _ => Ok(()),
    }
}

fn find_latest<'a, E: Versioned>(chains: &'a Chains<E>, id: &RepoId) -> RepoResult<&'a E> {
    if !chains.contains_key(id.key()) {
        return Err(RepoError::KeyNotFound(id.clone()));
    }
    chains
        .latest(id.key())
        .ok_or_else(|| RepoError::NoUsedVersion(id.clone()))
}

fn find_version<'a, E: Versioned>(chains: &'a Chains<E>, version: &RepoVersion) -> RepoResult<&'a E> {
    chains
        .by_version(version.id().key(), version.version_id())
        .ok_or_else(|| RepoError::VersionNotFound(version.to_string()))
}

fn find_number<'a, E: Versioned>(
    chains: &'a Chains<E>,
    number: &RepoVersionNumber,
) -> RepoResult<&'a E> {
    chains
        .by_number(number.id().key(), number.number())
        .ok_or_else(|| RepoError::VersionNotFound(number.to_string()))
}

fn find_tag<'a, E: Versioned>(chains: &'a Chains<E>, tag: &RepoVersionTag) -> RepoResult<&'a E> {
    chains
        .by_tag(tag.id().key(), tag.tag())
        .ok_or_else(|| RepoError::VersionNotFound(tag.to_string()))
}

fn soft_delete<E: Versioned>(entity: &mut E, kind: &str) -> bool {
    let deleted = entity.core_mut().soft_delete(Utc::now());
    let core = entity.core();
    debug!(
        version = %core.locator,
        number = core.number,
        deleted,
        "{kind} delete"
    );
    deleted
}

impl ContentRepoService for InMemoryContentRepo {
    fn has_x_reproxy(&self) -> bool {
        false
    }

    fn repo_config(&self) -> RepoResult<RepoConfigInfo> {
        Ok(RepoConfigInfo {
            version: format!("InMemoryContentRepo/{}", env!("CARGO_PKG_VERSION")),
            has_x_reproxy: self.has_x_reproxy(),
        })
    }

    fn repo_status(&self) -> RepoResult<RepoStatus> {
        Ok(RepoStatus {
            bucket_count: read_lock(&self.buckets).len(),
        })
    }

    fn buckets(&self) -> RepoResult<Vec<BucketInfo>> {
        let handles: Vec<Arc<RwLock<Bucket>>> = read_lock(&self.buckets).values().cloned().collect();
        let mut infos: Vec<BucketInfo> = handles.iter().map(|h| read_lock(h).info()).collect();
        infos.sort_by(|a, b| a.bucket_name.cmp(&b.bucket_name));
        Ok(infos)
    }

    fn bucket(&self, name: &str) -> RepoResult<BucketInfo> {
        self.read_bucket(name, |bucket| Ok(bucket.info()))
    }

    fn create_bucket(&self, name: &str) -> RepoResult<BucketInfo> {
        validate_bucket_name(name)?;
        let mut buckets = write_lock(&self.buckets);
        if buckets.contains_key(name) {
            return Err(RepoError::BucketAlreadyExists(name.to_string()));
        }
        let bucket = Bucket::new(name);
        let info = bucket.info();
        buckets.insert(name.to_string(), Arc::new(RwLock::new(bucket)));
        info!(bucket = %name, "bucket created");
        Ok(info)
    }

    fn read_latest_object(&self, id: &RepoId) -> RepoResult<Bytes> {
        self.read_bucket(id.bucket_name(), |b| Ok(find_latest(&b.objects, id)?.content()))
    }

    fn read_object(&self, version: &RepoVersion) -> RepoResult<Bytes> {
        self.read_bucket(version.id().bucket_name(), |b| {
            Ok(find_version(&b.objects, version)?.content())
        })
    }

    fn read_object_by_number(&self, number: &RepoVersionNumber) -> RepoResult<Bytes> {
        self.read_bucket(number.id().bucket_name(), |b| {
            Ok(find_number(&b.objects, number)?.content())
        })
    }

    fn latest_object(&self, id: &RepoId) -> RepoResult<ObjectMetadata> {
        self.read_bucket(id.bucket_name(), |b| Ok(find_latest(&b.objects, id)?.metadata()))
    }

    fn object(&self, version: &RepoVersion) -> RepoResult<ObjectMetadata> {
        self.read_bucket(version.id().bucket_name(), |b| {
            Ok(find_version(&b.objects, version)?.metadata())
        })
    }

    fn object_by_number(&self, number: &RepoVersionNumber) -> RepoResult<ObjectMetadata> {
        self.read_bucket(number.id().bucket_name(), |b| {
            Ok(find_number(&b.objects, number)?.metadata())
        })
    }

    fn object_by_tag(&self, tag: &RepoVersionTag) -> RepoResult<ObjectMetadata> {
        self.read_bucket(tag.id().bucket_name(), |b| Ok(find_tag(&b.objects, tag)?.metadata()))
    }

    fn object_versions(&self, id: &RepoId) -> RepoResult<Vec<ObjectMetadata>> {
        self.read_bucket(id.bucket_name(), |b| {
            Ok(b.objects.chain(id.key()).iter().map(ObjectVersion::metadata).collect())
        })
    }

    fn list_objects(&self, bucket: &str, query: &ListQuery) -> RepoResult<Vec<ObjectMetadata>> {
        self.read_bucket(bucket, |b| {
            let page: Vec<ObjectMetadata> = b.objects.page(query).map(ObjectVersion::metadata).collect();
            debug!(bucket, offset = query.offset, limit = query.limit, returned = page.len(), "objects listed");
            Ok(page)
        })
    }

    fn create_object(&self, input: RepoObjectInput) -> RepoResult<ObjectMetadata> {
        self.put_object(input, Existence::MustBeAbsent)
    }

    fn version_object(&self, input: RepoObjectInput) -> RepoResult<ObjectMetadata> {
        self.put_object(input, Existence::MustExist)
    }

    fn auto_create_object(&self, input: RepoObjectInput) -> RepoResult<ObjectMetadata> {
        self.put_object(input, Existence::Any)
    }

    fn delete_latest_object(&self, id: &RepoId) -> RepoResult<bool> {
        self.write_bucket(id.bucket_name(), |b| {
            Ok(b.objects
                .latest_mut(id.key())
                .map_or(false, |e| soft_delete(e, "object")))
        })
    }

    fn delete_object(&self, version: &RepoVersion) -> RepoResult<bool> {
        self.write_bucket(version.id().bucket_name(), |b| {
            let entity = b
                .objects
                .by_version_mut(version.id().key(), version.version_id())
                .ok_or_else(|| RepoError::VersionNotFound(version.to_string()))?;
            Ok(soft_delete(entity, "object"))
        })
    }

    fn delete_object_by_number(&self, number: &RepoVersionNumber) -> RepoResult<bool> {
        self.write_bucket(number.id().bucket_name(), |b| {
            let entity = b
                .objects
                .by_number_mut(number.id().key(), number.number())
                .ok_or_else(|| RepoError::VersionNotFound(number.to_string()))?;
            Ok(soft_delete(entity, "object"))
        })
    }

    fn latest_collection(&self, id: &RepoId) -> RepoResult<CollectionMetadata> {
        self.read_collection(id.bucket_name(), |c| {
            find_latest(c, id).map(CollectionDraft::of)
        })
    }

    fn collection(&self, version: &RepoVersion) -> RepoResult<CollectionMetadata> {
        self.read_collection(version.id().bucket_name(), |c| {
            find_version(c, version).map(CollectionDraft::of)
        })
    }

    fn collection_by_number(&self, number: &RepoVersionNumber) -> RepoResult<CollectionMetadata> {
        self.read_collection(number.id().bucket_name(), |c| {
            find_number(c, number).map(CollectionDraft::of)
        })
    }

    fn collection_by_tag(&self, tag: &RepoVersionTag) -> RepoResult<CollectionMetadata> {
        self.read_collection(tag.id().bucket_name(), |c| {
            find_tag(c, tag).map(CollectionDraft::of)
        })
    }

    fn collection_versions(&self, id: &RepoId) -> RepoResult<Vec<CollectionMetadata>> {
        let drafts: Vec<CollectionDraft> = self.read_bucket(id.bucket_name(), |b| {
            Ok(b.collections.chain(id.key()).iter().map(CollectionDraft::of).collect())
        })?;
        drafts.into_iter().map(|d| self.resolve(d)).collect()
    }

    fn list_collections(
        &self,
        bucket: &str,
        query: &ListQuery,
    ) -> RepoResult<Vec<CollectionMetadata>> {
        // The page is fixed under the bucket's read lock; members are
        // resolved after it is released.
        let drafts: Vec<CollectionDraft> = self.read_bucket(bucket, |b| {
            Ok(b.collections.page(query).map(CollectionDraft::of).collect())
        })?;
        let page = drafts
            .into_iter()
            .map(|d| self.resolve(d))
            .collect::<RepoResult<Vec<_>>>()?;
        debug!(bucket, offset = query.offset, limit = query.limit, returned = page.len(), "collections listed");
        Ok(page)
    }

    fn create_collection(&self, input: RepoCollectionInput) -> RepoResult<CollectionMetadata> {
        self.put_collection(input, Existence::MustBeAbsent)
    }

    fn version_collection(&self, input: RepoCollectionInput) -> RepoResult<CollectionMetadata> {
        self.put_collection(input, Existence::MustExist)
    }

    fn auto_create_collection(
        &self,
        input: RepoCollectionInput,
    ) -> RepoResult<CollectionMetadata> {
        self.put_collection(input, Existence::Any)
    }

    fn delete_collection(&self, version: &RepoVersion) -> RepoResult<bool> {
        self.write_bucket(version.id().bucket_name(), |b| {
            let entity = b
                .collections
                .by_version_mut(version.id().key(), version.version_id())
                .ok_or_else(|| RepoError::VersionNotFound(version.to_string()))?;
            Ok(soft_delete(entity, "collection"))
        })
    }

    fn delete_collection_by_number(&self, number: &RepoVersionNumber) -> RepoResult<bool> {
        self.write_bucket(number.id().bucket_name(), |b| {
            let entity = b
                .collections
                .by_number_mut(number.id().key(), number.number())
                .ok_or_else(|| RepoError::VersionNotFound(number.to_string()))?;
            Ok(soft_delete(entity, "collection"))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::content::ContentSource;
    use crate::error::ErrorKind;
    use crate::generator::RandomIdGenerator;
    use crepo_crypto::Checksum;
    use crepo_types::{Status, VersionId};

    const BUCKET: &str = "corpus";

    fn repo() -> InMemoryContentRepo {
        InMemoryContentRepo::with_initial_buckets([BUCKET]).unwrap()
    }

    fn id(key: &str) -> RepoId {
        RepoId::new(BUCKET, key)
    }

    fn text(key: &str, body: &'static str) -> RepoObjectInput {
        RepoObjectInput::new(id(key), body).with_content_type("text/plain")
    }

    fn tagged(key: &str, body: &'static str, tag: &str) -> RepoObjectInput {
        text(key, body).with_tag(tag)
    }

    // -----------------------------------------------------------------------
    // Buckets
    // -----------------------------------------------------------------------

    #[test]
    fn initial_buckets_exist() {
        let repo = repo();
        assert!(repo.has_bucket(BUCKET));
        assert_eq!(repo.bucket(BUCKET).unwrap().total_objects, 0);
    }

    #[test]
    fn create_bucket_twice_fails() {
        let repo = InMemoryContentRepo::new();
        repo.create_bucket("fresh").unwrap();
        let err = repo.create_bucket("fresh").unwrap_err();
        assert_eq!(err.kind(), ErrorKind::AlreadyExists);
    }

    #[test]
    fn buckets_are_never_implicit() {
        let repo = InMemoryContentRepo::new();
        let err = repo.create_object(text("doc", "x")).unwrap_err();
        assert!(matches!(err, RepoError::BucketNotFound(_)));
        assert!(!repo.has_bucket(BUCKET));
    }

    #[test]
    fn invalid_bucket_name_rejected() {
        let repo = InMemoryContentRepo::new();
        assert_eq!(repo.create_bucket("").unwrap_err().kind(), ErrorKind::InvalidArgument);
        assert!(InMemoryContentRepo::with_initial_buckets(["bad name"]).is_err());
    }

    #[test]
    fn buckets_listed_by_name_with_counts() {
        let repo = InMemoryContentRepo::with_initial_buckets(["zeta", "alpha"]).unwrap();
        repo.create_object(
            RepoObjectInput::new(RepoId::new("zeta", "k"), "x").with_content_type("text/plain"),
        )
        .unwrap();
        let infos = repo.buckets().unwrap();
        let names: Vec<&str> = infos.iter().map(|b| b.bucket_name.as_str()).collect();
        assert_eq!(names, vec!["alpha", "zeta"]);
        assert_eq!(infos[1].total_objects, 1);
        assert_eq!(repo.repo_status().unwrap().bucket_count, 2);
    }

    #[test]
    fn clear_restores_initial_buckets_only() {
        let repo = repo();
        repo.create_bucket("scratch").unwrap();
        repo.create_object(text("doc", "x")).unwrap();
        repo.clear();
        assert!(repo.has_bucket(BUCKET));
        assert!(!repo.has_bucket("scratch"));
        assert_eq!(repo.bucket(BUCKET).unwrap().total_objects, 0);
    }

    #[test]
    fn repo_config_reports_no_reproxy() {
        let repo = repo();
        let config = repo.repo_config().unwrap();
        assert!(!config.has_x_reproxy);
        assert!(config.version.starts_with("InMemoryContentRepo/"));
    }

    // -----------------------------------------------------------------------
    // Create / version / auto-create
    // -----------------------------------------------------------------------

    #[test]
    fn create_assigns_ordinal_zero() {
        let repo = repo();
        let meta = repo.create_object(text("doc", "hello")).unwrap();
        assert_eq!(meta.version.version_number, 0);
        assert_eq!(meta.version.status, Status::Used);
        assert_eq!(meta.version.creation_time, meta.version.modification_time);
        assert_eq!(meta.content_type, "text/plain");
    }

    #[test]
    fn create_on_existing_key_fails() {
        let repo = repo();
        repo.create_object(text("doc", "a")).unwrap();
        let err = repo.create_object(text("doc", "b")).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::AlreadyExists);
        assert_eq!(repo.object_versions(&id("doc")).unwrap().len(), 1);
    }

    #[test]
    fn create_fails_even_if_every_version_is_deleted() {
        let repo = repo();
        repo.create_object(text("doc", "a")).unwrap();
        repo.delete_object_by_number(&id("doc").number(0)).unwrap();
        let err = repo.create_object(text("doc", "b")).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::AlreadyExists);
    }

    #[test]
    fn version_on_missing_key_fails() {
        let repo = repo();
        let err = repo.version_object(text("doc", "a")).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NotFound);
        assert!(repo.object_versions(&id("doc")).unwrap().is_empty());
    }

    #[test]
    fn auto_create_succeeds_either_way() {
        let repo = repo();
        assert_eq!(repo.auto_create_object(text("doc", "a")).unwrap().version.version_number, 0);
        assert_eq!(repo.auto_create_object(text("doc", "b")).unwrap().version.version_number, 1);
    }

    #[test]
    fn ordinals_gap_free_across_deletes() {
        let repo = repo();
        repo.create_object(text("doc", "0")).unwrap();
        repo.version_object(text("doc", "1")).unwrap();
        repo.delete_object_by_number(&id("doc").number(1)).unwrap();
        repo.version_object(text("doc", "2")).unwrap();
        repo.delete_object_by_number(&id("doc").number(0)).unwrap();
        repo.delete_object_by_number(&id("doc").number(2)).unwrap();
        let next = repo.version_object(text("doc", "3")).unwrap();
        assert_eq!(next.version.version_number, 3);

        let numbers: Vec<u32> = repo
            .object_versions(&id("doc"))
            .unwrap()
            .iter()
            .map(|m| m.version.version_number)
            .collect();
        assert_eq!(numbers, vec![0, 1, 2, 3]);
    }

    #[test]
    fn version_ids_are_distinct_and_sequential() {
        let repo = repo();
        let a = repo.create_object(text("a", "x")).unwrap();
        let b = repo.create_object(text("b", "x")).unwrap();
        assert_ne!(a.version.version_id, b.version.version_id);
        assert_eq!(a.version.version_id.short_hex(), "00000001");
        assert_eq!(b.version.version_id.short_hex(), "00000002");
    }

    #[test]
    fn generator_is_pluggable() {
        let repo =
            InMemoryContentRepo::with_generator([BUCKET], Box::new(RandomIdGenerator)).unwrap();
        let meta = repo.create_object(text("doc", "x")).unwrap();
        assert_eq!(meta.version.version_id.version_nibble(), 4);
    }

    #[test]
    fn missing_content_type_rejected() {
        let repo = repo();
        let err = repo
            .create_object(RepoObjectInput::new(id("doc"), "x"))
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidArgument);
    }

    #[test]
    fn empty_key_rejected() {
        let repo = repo();
        let err = repo.create_object(text("", "x")).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidArgument);
    }

    #[test]
    fn file_content_defaults_content_type() {
        use std::io::Write;

        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(b"from disk").unwrap();
        let repo = repo();
        let meta = repo
            .create_object(RepoObjectInput::new(id("doc"), ContentSource::from_file(file.path())))
            .unwrap();
        assert_eq!(meta.content_type, DEFAULT_FILE_CONTENT_TYPE);
        assert_eq!(&repo.read_object(&meta.version.repo_version()).unwrap()[..], b"from disk");
    }

    #[test]
    fn unreadable_source_is_io_and_appends_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let repo = repo();
        let err = repo
            .create_object(RepoObjectInput::new(
                id("doc"),
                ContentSource::from_file(dir.path().join("missing")),
            ))
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Io);
        assert!(repo.object_versions(&id("doc")).unwrap().is_empty());
    }

    #[test]
    fn optional_fields_round_trip() {
        let repo = repo();
        let meta = repo
            .create_object(
                text("doc", "x")
                    .with_tag("draft")
                    .with_user_metadata("{\"owner\":\"ops\"}")
                    .with_download_name("doc.txt"),
            )
            .unwrap();
        let fetched = repo.object(&meta.version.repo_version()).unwrap();
        assert_eq!(fetched.version.tag.as_deref(), Some("draft"));
        assert_eq!(fetched.version.user_metadata.as_deref(), Some("{\"owner\":\"ops\"}"));
        assert_eq!(fetched.download_name.as_deref(), Some("doc.txt"));
    }

    // -----------------------------------------------------------------------
    // Content round-trip
    // -----------------------------------------------------------------------

    #[test]
    fn content_round_trips_with_checksum() {
        let repo = repo();
        let payload: Vec<u8> = (0..=255u8).cycle().take(10_000).collect();
        let meta = repo
            .create_object(
                RepoObjectInput::new(id("bin"), payload.clone())
                    .with_content_type("application/octet-stream"),
            )
            .unwrap();
        let fetched = repo.read_object(&meta.version.repo_version()).unwrap();
        assert_eq!(&fetched[..], &payload[..]);
        assert_eq!(meta.checksum, Checksum::of(&payload));
        assert_eq!(meta.size, payload.len() as u64);
        assert_eq!(&repo.read_object_by_number(&id("bin").number(0)).unwrap()[..], &payload[..]);
    }

    #[test]
    fn reader_source_is_drained_once() {
        let repo = repo();
        let reader = std::io::Cursor::new(b"streamed".to_vec());
        let meta = repo
            .create_object(
                RepoObjectInput::new(id("doc"), ContentSource::from_reader(reader))
                    .with_content_type("text/plain"),
            )
            .unwrap();
        assert_eq!(meta.checksum, Checksum::of(b"streamed"));
        assert_eq!(&repo.read_latest_object(&id("doc")).unwrap()[..], b"streamed");
    }

    // -----------------------------------------------------------------------
    // Lookup
    // -----------------------------------------------------------------------

    #[test]
    fn unknown_version_is_not_found() {
        let repo = repo();
        repo.create_object(text("doc", "x")).unwrap();
        let bogus = id("doc").version(VersionId::from_u64_pair(99, 99));
        assert_eq!(repo.object(&bogus).unwrap_err().kind(), ErrorKind::NotFound);
        assert_eq!(
            repo.object_by_number(&id("doc").number(5)).unwrap_err().kind(),
            ErrorKind::NotFound
        );
        assert_eq!(
            repo.object_by_tag(&id("doc").tag("nope")).unwrap_err().kind(),
            ErrorKind::NotFound
        );
        assert_eq!(repo.latest_object(&id("other")).unwrap_err().kind(), ErrorKind::NotFound);
    }

    #[test]
    fn version_id_is_scoped_to_its_key() {
        let repo = repo();
        let meta = repo.create_object(text("a", "x")).unwrap();
        let wrong_key = id("b").version(meta.version.version_id);
        assert!(repo.object(&wrong_key).is_err());
    }

    #[test]
    fn deleted_version_still_fetchable_by_exact_locator() {
        let repo = repo();
        let meta = repo.create_object(tagged("doc", "x", "t")).unwrap();
        repo.delete_object(&meta.version.repo_version()).unwrap();

        let by_version = repo.object(&meta.version.repo_version()).unwrap();
        assert_eq!(by_version.version.status, Status::Deleted);
        assert!(by_version.version.modification_time >= by_version.version.creation_time);
        assert!(repo.object_by_number(&id("doc").number(0)).is_ok());
        assert!(repo.object_by_tag(&id("doc").tag("t")).is_ok());
        assert!(repo.read_object(&meta.version.repo_version()).is_ok());
    }

    #[test]
    fn tag_lookup_returns_first_match() {
        let repo = repo();
        repo.create_object(tagged("doc", "first", "dup")).unwrap();
        repo.version_object(text("doc", "untagged")).unwrap();
        repo.version_object(tagged("doc", "third", "dup")).unwrap();
        let meta = repo.object_by_tag(&id("doc").tag("dup")).unwrap();
        assert_eq!(meta.version.version_number, 0);
    }

    #[test]
    fn latest_exposes_older_used_version() {
        let repo = repo();
        repo.create_object(text("doc", "a")).unwrap();
        repo.version_object(text("doc", "b")).unwrap();
        repo.delete_object_by_number(&id("doc").number(1)).unwrap();
        let latest = repo.latest_object(&id("doc")).unwrap();
        assert_eq!(latest.version.version_number, 0);
    }

    #[test]
    fn latest_after_deleting_only_version_is_not_found() {
        let repo = repo();
        repo.create_object(text("doc", "a")).unwrap();
        repo.delete_object_by_number(&id("doc").number(0)).unwrap();
        let err = repo.latest_object(&id("doc")).unwrap_err();
        assert!(matches!(err, RepoError::NoUsedVersion(_)));
        assert_eq!(err.kind(), ErrorKind::NotFound);
    }

    #[test]
    fn metadata_is_a_snapshot() {
        let repo = repo();
        let before = repo.create_object(text("doc", "a")).unwrap();
        repo.delete_object(&before.version.repo_version()).unwrap();
        assert_eq!(before.version.status, Status::Used);
    }

    #[test]
    fn object_versions_of_unknown_bucket_fails() {
        let repo = repo();
        let err = repo.object_versions(&RepoId::new("nope", "k")).unwrap_err();
        assert!(matches!(err, RepoError::BucketNotFound(_)));
    }

    // -----------------------------------------------------------------------
    // Delete
    // -----------------------------------------------------------------------

    #[test]
    fn double_delete_returns_false() {
        let repo = repo();
        let meta = repo.create_object(text("doc", "a")).unwrap();
        let v = meta.version.repo_version();
        assert!(repo.delete_object(&v).unwrap());
        assert!(!repo.delete_object(&v).unwrap());
        assert!(!repo.delete_object(&v).unwrap());
        assert!(!repo.delete_object_by_number(&id("doc").number(0)).unwrap());
    }

    #[test]
    fn delete_leaves_other_versions_untouched() {
        let repo = repo();
        repo.create_object(text("doc", "a")).unwrap();
        repo.version_object(text("doc", "b")).unwrap();
        repo.version_object(text("doc", "c")).unwrap();
        let before = repo.object_versions(&id("doc")).unwrap();

        repo.delete_object_by_number(&id("doc").number(1)).unwrap();
        let after = repo.object_versions(&id("doc")).unwrap();

        for i in [0usize, 2] {
            assert_eq!(after[i], before[i]);
        }
        assert_eq!(after[1].version.status, Status::Deleted);
        assert_eq!(after[1].version.version_id, before[1].version.version_id);
        assert_eq!(after[1].version.version_number, 1);
    }

    #[test]
    fn delete_unknown_version_is_not_found() {
        let repo = repo();
        let err = repo.delete_object_by_number(&id("doc").number(0)).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NotFound);
    }

    #[test]
    fn delete_latest_walks_backwards() {
        let repo = repo();
        repo.create_object(text("doc", "a")).unwrap();
        repo.version_object(text("doc", "b")).unwrap();

        assert!(repo.delete_latest_object(&id("doc")).unwrap());
        assert!(repo.delete_latest_object(&id("doc")).unwrap());
        assert!(!repo.delete_latest_object(&id("doc")).unwrap());

        let statuses: Vec<Status> = repo
            .object_versions(&id("doc"))
            .unwrap()
            .iter()
            .map(|m| m.version.status)
            .collect();
        assert_eq!(statuses, vec![Status::Deleted, Status::Deleted]);
        assert!(!repo.delete_latest_object(&id("never")).unwrap());
    }

    // -----------------------------------------------------------------------
    // Listing
    // -----------------------------------------------------------------------

    #[test]
    fn list_follows_insertion_order() {
        let repo = repo();
        repo.create_object(text("b", "x")).unwrap();
        repo.create_object(text("a", "x")).unwrap();
        repo.version_object(text("b", "y")).unwrap();
        let listed: Vec<(String, u32)> = repo
            .list_objects(BUCKET, &ListQuery::new(0, 10))
            .unwrap()
            .into_iter()
            .map(|m| (m.version.key, m.version.version_number))
            .collect();
        assert_eq!(
            listed,
            vec![("b".into(), 0), ("a".into(), 0), ("b".into(), 1)]
        );
    }

    #[test]
    fn list_with_zero_limit_is_empty() {
        let repo = repo();
        for i in 0..5 {
            repo.create_object(text(&format!("k{i}"), "x")).unwrap();
        }
        let page = repo.list_objects(BUCKET, &ListQuery::new(0, 0)).unwrap();
        assert!(page.is_empty());
    }

    #[test]
    fn list_pages_through_matches() {
        let repo = repo();
        for i in 0..7 {
            repo.create_object(text(&format!("k{i}"), "x")).unwrap();
        }
        let page = repo.list_objects(BUCKET, &ListQuery::new(3, 2)).unwrap();
        let keys: Vec<&str> = page.iter().map(|m| m.version.key.as_str()).collect();
        assert_eq!(keys, vec!["k3", "k4"]);

        let tail = repo.list_objects(BUCKET, &ListQuery::new(6, 10)).unwrap();
        assert_eq!(tail.len(), 1);
        assert!(repo.list_objects(BUCKET, &ListQuery::new(20, 10)).unwrap().is_empty());
    }

    #[test]
    fn list_filters_deleted_and_tags() {
        let repo = repo();
        repo.create_object(tagged("a", "x", "x")).unwrap();
        repo.create_object(tagged("b", "x", "y")).unwrap();
        repo.create_object(text("c", "x")).unwrap();
        let d = repo.create_object(tagged("d", "x", "x")).unwrap();
        repo.delete_object(&d.version.repo_version()).unwrap();

        let used = repo.list_objects(BUCKET, &ListQuery::new(0, 10)).unwrap();
        assert_eq!(used.len(), 3);

        let tagged_x = repo.list_objects(BUCKET, &ListQuery::new(0, 10).with_tag("x")).unwrap();
        let keys: Vec<&str> = tagged_x.iter().map(|m| m.version.key.as_str()).collect();
        assert_eq!(keys, vec!["a"]);

        let with_deleted = repo
            .list_objects(BUCKET, &ListQuery::new(0, 10).with_tag("x").include_deleted(true))
            .unwrap();
        assert_eq!(with_deleted.len(), 2);
        assert!(with_deleted.iter().all(|m| m.version.tag.as_deref() == Some("x")));
    }

    #[test]
    fn list_unknown_bucket_fails() {
        let repo = repo();
        let err = repo.list_objects("nope", &ListQuery::new(0, 1)).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NotFound);
    }

    // -----------------------------------------------------------------------
    // Collections
    // -----------------------------------------------------------------------

    #[test]
    fn collection_references_object_versions() {
        let repo = repo();
        let a = repo.create_object(text("a", "alpha")).unwrap();
        let b = repo.create_object(text("b", "beta")).unwrap();
        let coll = repo
            .create_collection(
                RepoCollectionInput::new(
                    id("set"),
                    [a.version.repo_version(), b.version.repo_version()],
                )
                .with_tag("v1"),
            )
            .unwrap();
        assert_eq!(coll.version.version_number, 0);
        assert_eq!(coll.objects, vec![a.clone(), b.clone()]);
        assert_eq!(coll.members(), vec![a.version.repo_version(), b.version.repo_version()]);
        assert_eq!(repo.bucket(BUCKET).unwrap().total_collections, 1);
    }

    #[test]
    fn dangling_reference_creates_nothing() {
        let repo = repo();
        let a = repo.create_object(text("a", "alpha")).unwrap();
        let ghost = id("ghost").version(VersionId::from_u64_pair(1, 1));
        let err = repo
            .create_collection(RepoCollectionInput::new(
                id("set"),
                [a.version.repo_version(), ghost],
            ))
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::DanglingReference);
        assert!(repo.collection_versions(&id("set")).unwrap().is_empty());
        assert_eq!(repo.bucket(BUCKET).unwrap().total_collections, 0);
    }

    #[test]
    fn members_resolve_in_their_own_bucket() {
        let repo = InMemoryContentRepo::with_initial_buckets([BUCKET, "other"]).unwrap();
        let elsewhere = repo
            .create_object(
                RepoObjectInput::new(RepoId::new("other", "a"), "x").with_content_type("text/plain"),
            )
            .unwrap();
        let local = repo.create_object(text("a", "y")).unwrap();

        let coll = repo
            .create_collection(RepoCollectionInput::new(
                id("set"),
                [elsewhere.version.repo_version(), local.version.repo_version()],
            ))
            .unwrap();
        assert_eq!(coll.objects, vec![elsewhere.clone(), local]);
        assert_eq!(coll.objects[0].version.bucket_name, "other");

        repo.delete_object(&elsewhere.version.repo_version()).unwrap();
        let refetched = repo.latest_collection(&id("set")).unwrap();
        assert_eq!(refetched.objects[0].version.status, Status::Deleted);
        assert_eq!(repo.list_collections(BUCKET, &ListQuery::new(0, 10)).unwrap().len(), 1);
        assert_eq!(repo.bucket("other").unwrap().total_collections, 0);
    }

    #[test]
    fn member_in_unknown_bucket_is_dangling() {
        let repo = repo();
        let ghost = RepoId::new("nowhere", "a").version(VersionId::from_u64_pair(1, 1));
        let err = repo
            .create_collection(RepoCollectionInput::new(id("set"), [ghost]))
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::DanglingReference);
        assert!(repo.collection_versions(&id("set")).unwrap().is_empty());
    }

    #[test]
    fn deleted_object_versions_remain_referencable() {
        let repo = repo();
        let a = repo.create_object(text("a", "x")).unwrap();
        repo.delete_object(&a.version.repo_version()).unwrap();
        let coll = repo
            .create_collection(RepoCollectionInput::new(id("set"), [a.version.repo_version()]))
            .unwrap();
        assert_eq!(coll.objects[0].version.status, Status::Deleted);
    }

    #[test]
    fn duplicate_members_collapse() {
        let repo = repo();
        let a = repo.create_object(text("a", "x")).unwrap();
        let v = a.version.repo_version();
        let coll = repo
            .create_collection(RepoCollectionInput::new(id("set"), [v.clone(), v]))
            .unwrap();
        assert_eq!(coll.objects.len(), 1);
    }

    #[test]
    fn collection_lifecycle_mirrors_objects() {
        let repo = repo();
        let a0 = repo.create_object(text("a", "x")).unwrap();
        let a1 = repo.version_object(text("a", "y")).unwrap();

        let c0 = repo
            .create_collection(RepoCollectionInput::new(id("set"), [a0.version.repo_version()]))
            .unwrap();
        assert_eq!(
            repo.create_collection(RepoCollectionInput::new(id("set"), Vec::new()))
                .unwrap_err()
                .kind(),
            ErrorKind::AlreadyExists
        );
        assert_eq!(
            repo.version_collection(RepoCollectionInput::new(id("missing"), Vec::new()))
                .unwrap_err()
                .kind(),
            ErrorKind::NotFound
        );
        let c1 = repo
            .version_collection(
                RepoCollectionInput::new(id("set"), [a1.version.repo_version()]).with_tag("t"),
            )
            .unwrap();
        assert_eq!(c1.version.version_number, 1);
        let c2 = repo
            .auto_create_collection(RepoCollectionInput::new(id("set"), Vec::new()))
            .unwrap();
        assert_eq!(c2.version.version_number, 2);

        assert_eq!(repo.latest_collection(&id("set")).unwrap().version.version_number, 2);
        assert!(repo.delete_collection(&c2.version.repo_version()).unwrap());
        assert!(!repo.delete_collection_by_number(&id("set").number(2)).unwrap());
        assert_eq!(repo.latest_collection(&id("set")).unwrap().version.version_number, 1);

        assert_eq!(repo.collection(&c0.version.repo_version()).unwrap(), c0);
        assert_eq!(repo.collection_by_number(&id("set").number(1)).unwrap().objects, vec![a1]);
        assert_eq!(repo.collection_by_tag(&id("set").tag("t")).unwrap().version.version_number, 1);

        let versions = repo.collection_versions(&id("set")).unwrap();
        assert_eq!(versions.len(), 3);
        assert_eq!(versions[2].version.status, Status::Deleted);

        let listed = repo.list_collections(BUCKET, &ListQuery::new(0, 10)).unwrap();
        assert_eq!(listed.len(), 2);
        let all = repo
            .list_collections(BUCKET, &ListQuery::new(0, 10).include_deleted(true))
            .unwrap();
        assert_eq!(all.len(), 3);
    }

    #[test]
    fn collection_and_object_key_spaces_are_independent() {
        let repo = repo();
        let a = repo.create_object(text("same", "x")).unwrap();
        let coll = repo
            .create_collection(RepoCollectionInput::new(id("same"), [a.version.repo_version()]))
            .unwrap();
        assert_eq!(coll.version.version_number, 0);
    }

    #[test]
    fn collection_snapshot_reflects_member_status_at_fetch() {
        let repo = repo();
        let a = repo.create_object(text("a", "x")).unwrap();
        let coll = repo
            .create_collection(RepoCollectionInput::new(id("set"), [a.version.repo_version()]))
            .unwrap();
        repo.delete_object(&a.version.repo_version()).unwrap();
        assert_eq!(coll.objects[0].version.status, Status::Used);
        let refetched = repo.collection(&coll.version.repo_version()).unwrap();
        assert_eq!(refetched.objects[0].version.status, Status::Deleted);
    }

    // -----------------------------------------------------------------------
    // Scenario
    // -----------------------------------------------------------------------

    #[test]
    fn doc1_lifecycle() {
        let repo = repo();
        let v0 = repo.create_object(text("doc1", "hello")).unwrap();
        assert_eq!(v0.version.version_number, 0);
        assert_eq!(v0.version.status, Status::Used);

        let v1 = repo.version_object(text("doc1", "world")).unwrap();
        assert_eq!(v1.version.version_number, 1);

        assert!(repo.delete_object_by_number(&id("doc1").number(1)).unwrap());
        let latest = repo.latest_object(&id("doc1")).unwrap();
        assert_eq!(latest.version.version_number, 0);
        assert_eq!(&repo.read_latest_object(&id("doc1")).unwrap()[..], b"hello");

        assert!(repo.delete_object_by_number(&id("doc1").number(0)).unwrap());
        assert_eq!(repo.latest_object(&id("doc1")).unwrap_err().kind(), ErrorKind::NotFound);
        assert_eq!(repo.read_latest_object(&id("doc1")).unwrap_err().kind(), ErrorKind::NotFound);
    }

    // -----------------------------------------------------------------------
    // Concurrency
    // -----------------------------------------------------------------------

    #[test]
    fn concurrent_auto_creates_stay_gap_free() {
        use std::thread;

        let repo = Arc::new(repo());
        let handles: Vec<_> = (0..8)
            .map(|_| {
                let repo = Arc::clone(&repo);
                thread::spawn(move || {
                    for _ in 0..25 {
                        repo.auto_create_object(text("hot", "x")).unwrap();
                    }
                })
            })
            .collect();
        for h in handles {
            h.join().expect("thread should not panic");
        }

        let numbers: Vec<u32> = repo
            .object_versions(&id("hot"))
            .unwrap()
            .iter()
            .map(|m| m.version.version_number)
            .collect();
        assert_eq!(numbers, (0..200).collect::<Vec<u32>>());
    }

    #[test]
    fn debug_format() {
        let repo = repo();
        let debug = format!("{repo:?}");
        assert!(debug.contains("InMemoryContentRepo"));
        assert!(debug.contains("bucket_count"));
    }
}
