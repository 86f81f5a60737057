use std::sync::Arc;

use bytes::Bytes;
use crepo_store::{
    BucketInfo, CollectionMetadata, ContentRepoService, ContentSource, InMemoryContentRepo,
    ListQuery, ObjectMetadata, RepoCollectionInput, RepoError, RepoObjectInput,
};
use crepo_types::{validate_key, RepoId, RepoVersion, VersionId};
use tracing::info;

use crate::config::ClientConfig;
use crate::error::{SdkError, SdkResult};

/// Key-based access to one bucket of a [`ContentRepoService`].
///
/// Every call is scoped to the bucket the client was bound to; keys are
/// validated before the service sees them. Clients are cheap to clone and
/// share the underlying service.
pub struct ContentRepoClient<S: ContentRepoService = InMemoryContentRepo> {
    service: Arc<S>,
    bucket: String,
}

impl<S: ContentRepoService> Clone for ContentRepoClient<S> {
    fn clone(&self) -> Self {
        Self {
            service: Arc::clone(&self.service),
            bucket: self.bucket.clone(),
        }
    }
}

impl ContentRepoClient<InMemoryContentRepo> {
    /// Build an in-memory engine from `config` and bind a client to it.
    pub fn in_memory(config: &ClientConfig) -> SdkResult<Self> {
        config.validate()?;
        let repo = InMemoryContentRepo::with_generator(
            config.initial_buckets.iter().cloned(),
            config.version_ids.generator(),
        )?;
        Self::connect(Arc::new(repo), config)
    }
}

impl<S: ContentRepoService> ContentRepoClient<S> {
    /// Bind to `config.bucket`, creating it when allowed.
    pub fn connect(service: Arc<S>, config: &ClientConfig) -> SdkResult<Self> {
        match service.bucket(&config.bucket) {
            Ok(_) => {}
            Err(RepoError::BucketNotFound(_)) if config.create_bucket_if_missing => {
                match service.create_bucket(&config.bucket) {
                    Ok(_) => info!(bucket = %config.bucket, "bucket created for client"),
                    // Lost a race with another creator; the bucket is there now.
                    Err(RepoError::BucketAlreadyExists(_)) => {}
                    Err(e) => return Err(e.into()),
                }
            }
            Err(e) => return Err(e.into()),
        }
        Ok(Self {
            service,
            bucket: config.bucket.clone(),
        })
    }

    /// A client for another existing bucket of the same service.
    pub fn with_bucket(&self, bucket: &str) -> SdkResult<Self> {
        self.service.bucket(bucket)?;
        Ok(Self {
            service: Arc::clone(&self.service),
            bucket: bucket.to_string(),
        })
    }

    pub fn bucket(&self) -> &str {
        &self.bucket
    }

    pub fn service(&self) -> &S {
        &self.service
    }

    pub fn info(&self) -> SdkResult<BucketInfo> {
        Ok(self.service.bucket(&self.bucket)?)
    }

    /// Repository id for `key` in this client's bucket.
    pub fn id(&self, key: &str) -> SdkResult<RepoId> {
        validate_key(key).map_err(RepoError::from)?;
        Ok(RepoId::new(self.bucket.as_str(), key))
    }

    /// Start an object input for `key`; finish it with the builder methods.
    pub fn object(&self, key: &str, content: impl Into<ContentSource>) -> SdkResult<RepoObjectInput> {
        Ok(RepoObjectInput::new(self.id(key)?, content))
    }

    /// Version `key` with `content`, creating the key if needed.
    pub fn put(
        &self,
        key: &str,
        content: impl Into<ContentSource>,
        content_type: &str,
    ) -> SdkResult<ObjectMetadata> {
        let input = self.object(key, content)?.with_content_type(content_type);
        self.auto_create_object(input)
    }

    pub fn create_object(&self, input: RepoObjectInput) -> SdkResult<ObjectMetadata> {
        self.check_bucket(&input.id)?;
        Ok(self.service.create_object(input)?)
    }

    pub fn version_object(&self, input: RepoObjectInput) -> SdkResult<ObjectMetadata> {
        self.check_bucket(&input.id)?;
        Ok(self.service.version_object(input)?)
    }

    pub fn auto_create_object(&self, input: RepoObjectInput) -> SdkResult<ObjectMetadata> {
        self.check_bucket(&input.id)?;
        Ok(self.service.auto_create_object(input)?)
    }

    pub fn latest(&self, key: &str) -> SdkResult<ObjectMetadata> {
        Ok(self.service.latest_object(&self.id(key)?)?)
    }

    pub fn get(&self, key: &str, number: u32) -> SdkResult<ObjectMetadata> {
        Ok(self.service.object_by_number(&self.id(key)?.number(number))?)
    }

    /// Exact version of `key`, whatever its status.
    pub fn get_version(&self, key: &str, version_id: VersionId) -> SdkResult<ObjectMetadata> {
        Ok(self.service.object(&self.id(key)?.version(version_id))?)
    }

    pub fn get_by_tag(&self, key: &str, tag: &str) -> SdkResult<ObjectMetadata> {
        Ok(self.service.object_by_tag(&self.id(key)?.tag(tag))?)
    }

    pub fn versions(&self, key: &str) -> SdkResult<Vec<ObjectMetadata>> {
        Ok(self.service.object_versions(&self.id(key)?)?)
    }

    pub fn read_latest(&self, key: &str) -> SdkResult<Bytes> {
        Ok(self.service.read_latest_object(&self.id(key)?)?)
    }

    pub fn read(&self, key: &str, number: u32) -> SdkResult<Bytes> {
        Ok(self.service.read_object_by_number(&self.id(key)?.number(number))?)
    }

    pub fn read_version(&self, key: &str, version_id: VersionId) -> SdkResult<Bytes> {
        Ok(self.service.read_object(&self.id(key)?.version(version_id))?)
    }

    pub fn delete(&self, key: &str, number: u32) -> SdkResult<bool> {
        Ok(self.service.delete_object_by_number(&self.id(key)?.number(number))?)
    }

    pub fn delete_version(&self, key: &str, version_id: VersionId) -> SdkResult<bool> {
        Ok(self.service.delete_object(&self.id(key)?.version(version_id))?)
    }

    pub fn delete_latest(&self, key: &str) -> SdkResult<bool> {
        Ok(self.service.delete_latest_object(&self.id(key)?)?)
    }

    pub fn list(&self, query: &ListQuery) -> SdkResult<Vec<ObjectMetadata>> {
        Ok(self.service.list_objects(&self.bucket, query)?)
    }

    /// Version the collection `key` with `members`, creating it if needed.
    pub fn collect(
        &self,
        key: &str,
        members: impl IntoIterator<Item = RepoVersion>,
    ) -> SdkResult<CollectionMetadata> {
        let input = RepoCollectionInput::new(self.id(key)?, members);
        self.auto_create_collection(input)
    }

    pub fn create_collection(&self, input: RepoCollectionInput) -> SdkResult<CollectionMetadata> {
        self.check_bucket(&input.id)?;
        Ok(self.service.create_collection(input)?)
    }

    pub fn version_collection(&self, input: RepoCollectionInput) -> SdkResult<CollectionMetadata> {
        self.check_bucket(&input.id)?;
        Ok(self.service.version_collection(input)?)
    }

    pub fn auto_create_collection(
        &self,
        input: RepoCollectionInput,
    ) -> SdkResult<CollectionMetadata> {
        self.check_bucket(&input.id)?;
        Ok(self.service.auto_create_collection(input)?)
    }

    pub fn latest_collection(&self, key: &str) -> SdkResult<CollectionMetadata> {
        Ok(self.service.latest_collection(&self.id(key)?)?)
    }

    pub fn collection(&self, key: &str, number: u32) -> SdkResult<CollectionMetadata> {
        Ok(self.service.collection_by_number(&self.id(key)?.number(number))?)
    }

    pub fn collection_version(
        &self,
        key: &str,
        version_id: VersionId,
    ) -> SdkResult<CollectionMetadata> {
        Ok(self.service.collection(&self.id(key)?.version(version_id))?)
    }

    pub fn collection_by_tag(&self, key: &str, tag: &str) -> SdkResult<CollectionMetadata> {
        Ok(self.service.collection_by_tag(&self.id(key)?.tag(tag))?)
    }

    pub fn collection_versions(&self, key: &str) -> SdkResult<Vec<CollectionMetadata>> {
        Ok(self.service.collection_versions(&self.id(key)?)?)
    }

    pub fn list_collections(&self, query: &ListQuery) -> SdkResult<Vec<CollectionMetadata>> {
        Ok(self.service.list_collections(&self.bucket, query)?)
    }

    pub fn delete_collection(&self, key: &str, number: u32) -> SdkResult<bool> {
        Ok(self.service.delete_collection_by_number(&self.id(key)?.number(number))?)
    }

    pub fn delete_collection_version(&self, key: &str, version_id: VersionId) -> SdkResult<bool> {
        Ok(self.service.delete_collection(&self.id(key)?.version(version_id))?)
    }

    fn check_bucket(&self, id: &RepoId) -> SdkResult<()> {
        if id.bucket_name() != self.bucket {
            return Err(SdkError::WrongBucket {
                expected: self.bucket.clone(),
                actual: id.bucket_name().to_string(),
            });
        }
        Ok(())
    }
}

impl<S: ContentRepoService> std::fmt::Debug for ContentRepoClient<S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ContentRepoClient")
            .field("bucket", &self.bucket)
            .finish_non_exhaustive()
    }
}
