use crate::chain::Chains;
use crate::entity::{CollectionVersion, ObjectVersion};
use crate::metadata::BucketInfo;

/// One namespace with independent key spaces for objects and collections.
#[derive(Debug)]
pub(crate) struct Bucket {
    name: String,
    pub objects: Chains<ObjectVersion>,
    pub collections: Chains<CollectionVersion>,
}

impl Bucket {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            objects: Chains::default(),
            collections: Chains::default(),
        }
    }

    pub fn info(&self) -> BucketInfo {
        BucketInfo {
            bucket_name: self.name.clone(),
            total_objects: self.objects.len(),
            total_collections: self.collections.len(),
        }
    }
}
