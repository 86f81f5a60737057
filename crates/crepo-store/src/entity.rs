//! Stored entity versions and the lifecycle rules they share.
//!
//! Versions are built only by the engine, which assigns the id and ordinal.
//! Once appended, the only mutation a version ever sees is the soft-delete
//! status flip.

use bytes::Bytes;
use chrono::{DateTime, Utc};
use crepo_crypto::Checksum;
use crepo_types::{RepoVersion, Status};

use crate::content::Content;
use crate::metadata::{ObjectMetadata, VersionMetadata};

/// State common to object and collection versions.
#[derive(Clone, Debug)]
pub(crate) struct EntityCore {
    pub locator: RepoVersion,
    pub number: u32,
    pub tag: Option<String>,
    pub user_metadata: Option<String>,
    pub status: Status,
    pub creation_time: DateTime<Utc>,
    pub modification_time: DateTime<Utc>,
}

impl EntityCore {
    pub fn new(
        locator: RepoVersion,
        number: u32,
        tag: Option<String>,
        user_metadata: Option<String>,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            locator,
            number,
            tag,
            user_metadata,
            status: Status::Used,
            creation_time: now,
            modification_time: now,
        }
    }

    /// Flip `Used` to `Deleted` and stamp the modification time.
    ///
    /// Returns `false`, changing nothing, if the version is already deleted.
    pub fn soft_delete(&mut self, now: DateTime<Utc>) -> bool {
        if self.status.is_deleted() {
            return false;
        }
        self.status = Status::Deleted;
        self.modification_time = now;
        true
    }

    pub fn metadata(&self) -> VersionMetadata {
        let id = self.locator.id();
        VersionMetadata {
            bucket_name: id.bucket_name().to_string(),
            key: id.key().to_string(),
            version_id: self.locator.version_id(),
            version_number: self.number,
            tag: self.tag.clone(),
            user_metadata: self.user_metadata.clone(),
            status: self.status,
            creation_time: self.creation_time,
            modification_time: self.modification_time,
        }
    }
}

/// Anything that lives in a version chain.
pub(crate) trait Versioned {
    fn core(&self) -> &EntityCore;
    fn core_mut(&mut self) -> &mut EntityCore;
}

/// One stored object version. Content is immutable once created.
#[derive(Clone, Debug)]
pub(crate) struct ObjectVersion {
    core: EntityCore,
    content: Bytes,
    checksum: Checksum,
    content_type: String,
    download_name: Option<String>,
}

impl ObjectVersion {
    pub fn new(
        core: EntityCore,
        content: Content,
        content_type: String,
        download_name: Option<String>,
    ) -> Self {
        Self {
            core,
            content: content.bytes,
            checksum: content.checksum,
            content_type,
            download_name,
        }
    }

    /// A cheap handle on the stored bytes.
    pub fn content(&self) -> Bytes {
        self.content.clone()
    }

    pub fn metadata(&self) -> ObjectMetadata {
        ObjectMetadata {
            version: self.core.metadata(),
            checksum: self.checksum,
            size: self.content.len() as u64,
            content_type: self.content_type.clone(),
            download_name: self.download_name.clone(),
        }
    }
}

impl Versioned for ObjectVersion {
    fn core(&self) -> &EntityCore {
        &self.core
    }

    fn core_mut(&mut self) -> &mut EntityCore {
        &mut self.core
    }
}

/// One stored collection version.
///
/// Members are non-owning references to object versions, resolved when the
/// collection version was created.
#[derive(Clone, Debug)]
pub(crate) struct CollectionVersion {
    core: EntityCore,
    members: Vec<RepoVersion>,
}

impl CollectionVersion {
    pub fn new(core: EntityCore, members: Vec<RepoVersion>) -> Self {
        Self { core, members }
    }

    pub fn members(&self) -> &[RepoVersion] {
        &self.members
    }
}

impl Versioned for CollectionVersion {
    fn core(&self) -> &EntityCore {
        &self.core
    }

    fn core_mut(&mut self) -> &mut EntityCore {
        &mut self.core
    }
}
