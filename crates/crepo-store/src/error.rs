use std::io;

use crepo_types::{RepoId, RepoVersion, TypeError};

/// The closed set of failure kinds that cross the service boundary.
///
/// Callers branch on the kind rather than on engine-specific variants, so a
/// remote-backed service and the in-memory engine report failures the same
/// way. Deleting an already-deleted version is not a failure at all: it is
/// reported as `Ok(false)`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// Create on a bucket or key that already exists.
    AlreadyExists,
    /// Unknown bucket, key, version, ordinal, or tag.
    NotFound,
    /// A collection names an object version that cannot be resolved.
    DanglingReference,
    /// Malformed request: bad names, negative paging, missing content type.
    InvalidArgument,
    /// A caller-supplied content source failed while being drained.
    Io,
}

/// Errors from repository operations.
#[derive(Debug, thiserror::Error)]
pub enum RepoError {
    /// The named bucket does not exist.
    #[error("bucket not found: {0}")]
    BucketNotFound(String),

    /// A bucket with this name already exists.
    #[error("bucket already exists: {0}")]
    BucketAlreadyExists(String),

    /// Create was called on a key that already has a version chain.
    #[error("key already exists: {0}")]
    KeyAlreadyExists(RepoId),

    /// The key has no version chain.
    #[error("key not found: {0}")]
    KeyNotFound(RepoId),

    /// The key exists but every version in its chain is deleted.
    #[error("no used version of {0}")]
    NoUsedVersion(RepoId),

    /// No version in the chain matches the locator.
    #[error("version not found: {0}")]
    VersionNotFound(String),

    /// A collection member did not resolve to a stored object version.
    #[error("collection {collection} references unresolvable object version {reference}")]
    DanglingReference {
        collection: RepoId,
        reference: RepoVersion,
    },

    /// The request was rejected before touching any chain.
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// A bucket name or key failed validation.
    #[error(transparent)]
    InvalidName(#[from] TypeError),

    /// Reading the content source failed.
    #[error("failed to read content for {id}: {source}")]
    ContentRead {
        id: RepoId,
        #[source]
        source: io::Error,
    },
}

impl RepoError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            RepoError::BucketAlreadyExists(_) | RepoError::KeyAlreadyExists(_) => {
                ErrorKind::AlreadyExists
            }
            RepoError::BucketNotFound(_)
            | RepoError::KeyNotFound(_)
            | RepoError::NoUsedVersion(_)
            | RepoError::VersionNotFound(_) => ErrorKind::NotFound,
            RepoError::DanglingReference { .. } => ErrorKind::DanglingReference,
            RepoError::InvalidArgument(_) | RepoError::InvalidName(_) => {
                ErrorKind::InvalidArgument
            }
            RepoError::ContentRead { .. } => ErrorKind::Io,
        }
    }

    pub fn is_not_found(&self) -> bool {
        self.kind() == ErrorKind::NotFound
    }
}

/// Result alias for repository operations.
pub type RepoResult<T> = Result<T, RepoError>;
