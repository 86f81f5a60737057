//! High-level SDK for crepo.
//!
//! Provides a bucket-bound client over any [`ContentRepoService`] plus the
//! configuration that builds one on top of the in-memory engine. This is the
//! main entry point for applications embedding crepo.

pub mod client;
pub mod config;
pub mod error;

pub use client::ContentRepoClient;
pub use config::{ClientConfig, DEFAULT_BUCKET};
pub use error::{SdkError, SdkResult};

// Re-export key types
pub use crepo_store::{
    BucketInfo, CollectionMetadata, ContentRepoService, ContentSource, ErrorKind,
    InMemoryContentRepo, ListQuery, ObjectMetadata, RepoCollectionInput, RepoObjectInput,
    VersionIdStrategy,
};
pub use crepo_types::{RepoId, RepoVersion, RepoVersionNumber, Status, VersionId};
