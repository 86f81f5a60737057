//! Versioned object and collection storage for crepo.
//!
//! A repository is a set of named buckets. Each bucket holds two independent
//! key spaces, one for objects and one for collections. Every key owns an
//! append-only chain of versions numbered 0, 1, 2, ... without gaps.
//!
//! # Entities
//!
//! - object version -- immutable content plus checksum, size, content type
//! - collection version -- a set of references to exact object versions
//!
//! Deletion is a soft status flip. Deleted versions stay addressable by
//! version id, ordinal, and tag; they only drop out of "latest" and default
//! listings.
//!
//! # Engines
//!
//! All engines implement the [`ContentRepoService`] trait:
//!
//! - [`InMemoryContentRepo`] -- lock-per-bucket reference engine for tests
//!   and local simulation
//!
//! # Rules
//!
//! 1. Buckets are never created implicitly by a write.
//! 2. Ordinals are allocated under the bucket's write lock.
//! 3. A collection may only reference object versions that already exist,
//!    in whichever bucket they live.
//! 4. Returned metadata is a snapshot; later mutations never alter it.

pub mod content;
pub mod error;
pub mod generator;
pub mod input;
pub mod memory;
pub mod metadata;
pub mod query;
pub mod traits;

mod bucket;
mod chain;
mod entity;

// Re-export primary types at crate root for ergonomic imports.
pub use content::{Content, ContentSource, DEFAULT_FILE_CONTENT_TYPE};
pub use error::{ErrorKind, RepoError, RepoResult};
pub use generator::{
    RandomIdGenerator, SequentialIdGenerator, VersionIdGenerator, VersionIdStrategy,
};
pub use input::{RepoCollectionInput, RepoObjectInput};
pub use memory::InMemoryContentRepo;
pub use metadata::{
    BucketInfo, CollectionMetadata, ObjectMetadata, RepoConfigInfo, RepoStatus, VersionMetadata,
};
pub use query::ListQuery;
pub use traits::ContentRepoService;
