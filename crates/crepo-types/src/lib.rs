//! Foundation types for crepo, a client library for a versioned
//! object/collection content repository.
//!
//! Every other crepo crate depends on `crepo-types`.
//!
//! # Key Types
//!
//! - [`RepoId`]: a key-space slot (bucket + key), irrespective of version
//! - [`RepoVersion`]: one exact version, located by its [`VersionId`]
//! - [`RepoVersionNumber`]: one version, located by its chain ordinal
//! - [`RepoVersionTag`]: the first version in a chain carrying a tag
//! - [`VersionId`]: 128-bit synthetic version identifier
//! - [`Status`]: soft-delete state of a version

pub mod error;
pub mod identity;
pub mod names;
pub mod status;
pub mod version_id;

pub use error::TypeError;
pub use identity::{RepoId, RepoVersion, RepoVersionNumber, RepoVersionTag};
pub use names::{validate_bucket_name, validate_key};
pub use status::Status;
pub use version_id::VersionId;
