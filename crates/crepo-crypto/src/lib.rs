//! Content checksums for crepo.
//!
//! Every stored object version carries the BLAKE3 digest of its raw bytes,
//! computed once at creation. The digest is taken over the bytes alone, with
//! no domain prefix, so it can be checked with any stock BLAKE3 tool.
//!
//! All crypto operations wrap established libraries; no custom cryptography.

pub mod hasher;

pub use hasher::{Checksum, ChecksumError, ContentHasher, HashingReader};
