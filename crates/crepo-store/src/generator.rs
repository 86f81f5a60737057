//! Version identifier generation.
//!
//! The engine asks a [`VersionIdGenerator`] for a fresh id every time it
//! appends a version. Two strategies ship with the crate:
//!
//! - [`SequentialIdGenerator`]: debug-friendly ids whose first eight hex
//!   digits count up from `00000001`. The rest is filled from a fast,
//!   non-cryptographic RNG. Collision resistance is weak by construction;
//!   use it for tests and local simulation only.
//! - [`RandomIdGenerator`]: RFC 4122 version 4 UUIDs from the operating
//!   system's CSPRNG, for anything that outlives a test.

use std::fmt;
use std::sync::atomic::{AtomicU32, Ordering};

use crepo_types::VersionId;
use rand::Rng;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Mints identifiers for newly created versions.
pub trait VersionIdGenerator: Send + Sync + fmt::Debug {
    fn next_id(&self) -> VersionId;
}

/// Bits 12..16 of the high half carry the UUID version.
const VERSION_MASK: u64 = 0xf << 12;
const VERSION_4: u64 = 0x4 << 12;
/// The top two bits of the low half carry the RFC 4122 variant (`10`).
const VARIANT_MASK: u64 = 0xc << 60;
const VARIANT_RFC4122: u64 = 0x8 << 60;

/// Counter-prefixed ids for tests and simulation.
///
/// Layout of the high 64 bits: the top 32 hold a per-generator counter that
/// starts at 1; the bottom 32 are random, with the version nibble forced to
/// 4. The low 64 bits are random with the variant bits forced to `10`.
#[derive(Debug, Default)]
pub struct SequentialIdGenerator {
    counter: AtomicU32,
}

impl SequentialIdGenerator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of ids handed out so far.
    pub fn issued(&self) -> u32 {
        self.counter.load(Ordering::Relaxed)
    }
}

impl VersionIdGenerator for SequentialIdGenerator {
    fn next_id(&self) -> VersionId {
        let count = self.counter.fetch_add(1, Ordering::Relaxed).wrapping_add(1);
        let mut rng = rand::thread_rng();

        let mut high = (u64::from(count) << 32) | u64::from(rng.gen::<u32>());
        high = (high & !VERSION_MASK) | VERSION_4;

        let mut low = rng.gen::<u64>();
        low = (low & !VARIANT_MASK) | VARIANT_RFC4122;

        VersionId::from_u64_pair(high, low)
    }
}

/// Cryptographically random version 4 UUIDs.
#[derive(Debug, Default, Clone, Copy)]
pub struct RandomIdGenerator;

impl VersionIdGenerator for RandomIdGenerator {
    fn next_id(&self) -> VersionId {
        VersionId::from_uuid(Uuid::new_v4())
    }
}

/// Configurable choice of generator.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum VersionIdStrategy {
    #[default]
    Sequential,
    Random,
}

impl VersionIdStrategy {
    pub fn generator(self) -> Box<dyn VersionIdGenerator> {
        match self {
            VersionIdStrategy::Sequential => Box::new(SequentialIdGenerator::new()),
            VersionIdStrategy::Random => Box::new(RandomIdGenerator),
        }
    }
}
