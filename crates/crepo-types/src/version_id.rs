use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::TypeError;

/// Globally assigned, chain-independent identifier of one entity version.
///
/// A `VersionId` is a 128-bit value laid out like an RFC 4122 UUID. It is
/// minted by the engine when a version is created and never changes
/// afterwards. Nothing about the value is derived from the version's
/// content; two versions with identical bytes still get distinct ids.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct VersionId(Uuid);

impl VersionId {
    /// Build an id from its high and low 64-bit halves.
    pub const fn from_u64_pair(high: u64, low: u64) -> Self {
        Self(Uuid::from_u64_pair(high, low))
    }

    /// Wrap an existing UUID.
    pub const fn from_uuid(uuid: Uuid) -> Self {
        Self(uuid)
    }

    /// The nil id (all zeros). Never assigned to a stored version.
    pub const fn nil() -> Self {
        Self(Uuid::nil())
    }

    /// Returns `true` if this is the nil id.
    pub fn is_nil(&self) -> bool {
        self.0.is_nil()
    }

    /// The high and low 64-bit halves.
    pub fn as_u64_pair(&self) -> (u64, u64) {
        self.0.as_u64_pair()
    }

    /// The raw 16 bytes, big-endian.
    pub fn as_bytes(&self) -> &[u8; 16] {
        self.0.as_bytes()
    }

    /// The underlying UUID.
    pub fn as_uuid(&self) -> &Uuid {
        &self.0
    }

    /// UUID version nibble (bits 12..16 of the high half).
    pub fn version_nibble(&self) -> u8 {
        ((self.as_u64_pair().0 >> 12) & 0xf) as u8
    }

    /// Hex encoding without separators (32 characters).
    pub fn to_hex(&self) -> String {
        hex::encode(self.as_bytes())
    }

    /// Short hex representation (first 8 characters).
    ///
    /// For sequentially generated ids this is the creation counter, which
    /// makes ids easy to tell apart in logs.
    pub fn short_hex(&self) -> String {
        hex::encode(&self.as_bytes()[..4])
    }

    /// Parse from 32 hex characters without separators.
    pub fn from_hex(s: &str) -> Result<Self, TypeError> {
        let bytes = hex::decode(s).map_err(|e| TypeError::InvalidHex(e.to_string()))?;
        let arr: [u8; 16] = bytes
            .as_slice()
            .try_into()
            .map_err(|_| TypeError::InvalidLength {
                expected: 16,
                actual: bytes.len(),
            })?;
        Ok(Self(Uuid::from_bytes(arr)))
    }
}

impl FromStr for VersionId {
    type Err = TypeError;

    /// Accepts the hyphenated form as well as bare hex.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Uuid::parse_str(s)
            .map(Self)
            .map_err(|e| TypeError::InvalidVersionId(format!("{s}: {e}")))
    }
}

impl fmt::Debug for VersionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "VersionId({})", self.0.hyphenated())
    }
}

impl fmt::Display for VersionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.hyphenated())
    }
}

impl From<Uuid> for VersionId {
    fn from(uuid: Uuid) -> Self {
        Self(uuid)
    }
}

impl From<VersionId> for Uuid {
    fn from(id: VersionId) -> Self {
        id.0
    }
}
