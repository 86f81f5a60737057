use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::TypeError;

/// Soft-delete state of an entity version.
///
/// Versions are never physically removed. Deletion flips `Used` to
/// `Deleted`; there is no transition back.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Status {
    Used,
    Deleted,
}

impl Status {
    pub fn is_used(&self) -> bool {
        matches!(self, Status::Used)
    }

    pub fn is_deleted(&self) -> bool {
        matches!(self, Status::Deleted)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Status::Used => "USED",
            Status::Deleted => "DELETED",
        }
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Status {
    type Err = TypeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "USED" => Ok(Status::Used),
            "DELETED" => Ok(Status::Deleted),
            other => Err(TypeError::UnknownStatus(other.to_string())),
        }
    }
}
