//! Paged listing of a bucket's versions.

use crepo_types::Status;
use serde::{Deserialize, Serialize};

use crate::error::{RepoError, RepoResult};

/// Filter and page window for `list_objects` / `list_collections`.
///
/// Listing walks versions in insertion order, keeps those that pass the
/// `(include_deleted, tag)` filter, skips `offset` of them and returns at
/// most `limit`.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListQuery {
    pub offset: usize,
    pub limit: usize,
    pub include_deleted: bool,
    pub tag: Option<String>,
}

impl ListQuery {
    pub fn new(offset: usize, limit: usize) -> Self {
        Self {
            offset,
            limit,
            include_deleted: false,
            tag: None,
        }
    }

    /// Build from signed paging values as they arrive from untyped callers.
    ///
    /// Negative values fail with `InvalidArgument`.
    pub fn from_signed(offset: i64, limit: i64) -> RepoResult<Self> {
        let offset = usize::try_from(offset)
            .map_err(|_| RepoError::InvalidArgument(format!("offset must be >= 0, got {offset}")))?;
        let limit = usize::try_from(limit)
            .map_err(|_| RepoError::InvalidArgument(format!("limit must be >= 0, got {limit}")))?;
        Ok(Self::new(offset, limit))
    }

    pub fn include_deleted(mut self, include: bool) -> Self {
        self.include_deleted = include;
        self
    }

    pub fn with_tag(mut self, tag: impl Into<String>) -> Self {
        self.tag = Some(tag.into());
        self
    }

    /// Whether a version with this status and tag passes the filter.
    ///
    /// A tag filter matches exactly; untagged versions never match one.
    pub fn matches(&self, status: Status, tag: Option<&str>) -> bool {
        (self.include_deleted || status.is_used())
            && self.tag.as_deref().map_or(true, |wanted| tag == Some(wanted))
    }
}
