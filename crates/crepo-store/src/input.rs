//! Requests for new object and collection versions.

use crepo_types::{validate_bucket_name, validate_key, RepoId, RepoVersion};

use crate::content::ContentSource;
use crate::error::{RepoError, RepoResult};

/// Everything needed to append one object version.
#[derive(Debug)]
pub struct RepoObjectInput {
    pub id: RepoId,
    pub content: ContentSource,
    pub content_type: Option<String>,
    pub download_name: Option<String>,
    pub tag: Option<String>,
    pub user_metadata: Option<String>,
}

impl RepoObjectInput {
    pub fn new(id: RepoId, content: impl Into<ContentSource>) -> Self {
        Self {
            id,
            content: content.into(),
            content_type: None,
            download_name: None,
            tag: None,
            user_metadata: None,
        }
    }

    pub fn with_content_type(mut self, content_type: impl Into<String>) -> Self {
        self.content_type = Some(content_type.into());
        self
    }

    pub fn with_download_name(mut self, download_name: impl Into<String>) -> Self {
        self.download_name = Some(download_name.into());
        self
    }

    pub fn with_tag(mut self, tag: impl Into<String>) -> Self {
        self.tag = Some(tag.into());
        self
    }

    pub fn with_user_metadata(mut self, user_metadata: impl Into<String>) -> Self {
        self.user_metadata = Some(user_metadata.into());
        self
    }

    /// Reject requests that can never succeed, before any chain is touched.
    pub fn validate(&self) -> RepoResult<()> {
        validate_bucket_name(self.id.bucket_name())?;
        validate_key(self.id.key())?;
        let missing_type = self.content_type.as_deref().map_or(true, str::is_empty);
        if missing_type && !self.content.is_file() {
            return Err(RepoError::InvalidArgument(format!(
                "content type is required for {}",
                self.id
            )));
        }
        Ok(())
    }
}

/// Everything needed to append one collection version.
///
/// `objects` lists the member object versions. Duplicates collapse to the
/// first occurrence; member order is otherwise preserved.
#[derive(Clone, Debug)]
pub struct RepoCollectionInput {
    pub id: RepoId,
    pub objects: Vec<RepoVersion>,
    pub tag: Option<String>,
    pub user_metadata: Option<String>,
}

impl RepoCollectionInput {
    pub fn new(id: RepoId, objects: impl IntoIterator<Item = RepoVersion>) -> Self {
        Self {
            id,
            objects: objects.into_iter().collect(),
            tag: None,
            user_metadata: None,
        }
    }

    pub fn with_tag(mut self, tag: impl Into<String>) -> Self {
        self.tag = Some(tag.into());
        self
    }

    pub fn with_user_metadata(mut self, user_metadata: impl Into<String>) -> Self {
        self.user_metadata = Some(user_metadata.into());
        self
    }

    pub fn validate(&self) -> RepoResult<()> {
        validate_bucket_name(self.id.bucket_name())?;
        validate_key(self.id.key())?;
        Ok(())
    }
}
