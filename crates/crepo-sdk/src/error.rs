use std::path::PathBuf;

use crepo_store::{ErrorKind, RepoError};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum SdkError {
    #[error("repository error: {0}")]
    Repo(#[from] RepoError),

    #[error("invalid configuration: {0}")]
    Config(String),

    #[error("cannot parse configuration: {0}")]
    ConfigParse(#[from] toml::de::Error),

    #[error("cannot read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("client is bound to bucket {expected}, request targets {actual}")]
    WrongBucket { expected: String, actual: String },
}

impl SdkError {
    /// The repository failure kind, if this error came from the service.
    pub fn kind(&self) -> Option<ErrorKind> {
        match self {
            SdkError::Repo(e) => Some(e.kind()),
            _ => None,
        }
    }

    pub fn is_not_found(&self) -> bool {
        self.kind() == Some(ErrorKind::NotFound)
    }
}

pub type SdkResult<T> = Result<T, SdkError>;
