use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// Stable codes carried by [`RepoError`]. Callers match on these rather than
/// on the message text.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RepoErrorCode {
    StorageError,
    InvalidData,
    NotFound,
    NetworkError,
}

impl RepoErrorCode {
    pub fn as_str(&self) -> &'static str {
        match self {
            RepoErrorCode::StorageError => "STORAGE_ERROR",
            RepoErrorCode::InvalidData => "INVALID_DATA",
            RepoErrorCode::NotFound => "NOT_FOUND",
            RepoErrorCode::NetworkError => "NETWORK_ERROR",
        }
    }
}

impl fmt::Display for RepoErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error returned by every repository and by the progress tracker.
#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum RepoError {
    #[error("storage error: {message}")]
    Storage { message: String },
    #[error("invalid data: {message}")]
    InvalidData { message: String },
    // Reserved: no core path raises these yet.
    #[error("not found: {message}")]
    NotFound { message: String },
    #[error("network error: {message}")]
    Network { message: String },
}

impl RepoError {
    pub fn storage(message: impl Into<String>) -> Self {
        RepoError::Storage { message: message.into() }
    }

    pub fn invalid_data(message: impl Into<String>) -> Self {
        RepoError::InvalidData { message: message.into() }
    }

    pub fn code(&self) -> RepoErrorCode {
        match self {
            RepoError::Storage { .. } => RepoErrorCode::StorageError,
            RepoError::InvalidData { .. } => RepoErrorCode::InvalidData,
            RepoError::NotFound { .. } => RepoErrorCode::NotFound,
            RepoError::Network { .. } => RepoErrorCode::NetworkError,
        }
    }

    pub fn message(&self) -> &str {
        match self {
            RepoError::Storage { message }
            | RepoError::InvalidData { message }
            | RepoError::NotFound { message }
            | RepoError::Network { message } => message,
        }
    }
}

/// Native failure of a key-value backend, before it is shaped into a
/// [`RepoError`].
#[derive(Debug, Error)]
pub enum KvError {
    #[error("io: {0}")]
    Io(#[from] std::io::Error),
    #[error("encoding: {0}")]
    Encoding(#[from] serde_json::Error),
    #[error("backend: {0}")]
    Backend(String),
    #[error(transparent)]
    Repo(#[from] RepoError),
}

impl From<KvError> for RepoError {
    fn from(err: KvError) -> Self {
        match err {
            KvError::Repo(inner) => inner,
            other => RepoError::storage(other.to_string()),
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ImportErrorCode {
    InvalidJson,
    InvalidSchema,
    Duplicate,
    FileError,
}

impl ImportErrorCode {
    pub fn as_str(&self) -> &'static str {
        match self {
            ImportErrorCode::InvalidJson => "INVALID_JSON",
            ImportErrorCode::InvalidSchema => "INVALID_SCHEMA",
            ImportErrorCode::Duplicate => "DUPLICATE",
            ImportErrorCode::FileError => "FILE_ERROR",
        }
    }
}

impl fmt::Display for ImportErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Why a card-set import was rejected. Every variant is reported as a value;
/// nothing is persisted when one of these is returned.
#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum ImportError {
    #[error("invalid JSON: {message}")]
    InvalidJson { message: String },
    #[error("invalid card set: {}", .violations.join("; "))]
    InvalidSchema { violations: Vec<String> },
    #[error("a card set named \"{package_name}\" already exists")]
    Duplicate { package_name: String },
    #[error("import failed: {message}")]
    File { message: String },
}

impl ImportError {
    pub fn code(&self) -> ImportErrorCode {
        match self {
            ImportError::InvalidJson { .. } => ImportErrorCode::InvalidJson,
            ImportError::InvalidSchema { .. } => ImportErrorCode::InvalidSchema,
            ImportError::Duplicate { .. } => ImportErrorCode::Duplicate,
            ImportError::File { .. } => ImportErrorCode::FileError,
        }
    }

    /// Human-readable message without the code prefix.
    pub fn message(&self) -> String {
        match self {
            ImportError::InvalidJson { message } | ImportError::File { message } => message.clone(),
            ImportError::InvalidSchema { violations } => violations.join("; "),
            ImportError::Duplicate { .. } => self.to_string(),
        }
    }
}

impl From<RepoError> for ImportError {
    fn from(err: RepoError) -> Self {
        ImportError::File { message: format!("{}: {}", err.code(), err.message()) }
    }
}
