//! Errors raised by document store backends.

use std::fmt;

#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    /// Raised by `insert` when the id is taken; nothing is overwritten.
    #[error("Document {collection}/{id} already exists")]
    AlreadyExists { collection: String, id: String },

    #[error("Documents in {collection} must be JSON objects")]
    NotAnObject { collection: String },

    /// Any failure inside the backend itself.
    #[error("Store backend failure: {message}")]
    Backend { message: String },
}

impl StorageError {
    #[must_use]
    pub fn already_exists(collection: impl Into<String>, id: impl Into<String>) -> Self {
        Self::AlreadyExists {
            collection: collection.into(),
            id: id.into(),
        }
    }

    #[must_use]
    pub fn not_an_object(collection: impl Into<String>) -> Self {
        Self::NotAnObject {
            collection: collection.into(),
        }
    }

    #[must_use]
    pub fn backend(message: impl Into<String>) -> Self {
        Self::Backend {
            message: message.into(),
        }
    }

    #[must_use]
    pub fn is_already_exists(&self) -> bool {
        matches!(self, Self::AlreadyExists { .. })
    }

    /// Log classification.
    #[must_use]
    pub fn category(&self) -> ErrorCategory {
        match self {
            Self::AlreadyExists { .. } => ErrorCategory::Conflict,
            Self::NotAnObject { .. } => ErrorCategory::Rejected,
            Self::Backend { .. } => ErrorCategory::Backend,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorCategory {
    Conflict,
    Rejected,
    Backend,
}

impl fmt::Display for ErrorCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Conflict => "conflict",
            Self::Rejected => "rejected",
            Self::Backend => "backend",
        })
    }
}
