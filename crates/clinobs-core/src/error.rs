use thiserror::Error;

/// Failures raised while parsing instants or rebuilding stored Observations.
#[derive(Debug, Error)]
pub enum CoreError {
    #[error("Unparsable date/time: {0}")]
    InvalidDateTime(String),

    #[error("Stored document has resourceType '{0}', expected Observation")]
    WrongResourceType(String),

    #[error("Corrupt Observation document: {0}")]
    CorruptDocument(String),

    #[error("Document (de)serialization failed: {0}")]
    Json(#[from] serde_json::Error),
}

impl CoreError {
    pub fn invalid_date_time(detail: impl Into<String>) -> Self {
        Self::InvalidDateTime(detail.into())
    }

    pub fn wrong_resource_type(found: impl Into<String>) -> Self {
        Self::WrongResourceType(found.into())
    }

    pub fn corrupt_document(detail: impl Into<String>) -> Self {
        Self::CorruptDocument(detail.into())
    }

    /// Only a bad instant can come from caller input; everything else
    /// concerns data the service wrote itself.
    pub fn is_client_error(&self) -> bool {
        matches!(self, Self::InvalidDateTime(_))
    }

    pub fn is_server_error(&self) -> bool {
        !self.is_client_error()
    }

    pub fn category(&self) -> ErrorCategory {
        match self {
            Self::InvalidDateTime(_) => ErrorCategory::Input,
            Self::WrongResourceType(_) | Self::CorruptDocument(_) => ErrorCategory::Corruption,
            Self::Json(_) => ErrorCategory::Serialization,
        }
    }
}

/// Coarse classification used in log fields.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    Input,
    Corruption,
    Serialization,
}

impl std::fmt::Display for ErrorCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            Self::Input => "input",
            Self::Corruption => "corruption",
            Self::Serialization => "serialization",
        })
    }
}

pub type Result<T> = std::result::Result<T, CoreError>;
