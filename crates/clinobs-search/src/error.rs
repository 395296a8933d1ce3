use thiserror::Error;

/// Reasons a search request is rejected. All of them map to HTTP 400.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum QueryError {
    #[error("Unknown search parameter: {0}")]
    UnknownParameter(String),

    #[error("Search parameter '{0}' may only be given once")]
    DuplicateParameter(String),

    #[error("Unknown date prefix '{0}' (expected one of eq, ne, gt, lt, ge, le, sa, eb, ap)")]
    UnknownPrefix(String),

    #[error("Invalid value for search parameter '{param}': {message}")]
    InvalidValue { param: String, message: String },
}

impl QueryError {
    pub fn invalid_value(param: impl Into<String>, message: impl Into<String>) -> Self {
        Self::InvalidValue {
            param: param.into(),
            message: message.into(),
        }
    }

    /// The offending parameter name, for `OperationOutcome.issue.expression`.
    pub fn parameter(&self) -> Option<&str> {
        match self {
            Self::UnknownParameter(p) | Self::DuplicateParameter(p) => Some(p),
            Self::UnknownPrefix(_) => Some("date"),
            Self::InvalidValue { param, .. } => Some(param),
        }
    }
}
