use regex::Regex;
use std::sync::LazyLock;
use thiserror::Error;

/// FHIR id regex: [A-Za-z0-9\-\.]{1,64}
static ID_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[A-Za-z0-9\-\.]{1,64}$").expect("Invalid id regex"));

#[derive(Debug, Error, PartialEq, Eq)]
pub enum IdError {
    #[error("id must not be empty")]
    Empty,
    #[error("id must be at most 64 characters, got {0}")]
    TooLong(usize),
    #[error("id may only contain letters, digits, '-' and '.'")]
    InvalidCharacters,
}

pub fn generate_id() -> String {
    uuid::Uuid::new_v4().to_string()
}

/// Checks a logical id against the FHIR `id` datatype pattern.
pub fn validate_id(id: &str) -> Result<(), IdError> {
    if id.is_empty() {
        return Err(IdError::Empty);
    }
    if id.len() > 64 {
        return Err(IdError::TooLong(id.len()));
    }
    if !ID_REGEX.is_match(id) {
        return Err(IdError::InvalidCharacters);
    }
    Ok(())
}
