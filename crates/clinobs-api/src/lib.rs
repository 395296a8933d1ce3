use axum::http::{HeaderName, HeaderValue, StatusCode, header};
use axum::response::{IntoResponse, Response};
use clinobs_core::ValidationError;
use clinobs_search::QueryError;
use clinobs_storage::StorageError;
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use thiserror::Error;

pub const FHIR_JSON: &str = "application/fhir+json";

/// Message returned for every unexpected failure.
pub const INTERNAL_ERROR_MESSAGE: &str = "Internal server error";

/// Minimal FHIR OperationOutcome representation for API error responses
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct OperationOutcome {
    #[serde(rename = "resourceType")]
    pub resource_type: &'static str, // always "OperationOutcome"
    pub issue: Vec<OperationOutcomeIssue>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct OperationOutcomeIssue {
    /// FHIR issue severity: fatal | error | warning | information
    pub severity: &'static str,
    /// FHIR issue type code (subset used): invalid | required | not-found | conflict | exception
    pub code: &'static str,
    /// Human-readable description
    #[serde(skip_serializing_if = "Option::is_none")]
    pub diagnostics: Option<String>,
    /// Paths of the elements the issue is about
    #[serde(skip_serializing_if = "Vec::is_empty", default)]
    pub expression: Vec<String>,
}

impl OperationOutcome {
    pub fn single(
        severity: &'static str,
        code: &'static str,
        diagnostics: impl Into<String>,
    ) -> Self {
        Self {
            resource_type: "OperationOutcome",
            issue: vec![OperationOutcomeIssue {
                severity,
                code,
                diagnostics: Some(diagnostics.into()),
                expression: Vec::new(),
            }],
        }
    }

    pub fn with_expression(mut self, expression: Vec<String>) -> Self {
        if let Some(issue) = self.issue.first_mut() {
            issue.expression = expression;
        }
        self
    }
}

/// High-level API errors to be mapped to HTTP responses and FHIR OperationOutcome
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("Bad request: {0}")]
    BadRequest(String),
    #[error("Not found: {0}")]
    NotFound(String),
    #[error("Conflict: {0}")]
    Conflict(String),
    /// Detail is logged, never sent to the client.
    #[error("Internal server error: {0}")]
    Internal(String),
    #[error("Unprocessable entity: {message}")]
    UnprocessableEntity {
        message: String,
        /// Issue type code: `invalid` for schema errors, `required` for the value rule
        code: &'static str,
        expression: Vec<String>,
    },
}

impl ApiError {
    pub fn bad_request(msg: impl Into<String>) -> Self {
        Self::BadRequest(msg.into())
    }
    pub fn not_found(msg: impl Into<String>) -> Self {
        Self::NotFound(msg.into())
    }
    pub fn conflict(msg: impl Into<String>) -> Self {
        Self::Conflict(msg.into())
    }
    pub fn internal(msg: impl Into<String>) -> Self {
        Self::Internal(msg.into())
    }
    pub fn unprocessable_entity(
        msg: impl Into<String>,
        code: &'static str,
        expression: Vec<String>,
    ) -> Self {
        Self::UnprocessableEntity {
            message: msg.into(),
            code,
            expression,
        }
    }

    pub fn status_code(&self) -> StatusCode {
        match self {
            ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::Conflict(_) => StatusCode::CONFLICT,
            ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
            ApiError::UnprocessableEntity { .. } => StatusCode::UNPROCESSABLE_ENTITY,
        }
    }

    pub fn to_operation_outcome(&self) -> OperationOutcome {
        match self {
            ApiError::BadRequest(msg) => OperationOutcome::single("error", "invalid", msg),
            ApiError::NotFound(msg) => OperationOutcome::single("error", "not-found", msg),
            ApiError::Conflict(msg) => OperationOutcome::single("error", "conflict", msg),
            ApiError::Internal(_) => {
                OperationOutcome::single("fatal", "exception", INTERNAL_ERROR_MESSAGE)
            }
            ApiError::UnprocessableEntity {
                message,
                code,
                expression,
            } => OperationOutcome::single("error", *code, message)
                .with_expression(expression.clone()),
        }
    }
}

impl From<ValidationError> for ApiError {
    fn from(err: ValidationError) -> Self {
        let code = match err {
            ValidationError::Schema { .. } => "invalid",
            ValidationError::Semantic => "required",
        };
        ApiError::unprocessable_entity(err.to_string(), code, err.expression())
    }
}

impl From<QueryError> for ApiError {
    fn from(err: QueryError) -> Self {
        ApiError::BadRequest(err.to_string())
    }
}

impl From<StorageError> for ApiError {
    fn from(err: StorageError) -> Self {
        match err {
            StorageError::AlreadyExists { .. } => ApiError::Conflict(err.to_string()),
            other => ApiError::Internal(format!("storage ({}): {other}", other.category())),
        }
    }
}

impl From<clinobs_core::CoreError> for ApiError {
    fn from(err: clinobs_core::CoreError) -> Self {
        if err.is_client_error() {
            return ApiError::BadRequest(err.to_string());
        }
        ApiError::Internal(format!("core ({}): {err}", err.category()))
    }
}

fn fhir_json_response(status: StatusCode, body: Vec<u8>) -> Response {
    axum::http::Response::builder()
        .status(status)
        .header(header::CONTENT_TYPE, HeaderValue::from_static(FHIR_JSON))
        .body(axum::body::Body::from(body))
        .unwrap_or_else(|_| {
            let mut fallback = Response::new(axum::body::Body::from("{}"));
            *fallback.status_mut() = StatusCode::INTERNAL_SERVER_ERROR;
            fallback
        })
}

fn outcome_bytes(outcome: &OperationOutcome) -> Vec<u8> {
    serde_json::to_vec(outcome).unwrap_or_else(|_| b"{}".to_vec())
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        if let ApiError::Internal(detail) = &self {
            tracing::error!(error = %detail, "unhandled failure");
        }
        fhir_json_response(status, outcome_bytes(&self.to_operation_outcome()))
    }
}


// -------------------------
// API Response Wrapper
// -------------------------

#[derive(Debug, Clone)]
pub struct ApiResponse<T> {
    pub value: T,
    pub status: StatusCode,
    pub headers: Vec<(HeaderName, HeaderValue)>,
}

impl<T> ApiResponse<T> {
    pub fn new(value: T, status: StatusCode) -> Self {
        Self {
            value,
            status,
            headers: Vec::new(),
        }
    }

    pub fn ok(value: T) -> Self {
        Self::new(value, StatusCode::OK)
    }

    pub fn created(value: T) -> Self {
        Self::new(value, StatusCode::CREATED)
    }

    pub fn with_header(mut self, name: HeaderName, value: HeaderValue) -> Self {
        self.headers.push((name, value));
        self
    }
}

impl<T: Serialize> IntoResponse for ApiResponse<T> {
    fn into_response(self) -> Response {
        let body = match serde_json::to_vec(&self.value) {
            Ok(b) => b,
            Err(e) => {
                return ApiError::internal(format!("response serialization: {e}")).into_response();
            }
        };
        let mut response = fhir_json_response(self.status, body);
        for (n, v) in self.headers.into_iter() {
            response.headers_mut().insert(n, v);
        }
        response
    }
}

#[cfg(test)]
mod response_tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn api_response_created_sets_status_and_content_type() {
        let payload = json!({"resourceType": "Observation"});
        let resp = ApiResponse::created(payload).into_response();
        assert_eq!(resp.status(), StatusCode::CREATED);
        let content_type = resp.headers().get(header::CONTENT_TYPE).unwrap();
        assert_eq!(content_type, &HeaderValue::from_static(FHIR_JSON));
    }

    #[test]
    fn api_response_can_add_headers() {
        let resp = ApiResponse::ok(json!({}))
            .with_header(
                header::LOCATION,
                HeaderValue::from_static("http://localhost/fhir/Observation/1"),
            )
            .into_response();
        let location = resp.headers().get(header::LOCATION).unwrap();
        assert_eq!(location, "http://localhost/fhir/Observation/1");
    }
}

// -------------------------
// FHIR Bundle Types
// -------------------------

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct BundleEntry {
    #[serde(rename = "fullUrl")]
    pub full_url: String,
    pub resource: JsonValue,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Bundle {
    #[serde(rename = "resourceType")]
    pub resource_type: &'static str,
    #[serde(rename = "type")]
    pub bundle_type: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub total: Option<u64>,
    #[serde(default)]
    pub entry: Vec<BundleEntry>,
}

impl Bundle {
    pub fn searchset(entries: Vec<BundleEntry>) -> Self {
        Self {
            resource_type: "Bundle",
            bundle_type: "searchset".to_string(),
            total: Some(entries.len() as u64),
            entry: entries,
        }
    }

    pub fn collection(entries: Vec<BundleEntry>) -> Self {
        Self {
            resource_type: "Bundle",
            bundle_type: "collection".to_string(),
            total: None,
            entry: entries,
        }
    }
}

/// Wrap projected Observations into a Bundle.
///
/// `base_url` is the scheme and authority the request came in on, e.g.
/// `http://localhost:4000`. A searched bundle is a `searchset` with a
/// `total`; an unfiltered listing is a `collection` without one.
pub fn bundle_from_observations(resources: Vec<JsonValue>, base_url: &str, searched: bool) -> Bundle {
    let base = base_url.trim_end_matches('/');
    let entries: Vec<BundleEntry> = resources
        .into_iter()
        .map(|resource| {
            let id = resource.get("id").and_then(|v| v.as_str()).unwrap_or_default();
            BundleEntry {
                full_url: format!("{base}/fhir/Observation/{id}"),
                resource,
            }
        })
        .collect();

    if searched {
        Bundle::searchset(entries)
    } else {
        Bundle::collection(entries)
    }
}
