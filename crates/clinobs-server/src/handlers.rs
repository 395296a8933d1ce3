use axum::{
    body::Bytes,
    extract::{Path, Query, State, rejection::QueryRejection},
    http::{HeaderMap, HeaderValue, header},
    response::IntoResponse,
};
use clinobs_api::{ApiError, ApiResponse, Bundle};
use clinobs_core::RESOURCE_TYPE;
use serde::Serialize;
use serde_json::{Value, json};

use crate::server::AppState;

#[derive(Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
}

pub const OBSERVATION_PATH: &str = "/fhir/Observation";

pub async fn root() -> impl IntoResponse {
    let body = json!({
        "service": "clinobs",
        "status": "ok",
        "version": env!("CARGO_PKG_VERSION"),
        "availableEndpoints": {
            "get": [OBSERVATION_PATH, format!("{OBSERVATION_PATH}/{{id}}")],
            "post": [OBSERVATION_PATH],
        },
    });
    ApiResponse::ok(body)
}

pub async fn healthz() -> impl IntoResponse {
    ApiResponse::ok(HealthResponse { status: "ok" })
}

pub async fn fallback() -> ApiError {
    ApiError::not_found("No such endpoint")
}

// ---- Observation ----

/// `POST /fhir/Observation`
///
/// The body is parsed here rather than through `Json` so that malformed
/// JSON is answered with an OperationOutcome.
pub async fn create_observation(
    State(state): State<AppState>,
    body: Bytes,
) -> Result<impl IntoResponse, ApiError> {
    let raw: Value = serde_json::from_slice(&body)
        .map_err(|e| ApiError::bad_request(format!("Malformed JSON body: {e}")))?;

    let created = state.observations.create(&raw).await?;
    let mut response = ApiResponse::created(created.clone());
    if let Some(id) = created.get("id").and_then(Value::as_str)
        && let Ok(location) = HeaderValue::from_str(&format!("{OBSERVATION_PATH}/{id}"))
    {
        response = response.with_header(header::LOCATION, location);
    }
    Ok(response)
}

/// `GET /fhir/Observation/{id}`
pub async fn read_observation(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<ApiResponse<Value>, ApiError> {
    let resource = state.observations.read(&id).await?;
    Ok(ApiResponse::ok(resource))
}

/// `GET /fhir/Observation?patient=..&code=..&category=..&date=..`
pub async fn search_observations(
    State(state): State<AppState>,
    headers: HeaderMap,
    params: Result<Query<Vec<(String, String)>>, QueryRejection>,
) -> Result<ApiResponse<Bundle>, ApiError> {
    let Query(params) =
        params.map_err(|e| ApiError::bad_request(format!("Invalid query string: {e}")))?;
    let base_url = request_base_url(&headers);
    let bundle = state.observations.search(&params, &base_url).await?;
    tracing::debug!(
        resource_type = RESOURCE_TYPE,
        total = bundle.entry.len(),
        "search completed"
    );
    Ok(ApiResponse::ok(bundle))
}

/// Scheme and authority the request came in on.
///
/// Uses `x-forwarded-proto` when a proxy sets it, `http` otherwise.
pub fn request_base_url(headers: &HeaderMap) -> String {
    let host = headers
        .get(header::HOST)
        .and_then(|v| v.to_str().ok())
        .unwrap_or("localhost");
    let scheme = headers
        .get("x-forwarded-proto")
        .and_then(|v| v.to_str().ok())
        .unwrap_or("http");
    format!("{scheme}://{host}")
}
