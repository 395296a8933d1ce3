//! Observation use cases: create, read by id, search.
//!
//! Handlers stay thin and delegate here. Every store call goes through the
//! injected [`DynStore`], so tests can run against any backend.

use clinobs_api::{ApiError, Bundle, bundle_from_observations};
use clinobs_core::{
    Observation, ObservationDocument, RESOURCE_TYPE, ValidationOptions, normalize, project,
    validate,
};
use clinobs_search::translate;
use clinobs_storage::{DynStore, StoredDocument};
use serde_json::Value;

#[derive(Clone)]
pub struct ObservationService {
    store: DynStore,
    options: ValidationOptions,
}

impl ObservationService {
    pub fn new(store: DynStore, options: ValidationOptions) -> Self {
        Self { store, options }
    }

    pub fn store(&self) -> &DynStore {
        &self.store
    }

    /// Validate, normalize and persist a raw payload.
    ///
    /// Returns the persisted document, discriminators included. Nothing is
    /// written when validation fails.
    pub async fn create(&self, raw: &Value) -> Result<Value, ApiError> {
        let validated = validate(raw, &self.options)?;
        let observation = normalize(validated);
        let stored = self.persist(&observation).await?;
        tracing::info!(
            id = %stored.id,
            status = %observation.status,
            effective = observation.effective.as_ref().map(|e| e.field_name()),
            value = observation.value.as_ref().map(|v| v.field_name()),
            "observation created"
        );
        Ok(stored.document)
    }

    /// Persist an already-built observation, bypassing validation.
    pub async fn persist(&self, observation: &Observation) -> Result<StoredDocument, ApiError> {
        let document = ObservationDocument::from(observation).to_value()?;
        self.store
            .insert(RESOURCE_TYPE, document)
            .await
            .map_err(|err| {
                if err.is_already_exists() {
                    tracing::warn!(id = observation.id.as_deref(), "observation id already taken");
                }
                ApiError::from(err)
            })
    }

    /// Fetch one observation and project it.
    pub async fn read(&self, id: &str) -> Result<Value, ApiError> {
        let stored = self
            .store
            .read(RESOURCE_TYPE, id)
            .await?
            .ok_or_else(|| ApiError::not_found(format!("{RESOURCE_TYPE}/{id} not found")))?;
        to_projection(stored)
    }

    /// Translate the query, fetch the matches and wrap them in a Bundle.
    ///
    /// `base_url` is the scheme and authority used for `fullUrl`.
    pub async fn search(
        &self,
        params: &[(String, String)],
        base_url: &str,
    ) -> Result<Bundle, ApiError> {
        let query = translate(params)?;
        let matches = self.store.find(RESOURCE_TYPE, &query.filter).await?;
        tracing::debug!(
            params = params.len(),
            matches = matches.len(),
            searched = query.searched,
            "observation search"
        );

        let resources = matches
            .into_iter()
            .map(to_projection)
            .collect::<Result<Vec<_>, _>>()?;
        Ok(bundle_from_observations(resources, base_url, query.searched))
    }
}

fn to_projection(stored: StoredDocument) -> Result<Value, ApiError> {
    let document = ObservationDocument::from_value(stored.document)?;
    let observation = Observation::try_from(document)?;
    Ok(project(&observation))
}
