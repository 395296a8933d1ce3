//! Observation resource model for clinobs.
//!
//! Untyped JSON flows through [`validation::validate`] and
//! [`normalize::normalize`] into an [`model::Observation`]. The store keeps
//! the flat [`document::ObservationDocument`] form, and reads are answered
//! with [`projection::project`].

pub mod document;
pub mod error;
pub mod id;
pub mod model;
pub mod normalize;
pub mod projection;
pub mod time;
pub mod validation;

pub use document::ObservationDocument;
pub use error::{CoreError, ErrorCategory, Result};
pub use id::{IdError, generate_id, validate_id};
pub use model::{
    CodableConcept, Coding, EffectivePeriod, EffectiveTime, Observation, ObservationStatus,
    ObservationValue, QuantityUnit, RESOURCE_TYPE, Reference, ValueQuantity,
};
pub use normalize::normalize;
pub use projection::project;
pub use time::{FhirDateTime, now_utc};
pub use validation::{
    FieldViolation, Rule, SEMANTIC_MESSAGE, SchemaVariant, ValidatedObservation, ValidationError,
    ValidationOptions, validate,
};
