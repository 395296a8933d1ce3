//! Persisted shape of an Observation.
//!
//! The store keeps one flat JSON document per Observation: every sub-object
//! embedded, the active effective/value field stored under its own name, and
//! the `effective`/`value` discriminator strings naming it. This is also the
//! body returned by a successful create.

use crate::error::{CoreError, Result};
use crate::model::{
    CodableConcept, EffectivePeriod, EffectiveTime, Observation, ObservationStatus,
    ObservationValue, RESOURCE_TYPE, Reference, ValueQuantity,
};
use crate::time::FhirDateTime;
use serde::{Deserialize, Serialize};
use serde_json::Value;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ObservationDocument {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    pub resource_type: String,
    pub status: ObservationStatus,
    #[serde(default)]
    pub category: Vec<CodableConcept>,
    pub code: CodableConcept,
    #[serde(default)]
    pub subject: Reference,
    #[serde(default)]
    pub based_on: Reference,
    #[serde(default)]
    pub context: Reference,
    #[serde(default)]
    pub performer: Reference,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub issued: Option<FhirDateTime>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub effective: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub effective_date: Option<FhirDateTime>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub effective_date_time: Option<FhirDateTime>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub effective_period: Option<EffectivePeriod>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value_quantity: Option<ValueQuantity>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value_codable_quantity: Option<CodableConcept>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value_string: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value_boolean: Option<bool>,

    #[serde(default)]
    pub data_absent_reason: CodableConcept,
}

impl ObservationDocument {
    pub fn to_value(&self) -> Result<Value> {
        Ok(serde_json::to_value(self)?)
    }

    pub fn from_value(value: Value) -> Result<Self> {
        Ok(serde_json::from_value(value)?)
    }
}

impl From<&Observation> for ObservationDocument {
    fn from(obs: &Observation) -> Self {
        let mut doc = ObservationDocument {
            id: obs.id.clone(),
            resource_type: RESOURCE_TYPE.to_string(),
            status: obs.status,
            category: obs.category.clone(),
            code: obs.code.clone(),
            subject: obs.subject.clone(),
            based_on: obs.based_on.clone(),
            context: obs.context.clone(),
            performer: obs.performer.clone(),
            issued: obs.issued,
            effective: obs.effective.as_ref().map(|e| e.field_name().to_string()),
            effective_date: None,
            effective_date_time: None,
            effective_period: None,
            value: obs.value.as_ref().map(|v| v.field_name().to_string()),
            value_quantity: None,
            value_codable_quantity: None,
            value_string: None,
            value_boolean: None,
            data_absent_reason: obs.data_absent_reason.clone(),
        };

        match &obs.effective {
            Some(EffectiveTime::Date(ts)) => doc.effective_date = Some(*ts),
            Some(EffectiveTime::DateTime(ts)) => doc.effective_date_time = Some(*ts),
            Some(EffectiveTime::Period(period)) => doc.effective_period = Some(period.clone()),
            None => {}
        }

        match &obs.value {
            Some(ObservationValue::Quantity(q)) => doc.value_quantity = Some(q.clone()),
            Some(ObservationValue::CodableQuantity(c)) => {
                doc.value_codable_quantity = Some(c.clone())
            }
            Some(ObservationValue::Text(s)) => doc.value_string = Some(s.clone()),
            Some(ObservationValue::Flag(b)) => doc.value_boolean = Some(*b),
            None => {}
        }

        doc
    }
}

impl TryFrom<ObservationDocument> for Observation {
    type Error = CoreError;

    /// Rebuild the aggregate, trusting the discriminators.
    ///
    /// A discriminator that names an unknown field, or a field that is not
    /// stored, means the document is corrupt.
    fn try_from(doc: ObservationDocument) -> Result<Self> {
        if doc.resource_type != RESOURCE_TYPE {
            return Err(CoreError::wrong_resource_type(doc.resource_type));
        }

        let effective = match doc.effective.as_deref() {
            None => None,
            Some(EffectiveTime::DATE) => Some(EffectiveTime::Date(
                doc.effective_date.ok_or_else(|| missing(EffectiveTime::DATE))?,
            )),
            Some(EffectiveTime::DATE_TIME) => Some(EffectiveTime::DateTime(
                doc.effective_date_time
                    .ok_or_else(|| missing(EffectiveTime::DATE_TIME))?,
            )),
            Some(EffectiveTime::PERIOD) => Some(EffectiveTime::Period(
                doc.effective_period
                    .ok_or_else(|| missing(EffectiveTime::PERIOD))?,
            )),
            Some(other) => return Err(unknown("effective", other)),
        };

        let value = match doc.value.as_deref() {
            None => None,
            Some(ObservationValue::QUANTITY) => Some(ObservationValue::Quantity(
                doc.value_quantity
                    .ok_or_else(|| missing(ObservationValue::QUANTITY))?,
            )),
            Some(ObservationValue::CODABLE_QUANTITY) => Some(ObservationValue::CodableQuantity(
                doc.value_codable_quantity
                    .ok_or_else(|| missing(ObservationValue::CODABLE_QUANTITY))?,
            )),
            Some(ObservationValue::STRING) => Some(ObservationValue::Text(
                doc.value_string
                    .ok_or_else(|| missing(ObservationValue::STRING))?,
            )),
            Some(ObservationValue::BOOLEAN) => Some(ObservationValue::Flag(
                doc.value_boolean
                    .ok_or_else(|| missing(ObservationValue::BOOLEAN))?,
            )),
            Some(other) => return Err(unknown("value", other)),
        };

        Ok(Observation {
            id: doc.id,
            status: doc.status,
            category: doc.category,
            code: doc.code,
            subject: doc.subject,
            based_on: doc.based_on,
            context: doc.context,
            performer: doc.performer,
            effective,
            issued: doc.issued,
            value,
            data_absent_reason: doc.data_absent_reason,
        })
    }
}

fn missing(field: &str) -> CoreError {
    CoreError::corrupt_document(format!("discriminator names {field} but it is not stored"))
}

fn unknown(discriminator: &str, field: &str) -> CoreError {
    CoreError::corrupt_document(format!("unknown {discriminator} discriminator '{field}'"))
}
