use super::{CodableConcept, EffectivePeriod, Reference, ValueQuantity};
use crate::time::FhirDateTime;
use serde::{Deserialize, Serialize};

pub const RESOURCE_TYPE: &str = "Observation";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ObservationStatus {
    Preliminary,
    Registered,
    Final,
    Amended,
}

impl ObservationStatus {
    pub const ALL: [ObservationStatus; 4] = [
        Self::Preliminary,
        Self::Registered,
        Self::Final,
        Self::Amended,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Preliminary => "preliminary",
            Self::Registered => "registered",
            Self::Final => "final",
            Self::Amended => "amended",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|status| status.as_str() == s)
    }
}

impl std::fmt::Display for ObservationStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// When the observation was made.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EffectiveTime {
    /// `effectiveDate`
    Date(FhirDateTime),
    /// `effectiveDateTime`
    DateTime(FhirDateTime),
    /// `effectivePeriod`
    Period(EffectivePeriod),
}

impl EffectiveTime {
    pub const DATE: &'static str = "effectiveDate";
    pub const DATE_TIME: &'static str = "effectiveDateTime";
    pub const PERIOD: &'static str = "effectivePeriod";

    /// Wire name of the active field, also used as the discriminator value.
    pub fn field_name(&self) -> &'static str {
        match self {
            Self::Date(_) => Self::DATE,
            Self::DateTime(_) => Self::DATE_TIME,
            Self::Period(_) => Self::PERIOD,
        }
    }

    /// The scalar instant, if this is not a period.
    pub fn instant(&self) -> Option<FhirDateTime> {
        match self {
            Self::Date(ts) | Self::DateTime(ts) => Some(*ts),
            Self::Period(_) => None,
        }
    }
}

/// The observed result.
#[derive(Debug, Clone, PartialEq)]
pub enum ObservationValue {
    /// `valueQuantity`
    Quantity(ValueQuantity),
    /// `valueCodableQuantity`
    CodableQuantity(CodableConcept),
    /// `valueString`
    Text(String),
    /// `valueBoolean`
    Flag(bool),
}

impl ObservationValue {
    pub const QUANTITY: &'static str = "valueQuantity";
    pub const CODABLE_QUANTITY: &'static str = "valueCodableQuantity";
    pub const STRING: &'static str = "valueString";
    pub const BOOLEAN: &'static str = "valueBoolean";

    pub fn field_name(&self) -> &'static str {
        match self {
            Self::Quantity(_) => Self::QUANTITY,
            Self::CodableQuantity(_) => Self::CODABLE_QUANTITY,
            Self::Text(_) => Self::STRING,
            Self::Flag(_) => Self::BOOLEAN,
        }
    }
}

/// A normalized Observation.
///
/// Built once per create request and never mutated afterwards. Every
/// reference and concept is present, using its empty form when the caller
/// supplied nothing. `id` is `None` until the store assigns one.
#[derive(Debug, Clone, PartialEq)]
pub struct Observation {
    pub id: Option<String>,
    pub status: ObservationStatus,
    pub category: Vec<CodableConcept>,
    pub code: CodableConcept,
    pub subject: Reference,
    pub based_on: Reference,
    pub context: Reference,
    pub performer: Reference,
    pub effective: Option<EffectiveTime>,
    pub issued: Option<FhirDateTime>,
    pub value: Option<ObservationValue>,
    pub data_absent_reason: CodableConcept,
}

impl Observation {
    /// A minimal observation with the given status and code and nothing else.
    pub fn new(status: ObservationStatus, code: CodableConcept) -> Self {
        Self {
            id: None,
            status,
            category: Vec::new(),
            code,
            subject: Reference::default(),
            based_on: Reference::default(),
            context: Reference::default(),
            performer: Reference::default(),
            effective: None,
            issued: None,
            value: None,
            data_absent_reason: CodableConcept::default(),
        }
    }

    /// Whether the value / data-absent-reason invariant holds.
    pub fn has_value_or_absent_reason(&self) -> bool {
        self.value.is_some() || !self.data_absent_reason.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::Coding;

    #[test]
    fn status_round_trip() {
        for status in ObservationStatus::ALL {
            assert_eq!(ObservationStatus::parse(status.as_str()), Some(status));
            assert_eq!(
                serde_json::to_value(status).unwrap(),
                serde_json::Value::String(status.to_string())
            );
        }
        assert_eq!(ObservationStatus::parse("cancelled"), None);
    }

    #[test]
    fn field_names() {
        let ts = crate::time::now_utc();
        assert_eq!(EffectiveTime::Date(ts).field_name(), "effectiveDate");
        assert_eq!(EffectiveTime::DateTime(ts).field_name(), "effectiveDateTime");
        assert_eq!(
            EffectiveTime::Period(EffectivePeriod::default()).field_name(),
            "effectivePeriod"
        );
        assert_eq!(EffectiveTime::Period(EffectivePeriod::default()).instant(), None);

        assert_eq!(ObservationValue::Flag(false).field_name(), "valueBoolean");
        assert_eq!(ObservationValue::Text("Fever".into()).field_name(), "valueString");
        assert_eq!(
            ObservationValue::CodableQuantity(CodableConcept::default()).field_name(),
            "valueCodableQuantity"
        );
        assert_eq!(
            ObservationValue::Quantity(ValueQuantity::default()).field_name(),
            "valueQuantity"
        );
    }

    #[test]
    fn value_or_absent_reason() {
        let code = CodableConcept::single(Coding::new("1234", "Head Injury"));
        let mut obs = Observation::new(ObservationStatus::Final, code);
        assert!(!obs.has_value_or_absent_reason());

        obs.data_absent_reason = CodableConcept::single(Coding::new("13244", "Not Available"));
        assert!(obs.has_value_or_absent_reason());
    }
}
