use crate::model::{EffectiveTime, Observation, ObservationValue};
use crate::validation::ValidatedObservation;

/// Build the canonical Observation from validated input.
///
/// When several alternatives are supplied the choice is fixed:
/// `effectivePeriod` beats `effectiveDateTime`, which beats `effectiveDate`.
/// For values the last one present in the order quantity, codable quantity,
/// string, boolean wins.
pub fn normalize(input: ValidatedObservation) -> Observation {
    let effective = input
        .effective_period
        .map(EffectiveTime::Period)
        .or(input.effective_date_time.map(EffectiveTime::DateTime))
        .or(input.effective_date.map(EffectiveTime::Date));

    let value = input
        .value_boolean
        .map(ObservationValue::Flag)
        .or(input.value_string.map(ObservationValue::Text))
        .or(input
            .value_codable_quantity
            .map(ObservationValue::CodableQuantity))
        .or(input.value_quantity.map(ObservationValue::Quantity));

    Observation {
        id: input.id,
        status: input.status,
        category: input.category.into_iter().flatten().collect(),
        code: input.code,
        subject: input.subject.unwrap_or_default(),
        based_on: input.based_on.unwrap_or_default(),
        context: input.context.unwrap_or_default(),
        performer: input.performer.unwrap_or_default(),
        effective,
        issued: input.issued,
        value,
        data_absent_reason: input.data_absent_reason.unwrap_or_default(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{CodableConcept, Coding, EffectivePeriod, Reference};
    use crate::validation::{ValidationOptions, validate};
    use serde_json::json;
    use time::macros::datetime;

    fn normalized(raw: serde_json::Value) -> Observation {
        normalize(validate(&raw, &ValidationOptions::base()).unwrap())
    }

    #[test]
    fn period_wins_over_scalar() {
        let obs = normalized(json!({
            "status": "preliminary",
            "code": {"coding": [{"code": "1234", "display": "Head Injury"}]},
            "valueString": "Headache",
            "effectiveDateTime": "2020-01-01T00:00:00Z",
            "effectivePeriod": {"start": "2020-01-01T00:00:00Z", "end": "2020-01-02T00:00:00Z"}
        }));
        let Some(EffectiveTime::Period(EffectivePeriod { start, end })) = obs.effective else {
            panic!("expected period, got {:?}", obs.effective);
        };
        assert_eq!(start.unwrap().0, datetime!(2020-01-01 00:00:00 UTC));
        assert_eq!(end.unwrap().0, datetime!(2020-01-02 00:00:00 UTC));
    }

    #[test]
    fn date_time_wins_over_date() {
        let obs = normalized(json!({
            "status": "final",
            "code": {"coding": []},
            "valueBoolean": true,
            "effectiveDate": "1999-12-05",
            "effectiveDateTime": "2016-03-28"
        }));
        assert_eq!(
            obs.effective,
            Some(EffectiveTime::DateTime(
                crate::time::FhirDateTime::new(datetime!(2016-03-28 00:00:00 UTC))
            ))
        );
    }

    #[test]
    fn last_value_wins() {
        let obs = normalized(json!({
            "status": "final",
            "code": {"coding": []},
            "valueQuantity": {"value": 140, "unit": "cm"},
            "valueString": "Headache",
            "valueBoolean": false
        }));
        assert_eq!(obs.value, Some(ObservationValue::Flag(false)));

        let obs = normalized(json!({
            "status": "final",
            "code": {"coding": []},
            "valueQuantity": {"value": 140, "unit": "cm"},
            "valueCodableQuantity": {"coding": [{"code": "LP74908-2", "display": "Headache"}]}
        }));
        assert_eq!(
            obs.value.as_ref().map(ObservationValue::field_name),
            Some("valueCodableQuantity")
        );
    }

    #[test]
    fn absent_sub_objects_become_empty() {
        let obs = normalized(json!({
            "status": "registered",
            "code": {"coding": [{"code": "1234", "display": "Head Injury"}]},
            "dataAbsentReason": {"coding": [{"code": "13244", "display": "Not Available"}]}
        }));
        assert_eq!(obs.subject, Reference::default());
        assert_eq!(obs.performer, Reference::default());
        assert!(obs.category.is_empty());
        assert_eq!(obs.effective, None);
        assert_eq!(obs.value, None);
        assert_eq!(
            obs.data_absent_reason,
            CodableConcept::single(Coding::new("13244", "Not Available"))
        );
    }

    #[test]
    fn null_categories_are_dropped() {
        let obs = normalized(json!({
            "status": "final",
            "code": {"coding": []},
            "valueString": "Fever",
            "category": [null, {"coding": [{"code": "24534j", "display": "Exam"}]}, null]
        }));
        assert_eq!(obs.category.len(), 1);
        assert!(obs.category[0].has_code("24534j"));
    }
}
