//! Synthetic observations for startup seeding and tests.
//!
//! Every observation built here passes validation: it always carries a
//! value, and all references use a resource type the field allows.

use clinobs_api::ApiError;
use clinobs_core::{
    CodableConcept, Coding, EffectivePeriod, EffectiveTime, FhirDateTime, Observation,
    ObservationStatus, ObservationValue, QuantityUnit, Reference, ValueQuantity,
};
use time::{Duration, OffsetDateTime, Time, macros::datetime};

use crate::service::ObservationService;

const SUBJECT_TYPES: [&str; 4] = ["Patient", "Group", "Device", "Location"];
const BASED_ON_TYPES: [&str; 7] = [
    "CarePlan",
    "DeviceRequest",
    "ImmunizationRecommendation",
    "MedicationRequest",
    "NutritionOrder",
    "ProcedureRequest",
    "ReferralRequest",
];
const CONTEXT_TYPES: [&str; 2] = ["Encounter", "EpisodeOfCare"];
const PERFORMER_TYPES: [&str; 4] = ["Practitioner", "Organization", "Patient", "RelatedPerson"];
const FINDINGS: [&str; 6] = [
    "Fever",
    "Headache",
    "Nausea",
    "Dizziness",
    "Fatigue",
    "Cough",
];
const CATEGORY_OFFSET: u32 = 5121;

/// Builds random but valid observations.
pub struct ObservationFactory {
    rng: fastrand::Rng,
}

impl Default for ObservationFactory {
    fn default() -> Self {
        Self::new()
    }
}

impl ObservationFactory {
    pub fn new() -> Self {
        Self {
            rng: fastrand::Rng::new(),
        }
    }

    /// Deterministic output for a given seed.
    pub fn with_seed(seed: u64) -> Self {
        Self {
            rng: fastrand::Rng::with_seed(seed),
        }
    }

    pub fn build(&mut self) -> Observation {
        let code = self.rng.u32(1000..100_000);
        let status = self.pick(&ObservationStatus::ALL);

        let mut obs = Observation::new(
            status,
            CodableConcept::single(Coding::new(code.to_string(), format!("Finding {code}"))),
        );
        obs.category = vec![CodableConcept::single(Coding::new(
            (code + CATEGORY_OFFSET).to_string(),
            "Exam",
        ))];
        obs.subject = self.reference(&SUBJECT_TYPES);
        obs.based_on = self.reference(&BASED_ON_TYPES);
        obs.context = self.reference(&CONTEXT_TYPES);
        obs.performer = self.reference(&PERFORMER_TYPES);
        obs.effective = Some(self.effective());
        obs.value = Some(self.value());
        obs
    }

    /// Build an observation, then let the caller adjust it.
    pub fn build_with(&mut self, overrides: impl FnOnce(&mut Observation)) -> Observation {
        let mut obs = self.build();
        overrides(&mut obs);
        obs
    }

    fn pick<T: Copy>(&mut self, items: &[T]) -> T {
        items[self.rng.usize(..items.len())]
    }

    fn reference(&mut self, types: &[&str]) -> Reference {
        let resource_type = self.pick(types);
        Reference::to(resource_type, self.rng.u32(1..10_000))
    }

    fn instant(&mut self) -> OffsetDateTime {
        let earliest = datetime!(1990-01-01 00:00:00 UTC);
        let now = OffsetDateTime::now_utc();
        let span = (now - earliest).whole_seconds().max(1);
        earliest + Duration::seconds(self.rng.i64(0..span))
    }

    fn effective(&mut self) -> EffectiveTime {
        let start = self.instant();
        match self.rng.u8(0..3) {
            0 => EffectiveTime::Date(FhirDateTime::new(start.replace_time(Time::MIDNIGHT))),
            1 => EffectiveTime::DateTime(FhirDateTime::new(start)),
            _ => {
                let end = start + Duration::days(self.rng.i64(1..30));
                EffectiveTime::Period(EffectivePeriod::new(
                    Some(FhirDateTime::new(start)),
                    Some(FhirDateTime::new(end)),
                ))
            }
        }
    }

    fn value(&mut self) -> ObservationValue {
        match self.rng.u8(0..4) {
            0 => ObservationValue::Text(self.pick(&FINDINGS).to_string()),
            1 => ObservationValue::Flag(true),
            2 => {
                let code = self.rng.u32(1000..100_000);
                ObservationValue::CodableQuantity(CodableConcept::single(Coding::new(
                    format!("LP{code}-2"),
                    self.pick(&FINDINGS),
                )))
            }
            _ => {
                let value = f64::from(self.rng.u32(30..220));
                ObservationValue::Quantity(ValueQuantity::new(value, QuantityUnit::Cm))
            }
        }
    }
}

/// Persist `count` random observations, each adjusted by `overrides`.
///
/// Returns the stored ids in insertion order.
pub async fn make_observations(
    service: &ObservationService,
    count: usize,
    mut overrides: impl FnMut(&mut Observation),
) -> Result<Vec<String>, ApiError> {
    let mut factory = ObservationFactory::new();
    let mut ids = Vec::with_capacity(count);
    for _ in 0..count {
        let obs = factory.build_with(&mut overrides);
        let stored = service.persist(&obs).await?;
        ids.push(stored.id);
    }
    Ok(ids)
}

/// Insert the configured number of synthetic observations.
pub async fn seed(service: &ObservationService, count: usize) -> Result<(), ApiError> {
    if count == 0 {
        return Ok(());
    }
    let ids = make_observations(service, count, |_| {}).await?;
    tracing::info!(count = ids.len(), "seeded synthetic observations");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use clinobs_core::{ObservationDocument, ValidationOptions, validate};
    use clinobs_db_memory::create_memory_store;

    #[test]
    fn built_observations_validate() {
        let mut factory = ObservationFactory::with_seed(7);
        for _ in 0..50 {
            let obs = factory.build();
            assert!(obs.has_value_or_absent_reason());

            let mut raw = ObservationDocument::from(&obs).to_value().unwrap();
            // Discriminators are output-only.
            let map = raw.as_object_mut().unwrap();
            map.remove("effective");
            map.remove("value");
            validate(&raw, &ValidationOptions::base()).unwrap();
        }
    }

    #[test]
    fn category_code_follows_code() {
        let obs = ObservationFactory::with_seed(1).build();
        let code: u32 = obs.code.coding[0].code.parse().unwrap();
        let category: u32 = obs.category[0].coding[0].code.parse().unwrap();
        assert_eq!(category, code + CATEGORY_OFFSET);
    }

    #[test]
    fn overrides_apply() {
        let obs = ObservationFactory::new().build_with(|obs| {
            obs.subject = Reference::to("Patient", 123);
            obs.status = ObservationStatus::Final;
        });
        assert_eq!(obs.subject.reference.as_deref(), Some("Patient/123"));
        assert_eq!(obs.status, ObservationStatus::Final);
    }

    #[tokio::test]
    async fn seed_inserts_requested_count() {
        let service = ObservationService::new(create_memory_store(), ValidationOptions::base());
        seed(&service, 5).await.unwrap();
        assert_eq!(
            service
                .store()
                .count(clinobs_core::RESOURCE_TYPE)
                .await
                .unwrap(),
            5
        );
    }
}
