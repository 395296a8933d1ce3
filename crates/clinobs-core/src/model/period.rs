use crate::time::FhirDateTime;
use serde::{Deserialize, Serialize};

/// Time span of an observation; either bound may be missing.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EffectivePeriod {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub start: Option<FhirDateTime>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub end: Option<FhirDateTime>,
}

impl EffectivePeriod {
    pub fn new(start: Option<FhirDateTime>, end: Option<FhirDateTime>) -> Self {
        Self { start, end }
    }
}
