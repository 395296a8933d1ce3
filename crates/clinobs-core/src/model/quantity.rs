use serde::{Deserialize, Serialize};

/// Units accepted by the base schema variant.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QuantityUnit {
    Cm,
    Mm,
    Ml,
    Lbs,
}

impl QuantityUnit {
    pub const ALL: [QuantityUnit; 4] = [Self::Cm, Self::Mm, Self::Ml, Self::Lbs];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Cm => "cm",
            Self::Mm => "mm",
            Self::Ml => "ml",
            Self::Lbs => "lbs",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|u| u.as_str() == s)
    }
}

impl std::fmt::Display for QuantityUnit {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A measured amount. `system`/`code` carry the unit coding (e.g. UCUM) and
/// are only accepted by the extended schema variant.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ValueQuantity {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub unit: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub system: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub code: Option<String>,
}

impl ValueQuantity {
    pub fn new(value: f64, unit: QuantityUnit) -> Self {
        Self {
            value: Some(value),
            unit: Some(unit.to_string()),
            system: None,
            code: None,
        }
    }
}
