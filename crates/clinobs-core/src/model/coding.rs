use serde::{Deserialize, Serialize};

/// A single `(code, system, display)` triple.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Coding {
    pub code: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub system: Option<String>,
    pub display: String,
}

impl Coding {
    pub fn new(code: impl Into<String>, display: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            system: None,
            display: display.into(),
        }
    }

    pub fn with_system(mut self, system: impl Into<String>) -> Self {
        self.system = Some(system.into());
        self
    }
}

/// Ordered list of codings describing one concept.
///
/// An absent concept is represented by the empty list, so every concept-typed
/// field of an Observation serializes as `{"coding": [...]}`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CodableConcept {
    #[serde(default)]
    pub coding: Vec<Coding>,
}

impl CodableConcept {
    pub fn new(coding: Vec<Coding>) -> Self {
        Self { coding }
    }

    pub fn single(coding: Coding) -> Self {
        Self {
            coding: vec![coding],
        }
    }

    pub fn is_empty(&self) -> bool {
        self.coding.is_empty()
    }

    pub fn has_code(&self, code: &str) -> bool {
        self.coding.iter().any(|c| c.code == code)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn system_is_omitted_when_absent() {
        let coding = Coding::new("1234", "Head Injury");
        assert_eq!(
            serde_json::to_value(&coding).unwrap(),
            json!({"code": "1234", "display": "Head Injury"})
        );

        let coding = coding.with_system("http://loinc.org");
        assert_eq!(
            serde_json::to_value(&coding).unwrap()["system"],
            "http://loinc.org"
        );
    }

    #[test]
    fn empty_concept_serializes_with_empty_list() {
        let concept = CodableConcept::default();
        assert!(concept.is_empty());
        assert_eq!(serde_json::to_value(&concept).unwrap(), json!({"coding": []}));

        let parsed: CodableConcept = serde_json::from_value(json!({})).unwrap();
        assert_eq!(parsed, concept);
    }

    #[test]
    fn has_code_checks_every_coding() {
        let concept = CodableConcept::new(vec![
            Coding::new("29463-7", "Body Weight"),
            Coding::new("3141-9", "Body weight Measured"),
        ]);
        assert!(concept.has_code("3141-9"));
        assert!(!concept.has_code("8480-6"));
    }
}
