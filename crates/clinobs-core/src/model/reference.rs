use serde::{Deserialize, Serialize};

/// Pointer to another resource, conventionally `<Type>/<id>`.
///
/// The default value is the empty reference, serialized as `{}`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Reference {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reference: Option<String>,
}

impl Reference {
    pub fn new(reference: impl Into<String>) -> Self {
        Self {
            reference: Some(reference.into()),
        }
    }

    /// Build a `<resource_type>/<id>` reference.
    pub fn to(resource_type: &str, id: impl std::fmt::Display) -> Self {
        Self::new(format!("{resource_type}/{id}"))
    }

    pub fn is_empty(&self) -> bool {
        self.reference.is_none()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn empty_reference_is_empty_object() {
        let reference = Reference::default();
        assert!(reference.is_empty());
        assert_eq!(serde_json::to_value(&reference).unwrap(), json!({}));
    }

    #[test]
    fn typed_reference() {
        let reference = Reference::to("Patient", 123);
        assert_eq!(reference.reference.as_deref(), Some("Patient/123"));
    }
}
