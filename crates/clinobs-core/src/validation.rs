//! Two-phase validation of untyped Observation input.
//!
//! Phase one walks the JSON payload and parses every recognized field into
//! its typed form, collecting a [`FieldViolation`] for each broken rule.
//! Phase two only runs on a clean parse and checks the cross-field rule that
//! an observation carries either a value or a data-absent reason.
//!
//! Unknown top-level keys are ignored. Objects nested under a recognized key
//! are strict: any key they do not define is a violation.

use crate::id::validate_id;
use crate::model::{
    CodableConcept, Coding, EffectivePeriod, ObservationStatus, QuantityUnit, RESOURCE_TYPE,
    Reference, ValueQuantity,
};
use crate::time::FhirDateTime;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use thiserror::Error;

pub const SEMANTIC_MESSAGE: &str = "Both Value and Data Absent Reason Cannot be Blank";

/// Which input schema is enforced.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SchemaVariant {
    /// Store-assigned ids, `valueQuantity` limited to `value` and an enumerated `unit`.
    #[default]
    Base,
    /// Caller-supplied `id`, free-text units with optional unit coding.
    Extended,
}

impl std::fmt::Display for SchemaVariant {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Base => write!(f, "base"),
            Self::Extended => write!(f, "extended"),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ValidationOptions {
    pub variant: SchemaVariant,
}

impl ValidationOptions {
    pub fn base() -> Self {
        Self {
            variant: SchemaVariant::Base,
        }
    }

    pub fn extended() -> Self {
        Self {
            variant: SchemaVariant::Extended,
        }
    }
}

/// Rule broken by a single field.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Rule {
    Required,
    Type,
    NotAllowed,
    Empty,
    MinLength,
    OneOf,
    Uri,
    Date,
    IdFormat,
}

impl Rule {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Required => "required",
            Self::Type => "type",
            Self::NotAllowed => "not_allowed",
            Self::Empty => "empty",
            Self::MinLength => "min_length",
            Self::OneOf => "one_of",
            Self::Uri => "uri",
            Self::Date => "date",
            Self::IdFormat => "id_format",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldViolation {
    /// Dotted path of the offending field, e.g. `code.coding[0].display`.
    pub path: String,
    pub rule: Rule,
    pub message: String,
}

impl FieldViolation {
    pub fn new(path: impl Into<String>, rule: Rule, message: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            rule,
            message: message.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    /// Shape, type or enumeration failures, in schema field order.
    #[error("{}", first_message(.violations))]
    Schema { violations: Vec<FieldViolation> },

    /// Neither a value nor a data-absent reason was supplied.
    #[error("{}", SEMANTIC_MESSAGE)]
    Semantic,
}

fn first_message(violations: &[FieldViolation]) -> &str {
    violations
        .first()
        .map(|v| v.message.as_str())
        .unwrap_or("invalid Observation")
}

impl ValidationError {
    pub fn first_violation(&self) -> Option<&FieldViolation> {
        match self {
            Self::Schema { violations } => violations.first(),
            Self::Semantic => None,
        }
    }

    /// FHIRPath-ish locations of the problem, for `OperationOutcome.issue.expression`.
    pub fn expression(&self) -> Vec<String> {
        match self {
            Self::Schema { violations } => violations
                .first()
                .filter(|v| !v.path.is_empty())
                .map(|v| vec![v.path.clone()])
                .unwrap_or_default(),
            Self::Semantic => vec!["value[x]".to_string(), "dataAbsentReason".to_string()],
        }
    }
}

/// Input that passed both validation phases.
///
/// Every sibling alternative is still present here; choosing the active
/// effective and value field is the normalizer's job.
#[derive(Debug, Clone, PartialEq)]
pub struct ValidatedObservation {
    pub id: Option<String>,
    pub status: ObservationStatus,
    pub code: CodableConcept,
    pub category: Vec<Option<CodableConcept>>,
    pub subject: Option<Reference>,
    pub based_on: Option<Reference>,
    pub context: Option<Reference>,
    pub performer: Option<Reference>,
    pub issued: Option<FhirDateTime>,
    pub effective_date: Option<FhirDateTime>,
    pub effective_date_time: Option<FhirDateTime>,
    pub effective_period: Option<EffectivePeriod>,
    pub value_quantity: Option<ValueQuantity>,
    pub value_codable_quantity: Option<CodableConcept>,
    pub value_string: Option<String>,
    pub value_boolean: Option<bool>,
    pub data_absent_reason: Option<CodableConcept>,
}

impl ValidatedObservation {
    pub fn has_value(&self) -> bool {
        self.value_quantity.is_some()
            || self.value_codable_quantity.is_some()
            || self.value_string.is_some()
            || self.value_boolean.is_some()
    }

    /// A data-absent reason only counts when it carries at least one coding.
    pub fn has_data_absent_reason(&self) -> bool {
        self.data_absent_reason
            .as_ref()
            .is_some_and(|reason| !reason.is_empty())
    }
}

/// Validate a raw JSON payload.
pub fn validate(
    raw: &Value,
    options: &ValidationOptions,
) -> Result<ValidatedObservation, ValidationError> {
    let Value::Object(root) = raw else {
        return Err(ValidationError::Schema {
            violations: vec![FieldViolation::new(
                "",
                Rule::Type,
                "\"value\" must be an object",
            )],
        });
    };

    let mut checker = Checker {
        options,
        violations: Vec::new(),
    };
    let parsed = checker.observation(root);

    match parsed {
        Some(input) if checker.violations.is_empty() => {
            if !input.has_value() && !input.has_data_absent_reason() {
                return Err(ValidationError::Semantic);
            }
            Ok(input)
        }
        _ => {
            tracing::debug!(
                violations = checker.violations.len(),
                "observation failed schema validation"
            );
            Err(ValidationError::Schema {
                violations: checker.violations,
            })
        }
    }
}

fn join(parent: &str, key: &str) -> String {
    if parent.is_empty() {
        key.to_string()
    } else {
        format!("{parent}.{key}")
    }
}

struct Checker<'a> {
    options: &'a ValidationOptions,
    violations: Vec<FieldViolation>,
}

impl Checker<'_> {
    fn push(&mut self, path: &str, rule: Rule, message: String) {
        self.violations.push(FieldViolation::new(path, rule, message));
    }

    fn type_error(&mut self, path: &str, expected: &str) {
        self.push(path, Rule::Type, format!("\"{path}\" must be {expected}"));
    }

    fn required<'v>(&mut self, map: &'v Map<String, Value>, key: &str) -> Option<&'v Value> {
        let value = map.get(key);
        if value.is_none() {
            self.push(key, Rule::Required, format!("\"{key}\" is required"));
        }
        value
    }

    fn field<T>(
        &mut self,
        map: &Map<String, Value>,
        parent: &str,
        key: &str,
        parse: impl FnOnce(&mut Self, &str, &Value) -> Option<T>,
    ) -> Option<T> {
        let value = map.get(key)?;
        parse(self, &join(parent, key), value)
    }

    fn object<'v>(
        &mut self,
        path: &str,
        value: &'v Value,
        allowed: &[&str],
    ) -> Option<&'v Map<String, Value>> {
        let Value::Object(map) = value else {
            self.type_error(path, "an object");
            return None;
        };
        for key in map.keys() {
            if !allowed.contains(&key.as_str()) {
                let nested = join(path, key);
                self.push(
                    &nested,
                    Rule::NotAllowed,
                    format!("\"{nested}\" is not allowed"),
                );
            }
        }
        Some(map)
    }

    fn string(&mut self, path: &str, value: &Value) -> Option<String> {
        match value {
            Value::String(s) if s.is_empty() => {
                self.push(
                    path,
                    Rule::Empty,
                    format!("\"{path}\" is not allowed to be empty"),
                );
                None
            }
            Value::String(s) => Some(s.clone()),
            _ => {
                self.type_error(path, "a string");
                None
            }
        }
    }

    fn min_length(&mut self, path: &str, s: String, min: usize) -> Option<String> {
        if s.chars().count() < min {
            self.push(
                path,
                Rule::MinLength,
                format!("\"{path}\" length must be at least {min} characters long"),
            );
            return None;
        }
        Some(s)
    }

    fn uri(&mut self, path: &str, value: &Value) -> Option<String> {
        let s = self.string(path, value)?;
        if url::Url::parse(&s).is_err() {
            self.push(path, Rule::Uri, format!("\"{path}\" must be a valid uri"));
            return None;
        }
        Some(s)
    }

    fn timestamp(&mut self, path: &str, value: &Value) -> Option<FhirDateTime> {
        let parsed = match value {
            Value::String(s) => FhirDateTime::parse_lenient(s).ok(),
            Value::Number(n) => n
                .as_i64()
                .and_then(|millis| FhirDateTime::from_unix_millis(millis).ok()),
            _ => None,
        };
        if parsed.is_none() {
            self.push(
                path,
                Rule::Date,
                format!("\"{path}\" must be a number of milliseconds or valid date string"),
            );
        }
        parsed
    }

    fn boolean(&mut self, path: &str, value: &Value) -> Option<bool> {
        let flag = value.as_bool();
        if flag.is_none() {
            self.type_error(path, "a boolean");
        }
        flag
    }

    fn coding(&mut self, path: &str, value: &Value) -> Option<Coding> {
        let map = self.object(path, value, &["code", "system", "display"])?;
        let code = match map.get("code") {
            Some(v) => self.string(&join(path, "code"), v),
            None => self.missing(&join(path, "code")),
        };
        let system = self.field(map, path, "system", Self::uri);
        let display = match map.get("display") {
            Some(v) => self.string(&join(path, "display"), v),
            None => self.missing(&join(path, "display")),
        };
        Some(Coding {
            code: code?,
            system,
            display: display?,
        })
    }

    fn missing<T>(&mut self, path: &str) -> Option<T> {
        self.push(path, Rule::Required, format!("\"{path}\" is required"));
        None
    }

    fn concept(&mut self, path: &str, value: &Value) -> Option<CodableConcept> {
        let map = self.object(path, value, &["coding"])?;
        let mut coding = Vec::new();
        match map.get("coding") {
            None => {}
            Some(Value::Array(items)) => {
                for (i, item) in items.iter().enumerate() {
                    if let Some(c) = self.coding(&format!("{path}.coding[{i}]"), item) {
                        coding.push(c);
                    }
                }
            }
            Some(_) => self.type_error(&join(path, "coding"), "an array"),
        }
        Some(CodableConcept { coding })
    }

    fn reference(&mut self, path: &str, value: &Value) -> Option<Reference> {
        let map = self.object(path, value, &["reference"])?;
        let reference = map.get("reference").and_then(|v| {
            let p = join(path, "reference");
            let s = self.string(&p, v)?;
            self.min_length(&p, s, 3)
        });
        Some(Reference { reference })
    }

    fn period(&mut self, path: &str, value: &Value) -> Option<EffectivePeriod> {
        let map = self.object(path, value, &["start", "end"])?;
        let start = self.field(map, path, "start", Self::timestamp);
        let end = self.field(map, path, "end", Self::timestamp);
        Some(EffectivePeriod { start, end })
    }

    fn quantity(&mut self, path: &str, value: &Value) -> Option<ValueQuantity> {
        let extended = self.options.variant == SchemaVariant::Extended;
        let allowed: &[&str] = if extended {
            &["value", "unit", "system", "code"]
        } else {
            &["value", "unit"]
        };
        let map = self.object(path, value, allowed)?;

        let amount = self.field(map, path, "value", |this, p, v| {
            let n = v.as_f64();
            if n.is_none() {
                this.type_error(p, "a number");
            }
            n
        });
        let unit = self.field(map, path, "unit", |this, p, v| {
            let unit = this.string(p, v)?;
            if !extended && QuantityUnit::parse(&unit).is_none() {
                let allowed: Vec<&str> = QuantityUnit::ALL.iter().map(|u| u.as_str()).collect();
                this.push(
                    p,
                    Rule::OneOf,
                    format!("\"{p}\" must be one of [{}]", allowed.join(", ")),
                );
                return None;
            }
            Some(unit)
        });
        let (system, code) = if extended {
            (
                self.field(map, path, "system", Self::uri),
                self.field(map, path, "code", Self::string),
            )
        } else {
            (None, None)
        };

        Some(ValueQuantity {
            value: amount,
            unit,
            system,
            code,
        })
    }

    fn observation(&mut self, root: &Map<String, Value>) -> Option<ValidatedObservation> {
        if let Some(v) = root.get("resourceType")
            && let Some(s) = self.string("resourceType", v)
            && s != RESOURCE_TYPE
        {
            self.push(
                "resourceType",
                Rule::OneOf,
                format!("\"resourceType\" must be one of [{RESOURCE_TYPE}]"),
            );
        }

        let id = match self.options.variant {
            SchemaVariant::Base => None,
            SchemaVariant::Extended => self.required(root, "id").and_then(|v| {
                let id = self.string("id", v)?;
                match validate_id(&id) {
                    Ok(()) => Some(id),
                    Err(e) => {
                        self.push("id", Rule::IdFormat, format!("\"id\" {e}"));
                        None
                    }
                }
            }),
        };

        let status = self.required(root, "status").and_then(|v| {
            let s = self.string("status", v)?;
            let status = ObservationStatus::parse(&s);
            if status.is_none() {
                let allowed: Vec<&str> =
                    ObservationStatus::ALL.iter().map(|s| s.as_str()).collect();
                self.push(
                    "status",
                    Rule::OneOf,
                    format!("\"status\" must be one of [{}]", allowed.join(", ")),
                );
            }
            status
        });

        let code = self
            .required(root, "code")
            .and_then(|v| self.concept("code", v));

        let category = match root.get("category") {
            None => Vec::new(),
            Some(Value::Array(items)) => {
                let mut category = Vec::with_capacity(items.len());
                for (i, item) in items.iter().enumerate() {
                    if item.is_null() {
                        category.push(None);
                    } else if let Some(concept) = self.concept(&format!("category[{i}]"), item) {
                        category.push(Some(concept));
                    }
                }
                category
            }
            Some(_) => {
                self.type_error("category", "an array");
                Vec::new()
            }
        };

        let subject = self.field(root, "", "subject", Self::reference);
        let based_on = self.field(root, "", "basedOn", Self::reference);
        let context = self.field(root, "", "context", Self::reference);
        let performer = self.field(root, "", "performer", Self::reference);
        let issued = self.field(root, "", "issued", Self::timestamp);

        let effective_date = self.field(root, "", "effectiveDate", Self::timestamp);
        let effective_date_time = self.field(root, "", "effectiveDateTime", Self::timestamp);
        let effective_period = self.field(root, "", "effectivePeriod", Self::period);

        let value_quantity = self.field(root, "", "valueQuantity", Self::quantity);
        let value_codable_quantity = self.field(root, "", "valueCodableQuantity", Self::concept);
        let value_string = match root.get("valueString") {
            None | Some(Value::Null) => None,
            Some(v) => self
                .string("valueString", v)
                .and_then(|s| self.min_length("valueString", s, 3)),
        };
        let value_boolean = self.field(root, "", "valueBoolean", Self::boolean);
        let data_absent_reason = self.field(root, "", "dataAbsentReason", Self::concept);

        Some(ValidatedObservation {
            id,
            status: status?,
            code: code?,
            category,
            subject,
            based_on,
            context,
            performer,
            issued,
            effective_date,
            effective_date_time,
            effective_period,
            value_quantity,
            value_codable_quantity,
            value_string,
            value_boolean,
            data_absent_reason,
        })
    }
}
