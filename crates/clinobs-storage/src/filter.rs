//! Backend-neutral predicates over stored JSON documents.
//!
//! Paths are dotted field names. Arrays met along the way are traversed
//! implicitly, so `category.coding.code` reaches every code of every
//! category, the way document databases resolve such paths.

use clinobs_core::FhirDateTime;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CompareOp {
    Lt,
    Le,
    Gt,
    Ge,
}

impl CompareOp {
    fn holds(self, lhs: &FhirDateTime, rhs: &FhirDateTime) -> bool {
        match self {
            Self::Lt => lhs < rhs,
            Self::Le => lhs <= rhs,
            Self::Gt => lhs > rhs,
            Self::Ge => lhs >= rhs,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum DocumentFilter {
    /// Matches every document.
    All,
    And(Vec<DocumentFilter>),
    Or(Vec<DocumentFilter>),
    Not(Box<DocumentFilter>),
    /// Some string at `path` equals `value`.
    Eq { path: String, value: String },
    /// Some string at `path` is one of `values`.
    In { path: String, values: Vec<String> },
    /// Some timestamp at `path` compares to `instant` with `op`.
    Compare {
        path: String,
        op: CompareOp,
        instant: FhirDateTime,
    },
    /// Some non-null value exists at `path`.
    Exists { path: String },
}

impl DocumentFilter {
    pub fn eq(path: impl Into<String>, value: impl Into<String>) -> Self {
        Self::Eq {
            path: path.into(),
            value: value.into(),
        }
    }

    pub fn any_of(path: impl Into<String>, values: Vec<String>) -> Self {
        Self::In {
            path: path.into(),
            values,
        }
    }

    pub fn compare(path: impl Into<String>, op: CompareOp, instant: FhirDateTime) -> Self {
        Self::Compare {
            path: path.into(),
            op,
            instant,
        }
    }

    pub fn exists(path: impl Into<String>) -> Self {
        Self::Exists { path: path.into() }
    }

    #[allow(clippy::should_implement_trait)]
    pub fn not(inner: DocumentFilter) -> Self {
        Self::Not(Box::new(inner))
    }

    /// Conjunction that collapses trivial cases.
    pub fn and(mut filters: Vec<DocumentFilter>) -> Self {
        filters.retain(|f| *f != Self::All);
        match filters.len() {
            0 => Self::All,
            1 => filters.remove(0),
            _ => Self::And(filters),
        }
    }

    pub fn or(filters: Vec<DocumentFilter>) -> Self {
        Self::Or(filters)
    }

    pub fn matches(&self, document: &Value) -> bool {
        match self {
            Self::All => true,
            Self::And(filters) => filters.iter().all(|f| f.matches(document)),
            Self::Or(filters) => filters.iter().any(|f| f.matches(document)),
            Self::Not(inner) => !inner.matches(document),
            Self::Eq { path, value } => resolve(document, path)
                .into_iter()
                .any(|v| v.as_str() == Some(value.as_str())),
            Self::In { path, values } => resolve(document, path)
                .into_iter()
                .filter_map(Value::as_str)
                .any(|s| values.iter().any(|v| v == s)),
            Self::Compare { path, op, instant } => resolve(document, path)
                .into_iter()
                .filter_map(Value::as_str)
                .filter_map(|s| FhirDateTime::from_str(s).ok())
                .any(|ts| op.holds(&ts, instant)),
            Self::Exists { path } => resolve(document, path)
                .into_iter()
                .any(|v| !v.is_null()),
        }
    }
}

fn resolve<'a>(document: &'a Value, path: &str) -> Vec<&'a Value> {
    let mut current = vec![document];
    for segment in path.split('.') {
        let mut next = Vec::new();
        for value in current {
            if let Some(child) = value.get(segment) {
                flatten(child, &mut next);
            }
        }
        current = next;
    }
    current
}

fn flatten<'a>(value: &'a Value, out: &mut Vec<&'a Value>) {
    match value {
        Value::Array(items) => items.iter().for_each(|item| flatten(item, out)),
        other => out.push(other),
    }
}
