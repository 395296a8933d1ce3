use crate::model::{EffectiveTime, Observation, ObservationValue, RESOURCE_TYPE};
use serde::Serialize;
use serde_json::{Map, Value, json};

/// Public representation of a stored Observation.
///
/// Carries the always-present fields plus only the active effective and
/// value alternatives, under their own names. Discriminator strings are not
/// emitted.
pub fn project(obs: &Observation) -> Value {
    let mut out = Map::new();
    if let Some(id) = &obs.id {
        out.insert("id".into(), json!(id));
    }
    out.insert("resourceType".into(), json!(RESOURCE_TYPE));
    out.insert("status".into(), json!(obs.status));
    out.insert("category".into(), to_json(&obs.category));
    out.insert("code".into(), to_json(&obs.code));
    out.insert("subject".into(), to_json(&obs.subject));
    out.insert("basedOn".into(), to_json(&obs.based_on));
    out.insert("context".into(), to_json(&obs.context));
    out.insert("performer".into(), to_json(&obs.performer));
    if let Some(issued) = &obs.issued {
        out.insert("issued".into(), to_json(issued));
    }

    match &obs.effective {
        Some(effective @ (EffectiveTime::Date(ts) | EffectiveTime::DateTime(ts))) => {
            out.insert(effective.field_name().into(), to_json(ts));
        }
        Some(effective @ EffectiveTime::Period(period)) => {
            out.insert(effective.field_name().into(), to_json(period));
        }
        None => {}
    }

    match &obs.value {
        Some(value @ ObservationValue::Quantity(q)) => {
            out.insert(value.field_name().into(), to_json(q));
        }
        Some(value @ ObservationValue::CodableQuantity(c)) => {
            out.insert(value.field_name().into(), to_json(c));
        }
        Some(value @ ObservationValue::Text(s)) => {
            out.insert(value.field_name().into(), json!(s));
        }
        Some(value @ ObservationValue::Flag(b)) => {
            out.insert(value.field_name().into(), json!(b));
        }
        None => {}
    }

    out.insert("dataAbsentReason".into(), to_json(&obs.data_absent_reason));
    Value::Object(out)
}

// Model types serialize infallibly: string keys only, no maps with non-string keys.
fn to_json<T: Serialize>(value: &T) -> Value {
    serde_json::to_value(value).unwrap_or(Value::Null)
}
