//! Observation resource model.
//!
//! The leaf datatypes (codings, references, periods, quantities) are plain
//! serde structs. [`Observation`] is the aggregate; its one-of fields are the
//! [`EffectiveTime`] and [`ObservationValue`] sum types.

pub mod coding;
pub mod observation;
pub mod period;
pub mod quantity;
pub mod reference;

pub use coding::{CodableConcept, Coding};
pub use observation::{
    EffectiveTime, Observation, ObservationStatus, ObservationValue, RESOURCE_TYPE,
};
pub use period::EffectivePeriod;
pub use quantity::{QuantityUnit, ValueQuantity};
pub use reference::Reference;
