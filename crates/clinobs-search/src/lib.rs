//! Observation search for clinobs.
//!
//! Turns the flat query parameters of `GET /fhir/Observation` into a
//! [`clinobs_storage::DocumentFilter`]:
//!
//! - `patient=<id>` matches `subject.reference == "Patient/<id>"`
//! - `code=<c1,c2,...>` matches any `code.coding[].code` in the set
//! - `category=<code>` matches any `category[].coding[].code`
//! - `date=<prefix><date>` compares the scalar effective time
//!
//! Anything else is rejected with a [`QueryError`].

pub mod date;
pub mod error;
pub mod parameters;
pub mod translator;

pub use date::{DateRange, date_filter, parse_date_range};
pub use error::QueryError;
pub use parameters::{ObservationSearchParam, SearchPrefix};
pub use translator::{ObservationQuery, translate};
