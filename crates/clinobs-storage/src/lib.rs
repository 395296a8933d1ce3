//! # clinobs-storage
//!
//! Storage abstraction for clinobs.
//!
//! The service persists one JSON document per Observation and needs only
//! three things from a backend: insert, read by id, and find by a
//! [`DocumentFilter`]. Backends implement [`DocumentStore`] and live in
//! their own crates.

mod error;
pub mod filter;
mod traits;
mod types;

pub use error::{ErrorCategory, StorageError};
pub use filter::{CompareOp, DocumentFilter};
pub use traits::DocumentStore;
pub use types::StoredDocument;

/// Type alias for a storage result.
pub type StorageResult<T> = Result<T, StorageError>;

/// Shared handle to a store backend.
pub type DynStore = std::sync::Arc<dyn DocumentStore>;

