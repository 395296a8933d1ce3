//! In-memory document store for clinobs.
//!
//! Implements [`DocumentStore`] on top of a papaya lock-free HashMap.
//! Nothing is persisted across restarts.
//!
//! # Example
//!
//! ```ignore
//! use clinobs_db_memory::InMemoryStore;
//! use clinobs_storage::DocumentStore;
//!
//! let store = InMemoryStore::new();
//! let stored = store
//!     .insert("Observation", serde_json::json!({"status": "final"}))
//!     .await?;
//! assert!(store.read("Observation", &stored.id).await?.is_some());
//! ```

pub mod storage;

pub use clinobs_storage::{DocumentStore, DynStore, StorageError, StoredDocument};
pub use storage::{InMemoryStore, StorageKey};

/// Creates a new shareable in-memory store.
pub fn create_memory_store() -> DynStore {
    std::sync::Arc::new(InMemoryStore::new())
}
