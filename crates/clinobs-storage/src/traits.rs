use async_trait::async_trait;
use serde_json::Value;

use crate::error::StorageError;
use crate::filter::DocumentFilter;
use crate::types::StoredDocument;

/// A generic JSON document store.
///
/// Each call is atomic on its own; the trait offers no multi-call
/// transactions. Implementations must be safe to share across request tasks.
#[async_trait]
pub trait DocumentStore: Send + Sync {
    /// Insert a new document into `collection`.
    ///
    /// If the document carries a string `id` it is used as-is; otherwise a
    /// fresh id is generated and written into the stored document.
    ///
    /// # Errors
    ///
    /// - `StorageError::AlreadyExists` if the id is already taken
    /// - `StorageError::NotAnObject` if `document` is not a JSON object
    async fn insert(&self, collection: &str, document: Value)
    -> Result<StoredDocument, StorageError>;

    /// Fetch a document by id. Returns `Ok(None)` when absent.
    async fn read(&self, collection: &str, id: &str)
    -> Result<Option<StoredDocument>, StorageError>;

    /// All documents in `collection` matching `filter`, in insertion order.
    async fn find(
        &self,
        collection: &str,
        filter: &DocumentFilter,
    ) -> Result<Vec<StoredDocument>, StorageError>;

    /// Number of documents in `collection`.
    async fn count(&self, collection: &str) -> Result<usize, StorageError>;

    /// Short name of the backend, for logs.
    fn backend_name(&self) -> &'static str;
}
