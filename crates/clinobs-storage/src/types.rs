use serde::{Deserialize, Serialize};
use serde_json::Value;
use time::OffsetDateTime;

/// A document as held by the store.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoredDocument {
    /// The document id, also present as `document["id"]`.
    pub id: String,
    pub collection: String,
    pub document: Value,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
}

impl StoredDocument {
    #[must_use]
    pub fn new(id: impl Into<String>, collection: impl Into<String>, document: Value) -> Self {
        Self {
            id: id.into(),
            collection: collection.into(),
            document,
            created_at: OffsetDateTime::now_utc(),
        }
    }
}
