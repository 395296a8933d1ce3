use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use async_trait::async_trait;
use clinobs_core::generate_id;
use clinobs_storage::{DocumentFilter, DocumentStore, StorageError, StoredDocument};
use papaya::HashMap as PapayaHashMap;
use serde_json::Value;

pub type StorageKey = String; // Format: "collection/id"

pub(crate) fn make_storage_key(collection: &str, id: &str) -> StorageKey {
    format!("{collection}/{id}")
}

#[derive(Debug, Clone)]
struct Entry {
    /// Insertion sequence; `find` returns documents in this order.
    seq: u64,
    stored: StoredDocument,
}

/// In-memory document store using a papaya lock-free HashMap.
#[derive(Debug)]
pub struct InMemoryStore {
    data: Arc<PapayaHashMap<StorageKey, Entry>>,
    seq: AtomicU64,
}

impl Default for InMemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self {
            data: Arc::new(PapayaHashMap::new()),
            seq: AtomicU64::new(1),
        }
    }

    fn next_seq(&self) -> u64 {
        self.seq.fetch_add(1, Ordering::SeqCst)
    }
}

fn extract_id(document: &Value) -> Option<String> {
    document.get("id").and_then(|v| v.as_str()).map(String::from)
}

#[async_trait]
impl DocumentStore for InMemoryStore {
    async fn insert(
        &self,
        collection: &str,
        document: Value,
    ) -> Result<StoredDocument, StorageError> {
        let mut document = document;
        let id = extract_id(&document).unwrap_or_else(generate_id);
        let Some(obj) = document.as_object_mut() else {
            return Err(StorageError::not_an_object(collection));
        };
        obj.insert("id".to_string(), Value::String(id.clone()));

        let stored = StoredDocument::new(&id, collection, document);
        let entry = Entry {
            seq: self.next_seq(),
            stored: stored.clone(),
        };

        let guard = self.data.pin();
        if guard
            .try_insert(make_storage_key(collection, &id), entry)
            .is_err()
        {
            return Err(StorageError::already_exists(collection, id));
        }

        tracing::debug!(collection, id = %stored.id, "document inserted");
        Ok(stored)
    }

    async fn read(
        &self,
        collection: &str,
        id: &str,
    ) -> Result<Option<StoredDocument>, StorageError> {
        let key = make_storage_key(collection, id);
        let guard = self.data.pin();
        Ok(guard.get(&key).map(|entry| entry.stored.clone()))
    }

    async fn find(
        &self,
        collection: &str,
        filter: &DocumentFilter,
    ) -> Result<Vec<StoredDocument>, StorageError> {
        let prefix = format!("{collection}/");
        let mut matches: Vec<(u64, StoredDocument)> = {
            let guard = self.data.pin();
            guard
                .iter()
                .filter(|(key, _)| key.starts_with(&prefix))
                .filter(|(_, entry)| filter.matches(&entry.stored.document))
                .map(|(_, entry)| (entry.seq, entry.stored.clone()))
                .collect()
        };
        matches.sort_by_key(|(seq, _)| *seq);
        Ok(matches.into_iter().map(|(_, stored)| stored).collect())
    }

    async fn count(&self, collection: &str) -> Result<usize, StorageError> {
        let prefix = format!("{collection}/");
        let guard = self.data.pin();
        Ok(guard.keys().filter(|key| key.starts_with(&prefix)).count())
    }

    fn backend_name(&self) -> &'static str {
        "memory"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[tokio::test]
    async fn insert_generates_id_and_reads_back() {
        let store = InMemoryStore::new();
        let stored = store
            .insert("Observation", json!({"status": "final"}))
            .await
            .unwrap();

        assert!(!stored.id.is_empty());
        assert_eq!(stored.document["id"], stored.id.as_str());

        let read = store.read("Observation", &stored.id).await.unwrap().unwrap();
        assert_eq!(read.document, stored.document);
        assert!(store.read("Observation", "missing").await.unwrap().is_none());
        assert!(store.read("Patient", &stored.id).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn caller_supplied_id_must_be_unique() {
        let store = InMemoryStore::new();
        let doc = json!({"id": "example", "status": "final"});
        store.insert("Observation", doc.clone()).await.unwrap();

        let err = store.insert("Observation", doc).await.unwrap_err();
        assert!(err.is_already_exists());

        // Same id in another collection is fine.
        store
            .insert("Patient", json!({"id": "example"}))
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn rejects_non_object_documents() {
        let store = InMemoryStore::new();
        let err = store.insert("Observation", json!([1, 2])).await.unwrap_err();
        assert!(matches!(err, StorageError::NotAnObject { .. }));
    }

    #[tokio::test]
    async fn find_filters_and_keeps_insertion_order() {
        let store = InMemoryStore::new();
        for n in 0..5 {
            let status = if n % 2 == 0 { "final" } else { "preliminary" };
            store
                .insert("Observation", json!({"id": format!("obs-{n}"), "status": status}))
                .await
                .unwrap();
        }
        store
            .insert("Patient", json!({"status": "final"}))
            .await
            .unwrap();

        let all = store.find("Observation", &DocumentFilter::All).await.unwrap();
        let ids: Vec<&str> = all.iter().map(|s| s.id.as_str()).collect();
        assert_eq!(ids, vec!["obs-0", "obs-1", "obs-2", "obs-3", "obs-4"]);

        let finals = store
            .find("Observation", &DocumentFilter::eq("status", "final"))
            .await
            .unwrap();
        let ids: Vec<&str> = finals.iter().map(|s| s.id.as_str()).collect();
        assert_eq!(ids, vec!["obs-0", "obs-2", "obs-4"]);

        assert_eq!(store.count("Observation").await.unwrap(), 5);
        assert_eq!(store.count("Patient").await.unwrap(), 1);
    }

    #[tokio::test]
    async fn concurrent_inserts_do_not_collide() {
        let store = Arc::new(InMemoryStore::new());
        let mut handles = Vec::new();
        for _ in 0..16 {
            let store = store.clone();
            handles.push(tokio::spawn(async move {
                store
                    .insert("Observation", json!({"status": "final"}))
                    .await
                    .unwrap()
            }));
        }
        for handle in handles {
            handle.await.unwrap();
        }
        assert_eq!(store.count("Observation").await.unwrap(), 16);
    }
}
