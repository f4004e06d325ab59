use crate::{
    document::{new_document_id, DocumentStore, NewDocument, StoredDocument},
    error::StoreError,
    object::{download_url, ObjectStore},
};
use async_trait::async_trait;
use chrono::{SecondsFormat, Utc};
use parking_lot::RwLock;
use serde_json::Value;
use std::{cmp::Ordering, collections::HashMap};

/// Process-local document store. Documents keep insertion order.
#[derive(Default)]
pub struct MemoryDocumentStore {
    collections: RwLock<HashMap<String, Vec<StoredDocument>>>,
}

impl MemoryDocumentStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn count(&self, collection: &str) -> usize {
        self.collections
            .read()
            .get(collection)
            .map(Vec::len)
            .unwrap_or(0)
    }
}

fn compare_field(a: &Value, b: &Value) -> Ordering {
    match (a, b) {
        (Value::Number(a), Value::Number(b)) => a
            .as_f64()
            .partial_cmp(&b.as_f64())
            .unwrap_or(Ordering::Equal),
        (Value::String(a), Value::String(b)) => a.cmp(b),
        _ => Ordering::Equal,
    }
}

#[async_trait]
impl DocumentStore for MemoryDocumentStore {
    async fn add(&self, collection: &str, document: NewDocument) -> Result<String, StoreError> {
        let id = new_document_id();
        let mut fields = document.fields;
        if let Some(field) = document.server_timestamp {
            // Fixed-width RFC 3339 so string order matches time order.
            let now = Utc::now().to_rfc3339_opts(SecondsFormat::Micros, true);
            fields.insert(field, Value::String(now));
        }

        self.collections
            .write()
            .entry(collection.to_string())
            .or_default()
            .push(StoredDocument {
                id: id.clone(),
                fields,
            });
        Ok(id)
    }

    async fn get(&self, collection: &str, id: &str) -> Result<Option<StoredDocument>, StoreError> {
        Ok(self
            .collections
            .read()
            .get(collection)
            .and_then(|documents| documents.iter().find(|d| d.id == id).cloned()))
    }

    async fn latest(
        &self,
        collection: &str,
        order_by: &str,
    ) -> Result<Option<StoredDocument>, StoreError> {
        let collections = self.collections.read();
        let Some(documents) = collections.get(collection) else {
            return Ok(None);
        };

        // `max_by` keeps the last of equal elements, so ties go to the newest insert.
        Ok(documents
            .iter()
            .filter(|d| d.fields.get(order_by).is_some_and(|v| !v.is_null()))
            .max_by(|a, b| compare_field(&a.fields[order_by], &b.fields[order_by]))
            .cloned())
    }

    async fn list(&self, collection: &str, limit: usize) -> Result<Vec<StoredDocument>, StoreError> {
        Ok(self
            .collections
            .read()
            .get(collection)
            .map(|documents| documents.iter().take(limit).cloned().collect())
            .unwrap_or_default())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct StoredObject {
    pub data: Vec<u8>,
    pub content_type: String,
}

/// Process-local object store that hands out the same URL shape as Firebase.
pub struct MemoryObjectStore {
    base_url: String,
    bucket: String,
    objects: RwLock<HashMap<String, StoredObject>>,
}

impl MemoryObjectStore {
    pub fn new(base_url: &str, bucket: &str) -> Self {
        Self {
            base_url: base_url.to_string(),
            bucket: bucket.to_string(),
            objects: RwLock::new(HashMap::new()),
        }
    }

    pub fn get(&self, path: &str) -> Option<StoredObject> {
        self.objects.read().get(path).cloned()
    }

    pub fn len(&self) -> usize {
        self.objects.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.objects.read().is_empty()
    }
}

#[async_trait]
impl ObjectStore for MemoryObjectStore {
    async fn upload(
        &self,
        path: &str,
        data: Vec<u8>,
        content_type: &str,
    ) -> Result<String, StoreError> {
        let url = download_url(&self.base_url, &self.bucket, path)?;
        self.objects.write().insert(
            path.to_string(),
            StoredObject {
                data,
                content_type: content_type.to_string(),
            },
        );
        Ok(url)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn document(fields: Value) -> NewDocument {
        match fields {
            Value::Object(fields) => NewDocument {
                fields,
                server_timestamp: None,
            },
            _ => unreachable!(),
        }
    }

    #[tokio::test]
    async fn test_add_then_get() {
        let store = MemoryDocumentStore::new();
        let id = store
            .add("images", document(json!({ "file_name": "a.jpg" })))
            .await
            .unwrap();

        let stored = store.get("images", &id).await.unwrap().unwrap();
        assert_eq!(stored.id, id);
        assert_eq!(stored.fields["file_name"], "a.jpg");
        assert!(store.get("images", "missing").await.unwrap().is_none());
        assert!(store.get("other", &id).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_server_timestamp_is_filled() {
        let store = MemoryDocumentStore::new();
        let id = store
            .add(
                "predictions",
                document(json!({ "predicted_class": "a" })).with_server_timestamp("timestamp"),
            )
            .await
            .unwrap();

        let stored = store.get("predictions", &id).await.unwrap().unwrap();
        let timestamp = stored.fields["timestamp"].as_str().unwrap();
        assert!(chrono::DateTime::parse_from_rfc3339(timestamp).is_ok());
    }

    #[tokio::test]
    async fn test_latest_orders_by_field() {
        let store = MemoryDocumentStore::new();
        store
            .add("p", document(json!({ "name": "old", "ts": "2024-01-01T00:00:00.000000Z" })))
            .await
            .unwrap();
        store
            .add("p", document(json!({ "name": "new", "ts": "2024-06-01T00:00:00.000000Z" })))
            .await
            .unwrap();
        store
            .add("p", document(json!({ "name": "mid", "ts": "2024-03-01T00:00:00.000000Z" })))
            .await
            .unwrap();
        store.add("p", document(json!({ "name": "none" }))).await.unwrap();

        let latest = store.latest("p", "ts").await.unwrap().unwrap();
        assert_eq!(latest.fields["name"], "new");
        assert!(store.latest("empty", "ts").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_list_respects_limit_and_order() {
        let store = MemoryDocumentStore::new();
        for i in 0..5 {
            store.add("c", document(json!({ "i": i }))).await.unwrap();
        }

        let listed = store.list("c", 3).await.unwrap();
        let values: Vec<_> = listed.iter().map(|d| d.fields["i"].clone()).collect();
        assert_eq!(values, vec![json!(0), json!(1), json!(2)]);
        assert_eq!(store.count("c"), 5);
    }

    #[tokio::test]
    async fn test_object_upload_returns_public_url() {
        let store = MemoryObjectStore::new("https://firebasestorage.googleapis.com", "bucket");
        let url = store
            .upload("my photo.jpg", vec![1, 2, 3], "image/jpeg")
            .await
            .unwrap();

        assert_eq!(
            url,
            "https://firebasestorage.googleapis.com/v0/b/bucket/o/my%20photo.jpg?alt=media"
        );
        let object = store.get("my photo.jpg").unwrap();
        assert_eq!(object.data, vec![1, 2, 3]);
        assert_eq!(object.content_type, "image/jpeg");
    }
}
