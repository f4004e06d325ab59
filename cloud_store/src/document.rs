use crate::error::StoreError;
use async_trait::async_trait;
use rand::{distr::Alphanumeric, Rng};
use serde::{de::DeserializeOwned, Serialize};
use serde_json::{Map, Value};
use std::{marker::PhantomData, sync::Arc};

const DOCUMENT_ID_LEN: usize = 20;

/// A document about to be created.
#[derive(Debug, Clone, Default)]
pub struct NewDocument {
    pub fields: Map<String, Value>,
    /// Field to be filled with the backend's commit time.
    pub server_timestamp: Option<String>,
}

impl NewDocument {
    pub fn from_record<T: Serialize>(record: &T) -> Result<Self, StoreError> {
        match serde_json::to_value(record)? {
            Value::Object(fields) => Ok(Self {
                fields,
                server_timestamp: None,
            }),
            _ => Err(StoreError::NotAnObject),
        }
    }

    pub fn with_server_timestamp(mut self, field: &str) -> Self {
        self.server_timestamp = Some(field.to_string());
        self
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct StoredDocument {
    pub id: String,
    pub fields: Map<String, Value>,
}

#[async_trait]
pub trait DocumentStore: Send + Sync + 'static {
    /// Creates a document under a fresh id and returns that id.
    async fn add(&self, collection: &str, document: NewDocument) -> Result<String, StoreError>;

    async fn get(&self, collection: &str, id: &str) -> Result<Option<StoredDocument>, StoreError>;

    /// The document with the greatest `order_by` value. Documents missing the
    /// field are not considered.
    async fn latest(
        &self,
        collection: &str,
        order_by: &str,
    ) -> Result<Option<StoredDocument>, StoreError>;

    async fn list(&self, collection: &str, limit: usize) -> Result<Vec<StoredDocument>, StoreError>;
}

pub fn new_document_id() -> String {
    rand::rng()
        .sample_iter(&Alphanumeric)
        .take(DOCUMENT_ID_LEN)
        .map(char::from)
        .collect()
}

#[derive(Debug, Clone, PartialEq)]
pub struct Stored<T> {
    pub id: String,
    pub record: T,
}

/// Typed view over one collection of a [`DocumentStore`].
pub struct Collection<T> {
    store: Arc<dyn DocumentStore>,
    name: &'static str,
    _record: PhantomData<fn() -> T>,
}

impl<T> Clone for Collection<T> {
    fn clone(&self) -> Self {
        Self {
            store: self.store.clone(),
            name: self.name,
            _record: PhantomData,
        }
    }
}

impl<T: Serialize + DeserializeOwned> Collection<T> {
    pub fn new(store: Arc<dyn DocumentStore>, name: &'static str) -> Self {
        Self {
            store,
            name,
            _record: PhantomData,
        }
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    pub async fn add(&self, record: &T) -> Result<String, StoreError> {
        self.store
            .add(self.name, NewDocument::from_record(record)?)
            .await
    }

    pub async fn add_with_timestamp(
        &self,
        record: &T,
        timestamp_field: &str,
    ) -> Result<String, StoreError> {
        let document = NewDocument::from_record(record)?.with_server_timestamp(timestamp_field);
        self.store.add(self.name, document).await
    }

    pub async fn get(&self, id: &str) -> Result<Option<Stored<T>>, StoreError> {
        self.store
            .get(self.name, id)
            .await?
            .map(decode_record)
            .transpose()
    }

    pub async fn latest(&self, order_by: &str) -> Result<Option<Stored<T>>, StoreError> {
        self.store
            .latest(self.name, order_by)
            .await?
            .map(decode_record)
            .transpose()
    }

    pub async fn list(&self, limit: usize) -> Result<Vec<Stored<T>>, StoreError> {
        self.store
            .list(self.name, limit)
            .await?
            .into_iter()
            .map(decode_record)
            .collect()
    }
}

fn decode_record<T: DeserializeOwned>(document: StoredDocument) -> Result<Stored<T>, StoreError> {
    let record = serde_json::from_value(Value::Object(document.fields))?;
    Ok(Stored {
        id: document.id,
        record,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;

    #[derive(Serialize, Deserialize)]
    struct Sample {
        name: String,
    }

    #[test]
    fn test_document_ids_are_alphanumeric() {
        let id = new_document_id();
        assert_eq!(id.len(), DOCUMENT_ID_LEN);
        assert!(id.chars().all(|c| c.is_ascii_alphanumeric()));
        assert_ne!(id, new_document_id());
    }

    #[test]
    fn test_record_must_be_an_object() {
        let result = NewDocument::from_record(&vec![1, 2, 3]);
        assert!(matches!(result, Err(StoreError::NotAnObject)));
    }

    #[test]
    fn test_from_record_with_timestamp() {
        let document = NewDocument::from_record(&Sample {
            name: "drone".into(),
        })
        .unwrap()
        .with_server_timestamp("timestamp");

        assert_eq!(document.fields["name"], "drone");
        assert_eq!(document.server_timestamp.as_deref(), Some("timestamp"));
    }
}
