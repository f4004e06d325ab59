mod auth;
mod config;
mod document;
mod error;
mod firestore;
mod memory;
mod object;
#[cfg(test)]
mod stub_server;

pub mod records;

pub use auth::{Auth, ServiceAccountAuth, ServiceAccountKey};
pub use config::{StorageBackend, StorageConfig, Stores};
pub use document::{new_document_id, Collection, DocumentStore, NewDocument, Stored, StoredDocument};
pub use error::StoreError;
pub use firestore::FirestoreClient;
pub use memory::{MemoryDocumentStore, MemoryObjectStore, StoredObject};
pub use object::{download_url, FirebaseStorageClient, ObjectStore};
