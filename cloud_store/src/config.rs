use crate::{
    auth::{Auth, ServiceAccountAuth, ServiceAccountKey},
    document::DocumentStore,
    error::StoreError,
    firestore::FirestoreClient,
    memory::{MemoryDocumentStore, MemoryObjectStore},
    object::{FirebaseStorageClient, ObjectStore},
};
use serde::Deserialize;
use std::{fmt, path::PathBuf, sync::Arc};

#[derive(Debug, Deserialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum StorageBackend {
    Firebase,
    Memory,
}

#[derive(Deserialize, Clone)]
pub struct StorageConfig {
    pub backend: StorageBackend,
    pub project_id: String,
    pub bucket: String,
    #[serde(default = "default_database")]
    pub database: String,
    #[serde(default = "default_firestore_url")]
    pub firestore_url: String,
    #[serde(default = "default_storage_url")]
    pub storage_url: String,
    /// Service-account JSON key. Takes precedence over `access_token`.
    #[serde(default)]
    pub credentials_file: Option<PathBuf>,
    #[serde(default)]
    pub access_token: Option<String>,
}

fn default_database() -> String {
    "(default)".into()
}

fn default_firestore_url() -> String {
    "https://firestore.googleapis.com/v1".into()
}

fn default_storage_url() -> String {
    "https://firebasestorage.googleapis.com".into()
}

impl fmt::Debug for StorageConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StorageConfig")
            .field("backend", &self.backend)
            .field("project_id", &self.project_id)
            .field("bucket", &self.bucket)
            .field("database", &self.database)
            .field("firestore_url", &self.firestore_url)
            .field("storage_url", &self.storage_url)
            .field("credentials_file", &self.credentials_file)
            .field("access_token", &self.access_token.as_ref().map(|_| "<redacted>"))
            .finish()
    }
}

/// The pair of backends a service writes to.
#[derive(Clone)]
pub struct Stores {
    pub documents: Arc<dyn DocumentStore>,
    pub objects: Arc<dyn ObjectStore>,
}

impl Stores {
    pub fn from_config(config: &StorageConfig) -> Result<Self, StoreError> {
        match config.backend {
            StorageBackend::Firebase => {
                let http = reqwest::Client::new();
                let auth = auth_from_config(config, &http)?;
                let documents = FirestoreClient::new(
                    http.clone(),
                    &config.firestore_url,
                    &config.project_id,
                    &config.database,
                    auth.clone(),
                );
                let objects =
                    FirebaseStorageClient::new(http, &config.storage_url, &config.bucket, auth);
                tracing::info!(
                    "Using Firebase project {} with bucket {}",
                    config.project_id,
                    config.bucket
                );
                Ok(Self {
                    documents: Arc::new(documents),
                    objects: Arc::new(objects),
                })
            }
            StorageBackend::Memory => {
                tracing::warn!("Using in-memory storage, records are lost on restart");
                Ok(Self {
                    documents: Arc::new(MemoryDocumentStore::new()),
                    objects: Arc::new(MemoryObjectStore::new(
                        &config.storage_url,
                        &config.bucket,
                    )),
                })
            }
        }
    }
}

fn auth_from_config(config: &StorageConfig, http: &reqwest::Client) -> Result<Auth, StoreError> {
    if let Some(path) = &config.credentials_file {
        let key = ServiceAccountKey::from_file(path)?;
        tracing::info!("Authenticating as service account {}", key.client_email);
        let account = ServiceAccountAuth::new(http.clone(), key)?;
        return Ok(Auth::ServiceAccount(Arc::new(account)));
    }
    match &config.access_token {
        Some(token) => Ok(Auth::Token(token.clone())),
        None => {
            tracing::info!("No storage credentials configured, sending anonymous requests");
            Ok(Auth::Anonymous)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn firebase_config() -> StorageConfig {
        StorageConfig {
            backend: StorageBackend::Firebase,
            project_id: "airecondrone".into(),
            bucket: "airecondrone.appspot.com".into(),
            database: default_database(),
            firestore_url: default_firestore_url(),
            storage_url: default_storage_url(),
            credentials_file: None,
            access_token: Some("ya29.secret".into()),
        }
    }

    #[test]
    fn test_debug_redacts_token() {
        let config = firebase_config();

        let printed = format!("{:?}", config);
        assert!(!printed.contains("ya29.secret"));
        assert!(printed.contains("<redacted>"));
    }

    #[test]
    fn test_auth_precedence() {
        let http = reqwest::Client::new();
        let mut config = firebase_config();
        assert!(matches!(
            auth_from_config(&config, &http),
            Ok(Auth::Token(token)) if token == "ya29.secret"
        ));

        config.access_token = None;
        assert!(matches!(auth_from_config(&config, &http), Ok(Auth::Anonymous)));

        let mut key_file = tempfile::NamedTempFile::new().unwrap();
        let key = serde_json::json!({
            "client_email": "uploader@airecondrone.iam.gserviceaccount.com",
            "private_key": include_str!("../tests/fixtures/service_account_key.pem"),
        });
        write!(key_file, "{}", key).unwrap();
        config.credentials_file = Some(key_file.path().to_path_buf());
        config.access_token = Some("ya29.secret".into());
        assert!(matches!(
            auth_from_config(&config, &http),
            Ok(Auth::ServiceAccount(_))
        ));
    }

    #[test]
    fn test_missing_credentials_file_fails_startup() {
        let mut config = firebase_config();
        config.credentials_file = Some("/nonexistent/service-account.json".into());
        assert!(matches!(
            Stores::from_config(&config),
            Err(StoreError::Credentials(_))
        ));
    }
}
