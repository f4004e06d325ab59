use crate::{auth::Auth, error::StoreError, firestore::check_status};
use async_trait::async_trait;
use reqwest::Url;
use tracing::instrument;

#[async_trait]
pub trait ObjectStore: Send + Sync + 'static {
    /// Stores `data` at `path` and returns its public download URL.
    async fn upload(
        &self,
        path: &str,
        data: Vec<u8>,
        content_type: &str,
    ) -> Result<String, StoreError>;
}

/// `<base>/v0/b/<bucket>/o/<path>?alt=media`, with `path` encoded as a single
/// segment so that `/` and spaces are escaped.
pub fn download_url(base_url: &str, bucket: &str, path: &str) -> Result<String, StoreError> {
    let mut url = object_url(base_url, bucket)?;
    url.path_segments_mut()
        .map_err(|_| StoreError::InvalidUrl(base_url.to_string()))?
        .push(path);
    url.set_query(Some("alt=media"));
    Ok(url.to_string())
}

fn object_url(base_url: &str, bucket: &str) -> Result<Url, StoreError> {
    let mut url = Url::parse(base_url).map_err(|e| StoreError::InvalidUrl(e.to_string()))?;
    url.path_segments_mut()
        .map_err(|_| StoreError::InvalidUrl(base_url.to_string()))?
        .pop_if_empty()
        .extend(["v0", "b", bucket, "o"]);
    Ok(url)
}

#[derive(Clone)]
pub struct FirebaseStorageClient {
    http: reqwest::Client,
    base_url: String,
    bucket: String,
    auth: Auth,
}

impl FirebaseStorageClient {
    pub fn new(http: reqwest::Client, base_url: &str, bucket: &str, auth: Auth) -> Self {
        Self {
            http,
            base_url: base_url.to_string(),
            bucket: bucket.to_string(),
            auth,
        }
    }
}

#[async_trait]
impl ObjectStore for FirebaseStorageClient {
    #[instrument(skip(self, data), fields(size = data.len()))]
    async fn upload(
        &self,
        path: &str,
        data: Vec<u8>,
        content_type: &str,
    ) -> Result<String, StoreError> {
        let url = object_url(&self.base_url, &self.bucket)?;
        let request = self
            .http
            .post(url)
            .query(&[("uploadType", "media"), ("name", path)])
            .header(reqwest::header::CONTENT_TYPE, content_type)
            .body(data);

        check_status(self.auth.authorize(request).await?.send().await?).await?;
        tracing::debug!("Uploaded object {}", path);

        download_url(&self.base_url, &self.bucket, path)
    }
}
