use crate::{
    auth::Auth,
    document::{new_document_id, DocumentStore, NewDocument, StoredDocument},
    error::StoreError,
};
use async_trait::async_trait;
use reqwest::{RequestBuilder, Response, StatusCode, Url};
use serde_json::{json, Map, Number, Value};
use tracing::instrument;

const PAGE_SIZE: usize = 300;
const MAX_DOCUMENT_ID_BYTES: usize = 1500;

/// Firestore REST client. Works against the emulator as well when
/// `base_url` points at it and `auth` is anonymous.
#[derive(Clone)]
pub struct FirestoreClient {
    http: reqwest::Client,
    base_url: String,
    project_id: String,
    database: String,
    auth: Auth,
}

impl FirestoreClient {
    pub fn new(
        http: reqwest::Client,
        base_url: &str,
        project_id: &str,
        database: &str,
        auth: Auth,
    ) -> Self {
        Self {
            http,
            base_url: base_url.to_string(),
            project_id: project_id.to_string(),
            database: database.to_string(),
            auth,
        }
    }

    /// Resource name of a document, as used inside request bodies.
    fn document_name(&self, collection: &str, id: &str) -> String {
        format!(
            "projects/{}/databases/{}/documents/{}/{}",
            self.project_id, self.database, collection, id
        )
    }

    /// `<base>/projects/<p>/databases/<d>/<path...>`, each element of `path`
    /// escaped as a single segment.
    fn url(&self, path: &[&str]) -> Result<Url, StoreError> {
        let mut url =
            Url::parse(&self.base_url).map_err(|e| StoreError::InvalidUrl(e.to_string()))?;
        url.path_segments_mut()
            .map_err(|_| StoreError::InvalidUrl(self.base_url.clone()))?
            .pop_if_empty()
            .extend([
                "projects",
                self.project_id.as_str(),
                "databases",
                self.database.as_str(),
            ])
            .extend(path);
        Ok(url)
    }

    async fn send(&self, request: RequestBuilder) -> Result<Response, StoreError> {
        let response = self.auth.authorize(request).await?.send().await?;
        check_status(response).await
    }
}

/// Firestore ids are at most 1500 bytes, cannot contain `/` and cannot be
/// `.` or `..`.
fn is_valid_document_id(id: &str) -> bool {
    !id.is_empty()
        && id.len() <= MAX_DOCUMENT_ID_BYTES
        && id != "."
        && id != ".."
        && !id.contains('/')
}

pub(crate) async fn check_status(response: Response) -> Result<Response, StoreError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let message = response.text().await.unwrap_or_default();
    Err(StoreError::Backend {
        status: status.as_u16(),
        message,
    })
}

#[async_trait]
impl DocumentStore for FirestoreClient {
    #[instrument(skip(self, document))]
    async fn add(&self, collection: &str, document: NewDocument) -> Result<String, StoreError> {
        let id = new_document_id();
        let mut write = json!({
            "update": {
                "name": self.document_name(collection, &id),
                "fields": encode_fields(&document.fields),
            },
            "currentDocument": { "exists": false },
        });
        if let Some(field) = &document.server_timestamp {
            write["updateTransforms"] = json!([
                { "fieldPath": field, "setToServerValue": "REQUEST_TIME" }
            ]);
        }

        let url = self.url(&["documents:commit"])?;
        self.send(self.http.post(url).json(&json!({ "writes": [write] })))
            .await?;

        tracing::debug!("Created document {}/{}", collection, id);
        Ok(id)
    }

    #[instrument(skip(self))]
    async fn get(&self, collection: &str, id: &str) -> Result<Option<StoredDocument>, StoreError> {
        if !is_valid_document_id(id) {
            tracing::debug!("Rejected document id {:?}", id);
            return Ok(None);
        }

        let url = self.url(&["documents", collection, id])?;
        let response = self.auth.authorize(self.http.get(url)).await?.send().await?;
        if response.status() == StatusCode::NOT_FOUND {
            return Ok(None);
        }

        let document: Value = check_status(response).await?.json().await?;
        decode_document(&document).map(Some)
    }

    #[instrument(skip(self))]
    async fn latest(
        &self,
        collection: &str,
        order_by: &str,
    ) -> Result<Option<StoredDocument>, StoreError> {
        let query = json!({
            "structuredQuery": {
                "from": [{ "collectionId": collection }],
                "orderBy": [{ "field": { "fieldPath": order_by }, "direction": "DESCENDING" }],
                "limit": 1,
            }
        });

        let url = self.url(&["documents:runQuery"])?;
        let results: Vec<Value> = self
            .send(self.http.post(url).json(&query))
            .await?
            .json()
            .await?;

        results
            .iter()
            .find_map(|result| result.get("document"))
            .map(decode_document)
            .transpose()
    }

    #[instrument(skip(self))]
    async fn list(&self, collection: &str, limit: usize) -> Result<Vec<StoredDocument>, StoreError> {
        let url = self.url(&["documents", collection])?;
        let mut documents = Vec::new();
        let mut page_token: Option<String> = None;

        while documents.len() < limit {
            let page_size = (limit - documents.len()).min(PAGE_SIZE).to_string();
            let mut request = self.http.get(url.clone()).query(&[("pageSize", page_size.as_str())]);
            if let Some(token) = &page_token {
                request = request.query(&[("pageToken", token.as_str())]);
            }

            let page: Value = self.send(request).await?.json().await?;
            if let Some(items) = page.get("documents").and_then(Value::as_array) {
                for item in items {
                    documents.push(decode_document(item)?);
                }
            }

            page_token = page
                .get("nextPageToken")
                .and_then(Value::as_str)
                .map(str::to_string);
            if page_token.is_none() {
                break;
            }
        }

        documents.truncate(limit);
        Ok(documents)
    }
}

pub fn encode_fields(fields: &Map<String, Value>) -> Value {
    Value::Object(
        fields
            .iter()
            .map(|(key, value)| (key.clone(), encode_value(value)))
            .collect(),
    )
}

/// Plain JSON to Firestore's typed value representation.
pub fn encode_value(value: &Value) -> Value {
    match value {
        Value::Null => json!({ "nullValue": null }),
        Value::Bool(b) => json!({ "booleanValue": b }),
        Value::Number(n) => match n.as_i64() {
            Some(i) => json!({ "integerValue": i.to_string() }),
            None if n.is_u64() => json!({ "integerValue": n.to_string() }),
            None => json!({ "doubleValue": n.as_f64() }),
        },
        Value::String(s) => json!({ "stringValue": s }),
        Value::Array(items) => json!({
            "arrayValue": { "values": items.iter().map(encode_value).collect::<Vec<_>>() }
        }),
        Value::Object(fields) => json!({ "mapValue": { "fields": encode_fields(fields) } }),
    }
}

/// Firestore typed value back to plain JSON. Timestamps, references and
/// bytes come back as strings.
pub fn decode_value(value: &Value) -> Result<Value, StoreError> {
    let (kind, inner) = value
        .as_object()
        .and_then(|object| object.iter().next())
        .ok_or_else(|| StoreError::MalformedResponse(format!("untyped value: {}", value)))?;

    let decoded = match kind.as_str() {
        "nullValue" => Value::Null,
        "booleanValue" => Value::Bool(inner.as_bool().unwrap_or_default()),
        "integerValue" => {
            let parsed = match inner {
                Value::String(s) => s.parse::<i64>().ok(),
                other => other.as_i64(),
            };
            parsed
                .map(Value::from)
                .ok_or_else(|| StoreError::MalformedResponse(format!("bad integer: {}", inner)))?
        }
        "doubleValue" => inner
            .as_f64()
            .and_then(Number::from_f64)
            .map(Value::Number)
            .unwrap_or(Value::Null),
        "stringValue" | "timestampValue" | "referenceValue" | "bytesValue" => inner.clone(),
        "geoPointValue" => inner.clone(),
        "arrayValue" => Value::Array(
            inner
                .get("values")
                .and_then(Value::as_array)
                .map(|items| items.iter().map(decode_value).collect::<Result<Vec<_>, _>>())
                .transpose()?
                .unwrap_or_default(),
        ),
        "mapValue" => Value::Object(decode_fields(inner.get("fields"))?),
        other => {
            return Err(StoreError::MalformedResponse(format!(
                "unsupported value type {}",
                other
            )))
        }
    };

    Ok(decoded)
}

fn decode_fields(fields: Option<&Value>) -> Result<Map<String, Value>, StoreError> {
    match fields.and_then(Value::as_object) {
        Some(fields) => fields
            .iter()
            .map(|(key, value)| Ok((key.clone(), decode_value(value)?)))
            .collect(),
        None => Ok(Map::new()),
    }
}

pub fn decode_document(document: &Value) -> Result<StoredDocument, StoreError> {
    let name = document
        .get("name")
        .and_then(Value::as_str)
        .ok_or_else(|| StoreError::MalformedResponse("document without name".into()))?;
    let id = name.rsplit('/').next().unwrap_or(name).to_string();

    Ok(StoredDocument {
        id,
        fields: decode_fields(document.get("fields"))?,
    })
}
