use crate::{error::StoreError, firestore::check_status};
use chrono::{DateTime, TimeDelta, Utc};
use jsonwebtoken::{encode, Algorithm, EncodingKey, Header};
use reqwest::RequestBuilder;
use serde::{Deserialize, Serialize};
use std::{path::Path, sync::Arc};
use tokio::sync::Mutex;

const GOOGLE_TOKEN_URI: &str = "https://oauth2.googleapis.com/token";
const JWT_BEARER_GRANT: &str = "urn:ietf:params:oauth:grant-type:jwt-bearer";
const SCOPES: &str = "https://www.googleapis.com/auth/datastore \
                      https://www.googleapis.com/auth/devstorage.read_write";
const ASSERTION_LIFETIME_SECS: i64 = 3600;
/// Tokens this close to expiry are refreshed before use.
const REFRESH_MARGIN_SECS: i64 = 300;

/// The fields of a Google service-account JSON key that the token grant needs.
#[derive(Deserialize)]
pub struct ServiceAccountKey {
    pub client_email: String,
    pub private_key: String,
    #[serde(default = "default_token_uri")]
    pub token_uri: String,
}

fn default_token_uri() -> String {
    GOOGLE_TOKEN_URI.into()
}

impl ServiceAccountKey {
    pub fn from_file(path: &Path) -> Result<Self, StoreError> {
        let contents = std::fs::read_to_string(path).map_err(|e| {
            StoreError::Credentials(format!("cannot read {}: {}", path.display(), e))
        })?;
        serde_json::from_str(&contents).map_err(|e| {
            StoreError::Credentials(format!("cannot parse {}: {}", path.display(), e))
        })
    }
}

#[derive(Debug, Serialize, Deserialize)]
struct GrantClaims {
    iss: String,
    scope: String,
    aud: String,
    iat: i64,
    exp: i64,
}

#[derive(Deserialize)]
struct TokenResponse {
    access_token: String,
    expires_in: i64,
}

struct CachedToken {
    value: String,
    expires_at: DateTime<Utc>,
}

/// OAuth2 JWT-bearer flow for a service account, with the access token cached
/// until shortly before it expires.
pub struct ServiceAccountAuth {
    http: reqwest::Client,
    client_email: String,
    token_uri: String,
    signing_key: EncodingKey,
    cached: Mutex<Option<CachedToken>>,
}

impl ServiceAccountAuth {
    pub fn new(http: reqwest::Client, key: ServiceAccountKey) -> Result<Self, StoreError> {
        let signing_key = EncodingKey::from_rsa_pem(key.private_key.as_bytes())?;
        Ok(Self {
            http,
            client_email: key.client_email,
            token_uri: key.token_uri,
            signing_key,
            cached: Mutex::new(None),
        })
    }

    pub async fn access_token(&self) -> Result<String, StoreError> {
        let mut cached = self.cached.lock().await;
        let now = Utc::now();

        if let Some(token) = cached.as_ref() {
            if token.expires_at - TimeDelta::seconds(REFRESH_MARGIN_SECS) > now {
                return Ok(token.value.clone());
            }
        }

        let token = self.fetch_token(now).await?;
        let value = token.value.clone();
        *cached = Some(token);
        Ok(value)
    }

    fn assertion(&self, now: DateTime<Utc>) -> Result<String, StoreError> {
        let claims = GrantClaims {
            iss: self.client_email.clone(),
            scope: SCOPES.into(),
            aud: self.token_uri.clone(),
            iat: now.timestamp(),
            exp: now.timestamp() + ASSERTION_LIFETIME_SECS,
        };
        Ok(encode(
            &Header::new(Algorithm::RS256),
            &claims,
            &self.signing_key,
        )?)
    }

    async fn fetch_token(&self, now: DateTime<Utc>) -> Result<CachedToken, StoreError> {
        let assertion = self.assertion(now)?;
        let response = self
            .http
            .post(&self.token_uri)
            .form(&[("grant_type", JWT_BEARER_GRANT), ("assertion", assertion.as_str())])
            .send()
            .await?;
        let token: TokenResponse = check_status(response).await?.json().await?;

        tracing::debug!(
            "Obtained access token for {}, valid for {}s",
            self.client_email,
            token.expires_in
        );
        Ok(CachedToken {
            value: token.access_token,
            expires_at: now + TimeDelta::seconds(token.expires_in),
        })
    }
}

/// How requests to the Firebase REST APIs are authorized.
#[derive(Clone)]
pub enum Auth {
    /// No credentials, for the local emulators.
    Anonymous,
    /// A fixed bearer token supplied by the caller.
    Token(String),
    ServiceAccount(Arc<ServiceAccountAuth>),
}

impl Auth {
    pub async fn authorize(&self, request: RequestBuilder) -> Result<RequestBuilder, StoreError> {
        match self {
            Auth::Anonymous => Ok(request),
            Auth::Token(token) => Ok(request.bearer_auth(token)),
            Auth::ServiceAccount(account) => Ok(request.bearer_auth(account.access_token().await?)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::stub_server::StubServer;
    use jsonwebtoken::{decode, DecodingKey, Validation};
    use serde_json::json;
    use std::io::Write;

    const PRIVATE_KEY: &str = include_str!("../tests/fixtures/service_account_key.pem");
    const PUBLIC_KEY: &str = include_str!("../tests/fixtures/service_account_pub.pem");
    const CLIENT_EMAIL: &str = "uploader@airecondrone.iam.gserviceaccount.com";

    fn account(token_uri: &str) -> ServiceAccountAuth {
        let key = ServiceAccountKey {
            client_email: CLIENT_EMAIL.into(),
            private_key: PRIVATE_KEY.into(),
            token_uri: token_uri.into(),
        };
        ServiceAccountAuth::new(reqwest::Client::new(), key).unwrap()
    }

    fn form_value(body: &str, name: &str) -> Option<String> {
        body.split('&')
            .find_map(|pair| pair.strip_prefix(&format!("{}=", name)))
            .map(str::to_string)
    }

    #[tokio::test]
    async fn test_token_is_fetched_once_and_cached() {
        let server =
            StubServer::start(vec![(200, json!({ "access_token": "ya29.first", "expires_in": 3600 }))])
                .await;
        let token_uri = format!("{}/token", server.base_url);
        let auth = account(&token_uri);

        assert_eq!(auth.access_token().await.unwrap(), "ya29.first");
        assert_eq!(auth.access_token().await.unwrap(), "ya29.first");

        let requests = server.requests();
        assert_eq!(requests.len(), 1);
        assert_eq!(requests[0].method, "POST");
        assert_eq!(requests[0].target, "/token");

        let body = requests[0].text();
        assert_eq!(
            form_value(&body, "grant_type").as_deref(),
            Some("urn%3Aietf%3Aparams%3Aoauth%3Agrant-type%3Ajwt-bearer")
        );

        let assertion = form_value(&body, "assertion").unwrap();
        let mut validation = Validation::new(Algorithm::RS256);
        validation.set_audience(&[token_uri.as_str()]);
        let claims = decode::<GrantClaims>(
            &assertion,
            &DecodingKey::from_rsa_pem(PUBLIC_KEY.as_bytes()).unwrap(),
            &validation,
        )
        .unwrap()
        .claims;
        assert_eq!(claims.iss, CLIENT_EMAIL);
        assert!(claims.scope.contains("auth/datastore"));
        assert_eq!(claims.exp - claims.iat, ASSERTION_LIFETIME_SECS);
    }

    #[tokio::test]
    async fn test_token_close_to_expiry_is_refreshed() {
        let server = StubServer::start(vec![
            (200, json!({ "access_token": "ya29.short", "expires_in": 60 })),
            (200, json!({ "access_token": "ya29.next", "expires_in": 3600 })),
        ])
        .await;
        let auth = account(&format!("{}/token", server.base_url));

        assert_eq!(auth.access_token().await.unwrap(), "ya29.short");
        assert_eq!(auth.access_token().await.unwrap(), "ya29.next");
        assert_eq!(auth.access_token().await.unwrap(), "ya29.next");
        assert_eq!(server.requests().len(), 2);
    }

    #[tokio::test]
    async fn test_rejected_grant_is_a_backend_error() {
        let server = StubServer::start(vec![(400, json!({ "error": "invalid_grant" }))]).await;
        let auth = account(&format!("{}/token", server.base_url));

        let err = auth.access_token().await.unwrap_err();
        assert!(matches!(err, StoreError::Backend { status: 400, .. }));
    }

    #[test]
    fn test_key_file_parsing() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        let contents = json!({
            "type": "service_account",
            "project_id": "airecondrone",
            "client_email": CLIENT_EMAIL,
            "private_key": PRIVATE_KEY,
        });
        write!(file, "{}", contents).unwrap();

        let key = ServiceAccountKey::from_file(file.path()).unwrap();
        assert_eq!(key.client_email, CLIENT_EMAIL);
        assert_eq!(key.token_uri, GOOGLE_TOKEN_URI);
        assert!(ServiceAccountAuth::new(reqwest::Client::new(), key).is_ok());
    }

    #[test]
    fn test_missing_or_bad_key_file() {
        assert!(matches!(
            ServiceAccountKey::from_file(Path::new("/nonexistent/key.json")),
            Err(StoreError::Credentials(_))
        ));

        let key = ServiceAccountKey {
            client_email: CLIENT_EMAIL.into(),
            private_key: "not a pem".into(),
            token_uri: GOOGLE_TOKEN_URI.into(),
        };
        assert!(matches!(
            ServiceAccountAuth::new(reqwest::Client::new(), key),
            Err(StoreError::Jwt(_))
        ));
    }
}
