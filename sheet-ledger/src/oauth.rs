//! Service-account access tokens for the Sheets API
//!
//! Implements the OAuth 2.0 JWT bearer grant: a short-lived RS256 assertion
//! signed with the service account's private key is exchanged at the
//! account's `token_uri` for an access token, which is cached until shortly
//! before it expires.

use crate::error::{Error, Result};
use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use jsonwebtoken::{encode, Algorithm, EncodingKey, Header};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;
use tracing::{debug, info};

/// Read/write scope for the ledger writer
pub const SCOPE_SPREADSHEETS: &str = "https://www.googleapis.com/auth/spreadsheets";
/// Read-only scope for the ledger reader
pub const SCOPE_SPREADSHEETS_READONLY: &str =
    "https://www.googleapis.com/auth/spreadsheets.readonly";

const DEFAULT_TOKEN_URI: &str = "https://oauth2.googleapis.com/token";
const JWT_BEARER_GRANT: &str = "urn:ietf:params:oauth:grant-type:jwt-bearer";
const ASSERTION_LIFETIME_SECS: i64 = 3600;
const REFRESH_MARGIN_SECS: i64 = 60;

fn default_token_uri() -> String {
    DEFAULT_TOKEN_URI.to_string()
}

/// The fields of a service-account key file the ledger needs
#[derive(Clone, Deserialize)]
pub struct ServiceAccountKey {
    /// Service account email
    pub client_email: String,
    /// PEM-encoded RSA private key
    pub private_key: String,
    /// OAuth token endpoint
    #[serde(default = "default_token_uri")]
    pub token_uri: String,
    /// Owning project
    #[serde(default)]
    pub project_id: Option<String>,
}

impl std::fmt::Debug for ServiceAccountKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ServiceAccountKey")
            .field("client_email", &self.client_email)
            .field("token_uri", &self.token_uri)
            .field("project_id", &self.project_id)
            .finish_non_exhaustive()
    }
}

impl ServiceAccountKey {
    /// Parse the JSON key file contents
    pub fn from_json(json: &str) -> Result<Self> {
        serde_json::from_str(json)
            .map_err(|e| Error::Config(format!("Invalid service account key: {}", e)))
    }

    /// RS256 signing key
    pub fn encoding_key(&self) -> Result<EncodingKey> {
        EncodingKey::from_rsa_pem(self.private_key.as_bytes())
            .map_err(|e| Error::Config(format!("Invalid service account private key: {}", e)))
    }
}

/// Supplies bearer tokens for store requests
#[async_trait]
pub trait TokenSource: Send + Sync + std::fmt::Debug {
    /// A currently valid access token
    async fn access_token(&self) -> Result<String>;
}

/// Fixed token, for local emulators and tests
#[derive(Debug, Clone)]
pub struct StaticToken(pub String);

#[async_trait]
impl TokenSource for StaticToken {
    async fn access_token(&self) -> Result<String> {
        Ok(self.0.clone())
    }
}

#[derive(Debug, Serialize)]
struct AssertionClaims<'a> {
    iss: &'a str,
    scope: &'a str,
    aud: &'a str,
    iat: i64,
    exp: i64,
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    #[serde(default = "default_expires_in")]
    expires_in: i64,
}

fn default_expires_in() -> i64 {
    ASSERTION_LIFETIME_SECS
}

#[derive(Debug, Clone)]
struct CachedToken {
    value: String,
    refresh_at: DateTime<Utc>,
}

/// Exchanges signed assertions for access tokens and caches them
pub struct ServiceAccountTokenSource {
    key: ServiceAccountKey,
    encoding_key: EncodingKey,
    scope: String,
    http: Client,
    cached: Mutex<Option<CachedToken>>,
}

impl std::fmt::Debug for ServiceAccountTokenSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ServiceAccountTokenSource")
            .field("key", &self.key)
            .field("scope", &self.scope)
            .finish_non_exhaustive()
    }
}

impl ServiceAccountTokenSource {
    /// Token source for `scope`
    pub fn new(key: ServiceAccountKey, scope: impl Into<String>, http: Client) -> Result<Self> {
        let encoding_key = key.encoding_key()?;
        Ok(Self {
            key,
            encoding_key,
            scope: scope.into(),
            http,
            cached: Mutex::new(None),
        })
    }

    fn assertion(&self, now: DateTime<Utc>) -> Result<String> {
        let claims = AssertionClaims {
            iss: &self.key.client_email,
            scope: &self.scope,
            aud: &self.key.token_uri,
            iat: now.timestamp(),
            exp: now.timestamp() + ASSERTION_LIFETIME_SECS,
        };
        encode(&Header::new(Algorithm::RS256), &claims, &self.encoding_key)
            .map_err(|e| Error::Auth(format!("Failed to sign assertion: {}", e)))
    }

    async fn fetch(&self, now: DateTime<Utc>) -> Result<CachedToken> {
        let assertion = self.assertion(now)?;
        let response = self
            .http
            .post(&self.key.token_uri)
            .form(&[("grant_type", JWT_BEARER_GRANT), ("assertion", assertion.as_str())])
            .send()
            .await
            .map_err(|e| Error::Auth(format!("Token request failed: {}", e)))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(Error::Auth(format!(
                "Token endpoint returned {}: {}",
                status, body
            )));
        }

        let token: TokenResponse = response
            .json()
            .await
            .map_err(|e| Error::Auth(format!("Malformed token response: {}", e)))?;

        info!(
            client_email = %self.key.client_email,
            expires_in = token.expires_in,
            "Obtained service account access token"
        );

        Ok(CachedToken {
            value: token.access_token,
            refresh_at: now + Duration::seconds(token.expires_in - REFRESH_MARGIN_SECS),
        })
    }
}

#[async_trait]
impl TokenSource for ServiceAccountTokenSource {
    async fn access_token(&self) -> Result<String> {
        let mut cached = self.cached.lock().await;
        let now = Utc::now();
        if let Some(token) = cached.as_ref() {
            if now < token.refresh_at {
                return Ok(token.value.clone());
            }
            debug!("Cached access token due for refresh");
        }
        let fresh = self.fetch(now).await?;
        let value = fresh.value.clone();
        *cached = Some(fresh);
        Ok(value)
    }
}
