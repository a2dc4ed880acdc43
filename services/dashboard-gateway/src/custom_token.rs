//! Custom tokens for the real-time permission store
//!
//! Signed with a service-account key so the browser can exchange the token
//! for a session keyed by the same user id the identity provider issued.

use crate::errors::{GatewayError, Result};
use chrono::{DateTime, Utc};
use jsonwebtoken::{encode, Algorithm, EncodingKey, Header};
use serde::{Deserialize, Serialize};
use sheet_ledger::oauth::ServiceAccountKey;

pub const IDENTITY_TOOLKIT_AUDIENCE: &str =
    "https://identitytoolkit.googleapis.com/google.identity.identitytoolkit.v1.IdentityToolkit";

const CUSTOM_TOKEN_LIFETIME_SECS: i64 = 3600;

#[derive(Debug, Serialize, Deserialize)]
pub struct CustomTokenClaims {
    pub iss: String,
    pub sub: String,
    pub aud: String,
    pub iat: i64,
    pub exp: i64,
    pub uid: String,
}

pub struct CustomTokenMinter {
    client_email: String,
    encoding_key: EncodingKey,
}

impl std::fmt::Debug for CustomTokenMinter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CustomTokenMinter")
            .field("client_email", &self.client_email)
            .finish_non_exhaustive()
    }
}

impl CustomTokenMinter {
    pub fn new(key: &ServiceAccountKey) -> Result<Self> {
        let encoding_key = key
            .encoding_key()
            .map_err(|e| GatewayError::Internal(e.to_string()))?;
        Ok(Self {
            client_email: key.client_email.clone(),
            encoding_key,
        })
    }

    /// Minter for a service-account key given as JSON text
    pub fn from_json(json: &str) -> Result<Self> {
        let key =
            ServiceAccountKey::from_json(json).map_err(|e| GatewayError::Internal(e.to_string()))?;
        Self::new(&key)
    }

    /// Token for `uid`, valid for one hour from `now`
    pub fn mint(&self, uid: &str, now: DateTime<Utc>) -> Result<String> {
        if uid.is_empty() || uid.len() > 128 {
            return Err(GatewayError::Validation(
                "uid must be 1 to 128 characters".to_string(),
            ));
        }

        let claims = CustomTokenClaims {
            iss: self.client_email.clone(),
            sub: self.client_email.clone(),
            aud: IDENTITY_TOOLKIT_AUDIENCE.to_string(),
            iat: now.timestamp(),
            exp: now.timestamp() + CUSTOM_TOKEN_LIFETIME_SECS,
            uid: uid.to_string(),
        };

        encode(&Header::new(Algorithm::RS256), &claims, &self.encoding_key)
            .map_err(|e| GatewayError::Internal(format!("Failed to sign custom token: {}", e)))
    }
}
