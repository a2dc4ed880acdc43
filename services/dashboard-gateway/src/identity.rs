//! Identity provider client (Supabase GoTrue REST)

use crate::errors::{GatewayError, Result};
use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::Deserialize;
use serde_json::{json, Value};
use std::time::Duration;
use tracing::{error, info, warn};

/// A user the identity provider vouched for
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct IdentityUser {
    pub id: String,
    #[serde(default)]
    pub email: Option<String>,
}

/// Result of a successful password sign-in
#[derive(Debug, Clone)]
pub struct SignIn {
    /// Provider session (access token, refresh token, expiry, user)
    pub session: Value,
    /// Provider user object
    pub user: Value,
    pub user_id: String,
}

#[async_trait]
pub trait IdentityProvider: Send + Sync + std::fmt::Debug {
    /// Resolve a bearer token to its user.
    ///
    /// Rejected tokens are [`GatewayError::Unauthorized`]; provider outages
    /// are [`GatewayError::Identity`].
    async fn verify(&self, access_token: &str) -> Result<IdentityUser>;

    async fn sign_in(&self, email: &str, password: &str) -> Result<SignIn>;
}

#[derive(Debug, Clone)]
pub struct SupabaseIdentityProvider {
    base_url: String,
    anon_key: String,
    client: Client,
}

impl SupabaseIdentityProvider {
    pub fn new(base_url: String, anon_key: String, timeout_secs: u64) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .build()
            .map_err(|e| GatewayError::Internal(format!("Failed to build HTTP client: {}", e)))?;

        Ok(SupabaseIdentityProvider {
            base_url: base_url.trim_end_matches('/').to_string(),
            anon_key,
            client,
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}/auth/v1/{}", self.base_url, path)
    }
}

/// Pull a human-readable message out of a provider error body
fn provider_message(body: &Value) -> Option<String> {
    ["error_description", "msg", "message", "error"]
        .iter()
        .find_map(|key| body.get(*key).and_then(Value::as_str))
        .map(str::to_string)
}

#[async_trait]
impl IdentityProvider for SupabaseIdentityProvider {
    async fn verify(&self, access_token: &str) -> Result<IdentityUser> {
        let response = self
            .client
            .get(self.url("user"))
            .header("apikey", &self.anon_key)
            .bearer_auth(access_token)
            .send()
            .await
            .map_err(|e| {
                error!("Identity provider unreachable: {}", e);
                GatewayError::Identity(e.to_string())
            })?;

        let status = response.status();
        if status.is_success() {
            return response
                .json::<IdentityUser>()
                .await
                .map_err(|e| GatewayError::Identity(format!("Malformed user response: {}", e)));
        }

        if status.is_client_error() {
            warn!(%status, "Token verification rejected");
            return Err(GatewayError::Unauthorized(
                "Unauthorized: Invalid token.".to_string(),
            ));
        }

        let body = response.text().await.unwrap_or_default();
        error!(%status, "Token verification failed: {}", body);
        Err(GatewayError::Identity(format!(
            "Token verification returned {}",
            status
        )))
    }

    async fn sign_in(&self, email: &str, password: &str) -> Result<SignIn> {
        let response = self
            .client
            .post(self.url("token"))
            .query(&[("grant_type", "password")])
            .header("apikey", &self.anon_key)
            .json(&json!({ "email": email, "password": password }))
            .send()
            .await
            .map_err(|e| {
                error!("Identity provider unreachable: {}", e);
                GatewayError::Identity(e.to_string())
            })?;

        let status = response.status();
        let body: Value = response.json().await.unwrap_or(Value::Null);

        if status.is_success() {
            let user = body.get("user").cloned().unwrap_or(Value::Null);
            let user_id = user
                .get("id")
                .and_then(Value::as_str)
                .ok_or_else(|| GatewayError::Identity("Sign-in response without user id".into()))?
                .to_string();
            info!(user_id = %user_id, "User signed in");
            return Ok(SignIn {
                session: body,
                user,
                user_id,
            });
        }

        if status.is_client_error() && status != StatusCode::TOO_MANY_REQUESTS {
            let message =
                provider_message(&body).unwrap_or_else(|| "Invalid login credentials".to_string());
            warn!(%status, "Sign-in rejected: {}", message);
            return Err(GatewayError::Unauthorized(message));
        }

        error!(%status, "Sign-in failed");
        Err(GatewayError::Identity(format!("Sign-in returned {}", status)))
    }
}
