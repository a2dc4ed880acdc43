use crate::access::{AuthSession, AuthState, Authenticator};
use crate::errors::GatewayError;
use crate::metrics::AUTH_FAILURES_TOTAL;
use actix_web::{
    dev::{forward_ready, Service, ServiceRequest, ServiceResponse, Transform},
    Error, HttpMessage,
};
use futures_util::future::LocalBoxFuture;
use std::future::{ready, Ready};
use std::rc::Rc;
use std::sync::Arc;

/// What a request must prove before reaching the handler
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthRequirement {
    /// A token the identity provider accepts
    Identity,
    /// An accepted token and at least one allowed category
    Permissions,
}

/// Requires a bearer token the identity provider accepts.
///
/// With [`AuthRequirement::Identity`] the verified `IdentityUser` is placed in
/// the request extensions. With [`AuthRequirement::Permissions`] the caller's
/// `Arc<AuthContext>` is, and users without any category get 403.
#[derive(Clone)]
pub struct BearerAuth {
    authenticator: Arc<Authenticator>,
    requirement: AuthRequirement,
}

impl BearerAuth {
    pub fn new(authenticator: Arc<Authenticator>) -> Self {
        Self {
            authenticator,
            requirement: AuthRequirement::Permissions,
        }
    }

    /// Same authenticator, checking identity only
    pub fn identity_only(&self) -> Self {
        Self {
            authenticator: self.authenticator.clone(),
            requirement: AuthRequirement::Identity,
        }
    }
}

impl<S, B> Transform<S, ServiceRequest> for BearerAuth
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    S::Future: 'static,
    B: 'static,
{
    type Response = ServiceResponse<B>;
    type Error = Error;
    type InitError = ();
    type Transform = BearerAuthMiddleware<S>;
    type Future = Ready<Result<Self::Transform, Self::InitError>>;

    fn new_transform(&self, service: S) -> Self::Future {
        ready(Ok(BearerAuthMiddleware {
            service: Rc::new(service),
            authenticator: self.authenticator.clone(),
            requirement: self.requirement,
        }))
    }
}

pub struct BearerAuthMiddleware<S> {
    service: Rc<S>,
    authenticator: Arc<Authenticator>,
    requirement: AuthRequirement,
}

/// Token from an `Authorization: Bearer <token>` header
fn bearer_token(req: &ServiceRequest) -> Option<String> {
    let value = req.headers().get("Authorization")?.to_str().ok()?;
    let token = value.strip_prefix("Bearer ")?.trim();
    if token.is_empty() {
        None
    } else {
        Some(token.to_string())
    }
}

fn reject(reason: &'static str, err: GatewayError) -> Error {
    AUTH_FAILURES_TOTAL.with_label_values(&[reason]).inc();
    err.into()
}

fn invalid_token() -> Error {
    tracing::warn!("Bearer token rejected");
    reject(
        "invalid_token",
        GatewayError::Unauthorized("Unauthorized: Invalid token.".to_string()),
    )
}

fn provider_error(e: GatewayError) -> Error {
    tracing::error!("Authentication internal error: {}", e);
    reject("provider_error", e)
}

impl<S, B> Service<ServiceRequest> for BearerAuthMiddleware<S>
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    S::Future: 'static,
    B: 'static,
{
    type Response = ServiceResponse<B>;
    type Error = Error;
    type Future = LocalBoxFuture<'static, Result<Self::Response, Self::Error>>;

    forward_ready!(service);

    fn call(&self, req: ServiceRequest) -> Self::Future {
        let token = match bearer_token(&req) {
            Some(token) => token,
            None => {
                return Box::pin(async {
                    Err(reject(
                        "missing_token",
                        GatewayError::Unauthorized("Unauthorized: No token provided.".to_string()),
                    ))
                });
            }
        };

        let service = self.service.clone();
        let authenticator = self.authenticator.clone();
        let requirement = self.requirement;

        Box::pin(async move {
            if requirement == AuthRequirement::Identity {
                return match authenticator
                    .verify_identity(&token)
                    .await
                    .map_err(provider_error)?
                {
                    Some(user) => {
                        req.extensions_mut().insert(user);
                        service.call(req).await
                    }
                    None => Err(invalid_token()),
                };
            }

            let session = AuthSession::new();
            let state = authenticator
                .authenticate(&token, &session)
                .await
                .map_err(provider_error)?;

            match state {
                AuthState::Authenticated(ctx) => {
                    req.extensions_mut().insert(ctx);
                    service.call(req).await
                }
                AuthState::Denied => Err(reject(
                    "denied",
                    GatewayError::Forbidden("Forbidden: No dashboard access.".to_string()),
                )),
                AuthState::Unauthenticated | AuthState::Authenticating => Err(invalid_token()),
            }
        })
    }
}
