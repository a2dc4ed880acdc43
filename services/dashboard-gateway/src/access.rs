//! Session state and page access policy
//!
//! A request moves through `Authenticating` to exactly one terminal state.
//! [`AuthSession::ready`] resolves once that state is published, and
//! [`NavigationPolicy::decide`] is the only place a page decision is made.

use crate::errors::{GatewayError, Result};
use crate::identity::{IdentityProvider, IdentityUser};
use crate::permissions::{resolve_permissions, PermissionSet, PermissionStore};
use serde::Serialize;
use std::sync::Arc;
use tokio::sync::watch;
use tracing::debug;

pub const ADMIN_CATEGORY: &str = "admin";

/// Dashboard pages and the category that gates each
pub const PAGE_CATEGORIES: &[(&str, &str)] = &[
    ("/dashboard.html", "dashboard"),
    ("/encoding.html", "encoding"),
    ("/online-tracking.html", "online-tracking"),
    ("/products.html", "products"),
    ("/tech-tracking.html", "tech-tracking"),
    ("/Prod/sales.html", "sales"),
    ("/Prod/marketing.html", "marketing"),
    ("/Prod/inventory.html", "inventory"),
    ("/Prod/finance.html", "finance"),
    ("/hr/tracking-and-development.html", "tracking-and-development"),
    ("/hr/research-and-development.html", "research-and-development"),
    ("/cs/customer-service.html", "customer-service"),
    ("/admin-permissions.html", ADMIN_CATEGORY),
];

/// Category of a dashboard page path
pub fn category_for_page(path: &str) -> Option<&'static str> {
    PAGE_CATEGORIES
        .iter()
        .find(|(page, _)| *page == path)
        .map(|(_, category)| *category)
}

/// Who the caller is and what they may open. Built once per session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AuthContext {
    pub user_id: String,
    pub email: Option<String>,
    pub allowed_categories: Vec<String>,
    pub is_admin: bool,
}

impl AuthContext {
    pub fn new(user_id: String, email: Option<String>, permissions: PermissionSet) -> Self {
        Self {
            user_id,
            email,
            allowed_categories: permissions.allowed_categories,
            is_admin: permissions.is_admin,
        }
    }

    pub fn can_access(&self, category: &str) -> bool {
        if self.is_admin {
            return true;
        }
        category != ADMIN_CATEGORY && self.allowed_categories.iter().any(|c| c == category)
    }

    /// Sidebar categories shown to this user, in page order
    pub fn visible_categories(&self) -> Vec<&'static str> {
        let mut visible: Vec<&'static str> = Vec::new();
        for (_, category) in PAGE_CATEGORIES {
            if self.can_access(category) && !visible.contains(category) {
                visible.push(category);
            }
        }
        visible
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AuthState {
    Unauthenticated,
    Authenticating,
    Authenticated(Arc<AuthContext>),
    /// Identity confirmed but no category is allowed
    Denied,
}

impl AuthState {
    pub fn is_terminal(&self) -> bool {
        !matches!(self, AuthState::Authenticating)
    }
}

/// Publish-once holder of a session's authentication outcome
#[derive(Debug, Clone)]
pub struct AuthSession {
    tx: Arc<watch::Sender<AuthState>>,
}

impl Default for AuthSession {
    fn default() -> Self {
        Self::new()
    }
}

impl AuthSession {
    pub fn new() -> Self {
        let (tx, _rx) = watch::channel(AuthState::Authenticating);
        Self { tx: Arc::new(tx) }
    }

    pub fn current(&self) -> AuthState {
        self.tx.borrow().clone()
    }

    /// Publish the terminal state. Only the first call has any effect.
    pub fn complete(&self, state: AuthState) -> bool {
        if !state.is_terminal() {
            return false;
        }
        self.tx.send_if_modified(|current| {
            if current.is_terminal() {
                false
            } else {
                *current = state;
                true
            }
        })
    }

    /// Wait for the terminal state
    pub async fn ready(&self) -> AuthState {
        let mut rx = self.tx.subscribe();
        let state = match rx.wait_for(AuthState::is_terminal).await {
            Ok(state) => state.clone(),
            // the sender lives in `self`, so the channel cannot close while we wait
            Err(_) => AuthState::Unauthenticated,
        };
        state
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Decision {
    Allow,
    Denied,
    Login,
    Pending,
}

pub struct NavigationPolicy;

impl NavigationPolicy {
    pub fn decide(state: &AuthState, category: &str) -> Decision {
        match state {
            AuthState::Authenticating => Decision::Pending,
            AuthState::Unauthenticated => Decision::Login,
            AuthState::Denied => Decision::Denied,
            AuthState::Authenticated(ctx) if ctx.can_access(category) => Decision::Allow,
            AuthState::Authenticated(_) => Decision::Denied,
        }
    }
}

/// Turns bearer tokens into terminal session states
#[derive(Debug, Clone)]
pub struct Authenticator {
    identity: Arc<dyn IdentityProvider>,
    permissions: Arc<dyn PermissionStore>,
    default_categories: Vec<String>,
}

impl Authenticator {
    pub fn new(
        identity: Arc<dyn IdentityProvider>,
        permissions: Arc<dyn PermissionStore>,
        default_categories: Vec<String>,
    ) -> Self {
        Self {
            identity,
            permissions,
            default_categories,
        }
    }

    /// The user behind `token`, or `None` when the provider rejects it.
    ///
    /// Permissions are not consulted.
    pub async fn verify_identity(&self, token: &str) -> Result<Option<IdentityUser>> {
        match self.identity.verify(token).await {
            Ok(user) => Ok(Some(user)),
            Err(GatewayError::Unauthorized(_)) => Ok(None),
            Err(e) => Err(e),
        }
    }

    /// Verify `token` and publish the outcome on `session`.
    ///
    /// Identity provider outages are returned as errors and leave the
    /// session unpublished.
    pub async fn authenticate(&self, token: &str, session: &AuthSession) -> Result<AuthState> {
        let state = match self.identity.verify(token).await {
            Ok(user) => {
                let permissions = resolve_permissions(
                    self.permissions.as_ref(),
                    &user.id,
                    &self.default_categories,
                )
                .await;
                if permissions.is_admin || !permissions.allowed_categories.is_empty() {
                    AuthState::Authenticated(Arc::new(AuthContext::new(
                        user.id,
                        user.email,
                        permissions,
                    )))
                } else {
                    debug!(user_id = %user.id, "User has no allowed categories");
                    AuthState::Denied
                }
            }
            Err(GatewayError::Unauthorized(_)) => AuthState::Unauthenticated,
            Err(e) => return Err(e),
        };

        session.complete(state);
        Ok(session.ready().await)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ctx(categories: &[&str], is_admin: bool) -> Arc<AuthContext> {
        Arc::new(AuthContext::new(
            "u-1".to_string(),
            None,
            PermissionSet::new(categories.iter().map(|c| c.to_string()).collect(), is_admin),
        ))
    }

    #[test]
    fn test_policy_decisions() {
        let user = AuthState::Authenticated(ctx(&["dashboard", "sales"], false));
        assert_eq!(NavigationPolicy::decide(&user, "sales"), Decision::Allow);
        assert_eq!(NavigationPolicy::decide(&user, "finance"), Decision::Denied);
        assert_eq!(
            NavigationPolicy::decide(&AuthState::Unauthenticated, "sales"),
            Decision::Login
        );
        assert_eq!(
            NavigationPolicy::decide(&AuthState::Authenticating, "sales"),
            Decision::Pending
        );
        assert_eq!(NavigationPolicy::decide(&AuthState::Denied, "dashboard"), Decision::Denied);
    }

    #[test]
    fn test_admin_sees_everything() {
        let admin = AuthState::Authenticated(ctx(&[], true));
        assert_eq!(NavigationPolicy::decide(&admin, "finance"), Decision::Allow);
        assert_eq!(NavigationPolicy::decide(&admin, ADMIN_CATEGORY), Decision::Allow);
    }

    #[test]
    fn test_admin_category_needs_admin_flag() {
        let user = ctx(&["dashboard", ADMIN_CATEGORY], false);
        assert!(!user.can_access(ADMIN_CATEGORY));
        assert_eq!(user.visible_categories(), vec!["dashboard"]);
    }

    #[test]
    fn test_visible_categories_follow_page_order() {
        let user = ctx(&["finance", "dashboard"], false);
        assert_eq!(user.visible_categories(), vec!["dashboard", "finance"]);
        assert_eq!(ctx(&[], true).visible_categories().len(), PAGE_CATEGORIES.len());
    }

    #[test]
    fn test_category_for_page() {
        assert_eq!(category_for_page("/Prod/sales.html"), Some("sales"));
        assert_eq!(category_for_page("/admin-permissions.html"), Some(ADMIN_CATEGORY));
        assert_eq!(category_for_page("/login.html"), None);
    }

    #[tokio::test]
    async fn test_session_publishes_once() {
        let session = AuthSession::new();
        assert_eq!(session.current(), AuthState::Authenticating);
        assert!(!session.complete(AuthState::Authenticating));

        let waiter = {
            let session = session.clone();
            tokio::spawn(async move { session.ready().await })
        };

        assert!(session.complete(AuthState::Denied));
        assert!(!session.complete(AuthState::Unauthenticated));

        assert_eq!(waiter.await.unwrap(), AuthState::Denied);
        assert_eq!(session.ready().await, AuthState::Denied);
    }
}
