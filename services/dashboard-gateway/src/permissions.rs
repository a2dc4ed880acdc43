//! Per-user page permissions
//!
//! A user without a record gets the configured default categories, and that
//! default is written back so every user who has signed in has a record an
//! administrator can edit.

use crate::config::PermissionsConfig;
use crate::errors::Result;
use async_trait::async_trait;
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use tracing::{info, warn};

/// Categories a user may open, plus the administrator flag
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PermissionSet {
    #[serde(default)]
    pub allowed_categories: Vec<String>,
    #[serde(default)]
    pub is_admin: bool,
}

impl PermissionSet {
    pub fn new(allowed_categories: Vec<String>, is_admin: bool) -> Self {
        Self {
            allowed_categories,
            is_admin,
        }
    }

    /// Nothing allowed
    pub fn none() -> Self {
        Self::new(Vec::new(), false)
    }
}

#[async_trait]
pub trait PermissionStore: Send + Sync + std::fmt::Debug {
    async fn get(&self, user_id: &str) -> Result<Option<PermissionSet>>;

    async fn put(&self, user_id: &str, permissions: PermissionSet) -> Result<()>;
}

/// Permissions for `user_id`, recording `defaults` for first-time users.
///
/// A lookup failure yields [`PermissionSet::none`].
pub async fn resolve_permissions(
    store: &dyn PermissionStore,
    user_id: &str,
    defaults: &[String],
) -> PermissionSet {
    match store.get(user_id).await {
        Ok(Some(permissions)) => permissions,
        Ok(None) => {
            let permissions = PermissionSet::new(defaults.to_vec(), false);
            info!(
                user_id,
                categories = ?permissions.allowed_categories,
                "Assigning default permissions"
            );
            if let Err(e) = store.put(user_id, permissions.clone()).await {
                warn!(user_id, error = %e, "Failed to record default permissions");
            }
            permissions
        }
        Err(e) => {
            warn!(user_id, error = %e, "Permission lookup failed, assuming no access");
            PermissionSet::none()
        }
    }
}

/// Permission records held in memory, seeded from configuration
#[derive(Debug, Default)]
pub struct InMemoryPermissionStore {
    entries: RwLock<HashMap<String, PermissionSet>>,
}

impl InMemoryPermissionStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_config(config: &PermissionsConfig) -> Self {
        let entries = config
            .users
            .iter()
            .map(|(user_id, p)| {
                (
                    user_id.clone(),
                    PermissionSet::new(p.allowed_categories.clone(), p.is_admin),
                )
            })
            .collect();
        Self {
            entries: RwLock::new(entries),
        }
    }

    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.read().is_empty()
    }
}

#[async_trait]
impl PermissionStore for InMemoryPermissionStore {
    async fn get(&self, user_id: &str) -> Result<Option<PermissionSet>> {
        Ok(self.entries.read().get(user_id).cloned())
    }

    async fn put(&self, user_id: &str, permissions: PermissionSet) -> Result<()> {
        self.entries.write().insert(user_id.to_string(), permissions);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::UserPermissions;
    use crate::errors::GatewayError;

    #[derive(Debug)]
    struct BrokenStore;

    #[async_trait]
    impl PermissionStore for BrokenStore {
        async fn get(&self, _user_id: &str) -> Result<Option<PermissionSet>> {
            Err(GatewayError::Permissions("unavailable".into()))
        }

        async fn put(&self, _user_id: &str, _permissions: PermissionSet) -> Result<()> {
            Err(GatewayError::Permissions("unavailable".into()))
        }
    }

    fn defaults() -> Vec<String> {
        vec!["dashboard".to_string()]
    }

    #[tokio::test]
    async fn test_first_time_user_gets_recorded_default() {
        let store = InMemoryPermissionStore::new();
        let permissions = resolve_permissions(&store, "u-1", &defaults()).await;
        assert_eq!(permissions, PermissionSet::new(defaults(), false));
        assert_eq!(store.get("u-1").await.unwrap(), Some(permissions));
    }

    #[tokio::test]
    async fn test_existing_record_wins() {
        let store = InMemoryPermissionStore::new();
        let admin = PermissionSet::new(vec![], true);
        store.put("boss", admin.clone()).await.unwrap();
        assert_eq!(resolve_permissions(&store, "boss", &defaults()).await, admin);
    }

    #[tokio::test]
    async fn test_lookup_failure_grants_nothing() {
        let permissions = resolve_permissions(&BrokenStore, "u-1", &defaults()).await;
        assert_eq!(permissions, PermissionSet::none());
    }

    #[tokio::test]
    async fn test_seeded_from_config() {
        let mut users = HashMap::new();
        users.insert(
            "u-7".to_string(),
            UserPermissions {
                allowed_categories: vec!["sales".to_string()],
                is_admin: false,
            },
        );
        let store = InMemoryPermissionStore::from_config(&PermissionsConfig {
            default_categories: defaults(),
            users,
        });
        assert_eq!(store.len(), 1);
        let record = store.get("u-7").await.unwrap().unwrap();
        assert_eq!(record.allowed_categories, vec!["sales"]);
    }

    #[test]
    fn test_wire_format_is_camel_case() {
        let json = serde_json::to_value(PermissionSet::new(vec!["hr".into()], true)).unwrap();
        assert_eq!(json["allowedCategories"][0], "hr");
        assert_eq!(json["isAdmin"], true);
    }
}
