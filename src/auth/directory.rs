//! The RBAC collaborator consulted by the access gate.

use std::collections::HashSet;
use std::sync::Arc;

use async_trait::async_trait;

use crate::db::{Database, DbPool, GroupRepository, PermissionRepository};
use crate::Result;

/// Source of capability grants and group memberships.
///
/// Implementations may be local tables, a remote auth service, or a cache
/// wrapped around either.
#[async_trait]
pub trait AccessDirectory: Send + Sync {
    /// Whether the user holds the named capability.
    async fn has_permission(&self, user_id: i64, permission: &str) -> Result<bool>;

    /// IDs of the groups the user belongs to.
    async fn user_groups(&self, user_id: i64) -> Result<HashSet<i64>>;
}

#[async_trait]
impl<D: AccessDirectory + ?Sized> AccessDirectory for Arc<D> {
    async fn has_permission(&self, user_id: i64, permission: &str) -> Result<bool> {
        (**self).has_permission(user_id, permission).await
    }

    async fn user_groups(&self, user_id: i64) -> Result<HashSet<i64>> {
        (**self).user_groups(user_id).await
    }
}

/// Directory backed by the local `user_permissions` and `user_groups` tables.
#[derive(Clone)]
pub struct SqlDirectory {
    pool: DbPool,
}

impl SqlDirectory {
    /// Create a directory reading from the given database.
    pub fn new(db: &Database) -> Self {
        Self {
            pool: db.pool().clone(),
        }
    }
}

#[async_trait]
impl AccessDirectory for SqlDirectory {
    async fn has_permission(&self, user_id: i64, permission: &str) -> Result<bool> {
        PermissionRepository::new(&self.pool)
            .has(user_id, permission)
            .await
    }

    async fn user_groups(&self, user_id: i64) -> Result<HashSet<i64>> {
        let ids = GroupRepository::new(&self.pool).list_for_user(user_id).await?;
        Ok(ids.into_iter().collect())
    }
}
