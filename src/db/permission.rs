//! Capability grants read by the local access directory.

use sqlx::SqlitePool;

use crate::Result;

/// Repository for `user_permissions` rows.
pub struct PermissionRepository<'a> {
    pool: &'a SqlitePool,
}

impl<'a> PermissionRepository<'a> {
    /// Create a new PermissionRepository.
    pub fn new(pool: &'a SqlitePool) -> Self {
        Self { pool }
    }

    /// Grant a capability. Granting twice is a no-op.
    pub async fn grant(&self, user_id: i64, permission: &str) -> Result<()> {
        sqlx::query("INSERT OR IGNORE INTO user_permissions (user_id, permission) VALUES (?, ?)")
            .bind(user_id)
            .bind(permission)
            .execute(self.pool)
            .await?;
        Ok(())
    }

    /// Check a single capability.
    pub async fn has(&self, user_id: i64, permission: &str) -> Result<bool> {
        let exists: bool = sqlx::query_scalar(
            "SELECT EXISTS(SELECT 1 FROM user_permissions WHERE user_id = ? AND permission = ?)",
        )
        .bind(user_id)
        .bind(permission)
        .fetch_one(self.pool)
        .await?;
        Ok(exists)
    }
}
