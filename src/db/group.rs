//! Groups and group membership.
//!
//! Membership rows back the local access directory. In remote RBAC mode the
//! table still exists so group names can be shown next to shared entries.

use sqlx::SqlitePool;

use crate::{CabinetError, Result};

/// A named set of users that folders and files can be shared with.
#[derive(Debug, Clone, PartialEq, Eq, sqlx::FromRow)]
pub struct Group {
    /// Unique group ID.
    pub id: i64,
    /// Group name.
    pub name: String,
    /// When the group was created.
    pub created_at: String,
}

/// Repository for groups and their members.
pub struct GroupRepository<'a> {
    pool: &'a SqlitePool,
}

impl<'a> GroupRepository<'a> {
    /// Create a new GroupRepository.
    pub fn new(pool: &'a SqlitePool) -> Self {
        Self { pool }
    }

    /// Create a new group.
    pub async fn create(&self, name: &str) -> Result<Group> {
        let result = sqlx::query("INSERT INTO groups (name) VALUES (?)")
            .bind(name)
            .execute(self.pool)
            .await?;

        self.get_by_id(result.last_insert_rowid())
            .await?
            .ok_or_else(|| CabinetError::NotFound("group".to_string()))
    }

    /// Get a group by ID.
    pub async fn get_by_id(&self, id: i64) -> Result<Option<Group>> {
        let group = sqlx::query_as::<_, Group>(
            "SELECT id, name, created_at FROM groups WHERE id = ?",
        )
        .bind(id)
        .fetch_optional(self.pool)
        .await?;
        Ok(group)
    }

    /// Add a user to a group.
    ///
    /// Adding an existing member is a no-op.
    pub async fn add_member(&self, group_id: i64, user_id: i64) -> Result<()> {
        sqlx::query("INSERT OR IGNORE INTO user_groups (user_id, group_id) VALUES (?, ?)")
            .bind(user_id)
            .bind(group_id)
            .execute(self.pool)
            .await?;
        Ok(())
    }

    /// Remove a user from a group.
    ///
    /// Returns true if a membership was removed.
    pub async fn remove_member(&self, group_id: i64, user_id: i64) -> Result<bool> {
        let result = sqlx::query("DELETE FROM user_groups WHERE user_id = ? AND group_id = ?")
            .bind(user_id)
            .bind(group_id)
            .execute(self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    /// Group IDs the user belongs to, ascending.
    pub async fn list_for_user(&self, user_id: i64) -> Result<Vec<i64>> {
        let ids: Vec<i64> = sqlx::query_scalar(
            "SELECT group_id FROM user_groups WHERE user_id = ? ORDER BY group_id",
        )
        .bind(user_id)
        .fetch_all(self.pool)
        .await?;
        Ok(ids)
    }
}
