//! Cross-tenant reporting gated by the admin capability.

use std::collections::{BTreeMap, HashMap};

use tracing::{debug, info};

use super::stats::{extension_histogram, SystemStats, UserStorage};
use super::{UserContent, UserFiles, UserFolders};
use crate::auth::AccessGate;
use crate::config::AdminConfig;
use crate::db::{Database, UserRepository};
use crate::file::{FileRepository, FolderRepository};
use crate::{CabinetError, Result};

/// Read-only admin views over every user's content.
///
/// Each call first checks the configured capability through the gate. The
/// results are a snapshot; concurrent writers are not blocked.
pub struct AdminService<'a> {
    db: &'a Database,
    gate: &'a AccessGate,
    config: AdminConfig,
}

impl<'a> AdminService<'a> {
    /// Create an AdminService with default limits.
    pub fn new(db: &'a Database, gate: &'a AccessGate) -> Self {
        Self::with_config(db, gate, AdminConfig::default())
    }

    pub fn with_config(db: &'a Database, gate: &'a AccessGate, config: AdminConfig) -> Self {
        Self { db, gate, config }
    }

    async fn require_admin(&self, user_id: i64) -> Result<()> {
        self.gate
            .ensure_capability(user_id, &self.config.capability)
            .await
    }

    async fn emails(&self) -> Result<HashMap<i64, String>> {
        let users = UserRepository::new(self.db.pool()).list_all().await?;
        Ok(users.into_iter().map(|u| (u.id, u.email)).collect())
    }

    /// Every file, grouped by owner id.
    pub async fn all_files_grouped_by_user(&self, admin_id: i64) -> Result<Vec<UserFiles>> {
        self.require_admin(admin_id).await?;

        let emails = self.emails().await?;
        let files = FileRepository::new(self.db.pool()).list_all().await?;

        let mut grouped: BTreeMap<i64, UserFiles> = BTreeMap::new();
        for file in files {
            let entry = grouped.entry(file.owner_id).or_insert_with(|| UserFiles {
                user_id: file.owner_id,
                email: emails.get(&file.owner_id).cloned(),
                total_size: 0,
                files: Vec::new(),
            });
            entry.total_size += file.size;
            entry.files.push(file);
        }

        debug!(admin_id, owners = grouped.len(), "Listed all files");
        Ok(grouped.into_values().collect())
    }

    /// Every folder, grouped by owner id.
    pub async fn all_folders_grouped_by_user(&self, admin_id: i64) -> Result<Vec<UserFolders>> {
        self.require_admin(admin_id).await?;

        let emails = self.emails().await?;
        let folders = FolderRepository::new(self.db.pool()).list_all().await?;

        let mut grouped: BTreeMap<i64, UserFolders> = BTreeMap::new();
        for folder in folders {
            grouped
                .entry(folder.owner_id)
                .or_insert_with(|| UserFolders {
                    user_id: folder.owner_id,
                    email: emails.get(&folder.owner_id).cloned(),
                    folders: Vec::new(),
                })
                .folders
                .push(folder);
        }

        debug!(admin_id, owners = grouped.len(), "Listed all folders");
        Ok(grouped.into_values().collect())
    }

    /// Everything one user owns. Unknown users are `NotFound`.
    pub async fn user_content(&self, admin_id: i64, user_id: i64) -> Result<UserContent> {
        self.require_admin(admin_id).await?;

        let user = UserRepository::new(self.db.pool())
            .get_by_id(user_id)
            .await?
            .ok_or_else(|| CabinetError::NotFound("user".to_string()))?;

        let folders = FolderRepository::new(self.db.pool())
            .list_by_owner(user_id)
            .await?;
        let file_repo = FileRepository::new(self.db.pool());
        let files = file_repo.list_by_owner(user_id).await?;
        let storage_bytes = file_repo.total_size_by_owner(user_id).await?;

        Ok(UserContent {
            user,
            folders,
            files,
            storage_bytes,
        })
    }

    /// Totals, extension histogram and the storage leaderboard.
    pub async fn system_stats(&self, admin_id: i64) -> Result<SystemStats> {
        self.require_admin(admin_id).await?;
        let pool = self.db.pool();

        let total_users = UserRepository::new(pool).count().await?;
        let (total_files, total_bytes): (i64, i64) =
            sqlx::query_as("SELECT COUNT(*), COALESCE(SUM(size), 0) FROM files")
                .fetch_one(pool)
                .await?;
        let total_folders: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM folders")
            .fetch_one(pool)
            .await?;

        let names: Vec<String> = sqlx::query_scalar("SELECT name FROM files")
            .fetch_all(pool)
            .await?;
        let extensions = extension_histogram(
            names.iter().map(String::as_str),
            self.config.top_extensions_limit,
        );

        let top_users = sqlx::query_as::<_, UserStorage>(
            "SELECT f.owner_id AS user_id, u.email AS email, SUM(f.size) AS storage_bytes
             FROM files f
             LEFT JOIN users u ON u.id = f.owner_id
             GROUP BY f.owner_id
             ORDER BY storage_bytes DESC, f.owner_id
             LIMIT ?",
        )
        .bind(i64::try_from(self.config.top_users_limit).unwrap_or(i64::MAX))
        .fetch_all(pool)
        .await?;

        info!(
            admin_id,
            total_users, total_files, total_folders, total_bytes, "Computed system stats"
        );

        Ok(SystemStats {
            total_users,
            total_files,
            total_folders,
            total_bytes,
            extensions,
            top_users,
        })
    }
}
