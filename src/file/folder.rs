//! Folder types and repository for Cabinet.

use std::collections::HashSet;

use chrono::{DateTime, NaiveDateTime, Utc};
use serde::Serialize;
use sqlx::SqlitePool;
use tracing::warn;

use crate::auth::Entry;
use crate::{CabinetError, Result};

const FOLDER_COLUMNS: &str = "id, owner_id, parent_id, name, group_id, created_at";

/// A folder in some user's tree.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, sqlx::FromRow)]
pub struct Folder {
    /// Unique folder ID.
    pub id: i64,
    /// Owning user. Never changes after creation.
    pub owner_id: i64,
    /// Parent folder ID (None for root folders).
    pub parent_id: Option<i64>,
    /// Folder name.
    pub name: String,
    /// Group the folder is shared with.
    pub group_id: Option<i64>,
    /// When the folder was created.
    pub created_at: String,
}

impl Folder {
    /// Get the created_at as DateTime<Utc>.
    pub fn created_at_datetime(&self) -> DateTime<Utc> {
        NaiveDateTime::parse_from_str(&self.created_at, "%Y-%m-%d %H:%M:%S")
            .map(|dt| dt.and_utc())
            .unwrap_or_else(|_| Utc::now())
    }
}

impl Entry for Folder {
    fn owner_id(&self) -> i64 {
        self.owner_id
    }

    fn group_id(&self) -> Option<i64> {
        self.group_id
    }
}

/// Data for creating a new folder.
#[derive(Debug, Clone)]
pub struct NewFolder {
    pub owner_id: i64,
    pub name: String,
    pub parent_id: Option<i64>,
    pub group_id: Option<i64>,
}

impl NewFolder {
    /// Create a root folder owned by `owner_id`.
    pub fn new(owner_id: i64, name: impl Into<String>) -> Self {
        Self {
            owner_id,
            name: name.into(),
            parent_id: None,
            group_id: None,
        }
    }

    /// Set the parent folder.
    pub fn with_parent(mut self, parent_id: i64) -> Self {
        self.parent_id = Some(parent_id);
        self
    }

    /// Share with a group.
    pub fn with_group(mut self, group_id: i64) -> Self {
        self.group_id = Some(group_id);
        self
    }
}

/// Repository for folder rows.
pub struct FolderRepository<'a> {
    pool: &'a SqlitePool,
}

impl<'a> FolderRepository<'a> {
    /// Create a new FolderRepository with the given database pool reference.
    pub fn new(pool: &'a SqlitePool) -> Self {
        Self { pool }
    }

    /// Create a new folder.
    pub async fn create(&self, folder: &NewFolder) -> Result<Folder> {
        let result = sqlx::query(
            "INSERT INTO folders (owner_id, parent_id, name, group_id) VALUES (?, ?, ?, ?)",
        )
        .bind(folder.owner_id)
        .bind(folder.parent_id)
        .bind(&folder.name)
        .bind(folder.group_id)
        .execute(self.pool)
        .await?;

        self.get_by_id(result.last_insert_rowid())
            .await?
            .ok_or_else(|| CabinetError::NotFound("folder".to_string()))
    }

    /// Get a folder by ID.
    pub async fn get_by_id(&self, id: i64) -> Result<Option<Folder>> {
        let folder = sqlx::query_as::<_, Folder>(&format!(
            "SELECT {FOLDER_COLUMNS} FROM folders WHERE id = ?"
        ))
        .bind(id)
        .fetch_optional(self.pool)
        .await?;
        Ok(folder)
    }

    /// Root folders of one owner.
    pub async fn list_root(&self, owner_id: i64) -> Result<Vec<Folder>> {
        let folders = sqlx::query_as::<_, Folder>(&format!(
            "SELECT {FOLDER_COLUMNS} FROM folders
             WHERE owner_id = ? AND parent_id IS NULL ORDER BY name, id"
        ))
        .bind(owner_id)
        .fetch_all(self.pool)
        .await?;
        Ok(folders)
    }

    /// Direct children of a folder that belong to one owner.
    pub async fn list_by_parent(&self, owner_id: i64, parent_id: i64) -> Result<Vec<Folder>> {
        let folders = sqlx::query_as::<_, Folder>(&format!(
            "SELECT {FOLDER_COLUMNS} FROM folders
             WHERE owner_id = ? AND parent_id = ? ORDER BY name, id"
        ))
        .bind(owner_id)
        .bind(parent_id)
        .fetch_all(self.pool)
        .await?;
        Ok(folders)
    }

    /// Folders shared with a group.
    pub async fn list_by_group(&self, group_id: i64) -> Result<Vec<Folder>> {
        let folders = sqlx::query_as::<_, Folder>(&format!(
            "SELECT {FOLDER_COLUMNS} FROM folders WHERE group_id = ? ORDER BY name, id"
        ))
        .bind(group_id)
        .fetch_all(self.pool)
        .await?;
        Ok(folders)
    }

    /// Every folder, ordered by owner then id.
    pub async fn list_all(&self) -> Result<Vec<Folder>> {
        let folders = sqlx::query_as::<_, Folder>(&format!(
            "SELECT {FOLDER_COLUMNS} FROM folders ORDER BY owner_id, id"
        ))
        .fetch_all(self.pool)
        .await?;
        Ok(folders)
    }

    /// Every folder of one owner.
    pub async fn list_by_owner(&self, owner_id: i64) -> Result<Vec<Folder>> {
        let folders = sqlx::query_as::<_, Folder>(&format!(
            "SELECT {FOLDER_COLUMNS} FROM folders WHERE owner_id = ? ORDER BY id"
        ))
        .bind(owner_id)
        .fetch_all(self.pool)
        .await?;
        Ok(folders)
    }

    /// Get the path from root to a folder.
    ///
    /// Walks parent links with a visited set, so a corrupted chain that loops
    /// back on itself stops at the first repeated folder instead of spinning.
    pub async fn get_path(&self, id: i64) -> Result<Vec<Folder>> {
        let mut path = Vec::new();
        let mut visited = HashSet::new();
        let mut current_id = Some(id);

        while let Some(folder_id) = current_id {
            if !visited.insert(folder_id) {
                warn!(folder_id, "Cycle detected in folder parent chain");
                break;
            }
            match self.get_by_id(folder_id).await? {
                Some(folder) => {
                    current_id = folder.parent_id;
                    path.push(folder);
                }
                None => break,
            }
        }

        path.reverse();
        Ok(path)
    }
}
