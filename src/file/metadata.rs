//! File metadata types and repository for Cabinet.

use serde::Serialize;
use sqlx::SqlitePool;

use crate::auth::Entry;
use crate::{CabinetError, Result};

pub(crate) const FILE_COLUMNS: &str = "id, owner_id, folder_id, name, stored_name, size, group_id, created_at";

/// Metadata for a stored file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, sqlx::FromRow)]
pub struct FileMetadata {
    /// Unique file ID.
    pub id: i64,
    /// Owning user.
    pub owner_id: i64,
    /// Containing folder (None for the owner's root).
    pub folder_id: Option<i64>,
    /// Display name.
    pub name: String,
    /// Blob key in the file storage.
    #[serde(skip)]
    pub stored_name: String,
    /// File size in bytes.
    pub size: i64,
    /// Group the file is shared with.
    pub group_id: Option<i64>,
    /// When the file was created.
    pub created_at: String,
}

impl FileMetadata {
    /// Lowercase trailing extension, if the name has one.
    pub fn extension(&self) -> Option<String> {
        extension_of(&self.name)
    }
}

impl Entry for FileMetadata {
    fn owner_id(&self) -> i64 {
        self.owner_id
    }

    fn group_id(&self) -> Option<i64> {
        self.group_id
    }
}

/// Lowercase text after the last dot, or None when there is no dot.
pub(crate) fn extension_of(name: &str) -> Option<String> {
    name.rsplit_once('.')
        .map(|(_, ext)| ext.to_lowercase())
}

/// Data for creating a new file entry.
#[derive(Debug, Clone)]
pub struct NewFile {
    pub owner_id: i64,
    pub folder_id: Option<i64>,
    pub name: String,
    pub stored_name: String,
    pub size: i64,
    pub group_id: Option<i64>,
}

impl NewFile {
    /// Create a root-level file entry.
    pub fn new(
        owner_id: i64,
        name: impl Into<String>,
        stored_name: impl Into<String>,
        size: i64,
    ) -> Self {
        Self {
            owner_id,
            folder_id: None,
            name: name.into(),
            stored_name: stored_name.into(),
            size,
            group_id: None,
        }
    }

    /// Place the file inside a folder.
    pub fn in_folder(mut self, folder_id: Option<i64>) -> Self {
        self.folder_id = folder_id;
        self
    }

    /// Share with a group.
    pub fn with_group(mut self, group_id: Option<i64>) -> Self {
        self.group_id = group_id;
        self
    }
}

/// Repository for file rows.
pub struct FileRepository<'a> {
    pool: &'a SqlitePool,
}

impl<'a> FileRepository<'a> {
    /// Create a new FileRepository.
    pub fn new(pool: &'a SqlitePool) -> Self {
        Self { pool }
    }

    /// Create a new file entry.
    pub async fn create(&self, file: &NewFile) -> Result<FileMetadata> {
        let result = sqlx::query(
            "INSERT INTO files (owner_id, folder_id, name, stored_name, size, group_id)
             VALUES (?, ?, ?, ?, ?, ?)",
        )
        .bind(file.owner_id)
        .bind(file.folder_id)
        .bind(&file.name)
        .bind(&file.stored_name)
        .bind(file.size)
        .bind(file.group_id)
        .execute(self.pool)
        .await?;

        self.get_by_id(result.last_insert_rowid())
            .await?
            .ok_or_else(|| CabinetError::NotFound("file".to_string()))
    }

    /// Get file metadata by ID.
    pub async fn get_by_id(&self, id: i64) -> Result<Option<FileMetadata>> {
        let file = sqlx::query_as::<_, FileMetadata>(&format!(
            "SELECT {FILE_COLUMNS} FROM files WHERE id = ?"
        ))
        .bind(id)
        .fetch_optional(self.pool)
        .await?;
        Ok(file)
    }

    /// Root-level files of one owner.
    pub async fn list_root(&self, owner_id: i64) -> Result<Vec<FileMetadata>> {
        let files = sqlx::query_as::<_, FileMetadata>(&format!(
            "SELECT {FILE_COLUMNS} FROM files
             WHERE owner_id = ? AND folder_id IS NULL ORDER BY name, id"
        ))
        .bind(owner_id)
        .fetch_all(self.pool)
        .await?;
        Ok(files)
    }

    /// Files directly inside a folder that belong to one owner.
    pub async fn list_by_folder(&self, owner_id: i64, folder_id: i64) -> Result<Vec<FileMetadata>> {
        let files = sqlx::query_as::<_, FileMetadata>(&format!(
            "SELECT {FILE_COLUMNS} FROM files
             WHERE owner_id = ? AND folder_id = ? ORDER BY name, id"
        ))
        .bind(owner_id)
        .bind(folder_id)
        .fetch_all(self.pool)
        .await?;
        Ok(files)
    }

    /// Files shared with a group.
    pub async fn list_by_group(&self, group_id: i64) -> Result<Vec<FileMetadata>> {
        let files = sqlx::query_as::<_, FileMetadata>(&format!(
            "SELECT {FILE_COLUMNS} FROM files WHERE group_id = ? ORDER BY name, id"
        ))
        .bind(group_id)
        .fetch_all(self.pool)
        .await?;
        Ok(files)
    }

    /// Every file, ordered by owner then id.
    pub async fn list_all(&self) -> Result<Vec<FileMetadata>> {
        let files = sqlx::query_as::<_, FileMetadata>(&format!(
            "SELECT {FILE_COLUMNS} FROM files ORDER BY owner_id, id"
        ))
        .fetch_all(self.pool)
        .await?;
        Ok(files)
    }

    /// Every file of one owner.
    pub async fn list_by_owner(&self, owner_id: i64) -> Result<Vec<FileMetadata>> {
        let files = sqlx::query_as::<_, FileMetadata>(&format!(
            "SELECT {FILE_COLUMNS} FROM files WHERE owner_id = ? ORDER BY id"
        ))
        .bind(owner_id)
        .fetch_all(self.pool)
        .await?;
        Ok(files)
    }

    /// Total bytes stored by one owner.
    pub async fn total_size_by_owner(&self, owner_id: i64) -> Result<i64> {
        let total: i64 =
            sqlx::query_scalar("SELECT COALESCE(SUM(size), 0) FROM files WHERE owner_id = ?")
                .bind(owner_id)
                .fetch_one(self.pool)
                .await?;
        Ok(total)
    }
}
