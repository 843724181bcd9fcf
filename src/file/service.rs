//! File service for Cabinet.
//!
//! This module provides the gated operations on the folder tree:
//! - Listing a folder, the caller's root, or a group's shared entries
//! - Creating folders and uploading files
//! - Reading metadata and payloads
//! - Deleting files and whole folder subtrees

use tracing::{debug, info, warn};

use crate::auth::AccessGate;
use crate::db::{Database, GroupRepository};
use crate::{CabinetError, Result};

use super::folder::{Folder, FolderRepository, NewFolder};
use super::metadata::{FileMetadata, FileRepository, NewFile};
use super::name::validate_name;
use super::storage::FileStorage;
use super::tree::{collect_subtree, delete_favorites, delete_file_rows, delete_subtree, SweepResult};
use super::{FolderRef, DEFAULT_MAX_FILE_SIZE};
use crate::favorite::EntityType;

/// An uploaded payload and the name to store it under.
#[derive(Debug, Clone)]
pub struct UploadRequest {
    /// Display name.
    pub name: String,
    /// File content.
    pub content: Vec<u8>,
}

impl UploadRequest {
    pub fn new(name: impl Into<String>, content: Vec<u8>) -> Self {
        Self {
            name: name.into(),
            content,
        }
    }
}

/// Result of a file download.
#[derive(Debug)]
pub struct DownloadResult {
    /// File metadata.
    pub metadata: FileMetadata,
    /// File content.
    pub content: Vec<u8>,
}

/// Folders and files shared with one group.
#[derive(Debug, Clone, Default, serde::Serialize)]
pub struct GroupListing {
    pub folders: Vec<Folder>,
    pub files: Vec<FileMetadata>,
}

/// Entry point for every folder and file operation.
///
/// Every method takes the acting user's id and consults the [`AccessGate`]
/// before reading or writing.
pub struct FileService<'a> {
    pub(super) db: &'a Database,
    pub(super) storage: &'a FileStorage,
    pub(super) gate: &'a AccessGate,
    max_file_size: u64,
}

impl<'a> FileService<'a> {
    /// Create a new FileService.
    pub fn new(db: &'a Database, storage: &'a FileStorage, gate: &'a AccessGate) -> Self {
        Self {
            db,
            storage,
            gate,
            max_file_size: DEFAULT_MAX_FILE_SIZE,
        }
    }

    /// Override the maximum upload size in bytes.
    pub fn with_max_file_size(mut self, max_size: u64) -> Self {
        self.max_file_size = max_size;
        self
    }

    /// Get the configured max file size.
    pub fn max_file_size(&self) -> u64 {
        self.max_file_size
    }

    /// Load a folder the user can see. Invisible folders are `NotFound`.
    pub(super) async fn visible_folder(&self, user_id: i64, folder_id: i64) -> Result<Folder> {
        let folder = FolderRepository::new(self.db.pool())
            .get_by_id(folder_id)
            .await?
            .ok_or_else(|| CabinetError::NotFound("folder".to_string()))?;
        self.gate.ensure_visible(user_id, &folder, "folder").await?;
        Ok(folder)
    }

    /// Load a folder the user owns.
    async fn owned_folder(&self, user_id: i64, folder_id: i64) -> Result<Folder> {
        let folder = self.visible_folder(user_id, folder_id).await?;
        self.gate.ensure_owner(user_id, &folder, "folder")?;
        Ok(folder)
    }

    /// A group can be attached only if it exists and the user belongs to it.
    async fn check_group(&self, user_id: i64, group_id: Option<i64>) -> Result<()> {
        let Some(group_id) = group_id else {
            return Ok(());
        };
        if GroupRepository::new(self.db.pool())
            .get_by_id(group_id)
            .await?
            .is_none()
        {
            return Err(CabinetError::NotFound("group".to_string()));
        }
        if !self.gate.is_member(user_id, group_id).await {
            return Err(CabinetError::PermissionDenied(
                "cannot share with a group you do not belong to".to_string(),
            ));
        }
        Ok(())
    }

    /// List the caller's own folders at a location.
    ///
    /// Inside a folder the caller must be able to access it. Entries other
    /// owners shared with the caller appear only in [`Self::list_group`].
    pub async fn list_folders(&self, user_id: i64, parent: FolderRef) -> Result<Vec<Folder>> {
        let repo = FolderRepository::new(self.db.pool());
        match parent {
            FolderRef::Root => repo.list_root(user_id).await,
            FolderRef::Folder(id) => {
                self.visible_folder(user_id, id).await?;
                repo.list_by_parent(user_id, id).await
            }
        }
    }

    /// List the caller's own files at a location. Same scoping as
    /// [`Self::list_folders`].
    pub async fn list_files(&self, user_id: i64, folder: FolderRef) -> Result<Vec<FileMetadata>> {
        let repo = FileRepository::new(self.db.pool());
        match folder {
            FolderRef::Root => repo.list_root(user_id).await,
            FolderRef::Folder(id) => {
                self.visible_folder(user_id, id).await?;
                repo.list_by_folder(user_id, id).await
            }
        }
    }

    /// Breadcrumb from the outermost visible ancestor down to a folder.
    ///
    /// Ancestors the caller cannot access cut the path, so a folder shared
    /// from inside someone else's private tree starts at the shared folder.
    pub async fn folder_path(&self, user_id: i64, folder_id: i64) -> Result<Vec<Folder>> {
        self.visible_folder(user_id, folder_id).await?;
        let viewer = self.gate.viewer(user_id).await;
        let mut path = FolderRepository::new(self.db.pool())
            .get_path(folder_id)
            .await?;
        if let Some(cut) = path.iter().rposition(|f| !viewer.can_access(f)) {
            path.drain(..=cut);
        }
        Ok(path)
    }

    /// Everything shared with a group the caller belongs to.
    pub async fn list_group(&self, user_id: i64, group_id: i64) -> Result<GroupListing> {
        if !self.gate.is_member(user_id, group_id).await {
            return Err(CabinetError::NotFound("group".to_string()));
        }
        Ok(GroupListing {
            folders: FolderRepository::new(self.db.pool())
                .list_by_group(group_id)
                .await?,
            files: FileRepository::new(self.db.pool())
                .list_by_group(group_id)
                .await?,
        })
    }

    /// Create a folder.
    ///
    /// A parent folder must be owned by the caller. Sibling names are not
    /// required to be unique.
    pub async fn create_folder(
        &self,
        user_id: i64,
        name: &str,
        parent: FolderRef,
        group_id: Option<i64>,
    ) -> Result<Folder> {
        validate_name(name)?;

        let mut new_folder = NewFolder::new(user_id, name);
        if let FolderRef::Folder(parent_id) = parent {
            self.owned_folder(user_id, parent_id).await?;
            new_folder = new_folder.with_parent(parent_id);
        }
        self.check_group(user_id, group_id).await?;
        if let Some(group_id) = group_id {
            new_folder = new_folder.with_group(group_id);
        }

        let folder = FolderRepository::new(self.db.pool())
            .create(&new_folder)
            .await?;
        info!(
            user_id,
            folder_id = folder.id,
            parent_id = ?folder.parent_id,
            "Created folder"
        );
        Ok(folder)
    }

    /// Upload a file.
    ///
    /// The payload is written to storage first. If the metadata insert then
    /// fails, the payload is removed again.
    pub async fn create_file(
        &self,
        user_id: i64,
        upload: &UploadRequest,
        folder: FolderRef,
        group_id: Option<i64>,
    ) -> Result<FileMetadata> {
        validate_name(&upload.name)?;

        let size = upload.content.len() as u64;
        if size > self.max_file_size {
            return Err(CabinetError::InvalidInput(format!(
                "file is {size} bytes, limit is {} bytes",
                self.max_file_size
            )));
        }

        if let FolderRef::Folder(folder_id) = folder {
            self.owned_folder(user_id, folder_id).await?;
        }
        self.check_group(user_id, group_id).await?;

        let stored_name = self.storage.save(&upload.content)?;
        let new_file = NewFile::new(user_id, &upload.name, &stored_name, size as i64)
            .in_folder(folder.as_option())
            .with_group(group_id);

        match FileRepository::new(self.db.pool()).create(&new_file).await {
            Ok(file) => {
                info!(user_id, file_id = file.id, size, "Created file");
                Ok(file)
            }
            Err(e) => {
                if let Err(cleanup) = self.storage.delete(&stored_name) {
                    warn!(stored_name = %stored_name, error = %cleanup, "Failed to remove orphaned blob");
                }
                Err(e)
            }
        }
    }

    /// Get file metadata without the payload.
    pub async fn get_file(&self, user_id: i64, file_id: i64) -> Result<FileMetadata> {
        let file = FileRepository::new(self.db.pool())
            .get_by_id(file_id)
            .await?
            .ok_or_else(|| CabinetError::NotFound("file".to_string()))?;
        self.gate.ensure_visible(user_id, &file, "file").await?;
        Ok(file)
    }

    /// Get file metadata and payload.
    pub async fn download(&self, user_id: i64, file_id: i64) -> Result<DownloadResult> {
        let metadata = self.get_file(user_id, file_id).await?;
        let content = self.storage.load(&metadata.stored_name)?;
        debug!(user_id, file_id, bytes = content.len(), "Downloaded file");
        Ok(DownloadResult { metadata, content })
    }

    /// Delete a file and every favorite pointing at it.
    pub async fn delete_file(&self, user_id: i64, file_id: i64) -> Result<()> {
        let file = self.get_file(user_id, file_id).await?;
        self.gate.ensure_owner(user_id, &file, "file")?;

        let mut tx = self.db.begin().await?;
        delete_favorites(&mut tx, EntityType::File, &[file.id]).await?;
        delete_file_rows(&mut tx, &[file.id]).await?;
        tx.commit().await?;

        info!(user_id, file_id, "Deleted file");
        self.remove_blobs(std::slice::from_ref(&file.stored_name));
        Ok(())
    }

    /// Delete a folder with all descendant folders and files.
    ///
    /// Rows go in one transaction; payloads are removed after it commits.
    pub async fn delete_folder(&self, user_id: i64, folder_id: i64) -> Result<SweepResult> {
        self.owned_folder(user_id, folder_id).await?;

        let mut tx = self.db.begin().await?;
        let sweep = collect_subtree(&mut tx, folder_id).await?;
        delete_subtree(&mut tx, &sweep).await?;
        tx.commit().await?;

        info!(
            user_id,
            folder_id,
            folders = sweep.folder_ids.len(),
            files = sweep.file_ids.len(),
            "Deleted folder subtree"
        );
        self.remove_blobs(&sweep.stored_names);
        Ok(sweep)
    }

    /// Best-effort payload removal after rows are gone.
    pub(super) fn remove_blobs(&self, stored_names: &[String]) {
        for stored_name in stored_names {
            if let Err(e) = self.storage.delete(stored_name) {
                warn!(stored_name = %stored_name, error = %e, "Failed to remove blob");
            }
        }
    }
}
