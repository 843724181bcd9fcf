//! File management module for Cabinet.
//!
//! This module provides the owned, shareable folder tree and its files:
//! - Self-referential folders with an explicit cascade sweep
//! - File metadata with payloads kept in a [`FileStorage`] blob store
//! - Name validation shared by files and folders
//! - All-or-nothing batch moves and deletes

mod batch;
mod folder;
mod metadata;
mod name;
mod service;
mod storage;
mod tree;

pub use folder::{Folder, FolderRepository, NewFolder};
pub use metadata::{FileMetadata, FileRepository, NewFile};
pub(crate) use metadata::extension_of;
pub use name::{validate_name, NameError};
pub use service::{DownloadResult, FileService, GroupListing, UploadRequest};
pub use storage::FileStorage;
pub use tree::{collect_subtree, SweepResult};

/// Maximum length for a file or folder name (in characters).
pub const MAX_NAME_LENGTH: usize = 255;

/// Default maximum upload size (100MB).
pub const DEFAULT_MAX_FILE_SIZE: u64 = 100 * 1024 * 1024;

/// Location of a file or folder: the caller's root, or inside a folder.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum FolderRef {
    #[default]
    Root,
    Folder(i64),
}

impl FolderRef {
    /// Map a raw id from an external caller. Zero and negatives mean root.
    pub fn from_raw(raw: i64) -> Self {
        if raw <= 0 {
            FolderRef::Root
        } else {
            FolderRef::Folder(raw)
        }
    }

    /// Column value for `parent_id` / `folder_id`.
    pub fn as_option(self) -> Option<i64> {
        match self {
            FolderRef::Root => None,
            FolderRef::Folder(id) => Some(id),
        }
    }

    pub fn is_root(self) -> bool {
        self == FolderRef::Root
    }
}

impl From<Option<i64>> for FolderRef {
    fn from(id: Option<i64>) -> Self {
        id.map_or(FolderRef::Root, FolderRef::from_raw)
    }
}
