//! Administration module for Cabinet.
//!
//! This module provides read-only, cross-tenant reporting:
//! - Every file and folder grouped by owner
//! - One user's full content
//! - System-wide storage statistics
//!
//! Access requires an externally granted capability (`manage_files` by
//! default) rather than ownership or group membership.

mod service;
mod stats;

pub use service::AdminService;
pub use stats::{ExtensionCount, SystemStats, UserStorage, NO_EXTENSION};

use serde::Serialize;

use crate::db::User;
use crate::file::{FileMetadata, Folder};

/// One owner's files.
#[derive(Debug, Clone, Serialize)]
pub struct UserFiles {
    pub user_id: i64,
    /// None when the owner has no local user row.
    pub email: Option<String>,
    pub total_size: i64,
    pub files: Vec<FileMetadata>,
}

/// One owner's folders.
#[derive(Debug, Clone, Serialize)]
pub struct UserFolders {
    pub user_id: i64,
    pub email: Option<String>,
    pub folders: Vec<Folder>,
}

/// Everything a single user owns.
#[derive(Debug, Clone, Serialize)]
pub struct UserContent {
    pub user: User,
    pub folders: Vec<Folder>,
    pub files: Vec<FileMetadata>,
    pub storage_bytes: i64,
}
