//! Cabinet - multi-tenant file and folder store
//!
//! Owned, group-shareable folder trees with blob-backed files, per-user
//! favorites, and read-only admin reporting. Access decisions go through a
//! single [`AccessGate`] backed by a pluggable membership directory.

pub mod admin;
pub mod app;
pub mod auth;
pub mod config;
pub mod db;
pub mod error;
pub mod favorite;
pub mod file;
pub mod logging;

pub use admin::{AdminService, SystemStats, UserContent, UserFiles, UserFolders, UserStorage};
pub use app::Cabinet;
pub use auth::{build_directory, AccessDirectory, AccessGate, Entry, SqlDirectory, Viewer};
pub use config::Config;
pub use db::{Database, NewUser, User, UserRepository};
pub use error::{CabinetError, Result};
pub use favorite::{EntityType, FavoriteEntry, FavoriteService};
pub use file::{
    validate_name, FileMetadata, FileService, FileStorage, Folder, FolderRef, NameError,
    SweepResult, UploadRequest,
};
