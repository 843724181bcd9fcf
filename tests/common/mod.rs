//! Shared fixture for integration tests.
//!
//! Provides an in-memory database, a temporary blob store and a gate backed
//! by the local SQL directory.

#![allow(dead_code)]

use std::sync::Arc;

use tempfile::TempDir;

use cabinet::db::{GroupRepository, PermissionRepository};
use cabinet::file::FolderRef;
use cabinet::{
    AccessGate, AdminService, Database, FavoriteService, FileMetadata, FileService, FileStorage,
    Folder, NewUser, SqlDirectory, UploadRequest, UserRepository,
};

/// A self-contained store for one test.
pub struct TestEnv {
    pub db: Database,
    pub storage: FileStorage,
    pub gate: AccessGate,
    _temp_dir: TempDir,
}

impl TestEnv {
    pub async fn new() -> Self {
        let temp_dir = TempDir::new().unwrap();
        let db = Database::open_in_memory().await.unwrap();
        let storage = FileStorage::new(temp_dir.path().join("blobs")).unwrap();
        let gate = AccessGate::new(Arc::new(SqlDirectory::new(&db)));
        Self {
            db,
            storage,
            gate,
            _temp_dir: temp_dir,
        }
    }

    pub fn files(&self) -> FileService<'_> {
        FileService::new(&self.db, &self.storage, &self.gate)
    }

    pub fn favorites(&self) -> FavoriteService<'_> {
        FavoriteService::new(&self.db, &self.gate)
    }

    pub fn admin(&self) -> AdminService<'_> {
        AdminService::new(&self.db, &self.gate)
    }

    /// Create a user and return the ID.
    pub async fn user(&self, email: &str) -> i64 {
        UserRepository::new(self.db.pool())
            .create(&NewUser::new(email))
            .await
            .unwrap()
            .id
    }

    /// Create a group with the given members and return its ID.
    pub async fn group(&self, name: &str, members: &[i64]) -> i64 {
        let groups = GroupRepository::new(self.db.pool());
        let group = groups.create(name).await.unwrap();
        for member in members {
            groups.add_member(group.id, *member).await.unwrap();
        }
        group.id
    }

    pub async fn grant(&self, user_id: i64, permission: &str) {
        PermissionRepository::new(self.db.pool())
            .grant(user_id, permission)
            .await
            .unwrap();
    }

    pub async fn folder(&self, owner: i64, name: &str, parent: FolderRef) -> Folder {
        self.files()
            .create_folder(owner, name, parent, None)
            .await
            .unwrap()
    }

    pub async fn upload(&self, owner: i64, name: &str, size: usize, folder: FolderRef) -> FileMetadata {
        self.files()
            .create_file(owner, &UploadRequest::new(name, vec![7u8; size]), folder, None)
            .await
            .unwrap()
    }
}
