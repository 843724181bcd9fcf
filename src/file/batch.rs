//! All-or-nothing operations over several files.
//!
//! Ownership of every file is checked inside the same transaction that
//! performs the write. Any failure drops the transaction, which rolls it
//! back, so the store is left exactly as it was. Large id lists are split
//! into chunks of statements within that one transaction.

use std::collections::{HashMap, HashSet};

use sqlx::{QueryBuilder, SqliteConnection};
use tracing::{info, warn};

use crate::auth::Viewer;
use crate::favorite::EntityType;
use crate::{CabinetError, Result};

use super::metadata::{FileMetadata, FILE_COLUMNS};
use super::service::FileService;
use super::tree::{delete_favorites, push_id_list, ID_CHUNK_SIZE};
use super::FolderRef;

/// Drop repeated ids, keeping first occurrences in order.
fn dedup_ids(ids: &[i64]) -> Vec<i64> {
    let mut seen = HashSet::new();
    ids.iter().copied().filter(|id| seen.insert(*id)).collect()
}

/// Load the files and require that the viewer owns every one of them.
///
/// A file that is missing or invisible yields `NotFound`; a visible file
/// owned by someone else yields `PermissionDenied`.
async fn load_owned_files(
    conn: &mut SqliteConnection,
    viewer: &Viewer,
    ids: &[i64],
) -> Result<Vec<FileMetadata>> {
    let mut files: HashMap<i64, FileMetadata> = HashMap::with_capacity(ids.len());
    for chunk in ids.chunks(ID_CHUNK_SIZE) {
        let mut query =
            QueryBuilder::new(format!("SELECT {FILE_COLUMNS} FROM files WHERE id IN "));
        push_id_list(&mut query, chunk);
        let rows: Vec<FileMetadata> = query.build_query_as().fetch_all(&mut *conn).await?;
        files.extend(rows.into_iter().map(|f| (f.id, f)));
    }

    for id in ids {
        let Some(file) = files.get(id) else {
            return Err(CabinetError::NotFound(format!("file {id}")));
        };
        if !viewer.can_access(file) {
            return Err(CabinetError::NotFound(format!("file {id}")));
        }
        if file.owner_id != viewer.user_id {
            return Err(CabinetError::PermissionDenied(format!(
                "only the owner can modify file {id}"
            )));
        }
    }
    Ok(ids.iter().filter_map(|id| files.remove(id)).collect())
}

impl<'a> FileService<'a> {
    /// Move one file. See [`Self::move_files`].
    pub async fn move_file(&self, user_id: i64, file_id: i64, target: FolderRef) -> Result<()> {
        self.move_files(user_id, &[file_id], target).await.map(|_| ())
    }

    /// Move several files into `target` as a single unit.
    ///
    /// The caller must own every file and be able to access the target
    /// folder. If any check or the update itself fails, no file moves.
    /// Returns the number of files moved.
    pub async fn move_files(
        &self,
        user_id: i64,
        file_ids: &[i64],
        target: FolderRef,
    ) -> Result<usize> {
        let ids = dedup_ids(file_ids);
        if ids.is_empty() {
            return Ok(0);
        }

        // Memberships are resolved before the transaction so the directory
        // never competes with it for a connection.
        let viewer = self.gate.viewer(user_id).await;
        if let FolderRef::Folder(folder_id) = target {
            self.visible_folder(user_id, folder_id).await?;
        }

        let mut tx = self.db.begin().await?;
        load_owned_files(&mut tx, &viewer, &ids).await?;

        if let FolderRef::Folder(folder_id) = target {
            let still_there: bool =
                sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM folders WHERE id = ?)")
                    .bind(folder_id)
                    .fetch_one(&mut *tx)
                    .await?;
            if !still_there {
                return Err(CabinetError::NotFound("folder".to_string()));
            }
        }

        let mut moved = 0;
        for chunk in ids.chunks(ID_CHUNK_SIZE) {
            let mut update = QueryBuilder::new("UPDATE files SET folder_id = ");
            update.push_bind(target.as_option());
            update.push(" WHERE owner_id = ");
            update.push_bind(user_id);
            update.push(" AND id IN ");
            push_id_list(&mut update, chunk);

            match update.build().execute(&mut *tx).await {
                Ok(result) => moved += result.rows_affected() as usize,
                Err(e) => {
                    warn!(user_id, error = %e, "Batch move failed, rolling back");
                    tx.rollback().await?;
                    return Err(CabinetError::TransactionFailure(format!("move failed: {e}")));
                }
            }
        }
        if moved != ids.len() {
            tx.rollback().await?;
            return Err(CabinetError::TransactionFailure(format!(
                "expected to move {} files, matched {moved}",
                ids.len()
            )));
        }

        tx.commit()
            .await
            .map_err(|e| CabinetError::TransactionFailure(format!("commit failed: {e}")))?;

        info!(user_id, count = moved, target = ?target, "Moved files");
        Ok(moved)
    }

    /// Delete several files as a single unit.
    ///
    /// Same preconditions as [`Self::move_files`]. Favorites on the files are
    /// removed with them; payloads are removed after commit.
    pub async fn delete_files(&self, user_id: i64, file_ids: &[i64]) -> Result<usize> {
        let ids = dedup_ids(file_ids);
        if ids.is_empty() {
            return Ok(0);
        }

        let viewer = self.gate.viewer(user_id).await;

        let mut tx = self.db.begin().await?;
        let files = load_owned_files(&mut tx, &viewer, &ids).await?;

        delete_favorites(&mut tx, EntityType::File, &ids).await?;

        let mut deleted = 0;
        for chunk in ids.chunks(ID_CHUNK_SIZE) {
            let mut delete = QueryBuilder::new("DELETE FROM files WHERE owner_id = ");
            delete.push_bind(user_id);
            delete.push(" AND id IN ");
            push_id_list(&mut delete, chunk);

            match delete.build().execute(&mut *tx).await {
                Ok(result) => deleted += result.rows_affected() as usize,
                Err(e) => {
                    warn!(user_id, error = %e, "Batch delete failed, rolling back");
                    tx.rollback().await?;
                    return Err(CabinetError::TransactionFailure(format!("delete failed: {e}")));
                }
            }
        }
        if deleted != ids.len() {
            tx.rollback().await?;
            return Err(CabinetError::TransactionFailure(format!(
                "expected to delete {} files, matched {deleted}",
                ids.len()
            )));
        }

        tx.commit()
            .await
            .map_err(|e| CabinetError::TransactionFailure(format!("commit failed: {e}")))?;

        info!(user_id, count = deleted, "Deleted files");
        let stored_names: Vec<String> = files.into_iter().map(|f| f.stored_name).collect();
        self.remove_blobs(&stored_names);
        Ok(deleted)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::{AccessGate, SqlDirectory};
    use crate::db::{Database, GroupRepository, NewUser, UserRepository};
    use crate::file::{FileRepository, FileStorage, UploadRequest};
    use std::sync::Arc;
    use tempfile::TempDir;

    struct Fixture {
        db: Database,
        storage: FileStorage,
        gate: AccessGate,
        alice: i64,
        bob: i64,
        _temp_dir: TempDir,
    }

    async fn setup() -> Fixture {
        let temp_dir = TempDir::new().unwrap();
        let db = Database::open_in_memory().await.unwrap();
        let storage = FileStorage::new(temp_dir.path()).unwrap();
        let gate = AccessGate::new(Arc::new(SqlDirectory::new(&db)));
        let users = UserRepository::new(db.pool());
        let alice = users.create(&NewUser::new("alice@example.com")).await.unwrap().id;
        let bob = users.create(&NewUser::new("bob@example.com")).await.unwrap().id;
        Fixture {
            db,
            storage,
            gate,
            alice,
            bob,
            _temp_dir: temp_dir,
        }
    }

    async fn upload(service: &FileService<'_>, user: i64, name: &str, group: Option<i64>) -> i64 {
        service
            .create_file(
                user,
                &UploadRequest::new(name, name.as_bytes().to_vec()),
                FolderRef::Root,
                group,
            )
            .await
            .unwrap()
            .id
    }

    async fn folder_of(db: &Database, file_id: i64) -> Option<i64> {
        FileRepository::new(db.pool())
            .get_by_id(file_id)
            .await
            .unwrap()
            .unwrap()
            .folder_id
    }

    #[test]
    fn test_dedup_ids() {
        assert_eq!(dedup_ids(&[3, 1, 3, 2, 1]), vec![3, 1, 2]);
        assert!(dedup_ids(&[]).is_empty());
    }

    #[tokio::test]
    async fn test_move_files_into_folder_and_back() {
        let fx = setup().await;
        let service = FileService::new(&fx.db, &fx.storage, &fx.gate);
        let folder = service
            .create_folder(fx.alice, "Target", FolderRef::Root, None)
            .await
            .unwrap();
        let a = upload(&service, fx.alice, "a.txt", None).await;
        let b = upload(&service, fx.alice, "b.txt", None).await;

        let moved = service
            .move_files(fx.alice, &[a, b, a], FolderRef::Folder(folder.id))
            .await
            .unwrap();
        assert_eq!(moved, 2);
        assert_eq!(folder_of(&fx.db, a).await, Some(folder.id));
        assert_eq!(folder_of(&fx.db, b).await, Some(folder.id));

        service.move_file(fx.alice, a, FolderRef::Root).await.unwrap();
        assert_eq!(folder_of(&fx.db, a).await, None);
    }

    #[tokio::test]
    async fn test_move_files_empty_is_noop() {
        let fx = setup().await;
        let service = FileService::new(&fx.db, &fx.storage, &fx.gate);
        assert_eq!(
            service.move_files(fx.alice, &[], FolderRef::Root).await.unwrap(),
            0
        );
    }

    #[tokio::test]
    async fn test_move_files_atomic_on_missing_id() {
        let fx = setup().await;
        let service = FileService::new(&fx.db, &fx.storage, &fx.gate);
        let folder = service
            .create_folder(fx.alice, "Target", FolderRef::Root, None)
            .await
            .unwrap();
        let a = upload(&service, fx.alice, "a.txt", None).await;
        let b = upload(&service, fx.alice, "b.txt", None).await;

        let err = service
            .move_files(fx.alice, &[a, b, 9999], FolderRef::Folder(folder.id))
            .await
            .unwrap_err();

        assert!(matches!(err, CabinetError::NotFound(_)));
        assert_eq!(folder_of(&fx.db, a).await, None);
        assert_eq!(folder_of(&fx.db, b).await, None);
    }

    #[tokio::test]
    async fn test_move_files_atomic_on_foreign_file() {
        let fx = setup().await;
        let service = FileService::new(&fx.db, &fx.storage, &fx.gate);
        let groups = GroupRepository::new(fx.db.pool());
        let team = groups.create("Team").await.unwrap();
        groups.add_member(team.id, fx.alice).await.unwrap();
        groups.add_member(team.id, fx.bob).await.unwrap();

        let folder = service
            .create_folder(fx.alice, "Target", FolderRef::Root, None)
            .await
            .unwrap();
        let mine = upload(&service, fx.alice, "mine.txt", None).await;
        let shared = upload(&service, fx.bob, "shared.txt", Some(team.id)).await;
        let private = upload(&service, fx.bob, "private.txt", None).await;

        let err = service
            .move_files(fx.alice, &[mine, shared], FolderRef::Folder(folder.id))
            .await
            .unwrap_err();
        assert!(matches!(err, CabinetError::PermissionDenied(_)));

        let err = service
            .move_files(fx.alice, &[mine, private], FolderRef::Folder(folder.id))
            .await
            .unwrap_err();
        assert!(matches!(err, CabinetError::NotFound(_)));

        assert_eq!(folder_of(&fx.db, mine).await, None);
    }

    #[tokio::test]
    async fn test_move_files_write_failure_rolls_back() {
        let fx = setup().await;
        let service = FileService::new(&fx.db, &fx.storage, &fx.gate);
        let folder = service
            .create_folder(fx.alice, "Target", FolderRef::Root, None)
            .await
            .unwrap();
        let a = upload(&service, fx.alice, "a.txt", None).await;
        let locked = upload(&service, fx.alice, "locked.txt", None).await;

        sqlx::raw_sql(
            "CREATE TRIGGER block_locked BEFORE UPDATE OF folder_id ON files
             WHEN NEW.name = 'locked.txt'
             BEGIN SELECT RAISE(ABORT, 'locked'); END;",
        )
        .execute(fx.db.pool())
        .await
        .unwrap();

        let err = service
            .move_files(fx.alice, &[a, locked], FolderRef::Folder(folder.id))
            .await
            .unwrap_err();

        assert!(matches!(err, CabinetError::TransactionFailure(_)));
        assert_eq!(folder_of(&fx.db, a).await, None);
        assert_eq!(folder_of(&fx.db, locked).await, None);
    }

    #[tokio::test]
    async fn test_move_files_target_checks() {
        let fx = setup().await;
        let service = FileService::new(&fx.db, &fx.storage, &fx.gate);
        let bobs_folder = service
            .create_folder(fx.bob, "Bob", FolderRef::Root, None)
            .await
            .unwrap();
        let a = upload(&service, fx.alice, "a.txt", None).await;

        let err = service
            .move_file(fx.alice, a, FolderRef::Folder(bobs_folder.id))
            .await
            .unwrap_err();
        assert!(matches!(err, CabinetError::NotFound(_)));

        let err = service
            .move_file(fx.alice, a, FolderRef::Folder(4242))
            .await
            .unwrap_err();
        assert!(matches!(err, CabinetError::NotFound(_)));
        assert_eq!(folder_of(&fx.db, a).await, None);
    }

    #[tokio::test]
    async fn test_move_into_shared_folder() {
        let fx = setup().await;
        let service = FileService::new(&fx.db, &fx.storage, &fx.gate);
        let groups = GroupRepository::new(fx.db.pool());
        let team = groups.create("Team").await.unwrap();
        groups.add_member(team.id, fx.alice).await.unwrap();
        groups.add_member(team.id, fx.bob).await.unwrap();

        let shared = service
            .create_folder(fx.bob, "Drop box", FolderRef::Root, Some(team.id))
            .await
            .unwrap();
        let a = upload(&service, fx.alice, "a.txt", None).await;

        service
            .move_file(fx.alice, a, FolderRef::Folder(shared.id))
            .await
            .unwrap();
        assert_eq!(folder_of(&fx.db, a).await, Some(shared.id));
    }

    #[tokio::test]
    async fn test_delete_files_all_or_nothing() {
        let fx = setup().await;
        let service = FileService::new(&fx.db, &fx.storage, &fx.gate);
        let a = upload(&service, fx.alice, "a.txt", None).await;
        let b = upload(&service, fx.alice, "b.txt", None).await;
        let theirs = upload(&service, fx.bob, "c.txt", None).await;

        let err = service
            .delete_files(fx.alice, &[a, b, theirs])
            .await
            .unwrap_err();
        assert!(matches!(err, CabinetError::NotFound(_)));
        assert_eq!(
            FileRepository::new(fx.db.pool()).list_by_owner(fx.alice).await.unwrap().len(),
            2
        );

        let stored_a = service.get_file(fx.alice, a).await.unwrap().stored_name;
        assert_eq!(service.delete_files(fx.alice, &[a, b]).await.unwrap(), 2);
        assert!(FileRepository::new(fx.db.pool())
            .list_by_owner(fx.alice)
            .await
            .unwrap()
            .is_empty());
        assert!(!fx.storage.exists(&stored_a));
    }
}
