//! Batch operation tests for Cabinet.
//!
//! Moves and deletes over several files either apply to all of them or to
//! none.

mod common;

use cabinet::file::{FileRepository, FolderRef};
use cabinet::CabinetError;
use common::TestEnv;

/// Snapshot of every file's location.
async fn locations(env: &TestEnv) -> Vec<(i64, Option<i64>)> {
    FileRepository::new(env.db.pool())
        .list_all()
        .await
        .unwrap()
        .into_iter()
        .map(|f| (f.id, f.folder_id))
        .collect()
}

#[tokio::test]
async fn test_move_all_valid() {
    let env = TestEnv::new().await;
    let alice = env.user("alice@example.com").await;
    let target = env.folder(alice, "Archive", FolderRef::Root).await;

    let mut ids = Vec::new();
    for i in 0..5 {
        ids.push(env.upload(alice, &format!("f{i}.txt"), 4, FolderRef::Root).await.id);
    }

    let moved = env
        .files()
        .move_files(alice, &ids, FolderRef::Folder(target.id))
        .await
        .unwrap();
    assert_eq!(moved, 5);
    assert!(locations(&env)
        .await
        .iter()
        .all(|(_, folder)| *folder == Some(target.id)));
}

#[tokio::test]
async fn test_move_with_one_foreign_file_moves_nothing() {
    let env = TestEnv::new().await;
    let alice = env.user("alice@example.com").await;
    let bob = env.user("bob@example.com").await;
    let target = env.folder(alice, "Archive", FolderRef::Root).await;

    let mut ids = Vec::new();
    for i in 0..4 {
        ids.push(env.upload(alice, &format!("f{i}.txt"), 4, FolderRef::Root).await.id);
    }
    ids.push(env.upload(bob, "bob.txt", 4, FolderRef::Root).await.id);

    let before = locations(&env).await;
    let err = env
        .files()
        .move_files(alice, &ids, FolderRef::Folder(target.id))
        .await
        .unwrap_err();
    assert!(matches!(err, CabinetError::NotFound(_)));
    assert_eq!(locations(&env).await, before);
}

#[tokio::test]
async fn test_move_with_missing_file_moves_nothing() {
    let env = TestEnv::new().await;
    let alice = env.user("alice@example.com").await;
    let target = env.folder(alice, "Archive", FolderRef::Root).await;

    let a = env.upload(alice, "a.txt", 1, FolderRef::Root).await;
    let b = env.upload(alice, "b.txt", 1, FolderRef::Root).await;

    let before = locations(&env).await;
    let result = env
        .files()
        .move_files(alice, &[a.id, b.id, 424242], FolderRef::Folder(target.id))
        .await;
    assert!(result.is_err());
    assert_eq!(locations(&env).await, before);
}

#[tokio::test]
async fn test_move_into_invisible_folder_rejected() {
    let env = TestEnv::new().await;
    let alice = env.user("alice@example.com").await;
    let bob = env.user("bob@example.com").await;
    let bobs = env.folder(bob, "Private", FolderRef::Root).await;
    let file = env.upload(alice, "a.txt", 1, FolderRef::Root).await;

    let err = env
        .files()
        .move_files(alice, &[file.id], FolderRef::Folder(bobs.id))
        .await
        .unwrap_err();
    assert!(matches!(err, CabinetError::NotFound(_)));
    assert!(env
        .files()
        .get_file(alice, file.id)
        .await
        .unwrap()
        .folder_id
        .is_none());
}

#[tokio::test]
async fn test_empty_and_duplicate_ids() {
    let env = TestEnv::new().await;
    let alice = env.user("alice@example.com").await;
    let file = env.upload(alice, "a.txt", 1, FolderRef::Root).await;
    let target = env.folder(alice, "T", FolderRef::Root).await;

    assert_eq!(env.files().move_files(alice, &[], FolderRef::Root).await.unwrap(), 0);
    let moved = env
        .files()
        .move_files(alice, &[file.id, file.id], FolderRef::Folder(target.id))
        .await
        .unwrap();
    assert_eq!(moved, 1);
}

#[tokio::test]
async fn test_batch_delete_is_all_or_nothing() {
    let env = TestEnv::new().await;
    let alice = env.user("alice@example.com").await;
    let bob = env.user("bob@example.com").await;

    let a = env.upload(alice, "a.txt", 3, FolderRef::Root).await;
    let b = env.upload(alice, "b.txt", 3, FolderRef::Root).await;
    let foreign = env.upload(bob, "c.txt", 3, FolderRef::Root).await;

    let result = env.files().delete_files(alice, &[a.id, b.id, foreign.id]).await;
    assert!(result.is_err());
    assert_eq!(locations(&env).await.len(), 3);
    assert!(env.storage.exists(&a.stored_name));

    let deleted = env.files().delete_files(alice, &[a.id, b.id]).await.unwrap();
    assert_eq!(deleted, 2);
    assert_eq!(locations(&env).await, vec![(foreign.id, None)]);
    assert!(!env.storage.exists(&a.stored_name));
    assert!(!env.storage.exists(&b.stored_name));
}

/// Insert `count` root-level file rows for `owner` and return their ids.
async fn bulk_files(env: &TestEnv, owner: i64, count: i64) -> Vec<i64> {
    sqlx::query(
        "WITH RECURSIVE n(i) AS (SELECT 1 UNION ALL SELECT i + 1 FROM n WHERE i < ?)
         INSERT INTO files (owner_id, name, stored_name, size)
         SELECT ?, 'bulk' || i || '.txt', 'bulk' || i, 1 FROM n",
    )
    .bind(count)
    .bind(owner)
    .execute(env.db.pool())
    .await
    .unwrap();

    sqlx::query_scalar("SELECT id FROM files WHERE owner_id = ? ORDER BY id")
        .bind(owner)
        .fetch_all(env.db.pool())
        .await
        .unwrap()
}

#[tokio::test]
async fn test_batches_beyond_sqlite_parameter_limit() {
    let env = TestEnv::new().await;
    let alice = env.user("alice@example.com").await;
    let target = env.folder(alice, "Archive", FolderRef::Root).await;
    let ids = bulk_files(&env, alice, 40_000).await;
    assert_eq!(ids.len(), 40_000);

    let moved = env
        .files()
        .move_files(alice, &ids, FolderRef::Folder(target.id))
        .await
        .unwrap();
    assert_eq!(moved, 40_000);
    let in_target: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM files WHERE folder_id = ?")
        .bind(target.id)
        .fetch_one(env.db.pool())
        .await
        .unwrap();
    assert_eq!(in_target, 40_000);

    let deleted = env.files().delete_files(alice, &ids).await.unwrap();
    assert_eq!(deleted, 40_000);
    assert!(locations(&env).await.is_empty());
}

#[tokio::test]
async fn test_failure_in_late_chunk_rolls_back_earlier_chunks() {
    let env = TestEnv::new().await;
    let alice = env.user("alice@example.com").await;
    let target = env.folder(alice, "Archive", FolderRef::Root).await;
    let ids = bulk_files(&env, alice, 2_000).await;
    let last = ids[ids.len() - 1];

    sqlx::raw_sql(&format!(
        "CREATE TRIGGER block_last BEFORE UPDATE OF folder_id ON files
         WHEN NEW.id = {last}
         BEGIN SELECT RAISE(ABORT, 'blocked'); END;"
    ))
    .execute(env.db.pool())
    .await
    .unwrap();

    let err = env
        .files()
        .move_files(alice, &ids, FolderRef::Folder(target.id))
        .await
        .unwrap_err();
    assert!(matches!(err, CabinetError::TransactionFailure(_)));
    assert!(locations(&env).await.iter().all(|(_, folder)| folder.is_none()));
}
