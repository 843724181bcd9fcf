//! Subtree sweep used by cascade deletes.
//!
//! Descendants are found by walking `parent_id` links breadth-first with a
//! visited set, so the walk terminates even if the stored tree is malformed.

use std::collections::{HashSet, VecDeque};

use sqlx::{QueryBuilder, Sqlite, SqliteConnection};

use crate::favorite::EntityType;
use crate::Result;

/// Everything under (and including) a swept folder.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SweepResult {
    /// Folder IDs in breadth-first order, starting with the swept folder.
    pub folder_ids: Vec<i64>,
    /// Files inside any of those folders.
    pub file_ids: Vec<i64>,
    /// Blob keys of those files.
    pub stored_names: Vec<String>,
}

/// Most ids bound by one statement, well under SQLite's bound-parameter limit.
pub(crate) const ID_CHUNK_SIZE: usize = 500;

/// Append `(?, ?, ...)` binding every id. Callers pass at most
/// [`ID_CHUNK_SIZE`] ids.
pub(crate) fn push_id_list(query: &mut QueryBuilder<'_, Sqlite>, ids: &[i64]) {
    debug_assert!(ids.len() <= ID_CHUNK_SIZE);
    query.push("(");
    let mut separated = query.separated(", ");
    for id in ids {
        separated.push_bind(*id);
    }
    separated.push_unseparated(")");
}

/// Run `{sql_prefix}(...)` once per chunk of ids.
async fn delete_by_ids(
    conn: &mut SqliteConnection,
    sql_prefix: &str,
    ids: &[i64],
) -> Result<u64> {
    let mut deleted = 0;
    for chunk in ids.chunks(ID_CHUNK_SIZE) {
        let mut query = QueryBuilder::new(sql_prefix);
        push_id_list(&mut query, chunk);
        deleted += query.build().execute(&mut *conn).await?.rows_affected();
    }
    Ok(deleted)
}

/// Collect a folder and all of its descendants.
///
/// Runs on the given connection so callers can sweep inside a transaction.
pub async fn collect_subtree(conn: &mut SqliteConnection, root_id: i64) -> Result<SweepResult> {
    let mut sweep = SweepResult::default();
    let mut visited = HashSet::from([root_id]);
    let mut queue = VecDeque::from([root_id]);

    while let Some(folder_id) = queue.pop_front() {
        sweep.folder_ids.push(folder_id);

        let children: Vec<i64> = sqlx::query_scalar("SELECT id FROM folders WHERE parent_id = ?")
            .bind(folder_id)
            .fetch_all(&mut *conn)
            .await?;

        for child in children {
            if visited.insert(child) {
                queue.push_back(child);
            }
        }
    }

    let mut files: Vec<(i64, String)> = Vec::new();
    for chunk in sweep.folder_ids.chunks(ID_CHUNK_SIZE) {
        let mut query = QueryBuilder::new("SELECT id, stored_name FROM files WHERE folder_id IN ");
        push_id_list(&mut query, chunk);
        files.extend(
            query
                .build_query_as::<(i64, String)>()
                .fetch_all(&mut *conn)
                .await?,
        );
    }
    files.sort_unstable_by_key(|(id, _)| *id);

    for (id, stored_name) in files {
        sweep.file_ids.push(id);
        sweep.stored_names.push(stored_name);
    }

    Ok(sweep)
}

/// Delete favorite rows pointing at any of the given entries.
pub(crate) async fn delete_favorites(
    conn: &mut SqliteConnection,
    entity_type: EntityType,
    ids: &[i64],
) -> Result<u64> {
    let mut deleted = 0;
    for chunk in ids.chunks(ID_CHUNK_SIZE) {
        let mut query = QueryBuilder::new("DELETE FROM favorites WHERE entity_type = ");
        query.push_bind(entity_type.as_str());
        query.push(" AND entity_id IN ");
        push_id_list(&mut query, chunk);
        deleted += query.build().execute(&mut *conn).await?.rows_affected();
    }
    Ok(deleted)
}

/// Delete file rows by id.
pub(crate) async fn delete_file_rows(conn: &mut SqliteConnection, ids: &[i64]) -> Result<u64> {
    delete_by_ids(conn, "DELETE FROM files WHERE id IN ", ids).await
}

/// Remove every row covered by a sweep: favorites, then files, then folders.
///
/// Foreign keys are deferred to commit, so folders can go in any chunk order
/// even when a parent and its children land in different statements. The
/// caller must hold a transaction.
pub(crate) async fn delete_subtree(conn: &mut SqliteConnection, sweep: &SweepResult) -> Result<()> {
    sqlx::query("PRAGMA defer_foreign_keys = ON")
        .execute(&mut *conn)
        .await?;

    delete_favorites(conn, EntityType::File, &sweep.file_ids).await?;
    delete_favorites(conn, EntityType::Folder, &sweep.folder_ids).await?;
    delete_file_rows(conn, &sweep.file_ids).await?;
    delete_by_ids(conn, "DELETE FROM folders WHERE id IN ", &sweep.folder_ids).await?;
    Ok(())
}
