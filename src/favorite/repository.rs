//! Favorite rows.

use sqlx::SqlitePool;

use super::EntityType;
use crate::Result;

/// Repository for favorite operations.
///
/// Reads go through the enriched queries in the service; cascade deletes go
/// through the folder sweep inside its transaction.
pub struct FavoriteRepository<'a> {
    pool: &'a SqlitePool,
}

impl<'a> FavoriteRepository<'a> {
    /// Create a new repository instance.
    pub fn new(pool: &'a SqlitePool) -> Self {
        Self { pool }
    }

    /// Add a favorite. Returns false if it already existed.
    pub async fn add(&self, user_id: i64, entity_id: i64, entity_type: EntityType) -> Result<bool> {
        let result = sqlx::query(
            "INSERT INTO favorites (user_id, entity_id, entity_type) VALUES (?, ?, ?)
             ON CONFLICT (user_id, entity_id, entity_type) DO NOTHING",
        )
        .bind(user_id)
        .bind(entity_id)
        .bind(entity_type.as_str())
        .execute(self.pool)
        .await?;
        Ok(result.rows_affected() > 0)
    }

    /// Remove a favorite. Returns false if there was nothing to remove.
    pub async fn remove(
        &self,
        user_id: i64,
        entity_id: i64,
        entity_type: EntityType,
    ) -> Result<bool> {
        let result = sqlx::query(
            "DELETE FROM favorites WHERE user_id = ? AND entity_id = ? AND entity_type = ?",
        )
        .bind(user_id)
        .bind(entity_id)
        .bind(entity_type.as_str())
        .execute(self.pool)
        .await?;
        Ok(result.rows_affected() > 0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Database;

    async fn count(db: &Database, user_id: i64) -> i64 {
        sqlx::query_scalar("SELECT COUNT(*) FROM favorites WHERE user_id = ?")
            .bind(user_id)
            .fetch_one(db.pool())
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn test_add_is_idempotent() {
        let db = Database::open_in_memory().await.unwrap();
        let repo = FavoriteRepository::new(db.pool());

        assert!(repo.add(1, 10, EntityType::File).await.unwrap());
        assert!(!repo.add(1, 10, EntityType::File).await.unwrap());
        assert!(repo.add(1, 10, EntityType::Folder).await.unwrap());

        assert_eq!(count(&db, 1).await, 2);
        assert_eq!(count(&db, 2).await, 0);
    }

    #[tokio::test]
    async fn test_remove() {
        let db = Database::open_in_memory().await.unwrap();
        let repo = FavoriteRepository::new(db.pool());

        assert!(!repo.remove(1, 10, EntityType::File).await.unwrap());
        repo.add(1, 10, EntityType::File).await.unwrap();
        repo.add(2, 10, EntityType::File).await.unwrap();

        assert!(repo.remove(1, 10, EntityType::File).await.unwrap());
        assert_eq!(count(&db, 1).await, 0);
        assert_eq!(count(&db, 2).await, 1);
    }
}
