//! Favorite toggling and the enriched favorites listing.

use serde::Serialize;
use sqlx::FromRow;
use tracing::{debug, info, warn};

use super::{EntityType, FavoriteRepository};
use crate::auth::{AccessGate, Entry};
use crate::db::Database;
use crate::file::{FileRepository, FolderRepository};
use crate::{CabinetError, Result};

/// One favorited entry as shown to its user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, FromRow)]
pub struct FavoriteEntry {
    pub entity_id: i64,
    #[sqlx(skip)]
    pub entity_type: Option<EntityType>,
    pub name: String,
    pub owner_id: i64,
    pub owner_email: Option<String>,
    pub group_id: Option<i64>,
    pub group_name: Option<String>,
    /// Byte size, files only.
    pub size: Option<i64>,
    /// Containing folder, None at the owner's root.
    pub location: Option<i64>,
    #[sqlx(skip)]
    pub can_modify: bool,
    pub favorited_at: String,
}

impl Entry for FavoriteEntry {
    fn owner_id(&self) -> i64 {
        self.owner_id
    }

    fn group_id(&self) -> Option<i64> {
        self.group_id
    }
}

const FILE_FAVORITES: &str = "SELECT fav.entity_id, f.name, f.owner_id, u.email AS owner_email,
        f.group_id, g.name AS group_name, f.size AS size, f.folder_id AS location,
        fav.created_at AS favorited_at
    FROM favorites fav
    JOIN files f ON f.id = fav.entity_id
    LEFT JOIN users u ON u.id = f.owner_id
    LEFT JOIN groups g ON g.id = f.group_id
    WHERE fav.user_id = ? AND fav.entity_type = 'file'
    ORDER BY fav.created_at DESC, fav.entity_id";

const FOLDER_FAVORITES: &str = "SELECT fav.entity_id, d.name, d.owner_id, u.email AS owner_email,
        d.group_id, g.name AS group_name, NULL AS size, d.parent_id AS location,
        fav.created_at AS favorited_at
    FROM favorites fav
    JOIN folders d ON d.id = fav.entity_id
    LEFT JOIN users u ON u.id = d.owner_id
    LEFT JOIN groups g ON g.id = d.group_id
    WHERE fav.user_id = ? AND fav.entity_type = 'folder'
    ORDER BY fav.created_at DESC, fav.entity_id";

/// Per-user favorites over entries the user can access.
pub struct FavoriteService<'a> {
    db: &'a Database,
    gate: &'a AccessGate,
}

impl<'a> FavoriteService<'a> {
    pub fn new(db: &'a Database, gate: &'a AccessGate) -> Self {
        Self { db, gate }
    }

    /// Set or clear the user's favorite flag on an entry.
    ///
    /// The entry must exist and be accessible, otherwise `NotFound`.
    /// Returns whether a row was added or removed.
    pub async fn toggle_favorite(
        &self,
        user_id: i64,
        entity_id: i64,
        entity_type: EntityType,
        favorite: bool,
    ) -> Result<bool> {
        self.ensure_accessible(user_id, entity_id, entity_type).await?;

        let repo = FavoriteRepository::new(self.db.pool());
        let changed = if favorite {
            repo.add(user_id, entity_id, entity_type).await?
        } else {
            repo.remove(user_id, entity_id, entity_type).await?
        };

        if changed {
            info!(user_id, entity_id, entity_type = %entity_type, favorite, "Toggled favorite");
        }
        Ok(changed)
    }

    async fn ensure_accessible(
        &self,
        user_id: i64,
        entity_id: i64,
        entity_type: EntityType,
    ) -> Result<()> {
        match entity_type {
            EntityType::File => {
                let file = FileRepository::new(self.db.pool())
                    .get_by_id(entity_id)
                    .await?
                    .ok_or_else(|| CabinetError::NotFound("file".to_string()))?;
                self.gate.ensure_visible(user_id, &file, "file").await
            }
            EntityType::Folder => {
                let folder = FolderRepository::new(self.db.pool())
                    .get_by_id(entity_id)
                    .await?
                    .ok_or_else(|| CabinetError::NotFound("folder".to_string()))?;
                self.gate.ensure_visible(user_id, &folder, "folder").await
            }
        }
    }

    /// Favorited entries the user can still access, folders first.
    ///
    /// Rows pointing at entries that are gone or no longer accessible are
    /// left out of the result and pruned.
    pub async fn list_favorites(&self, user_id: i64) -> Result<Vec<FavoriteEntry>> {
        let viewer = self.gate.viewer(user_id).await;
        let pool = self.db.pool();

        let mut entries = Vec::new();
        let mut stale = Vec::new();
        for (entity_type, sql) in [
            (EntityType::Folder, FOLDER_FAVORITES),
            (EntityType::File, FILE_FAVORITES),
        ] {
            let rows = sqlx::query_as::<_, FavoriteEntry>(sql)
                .bind(user_id)
                .fetch_all(pool)
                .await?;
            for mut row in rows {
                if viewer.can_access(&row) {
                    row.entity_type = Some(entity_type);
                    row.can_modify = self.gate.can_modify(user_id, &row);
                    entries.push(row);
                } else {
                    stale.push((row.entity_id, entity_type));
                }
            }
        }

        self.prune(user_id, &stale).await;
        debug!(user_id, count = entries.len(), "Listed favorites");
        Ok(entries)
    }

    async fn prune(&self, user_id: i64, stale: &[(i64, EntityType)]) {
        let pool = self.db.pool();
        let repo = FavoriteRepository::new(pool);
        for (entity_id, entity_type) in stale {
            if let Err(e) = repo.remove(user_id, *entity_id, *entity_type).await {
                warn!(user_id, entity_id, error = %e, "Failed to prune favorite");
            }
        }

        let orphaned = sqlx::query(
            "DELETE FROM favorites WHERE user_id = ? AND (
                (entity_type = 'file' AND entity_id NOT IN (SELECT id FROM files))
                OR (entity_type = 'folder' AND entity_id NOT IN (SELECT id FROM folders)))",
        )
        .bind(user_id)
        .execute(pool)
        .await;
        match orphaned {
            Ok(result) if result.rows_affected() > 0 => {
                debug!(user_id, pruned = result.rows_affected(), "Pruned orphaned favorites");
            }
            Ok(_) => {}
            Err(e) => warn!(user_id, error = %e, "Failed to prune orphaned favorites"),
        }
    }
}
