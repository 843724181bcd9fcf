//! Process-wide store context built from [`Config`].

use tracing::info;

use crate::admin::AdminService;
use crate::auth::{build_directory, AccessGate};
use crate::config::Config;
use crate::db::Database;
use crate::favorite::FavoriteService;
use crate::file::{FileService, FileStorage};
use crate::Result;

/// The opened database, blob store and access gate, plus the configuration
/// the services are built with.
pub struct Cabinet {
    db: Database,
    storage: FileStorage,
    gate: AccessGate,
    config: Config,
}

impl Cabinet {
    /// Validate the configuration and open every backing resource.
    pub async fn open(config: Config) -> Result<Self> {
        config.validate()?;

        let db = Database::open(&config.database.path).await?;
        let storage = FileStorage::new(&config.storage.path)?;
        let gate = AccessGate::new(build_directory(&config.rbac, &db)?);

        info!(
            database = %config.database.path,
            storage = %storage.base_path().display(),
            rbac_mode = ?config.rbac.mode,
            "Cabinet opened"
        );

        Ok(Self {
            db,
            storage,
            gate,
            config,
        })
    }

    pub fn db(&self) -> &Database {
        &self.db
    }

    pub fn storage(&self) -> &FileStorage {
        &self.storage
    }

    pub fn gate(&self) -> &AccessGate {
        &self.gate
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// File service capped at `storage.max_file_size_mb`.
    pub fn files(&self) -> FileService<'_> {
        FileService::new(&self.db, &self.storage, &self.gate)
            .with_max_file_size(self.config.storage.max_file_size_bytes())
    }

    pub fn favorites(&self) -> FavoriteService<'_> {
        FavoriteService::new(&self.db, &self.gate)
    }

    /// Admin service using the `[admin]` limits and capability.
    pub fn admin(&self) -> AdminService<'_> {
        AdminService::with_config(&self.db, &self.gate, self.config.admin.clone())
    }

    pub async fn close(&self) {
        self.db.close().await;
    }
}
