//! Access control for Cabinet.
//!
//! This module provides:
//! - The [`AccessGate`] predicates (`can_access`, `can_modify`, capabilities)
//! - The [`AccessDirectory`] collaborator answering membership and capability
//!   questions, with local, remote and cached implementations

mod cache;
mod cached;
mod directory;
mod gate;
mod remote;

use std::sync::Arc;

use tracing::info;

pub use cache::TtlCache;
pub use cached::CachedDirectory;
pub use directory::{AccessDirectory, SqlDirectory};
pub use gate::{AccessGate, Entry, Viewer};
pub use remote::RemoteDirectory;

use crate::config::{RbacConfig, RbacMode};
use crate::db::Database;
use crate::Result;

/// Build the directory selected by the `[rbac]` config section.
///
/// Local mode reads the database directly on every call. Remote mode goes
/// through a [`CachedDirectory`] so the auth service is asked at most once
/// per TTL and a slow service cannot stall the caller past the fetch bound.
pub fn build_directory(config: &RbacConfig, db: &Database) -> Result<Arc<dyn AccessDirectory>> {
    match config.mode {
        RbacMode::Local => {
            info!("Using local RBAC tables");
            Ok(Arc::new(SqlDirectory::new(db)))
        }
        RbacMode::Remote => {
            info!(
                base_url = %config.base_url,
                ttl_secs = config.cache_ttl_secs,
                "Using remote RBAC service"
            );
            let remote = RemoteDirectory::from_config(config)?;
            Ok(Arc::new(CachedDirectory::from_config(remote, config)))
        }
    }
}
