//! Blob storage for file payloads.
//!
//! Payloads are opaque bytes stored under random UUID keys. Keys are sharded
//! into subdirectories by their first two characters:
//!
//! ```text
//! {base_path}/
//! ├── 3f/
//! │   └── 3fa85f6457174562b3fc2c963f66afa6
//! └── c0/
//!     └── c0ffee00d0d04e2aa2c0b5f0c1e2d3f4
//! ```

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use tracing::debug;
use uuid::Uuid;

use crate::{CabinetError, Result};

/// Filesystem-backed blob store.
#[derive(Debug, Clone)]
pub struct FileStorage {
    base_path: PathBuf,
}

impl FileStorage {
    /// Open a store rooted at `base_path`, creating the directory if needed.
    pub fn new(base_path: impl Into<PathBuf>) -> Result<Self> {
        let base_path = base_path.into();
        fs::create_dir_all(&base_path)?;
        Ok(Self { base_path })
    }

    pub fn base_path(&self) -> &Path {
        &self.base_path
    }

    /// Store a payload under a fresh key and return the key.
    pub fn save(&self, content: &[u8]) -> Result<String> {
        let key = Self::generate_key();
        let path = self.path_for(&key)?;
        if let Some(shard) = path.parent() {
            fs::create_dir_all(shard)?;
        }
        fs::write(&path, content)?;
        debug!(key = %key, bytes = content.len(), "Stored blob");
        Ok(key)
    }

    /// Read a payload back.
    pub fn load(&self, key: &str) -> Result<Vec<u8>> {
        match fs::read(self.path_for(key)?) {
            Ok(content) => Ok(content),
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                Err(CabinetError::NotFound(format!("blob {key}")))
            }
            Err(e) => Err(e.into()),
        }
    }

    /// Remove a payload. Returns false if it was already gone.
    pub fn delete(&self, key: &str) -> Result<bool> {
        match fs::remove_file(self.path_for(key)?) {
            Ok(()) => Ok(true),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(false),
            Err(e) => Err(e.into()),
        }
    }

    pub fn exists(&self, key: &str) -> bool {
        self.path_for(key).map(|p| p.exists()).unwrap_or(false)
    }

    /// On-disk location of a key.
    ///
    /// Only keys shaped like the ones `save` produces are accepted, which
    /// keeps callers from addressing paths outside the store.
    pub fn path_for(&self, key: &str) -> Result<PathBuf> {
        if key.len() < 2 || !key.chars().all(|c| c.is_ascii_alphanumeric() || c == '-') {
            return Err(CabinetError::InvalidInput(format!("invalid blob key {key:?}")));
        }
        Ok(self.base_path.join(&key[..2]).join(key))
    }

    fn generate_key() -> String {
        Uuid::new_v4().simple().to_string()
    }
}
