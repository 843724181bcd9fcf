//! Per-user favorites over files and folders.
//!
//! A favorite is a viewer's private flag on an entry they can access. It
//! does not imply ownership and disappears with the entry it points at.

mod repository;
mod service;

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

pub use repository::FavoriteRepository;
pub use service::{FavoriteEntry, FavoriteService};

/// Kind of entry a favorite points at.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EntityType {
    File,
    Folder,
}

impl EntityType {
    /// Convert to the database string representation.
    pub fn as_str(&self) -> &'static str {
        match self {
            EntityType::File => "file",
            EntityType::Folder => "folder",
        }
    }
}

impl fmt::Display for EntityType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for EntityType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "file" => Ok(EntityType::File),
            "folder" => Ok(EntityType::Folder),
            _ => Err(format!("unknown entity type: {s}")),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_entity_type_strings() {
        assert_eq!(EntityType::File.as_str(), "file");
        assert_eq!(EntityType::Folder.to_string(), "folder");
        assert_eq!("FILE".parse::<EntityType>().unwrap(), EntityType::File);
        assert_eq!("folder".parse::<EntityType>().unwrap(), EntityType::Folder);
        assert!("link".parse::<EntityType>().is_err());
    }

    #[test]
    fn test_entity_type_serde() {
        assert_eq!(serde_json::to_string(&EntityType::File).unwrap(), "\"file\"");
        let parsed: EntityType = serde_json::from_str("\"folder\"").unwrap();
        assert_eq!(parsed, EntityType::Folder);
    }
}
