//! Access predicates evaluated before every read or write.

use std::collections::HashSet;
use std::sync::Arc;

use tracing::warn;

use super::directory::AccessDirectory;
use crate::{CabinetError, Result};

/// Anything with an owner and an optional sharing group.
pub trait Entry {
    fn owner_id(&self) -> i64;
    fn group_id(&self) -> Option<i64>;
}

/// The caller's identity together with their group memberships.
///
/// Resolved once per listing so that filtering many entries costs a single
/// directory lookup.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Viewer {
    pub user_id: i64,
    pub groups: HashSet<i64>,
}

impl Viewer {
    /// Same rule as [`AccessGate::can_access`] against pre-resolved groups.
    pub fn can_access<E: Entry + ?Sized>(&self, entry: &E) -> bool {
        entry.owner_id() == self.user_id
            || entry
                .group_id()
                .is_some_and(|group| self.groups.contains(&group))
    }

    pub fn is_member(&self, group_id: i64) -> bool {
        self.groups.contains(&group_id)
    }
}

/// Central home for every ownership, membership and capability check.
///
/// Holds no state of its own; membership and capabilities come from the
/// directory on every call.
#[derive(Clone)]
pub struct AccessGate {
    directory: Arc<dyn AccessDirectory>,
}

impl AccessGate {
    /// Create a gate over the given directory.
    pub fn new(directory: Arc<dyn AccessDirectory>) -> Self {
        Self { directory }
    }

    /// The directory this gate consults.
    pub fn directory(&self) -> &Arc<dyn AccessDirectory> {
        &self.directory
    }

    /// Owner, or member of the entry's group.
    pub async fn can_access<E: Entry + ?Sized>(&self, user_id: i64, entry: &E) -> bool {
        if entry.owner_id() == user_id {
            return true;
        }
        match entry.group_id() {
            Some(group_id) => self.is_member(user_id, group_id).await,
            None => false,
        }
    }

    /// Owner only. Group membership never grants mutation.
    pub fn can_modify<E: Entry + ?Sized>(&self, user_id: i64, entry: &E) -> bool {
        entry.owner_id() == user_id
    }

    /// Directory errors count as "not a member".
    pub async fn is_member(&self, user_id: i64, group_id: i64) -> bool {
        self.user_groups(user_id).await.contains(&group_id)
    }

    /// Groups of the user, empty when the directory fails.
    pub async fn user_groups(&self, user_id: i64) -> HashSet<i64> {
        match self.directory.user_groups(user_id).await {
            Ok(groups) => groups,
            Err(e) => {
                warn!(user_id, error = %e, "Group lookup failed, denying group access");
                HashSet::new()
            }
        }
    }

    /// Resolve the caller's memberships for bulk filtering.
    pub async fn viewer(&self, user_id: i64) -> Viewer {
        Viewer {
            user_id,
            groups: self.user_groups(user_id).await,
        }
    }

    /// Directory errors count as "not granted".
    pub async fn has_capability(&self, user_id: i64, permission: &str) -> bool {
        match self.directory.has_permission(user_id, permission).await {
            Ok(granted) => granted,
            Err(e) => {
                warn!(user_id, permission, error = %e, "Capability lookup failed, denying");
                false
            }
        }
    }

    /// `NotFound` unless the entry is visible to the user.
    pub async fn ensure_visible<E: Entry + ?Sized>(
        &self,
        user_id: i64,
        entry: &E,
        what: &str,
    ) -> Result<()> {
        if self.can_access(user_id, entry).await {
            Ok(())
        } else {
            Err(CabinetError::NotFound(what.to_string()))
        }
    }

    /// `PermissionDenied` unless the user owns the entry.
    pub fn ensure_owner<E: Entry + ?Sized>(&self, user_id: i64, entry: &E, what: &str) -> Result<()> {
        if self.can_modify(user_id, entry) {
            Ok(())
        } else {
            Err(CabinetError::PermissionDenied(format!(
                "only the owner can modify this {what}"
            )))
        }
    }

    /// `PermissionDenied` unless the user holds the capability.
    pub async fn ensure_capability(&self, user_id: i64, permission: &str) -> Result<()> {
        if self.has_capability(user_id, permission).await {
            Ok(())
        } else {
            Err(CabinetError::PermissionDenied(format!(
                "missing capability {permission}"
            )))
        }
    }
}

impl std::fmt::Debug for AccessGate {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AccessGate").finish_non_exhaustive()
    }
}
