//! Caching wrapper around any [`AccessDirectory`].

use std::collections::HashSet;
use std::time::Duration;

use async_trait::async_trait;
use tokio::time::timeout;
use tracing::{debug, warn};

use super::cache::TtlCache;
use super::directory::AccessDirectory;
use crate::config::RbacConfig;
use crate::Result;

/// Serves directory answers from a [`TtlCache`], re-fetching on miss.
///
/// A re-fetch is bounded by `fetch_timeout`. Timeouts and errors from the
/// inner directory resolve to a denial (`false`, or an empty group set) and
/// are not cached, so the next call tries again.
pub struct CachedDirectory<D> {
    inner: D,
    permissions: TtlCache<(i64, String), bool>,
    groups: TtlCache<i64, HashSet<i64>>,
    fetch_timeout: Duration,
}

impl<D: AccessDirectory> CachedDirectory<D> {
    /// Wrap a directory with explicit TTL and fetch bound.
    pub fn new(inner: D, ttl: Duration, fetch_timeout: Duration) -> Self {
        Self {
            inner,
            permissions: TtlCache::new(ttl),
            groups: TtlCache::new(ttl),
            fetch_timeout,
        }
    }

    /// Wrap a directory using the `[rbac]` config section.
    pub fn from_config(inner: D, config: &RbacConfig) -> Self {
        Self::new(
            inner,
            Duration::from_secs(config.cache_ttl_secs),
            Duration::from_secs(config.fetch_timeout_secs),
        )
    }
}

/// Drop expired entries before storing a fresh answer so keys of users who
/// stopped calling do not accumulate.
fn purge_stale<K: Eq + std::hash::Hash, V: Clone>(cache: &TtlCache<K, V>, what: &str) {
    let purged = cache.purge_expired();
    if purged > 0 {
        debug!(cache = what, purged, remaining = cache.len(), "Purged expired entries");
    }
}

#[async_trait]
impl<D: AccessDirectory> AccessDirectory for CachedDirectory<D> {
    async fn has_permission(&self, user_id: i64, permission: &str) -> Result<bool> {
        let key = (user_id, permission.to_string());
        if let Some(granted) = self.permissions.get(&key) {
            return Ok(granted);
        }

        match timeout(
            self.fetch_timeout,
            self.inner.has_permission(user_id, permission),
        )
        .await
        {
            Ok(Ok(granted)) => {
                debug!(user_id, permission, granted, "Refreshed permission");
                purge_stale(&self.permissions, "permissions");
                self.permissions.insert(key, granted);
                Ok(granted)
            }
            Ok(Err(e)) => {
                warn!(user_id, permission, error = %e, "Permission fetch failed, denying");
                Ok(false)
            }
            Err(_) => {
                warn!(
                    user_id,
                    permission,
                    timeout_secs = self.fetch_timeout.as_secs_f64(),
                    "Permission fetch timed out, denying"
                );
                Ok(false)
            }
        }
    }

    async fn user_groups(&self, user_id: i64) -> Result<HashSet<i64>> {
        if let Some(groups) = self.groups.get(&user_id) {
            return Ok(groups);
        }

        match timeout(self.fetch_timeout, self.inner.user_groups(user_id)).await {
            Ok(Ok(groups)) => {
                debug!(user_id, count = groups.len(), "Refreshed group membership");
                purge_stale(&self.groups, "groups");
                self.groups.insert(user_id, groups.clone());
                Ok(groups)
            }
            Ok(Err(e)) => {
                warn!(user_id, error = %e, "Group fetch failed, treating as no groups");
                Ok(HashSet::new())
            }
            Err(_) => {
                warn!(user_id, "Group fetch timed out, treating as no groups");
                Ok(HashSet::new())
            }
        }
    }
}
