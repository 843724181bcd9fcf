//! System-wide storage statistics.

use std::collections::HashMap;

use serde::Serialize;

use crate::file::extension_of;

/// Histogram bucket for names without an extension.
pub const NO_EXTENSION: &str = "no_extension";

/// Count of files sharing one extension.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ExtensionCount {
    pub extension: String,
    pub count: i64,
}

/// Aggregate bytes stored by one user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, sqlx::FromRow)]
pub struct UserStorage {
    pub user_id: i64,
    pub email: Option<String>,
    pub storage_bytes: i64,
}

/// Point-in-time snapshot of the whole store.
#[derive(Debug, Clone, Serialize)]
pub struct SystemStats {
    pub total_users: i64,
    pub total_files: i64,
    pub total_folders: i64,
    pub total_bytes: i64,
    /// Most common extensions, count descending.
    pub extensions: Vec<ExtensionCount>,
    /// Largest consumers, bytes descending.
    pub top_users: Vec<UserStorage>,
}

/// Bucket file names by lowercase extension and keep the `limit` largest.
///
/// Ties are broken by extension so the output is stable.
pub(crate) fn extension_histogram<'a, I>(names: I, limit: usize) -> Vec<ExtensionCount>
where
    I: IntoIterator<Item = &'a str>,
{
    let mut counts: HashMap<String, i64> = HashMap::new();
    for name in names {
        let extension = extension_of(name)
            .filter(|ext| !ext.is_empty())
            .unwrap_or_else(|| NO_EXTENSION.to_string());
        *counts.entry(extension).or_default() += 1;
    }

    let mut histogram: Vec<ExtensionCount> = counts
        .into_iter()
        .map(|(extension, count)| ExtensionCount { extension, count })
        .collect();
    histogram.sort_by(|a, b| b.count.cmp(&a.count).then_with(|| a.extension.cmp(&b.extension)));
    histogram.truncate(limit);
    histogram
}
