//! Comparison of mirrored and upstream releases.

use crate::config::RedistConfig;
use crate::error::Result;
use crate::github::{Release, ReleaseApi, fetch_releases};
use std::collections::HashSet;
use tracing::debug;

/// Both release sets, deduplicated by identifier and sorted by it.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SyncReport {
    /// Releases of the downstream mirroring project.
    pub origin: Vec<Release>,
    /// Releases of the upstream project.
    pub upstream: Vec<Release>,
}

/// Materialises every published release of `repo` into a sorted, unique list.
///
/// # Errors
///
/// Returns the first error encountered while paging.
pub fn collect_releases(api: &dyn ReleaseApi, repo: &str) -> Result<Vec<Release>> {
    let unique: HashSet<Release> = fetch_releases(api, repo).collect::<Result<_>>()?;
    let mut releases: Vec<Release> = unique.into_iter().collect();
    releases.sort_by_key(|r| r.id);
    debug!(%repo, count = releases.len(), "Collected releases");
    Ok(releases)
}

/// Fetches the origin and upstream release sets.
///
/// Nothing is modified; deciding what to mirror is left to the caller.
///
/// # Errors
///
/// Returns an error if either listing fails.
pub fn sync(config: &RedistConfig, api: &dyn ReleaseApi) -> Result<SyncReport> {
    Ok(SyncReport {
        origin: collect_releases(api, &config.origin)?,
        upstream: collect_releases(api, &config.upstream)?,
    })
}
