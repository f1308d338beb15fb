//! Removal of inspection caches that are no longer needed

use crate::cache::{CachedDownload, InspectionCache, cached_downloads};
use crate::error::Result;
use crate::host::HostApi;
use crate::types::DownloadId;
use std::collections::HashSet;
use std::path::Path;
use tracing::{debug, error, info};

/// What a cleanup pass removed
#[derive(Debug, Default, PartialEq, Eq)]
pub struct CleanupReport {
    /// Downloads whose cache file was deleted
    pub removed: Vec<DownloadId>,
    /// Cache files left in place
    pub kept: usize,
}

/// Delete caches of downloads that left the queue, plus the finished one
///
/// The finished download's cache is removed first, without asking the host.
/// The host is only asked for its active downloads when more than one cache
/// file exists; a lone file belongs to the download being processed. Deletion
/// failures are logged and do not stop the pass.
///
/// # Errors
/// Returns error if the cache directory cannot be read or the host query fails
pub async fn cleanup_caches(
    host: &dyn HostApi,
    root: &Path,
    finished: Option<DownloadId>,
) -> Result<CleanupReport> {
    let cached = cached_downloads(root)?;
    let mut report = CleanupReport::default();

    if cached.is_empty() {
        debug!(?root, "no inspection caches to clean up");
        return Ok(report);
    }

    let query_host = cached.len() > 1;
    let (done, others): (Vec<_>, Vec<_>) = cached
        .into_iter()
        .partition(|entry| finished == Some(entry.download_id));

    for entry in &done {
        remove_cache(root, entry, &mut report);
    }

    if query_host && !others.is_empty() {
        let active: HashSet<DownloadId> = host.active_downloads().await?.into_iter().collect();
        for entry in &others {
            if active.contains(&entry.download_id) {
                report.kept += 1;
            } else {
                remove_cache(root, entry, &mut report);
            }
        }
    } else {
        report.kept += others.len();
    }

    if !report.removed.is_empty() {
        info!(
            removed = report.removed.len(),
            kept = report.kept,
            "cleaned up inspection caches"
        );
    }
    Ok(report)
}

fn remove_cache(root: &Path, entry: &CachedDownload, report: &mut CleanupReport) {
    match InspectionCache::new(root, entry.download_id).remove() {
        Ok(_) => {
            debug!(
                download_id = entry.download_id.get(),
                path = ?entry.path,
                "removed inspection cache"
            );
            report.removed.push(entry.download_id);
        }
        Err(e) => {
            error!(path = ?entry.path, error = %e, "Could not delete inspection cache");
            report.kept += 1;
        }
    }
}
