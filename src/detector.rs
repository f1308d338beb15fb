//! Fake detection over a download directory
//!
//! A download is considered fake when it contains media files *and*
//! executables, or any file with a banned extension. The check runs both
//! during download (queue events, where only archive listings reveal the
//! content) and after unpack (post-processing, where the files are on disk), so
//! it always combines both sources:
//!
//! 1. plain files directly in the download directory
//! 2. members of the archives in that directory
//! 3. members of the archives in each immediate sub-directory
//!
//! The verdict itself is not stored; only the archive listing work is cached.

use crate::cache::{CacheGuard, InspectionCache};
use crate::classify::Classifier;
use crate::config::DetectionConfig;
use crate::error::Result;
use crate::listing::{ArchiveLister, scan_directory};
use std::path::Path;
use std::sync::Arc;
use tracing::{debug, error, warn};

/// Decides whether a download directory looks like a fake
pub struct FakeDetector {
    classifier: Classifier,
    lister: Arc<dyn ArchiveLister>,
    cache: InspectionCache,
}

impl FakeDetector {
    /// Create a detector for one download
    pub fn new(
        config: &DetectionConfig,
        lister: Arc<dyn ArchiveLister>,
        cache: InspectionCache,
    ) -> Self {
        Self {
            classifier: Classifier::new(config),
            lister,
            cache,
        }
    }

    /// Build the filename collection for `dir`
    ///
    /// Archives already listed by an earlier invocation are not listed again,
    /// so their members are missing from the result; this is fine because an
    /// earlier invocation already saw them and would have flagged the download.
    pub async fn collect_names(&self, dir: &Path) -> Result<Vec<String>> {
        let mut names = Vec::new();
        let mut subdirs = Vec::new();

        for entry in std::fs::read_dir(dir)? {
            let path = entry?.path();
            if path.is_file() {
                if let Some(name) = path.file_name() {
                    names.push(name.to_string_lossy().into_owned());
                }
            } else if path.is_dir() {
                subdirs.push(path);
            }
        }
        subdirs.sort();

        let mut cache = self.cache.open()?;
        if self.list_into(&mut cache, dir, dir, &mut names).await? {
            for subdir in &subdirs {
                if !self.list_into(&mut cache, dir, subdir, &mut names).await? {
                    break;
                }
            }
        }

        Ok(names)
    }

    /// List new archives of `dir`; returns false once listing is impossible
    async fn list_into(
        &self,
        cache: &mut CacheGuard,
        base: &Path,
        dir: &Path,
        names: &mut Vec<String>,
    ) -> Result<bool> {
        let report = scan_directory(self.lister.as_ref(), cache, base, dir).await?;
        debug!(
            ?dir,
            examined = report.examined,
            failed = report.failed,
            members = report.members.len(),
            "scanned directory"
        );
        names.extend(report.members);

        if let Some(e) = report.fatal {
            error!(
                error = %e,
                "Archive listing disabled for this run; check the unrar command (UnrarCmd)"
            );
            return Ok(false);
        }
        Ok(true)
    }

    /// Run the heuristic; `nzb_name` is only used for logging
    pub async fn detect(&self, nzb_name: &str, dir: &Path) -> Result<bool> {
        let names = self.collect_names(dir).await?;
        debug!(nzb_name, files = names.len(), "classifying download content");

        let fake = self.classifier.is_fake(&names);
        if fake {
            warn!("Download has media files and executables");
        }
        Ok(fake)
    }
}
