//! Incremental listing of the archives in one directory

use super::traits::ArchiveLister;
use crate::cache::CacheGuard;
use crate::error::{ListError, Result};
use std::path::Path;
use tracing::{debug, error};

/// Result of scanning one directory
#[derive(Debug, Default)]
pub struct ScanReport {
    /// Member names found in the newly listed archives
    pub members: Vec<String>,
    /// Files passed to the lister in this scan
    pub examined: usize,
    /// Files the lister could not read
    pub failed: usize,
    /// Set when the lister cannot run at all; the scan stopped early
    pub fatal: Option<ListError>,
}

/// List every file in `dir` that the cache has not seen yet
///
/// Files whose names contain `tmp` are skipped since they are still being
/// written. Cache entries are keyed relative to `base` so files of the same name
/// in different sub-directories are tracked separately. Every examined file is
/// recorded, including the ones that failed to list; a fatal lister error stops
/// the scan and leaves the remaining files unrecorded.
pub async fn scan_directory(
    lister: &dyn ArchiveLister,
    cache: &mut CacheGuard,
    base: &Path,
    dir: &Path,
) -> Result<ScanReport> {
    let mut candidates = Vec::new();
    for entry in std::fs::read_dir(dir)? {
        let path = entry?.path();
        if !path.is_file() {
            continue;
        }
        let Some(file_name) = path.file_name().map(|n| n.to_string_lossy().into_owned()) else {
            continue;
        };
        if file_name.contains("tmp") {
            continue;
        }
        let key = cache_key(base, &path, &file_name);
        if cache.contains(&key) {
            continue;
        }
        candidates.push((key, path));
    }
    candidates.sort();

    debug!(
        lister = lister.name(),
        ?dir,
        pending = candidates.len(),
        "listing new files"
    );

    let mut report = ScanReport::default();
    let mut examined = Vec::with_capacity(candidates.len());

    for (key, path) in candidates {
        match lister.list(&path).await {
            Ok(members) => {
                debug!(file = %key, members = members.len(), "listed archive");
                report.members.extend(members);
            }
            Err(e) if e.is_fatal() => {
                error!(error = %e, "cannot list archive contents");
                report.fatal = Some(e);
                break;
            }
            Err(e) => {
                // Summarized once per directory below
                debug!(file = %key, error = %e, "could not list file contents");
                report.failed += 1;
            }
        }
        examined.push(key);
    }

    if report.failed > 0 {
        error!(
            "Could not list contents of {} file(s) in {}",
            report.failed,
            dir.display()
        );
    }

    report.examined = examined.len();
    cache.record(&examined)?;
    Ok(report)
}

/// Cache key of `path`: its path relative to `base`, with `/` separators
fn cache_key(base: &Path, path: &Path, file_name: &str) -> String {
    match path.strip_prefix(base) {
        Ok(relative) => relative
            .components()
            .map(|c| c.as_os_str().to_string_lossy())
            .collect::<Vec<_>>()
            .join("/"),
        Err(_) => file_name.to_string(),
    }
}

#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::InspectionCache;
    use crate::logging::test_support::capture_logs;
    use crate::types::DownloadId;
    use async_trait::async_trait;
    use std::collections::HashMap;
    use std::path::PathBuf;
    use std::sync::Mutex;
    use tempfile::TempDir;

    /// Lister answering from a fixed table and recording every call
    #[derive(Default)]
    struct TableLister {
        contents: HashMap<String, Vec<String>>,
        missing_tool: bool,
        calls: Mutex<Vec<PathBuf>>,
    }

    impl TableLister {
        fn with(entries: &[(&str, &[&str])]) -> Self {
            Self {
                contents: entries
                    .iter()
                    .map(|(file, names)| {
                        (file.to_string(), names.iter().map(|n| n.to_string()).collect())
                    })
                    .collect(),
                ..Self::default()
            }
        }

        fn call_count(&self) -> usize {
            self.calls.lock().unwrap().len()
        }
    }

    #[async_trait]
    impl ArchiveLister for TableLister {
        async fn list(&self, archive: &Path) -> std::result::Result<Vec<String>, ListError> {
            self.calls.lock().unwrap().push(archive.to_path_buf());
            if self.missing_tool {
                return Err(ListError::ToolNotFound {
                    tool: PathBuf::from("unrar"),
                    reason: "not found".to_string(),
                });
            }
            let name = archive.file_name().unwrap().to_string_lossy().into_owned();
            self.contents
                .get(&name)
                .cloned()
                .ok_or_else(|| ListError::NonZeroExit {
                    file: archive.to_path_buf(),
                    code: Some(10),
                    stderr: "not RAR archive".to_string(),
                })
        }

        fn name(&self) -> &'static str {
            "table"
        }
    }

    fn touch(dir: &Path, name: &str) {
        std::fs::write(dir.join(name), b"").unwrap();
    }

    #[tokio::test]
    async fn lists_new_files_and_records_all_of_them() {
        let temp = TempDir::new().unwrap();
        let dl = temp.path().join("dl");
        std::fs::create_dir(&dl).unwrap();
        touch(&dl, "a.part01.rar");
        touch(&dl, "a.nfo");

        let lister = TableLister::with(&[("a.part01.rar", &["movie.mkv", "setup.exe"])]);
        let cache = InspectionCache::new(&temp.path().join("cache"), DownloadId(1));
        let mut guard = cache.open().unwrap();

        let report = scan_directory(&lister, &mut guard, &dl, &dl).await.unwrap();
        assert_eq!(report.members, vec!["movie.mkv", "setup.exe"]);
        assert_eq!(report.examined, 2);
        assert_eq!(report.failed, 1);
        assert!(report.fatal.is_none());
        assert!(guard.contains("a.part01.rar"));
        assert!(guard.contains("a.nfo"));
    }

    #[tokio::test]
    async fn second_scan_lists_nothing_again() {
        let temp = TempDir::new().unwrap();
        let dl = temp.path().join("dl");
        std::fs::create_dir(&dl).unwrap();
        touch(&dl, "a.part01.rar");
        touch(&dl, "a.part02.rar");

        let lister = TableLister::with(&[("a.part01.rar", &["movie.mkv"])]);
        let cache = InspectionCache::new(&temp.path().join("cache"), DownloadId(1));

        {
            let mut guard = cache.open().unwrap();
            scan_directory(&lister, &mut guard, &dl, &dl).await.unwrap();
        }
        assert_eq!(lister.call_count(), 2);

        let mut guard = cache.open().unwrap();
        let report = scan_directory(&lister, &mut guard, &dl, &dl).await.unwrap();
        assert_eq!(lister.call_count(), 2, "no file may be listed twice");
        assert_eq!(report.examined, 0);
        assert!(report.members.is_empty());

        // A newly arrived part is picked up
        touch(&dl, "a.part03.rar");
        let report = scan_directory(&lister, &mut guard, &dl, &dl).await.unwrap();
        assert_eq!(lister.call_count(), 3);
        assert_eq!(report.examined, 1);
    }

    #[tokio::test]
    async fn temp_files_and_directories_are_skipped() {
        let temp = TempDir::new().unwrap();
        let dl = temp.path().join("dl");
        std::fs::create_dir_all(dl.join("Sub")).unwrap();
        touch(&dl, "a.part05.rar.out.tmp");
        touch(&dl, "tmpfile.rar");

        let lister = TableLister::default();
        let cache = InspectionCache::new(&temp.path().join("cache"), DownloadId(2));
        let mut guard = cache.open().unwrap();

        let report = scan_directory(&lister, &mut guard, &dl, &dl).await.unwrap();
        assert_eq!(report.examined, 0);
        assert_eq!(lister.call_count(), 0);
        assert!(guard.is_empty());
    }

    #[tokio::test]
    async fn subdirectory_keys_are_relative_to_base() {
        let temp = TempDir::new().unwrap();
        let dl = temp.path().join("dl");
        let sub = dl.join("CD1");
        std::fs::create_dir_all(&sub).unwrap();
        touch(&dl, "x.rar");
        touch(&sub, "x.rar");

        let lister = TableLister::with(&[("x.rar", &["a.avi"])]);
        let cache = InspectionCache::new(&temp.path().join("cache"), DownloadId(3));
        let mut guard = cache.open().unwrap();

        scan_directory(&lister, &mut guard, &dl, &dl).await.unwrap();
        let report = scan_directory(&lister, &mut guard, &dl, &sub).await.unwrap();
        assert_eq!(report.examined, 1, "same name in a sub-directory is a different file");
        assert!(guard.contains("x.rar"));
        assert!(guard.contains("CD1/x.rar"));
    }

    #[tokio::test]
    async fn missing_tool_stops_scan_without_recording() {
        let temp = TempDir::new().unwrap();
        let dl = temp.path().join("dl");
        std::fs::create_dir(&dl).unwrap();
        touch(&dl, "a.rar");
        touch(&dl, "b.rar");

        let lister = TableLister {
            missing_tool: true,
            ..TableLister::default()
        };
        let cache = InspectionCache::new(&temp.path().join("cache"), DownloadId(4));
        let mut guard = cache.open().unwrap();

        let report = scan_directory(&lister, &mut guard, &dl, &dl).await.unwrap();
        assert!(report.fatal.is_some());
        assert_eq!(lister.call_count(), 1, "reported once, not per file");
        assert_eq!(report.examined, 0);
        assert!(guard.is_empty());
    }

    #[tokio::test]
    async fn failed_listings_are_reported_once_per_directory() {
        let temp = TempDir::new().unwrap();
        let dl = temp.path().join("dl");
        std::fs::create_dir(&dl).unwrap();
        touch(&dl, "a.part01.rar");
        touch(&dl, "movie.mkv");
        touch(&dl, "movie.nfo");

        let lister = TableLister::with(&[("a.part01.rar", &["movie.mkv"])]);
        let cache = InspectionCache::new(&temp.path().join("cache"), DownloadId(5));
        let mut guard = cache.open().unwrap();

        let (logs, _guard) = capture_logs();
        let report = scan_directory(&lister, &mut guard, &dl, &dl).await.unwrap();
        assert_eq!(report.failed, 2);

        let text = logs.text();
        let errors: Vec<&str> = text.lines().filter(|l| l.starts_with("[ERROR]")).collect();
        assert_eq!(errors.len(), 1, "got: {text}");
        assert!(errors[0].contains("Could not list contents of 2 file(s)"), "got: {text}");
    }

    #[tokio::test]
    async fn successful_scan_logs_no_error() {
        let temp = TempDir::new().unwrap();
        let dl = temp.path().join("dl");
        std::fs::create_dir(&dl).unwrap();
        touch(&dl, "a.rar");

        let lister = TableLister::with(&[("a.rar", &["a.mkv"])]);
        let cache = InspectionCache::new(&temp.path().join("cache"), DownloadId(6));
        let mut guard = cache.open().unwrap();

        let (logs, _guard) = capture_logs();
        scan_directory(&lister, &mut guard, &dl, &dl).await.unwrap();
        assert!(!logs.text().contains("[ERROR]"));
    }
}
