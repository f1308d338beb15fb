//! Persisted set of filenames already passed to the archive lister
//!
//! One plain-text file per download lives under the cache root, named after the
//! download id and holding one inspected filename per line. Names are only ever
//! appended; the whole file is removed at cleanup. Readers and writers take an
//! exclusive advisory lock so a queue event and a post-processing run racing on
//! the same download cannot interleave their read-then-append cycles.

use crate::error::Result;
use crate::types::DownloadId;
use std::collections::HashSet;
use std::fs::{self, File, OpenOptions};
use std::io::{Read, Write};
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

/// Cache of inspected filenames for one download
#[derive(Clone, Debug)]
pub struct InspectionCache {
    download_id: DownloadId,
    path: PathBuf,
}

impl InspectionCache {
    /// Cache for `download_id` stored under `root`
    pub fn new(root: &Path, download_id: DownloadId) -> Self {
        Self {
            download_id,
            path: root.join(download_id.to_string()),
        }
    }

    /// Location of the cache file
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Download this cache belongs to
    pub fn download_id(&self) -> DownloadId {
        self.download_id
    }

    /// Open (creating if needed) and lock the cache, loading the recorded names
    ///
    /// The lock is held until the returned guard is dropped.
    pub fn open(&self) -> Result<CacheGuard> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)?;
        }

        let mut file = OpenOptions::new()
            .read(true)
            .append(true)
            .create(true)
            .open(&self.path)?;
        lock_exclusive(&file)?;

        let mut content = String::new();
        file.read_to_string(&mut content)?;
        let names: HashSet<String> = content
            .lines()
            .map(|line| line.trim_end_matches('\r'))
            .filter(|line| !line.is_empty())
            .map(str::to_string)
            .collect();

        debug!(
            download_id = self.download_id.get(),
            path = ?self.path,
            cached = names.len(),
            "opened inspection cache"
        );

        Ok(CacheGuard { file, names })
    }

    /// Delete the cache file; returns false if it did not exist
    pub fn remove(&self) -> Result<bool> {
        match fs::remove_file(&self.path) {
            Ok(()) => Ok(true),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(false),
            Err(e) => Err(e.into()),
        }
    }
}

/// Locked, loaded inspection cache
#[derive(Debug)]
pub struct CacheGuard {
    file: File,
    names: HashSet<String>,
}

impl CacheGuard {
    /// Whether `name` was inspected before
    pub fn contains(&self, name: &str) -> bool {
        self.names.contains(name)
    }

    /// Number of recorded names
    pub fn len(&self) -> usize {
        self.names.len()
    }

    /// Whether nothing was recorded yet
    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }

    /// Append names that are not yet recorded
    pub fn record<I, S>(&mut self, names: I) -> Result<usize>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut buf = String::new();
        let mut added = 0;
        for name in names {
            let name = name.as_ref();
            if name.is_empty() || name.contains(['\n', '\r']) {
                warn!(name, "not caching filename with line break");
                continue;
            }
            if self.names.insert(name.to_string()) {
                buf.push_str(name);
                buf.push('\n');
                added += 1;
            }
        }

        if added > 0 {
            self.file.write_all(buf.as_bytes())?;
            self.file.flush()?;
        }
        Ok(added)
    }
}

/// A cache file found on disk
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CachedDownload {
    /// Download id parsed from the file name
    pub download_id: DownloadId,
    /// Path of the cache file
    pub path: PathBuf,
}

/// Cache files under `root`; files not named after a download id are ignored
pub fn cached_downloads(root: &Path) -> Result<Vec<CachedDownload>> {
    let entries = match fs::read_dir(root) {
        Ok(entries) => entries,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
        Err(e) => return Err(e.into()),
    };

    let mut cached = Vec::new();
    for entry in entries {
        let entry = entry?;
        if !entry.file_type()?.is_file() {
            continue;
        }
        let Some(download_id) = entry
            .file_name()
            .to_str()
            .and_then(|name| name.parse::<DownloadId>().ok())
        else {
            continue;
        };
        cached.push(CachedDownload {
            download_id,
            path: entry.path(),
        });
    }
    cached.sort_by_key(|c| c.download_id);
    Ok(cached)
}

#[cfg(unix)]
fn lock_exclusive(file: &File) -> std::io::Result<()> {
    use std::os::unix::io::AsRawFd;

    loop {
        // SAFETY: the descriptor belongs to `file`, which outlives this call.
        // flock only takes an advisory lock and reads no memory from us.
        let rc = unsafe { libc::flock(file.as_raw_fd(), libc::LOCK_EX) };
        if rc == 0 {
            return Ok(());
        }
        let err = std::io::Error::last_os_error();
        if err.kind() != std::io::ErrorKind::Interrupted {
            return Err(err);
        }
    }
}

#[cfg(not(unix))]
fn lock_exclusive(_file: &File) -> std::io::Result<()> {
    // Host serializes events per download; no advisory locking here.
    Ok(())
}
