//! Trait for archive content listing

use crate::error::ListError;
use async_trait::async_trait;
use std::path::Path;

/// Lists the member names of an archive without extracting it
///
/// Implementations must not modify the archive. A file that is not an archive
/// (or an incomplete volume) is reported as an error, never as an empty list.
///
/// # Examples
///
/// ```no_run
/// use fake_detector::listing::{ArchiveLister, UnrarLister};
/// use std::path::{Path, PathBuf};
/// use std::time::Duration;
///
/// # #[tokio::main]
/// # async fn main() -> Result<(), Box<dyn std::error::Error>> {
/// let lister = UnrarLister::new(PathBuf::from("/usr/bin/unrar"), Duration::from_secs(60));
/// for name in lister.list(Path::new("movie.part01.rar")).await? {
///     println!("{}", name);
/// }
/// # Ok(())
/// # }
/// ```
#[async_trait]
pub trait ArchiveLister: Send + Sync {
    /// Member names of `archive`, as printed by the tool
    ///
    /// # Errors
    ///
    /// Returns a [`ListError`] describing why the file could not be listed.
    /// [`ListError::ToolNotFound`] means no other file can be listed either.
    async fn list(&self, archive: &Path) -> Result<Vec<String>, ListError>;

    /// Human-readable name for logging
    fn name(&self) -> &'static str;
}
