//! Filename classification: media, executables and banned extensions
//!
//! All checks look at the extension of the final path component only, so archive
//! member names such as `Sample/setup.exe` are handled the same way as plain
//! directory entries.

use crate::config::DetectionConfig;
use tracing::info;

/// Extensions of files that can run code on the downloader's machine
const EXECUTABLE_EXTENSIONS: &[&str] = &[".exe", ".bat", ".sh"];

/// Script names that legitimate posts ship to fix obfuscated filenames
const ALLOWED_SCRIPT_NAMES: &[&str] = &["rename", "Rename"];

/// Split a filename into `(stem, extension)` like a path's last component
///
/// The extension includes the leading dot and keeps its original case; a name
/// that only starts with a dot (`.nfo`) has no extension.
pub fn split_extension(name: &str) -> (&str, &str) {
    let base = name.rsplit(|c| c == '/' || c == '\\').next().unwrap_or(name);
    let leading_dots = base.len() - base.trim_start_matches('.').len();
    match base[leading_dots..].rfind('.') {
        Some(idx) => base.split_at(leading_dots + idx),
        None => (base, ""),
    }
}

/// Lowercase extension of a filename, empty if it has none
fn extension_lower(name: &str) -> String {
    split_extension(name).1.to_ascii_lowercase()
}

/// Extension-based checks over a collection of filenames
#[derive(Clone, Debug)]
pub struct Classifier {
    media_extensions: Vec<String>,
    banned_extensions: Vec<String>,
}

impl Classifier {
    /// Build a classifier from the detection policy
    pub fn new(config: &DetectionConfig) -> Self {
        Self {
            media_extensions: lower_all(&config.media_extensions),
            banned_extensions: lower_all(&config.banned_extensions),
        }
    }

    /// True if any name has a media extension
    #[must_use]
    pub fn contains_media<S: AsRef<str>>(&self, names: &[S]) -> bool {
        names.iter().any(|name| {
            let ext = extension_lower(name.as_ref());
            self.media_extensions.contains(&ext)
        })
    }

    /// True if any name is an executable
    ///
    /// `.exe` always counts. `.bat` and `.sh` count unless the script is one
    /// of the well-known rename helpers.
    #[must_use]
    pub fn contains_executable<S: AsRef<str>>(&self, names: &[S]) -> bool {
        let found = names.iter().map(AsRef::as_ref).find(|name| is_executable(name));
        match found {
            Some(name) => {
                info!("Found executable {}", name);
                true
            }
            None => false,
        }
    }

    /// True if any name has an extension from the banned list
    #[must_use]
    pub fn contains_banned<S: AsRef<str>>(&self, names: &[S]) -> bool {
        if self.banned_extensions.is_empty() {
            return false;
        }
        let found = names.iter().map(AsRef::as_ref).find(|name| {
            let ext = extension_lower(name);
            self.banned_extensions.contains(&ext)
        });
        match found {
            Some(name) => {
                info!("Found banned file {}", name);
                true
            }
            None => false,
        }
    }

    /// The fake verdict for a complete filename collection
    #[must_use]
    pub fn is_fake<S: AsRef<str>>(&self, names: &[S]) -> bool {
        (self.contains_media(names) && self.contains_executable(names))
            || self.contains_banned(names)
    }
}

fn is_executable(name: &str) -> bool {
    let (stem, ext) = split_extension(name);
    let ext = ext.to_ascii_lowercase();
    if ext == ".exe" {
        return true;
    }
    EXECUTABLE_EXTENSIONS.contains(&ext.as_str()) && !ALLOWED_SCRIPT_NAMES.contains(&stem)
}

fn lower_all(items: &[String]) -> Vec<String> {
    items.iter().map(|s| s.to_ascii_lowercase()).collect()
}
