//! Moving the last volume of a split archive to the front of the queue
//!
//! Listing a multi-volume RAR set succeeds much earlier when the final volume
//! is present, so on queue events the highest-numbered part is requested first.
//!
//! Recognized volume naming conventions:
//! - `archive.part01.rar`, `archive.part001.rar` (new style)
//! - `archive.r00`, `archive.r01`, ... (old style)

use crate::error::Result;
use crate::host::HostApi;
use crate::types::{DownloadId, FileId, QueuedFile};
use tracing::info;

/// The volume chosen to be downloaded next
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PartChoice {
    /// Host file id
    pub file_id: FileId,
    /// Filename of the volume
    pub filename: String,
    /// Volume number parsed from the name
    pub number: u64,
}

/// Volume number of a split-archive part, `None` for anything else
///
/// A plain `archive.rar` has no number: it is the first volume of the old
/// naming style and never the last one worth prioritizing.
#[must_use]
pub fn part_number(filename: &str) -> Option<u64> {
    let lower = filename.to_lowercase();

    // New-style: .partNNN.rar
    if let Some(stem) = lower.strip_suffix(".rar") {
        let part_idx = stem.rfind(".part")?;
        return parse_digits(&stem[part_idx + 5..]);
    }

    // Old-style split: .rNN
    let dot = lower.rfind('.')?;
    let digits = lower[dot + 1..].strip_prefix('r')?;
    parse_digits(digits)
}

fn parse_digits(s: &str) -> Option<u64> {
    if !s.is_empty() && s.chars().all(|c| c.is_ascii_digit()) {
        s.parse().ok()
    } else {
        None
    }
}

/// The part with the highest volume number; the first one wins ties
#[must_use]
pub fn select_last_part(files: &[QueuedFile]) -> Option<PartChoice> {
    let mut best: Option<PartChoice> = None;
    for file in files {
        let Some(number) = part_number(&file.filename) else {
            continue;
        };
        if best.as_ref().is_none_or(|b| number > b.number) {
            best = Some(PartChoice {
                file_id: file.id,
                filename: file.filename.clone(),
                number,
            });
        }
    }
    best
}

/// Ask the host to download the last archive part of `download_id` first
///
/// Returns the moved part, or `None` if no part files are queued yet.
pub async fn sort_inner_files(
    host: &dyn HostApi,
    download_id: DownloadId,
) -> Result<Option<PartChoice>> {
    let files = host.list_files(download_id).await?;

    match select_last_part(&files) {
        Some(choice) => {
            info!("Moving last rar-file to the top: {}", choice.filename);
            host.move_file_to_top(choice.file_id).await?;
            Ok(Some(choice))
        }
        None => {
            info!(
                download_id = download_id.get(),
                files = files.len(),
                "No archive parts found, skipping sorting"
            );
            Ok(None)
        }
    }
}
