//! # fake-detector
//!
//! NZBGet queue and post-processing script that detects fake downloads.
//!
//! A download is fake when it contains media files together with executables
//! (for example `movie.mkv` next to `codec.exe`), or any file with a banned
//! extension. Detection runs while the download is still in progress by
//! listing the contents of the RAR volumes that already arrived, so fakes can
//! be marked bad before the rest of the download is wasted.
//!
//! ## Flow
//!
//! - `NZB_ADDED`: the last RAR volume is moved to the top of the queue so
//!   archive listings work as early as possible
//! - `FILE_DOWNLOADED` / `NZB_DOWNLOADED`: archives that arrived are listed
//!   (each at most once, see [`cache`]) and the content is classified
//! - post-processing: the unpacked files are classified, then stale caches
//!   are removed
//!
//! A fake download is reported with `[NZB] NZBPR_PPSTATUS_FAKE=yes` and
//! `[NZB] MARK=BAD`.
//!
//! ## Embedding
//!
//! ```no_run
//! use fake_detector::{ScriptEnv, run_script, write_outcome};
//!
//! #[tokio::main]
//! async fn main() {
//!     let outcome = run_script(&ScriptEnv::from_process()).await;
//!     let _ = write_outcome(&mut std::io::stdout(), &outcome);
//!     std::process::exit(outcome.exit.code());
//! }
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::unwrap_used)]
#![warn(clippy::expect_used)]

/// Per-download record of inspected files
pub mod cache;
/// Filename classification
pub mod classify;
/// Removal of stale inspection caches
pub mod cleanup;
/// Configuration types
pub mod config;
/// Fake detection over a download directory
pub mod detector;
/// Error types
pub mod error;
/// NZBGet control interface
pub mod host;
/// Archive content listing
pub mod listing;
/// Host-formatted log output
pub mod logging;
/// Script invocation flow
pub mod orchestrator;
/// Queue reordering of split archives
pub mod reorder;
/// Core types
pub mod types;

// Re-export commonly used types
pub use config::{Config, InvocationContext, ScriptEnv};
pub use detector::FakeDetector;
pub use error::{Error, ListError, Result};
pub use host::{HostApi, JsonRpcClient};
pub use listing::{ArchiveLister, UnrarLister};
pub use logging::init_logging;
pub use orchestrator::{Orchestrator, run_script, startup_check, write_outcome};
pub use types::{Directive, DownloadId, FileId, Invocation, Outcome, QueueEvent, ScriptExit};
