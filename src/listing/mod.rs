//! Archive table-of-contents listing
//!
//! Split archives are only partially present while a download runs, so the
//! detector lists whatever part files can already be read instead of waiting for
//! extraction. Listing is done by an external tool behind the [`ArchiveLister`]
//! trait:
//!
//! - [`UnrarLister`]: runs the host's configured `unrar` in bare-listing mode
//!
//! [`scan_directory`] drives a lister over one directory and records every file
//! it examined in the download's [`InspectionCache`](crate::cache::InspectionCache),
//! so repeated invocations during a long download list each file at most once.

mod cli;
mod scan;
mod traits;

pub use cli::{UnrarLister, executable_from_command, parse_listing};
pub use scan::{ScanReport, scan_directory};
pub use traits::ArchiveLister;
