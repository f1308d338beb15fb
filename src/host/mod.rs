//! Calls into the download manager that invoked the script
//!
//! Queue reordering and cache cleanup need three remote operations, captured by
//! [`HostApi`]. [`JsonRpcClient`] implements them over NZBGet's JSON-RPC
//! endpoint; tests substitute their own implementation.

mod jsonrpc;

pub use jsonrpc::JsonRpcClient;

use crate::error::Result;
use crate::types::{DownloadId, FileId, QueuedFile};
use async_trait::async_trait;

/// Remote operations on the host's download queue
#[async_trait]
pub trait HostApi: Send + Sync {
    /// Files of one download, in queue order
    async fn list_files(&self, download_id: DownloadId) -> Result<Vec<QueuedFile>>;

    /// Move a single file to the front of its download's file queue
    async fn move_file_to_top(&self, file_id: FileId) -> Result<()>;

    /// Ids of every download currently in the queue
    async fn active_downloads(&self) -> Result<Vec<DownloadId>>;
}
