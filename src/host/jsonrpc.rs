//! NZBGet JSON-RPC client

use super::HostApi;
use crate::config::HostConfig;
use crate::error::{Error, Result};
use crate::types::{DownloadId, FileId, QueuedFile};
use async_trait::async_trait;
use serde::Deserialize;
use serde::de::DeserializeOwned;
use serde_json::{Value, json};
use tracing::debug;

/// Response envelope of a JSON-RPC call
#[derive(Debug, Deserialize)]
struct RpcResponse<T> {
    result: Option<T>,
    error: Option<RpcErrorBody>,
}

#[derive(Debug, Deserialize)]
struct RpcErrorBody {
    #[serde(default)]
    code: i64,
    #[serde(default)]
    message: String,
}

/// One download as reported by `listgroups`
#[derive(Debug, Deserialize)]
struct QueuedGroup {
    #[serde(rename = "NZBID")]
    nzb_id: DownloadId,
}

/// Client for the host's `/jsonrpc` endpoint, authenticated with basic auth
pub struct JsonRpcClient {
    http_client: reqwest::Client,
    url: url::Url,
    username: String,
    password: String,
}

impl JsonRpcClient {
    /// Create a client for the configured control interface
    ///
    /// # Errors
    /// Returns error if the URL is invalid or the HTTP client cannot be created
    pub fn new(config: &HostConfig) -> Result<Self> {
        let http_client = reqwest::Client::builder()
            .timeout(config.timeout)
            .build()?;

        Ok(Self {
            http_client,
            url: config.rpc_url()?,
            username: config.username.clone(),
            password: config.password.clone(),
        })
    }

    /// Invoke `method` with positional `params` and decode its result
    async fn call<T: DeserializeOwned>(&self, method: &str, params: Value) -> Result<T> {
        debug!(method, url = %self.url, "calling host");

        let body = json!({
            "method": method,
            "params": params,
            "id": 1,
        });

        let mut request = self.http_client.post(self.url.clone()).json(&body);
        if !self.username.is_empty() || !self.password.is_empty() {
            request = request.basic_auth(&self.username, Some(&self.password));
        }

        let response = request.send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(Error::Rpc {
                method: method.to_string(),
                message: format!("HTTP {}", status),
            });
        }

        let bytes = response.bytes().await?;
        let envelope: RpcResponse<T> = serde_json::from_slice(&bytes)?;

        if let Some(err) = envelope.error {
            return Err(Error::Rpc {
                method: method.to_string(),
                message: format!("{} (code {})", err.message, err.code),
            });
        }

        envelope.result.ok_or_else(|| Error::Rpc {
            method: method.to_string(),
            message: "response has no result".to_string(),
        })
    }
}

#[async_trait]
impl HostApi for JsonRpcClient {
    async fn list_files(&self, download_id: DownloadId) -> Result<Vec<QueuedFile>> {
        self.call("listfiles", json!([0, 0, download_id.get()]))
            .await
    }

    async fn move_file_to_top(&self, file_id: FileId) -> Result<()> {
        let accepted: bool = self
            .call("editqueue", json!(["FileMoveTop", 0, "", [file_id.0]]))
            .await?;
        if accepted {
            Ok(())
        } else {
            Err(Error::Rpc {
                method: "editqueue".to_string(),
                message: format!("host refused to move file {}", file_id),
            })
        }
    }

    async fn active_downloads(&self) -> Result<Vec<DownloadId>> {
        let groups: Vec<QueuedGroup> = self.call("listgroups", json!([0])).await?;
        Ok(groups.into_iter().map(|g| g.nzb_id).collect())
    }
}
