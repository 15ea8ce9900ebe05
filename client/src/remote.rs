//! Access to the authoritative remote dataset.

use crate::error::{Result, SyncError};
use async_trait::async_trait;
use faultsync_engine::{CheckResponse, FetchRequest, FetchResponse};
use std::time::Duration;

/// The remote side of a sync.
#[async_trait]
pub trait RemoteSource: Send + Sync {
    /// Ask whether a version newer than `current_version` exists.
    async fn check(&self, current_version: &str) -> Result<CheckResponse>;

    /// Download the changes described by `request`.
    async fn fetch(&self, request: &FetchRequest) -> Result<FetchResponse>;
}

/// [`RemoteSource`] over the HTTP sync endpoint.
#[derive(Debug, Clone)]
pub struct HttpRemote {
    client: reqwest::Client,
    sync_url: String,
}

impl HttpRemote {
    /// `base_url` is the server root; requests go to `<base_url>/sync`.
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .user_agent(concat!("faultsync/", env!("CARGO_PKG_VERSION")))
            .build()?;

        Ok(Self {
            client,
            sync_url: format!("{}/sync", base_url.trim_end_matches('/')),
        })
    }

    pub fn sync_url(&self) -> &str {
        &self.sync_url
    }
}

#[async_trait]
impl RemoteSource for HttpRemote {
    async fn check(&self, current_version: &str) -> Result<CheckResponse> {
        tracing::debug!(url = %self.sync_url, version = current_version, "Checking for updates");

        let response = self
            .client
            .get(&self.sync_url)
            .query(&[("version", current_version)])
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(SyncError::Network(format!("HTTP {}", status.as_u16())));
        }

        Ok(response.json().await?)
    }

    async fn fetch(&self, request: &FetchRequest) -> Result<FetchResponse> {
        tracing::debug!(
            url = %self.sync_url,
            from = ?request.from_version,
            to = ?request.to_version,
            "Downloading updates"
        );

        let response = self
            .client
            .post(&self.sync_url)
            .json(request)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(SyncError::Network(format!(
                "Download failed: HTTP {}",
                status.as_u16()
            )));
        }

        Ok(response.json().await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sync_url_joins_cleanly() {
        let remote = HttpRemote::new("https://faults.example.com/api/", Duration::from_secs(5)).unwrap();
        assert_eq!(remote.sync_url(), "https://faults.example.com/api/sync");

        let remote = HttpRemote::new("http://localhost:3000", Duration::from_secs(5)).unwrap();
        assert_eq!(remote.sync_url(), "http://localhost:3000/sync");
    }

    #[tokio::test]
    async fn unreachable_remote_is_network_error() {
        // Nothing listens on the discard port.
        let remote = HttpRemote::new("http://127.0.0.1:9", Duration::from_secs(2)).unwrap();
        let err = remote.check("1.0.0").await.unwrap_err();
        assert!(matches!(err, SyncError::Network(_)));
    }
}
