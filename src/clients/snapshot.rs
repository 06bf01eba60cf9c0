use crate::api::RoutesResponse;
use crate::config::DEFAULT_SNAPSHOT_TIMEOUT;
use crate::store::SourceClient;
use anyhow::{anyhow, Result};
use async_trait::async_trait;
use std::time::Duration;
use tracing::debug;

/// Client reading a JSON routes snapshot (`{"imported": [...], "filtered": [...]}`).
///
/// The location may be a file path or an HTTP(S) URL; `.gz` and `.bz2` files are
/// decompressed transparently.
#[derive(Debug, Clone)]
pub struct SnapshotClient {
    location: String,
    timeout: Duration,
}

impl SnapshotClient {
    pub fn new(location: impl Into<String>) -> Self {
        Self {
            location: location.into(),
            timeout: DEFAULT_SNAPSHOT_TIMEOUT,
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn location(&self) -> &str {
        &self.location
    }
}

#[async_trait]
impl SourceClient for SnapshotClient {
    async fn fetch_routes(&self) -> Result<RoutesResponse> {
        debug!("Loading routes snapshot from {}", self.location);

        let location = self.location.clone();
        let load = tokio::task::spawn_blocking(move || {
            oneio::read_json_struct::<RoutesResponse>(location.as_str())
        });

        let response = tokio::time::timeout(self.timeout, load)
            .await
            .map_err(|_| {
                anyhow!(
                    "Loading {} timed out after {}",
                    self.location,
                    humantime::format_duration(self.timeout)
                )
            })?
            .map_err(|e| anyhow!("Snapshot loader task failed: {}", e))?
            .map_err(|e| anyhow!("Unable to load {}: {}", self.location, e))?;

        Ok(response)
    }
}
