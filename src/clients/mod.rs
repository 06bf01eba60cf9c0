//! Routing source clients
//!
//! [`SnapshotClient`] loads route snapshots exported by a route server, from a local file
//! or a remote URL, optionally compressed.

pub mod snapshot;

pub use snapshot::SnapshotClient;

use crate::config::{GlassConfig, SourceConfig};
use crate::store::SourceClient;
use anyhow::{anyhow, Result};
use std::sync::Arc;

/// Build the client of a configured source
pub fn client_for(config: &GlassConfig, source: &SourceConfig) -> Result<Arc<dyn SourceClient>> {
    let location = source
        .snapshot
        .as_deref()
        .ok_or_else(|| anyhow!("Source {} has no snapshot location", source.id))?;
    Ok(Arc::new(
        SnapshotClient::new(location).with_timeout(config.snapshot_timeout),
    ))
}
