pub mod config;
pub mod lookup;
pub mod neighbors;
pub mod serve;
pub mod stats;

use anyhow::Result;
use routeglass::{clients, GlassConfig, NoNeighbors, Pools, RoutesStore};
use std::sync::Arc;

/// Build the routes store of all configured sources, reading snapshots
pub(crate) fn build_store(config: &GlassConfig) -> Result<Arc<RoutesStore>> {
    let store = RoutesStore::new(
        config,
        Arc::new(NoNeighbors),
        Arc::new(Pools::new()),
        |source| clients::client_for(config, source),
    )?;
    Ok(Arc::new(store))
}

/// Refresh every source once, reporting failed sources on stderr
pub(crate) async fn refresh_once(store: &RoutesStore) {
    for (source_id, result) in store.refresh_all().await {
        if let Err(e) = result {
            eprintln!("WARNING: unable to refresh {}: {}", source_id, e);
        }
    }
}
