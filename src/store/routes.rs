//! Routes store
//!
//! The routes store owns the [`SourceCache`] of every configured source and is the single
//! entry point for route queries. Lookups fan out to all relevant backends concurrently
//! and degrade gracefully: a source whose backend fails contributes no routes, and the
//! call only fails when every queried source failed.
//!
//! [`RoutesStore::start`] spawns one refresh task per source. Each task only waits on its
//! own interval, so a slow source never holds back the others. The parallelism limit
//! applies to one-shot refreshes through [`RoutesStore::refresh_all`].

use crate::api::{LookupRoute, NeighborsLookupResults, RoutesCount};
use crate::config::{GlassConfig, SourceConfig};
use crate::pools::{PoolStats, Pools};
use crate::store::backend::BackendError;
use crate::store::neighbors::NeighborsStore;
use crate::store::source::{SourceCache, SourceClient, SourceState};
use anyhow::Result;
use futures::future::join_all;
use serde::Serialize;
use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Semaphore;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

// =============================================================================
// Stats
// =============================================================================

/// Route counts and refresh state of one source
#[derive(Debug, Clone, Serialize)]
pub struct SourceStats {
    pub id: String,
    pub name: String,
    pub routes: RoutesCount,
    pub state: SourceState,
}

/// Route counts of all sources
#[derive(Debug, Clone, Serialize)]
pub struct RoutesStoreStats {
    pub sources: Vec<SourceStats>,
    pub total_routes: RoutesCount,
    pub pools: PoolStats,
}

// =============================================================================
// Errors
// =============================================================================

/// Errors returned by the routes store
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoreError {
    /// No source with this ID is configured
    UnknownSource(String),
    /// Every queried source failed
    AllSourcesFailed(Vec<(String, BackendError)>),
    /// The neighbors store could not resolve the query
    Neighbors(String),
}

impl std::fmt::Display for StoreError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            StoreError::UnknownSource(id) => write!(f, "Unknown source: {}", id),
            StoreError::AllSourcesFailed(errors) => {
                write!(f, "All sources failed:")?;
                for (id, error) in errors {
                    write!(f, " [{}: {}]", id, error)?;
                }
                Ok(())
            }
            StoreError::Neighbors(e) => write!(f, "Neighbor lookup failed: {}", e),
        }
    }
}

impl std::error::Error for StoreError {}

// =============================================================================
// Routes store
// =============================================================================

pub struct RoutesStore {
    sources: BTreeMap<String, Arc<SourceCache>>,
    neighbors: Arc<dyn NeighborsStore>,
    pools: Arc<Pools>,
    refresh_interval: Duration,
    /// Maximum number of concurrent refreshes in `refresh_all` (0 = unlimited)
    refresh_parallelism: usize,
}

impl RoutesStore {
    /// Create the store for all configured sources.
    ///
    /// `client_for` provides the API client of each source; every source gets its own
    /// backend instance of the configured kind.
    pub fn new<F>(
        config: &GlassConfig,
        neighbors: Arc<dyn NeighborsStore>,
        pools: Arc<Pools>,
        client_for: F,
    ) -> Result<Self>
    where
        F: Fn(&SourceConfig) -> Result<Arc<dyn SourceClient>>,
    {
        config.validate()?;

        let mut sources = Vec::with_capacity(config.sources.len());
        for source in &config.sources {
            let client = client_for(source)?;
            sources.push(SourceCache::new(
                source.clone(),
                client,
                config.backend.build(),
                Arc::clone(&pools),
            ));
        }

        let mut store = Self::from_sources(sources, neighbors, pools);
        store.refresh_interval = config.refresh_interval;
        store.refresh_parallelism = config.refresh_parallelism;
        Ok(store)
    }

    /// Create the store from prepared source caches. Of several caches with the same ID
    /// only the first is kept.
    pub fn from_sources(
        sources: Vec<SourceCache>,
        neighbors: Arc<dyn NeighborsStore>,
        pools: Arc<Pools>,
    ) -> Self {
        let mut by_id = BTreeMap::new();
        for source in sources {
            if by_id.contains_key(source.id()) {
                warn!("Ignoring duplicate source {}", source.id());
                continue;
            }
            by_id.insert(source.id().to_string(), Arc::new(source));
        }

        Self {
            sources: by_id,
            neighbors,
            pools,
            refresh_interval: crate::config::DEFAULT_REFRESH_INTERVAL,
            refresh_parallelism: crate::config::DEFAULT_REFRESH_PARALLELISM,
        }
    }

    pub fn with_refresh_parallelism(mut self, parallelism: usize) -> Self {
        self.refresh_parallelism = parallelism;
        self
    }

    pub fn with_refresh_interval(mut self, interval: Duration) -> Self {
        self.refresh_interval = interval;
        self
    }

    pub fn source_ids(&self) -> Vec<String> {
        self.sources.keys().cloned().collect()
    }

    pub fn source(&self, source_id: &str) -> Option<&Arc<SourceCache>> {
        self.sources.get(source_id)
    }

    pub fn source_state(&self, source_id: &str) -> Option<SourceState> {
        self.sources.get(source_id).map(|source| source.state())
    }

    pub fn pools(&self) -> &Arc<Pools> {
        &self.pools
    }

    fn refresh_interval_for(&self, source: &SourceCache) -> Duration {
        source
            .config()
            .refresh_interval
            .unwrap_or(self.refresh_interval)
    }

    fn source_or_err(&self, source_id: &str) -> Result<&Arc<SourceCache>, StoreError> {
        self.sources
            .get(source_id)
            .ok_or_else(|| StoreError::UnknownSource(source_id.to_string()))
    }

    // -------------------------------------------------------------------------
    // Refresh state
    // -------------------------------------------------------------------------

    pub fn refresh_started(&self, source_id: &str) -> Result<(), StoreError> {
        self.source_or_err(source_id)?
            .update_state(SourceState::started);
        Ok(())
    }

    /// Mark a refresh as successful, recording the routes currently stored
    pub async fn refresh_success(&self, source_id: &str) -> Result<(), StoreError> {
        let source = self.source_or_err(source_id)?;
        let count = source.backend().count_routes().await;
        source.update_state(|state| state.succeeded(count, None));
        Ok(())
    }

    pub fn refresh_error(&self, source_id: &str, error: impl ToString) -> Result<(), StoreError> {
        self.source_or_err(source_id)?
            .update_state(|state| state.failed(error.to_string()));
        Ok(())
    }

    // -------------------------------------------------------------------------
    // Refresh scheduling
    // -------------------------------------------------------------------------

    fn refresh_permits(&self) -> Option<Arc<Semaphore>> {
        match self.refresh_parallelism {
            0 => None,
            n => Some(Arc::new(Semaphore::new(n))),
        }
    }

    /// Spawn one refresh task per source.
    ///
    /// Each task refreshes its source immediately and then once per refresh interval,
    /// until `shutdown` is cancelled. A refresh in progress is not interrupted.
    pub fn start(self: &Arc<Self>, shutdown: CancellationToken) -> Vec<JoinHandle<()>> {
        self.sources
            .values()
            .map(|source| {
                let interval = self.refresh_interval_for(source);
                info!(
                    "Scheduling refresh of {} every {}",
                    source.id(),
                    humantime::format_duration(interval)
                );
                tokio::spawn(refresh_loop(Arc::clone(source), interval, shutdown.clone()))
            })
            .collect()
    }

    /// Refresh every source once, concurrently
    pub async fn refresh_all(&self) -> Vec<(String, Result<RoutesCount>)> {
        let permits = self.refresh_permits();

        let refreshes = self.sources.values().map(|source| {
            let permits = permits.clone();
            async move {
                let _permit = match permits {
                    Some(permits) => permits.acquire_owned().await.ok(),
                    None => None,
                };
                (source.id().to_string(), source.refresh().await)
            }
        });

        join_all(refreshes).await
    }

    // -------------------------------------------------------------------------
    // Queries
    // -------------------------------------------------------------------------

    /// Route counts per source and in total. Never fails.
    pub async fn stats(&self) -> RoutesStoreStats {
        let counts = join_all(
            self.sources
                .values()
                .map(|source| source.backend().count_routes()),
        )
        .await;

        let mut total_routes = RoutesCount::default();
        let sources = self
            .sources
            .values()
            .zip(counts)
            .map(|(source, routes)| {
                total_routes += routes;
                SourceStats {
                    id: source.id().to_string(),
                    name: source.name().to_string(),
                    routes,
                    state: source.state(),
                }
            })
            .collect();

        RoutesStoreStats {
            sources,
            total_routes,
            pools: self.pools.stats(),
        }
    }

    /// Routes of all sources whose network starts with `query`
    pub async fn lookup_prefix(&self, query: &str) -> Result<Vec<LookupRoute>, StoreError> {
        let lookups = self.sources.values().map(|source| async move {
            (source.id(), source.backend().lookup_prefix(query).await)
        });
        merge_results(join_all(lookups).await)
    }

    /// Routes learned from the given neighbors, grouped by source ID.
    ///
    /// Only sources with at least one neighbor are queried.
    pub async fn lookup_prefix_for_neighbors(
        &self,
        neighbors: &NeighborsLookupResults,
    ) -> Result<Vec<LookupRoute>, StoreError> {
        let lookups = self
            .sources
            .values()
            .filter_map(|source| {
                let ids: Vec<String> = neighbors
                    .get(source.id())?
                    .iter()
                    .map(|neighbor| neighbor.id.clone())
                    .collect();
                if ids.is_empty() {
                    return None;
                }
                Some((source, ids))
            })
            .map(|(source, ids)| async move {
                (
                    source.id(),
                    source.backend().lookup_prefix_for_neighbors(&ids).await,
                )
            });
        merge_results(join_all(lookups).await)
    }

    /// Routes learned from the neighbors matching `query` in the neighbors store
    pub async fn lookup_neighbor_routes(
        &self,
        query: &str,
    ) -> Result<Vec<LookupRoute>, StoreError> {
        let neighbors = self
            .neighbors
            .lookup_neighbors(query)
            .await
            .map_err(|e| StoreError::Neighbors(e.to_string()))?;
        self.lookup_prefix_for_neighbors(&neighbors).await
    }
}

fn merge_results(
    results: Vec<(&str, Result<Vec<LookupRoute>, BackendError>)>,
) -> Result<Vec<LookupRoute>, StoreError> {
    let queried = results.len();
    let mut routes = Vec::new();
    let mut errors = Vec::new();

    for (source_id, result) in results {
        match result {
            Ok(found) => routes.extend(found),
            Err(e) => {
                warn!("Lookup on {} failed: {}", source_id, e);
                errors.push((source_id.to_string(), e));
            }
        }
    }

    if queried > 0 && errors.len() == queried {
        return Err(StoreError::AllSourcesFailed(errors));
    }
    Ok(routes)
}

async fn refresh_loop(
    source: Arc<SourceCache>,
    period: Duration,
    shutdown: CancellationToken,
) {
    let mut ticker = tokio::time::interval(period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        tokio::select! {
            _ = shutdown.cancelled() => break,
            _ = ticker.tick() => {}
        }

        debug!("Refreshing {}", source.id());
        // Failures are recorded in the source state and retried on the next tick
        let _ = source.refresh().await;
    }

    debug!("Refresh loop of {} stopped", source.id());
}
