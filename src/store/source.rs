//! Per-source route cache
//!
//! A [`SourceCache`] keeps one routing source's backend up to date. Each refresh fetches a
//! snapshot through the source's [`SourceClient`], interns the list-valued attributes of
//! every route, and replaces the backend's route set in one step. Failures are recorded
//! in the [`SourceState`] and leave the previously stored routes untouched.

use crate::api::{LookupRoute, Route, RouteState, RoutesCount, RoutesResponse};
use crate::config::SourceConfig;
use crate::pools::Pools;
use crate::store::backend::RoutesBackend;
use anyhow::{anyhow, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::sync::{Arc, PoisonError, RwLock};
use std::time::{Duration, Instant};
use tracing::{info, warn};

/// API client of a routing source
#[async_trait]
pub trait SourceClient: Send + Sync {
    /// Fetch the current imported and filtered routes.
    ///
    /// Any timeout is enforced by the client; a timeout is reported as an error.
    async fn fetch_routes(&self) -> Result<RoutesResponse>;
}

// =============================================================================
// Refresh state
// =============================================================================

/// Refresh status of a source
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum RefreshStatus {
    /// No refresh has run yet
    #[default]
    Idle,
    Refreshing,
    Success,
    Error,
}

impl std::fmt::Display for RefreshStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RefreshStatus::Idle => write!(f, "idle"),
            RefreshStatus::Refreshing => write!(f, "refreshing"),
            RefreshStatus::Success => write!(f, "success"),
            RefreshStatus::Error => write!(f, "error"),
        }
    }
}

/// Refresh health of a source
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SourceState {
    pub status: RefreshStatus,
    /// Time of the last successful refresh
    pub last_refresh: Option<DateTime<Utc>>,
    pub last_refresh_duration: Option<Duration>,
    pub last_error: Option<String>,
    /// Number of consecutive failed refreshes
    pub error_count: u32,
    /// Routes stored by the last successful refresh
    pub routes: RoutesCount,
}

impl SourceState {
    pub(crate) fn started(&mut self) {
        self.status = RefreshStatus::Refreshing;
    }

    pub(crate) fn succeeded(&mut self, routes: RoutesCount, duration: Option<Duration>) {
        self.status = RefreshStatus::Success;
        self.last_refresh = Some(Utc::now());
        self.last_refresh_duration = duration;
        self.last_error = None;
        self.error_count = 0;
        self.routes = routes;
    }

    pub(crate) fn failed(&mut self, error: String) {
        self.status = RefreshStatus::Error;
        self.last_error = Some(error);
        self.error_count = self.error_count.saturating_add(1);
    }
}

// =============================================================================
// Source cache
// =============================================================================

/// Route cache of one routing source
pub struct SourceCache {
    config: SourceConfig,
    client: Arc<dyn SourceClient>,
    backend: Arc<dyn RoutesBackend>,
    pools: Arc<Pools>,
    state: RwLock<SourceState>,
}

impl SourceCache {
    pub fn new(
        config: SourceConfig,
        client: Arc<dyn SourceClient>,
        backend: Arc<dyn RoutesBackend>,
        pools: Arc<Pools>,
    ) -> Self {
        Self {
            config,
            client,
            backend,
            pools,
            state: RwLock::new(SourceState::default()),
        }
    }

    pub fn id(&self) -> &str {
        &self.config.id
    }

    pub fn name(&self) -> &str {
        &self.config.name
    }

    pub fn config(&self) -> &SourceConfig {
        &self.config
    }

    pub fn backend(&self) -> &Arc<dyn RoutesBackend> {
        &self.backend
    }

    /// Current refresh state
    pub fn state(&self) -> SourceState {
        self.state
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Apply `f` to the refresh state
    pub(crate) fn update_state(&self, f: impl FnOnce(&mut SourceState)) {
        let mut state = self.state.write().unwrap_or_else(PoisonError::into_inner);
        f(&mut state);
    }

    /// Fetch a fresh snapshot from the source and replace the stored routes.
    ///
    /// On error the refresh state is set to [`RefreshStatus::Error`] and the backend keeps
    /// its previous contents.
    pub async fn refresh(&self) -> Result<RoutesCount> {
        self.update_state(SourceState::started);
        let started = Instant::now();

        let response = match self.client.fetch_routes().await {
            Ok(response) => response,
            Err(e) => {
                let error = format!("Failed to fetch routes: {}", e);
                return Err(self.refresh_failed(error));
            }
        };

        let routes = self.to_lookup_routes(response);
        let count = count_routes(&routes);

        if let Err(e) = self.backend.set_routes(self.id(), routes).await {
            return Err(self.refresh_failed(e.to_string()));
        }

        let duration = started.elapsed();
        self.update_state(|state| state.succeeded(count, Some(duration)));
        info!(
            "Refreshed {}: {} imported, {} filtered routes in {:.2?}",
            self.id(),
            count.imported,
            count.filtered,
            duration
        );

        Ok(count)
    }

    fn refresh_failed(&self, error: String) -> anyhow::Error {
        let mut error_count = 0;
        self.update_state(|state| {
            state.failed(error.clone());
            error_count = state.error_count;
        });
        warn!(
            "Refresh of {} failed ({} consecutive errors): {}",
            self.id(),
            error_count,
            error
        );
        anyhow!(error)
    }

    /// Convert a snapshot into lookup routes, imported routes first
    pub fn to_lookup_routes(&self, response: RoutesResponse) -> Vec<LookupRoute> {
        let RoutesResponse { imported, filtered } = response;
        let mut routes = Vec::with_capacity(imported.len() + filtered.len());
        routes.extend(
            imported
                .into_iter()
                .map(|r| self.to_lookup_route(r, RouteState::Imported)),
        );
        routes.extend(
            filtered
                .into_iter()
                .map(|r| self.to_lookup_route(r, RouteState::Filtered)),
        );
        routes
    }

    fn to_lookup_route(&self, route: Route, state: RouteState) -> LookupRoute {
        let bgp = self.pools.intern_bgp(route.bgp);
        LookupRoute {
            route: Route { bgp, ..route },
            state,
            source_id: self.config.id.clone(),
            source_name: self.config.name.clone(),
        }
    }
}

fn count_routes(routes: &[LookupRoute]) -> RoutesCount {
    let imported = routes
        .iter()
        .filter(|r| r.state == RouteState::Imported)
        .count();
    RoutesCount {
        imported,
        filtered: routes.len() - imported,
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::api::BgpInfo;
    use crate::store::backend::BackendError;
    use crate::store::memory::MemoryRoutesBackend;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;

    pub(crate) fn route(id: &str, network: &str, neighbor_id: &str, as_path: Vec<u32>) -> Route {
        Route {
            id: id.to_string(),
            network: network.parse().unwrap(),
            neighbor_id: neighbor_id.to_string(),
            gateway: "192.0.2.1".parse().unwrap(),
            interface: String::new(),
            metric: 0,
            age: 0,
            primary: true,
            bgp: BgpInfo {
                as_path: Arc::from(as_path),
                ..Default::default()
            },
        }
    }

    /// Client returning scripted responses, one per call; repeats the last one
    pub(crate) struct ScriptedClient {
        responses: Mutex<Vec<Result<RoutesResponse, String>>>,
        pub(crate) calls: AtomicUsize,
    }

    impl ScriptedClient {
        pub(crate) fn new(responses: Vec<Result<RoutesResponse, String>>) -> Self {
            Self {
                responses: Mutex::new(responses),
                calls: AtomicUsize::new(0),
            }
        }
    }

    #[async_trait]
    impl SourceClient for ScriptedClient {
        async fn fetch_routes(&self) -> Result<RoutesResponse> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            let mut responses = self.responses.lock().unwrap();
            let next = if responses.len() > 1 {
                responses.remove(0)
            } else {
                responses[0].clone()
            };
            next.map_err(|e| anyhow!(e))
        }
    }

    /// Backend whose commits always fail
    pub(crate) struct BrokenBackend;

    #[async_trait]
    impl RoutesBackend for BrokenBackend {
        async fn set_routes(
            &self,
            source_id: &str,
            _routes: Vec<LookupRoute>,
        ) -> Result<(), BackendError> {
            Err(BackendError::Commit {
                source_id: source_id.to_string(),
                reason: "disk full".to_string(),
            })
        }

        async fn count_routes(&self) -> RoutesCount {
            RoutesCount::default()
        }

        async fn lookup_prefix(&self, _prefix: &str) -> Result<Vec<LookupRoute>, BackendError> {
            Err(BackendError::Unavailable("broken".to_string()))
        }

        async fn lookup_prefix_for_neighbors(
            &self,
            _neighbor_ids: &[String],
        ) -> Result<Vec<LookupRoute>, BackendError> {
            Err(BackendError::Unavailable("broken".to_string()))
        }
    }

    fn snapshot() -> RoutesResponse {
        RoutesResponse {
            imported: vec![
                route("r1", "193.200.230.0/24", "n1", vec![31078, 8447]),
                route("r2", "31.220.136.0/21", "n1", vec![31078, 8447]),
            ],
            filtered: vec![route("r3", "10.0.0.0/8", "n2", vec![64512])],
        }
    }

    fn source_config() -> SourceConfig {
        SourceConfig::new("rs1", "Route Server 1")
    }

    #[tokio::test]
    async fn test_refresh_success() {
        let backend = Arc::new(MemoryRoutesBackend::new());
        let cache = SourceCache::new(
            source_config(),
            Arc::new(ScriptedClient::new(vec![Ok(snapshot())])),
            backend.clone(),
            Arc::new(Pools::new()),
        );
        assert_eq!(cache.state().status, RefreshStatus::Idle);

        let count = cache.refresh().await.unwrap();
        assert_eq!(count.imported, 2);
        assert_eq!(count.filtered, 1);

        let state = cache.state();
        assert_eq!(state.status, RefreshStatus::Success);
        assert_eq!(state.error_count, 0);
        assert!(state.last_refresh.is_some());
        assert_eq!(state.routes, count);

        let routes = backend.lookup_prefix("").await.unwrap();
        assert_eq!(routes.len(), 3);
        assert!(routes.iter().all(|r| r.source_id == "rs1"));
        assert!(routes.iter().all(|r| r.source_name == "Route Server 1"));
        assert_eq!(routes[2].state, RouteState::Filtered);
    }

    #[tokio::test]
    async fn test_refresh_interns_as_paths() {
        let pools = Arc::new(Pools::new());
        let backend = Arc::new(MemoryRoutesBackend::new());
        let cache = SourceCache::new(
            source_config(),
            Arc::new(ScriptedClient::new(vec![Ok(snapshot())])),
            backend.clone(),
            pools.clone(),
        );
        cache.refresh().await.unwrap();

        let routes = backend.lookup_prefix("").await.unwrap();
        assert!(Arc::ptr_eq(
            &routes[0].route.bgp.as_path,
            &routes[1].route.bgp.as_path
        ));
        assert_eq!(pools.stats().as_paths, 2);
    }

    #[tokio::test]
    async fn test_client_failure_keeps_previous_routes() {
        let backend = Arc::new(MemoryRoutesBackend::new());
        let client = Arc::new(ScriptedClient::new(vec![
            Ok(snapshot()),
            Err("connection refused".to_string()),
        ]));
        let cache = SourceCache::new(
            source_config(),
            client,
            backend.clone(),
            Arc::new(Pools::new()),
        );

        cache.refresh().await.unwrap();
        assert!(cache.refresh().await.is_err());
        assert!(cache.refresh().await.is_err());

        let state = cache.state();
        assert_eq!(state.status, RefreshStatus::Error);
        assert_eq!(state.error_count, 2);
        assert!(state
            .last_error
            .as_deref()
            .unwrap()
            .contains("connection refused"));
        // The last successful import is still reported
        assert!(state.last_refresh.is_some());

        assert_eq!(backend.count_routes().await.total(), 3);
        assert_eq!(backend.lookup_prefix("193.200.").await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_error_count_resets_on_success() {
        let client = Arc::new(ScriptedClient::new(vec![
            Err("timeout".to_string()),
            Ok(snapshot()),
        ]));
        let cache = SourceCache::new(
            source_config(),
            client,
            Arc::new(MemoryRoutesBackend::new()),
            Arc::new(Pools::new()),
        );

        assert!(cache.refresh().await.is_err());
        assert_eq!(cache.state().error_count, 1);

        cache.refresh().await.unwrap();
        let state = cache.state();
        assert_eq!(state.status, RefreshStatus::Success);
        assert_eq!(state.error_count, 0);
        assert!(state.last_error.is_none());
    }

    #[tokio::test]
    async fn test_commit_failure_is_recorded() {
        let cache = SourceCache::new(
            source_config(),
            Arc::new(ScriptedClient::new(vec![Ok(snapshot())])),
            Arc::new(BrokenBackend),
            Arc::new(Pools::new()),
        );

        let err = cache.refresh().await.unwrap_err();
        assert!(err.to_string().contains("disk full"));

        let state = cache.state();
        assert_eq!(state.status, RefreshStatus::Error);
        assert_eq!(state.error_count, 1);
        assert!(state.last_refresh.is_none());
    }
}
