//! In-memory route backend
//!
//! Each source's routes live in an immutable [`RouteTable`] behind an `Arc`. Replacing a
//! source builds the new table outside of any lock and swaps the pointer under a short
//! write lock; readers clone the pointer under the read lock and scan without holding it.

use crate::api::{LookupRoute, RouteState, RoutesCount};
use crate::store::backend::{BackendError, RoutesBackend};
use async_trait::async_trait;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::debug;

/// Immutable route set of one source
struct RouteTable {
    routes: Vec<LookupRoute>,
    /// Formatted networks, parallel to `routes`
    networks: Vec<String>,
    /// Route positions by neighbor ID
    by_neighbor: HashMap<String, Vec<usize>>,
    count: RoutesCount,
}

impl RouteTable {
    fn new(routes: Vec<LookupRoute>) -> Self {
        let mut networks = Vec::with_capacity(routes.len());
        let mut by_neighbor: HashMap<String, Vec<usize>> = HashMap::new();
        let mut count = RoutesCount::default();

        for (idx, route) in routes.iter().enumerate() {
            networks.push(route.network());
            by_neighbor
                .entry(route.route.neighbor_id.clone())
                .or_default()
                .push(idx);
            match route.state {
                RouteState::Imported => count.imported += 1,
                RouteState::Filtered => count.filtered += 1,
            }
        }

        Self {
            routes,
            networks,
            by_neighbor,
            count,
        }
    }

    fn lookup_prefix(&self, prefix: &str) -> impl Iterator<Item = &LookupRoute> + '_ {
        let prefix = prefix.to_string();
        self.networks
            .iter()
            .zip(self.routes.iter())
            .filter(move |(network, _)| network.starts_with(prefix.as_str()))
            .map(|(_, route)| route)
    }

    fn lookup_neighbors<'a>(
        &'a self,
        neighbor_ids: &'a HashSet<&'a str>,
    ) -> impl Iterator<Item = &'a LookupRoute> + 'a {
        let mut positions: Vec<usize> = neighbor_ids
            .iter()
            .filter_map(|id| self.by_neighbor.get(*id))
            .flatten()
            .copied()
            .collect();
        // Keep the stored order regardless of hash iteration order
        positions.sort_unstable();
        positions.into_iter().map(move |idx| &self.routes[idx])
    }
}

/// Route backend holding every route in memory
#[derive(Default)]
pub struct MemoryRoutesBackend {
    tables: RwLock<HashMap<String, Arc<RouteTable>>>,
}

impl MemoryRoutesBackend {
    pub fn new() -> Self {
        Self::default()
    }

    async fn snapshot(&self) -> Vec<Arc<RouteTable>> {
        let tables = self.tables.read().await;
        let mut ids: Vec<&String> = tables.keys().collect();
        ids.sort();
        ids.into_iter()
            .filter_map(|id| tables.get(id).cloned())
            .collect()
    }
}

#[async_trait]
impl RoutesBackend for MemoryRoutesBackend {
    async fn set_routes(
        &self,
        source_id: &str,
        routes: Vec<LookupRoute>,
    ) -> Result<(), BackendError> {
        let table = Arc::new(RouteTable::new(routes));
        debug!(
            "Storing {} imported and {} filtered routes for {}",
            table.count.imported, table.count.filtered, source_id
        );

        let mut tables = self.tables.write().await;
        tables.insert(source_id.to_string(), table);
        Ok(())
    }

    async fn count_routes(&self) -> RoutesCount {
        let tables = self.tables.read().await;
        tables
            .values()
            .fold(RoutesCount::default(), |acc, table| acc + table.count)
    }

    async fn lookup_prefix(&self, prefix: &str) -> Result<Vec<LookupRoute>, BackendError> {
        let results = self
            .snapshot()
            .await
            .iter()
            .flat_map(|table| table.lookup_prefix(prefix).cloned().collect::<Vec<_>>())
            .collect();
        Ok(results)
    }

    async fn lookup_prefix_for_neighbors(
        &self,
        neighbor_ids: &[String],
    ) -> Result<Vec<LookupRoute>, BackendError> {
        if neighbor_ids.is_empty() {
            return Ok(Vec::new());
        }

        let ids: HashSet<&str> = neighbor_ids.iter().map(String::as_str).collect();
        let results = self
            .snapshot()
            .await
            .iter()
            .flat_map(|table| table.lookup_neighbors(&ids).cloned().collect::<Vec<_>>())
            .collect();
        Ok(results)
    }
}
