//! Neighbors store contract
//!
//! The neighbors store indexes the BGP peers of every source. The routes store only
//! consumes it to scope a lookup to the routes learned from matching neighbors.

use crate::api::NeighborsLookupResults;
use anyhow::Result;
use async_trait::async_trait;

#[async_trait]
pub trait NeighborsStore: Send + Sync {
    /// Neighbors matching `query`, grouped by source ID
    async fn lookup_neighbors(&self, query: &str) -> Result<NeighborsLookupResults>;
}

/// Neighbors store without any neighbors
#[derive(Debug, Clone, Copy, Default)]
pub struct NoNeighbors;

#[async_trait]
impl NeighborsStore for NoNeighbors {
    async fn lookup_neighbors(&self, _query: &str) -> Result<NeighborsLookupResults> {
        Ok(NeighborsLookupResults::new())
    }
}
