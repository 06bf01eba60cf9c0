//! Interning pools shared by all route imports
//!
//! A single [`Pools`] instance is created at startup and handed to every source cache.
//! It is never cleared: BGP attribute values come from a bounded, highly repetitive
//! universe, so the pools stay small relative to what they save.

pub mod lists;

pub use lists::{IntList, ListPool, StringList};

use crate::api::{BgpInfo, Community, LargeCommunity};
use serde::Serialize;

/// Number of distinct lists held by each pool
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct PoolStats {
    pub as_paths: usize,
    pub communities: usize,
    pub large_communities: usize,
    pub ext_communities: usize,
}

/// The pools used when importing routes
#[derive(Default)]
pub struct Pools {
    pub as_paths: IntList,
    pub communities: ListPool<Community>,
    pub large_communities: ListPool<LargeCommunity>,
    pub ext_communities: StringList,
}

impl Pools {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the list-valued attributes of `bgp` with their shared instances
    pub fn intern_bgp(&self, bgp: BgpInfo) -> BgpInfo {
        BgpInfo {
            as_path: self.as_paths.acquire(bgp.as_path),
            communities: self.communities.acquire(bgp.communities),
            large_communities: self.large_communities.acquire(bgp.large_communities),
            ext_communities: self.ext_communities.acquire(bgp.ext_communities),
            ..bgp
        }
    }

    pub fn stats(&self) -> PoolStats {
        PoolStats {
            as_paths: self.as_paths.len(),
            communities: self.communities.len(),
            large_communities: self.large_communities.len(),
            ext_communities: self.ext_communities.len(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    fn bgp(as_path: Vec<u32>, communities: Vec<Community>) -> BgpInfo {
        BgpInfo {
            origin: "IGP".to_string(),
            as_path: Arc::from(as_path),
            communities: Arc::from(communities),
            ext_communities: Arc::from(vec!["rt:65000:1".to_string()]),
            ..Default::default()
        }
    }

    #[test]
    fn test_intern_bgp_shares_lists() {
        let pools = Pools::new();

        let a = pools.intern_bgp(bgp(vec![31078, 8447], vec![Community(31078, 1)]));
        let b = pools.intern_bgp(bgp(vec![31078, 8447], vec![Community(31078, 1)]));

        assert!(Arc::ptr_eq(&a.as_path, &b.as_path));
        assert!(Arc::ptr_eq(&a.communities, &b.communities));
        assert!(Arc::ptr_eq(&a.large_communities, &b.large_communities));
        assert!(Arc::ptr_eq(&a.ext_communities, &b.ext_communities));
        assert_eq!(a.origin, "IGP");
        assert_eq!(a, b);
    }

    #[test]
    fn test_pool_stats() {
        let pools = Pools::new();
        pools.intern_bgp(bgp(vec![1, 2], vec![]));
        pools.intern_bgp(bgp(vec![2, 1], vec![Community(1, 2)]));
        pools.intern_bgp(bgp(vec![1, 2], vec![Community(1, 2)]));

        let stats = pools.stats();
        assert_eq!(stats.as_paths, 2);
        assert_eq!(stats.communities, 1);
        assert_eq!(stats.large_communities, 0);
        assert_eq!(stats.ext_communities, 1);
    }
}
