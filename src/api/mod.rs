//! Route and neighbor data model
//!
//! These are the types exchanged between routing-source clients, route backends and the
//! routes store. A [`Route`] is what a client delivers; a [`LookupRoute`] is a route
//! annotated with the source it came from and whether it was imported or filtered, so
//! lookup results are self-describing.
//!
//! List-valued BGP attributes (AS path, communities) are held as shared slices
//! (`Arc<[T]>`). After import they point into the interning pools, so structurally equal
//! lists across the whole cache share a single allocation.

pub mod pagination;

pub use pagination::{paginate, Pagination};

use ipnet::IpNet;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::net::{IpAddr, Ipv4Addr};
use std::ops::{Add, AddAssign};
use std::sync::Arc;

// =============================================================================
// Communities
// =============================================================================

/// Standard BGP community (RFC 1997), `asn:value`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Community(pub u32, pub u32);

impl fmt::Display for Community {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.0, self.1)
    }
}

/// Large BGP community (RFC 8092), `global:local1:local2`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct LargeCommunity(pub u32, pub u32, pub u32);

impl fmt::Display for LargeCommunity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}:{}", self.0, self.1, self.2)
    }
}

// =============================================================================
// Routes
// =============================================================================

/// BGP attributes of a route
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BgpInfo {
    /// Origin attribute (IGP, EGP, incomplete)
    #[serde(default)]
    pub origin: String,

    /// AS path in announcement order
    #[serde(default = "empty_list")]
    pub as_path: Arc<[u32]>,

    pub next_hop: IpAddr,

    #[serde(default = "empty_list")]
    pub communities: Arc<[Community]>,

    #[serde(default = "empty_list")]
    pub large_communities: Arc<[LargeCommunity]>,

    /// Extended communities in textual `type:a:b` form
    #[serde(default = "empty_list")]
    pub ext_communities: Arc<[String]>,

    #[serde(default)]
    pub local_pref: u32,

    #[serde(default)]
    pub med: u32,
}

fn empty_list<T>() -> Arc<[T]> {
    Arc::from(Vec::new())
}

impl Default for BgpInfo {
    fn default() -> Self {
        Self {
            origin: String::new(),
            as_path: empty_list(),
            next_hop: IpAddr::V4(Ipv4Addr::UNSPECIFIED),
            communities: empty_list(),
            large_communities: empty_list(),
            ext_communities: empty_list(),
            local_pref: 0,
            med: 0,
        }
    }
}

impl BgpInfo {
    /// Origin AS, i.e. the last element of the AS path
    pub fn origin_asn(&self) -> Option<u32> {
        self.as_path.last().copied()
    }
}

/// One network prefix as announced to (or filtered by) a routing source
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Route {
    pub id: String,
    pub network: IpNet,
    /// Neighbor (BGP peer) the route was learned from
    pub neighbor_id: String,
    pub gateway: IpAddr,
    #[serde(default)]
    pub interface: String,
    #[serde(default)]
    pub metric: u32,
    /// Seconds since the route was learned
    #[serde(default)]
    pub age: u64,
    #[serde(default)]
    pub primary: bool,
    #[serde(default)]
    pub bgp: BgpInfo,
}

/// Whether a route was accepted into the source's table or rejected by policy
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RouteState {
    Imported,
    Filtered,
}

impl fmt::Display for RouteState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RouteState::Imported => write!(f, "imported"),
            RouteState::Filtered => write!(f, "filtered"),
        }
    }
}

/// A route annotated with the source it was seen on
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LookupRoute {
    #[serde(flatten)]
    pub route: Route,
    pub state: RouteState,
    pub source_id: String,
    pub source_name: String,
}

impl LookupRoute {
    /// Textual network representation used for prefix lookups
    pub fn network(&self) -> String {
        self.route.network.to_string()
    }
}

/// Snapshot of a source's routing table as delivered by its API client
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoutesResponse {
    #[serde(default)]
    pub imported: Vec<Route>,
    #[serde(default)]
    pub filtered: Vec<Route>,
}

/// Number of imported and filtered routes
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoutesCount {
    pub imported: usize,
    pub filtered: usize,
}

impl RoutesCount {
    pub fn total(&self) -> usize {
        self.imported + self.filtered
    }
}

impl Add for RoutesCount {
    type Output = RoutesCount;

    fn add(self, rhs: Self) -> Self::Output {
        RoutesCount {
            imported: self.imported + rhs.imported,
            filtered: self.filtered + rhs.filtered,
        }
    }
}

impl AddAssign for RoutesCount {
    fn add_assign(&mut self, rhs: Self) {
        self.imported += rhs.imported;
        self.filtered += rhs.filtered;
    }
}

// =============================================================================
// Neighbors
// =============================================================================

/// A BGP peer of a routing source
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Neighbor {
    pub id: String,
    #[serde(default)]
    pub address: Option<IpAddr>,
    #[serde(default)]
    pub asn: u32,
    #[serde(default)]
    pub description: String,
}

impl Neighbor {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            ..Default::default()
        }
    }
}

/// Neighbors matching a query, grouped by source ID
pub type NeighborsLookupResults = HashMap<String, Vec<Neighbor>>;
