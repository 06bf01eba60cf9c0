#![deny(clippy::unwrap_used)]
#![deny(clippy::expect_used)]

//! Routeglass - a BGP looking glass backend
//!
//! Routeglass keeps a cache of the routes of several routing sources (route servers) in
//! memory, refreshes each source periodically in the background, and answers prefix and
//! neighbor lookups across all sources. It can be used as a command-line application or
//! as a library.
//!
//! # Feature Flags
//!
//! | Feature | Description | Key Dependencies |
//! |---------|-------------|------------------|
//! | `snapshot` | Load routes from JSON snapshots, local or remote | `oneio` |
//! | `display` | Table rendering of lookup results | `tabled`, `chrono-humanize` |
//! | `cli` | The `routeglass` binary | All above + `clap`, `tracing-subscriber` |
//!
//! ```toml
//! # Library only, bring your own source clients
//! routeglass = { version = "0.1", default-features = false }
//!
//! # Default (CLI binary)
//! routeglass = "0.1"
//! ```
//!
//! # Architecture
//!
//! - **[`api`]**: route, neighbor and pagination types
//! - **[`pools`]**: interning pools deduplicating AS paths and communities
//! - **[`store`]**: route backends, per-source caches and the routes store
//! - **[`clients`]**: source clients (requires `snapshot`)
//! - **[`config`]**: configuration management
//!
//! # Quick Start
//!
//! ```rust,ignore
//! use routeglass::{clients, GlassConfig, NoNeighbors, Pools, RoutesStore};
//! use std::sync::Arc;
//! use tokio_util::sync::CancellationToken;
//!
//! let config = GlassConfig::new(&None)?;
//! let store = Arc::new(RoutesStore::new(
//!     &config,
//!     Arc::new(NoNeighbors),
//!     Arc::new(Pools::new()),
//!     |source| clients::client_for(&config, source),
//! )?);
//!
//! let shutdown = CancellationToken::new();
//! let tasks = store.start(shutdown.clone());
//!
//! let routes = store.lookup_prefix("193.200.").await?;
//! let (page, pagination) = routeglass::paginate(&routes, 0, 50);
//! ```

pub mod api;
pub mod config;
pub mod pools;
pub mod store;
pub mod utils;

#[cfg(feature = "snapshot")]
pub mod clients;

#[cfg(feature = "display")]
pub mod display;

// =============================================================================
// Data model
// =============================================================================

pub use api::{
    paginate, BgpInfo, Community, LargeCommunity, LookupRoute, Neighbor,
    NeighborsLookupResults, Pagination, Route, RouteState, RoutesCount, RoutesResponse,
};

// =============================================================================
// Configuration
// =============================================================================

pub use config::{BackendKind, GlassConfig, SourceConfig};

// =============================================================================
// Interning and storage
// =============================================================================

pub use pools::{IntList, ListPool, PoolStats, Pools, StringList};

pub use store::{
    BackendError, MemoryRoutesBackend, NeighborsStore, NoNeighbors, RefreshStatus,
    RoutesBackend, RoutesStore, RoutesStoreStats, SourceCache, SourceClient, SourceState,
    SourceStats, StoreError,
};

pub use utils::OutputFormat;

#[cfg(feature = "snapshot")]
pub use clients::SnapshotClient;
