//! Route storage
//!
//! - [`backend`]: the storage contract every route backend implements
//! - [`memory`]: the in-memory backend
//! - [`source`]: per-source caches kept fresh from the source's API
//! - [`neighbors`]: the neighbors store contract used to scope lookups
//! - [`routes`]: the routes store aggregating all sources and scheduling refreshes

pub mod backend;
pub mod memory;
pub mod neighbors;
pub mod routes;
pub mod source;

pub use backend::{BackendError, RoutesBackend};
pub use memory::MemoryRoutesBackend;
pub use neighbors::{NeighborsStore, NoNeighbors};
pub use routes::{RoutesStore, RoutesStoreStats, SourceStats, StoreError};
pub use source::{RefreshStatus, SourceCache, SourceClient, SourceState};
