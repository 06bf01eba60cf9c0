//! Route backend contract
//!
//! A backend stores the route set of a source and answers lookups over it. The in-memory
//! [`MemoryRoutesBackend`](crate::store::MemoryRoutesBackend) is the reference
//! implementation; persistent backends implement the same trait and are selected through
//! [`BackendKind`](crate::config::BackendKind).

use crate::api::{LookupRoute, RoutesCount};
use async_trait::async_trait;

/// Storage and lookup of route sets, keyed by source ID
#[async_trait]
pub trait RoutesBackend: Send + Sync {
    /// Atomically replace every route stored for `source_id` with `routes`.
    ///
    /// Concurrent readers observe either the previous or the new set in full. On error
    /// the previous set stays intact and queryable.
    async fn set_routes(
        &self,
        source_id: &str,
        routes: Vec<LookupRoute>,
    ) -> Result<(), BackendError>;

    /// Count imported and filtered routes
    async fn count_routes(&self) -> RoutesCount;

    /// All routes whose formatted network starts with `prefix` (case-sensitive,
    /// literal string match, not CIDR containment)
    async fn lookup_prefix(&self, prefix: &str) -> Result<Vec<LookupRoute>, BackendError>;

    /// All routes learned from one of `neighbor_ids`
    async fn lookup_prefix_for_neighbors(
        &self,
        neighbor_ids: &[String],
    ) -> Result<Vec<LookupRoute>, BackendError>;
}

/// Errors reported by route backends
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BackendError {
    /// The new route set could not be committed
    Commit { source_id: String, reason: String },
    /// The backend could not be reached for a read
    Unavailable(String),
}

impl std::fmt::Display for BackendError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            BackendError::Commit { source_id, reason } => {
                write!(f, "Failed to store routes for {}: {}", source_id, reason)
            }
            BackendError::Unavailable(reason) => write!(f, "Backend unavailable: {}", reason),
        }
    }
}

impl std::error::Error for BackendError {}
