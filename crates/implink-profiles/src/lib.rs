//! ProfileStore (C3): a pluggable backend the router core depends on only
//! through [`ProfileStore::query_clients`] and [`ProfileStore::query_routes`].
//!
//! A snapshot is a finite, restartable sequence of freshly constructed
//! profile values per call — never shared across calls, so registries can
//! freely diff one snapshot against the next without aliasing concerns.

pub mod file;
pub mod memory;

use {
    async_trait::async_trait,
    implink_common::types::{ClientProfile, Direction, RouteProfile},
};

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("failed to read {path}: {source}")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse {path}: {source}")]
    Parse {
        path: String,
        #[source]
        source: serde_json::Error,
    },
}

pub type Result<T> = std::result::Result<T, Error>;

/// Queries client and route profile snapshots from a backing store.
///
/// Implementations must not cache results across calls — the
/// `RefreshController` relies on each call returning an independent,
/// freshly-owned snapshot to diff against the live registries.
#[async_trait]
pub trait ProfileStore: Send + Sync {
    async fn query_clients(&self) -> Result<Vec<ClientProfile>>;
    async fn query_routes(&self, direction: Direction) -> Result<Vec<RouteProfile>>;
}
