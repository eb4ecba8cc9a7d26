//! Process-wide wiring: one shared `ClientRegistry`, one `RouterRegistry` +
//! `RefreshController` per direction, and the `AppState` each axum listener
//! closes over.

use std::{sync::Arc, time::Duration};

use implink_clients::ClientRegistry;
use implink_common::types::Direction;
use implink_metrics::MetricsHandle;
use implink_profiles::{ProfileStore, file::FileProfileStore, memory::MemoryProfileStore};
use implink_router::{RefreshController, RouterRegistry};

use crate::config::{DatabaseKind, ImplinkConfig};

/// One direction's routing engine: its own route registry and refresh
/// loop, sharing the process-wide client registry.
pub struct DirectionInstance {
    pub direction: Direction,
    pub routers: Arc<RouterRegistry>,
    pub refresh: Arc<RefreshController>,
}

/// Everything an axum handler needs for one listener.
#[derive(Clone)]
pub struct AppState {
    pub instance: Arc<DirectionInstance>,
    pub clients: Arc<ClientRegistry>,
    pub response_timeout: Duration,
    pub metrics_handle: Option<MetricsHandle>,
}

/// Builds the `ProfileStore` named by `config.database_kind`.
///
/// `MySQL`/`Postgres` are external collaborators per the core's scope (§1:
/// "the profile storage backend ... only the query contract is fixed") and
/// are rejected here rather than silently downgraded to an empty store.
pub fn build_profile_store(config: &ImplinkConfig) -> anyhow::Result<Arc<dyn ProfileStore>> {
    match config.database_kind {
        DatabaseKind::None => Ok(Arc::new(MemoryProfileStore::default())),
        DatabaseKind::File => Ok(Arc::new(FileProfileStore::new(&config.database_connection))),
        DatabaseKind::MySql | DatabaseKind::Postgres => anyhow::bail!(
            "database_kind {:?} requires an external profile-store backend; \
             only None and File are implemented by this core",
            config.database_kind
        ),
    }
}

pub fn build_direction_instance(
    store: Arc<dyn ProfileStore>,
    clients: Arc<ClientRegistry>,
    direction: Direction,
    wait_on_forward: bool,
    refresh_interval: Duration,
) -> Arc<DirectionInstance> {
    let routers = Arc::new(RouterRegistry::new(wait_on_forward));
    let refresh = Arc::new(RefreshController::new(
        store,
        Arc::clone(&clients),
        Arc::clone(&routers),
        direction,
        refresh_interval,
    ));
    Arc::new(DirectionInstance {
        direction,
        routers,
        refresh,
    })
}
