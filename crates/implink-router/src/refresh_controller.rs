//! RefreshController (C8): periodic and on-demand reconciliation of the
//! registries against a `ProfileStore` snapshot.

use std::{sync::Arc, time::Duration};

use {
    implink_clients::ClientRegistry,
    implink_common::types::{ClientProfile, Direction},
    implink_profiles::ProfileStore,
    tokio::sync::Notify,
    tracing::{error, info},
};

use crate::router_registry::RouterRegistry;

/// Drives [`ClientRegistry`] and [`RouterRegistry`] from a [`ProfileStore`]
/// on a fixed period (`0` disables the periodic tick) and on explicit
/// request. A failed query logs and leaves the previous registry state
/// untouched.
pub struct RefreshController {
    store: Arc<dyn ProfileStore>,
    clients: Arc<ClientRegistry>,
    routers: Arc<RouterRegistry>,
    direction: Direction,
    refresh_interval: Duration,
    shutdown: Notify,
}

/// A human-readable log of what one refresh tick did, returned from
/// `refresh_once` for the `/UpdateRouting` endpoint.
#[derive(Debug, Clone, Default)]
pub struct RefreshReport {
    pub clients_removed: usize,
    pub routes_removed: Vec<String>,
    pub error: Option<String>,
}

impl RefreshController {
    #[must_use]
    pub fn new(
        store: Arc<dyn ProfileStore>,
        clients: Arc<ClientRegistry>,
        routers: Arc<RouterRegistry>,
        direction: Direction,
        refresh_interval: Duration,
    ) -> Self {
        Self {
            store,
            clients,
            routers,
            direction,
            refresh_interval,
            shutdown: Notify::new(),
        }
    }

    /// Runs one reconciliation. Errors from either query are logged and
    /// leave the registries as they were; it is not possible to partially
    /// corrupt a registry from a failed tick since each query is read in
    /// full before any registry mutation happens.
    pub async fn refresh_once(&self) -> RefreshReport {
        let client_snapshot = match self.store.query_clients().await {
            Ok(snapshot) => snapshot,
            Err(e) => {
                error!(error = %e, "client profile refresh failed, keeping previous registry");
                return RefreshReport {
                    error: Some(e.to_string()),
                    ..Default::default()
                };
            },
        };

        let route_snapshot = match self.store.query_routes(self.direction).await {
            Ok(snapshot) => snapshot,
            Err(e) => {
                error!(error = %e, "route profile refresh failed, keeping previous registry");
                return RefreshReport {
                    error: Some(e.to_string()),
                    ..Default::default()
                };
            },
        };

        let enabled_clients: Vec<ClientProfile> = client_snapshot
            .into_iter()
            .filter(|p| p.enabled)
            .filter(|p| match p.check_validity() {
                Ok(()) => true,
                Err(e) => {
                    error!(client = %p.id, error = %e, "skipping invalid client profile");
                    false
                },
            })
            .collect();
        let removed_clients = self.clients.upsert_many(enabled_clients);

        let enabled_routes = route_snapshot
            .into_iter()
            .filter(|p| p.enabled)
            .filter(|p| match p.check_validity() {
                Ok(()) => true,
                Err(e) => {
                    error!(route = %p.id, error = %e, "skipping invalid route profile");
                    false
                },
            })
            .collect();
        let routes_removed = self.routers.upsert_many(enabled_routes, &self.clients);

        info!(
            clients_removed = removed_clients.len(),
            routes_removed = routes_removed.len(),
            "refresh complete"
        );

        RefreshReport {
            clients_removed: removed_clients.len(),
            routes_removed,
            error: None,
        }
    }

    /// Runs the periodic tick loop until `shutdown` fires. A `0` interval
    /// disables the loop entirely (on-demand refresh via `refresh_once`
    /// remains available).
    pub async fn run(&self) {
        if self.refresh_interval.is_zero() {
            return;
        }

        let mut interval = tokio::time::interval(self.refresh_interval);
        interval.tick().await; // first tick fires immediately; skip it, refresh_once is called explicitly at startup
        loop {
            tokio::select! {
                _ = interval.tick() => {
                    self.refresh_once().await;
                },
                () = self.shutdown.notified() => {
                    return;
                },
            }
        }
    }

    /// Interrupts a running `run()` loop promptly.
    pub fn shutdown(&self) {
        self.shutdown.notify_waiters();
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
#[path = "tests/refresh_controller_tests.rs"]
mod refresh_controller_tests;
