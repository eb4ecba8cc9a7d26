//! In-memory `ProfileStore` used by tests and by `implink doctor`-style
//! dry runs where no backing directory is configured.

use std::sync::Mutex;

use {
    async_trait::async_trait,
    implink_common::types::{ClientProfile, Direction, RouteProfile},
};

use crate::{ProfileStore, Result};

/// Holds a fixed set of profiles behind a mutex so tests can mutate the
/// snapshot between `RefreshController` ticks.
#[derive(Default)]
pub struct MemoryProfileStore {
    clients: Mutex<Vec<ClientProfile>>,
    routes: Mutex<Vec<RouteProfile>>,
}

impl MemoryProfileStore {
    #[must_use]
    pub fn new(clients: Vec<ClientProfile>, routes: Vec<RouteProfile>) -> Self {
        Self {
            clients: Mutex::new(clients),
            routes: Mutex::new(routes),
        }
    }

    /// Replaces the client snapshot returned by subsequent `query_clients`
    /// calls.
    pub fn set_clients(&self, clients: Vec<ClientProfile>) {
        *self.clients.lock().unwrap_or_else(|e| e.into_inner()) = clients;
    }

    /// Replaces the route snapshot returned by subsequent `query_routes`
    /// calls.
    pub fn set_routes(&self, routes: Vec<RouteProfile>) {
        *self.routes.lock().unwrap_or_else(|e| e.into_inner()) = routes;
    }
}

#[async_trait]
impl ProfileStore for MemoryProfileStore {
    async fn query_clients(&self) -> Result<Vec<ClientProfile>> {
        Ok(self.clients.lock().unwrap_or_else(|e| e.into_inner()).clone())
    }

    async fn query_routes(&self, direction: Direction) -> Result<Vec<RouteProfile>> {
        Ok(self
            .routes
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .iter()
            .filter(|r| r.direction == direction)
            .cloned()
            .collect())
    }
}
