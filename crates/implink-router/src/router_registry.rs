//! RouterRegistry (C7): keyed dictionary of `MessageRouter`s, the same
//! upsert discipline as `ClientRegistry`, composed with it for client
//! resolution.

use std::{collections::HashMap, sync::Arc};

use implink_clients::ClientRegistry;
use implink_common::types::RouteProfile;
use tracing::warn;

use crate::message_router::MessageRouter;

struct Entry {
    profile: RouteProfile,
    router: Arc<MessageRouter>,
}

/// Case-insensitive-keyed collection of routers, serialized under a
/// single mutex. Construction always goes through `ClientRegistry` so
/// routers resolve their clients against whatever is currently live.
pub struct RouterRegistry {
    entries: std::sync::Mutex<HashMap<String, Entry>>,
    wait_on_forward: bool,
}

impl RouterRegistry {
    #[must_use]
    pub fn new(wait_on_forward: bool) -> Self {
        Self {
            entries: std::sync::Mutex::new(HashMap::new()),
            wait_on_forward,
        }
    }

    /// Reconciles the registry against a fresh route snapshot, resolving
    /// each surviving route's clients against `clients`. Logs a warning
    /// for any client name a route references that `clients` doesn't
    /// provision. Returns the set of route ids removed by this call.
    pub fn upsert_many(&self, snapshot: Vec<RouteProfile>, clients: &ClientRegistry) -> Vec<String> {
        let keep: std::collections::HashSet<String> =
            snapshot.iter().map(|p| normalize_key(&p.id)).collect();

        let mut removed = Vec::new();
        {
            let mut entries = self.entries.lock().unwrap_or_else(|e| e.into_inner());
            let stale: Vec<String> = entries
                .keys()
                .filter(|k| !keep.contains(*k))
                .cloned()
                .collect();
            for key in stale {
                if let Some(entry) = entries.remove(&key) {
                    removed.push(entry.profile.id);
                }
            }
        }

        for profile in snapshot {
            self.upsert(profile, clients);
        }

        removed
    }

    pub fn upsert(&self, profile: RouteProfile, clients: &ClientRegistry) {
        let key = normalize_key(&profile.id);
        let mut entries = self.entries.lock().unwrap_or_else(|e| e.into_inner());

        if let Some(existing) = entries.get(&key)
            && existing.profile == profile
        {
            return;
        }

        let route_id = profile.id.clone();
        let (router, unresolved) = MessageRouter::new(profile.clone(), clients, self.wait_on_forward);
        for name in unresolved {
            warn!(route = %route_id, client = %name, "route references an unprovisioned client");
        }

        entries.insert(key, Entry {
            profile,
            router: Arc::new(router),
        });
    }

    #[must_use]
    pub fn get(&self, id: &str) -> Option<Arc<MessageRouter>> {
        self.entries
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .get(&normalize_key(id))
            .map(|e| Arc::clone(&e.router))
    }

    #[must_use]
    pub fn keys(&self) -> Vec<String> {
        self.entries
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .values()
            .map(|e| e.profile.id.clone())
            .collect()
    }

    #[must_use]
    pub fn count(&self) -> usize {
        self.entries.lock().unwrap_or_else(|e| e.into_inner()).len()
    }

    /// A dump of the currently-registered route profiles, for
    /// `/GetRoutingInfo`.
    #[must_use]
    pub fn route_dump(&self) -> Vec<RouteProfile> {
        self.entries
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .values()
            .map(|e| e.profile.clone())
            .collect()
    }
}

fn normalize_key(id: &str) -> String {
    id.to_ascii_lowercase()
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
#[path = "tests/router_registry_tests.rs"]
mod router_registry_tests;
