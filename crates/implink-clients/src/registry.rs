//! ClientRegistry (C5): keyed dictionary of live `ClientAdapter`s,
//! upsert-preserving across refreshes.

use std::{collections::HashMap, sync::Arc};

use implink_common::types::{ClientKind, ClientProfile};
use implink_metrics::{gauge, registry as registry_metrics};

use crate::{
    adapter::ClientAdapter,
    impv1::ImpV1Adapter,
    stub::StubAdapter,
    vendor::VendorAdapter,
};

struct Entry {
    profile: ClientProfile,
    adapter: Arc<dyn ClientAdapter>,
}

/// Case-insensitive-keyed collection of adapters, serialized under a
/// single mutex. Upserting a profile equal field-wise to the stored one
/// leaves the existing adapter instance untouched; any other upsert
/// constructs a fresh adapter and surfaces the displaced one for the
/// caller to dispose.
pub struct ClientRegistry {
    entries: std::sync::Mutex<HashMap<String, Entry>>,
}

impl Default for ClientRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl ClientRegistry {
    #[must_use]
    pub fn new() -> Self {
        Self {
            entries: std::sync::Mutex::new(HashMap::new()),
        }
    }

    /// Upserts one profile. Returns the displaced adapter when the stored
    /// profile differed (or there was none), or `None` when the incoming
    /// profile was field-wise equal to what's already stored.
    pub fn upsert(&self, profile: ClientProfile) -> Option<Arc<dyn ClientAdapter>> {
        let key = normalize_key(&profile.id);
        let mut entries = self.entries.lock().unwrap_or_else(|e| e.into_inner());

        if let Some(existing) = entries.get(&key)
            && existing.profile == profile
        {
            return None;
        }

        let adapter = build_adapter(profile.clone());
        let displaced = entries
            .insert(key, Entry { profile, adapter })
            .map(|displaced| displaced.adapter);
        gauge!(registry_metrics::CLIENTS_ACTIVE).set(entries.len() as f64);
        displaced
    }

    /// Reconciles the registry against a fresh snapshot: entries absent
    /// from `snapshot` are removed and returned alongside any adapters
    /// displaced by a changed profile; the registry's key set equals
    /// `snapshot`'s ids afterward.
    pub fn upsert_many(&self, snapshot: Vec<ClientProfile>) -> Vec<Arc<dyn ClientAdapter>> {
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
                    removed.push(entry.adapter);
                }
            }
        }

        for profile in snapshot {
            if let Some(displaced) = self.upsert(profile) {
                removed.push(displaced);
            }
        }

        removed
    }

    #[must_use]
    pub fn get(&self, id: &str) -> Option<Arc<dyn ClientAdapter>> {
        self.entries
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .get(&normalize_key(id))
            .map(|e| Arc::clone(&e.adapter))
    }

    /// Identical to [`Self::get`] — Rust's `Option`-returning lookup already
    /// covers the "does it exist" question a throwing `get` plus a
    /// non-throwing `tryGet` served in the source.
    #[must_use]
    pub fn try_get(&self, id: &str) -> Option<Arc<dyn ClientAdapter>> {
        self.get(id)
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
    pub fn values(&self) -> Vec<Arc<dyn ClientAdapter>> {
        self.entries
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .values()
            .map(|e| Arc::clone(&e.adapter))
            .collect()
    }

    #[must_use]
    pub fn count(&self) -> usize {
        self.entries.lock().unwrap_or_else(|e| e.into_inner()).len()
    }
}

#[must_use]
pub fn normalize_key(id: &str) -> String {
    id.to_ascii_lowercase()
}

fn build_adapter(profile: ClientProfile) -> Arc<dyn ClientAdapter> {
    match profile.kind {
        ClientKind::ImpV1 => Arc::new(ImpV1Adapter::new(profile)),
        ClientKind::Twitter | ClientKind::Facebook => Arc::new(VendorAdapter::new(profile)),
        ClientKind::Stub => Arc::new(StubAdapter::new(profile)),
    }
}
