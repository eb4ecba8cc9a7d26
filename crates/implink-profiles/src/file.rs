//! Local JSON file backend: reads `ClientProfile.json` and `RouteProfile.json`
//! from a configured directory, each a JSON array of the profile schema
//! with case-insensitive property names.

use std::path::PathBuf;

use {
    async_trait::async_trait,
    implink_common::types::{ClientProfile, Direction, RouteProfile},
    serde_json::Value,
    tracing::debug,
};

use crate::{Error, ProfileStore, Result};

const CLIENT_PROFILE_FILE: &str = "ClientProfile.json";
const ROUTE_PROFILE_FILE: &str = "RouteProfile.json";

/// Known camelCase field names for each profile type, used to canonicalize
/// arbitrarily-cased JSON keys before deserializing with serde's exact
/// (case-sensitive) field matching.
const CLIENT_PROFILE_KEYS: &[&str] = &[
    "id",
    "kind",
    "baseAddress",
    "secret",
    "userAgent",
    "maxText",
    "timeout",
    "prefixUser",
    "disableTlsValidation",
    "enabled",
];

const ROUTE_PROFILE_KEYS: &[&str] = &[
    "id",
    "isRemoteOriginated",
    "enabled",
    "clients",
    "tags",
    "secret",
    "throttleRate",
    "replies",
];

/// Reads profiles from `ClientProfile.json` / `RouteProfile.json` in `dir`.
pub struct FileProfileStore {
    dir: PathBuf,
}

impl FileProfileStore {
    #[must_use]
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    async fn load_array(&self, filename: &str, known_keys: &[&str]) -> Result<Vec<Value>> {
        let path = self.dir.join(filename);
        let raw = match tokio::fs::read_to_string(&path).await {
            Ok(raw) => raw,
            Err(source) if source.kind() == std::io::ErrorKind::NotFound => {
                debug!(path = %path.display(), "profile file not found, treating as empty");
                return Ok(Vec::new());
            },
            Err(source) => {
                return Err(Error::Read {
                    path: path.display().to_string(),
                    source,
                });
            },
        };

        let value: Value = serde_json::from_str(&raw).map_err(|source| Error::Parse {
            path: path.display().to_string(),
            source,
        })?;

        let array = match value {
            Value::Array(items) => items,
            other => vec![other],
        };

        Ok(array
            .into_iter()
            .map(|item| canonicalize_keys(item, known_keys))
            .collect())
    }
}

/// Recursively renames the top-level object's keys to their canonical
/// spelling from `known_keys`, matched case-insensitively. Keys with no
/// case-insensitive match in `known_keys` pass through unchanged.
fn canonicalize_keys(value: Value, known_keys: &[&str]) -> Value {
    let Value::Object(map) = value else {
        return value;
    };

    let mut canonical = serde_json::Map::with_capacity(map.len());
    for (key, val) in map {
        let canonical_key = known_keys
            .iter()
            .find(|k| k.eq_ignore_ascii_case(&key))
            .map(|k| (*k).to_string())
            .unwrap_or(key);
        canonical.insert(canonical_key, val);
    }
    Value::Object(canonical)
}

#[async_trait]
impl ProfileStore for FileProfileStore {
    async fn query_clients(&self) -> Result<Vec<ClientProfile>> {
        let values = self.load_array(CLIENT_PROFILE_FILE, CLIENT_PROFILE_KEYS).await?;
        parse_all(values, CLIENT_PROFILE_FILE)
    }

    async fn query_routes(&self, direction: Direction) -> Result<Vec<RouteProfile>> {
        let values = self.load_array(ROUTE_PROFILE_FILE, ROUTE_PROFILE_KEYS).await?;
        let routes: Vec<RouteProfile> = parse_all(values, ROUTE_PROFILE_FILE)?;
        Ok(routes
            .into_iter()
            .filter(|r| r.direction == direction)
            .collect())
    }
}

fn parse_all<T: serde::de::DeserializeOwned>(values: Vec<Value>, filename: &str) -> Result<Vec<T>> {
    values
        .into_iter()
        .map(|v| {
            serde_json::from_value(v).map_err(|source| Error::Parse {
                path: filename.to_string(),
                source,
            })
        })
        .collect()
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use implink_common::types::ClientKind;

    use super::*;

    #[tokio::test]
    async fn reads_case_insensitive_client_profiles() {
        let dir = tempfile::tempdir().expect("tempdir");
        std::fs::write(
            dir.path().join(CLIENT_PROFILE_FILE),
            r#"[{"ID":"a","Kind":"Stub","BASEADDRESS":"http://x/","Timeout":5000}]"#,
        )
        .expect("write");

        let store = FileProfileStore::new(dir.path());
        let clients = store.query_clients().await.expect("query");
        assert_eq!(clients.len(), 1);
        assert_eq!(clients[0].id, "a");
        assert_eq!(clients[0].kind, ClientKind::Stub);
        assert_eq!(clients[0].timeout_ms, 5000);
    }

    #[tokio::test]
    async fn missing_file_yields_empty_snapshot() {
        let dir = tempfile::tempdir().expect("tempdir");
        let store = FileProfileStore::new(dir.path());
        assert!(store.query_clients().await.expect("query").is_empty());
    }

    #[tokio::test]
    async fn routes_filtered_by_direction() {
        let dir = tempfile::tempdir().expect("tempdir");
        std::fs::write(
            dir.path().join(ROUTE_PROFILE_FILE),
            r#"[
                {"id":"g1","isRemoteOriginated":false,"clients":"a","secret":""},
                {"id":"g2","isRemoteOriginated":true,"clients":"a","secret":"k"}
            ]"#,
        )
        .expect("write");

        let store = FileProfileStore::new(dir.path());
        let terminated = store
            .query_routes(Direction::RemoteTerminated)
            .await
            .expect("query");
        assert_eq!(terminated.len(), 1);
        assert_eq!(terminated[0].id, "g1");

        let originated = store
            .query_routes(Direction::RemoteOriginated)
            .await
            .expect("query");
        assert_eq!(originated.len(), 1);
        assert_eq!(originated[0].id, "g2");
    }
}
