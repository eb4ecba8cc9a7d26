//! Configuration loading for the `implink` binary.
//!
//! Config files: `implink.toml`, `implink.yaml`/`.yml`, or `implink.json`,
//! discovered in the current directory, or an explicit `--config` path.
//! Discovery failure is never fatal: it falls back to defaults with a
//! logged warning, matching this codebase's `discover_and_load` behavior.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

const CONFIG_FILENAMES: &[&str] = &["implink.toml", "implink.yaml", "implink.yml", "implink.json"];

/// `DatabaseKind` ∈ {`None`, `MySQL`, `Postgres`, `File`} per §6. Only
/// `None` (empty in-memory store) and `File` are wired by this core; SQL
/// backends are an external collaborator per §1 and are rejected at load
/// time with a clear error rather than silently falling back.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub enum DatabaseKind {
    None,
    #[serde(rename = "MySQL")]
    MySql,
    Postgres,
    File,
}

impl Default for DatabaseKind {
    fn default() -> Self {
        Self::None
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ImplinkConfig {
    pub database_kind: DatabaseKind,
    pub database_connection: String,
    pub database_refresh_secs: u64,
    pub response_timeout_ms: u64,
    pub wait_on_forward: bool,
    pub remote_terminated_bind: String,
    pub remote_originated_bind: String,
    pub allowed_skew_secs: i64,
    pub metrics_enabled: bool,
}

impl Default for ImplinkConfig {
    fn default() -> Self {
        Self {
            database_kind: DatabaseKind::None,
            database_connection: String::new(),
            database_refresh_secs: 60,
            response_timeout_ms: 10_000,
            wait_on_forward: false,
            remote_terminated_bind: "127.0.0.1:8080".to_string(),
            remote_originated_bind: "0.0.0.0:8443".to_string(),
            allowed_skew_secs: 30,
            metrics_enabled: true,
        }
    }
}

/// Load config from the given path (format detected by extension).
pub fn load_config(path: &Path) -> anyhow::Result<ImplinkConfig> {
    let raw = std::fs::read_to_string(path)
        .map_err(|e| anyhow::anyhow!("failed to read {}: {e}", path.display()))?;
    parse_config(&raw, path)
}

/// Explicit `--config` flag, then `./implink.{toml,yaml,yml,json}`, then
/// built-in defaults. No discovery failure is fatal.
pub fn discover_and_load(explicit: Option<&Path>) -> ImplinkConfig {
    if let Some(path) = explicit {
        debug!(path = %path.display(), "loading config from explicit path");
        return match load_config(path) {
            Ok(cfg) => cfg,
            Err(e) => {
                warn!(path = %path.display(), error = %e, "failed to load config, using defaults");
                ImplinkConfig::default()
            },
        };
    }

    if let Some(path) = find_config_file() {
        debug!(path = %path.display(), "loading config");
        match load_config(&path) {
            Ok(cfg) => return cfg,
            Err(e) => {
                warn!(path = %path.display(), error = %e, "failed to load config, using defaults");
            },
        }
    } else {
        debug!("no config file found, using defaults");
    }

    ImplinkConfig::default()
}

fn find_config_file() -> Option<PathBuf> {
    for name in CONFIG_FILENAMES {
        let p = PathBuf::from(name);
        if p.exists() {
            return Some(p);
        }
    }
    None
}

fn parse_config(raw: &str, path: &Path) -> anyhow::Result<ImplinkConfig> {
    let ext = path.extension().and_then(|e| e.to_str()).unwrap_or("toml");
    match ext {
        "toml" => Ok(toml::from_str(raw)?),
        "yaml" | "yml" => Ok(serde_yaml::from_str(raw)?),
        "json" => Ok(serde_json::from_str(raw)?),
        other => anyhow::bail!("unsupported config format: .{other}"),
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_sane() {
        let config = ImplinkConfig::default();
        assert_eq!(config.database_kind, DatabaseKind::None);
        assert!(config.response_timeout_ms > 0);
    }

    #[test]
    fn loads_toml() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("implink.toml");
        std::fs::write(
            &path,
            r#"
            databaseKind = "File"
            databaseConnection = "/etc/implink/profiles"
            waitOnForward = true
            "#,
        )
        .expect("write");

        let config = load_config(&path).expect("load");
        assert_eq!(config.database_kind, DatabaseKind::File);
        assert_eq!(config.database_connection, "/etc/implink/profiles");
        assert!(config.wait_on_forward);
        // Unset fields take documented defaults.
        assert_eq!(config.response_timeout_ms, 10_000);
    }

    #[test]
    fn loads_json() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("implink.json");
        std::fs::write(&path, r#"{"databaseKind":"None","metricsEnabled":false}"#).expect("write");

        let config = load_config(&path).expect("load");
        assert!(!config.metrics_enabled);
    }

    #[test]
    fn missing_explicit_path_falls_back_to_defaults() {
        let config = discover_and_load(Some(Path::new("/nonexistent/implink.toml")));
        assert_eq!(config.database_kind, DatabaseKind::None);
    }
}
