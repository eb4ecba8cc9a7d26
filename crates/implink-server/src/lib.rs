//! §6 external interfaces, CLI, and process wiring for the implink router
//! core. The `implink` binary (`src/main.rs`) is a thin wrapper over this
//! library so integration tests can drive the HTTP surface directly.

pub mod config;
pub mod routes;
pub mod server;
pub mod state;
