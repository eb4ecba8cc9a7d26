//! Shared types and error handling used across the implink router crates.
//!
//! Mirrors the data model of the routing core: [`types::NativeMessage`] and
//! [`types::NativeResponse`] are the wire schema; [`types::ClientProfile`]
//! and [`types::RouteProfile`] are the routing table's row types.

pub mod error;
pub mod types;

pub use error::{Error, FromMessage, Result};
