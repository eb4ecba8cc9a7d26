//! Metrics collection for the implink router core.
//!
//! This crate provides a unified metrics interface using the `metrics`
//! crate facade. When the `prometheus` feature is enabled, metrics are
//! exported in Prometheus text format; otherwise a no-op recorder
//! discards everything, so instrumented code pays no cost to call.

mod definitions;
mod recorder;

pub use definitions::*;
pub use recorder::{MetricsHandle, MetricsRecorderConfig, init_metrics};

// Re-export the facade macros for convenience at call sites.
pub use metrics::{counter, gauge, histogram};
