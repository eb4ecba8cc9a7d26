//! Metric name and label definitions, grouped by subsystem.

/// Router (C6 `MessageRouter`) metrics.
pub mod router {
    /// Total `postMessage` calls, labeled by `route` and `outcome`.
    pub const REQUESTS_TOTAL: &str = "implink_router_requests_total";
    /// `postMessage` handling duration in seconds, labeled by `route`.
    pub const REQUEST_DURATION_SECONDS: &str = "implink_router_request_duration_seconds";
    /// Requests rejected by the throttle gate, labeled by `route`.
    pub const THROTTLED_TOTAL: &str = "implink_router_throttled_total";
}

/// Authenticator (C1) metrics.
pub mod auth {
    /// Failed signature verifications, labeled by `direction` and `reason`.
    pub const FAILURES_TOTAL: &str = "implink_auth_failures_total";
}

/// Registry (C5/C7) metrics.
pub mod registry {
    /// Currently-registered client adapters.
    pub const CLIENTS_ACTIVE: &str = "implink_clients_active";
    /// Currently-registered routes.
    pub const ROUTES_ACTIVE: &str = "implink_routes_active";
}

/// RefreshController (C8) metrics.
pub mod refresh {
    /// Completed refresh ticks, labeled by `direction` and `outcome`.
    pub const TOTAL: &str = "implink_refresh_total";
}
