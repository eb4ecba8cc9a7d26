//! The routing and forwarding core: rate limiting (C2), the per-route
//! state machine (C6), the registry that owns routers (C7), and the
//! background reconciler that keeps both registries current (C8).

pub mod message_router;
pub mod rate_counter;
pub mod refresh_controller;
pub mod router_registry;

pub use message_router::MessageRouter;
pub use rate_counter::RateCounter;
pub use refresh_controller::{RefreshController, RefreshReport};
pub use router_registry::RouterRegistry;
