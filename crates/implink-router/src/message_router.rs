//! MessageRouter (C6): the central state. Validates, authenticates,
//! throttles, and fans out one native message to its configured clients.

use std::{collections::HashSet, sync::Arc, time::Instant};

use {
    implink_auth::{Authenticator, HeaderSource},
    implink_clients::{ClientAdapter, ClientRegistry},
    implink_common::types::{NativeMessage, NativeResponse, NativeStatus, RouteProfile},
    implink_metrics::{self, counter, histogram, router as router_metrics},
    rand::Rng,
    tracing::warn,
};

use crate::rate_counter::RateCounter;

/// Resolved from one [`RouteProfile`] and the subset of its named clients
/// that [`ClientRegistry`] currently provisions. Unresolved names are
/// dropped here and reported back to the caller (`RouterRegistry`/
/// `RefreshController`) for a warning, not a construction failure.
pub struct MessageRouter {
    profile: RouteProfile,
    clients: Vec<(String, Arc<dyn ClientAdapter>)>,
    rate_counter: RateCounter,
    tag_set: HashSet<String>,
    authenticator: Authenticator,
    wait_on_forward: bool,
}

impl MessageRouter {
    /// Builds a router for `profile`, resolving its `clients` list against
    /// `registry`. Returns the router alongside any client names that
    /// could not be resolved.
    #[must_use]
    pub fn new(profile: RouteProfile, registry: &ClientRegistry, wait_on_forward: bool) -> (Self, Vec<String>) {
        let mut clients = Vec::with_capacity(profile.clients.len());
        let mut unresolved = Vec::new();
        for name in &profile.clients {
            match registry.get(name) {
                Some(adapter) => clients.push((name.clone(), adapter)),
                None => unresolved.push(name.clone()),
            }
        }

        let tag_set = profile.tag_set();
        let rate_counter = RateCounter::new(profile.throttle_rate);
        let authenticator = Authenticator::new(profile.secret.as_bytes().to_vec());

        let router = Self {
            profile,
            clients,
            rate_counter,
            tag_set,
            authenticator,
            wait_on_forward,
        };
        (router, unresolved)
    }

    #[must_use]
    pub fn profile(&self) -> &RouteProfile {
        &self.profile
    }

    #[must_use]
    pub fn client_names(&self) -> Vec<&str> {
        self.clients.iter().map(|(name, _)| name.as_str()).collect()
    }

    /// The primary operation. Runs the ordered gate sequence from the
    /// component design, then fans the message out to its resolved
    /// clients. Every path converges on a [`NativeResponse`]; nothing
    /// escapes as an error.
    pub async fn post_message(
        &self,
        headers: &impl HeaderSource,
        body: &[u8],
        message: &mut NativeMessage,
    ) -> NativeResponse {
        let started = Instant::now();
        let response = self.post_message_inner(headers, body, message).await;

        let outcome = if response.status.is_ok() { "ok" } else { "rejected" };
        counter!(router_metrics::REQUESTS_TOTAL, "route" => self.profile.id.clone(), "outcome" => outcome)
            .increment(1);
        histogram!(router_metrics::REQUEST_DURATION_SECONDS, "route" => self.profile.id.clone())
            .record(started.elapsed().as_secs_f64());

        response
    }

    async fn post_message_inner(
        &self,
        headers: &impl HeaderSource,
        body: &[u8],
        message: &mut NativeMessage,
    ) -> NativeResponse {
        let require_gateway_id = self.profile.direction.is_remote_originated();
        if let Err(e) = message.check_validity(require_gateway_id) {
            return NativeResponse::error(NativeStatus::BadRequest, e.to_string());
        }

        if let Err(e) = self.authenticator.verify(headers, body) {
            let direction = if self.profile.direction.is_remote_originated() {
                "remote-originated"
            } else {
                "remote-terminated"
            };
            counter!(implink_metrics::auth::FAILURES_TOTAL, "direction" => direction, "reason" => e.to_string())
                .increment(1);
            return NativeResponse::error(NativeStatus::Unauthorized, "Authentication failed");
        }

        if !self.profile.enabled {
            return NativeResponse::error(NativeStatus::BadRequest, "route is disabled");
        }

        if !self.tag_set.is_empty() {
            let tag_ok = message
                .tag
                .as_deref()
                .is_some_and(|tag| self.tag_set.contains(tag));
            if !tag_ok {
                return NativeResponse::error(NativeStatus::BadRequest, "Invalid message tag");
            }
        }

        if !self.profile.replies && message.parent_msg_id.as_deref().is_some_and(|p| !p.is_empty()) {
            return NativeResponse::error(
                NativeStatus::BadRequest,
                "replies are not permitted on this route",
            );
        }

        if self.rate_counter.is_throttled(true) {
            counter!(router_metrics::THROTTLED_TOTAL, "route" => self.profile.id.clone()).increment(1);
            return NativeResponse::error(NativeStatus::TooManyRequests, "Requests limit reached");
        }

        if self.clients.is_empty() {
            return NativeResponse::error(NativeStatus::InternalServerError, "route has no provisioned clients");
        }

        if message.msg_id.as_deref().is_none_or(str::is_empty) {
            message.msg_id = Some(generate_msg_id());
        }

        self.fan_out(message).await
    }

    async fn fan_out(&self, message: &NativeMessage) -> NativeResponse {
        let msg_id = message.msg_id.clone().unwrap_or_default();
        let total = self.clients.len();
        let has_parent = message.parent_msg_id.as_deref().is_some_and(|p| !p.is_empty());

        let mut success = 0usize;
        let mut errors = Vec::new();
        let mut latched_status = None;

        for (name, adapter) in &self.clients {
            if has_parent && !adapter.profile().kind.is_native() {
                errors.push(format!("{name}: reply not permitted for vendor client"));
                continue;
            }

            if self.wait_on_forward {
                let response = adapter.send(message).await;
                if response.status.is_ok() {
                    success += 1;
                } else {
                    errors.push(response.content.unwrap_or_else(|| format!("{:?}", response.status)));
                    if latched_status.is_none() {
                        latched_status = Some(response.status);
                    }
                }
            } else {
                let adapter = Arc::clone(adapter);
                let message = message.clone();
                let name = name.clone();
                tokio::spawn(async move {
                    let response = adapter.send(&message).await;
                    if !response.status.is_ok() {
                        warn!(client = %name, status = ?response.status, reason = ?response.content, "fire-and-forget send failed");
                    }
                });
                success += 1;
            }
        }

        let mut status = latched_status.unwrap_or(NativeStatus::Ok);
        if status.is_ok() && success == 0 {
            status = NativeStatus::BadRequest;
        }

        let content = if status.is_ok() {
            Some(msg_id)
        } else if total > 1 {
            Some(format!("{success} of {total} succeeded: {}", errors.join("; ")))
        } else {
            errors.into_iter().next()
        };

        NativeResponse { status, content }
    }
}

/// 12-character lowercase-alphanumeric id, uniformly distributed but not
/// required to be cryptographically unpredictable.
fn generate_msg_id() -> String {
    const ALPHABET: &[u8] = b"abcdefghijklmnopqrstuvwxyz0123456789";
    let mut rng = rand::rng();
    (0..12)
        .map(|_| ALPHABET[rng.random_range(0..ALPHABET.len())] as char)
        .collect()
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
#[path = "tests/message_router_tests.rs"]
mod message_router_tests;
