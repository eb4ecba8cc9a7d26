//! The §6 external HTTP surface: `/PostMessage`, `/GetTime`,
//! `/GetRoutingInfo`, `/UpdateRouting`, plus the ambient `/healthz` and
//! `/metrics` endpoints.

use axum::{
    Router,
    body::Bytes,
    extract::State,
    http::{HeaderMap, StatusCode, header},
    response::{IntoResponse, Json, Response},
    routing::{get, post},
};
use implink_auth::HeaderSource;
use implink_common::types::{NativeMessage, NativeResponse, NativeStatus};
use tower_http::{
    catch_panic::CatchPanicLayer,
    cors::{Any, CorsLayer},
    request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer},
    trace::TraceLayer,
};
use tracing::info;

use crate::state::AppState;

/// Adapts axum's `HeaderMap` to the `implink-auth` crate's header
/// abstraction, so the auth crate stays free of any particular HTTP
/// stack's types.
struct AxumHeaders<'a>(&'a HeaderMap);

impl HeaderSource for AxumHeaders<'_> {
    fn get(&self, name: &str) -> Option<&str> {
        self.0.get(name).and_then(|v| v.to_str().ok())
    }
}

/// Builds the router for one direction. `/GetRoutingInfo` and
/// `/UpdateRouting` are remote-terminated only per §6's table. The
/// remote-originated (public) listener additionally carries CORS,
/// request-id, tracing, and panic-catching middleware — defensive hygiene
/// for a public-facing leg, not a feature the Non-goals touch.
pub fn build_router(state: AppState) -> Router {
    let is_remote_originated = state.instance.direction.is_remote_originated();

    let mut router = Router::new()
        .route("/PostMessage", post(post_message_handler))
        .route("/GetTime", get(get_time_handler))
        .route("/healthz", get(healthz_handler));

    if !is_remote_originated {
        router = router
            .route("/GetRoutingInfo", get(get_routing_info_handler))
            .route("/UpdateRouting", get(update_routing_handler));
    }

    if state.metrics_handle.is_some() {
        router = router.route("/metrics", get(metrics_handler));
    }

    let router = router.with_state(state);

    if is_remote_originated {
        router
            .layer(PropagateRequestIdLayer::x_request_id())
            .layer(TraceLayer::new_for_http())
            .layer(CorsLayer::new().allow_origin(Any).allow_methods(Any).allow_headers(Any))
            .layer(SetRequestIdLayer::x_request_id(MakeRequestUuid))
            .layer(CatchPanicLayer::new())
    } else {
        router
    }
}

fn native_response(response: NativeResponse) -> Response {
    let status = StatusCode::from_u16(response.status.code()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
    (status, Json(response)).into_response()
}

async fn post_message_handler(State(state): State<AppState>, headers: HeaderMap, body: Bytes) -> Response {
    let mut message: NativeMessage = match serde_json::from_slice(&body) {
        Ok(message) => message,
        Err(e) => {
            return native_response(NativeResponse::error(
                NativeStatus::BadRequest,
                format!("invalid request body: {e}"),
            ));
        },
    };

    let route_id = if state.instance.direction.is_remote_originated() {
        message.gateway_id.clone()
    } else {
        Some(message.group_id.clone())
    };

    let route_id = match route_id.filter(|id| !id.is_empty()) {
        Some(id) => id,
        None => {
            return native_response(NativeResponse::error(NativeStatus::BadRequest, "missing route id"));
        },
    };

    let Some(router) = state.instance.routers.get(&route_id) else {
        return native_response(NativeResponse::error(
            NativeStatus::BadRequest,
            format!("no route provisioned for '{route_id}'"),
        ));
    };

    let axum_headers = AxumHeaders(&headers);
    let response = router.post_message(&axum_headers, &body, &mut message).await;
    native_response(response)
}

async fn get_time_handler() -> Response {
    native_response(NativeResponse::ok(chrono::Utc::now().to_rfc3339()))
}

async fn get_routing_info_handler(State(state): State<AppState>) -> Response {
    let dump = state.instance.routers.route_dump();
    match serde_json::to_string(&dump) {
        Ok(json) => native_response(NativeResponse::ok(json)),
        Err(e) => native_response(NativeResponse::error(NativeStatus::InternalServerError, e.to_string())),
    }
}

async fn update_routing_handler(State(state): State<AppState>) -> Response {
    let report = state.instance.refresh.refresh_once().await;
    info!(
        clients_removed = report.clients_removed,
        routes_removed = report.routes_removed.len(),
        "on-demand refresh triggered via /UpdateRouting"
    );

    if let Some(error) = report.error {
        return native_response(NativeResponse::error(NativeStatus::InternalServerError, error));
    }

    let log = format!(
        "clients_removed={} routes_removed=[{}]",
        report.clients_removed,
        report.routes_removed.join(",")
    );
    native_response(NativeResponse::ok(log))
}

async fn healthz_handler(State(state): State<AppState>) -> impl IntoResponse {
    Json(serde_json::json!({
        "status": "ok",
        "direction": if state.instance.direction.is_remote_originated() { "remote-originated" } else { "remote-terminated" },
        "routes": state.instance.routers.count(),
        "clients": state.clients.count(),
    }))
}

async fn metrics_handler(State(state): State<AppState>) -> Response {
    match &state.metrics_handle {
        Some(handle) => {
            let body = handle.render();
            (
                StatusCode::OK,
                [(header::CONTENT_TYPE, "text/plain; version=0.0.4; charset=utf-8")],
                body,
            )
                .into_response()
        },
        None => (StatusCode::SERVICE_UNAVAILABLE, "metrics not enabled").into_response(),
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use std::{sync::Arc, time::Duration};

    use implink_clients::ClientRegistry;
    use implink_common::types::{ClientKind, ClientProfile, Direction, RouteProfile};
    use implink_profiles::memory::MemoryProfileStore;
    use tower::ServiceExt;

    use super::*;
    use crate::state::{AppState, build_direction_instance};

    fn stub_client(id: &str) -> ClientProfile {
        ClientProfile {
            id: id.to_string(),
            kind: ClientKind::Stub,
            base_address: "http://x/".to_string(),
            secret: String::new(),
            user_agent: None,
            max_text: 0,
            timeout_ms: 1000,
            prefix_user: false,
            disable_tls_validation: false,
            enabled: true,
        }
    }

    fn route(id: &str, direction: Direction, secret: &str) -> RouteProfile {
        RouteProfile {
            id: id.to_string(),
            direction,
            enabled: true,
            clients: vec!["A".to_string()],
            tags: None,
            secret: secret.to_string(),
            throttle_rate: 0,
            replies: false,
        }
    }

    async fn harness(direction: Direction, secret: &str) -> Router {
        let clients = Arc::new(ClientRegistry::new());
        clients.upsert(stub_client("A"));
        let store = Arc::new(MemoryProfileStore::new(vec![], vec![route("G1", direction, secret)]));
        let instance = build_direction_instance(store, Arc::clone(&clients), direction, true, Duration::ZERO);
        instance.refresh.refresh_once().await;

        build_router(AppState {
            instance,
            clients,
            response_timeout: Duration::from_secs(5),
            metrics_handle: None,
        })
    }

    #[tokio::test]
    async fn post_message_happy_path_remote_terminated() {
        let app = harness(Direction::RemoteTerminated, "").await;
        let body = serde_json::json!({"groupId": "G1", "userName": "alice", "text": "hello"}).to_string();

        let response = app
            .oneshot(
                axum::http::Request::post("/PostMessage")
                    .header("content-type", "application/json")
                    .body(axum::body::Body::from(body))
                    .expect("request"),
            )
            .await
            .expect("response");
        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn post_message_requires_auth_on_remote_originated() {
        let app = harness(Direction::RemoteOriginated, "K1").await;
        let body = serde_json::json!({
            "gatewayId": "G1", "groupId": "G1", "userName": "alice", "text": "hello"
        })
        .to_string();

        let response = app
            .oneshot(
                axum::http::Request::post("/PostMessage")
                    .header("content-type", "application/json")
                    .body(axum::body::Body::from(body))
                    .expect("request"),
            )
            .await
            .expect("response");
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn get_time_reports_ok() {
        let app = harness(Direction::RemoteTerminated, "").await;
        let response = app
            .oneshot(axum::http::Request::get("/GetTime").body(axum::body::Body::empty()).expect("request"))
            .await
            .expect("response");
        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn routing_info_and_update_routing_are_remote_terminated_only() {
        let terminated = harness(Direction::RemoteTerminated, "").await;
        let response = terminated
            .oneshot(
                axum::http::Request::get("/GetRoutingInfo")
                    .body(axum::body::Body::empty())
                    .expect("request"),
            )
            .await
            .expect("response");
        assert_eq!(response.status(), StatusCode::OK);

        let originated = harness(Direction::RemoteOriginated, "K1").await;
        let response = originated
            .oneshot(
                axum::http::Request::get("/GetRoutingInfo")
                    .body(axum::body::Body::empty())
                    .expect("request"),
            )
            .await
            .expect("response");
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }
}
