//! End-to-end coverage of the §8 scenarios (S1-S6), driven against an
//! in-process axum router via `tower::ServiceExt::oneshot` — no real TCP
//! bind, matching this codebase's test style for HTTP-surfaced crates.
#![allow(clippy::unwrap_used, clippy::expect_used)]

use std::{sync::Arc, time::Duration};

use axum::{
    Router,
    body::Body,
    http::{Request, StatusCode},
};
use implink_auth::Authenticator;
use implink_clients::ClientRegistry;
use implink_common::types::{ClientKind, ClientProfile, Direction, RouteProfile};
use implink_profiles::memory::MemoryProfileStore;
use implink_server::{
    routes::build_router,
    state::{AppState, build_direction_instance},
};
use serde_json::{Value, json};
use tower::ServiceExt;

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

fn route(id: &str, clients: &[&str], secret: &str, throttle_rate: i64, tags: Option<Vec<&str>>) -> RouteProfile {
    RouteProfile {
        id: id.to_string(),
        direction: Direction::RemoteOriginated,
        enabled: true,
        clients: clients.iter().map(|s| s.to_string()).collect(),
        tags: tags.map(|t| t.into_iter().map(str::to_string).collect()),
        secret: secret.to_string(),
        throttle_rate,
        replies: false,
    }
}

async fn build_app(client_profiles: Vec<ClientProfile>, route_profile: RouteProfile) -> Router {
    let clients = Arc::new(ClientRegistry::new());
    let store = Arc::new(MemoryProfileStore::new(client_profiles, vec![route_profile]));
    let instance = build_direction_instance(store, Arc::clone(&clients), Direction::RemoteOriginated, true, Duration::ZERO);
    instance.refresh.refresh_once().await;

    build_router(AppState {
        instance,
        clients,
        response_timeout: Duration::from_secs(5),
        metrics_handle: None,
    })
}

fn signed_post(path: &str, secret: &str, body: &Value) -> Request<Body> {
    let body_bytes = serde_json::to_vec(body).expect("serialize");
    let auth = Authenticator::new(secret.as_bytes().to_vec());
    let signed = auth.sign(&body_bytes);

    Request::post(path)
        .header("content-type", "application/json")
        .header(implink_auth::HEADER_TIMESTAMP, signed.timestamp)
        .header(implink_auth::HEADER_NONCE, signed.nonce)
        .header(implink_auth::HEADER_SIGN, signed.signature)
        .body(Body::from(body_bytes))
        .expect("request")
}

async fn response_json(response: axum::response::Response) -> Value {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.expect("body");
    serde_json::from_slice(&bytes).expect("json")
}

#[tokio::test]
async fn s1_happy_path() {
    let app = build_app(vec![stub_client("A")], route("G1", &["A"], "K1", 0, None)).await;
    let body = json!({"gatewayId": "G1", "groupId": "G1", "userName": "alice", "text": "hello"});
    let request = signed_post("/PostMessage", "K1", &body);

    let response = app.oneshot(request).await.expect("response");
    assert_eq!(response.status(), StatusCode::OK);
    let json = response_json(response).await;
    let content = json["content"].as_str().expect("content");
    assert_eq!(content.len(), 12);
    assert!(content.chars().all(|c| c.is_ascii_lowercase() || c.is_ascii_digit()));
}

#[tokio::test]
async fn s2_auth_failure() {
    let app = build_app(vec![stub_client("A")], route("G1", &["A"], "K1", 0, None)).await;
    let body = json!({"gatewayId": "G1", "groupId": "G1", "userName": "alice", "text": "hello"});
    let request = signed_post("/PostMessage", "K2", &body);

    let response = app.oneshot(request).await.expect("response");
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    let json = response_json(response).await;
    assert_eq!(json["content"], "Authentication failed");
}

#[tokio::test]
async fn s3_tag_filter() {
    let app = build_app(
        vec![stub_client("A")],
        route("G1", &["A"], "K1", 0, Some(vec!["sports", "news"])),
    )
    .await;
    let body = json!({"gatewayId": "G1", "groupId": "G1", "userName": "alice", "text": "hello", "tag": "other"});
    let request = signed_post("/PostMessage", "K1", &body);

    let response = app.oneshot(request).await.expect("response");
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let json = response_json(response).await;
    assert!(json["content"].as_str().expect("content").contains("Invalid"));
}

#[tokio::test]
async fn s4_throttle() {
    let app = build_app(vec![stub_client("A")], route("G1", &["A"], "K1", 2, None)).await;

    let expected = [StatusCode::OK, StatusCode::OK, StatusCode::TOO_MANY_REQUESTS];
    for status in expected {
        let body = json!({"gatewayId": "G1", "groupId": "G1", "userName": "alice", "text": "hello"});
        let request = signed_post("/PostMessage", "K1", &body);
        let response = app.clone().oneshot(request).await.expect("response");
        assert_eq!(response.status(), status);
        if status == StatusCode::TOO_MANY_REQUESTS {
            let json = response_json(response).await;
            assert_eq!(json["content"], "Requests limit reached");
        }
    }
}

#[tokio::test]
async fn s5_multi_client_aggregation() {
    let app = build_app(
        vec![stub_client("A"), stub_client("B")],
        route("G1", &["A", "B"], "K1", 0, None),
    )
    .await;
    let body = json!({"gatewayId": "G1", "groupId": "G1", "userName": "alice", "text": "InternalServerError"});
    let request = signed_post("/PostMessage", "K1", &body);

    let response = app.oneshot(request).await.expect("response");
    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    let json = response_json(response).await;
    assert!(json["content"].as_str().expect("content").starts_with("1 of 2 succeeded:"));
}

#[tokio::test]
async fn get_time_reports_iso8601() {
    let app = build_app(vec![stub_client("A")], route("G1", &["A"], "K1", 0, None)).await;
    let response = app
        .oneshot(Request::get("/GetTime").body(Body::empty()).expect("request"))
        .await
        .expect("response");
    assert_eq!(response.status(), StatusCode::OK);
    let json = response_json(response).await;
    assert!(chrono::DateTime::parse_from_rfc3339(json["content"].as_str().expect("content")).is_ok());
}

#[tokio::test]
async fn get_routing_info_and_update_routing_not_available_on_remote_originated() {
    let app = build_app(vec![stub_client("A")], route("G1", &["A"], "K1", 0, None)).await;

    let response = app
        .clone()
        .oneshot(Request::get("/GetRoutingInfo").body(Body::empty()).expect("request"))
        .await
        .expect("response");
    assert_eq!(response.status(), StatusCode::NOT_FOUND);

    let response = app
        .oneshot(Request::get("/UpdateRouting").body(Body::empty()).expect("request"))
        .await
        .expect("response");
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}
