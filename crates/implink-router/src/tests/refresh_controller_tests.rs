use std::time::Duration;

use implink_clients::ClientRegistry;
use implink_common::types::{ClientKind, ClientProfile, Direction, RouteProfile};
use implink_profiles::memory::MemoryProfileStore;

use super::*;

fn client(id: &str, enabled: bool) -> ClientProfile {
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
        enabled,
    }
}

fn route(id: &str, clients: Vec<&str>) -> RouteProfile {
    RouteProfile {
        id: id.to_string(),
        direction: Direction::RemoteTerminated,
        enabled: true,
        clients: clients.into_iter().map(str::to_string).collect(),
        tags: None,
        secret: String::new(),
        throttle_rate: 0,
        replies: false,
    }
}

#[tokio::test]
async fn refresh_populates_registries_and_excludes_disabled_clients() {
    let store = Arc::new(MemoryProfileStore::new(
        vec![client("A", true), client("B", false)],
        vec![route("G1", vec!["A"])],
    ));
    let clients = Arc::new(ClientRegistry::new());
    let routers = Arc::new(RouterRegistry::new(true));
    let controller = RefreshController::new(
        store,
        Arc::clone(&clients),
        Arc::clone(&routers),
        Direction::RemoteTerminated,
        Duration::from_secs(0),
    );

    let report = controller.refresh_once().await;
    assert!(report.error.is_none());
    assert_eq!(clients.count(), 1);
    assert!(clients.get("a").is_some());
    assert!(clients.get("b").is_none());
    assert_eq!(routers.count(), 1);
}

#[tokio::test]
async fn refresh_skips_invalid_profiles_without_disturbing_others() {
    let mut bad_client = client("B", true);
    bad_client.base_address = "not-a-url".to_string();
    let mut bad_route = route("G2", vec!["A"]);
    bad_route.clients = Vec::new();

    let store = Arc::new(MemoryProfileStore::new(
        vec![client("A", true), bad_client],
        vec![route("G1", vec!["A"]), bad_route],
    ));
    let clients = Arc::new(ClientRegistry::new());
    let routers = Arc::new(RouterRegistry::new(true));
    let controller = RefreshController::new(
        store,
        Arc::clone(&clients),
        Arc::clone(&routers),
        Direction::RemoteTerminated,
        Duration::from_secs(0),
    );

    let report = controller.refresh_once().await;
    assert!(report.error.is_none());
    assert_eq!(clients.count(), 1);
    assert!(clients.get("a").is_some());
    assert!(clients.get("b").is_none());
    assert_eq!(routers.count(), 1);
    assert!(routers.get("g1").is_some());
    assert!(routers.get("g2").is_none());
}

#[tokio::test]
async fn failed_query_preserves_previous_registry_state() {
    let store = Arc::new(MemoryProfileStore::new(
        vec![client("A", true)],
        vec![route("G1", vec!["A"])],
    ));
    let clients = Arc::new(ClientRegistry::new());
    let routers = Arc::new(RouterRegistry::new(true));
    let controller = RefreshController::new(
        Arc::clone(&store) as Arc<dyn implink_profiles::ProfileStore>,
        Arc::clone(&clients),
        Arc::clone(&routers),
        Direction::RemoteTerminated,
        Duration::from_secs(0),
    );

    controller.refresh_once().await;
    assert_eq!(clients.count(), 1);

    store.set_clients(vec![]);
    store.set_routes(vec![]);
    // an empty-but-successful snapshot is a legitimate reconciliation, not
    // a failure; this asserts refresh_once doesn't treat "nothing left" as
    // an error requiring rollback.
    let report = controller.refresh_once().await;
    assert!(report.error.is_none());
    assert_eq!(clients.count(), 0);
}
