//! Process wiring: binds the two direction-specific listeners, drives each
//! `RefreshController`'s periodic tick, and coordinates graceful shutdown.

use std::{sync::Arc, time::Duration};

use implink_clients::ClientRegistry;
use implink_common::types::Direction;
use implink_metrics::MetricsHandle;
use implink_profiles::ProfileStore;
use tokio::sync::Notify;
use tracing::info;

use crate::{
    config::ImplinkConfig,
    routes::build_router,
    state::{AppState, build_direction_instance},
};

/// Runs both direction listeners until `shutdown` fires (SIGINT/SIGTERM),
/// then drains in-flight fan-outs for up to `response_timeout_ms` before
/// returning.
pub async fn run(config: ImplinkConfig, store: Arc<dyn ProfileStore>, metrics_handle: Option<MetricsHandle>) -> anyhow::Result<()> {
    let clients = Arc::new(ClientRegistry::new());
    let refresh_interval = Duration::from_secs(config.database_refresh_secs);
    let response_timeout = Duration::from_millis(config.response_timeout_ms);

    let terminated = build_direction_instance(
        Arc::clone(&store),
        Arc::clone(&clients),
        Direction::RemoteTerminated,
        config.wait_on_forward,
        refresh_interval,
    );
    let originated = build_direction_instance(
        Arc::clone(&store),
        Arc::clone(&clients),
        Direction::RemoteOriginated,
        config.wait_on_forward,
        refresh_interval,
    );

    // Populate both registries before accepting traffic.
    terminated.refresh.refresh_once().await;
    originated.refresh.refresh_once().await;

    let shutdown = Arc::new(Notify::new());

    let terminated_app = build_router(AppState {
        instance: Arc::clone(&terminated),
        clients: Arc::clone(&clients),
        response_timeout,
        metrics_handle: metrics_handle.clone(),
    });
    let originated_app = build_router(AppState {
        instance: Arc::clone(&originated),
        clients: Arc::clone(&clients),
        response_timeout,
        metrics_handle,
    });

    let terminated_refresh = Arc::clone(&terminated.refresh);
    let originated_refresh = Arc::clone(&originated.refresh);
    tokio::spawn(async move { terminated_refresh.run().await });
    tokio::spawn(async move { originated_refresh.run().await });

    let terminated_listener = tokio::net::TcpListener::bind(&config.remote_terminated_bind).await?;
    info!(bind = %config.remote_terminated_bind, "remote-terminated listener bound");
    let originated_listener = tokio::net::TcpListener::bind(&config.remote_originated_bind).await?;
    info!(bind = %config.remote_originated_bind, "remote-originated listener bound");

    let terminated_shutdown = Arc::clone(&shutdown);
    let terminated_server = axum::serve(terminated_listener, terminated_app)
        .with_graceful_shutdown(async move { terminated_shutdown.notified().await });

    let originated_shutdown = Arc::clone(&shutdown);
    let originated_server = axum::serve(originated_listener, originated_app)
        .with_graceful_shutdown(async move { originated_shutdown.notified().await });

    let signal_shutdown = Arc::clone(&shutdown);
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            info!("shutdown signal received, draining in-flight fan-outs");
            signal_shutdown.notify_waiters();
        }
    });

    let (terminated_result, originated_result) = tokio::join!(terminated_server, originated_server);
    terminated_result?;
    originated_result?;

    terminated.refresh.shutdown();
    originated.refresh.shutdown();

    // Best-effort grace period for any fire-and-forget fan-out still in
    // flight; anything still outstanding after this is abandoned per §5.
    tokio::time::sleep(response_timeout).await;
    info!("implink server shut down");
    Ok(())
}

/// `implink doctor`: loads the configured `ProfileStore`, runs one refresh
/// tick per direction, and prints a human-readable summary — config
/// validation without starting the server.
pub async fn doctor(config: ImplinkConfig, store: Arc<dyn ProfileStore>) -> anyhow::Result<()> {
    let clients = Arc::new(ClientRegistry::new());
    let refresh_interval = Duration::ZERO;

    for direction in [Direction::RemoteTerminated, Direction::RemoteOriginated] {
        let instance = build_direction_instance(
            Arc::clone(&store),
            Arc::clone(&clients),
            direction,
            config.wait_on_forward,
            refresh_interval,
        );
        let report = instance.refresh.refresh_once().await;
        let label = if direction.is_remote_originated() {
            "remote-originated"
        } else {
            "remote-terminated"
        };

        println!("== {label} ==");
        if let Some(error) = report.error {
            println!("  refresh FAILED: {error}");
            continue;
        }
        println!("  routes provisioned : {}", instance.routers.count());
        println!("  routes removed     : {}", report.routes_removed.len());
        println!("  clients removed    : {}", report.clients_removed);
    }

    println!("clients provisioned (shared) : {}", clients.count());
    Ok(())
}
