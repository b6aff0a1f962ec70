//! Notification worker: consumes task events from the broker stream and
//! fans them out to notification records, push groups, and email.
//!
//! Also serves `/health` and `/metrics` for probes and scraping.

use std::sync::Arc;

use axum::extract::State;
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::routing::get;
use axum::Router;
use broker::{BrokerConsumer, ConsumerConfig, EventWorker};
use core_config::tracing::{init_tracing, install_color_eyre};
use core_config::{env_parse_or, Environment, FromEnv};
use database::redis::{check_health, connect_from_config_with_retry, ConnectionManager, RedisConfig};
use database::RetryConfig;
use domain_notifications::{
    InMemoryNotificationRepository, InProcessHub, NotificationFanout, SmtpConfig, SmtpSender,
};
use domain_projects::InMemoryProjectRepository;
use domain_users::InMemoryUserDirectory;
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};
use tokio::signal::unix::{signal, SignalKind};
use tokio::sync::watch;
use tracing::{error, info};

#[derive(Clone)]
struct AppState {
    redis: ConnectionManager,
    metrics: PrometheusHandle,
}

pub async fn run() -> eyre::Result<()> {
    install_color_eyre();
    let environment = Environment::from_env();
    init_tracing(&environment);

    info!(?environment, "Starting notifier worker");

    let metrics_handle = PrometheusBuilder::new().install_recorder()?;

    let redis_config = RedisConfig::from_env()?;
    let redis =
        connect_from_config_with_retry(&redis_config, Some(RetryConfig::default())).await?;

    // Stores are in-process; embedders with external persistence supply
    // their own repository implementations.
    let projects = Arc::new(InMemoryProjectRepository::new());
    let users = Arc::new(InMemoryUserDirectory::new());
    let notifications = Arc::new(InMemoryNotificationRepository::new());
    let hub = Arc::new(InProcessHub::new());
    let sender = Arc::new(SmtpSender::new(SmtpConfig::from_env())?);

    let fanout = Arc::new(NotificationFanout::new(
        projects,
        users,
        notifications,
        hub,
        sender,
    ));

    let consumer_config = ConsumerConfig::from_env()?;
    let worker = EventWorker::new(BrokerConsumer::new(redis.clone(), consumer_config), fanout);

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let mut sigterm = signal(SignalKind::terminate())?;
    tokio::spawn(async move {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => {}
            _ = sigterm.recv() => {}
        }
        info!("Shutdown signal received");
        let _ = shutdown_tx.send(true);
    });

    serve_http(redis, metrics_handle, shutdown_rx.clone()).await?;

    worker.run(shutdown_rx).await?;
    Ok(())
}

/// Spawn the probe endpoints on `HEALTH_PORT` (default 8080).
async fn serve_http(
    redis: ConnectionManager,
    metrics: PrometheusHandle,
    mut shutdown: watch::Receiver<bool>,
) -> eyre::Result<()> {
    let port: u16 = env_parse_or("HEALTH_PORT", 8080)?;
    let state = AppState { redis, metrics };

    let router = Router::new()
        .route("/health", get(health))
        .route("/metrics", get(metrics_endpoint))
        .with_state(state);

    let listener = tokio::net::TcpListener::bind(("0.0.0.0", port)).await?;
    info!(port, "Health endpoint listening");

    tokio::spawn(async move {
        let result = axum::serve(listener, router)
            .with_graceful_shutdown(async move {
                let _ = shutdown.changed().await;
            })
            .await;
        if let Err(e) = result {
            error!(error = %e, "Health server failed");
        }
    });
    Ok(())
}

async fn health(State(state): State<AppState>) -> impl IntoResponse {
    let mut conn = state.redis.clone();
    match check_health(&mut conn).await {
        Ok(()) => (StatusCode::OK, "ok"),
        Err(e) => {
            error!(error = %e, "Health check failed");
            (StatusCode::SERVICE_UNAVAILABLE, "unhealthy")
        }
    }
}

async fn metrics_endpoint(State(state): State<AppState>) -> String {
    state.metrics.render()
}
