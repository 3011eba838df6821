//! Roadview Camserver - traffic telemetry store and MJPEG relay
//!
//! Main entry point for the camserver application.

use roadview_camserver::{
    alerting::{self, AlertRepository},
    config::Config,
    state::AppState,
    stream_capture::StreamCaptureManager,
    stream_relay::StreamRelay,
    telemetry_ingest::IngestService,
    telemetry_store::{self, TelemetryRepository},
    traffic_stats::TrafficStatsService,
    web_api,
};
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env if present
    dotenvy::dotenv().ok();

    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "roadview_camserver=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!("Starting Roadview Camserver v{}", env!("CARGO_PKG_VERSION"));

    // Load configuration
    let config = Arc::new(Config::load(Config::default_path())?);
    tracing::info!(
        host = %config.host,
        port = config.port,
        database_path = %config.database_path,
        cameras = config.cameras.len(),
        "Configuration loaded"
    );

    // Create database pool
    let options = SqliteConnectOptions::new()
        .filename(&config.database_path)
        .create_if_missing(true);
    let pool = SqlitePoolOptions::new()
        .max_connections(5)
        .acquire_timeout(Duration::from_secs(10))
        .connect_with(options)
        .await?;

    let telemetry = TelemetryRepository::new(pool.clone());
    telemetry.init_schema().await?;
    tracing::info!("Database connected, schema initialized");

    // Initialize components
    let alerts = AlertRepository::new(pool.clone());
    let ingest = IngestService::new(telemetry.clone());
    let stats = TrafficStatsService::new(telemetry.clone());

    let mut captures = HashMap::new();
    for camera in &config.cameras {
        captures.insert(camera.id.clone(), StreamCaptureManager::new(camera.clone()));
    }
    let captures = Arc::new(captures);
    for capture in captures.values() {
        capture.start().await;
    }
    tracing::info!(count = captures.len(), "Capture loops started");

    let relay = StreamRelay::new((*captures).clone())?;

    // Background tasks
    alerting::spawn_watcher(
        telemetry.clone(),
        alerts.clone(),
        Duration::from_secs(config.alert_poll_secs),
    );
    telemetry_store::spawn_retention_task(telemetry.clone(), config.retention_days);

    // Create application state
    let state = AppState {
        pool,
        config: config.clone(),
        telemetry,
        alerts,
        ingest,
        stats,
        relay,
        captures: captures.clone(),
    };

    let app = web_api::create_router(state)
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .layer(TraceLayer::new_for_http());

    // Start server
    let addr = format!("{}:{}", config.host, config.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!("Listening on {}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    // Stop every capture loop before exiting so ffmpeg children are reaped
    for capture in captures.values() {
        capture.stop().await;
    }
    tracing::info!("Shutdown complete");

    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    tracing::info!("Shutdown signal received");
}
