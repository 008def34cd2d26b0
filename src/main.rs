//! fair-allocator server entry point.
//!
//! Starts the Axum HTTP server with REST and WebSocket endpoints, and the
//! Postgres recorder when persistence is enabled.

use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use sqlx::postgres::PgPoolOptions;
use tokio::sync::watch;
use tower::ServiceBuilder;
use tower_http::cors::CorsLayer;
use tower_http::timeout::TimeoutLayer;
use tower_http::trace::TraceLayer;
use tracing_subscriber::EnvFilter;

use fair_allocator::api;
use fair_allocator::app_state::AppState;
use fair_allocator::config::AppConfig;
use fair_allocator::domain::{ActivityBus, FairState, FairStore};
use fair_allocator::persistence::postgres::PostgresPersistence;
use fair_allocator::persistence::recorder::{Recorder, RecorderConfig};
use fair_allocator::service::AllocationSettings;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = AppConfig::from_env().map_err(|e| anyhow::anyhow!("invalid configuration: {e}"))?;
    init_tracing(config.log_json);
    tracing::info!(addr = %config.listen_addr, "starting fair-allocator");

    let activity_bus = ActivityBus::new(config.event_bus_capacity);
    let (shutdown_tx, shutdown_rx) = watch::channel(false);

    let (store, recorder) = if config.persistence_enabled {
        let pool = PgPoolOptions::new()
            .max_connections(config.database_max_connections)
            .min_connections(config.database_min_connections)
            .acquire_timeout(Duration::from_secs(config.database_connect_timeout_secs))
            .connect(&config.database_url)
            .await
            .context("connecting to PostgreSQL")?;
        let persistence = PostgresPersistence::new(pool);
        persistence.ensure_schema().await?;

        let state = match persistence.load_latest_snapshot().await? {
            Some(snapshot) => {
                tracing::info!(
                    snapshot_id = snapshot.id,
                    snapshot_at = %snapshot.snapshot_at,
                    "restoring fair state"
                );
                serde_json::from_value::<FairState>(snapshot.state_json)
                    .context("decoding state snapshot")?
            }
            None => FairState::new(),
        };
        let store = Arc::new(FairStore::with_state(state));
        let recorder = Recorder::new(
            persistence,
            Arc::clone(&store),
            RecorderConfig::from(&config),
        );
        let handle = tokio::spawn(recorder.run(activity_bus.subscribe(), shutdown_rx));
        (store, Some(handle))
    } else {
        tracing::info!("persistence disabled, state is held in memory only");
        (Arc::new(FairStore::new()), None)
    };

    let settings = AllocationSettings {
        lookback_years: config.allocation_lookback_years,
        created_by: config.allocation_created_by.clone(),
    };
    let app_state = AppState::new(store, activity_bus, settings);

    let app = api::build_app(app_state).layer(
        ServiceBuilder::new()
            .layer(TraceLayer::new_for_http())
            .layer(CorsLayer::permissive())
            .layer(TimeoutLayer::new(config.request_timeout())),
    );

    let listener = tokio::net::TcpListener::bind(config.listen_addr).await?;
    tracing::info!(addr = %config.listen_addr, "server listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("server stopped");
    if let Some(handle) = recorder {
        shutdown_tx.send(true).ok();
        if let Err(e) = handle.await {
            tracing::error!(error = %e, "recorder task failed");
        }
    }

    Ok(())
}

fn init_tracing(json: bool) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    if json {
        tracing_subscriber::fmt().json().with_env_filter(filter).init();
    } else {
        tracing_subscriber::fmt().with_env_filter(filter).init();
    }
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    tracing::info!("shutdown signal received");
}
