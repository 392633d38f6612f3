//! Stagegrid Server
//!
//! Axum JSON backend for the festival schedule grid: stages, performances,
//! placement proposals and health probes over an in-memory store.

use anyhow::Context;
use http::{HeaderValue, Method, header};
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use crate::{
    config::ServerConfig,
    handler::{AppState, router},
    service::database::Database,
};

mod common;
mod config;
mod handler;
mod service;
mod util;

fn cors_layer(origin: Option<&str>) -> anyhow::Result<CorsLayer> {
    let cors = CorsLayer::new()
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PUT,
            Method::DELETE,
            Method::OPTIONS,
        ])
        .allow_headers([header::CONTENT_TYPE, header::ACCEPT]);
    Ok(match origin {
        Some(origin) => cors.allow_origin(
            origin
                .parse::<HeaderValue>()
                .with_context(|| format!("invalid CORS_ORIGIN '{origin}'"))?,
        ),
        None => cors.allow_origin(Any),
    })
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer())
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let config = ServerConfig::from_env()?;
    let addr = config.addr();
    let cors = cors_layer(config.cors_origin.as_deref())?;

    tracing::info!(
        event_start = %config.event_day.start,
        snap_minutes = config.placement.snap.interval_minutes,
        clamp_policy = ?config.placement.clamp_policy,
        "Placement settings"
    );

    let state = AppState::new(Database::new(), config);
    let app = router(state)
        .layer(cors)
        .layer(TraceLayer::new_for_http());

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("failed to bind {addr}"))?;

    tracing::info!("Server listening on {addr}");
    tracing::info!("  - Schedule: http://{addr}/api/schedule");
    tracing::info!("  - Stages: http://{addr}/api/stages");
    tracing::info!("  - Health: http://{addr}/health");

    axum::serve(listener, app).await?;
    Ok(())
}
