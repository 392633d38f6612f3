use std::sync::Arc;

use axum::{
    Router,
    routing::{get, post, put},
};
use stagegrid_core::PlacementEngine;

use crate::{config::ServerConfig, service::database::Database};

pub mod error;
pub mod health;
pub mod schedule;
pub mod stages;

/// Shared by every handler.
#[derive(Clone)]
pub struct AppState {
    pub database: Database,
    pub config: Arc<ServerConfig>,
}

impl AppState {
    pub fn new(database: Database, config: ServerConfig) -> Self {
        Self {
            database,
            config: Arc::new(config),
        }
    }

    pub fn engine(&self) -> PlacementEngine {
        PlacementEngine::new(self.config.placement)
    }
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/api/stages", get(stages::list_stages).post(stages::create_stage))
        .route("/api/schedule", get(schedule::list_schedule))
        .route("/api/schedule/grid/{date}", get(schedule::schedule_grid))
        .route("/api/schedule/propose", post(schedule::propose_placement))
        .route(
            "/api/schedule/performance",
            post(schedule::create_performance),
        )
        .route(
            "/api/schedule/performance/{id}",
            put(schedule::update_performance).delete(schedule::delete_performance),
        )
        .route(
            "/api/schedule/performance/{id}/move",
            put(schedule::move_performance),
        )
        .route("/health", get(health::health))
        .route("/health/live", get(health::live))
        .with_state(state)
}
