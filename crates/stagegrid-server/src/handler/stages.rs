use axum::{
    Json,
    extract::{State, rejection::JsonRejection},
    http::StatusCode,
};
use serde::Deserialize;

use super::{AppState, error::ApiError};
use crate::{common::stage::Stage, util::bounded_str};

#[derive(Debug, Deserialize)]
pub struct CreateStageRequest {
    pub name: String,
    #[serde(default = "default_kind")]
    pub kind: String,
    #[serde(default)]
    pub sort_order: i32,
}

fn default_kind() -> String {
    "stage".to_string()
}

pub async fn list_stages(State(state): State<AppState>) -> Json<Vec<Stage>> {
    Json(state.database.list_stages())
}

pub async fn create_stage(
    State(state): State<AppState>,
    payload: Result<Json<CreateStageRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<Stage>), ApiError> {
    let Json(req) = payload?;
    bounded_str(&req.name, 64, "name must be 1-64 characters")?;

    let stage = state
        .database
        .create_stage(req.name.trim(), req.kind.trim(), req.sort_order);
    tracing::info!(stage_id = stage.id, name = %stage.name, "Stage created");

    Ok((StatusCode::CREATED, Json(stage)))
}
