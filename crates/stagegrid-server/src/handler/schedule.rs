use axum::{
    Json,
    extract::{Path, Query, State, rejection::JsonRejection},
    http::StatusCode,
};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use stagegrid_core::{
    PerformanceId, Resolution, StageId, StageTimeline, TimeSlot, WallClock, time::parse_date,
    time_slots,
};

use super::{AppState, error::ApiError};
use crate::{
    common::{
        performance::{PerformanceStatus, PerformanceView, StoredPerformance},
        stage::Stage,
    },
    service::database::{MAX_LENGTH_MINUTES, NewPerformance, PerformanceFilter, PerformancePatch},
    util::{api_required, required_str},
};

/// The grid shows 15-minute rows from 08:00 to midnight.
const GRID_FIRST_HOUR: u32 = 8;
const GRID_LAST_HOUR: u32 = 24;
const GRID_STEP_MINUTES: u32 = 15;

#[derive(Debug, Default, Deserialize)]
pub struct ScheduleQuery {
    pub festival_id: Option<u64>,
    pub performance_date: Option<String>,
    pub stage_id: Option<StageId>,
}

#[derive(Debug, Default, Deserialize)]
pub struct GridQuery {
    pub festival_id: Option<u64>,
}

#[derive(Debug, Default, Deserialize)]
pub struct CreatePerformanceRequest {
    pub festival_id: Option<u64>,
    pub artist_name: Option<String>,
    pub stage_id: Option<StageId>,
    pub performance_date: Option<String>,
    pub start_time: Option<String>,
    pub duration_minutes: Option<i64>,
    pub setup_minutes: Option<i64>,
    pub soundcheck_time: Option<String>,
    pub soundcheck_duration: Option<i64>,
    pub notes: Option<String>,
    pub status: Option<PerformanceStatus>,
}

#[derive(Debug, Default, Deserialize)]
pub struct UpdatePerformanceRequest {
    pub artist_name: Option<String>,
    pub stage_id: Option<StageId>,
    pub performance_date: Option<String>,
    pub start_time: Option<String>,
    pub duration_minutes: Option<i64>,
    pub setup_minutes: Option<i64>,
    pub soundcheck_time: Option<String>,
    pub soundcheck_duration: Option<i64>,
    pub notes: Option<String>,
    pub status: Option<PerformanceStatus>,
    pub expected_version: Option<u64>,
}

#[derive(Debug, Deserialize)]
pub struct MovePerformanceRequest {
    pub stage_id: StageId,
    pub start_time: String,
    pub performance_date: Option<String>,
    pub expected_version: Option<u64>,
}

#[derive(Debug, Deserialize)]
pub struct ProposePlacementRequest {
    pub performance_id: PerformanceId,
    pub stage_id: StageId,
    /// Unsnapped block start in grid minutes.
    pub desired_minutes: f64,
    /// Unsnapped position of the previous update in the same drag gesture;
    /// defaults to the block's stored start.
    pub previous_minutes: Option<f64>,
    pub performance_date: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct ProposePlacementResponse {
    pub performance_id: PerformanceId,
    pub stage_id: StageId,
    pub start_minutes: i64,
    pub start_time: WallClock,
    pub resolution: Resolution,
    /// Whether the proposed slot is clear of every neighbour, not only the
    /// one the engine resolved against.
    pub clear: bool,
}

#[derive(Debug, Serialize)]
pub struct ScheduleGrid {
    pub date: NaiveDate,
    pub stages: Vec<Stage>,
    pub time_slots: Vec<TimeSlot>,
    pub performances: Vec<PerformanceView>,
}

#[derive(Debug, Serialize)]
pub struct DeleteResponse {
    pub message: &'static str,
}

fn parse_optional_date(value: Option<&str>) -> Result<Option<NaiveDate>, ApiError> {
    value
        .filter(|s| !s.is_empty())
        .map(parse_date)
        .transpose()
        .map_err(ApiError::from)
}

fn parse_optional_clock(value: Option<&str>) -> Result<Option<WallClock>, ApiError> {
    value
        .filter(|s| !s.is_empty())
        .map(str::parse::<WallClock>)
        .transpose()
        .map_err(ApiError::from)
}

/// Grid minutes from a client must be finite and within two days of grid start.
#[allow(clippy::cast_precision_loss)]
fn grid_minutes(value: f64, field: &str) -> Result<f64, ApiError> {
    let limit = MAX_LENGTH_MINUTES as f64;
    if value.is_finite() && (-limit..=limit).contains(&value) {
        Ok(value)
    } else {
        Err(ApiError::validation(format!(
            "{field} must be between -{MAX_LENGTH_MINUTES} and {MAX_LENGTH_MINUTES}"
        )))
    }
}

fn to_views(state: &AppState, rows: Vec<StoredPerformance>) -> Vec<PerformanceView> {
    let stages = state.database.list_stages();
    rows.into_iter()
        .map(|p| {
            let stage_name = stages
                .iter()
                .find(|s| s.id == p.stage_id)
                .map(|s| s.name.clone());
            PerformanceView::new(p, stage_name)
        })
        .collect()
}

fn to_view(state: &AppState, performance: StoredPerformance) -> PerformanceView {
    let stage_name = state
        .database
        .get_stage(performance.stage_id)
        .map(|s| s.name);
    PerformanceView::new(performance, stage_name)
}

pub async fn list_schedule(
    State(state): State<AppState>,
    Query(query): Query<ScheduleQuery>,
) -> Result<Json<Vec<PerformanceView>>, ApiError> {
    let filter = PerformanceFilter {
        festival_id: query.festival_id,
        performance_date: parse_optional_date(query.performance_date.as_deref())?,
        stage_id: query.stage_id,
    };
    let rows = state.database.list_performances(&filter);
    Ok(Json(to_views(&state, rows)))
}

pub async fn schedule_grid(
    State(state): State<AppState>,
    Path(date): Path<String>,
    Query(query): Query<GridQuery>,
) -> Result<Json<ScheduleGrid>, ApiError> {
    let date = parse_date(&date)?;
    let rows = state.database.list_performances(&PerformanceFilter {
        festival_id: query.festival_id,
        performance_date: Some(date),
        stage_id: None,
    });
    Ok(Json(ScheduleGrid {
        date,
        stages: state.database.list_stages(),
        time_slots: time_slots(GRID_FIRST_HOUR, GRID_LAST_HOUR, GRID_STEP_MINUTES),
        performances: to_views(&state, rows),
    }))
}

pub async fn create_performance(
    State(state): State<AppState>,
    payload: Result<Json<CreatePerformanceRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<PerformanceView>), ApiError> {
    let Json(req) = payload?;

    let artist_name = api_required!(req.artist_name, "Missing required fields: artist_name")?;
    required_str(&artist_name, "Missing required fields: artist_name")?;
    let stage_id = api_required!(req.stage_id, "Missing required fields: stage_id")?;
    let performance_date = api_required!(
        parse_optional_date(req.performance_date.as_deref())?,
        "Missing required fields: performance_date"
    )?;
    let start_time = api_required!(
        parse_optional_clock(req.start_time.as_deref())?,
        "Missing required fields: start_time"
    )?;
    let duration_minutes = api_required!(
        req.duration_minutes.filter(|d| *d > 0),
        "Missing required fields: duration_minutes"
    )?;

    let performance = state.database.create_performance(NewPerformance {
        festival_id: req.festival_id,
        artist_name: artist_name.trim().to_string(),
        stage_id,
        performance_date,
        start_time,
        duration_minutes,
        setup_minutes: req.setup_minutes,
        soundcheck_time: parse_optional_clock(req.soundcheck_time.as_deref())?,
        soundcheck_duration: req.soundcheck_duration,
        notes: req.notes,
        status: req.status,
    })?;

    tracing::info!(
        performance_id = performance.id,
        stage_id = performance.stage_id,
        start_time = %performance.start_time,
        "Performance created"
    );

    Ok((StatusCode::CREATED, Json(to_view(&state, performance))))
}

pub async fn update_performance(
    State(state): State<AppState>,
    Path(id): Path<PerformanceId>,
    payload: Result<Json<UpdatePerformanceRequest>, JsonRejection>,
) -> Result<Json<PerformanceView>, ApiError> {
    let Json(req) = payload?;

    if let Some(name) = &req.artist_name {
        required_str(name, "artist_name must not be empty")?;
    }
    let patch = PerformancePatch {
        artist_name: req.artist_name.map(|name| name.trim().to_string()),
        stage_id: req.stage_id,
        performance_date: parse_optional_date(req.performance_date.as_deref())?,
        start_time: parse_optional_clock(req.start_time.as_deref())?,
        duration_minutes: req.duration_minutes,
        setup_minutes: req.setup_minutes,
        soundcheck_time: parse_optional_clock(req.soundcheck_time.as_deref())?,
        soundcheck_duration: req.soundcheck_duration,
        notes: req.notes,
        status: req.status,
    };

    let performance = state
        .database
        .update_performance(id, patch, req.expected_version)?;

    tracing::info!(performance_id = id, version = performance.version, "Performance updated");

    Ok(Json(to_view(&state, performance)))
}

pub async fn move_performance(
    State(state): State<AppState>,
    Path(id): Path<PerformanceId>,
    payload: Result<Json<MovePerformanceRequest>, JsonRejection>,
) -> Result<Json<PerformanceView>, ApiError> {
    let Json(req) = payload?;
    let start_time: WallClock = req.start_time.parse()?;
    let performance_date = parse_optional_date(req.performance_date.as_deref())?;

    let performance = state.database.move_performance(
        id,
        req.stage_id,
        start_time,
        performance_date,
        req.expected_version,
    )?;

    tracing::info!(
        performance_id = id,
        stage_id = req.stage_id,
        start_time = %start_time,
        version = performance.version,
        "Performance moved"
    );

    Ok(Json(to_view(&state, performance)))
}

/// Runs the placement engine against the stored neighbours on the target
/// stage.
pub async fn propose_placement(
    State(state): State<AppState>,
    payload: Result<Json<ProposePlacementRequest>, JsonRejection>,
) -> Result<Json<ProposePlacementResponse>, ApiError> {
    let Json(req) = payload?;
    let day = state.config.event_day;
    let desired = grid_minutes(req.desired_minutes, "desired_minutes")?;
    let previous = req
        .previous_minutes
        .map(|value| grid_minutes(value, "previous_minutes"))
        .transpose()?;

    let performance = state
        .database
        .get_performance(req.performance_id)
        .ok_or_else(|| ApiError::not_found("Performance"))?;
    if state.database.get_stage(req.stage_id).is_none() {
        return Err(ApiError::not_found("Stage"));
    }
    let date = parse_optional_date(req.performance_date.as_deref())?
        .unwrap_or(performance.performance_date);

    let siblings = state.database.siblings(&performance, req.stage_id, date);
    let others: Vec<_> = siblings.iter().map(|p| p.to_block(&day)).collect();
    let moving = performance.to_block(&day);
    #[allow(clippy::cast_precision_loss)]
    let previous = previous.unwrap_or(moving.start_minutes as f64);

    let placement = state
        .engine()
        .propose(&moving, desired, req.stage_id, &others, previous);

    let start_time = day.wall_clock(placement.start_minutes)?;
    let timeline = StageTimeline::from_performances(&others);
    let clear = timeline.is_free(moving.span_at(placement.start_minutes), Some(moving.id));

    tracing::debug!(
        performance_id = moving.id,
        stage_id = req.stage_id,
        desired,
        start_minutes = placement.start_minutes,
        clear,
        "Placement proposed"
    );

    Ok(Json(ProposePlacementResponse {
        performance_id: moving.id,
        stage_id: placement.stage_id,
        start_minutes: placement.start_minutes,
        start_time,
        resolution: placement.resolution,
        clear,
    }))
}

pub async fn delete_performance(
    State(state): State<AppState>,
    Path(id): Path<PerformanceId>,
) -> Result<Json<DeleteResponse>, ApiError> {
    state.database.delete_performance(id)?;
    tracing::info!(performance_id = id, "Performance deleted");
    Ok(Json(DeleteResponse {
        message: "Performance deleted successfully",
    }))
}

#[cfg(test)]
mod tests {
    use axum::http::StatusCode;
    use serde_json::{Value, json};

    use crate::handler::test_support::{app, send};

    async fn seed(app: &axum::Router) {
        send(app, "POST", "/api/stages", Some(json!({ "name": "Main" }))).await;
        send(app, "POST", "/api/stages", Some(json!({ "name": "Tent", "sort_order": 1 }))).await;
    }

    fn performance(stage_id: u64, start: &str, duration: i64, setup: i64) -> Value {
        json!({
            "artist_name": format!("Act {start}"),
            "stage_id": stage_id,
            "performance_date": "2026-07-18",
            "start_time": start,
            "duration_minutes": duration,
            "setup_minutes": setup,
        })
    }

    #[tokio::test]
    async fn test_create_and_list() {
        let (app, _) = app();
        seed(&app).await;

        let (status, body) = send(
            &app,
            "POST",
            "/api/schedule/performance",
            Some(performance(1, "10:00", 45, 15)),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(body["end_time"], "10:45");
        assert_eq!(body["start_minutes"], 600);
        assert_eq!(body["time_blocks"], 3);
        assert_eq!(body["stage_name"], "Main");
        assert_eq!(body["version"], 1);

        let (status, body) = send(
            &app,
            "GET",
            "/api/schedule?performance_date=2026-07-18&stage_id=1",
            None,
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body.as_array().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_create_missing_fields() {
        let (app, _) = app();
        seed(&app).await;
        let (status, body) = send(
            &app,
            "POST",
            "/api/schedule/performance",
            Some(json!({ "artist_name": "Nobody", "stage_id": 1 })),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"], "Missing required fields: performance_date");
    }

    #[tokio::test]
    async fn test_create_conflict_reports_neighbours() {
        let (app, _) = app();
        seed(&app).await;
        send(&app, "POST", "/api/schedule/performance", Some(performance(1, "10:00", 60, 15))).await;

        let (status, body) = send(
            &app,
            "POST",
            "/api/schedule/performance",
            Some(performance(1, "11:05", 30, 10)),
        )
        .await;
        assert_eq!(status, StatusCode::CONFLICT);
        assert_eq!(body["code"], "CONFLICT");
        assert_eq!(body["details"]["conflicts"][0]["id"], 1);
    }

    #[tokio::test]
    async fn test_move_is_revalidated() {
        let (app, _) = app();
        seed(&app).await;
        send(&app, "POST", "/api/schedule/performance", Some(performance(1, "10:00", 60, 15))).await;
        send(&app, "POST", "/api/schedule/performance", Some(performance(1, "13:00", 30, 10))).await;

        let (status, _) = send(
            &app,
            "PUT",
            "/api/schedule/performance/2/move",
            Some(json!({ "stage_id": 1, "start_time": "10:30" })),
        )
        .await;
        assert_eq!(status, StatusCode::CONFLICT);

        let (status, body) = send(
            &app,
            "PUT",
            "/api/schedule/performance/2/move",
            Some(json!({ "stage_id": 2, "start_time": "10:30", "expected_version": 1 })),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["stage_name"], "Tent");
        assert_eq!(body["version"], 2);

        let (status, body) = send(
            &app,
            "PUT",
            "/api/schedule/performance/2/move",
            Some(json!({ "stage_id": 1, "start_time": "12:00", "expected_version": 1 })),
        )
        .await;
        assert_eq!(status, StatusCode::CONFLICT);
        assert_eq!(body["details"]["actual_version"], 2);
    }

    #[tokio::test]
    async fn test_move_rejects_bad_time() {
        let (app, _) = app();
        seed(&app).await;
        send(&app, "POST", "/api/schedule/performance", Some(performance(1, "10:00", 60, 15))).await;
        let (status, _) = send(
            &app,
            "PUT",
            "/api/schedule/performance/1/move",
            Some(json!({ "stage_id": 1, "start_time": "half past ten" })),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_propose_clamps_against_stored_neighbour() {
        let (app, _) = app();
        seed(&app).await;
        // Grid starts at 09:00; occupies grid minutes [100, 160).
        send(&app, "POST", "/api/schedule/performance", Some(performance(1, "10:50", 50, 10))).await;
        // Moving block: 30 minutes with 10 minutes setup, currently at grid minute 40.
        send(&app, "POST", "/api/schedule/performance", Some(performance(1, "09:40", 30, 10))).await;

        let (status, body) = send(
            &app,
            "POST",
            "/api/schedule/propose",
            Some(json!({ "performance_id": 2, "stage_id": 1, "desired_minutes": 80.0 })),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        // 100 + 10 - 30: the setup offset leaves the block's own setup over
        // the neighbour, so the slot is not clear.
        assert_eq!(body["start_minutes"], 80);
        assert_eq!(body["start_time"], "10:20");
        assert_eq!(body["resolution"]["kind"], "clamped_before");
        assert_eq!(body["clear"], false);

        let (_, body) = send(
            &app,
            "POST",
            "/api/schedule/propose",
            Some(json!({
                "performance_id": 2,
                "stage_id": 1,
                "desired_minutes": 150.0,
                "previous_minutes": 200.0
            })),
        )
        .await;
        assert_eq!(body["start_minutes"], 170);
        assert_eq!(body["resolution"]["blocker"], 1);
        assert_eq!(body["clear"], true);
    }

    #[tokio::test]
    async fn test_propose_reports_second_neighbour_not_clear() {
        let (app, _) = app();
        seed(&app).await;
        // Grid minutes [100, 160) and [170, 230).
        send(&app, "POST", "/api/schedule/performance", Some(performance(1, "10:50", 50, 10))).await;
        send(&app, "POST", "/api/schedule/performance", Some(performance(1, "12:00", 50, 10))).await;
        send(&app, "POST", "/api/schedule/performance", Some(performance(1, "09:40", 30, 10))).await;

        let (status, body) = send(
            &app,
            "POST",
            "/api/schedule/propose",
            Some(json!({
                "performance_id": 3,
                "stage_id": 1,
                "desired_minutes": 140.0,
                "previous_minutes": 300.0
            })),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        // Pushed out of the first neighbour straight into the second.
        assert_eq!(body["start_minutes"], 170);
        assert_eq!(body["resolution"]["blocker"], 1);
        assert_eq!(body["clear"], false);

        let (status, body) = send(
            &app,
            "PUT",
            "/api/schedule/performance/3/move",
            Some(json!({ "stage_id": 1, "start_time": "11:50" })),
        )
        .await;
        assert_eq!(status, StatusCode::CONFLICT);
        assert_eq!(body["details"]["conflicts"][0]["id"], 2);
    }

    #[tokio::test]
    async fn test_propose_rejects_out_of_range_minutes() {
        let (app, _) = app();
        seed(&app).await;
        send(&app, "POST", "/api/schedule/performance", Some(performance(1, "09:40", 30, 10))).await;

        for body in [
            json!({ "performance_id": 1, "stage_id": 1, "desired_minutes": 1e300 }),
            json!({ "performance_id": 1, "stage_id": 1, "desired_minutes": -1e300 }),
            json!({
                "performance_id": 1,
                "stage_id": 1,
                "desired_minutes": 60.0,
                "previous_minutes": 1e300
            }),
        ] {
            let (status, body) = send(&app, "POST", "/api/schedule/propose", Some(body)).await;
            assert_eq!(status, StatusCode::BAD_REQUEST);
            assert_eq!(body["code"], "VALIDATION_ERROR");
        }
    }

    #[tokio::test]
    async fn test_create_rejects_oversized_lengths() {
        let (app, _) = app();
        seed(&app).await;

        let mut huge_duration = performance(1, "10:00", 60, 15);
        huge_duration["duration_minutes"] = json!(i64::MAX);
        let mut huge_setup = performance(1, "10:00", 60, 15);
        huge_setup["setup_minutes"] = json!(i64::MAX);
        let mut huge_soundcheck = performance(1, "10:00", 60, 15);
        huge_soundcheck["soundcheck_duration"] = json!(i64::MAX);

        for body in [huge_duration, huge_setup, huge_soundcheck] {
            let (status, body) =
                send(&app, "POST", "/api/schedule/performance", Some(body)).await;
            assert_eq!(status, StatusCode::BAD_REQUEST);
            assert_eq!(body["code"], "VALIDATION_ERROR");
        }

        let (status, _) = send(
            &app,
            "POST",
            "/api/schedule/performance",
            Some(performance(1, "12:00", 60, 15)),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED);
        let (status, _) = send(&app, "GET", "/health", None).await;
        assert_eq!(status, StatusCode::OK);

        let (status, _) = send(
            &app,
            "PUT",
            "/api/schedule/performance/1",
            Some(json!({ "setup_minutes": i64::MAX })),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_propose_unknown_performance() {
        let (app, _) = app();
        seed(&app).await;
        let (status, body) = send(
            &app,
            "POST",
            "/api/schedule/propose",
            Some(json!({ "performance_id": 42, "stage_id": 1, "desired_minutes": 0.0 })),
        )
        .await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["error"], "Performance not found");
    }

    #[tokio::test]
    async fn test_grid() {
        let (app, _) = app();
        seed(&app).await;
        send(&app, "POST", "/api/schedule/performance", Some(performance(2, "20:00", 90, 30))).await;

        let (status, body) = send(&app, "GET", "/api/schedule/grid/2026-07-18", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["time_slots"].as_array().unwrap().len(), 64);
        assert_eq!(body["stages"].as_array().unwrap().len(), 2);
        assert_eq!(body["performances"][0]["end_time"], "21:30");

        let (status, _) = send(&app, "GET", "/api/schedule/grid/18-07-2026", None).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_update_and_delete() {
        let (app, database) = app();
        seed(&app).await;
        send(&app, "POST", "/api/schedule/performance", Some(performance(1, "10:00", 60, 15))).await;

        let (status, body) = send(
            &app,
            "PUT",
            "/api/schedule/performance/1",
            Some(json!({ "setup_minutes": 30, "notes": "bring risers" })),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["setup_minutes"], 30);
        assert_eq!(body["notes"], "bring risers");
        assert_eq!(body["start_time"], "10:00");

        let (status, _) = send(&app, "DELETE", "/api/schedule/performance/1", None).await;
        assert_eq!(status, StatusCode::OK);
        assert!(database.get_performance(1).is_none());

        let (status, _) = send(&app, "DELETE", "/api/schedule/performance/1", None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }
}
