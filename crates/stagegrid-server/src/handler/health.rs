use axum::{Json, extract::State, http::StatusCode};
use chrono::{DateTime, Utc};
use serde::Serialize;

use super::AppState;

#[derive(Debug, Serialize)]
pub struct Liveness {
    pub status: &'static str,
    pub timestamp: DateTime<Utc>,
    pub version: &'static str,
}

#[derive(Debug, Serialize)]
pub struct HealthCheck {
    pub status: &'static str,
    pub message: String,
}

#[derive(Debug, Serialize)]
pub struct HealthChecks {
    pub store: HealthCheck,
    pub config: HealthCheck,
}

#[derive(Debug, Serialize)]
pub struct HealthReport {
    pub status: &'static str,
    pub timestamp: DateTime<Utc>,
    pub uptime: String,
    pub uptime_seconds: i64,
    pub version: &'static str,
    pub stages: usize,
    pub performances: usize,
    pub checks: HealthChecks,
}

/// `1d 2h 3m 4s`, leading zero units omitted.
fn format_uptime(total_seconds: i64) -> String {
    let seconds = total_seconds.max(0);
    let days = seconds / 86_400;
    let hours = (seconds % 86_400) / 3_600;
    let minutes = (seconds % 3_600) / 60;
    let secs = seconds % 60;

    let mut parts = Vec::new();
    if days > 0 {
        parts.push(format!("{days}d"));
    }
    if hours > 0 {
        parts.push(format!("{hours}h"));
    }
    if minutes > 0 {
        parts.push(format!("{minutes}m"));
    }
    parts.push(format!("{secs}s"));
    parts.join(" ")
}

pub async fn live() -> Json<Liveness> {
    Json(Liveness {
        status: "alive",
        timestamp: Utc::now(),
        version: env!("CARGO_PKG_VERSION"),
    })
}

/// Degraded (503) when stored performances overlap on a stage.
pub async fn health(State(state): State<AppState>) -> (StatusCode, Json<HealthReport>) {
    let now = Utc::now();
    let uptime_seconds = (now - state.database.started_at()).num_seconds();
    let stats = state.database.stats();

    let store = if stats.overlapping.is_empty() {
        HealthCheck {
            status: "healthy",
            message: "No overlapping performances".to_string(),
        }
    } else {
        tracing::warn!(pairs = ?stats.overlapping, "Overlapping performances in store");
        HealthCheck {
            status: "unhealthy",
            message: format!("{} overlapping performance pair(s)", stats.overlapping.len()),
        }
    };
    let placement = state.config.placement;
    let config = HealthCheck {
        status: "healthy",
        message: format!(
            "grid starts {}, {}-minute snap, {:?} clamp",
            state.config.event_day.start, placement.snap.interval_minutes, placement.clamp_policy
        ),
    };

    let healthy = store.status == "healthy";
    let status_code = if healthy {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };

    (
        status_code,
        Json(HealthReport {
            status: if healthy { "healthy" } else { "degraded" },
            timestamp: now,
            uptime: format_uptime(uptime_seconds),
            uptime_seconds,
            version: env!("CARGO_PKG_VERSION"),
            stages: stats.stages,
            performances: stats.performances,
            checks: HealthChecks { store, config },
        }),
    )
}
