use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use stagegrid_core::{EventDay, Performance, PerformanceId, Span, StageId, WallClock, time_blocks};

/// Minimum length of a performance; shorter requests are stretched.
pub const MIN_DURATION_MINUTES: i64 = 5;
pub const DEFAULT_SETUP_MINUTES: i64 = 15;
pub const DEFAULT_SOUNDCHECK_MINUTES: i64 = 30;
pub const DEFAULT_FESTIVAL_ID: u64 = 1;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PerformanceStatus {
    #[default]
    Scheduled,
    Confirmed,
    /// Cancelled performances stay listed but never block a slot.
    Cancelled,
}

/// A performance as kept by the schedule store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoredPerformance {
    pub id: PerformanceId,
    pub festival_id: u64,
    pub artist_name: String,
    pub stage_id: StageId,
    pub performance_date: NaiveDate,
    pub start_time: WallClock,
    pub duration_minutes: i64,
    pub setup_minutes: i64,
    pub soundcheck_time: Option<WallClock>,
    pub soundcheck_duration: i64,
    pub notes: Option<String>,
    pub status: PerformanceStatus,
    /// Incremented on every write.
    pub version: u64,
    pub updated_at: DateTime<Utc>,
}

impl StoredPerformance {
    pub fn start_minutes(&self) -> i64 {
        self.start_time.minutes_since_midnight()
    }

    pub fn end_minutes(&self) -> i64 {
        self.start_minutes().saturating_add(self.duration_minutes)
    }

    /// Occupied span in minutes since midnight, setup included.
    pub fn occupied_span(&self) -> Span {
        Span::new(
            self.start_minutes().saturating_sub(self.setup_minutes),
            self.end_minutes(),
        )
    }

    pub fn blocks_slot(&self) -> bool {
        self.status != PerformanceStatus::Cancelled
    }

    /// Whether `other` competes for the same stage slot on the same day.
    pub fn shares_slot_with(&self, other: &StoredPerformance) -> bool {
        self.id != other.id
            && self.festival_id == other.festival_id
            && self.stage_id == other.stage_id
            && self.performance_date == other.performance_date
    }

    /// Block in grid coordinates of `day`.
    pub fn to_block(&self, day: &EventDay) -> Performance {
        Performance::new(
            self.id,
            self.stage_id,
            day.relative_of(self.start_time),
            self.duration_minutes,
            self.setup_minutes,
        )
    }
}

/// Listing shape: the stored record plus derived grid fields.
#[derive(Debug, Clone, Serialize)]
pub struct PerformanceView {
    #[serde(flatten)]
    pub performance: StoredPerformance,
    pub stage_name: Option<String>,
    pub end_time: Option<WallClock>,
    pub start_minutes: i64,
    pub end_minutes: i64,
    pub time_blocks: i64,
}

impl PerformanceView {
    pub fn new(performance: StoredPerformance, stage_name: Option<String>) -> Self {
        let start_minutes = performance.start_minutes();
        let end_minutes = performance.end_minutes();
        Self {
            stage_name,
            end_time: WallClock::from_minutes(end_minutes).ok(),
            start_minutes,
            end_minutes,
            time_blocks: time_blocks(performance.duration_minutes),
            performance,
        }
    }
}

/// Neighbour reported back when a write is rejected.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ConflictInfo {
    pub id: PerformanceId,
    pub artist_name: String,
    pub start_time: WallClock,
    pub duration_minutes: i64,
    pub setup_minutes: i64,
}

impl From<&StoredPerformance> for ConflictInfo {
    fn from(p: &StoredPerformance) -> Self {
        Self {
            id: p.id,
            artist_name: p.artist_name.clone(),
            start_time: p.start_time,
            duration_minutes: p.duration_minutes,
            setup_minutes: p.setup_minutes,
        }
    }
}
