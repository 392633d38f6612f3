use std::{
    collections::{BTreeMap, HashMap},
    sync::Arc,
};

use axum::http::StatusCode;
use chrono::{DateTime, NaiveDate, Utc};
use parking_lot::RwLock;
use stagegrid_core::{PerformanceId, StageId, StageTimeline, WallClock};
use thiserror::Error;

use crate::common::{
    performance::{
        ConflictInfo, DEFAULT_FESTIVAL_ID, DEFAULT_SETUP_MINUTES, DEFAULT_SOUNDCHECK_MINUTES,
        MIN_DURATION_MINUTES, PerformanceStatus, StoredPerformance,
    },
    stage::Stage,
};

/// Latest minute a performance may end at (`47:59`).
const LATEST_END_MINUTES: i64 = 48 * 60 - 1;

/// Upper bound for duration, setup and soundcheck lengths.
pub const MAX_LENGTH_MINUTES: i64 = 48 * 60;

/// In-memory schedule store. Cloning shares the same data.
#[derive(Clone)]
pub struct Database {
    store: Arc<RwLock<Store>>,
    started_at: DateTime<Utc>,
}

#[derive(Default)]
struct Store {
    stages: BTreeMap<StageId, Stage>,
    performances: BTreeMap<PerformanceId, StoredPerformance>,
    last_stage_id: StageId,
    last_performance_id: PerformanceId,
}

#[derive(Error, Debug)]
pub enum DatabaseError {
    #[error(transparent)]
    Core(#[from] stagegrid_core::Error),

    #[error("Performance not found")]
    PerformanceNotFound(PerformanceId),

    #[error("Stage not found")]
    StageNotFound(StageId),

    #[error("Time slot conflict detected")]
    Conflict { conflicts: Vec<ConflictInfo> },

    #[error("Performance was modified concurrently (expected version {expected}, found {actual})")]
    VersionMismatch { expected: u64, actual: u64 },

    #[error("{0}")]
    Validation(String),
}

impl DatabaseError {
    pub fn to_status(&self) -> StatusCode {
        match self {
            DatabaseError::Core(_) | DatabaseError::Validation(_) => StatusCode::BAD_REQUEST,
            DatabaseError::PerformanceNotFound(_) | DatabaseError::StageNotFound(_) => {
                StatusCode::NOT_FOUND
            }
            DatabaseError::Conflict { .. } | DatabaseError::VersionMismatch { .. } => {
                StatusCode::CONFLICT
            }
        }
    }
}

/// Fields of a new performance. Optional fields take the schedule defaults.
#[derive(Debug, Clone)]
pub struct NewPerformance {
    pub festival_id: Option<u64>,
    pub artist_name: String,
    pub stage_id: StageId,
    pub performance_date: NaiveDate,
    pub start_time: WallClock,
    pub duration_minutes: i64,
    pub setup_minutes: Option<i64>,
    pub soundcheck_time: Option<WallClock>,
    pub soundcheck_duration: Option<i64>,
    pub notes: Option<String>,
    pub status: Option<PerformanceStatus>,
}

/// Partial update; `None` keeps the stored value.
#[derive(Debug, Clone, Default)]
pub struct PerformancePatch {
    pub artist_name: Option<String>,
    pub stage_id: Option<StageId>,
    pub performance_date: Option<NaiveDate>,
    pub start_time: Option<WallClock>,
    pub duration_minutes: Option<i64>,
    pub setup_minutes: Option<i64>,
    pub soundcheck_time: Option<WallClock>,
    pub soundcheck_duration: Option<i64>,
    pub notes: Option<String>,
    pub status: Option<PerformanceStatus>,
}

#[derive(Debug, Clone, Copy, Default)]
pub struct PerformanceFilter {
    pub festival_id: Option<u64>,
    pub performance_date: Option<NaiveDate>,
    pub stage_id: Option<StageId>,
}

impl PerformanceFilter {
    fn matches(&self, p: &StoredPerformance) -> bool {
        p.festival_id == self.festival_id.unwrap_or(DEFAULT_FESTIVAL_ID)
            && self.performance_date.is_none_or(|date| p.performance_date == date)
            && self.stage_id.is_none_or(|stage| p.stage_id == stage)
    }
}

/// Schedule health figures.
#[derive(Debug, Clone, Default)]
pub struct StoreStats {
    pub stages: usize,
    pub performances: usize,
    /// Pairs of performances breaking the no-overlap rule.
    pub overlapping: Vec<(PerformanceId, PerformanceId)>,
}

impl Store {
    fn stage(&self, id: StageId) -> Result<&Stage, DatabaseError> {
        self.stages.get(&id).ok_or(DatabaseError::StageNotFound(id))
    }

    /// Rejects `candidate` if its occupied span overlaps any other blocking
    /// performance on the same stage and day.
    fn check_slot(&self, candidate: &StoredPerformance) -> Result<(), DatabaseError> {
        if !candidate.blocks_slot() {
            return Ok(());
        }
        let mut timeline = StageTimeline::new();
        for other in self
            .performances
            .values()
            .filter(|other| other.blocks_slot() && candidate.shares_slot_with(other))
        {
            timeline.insert_span(other.id, other.occupied_span());
        }
        let conflicts = timeline.conflicts(candidate.occupied_span(), Some(candidate.id));
        if conflicts.is_empty() {
            return Ok(());
        }
        Err(DatabaseError::Conflict {
            conflicts: conflicts
                .iter()
                .filter_map(|id| self.performances.get(id))
                .map(ConflictInfo::from)
                .collect(),
        })
    }
}

fn validate_times(p: &mut StoredPerformance) -> Result<(), DatabaseError> {
    p.duration_minutes = p.duration_minutes.max(MIN_DURATION_MINUTES);
    for (field, value) in [
        ("duration_minutes", p.duration_minutes),
        ("setup_minutes", p.setup_minutes),
        ("soundcheck_duration", p.soundcheck_duration),
    ] {
        if !(0..=MAX_LENGTH_MINUTES).contains(&value) {
            return Err(DatabaseError::Validation(format!(
                "{field} must be between 0 and {MAX_LENGTH_MINUTES}"
            )));
        }
    }
    if p.end_minutes() > LATEST_END_MINUTES {
        return Err(DatabaseError::Validation(format!(
            "performance must end by 47:59, ends {} minutes after midnight",
            p.end_minutes()
        )));
    }
    Ok(())
}

impl Database {
    pub fn new() -> Self {
        Self {
            store: Arc::new(RwLock::new(Store::default())),
            started_at: Utc::now(),
        }
    }

    pub fn started_at(&self) -> DateTime<Utc> {
        self.started_at
    }

    pub fn create_stage(&self, name: &str, kind: &str, sort_order: i32) -> Stage {
        let mut store = self.store.write();
        store.last_stage_id += 1;
        let stage = Stage::new(
            store.last_stage_id,
            name.to_string(),
            kind.to_string(),
            sort_order,
        );
        store.stages.insert(stage.id, stage.clone());
        stage
    }

    /// Stages ordered by `sort_order`, then name.
    pub fn list_stages(&self) -> Vec<Stage> {
        let store = self.store.read();
        let mut stages: Vec<Stage> = store.stages.values().cloned().collect();
        stages.sort_by(|a, b| a.sort_order.cmp(&b.sort_order).then_with(|| a.name.cmp(&b.name)));
        stages
    }

    pub fn get_stage(&self, id: StageId) -> Option<Stage> {
        self.store.read().stages.get(&id).cloned()
    }

    pub fn get_performance(&self, id: PerformanceId) -> Option<StoredPerformance> {
        self.store.read().performances.get(&id).cloned()
    }

    /// Matching performances ordered by date, then start time.
    pub fn list_performances(&self, filter: &PerformanceFilter) -> Vec<StoredPerformance> {
        let store = self.store.read();
        let mut rows: Vec<StoredPerformance> = store
            .performances
            .values()
            .filter(|p| filter.matches(p))
            .cloned()
            .collect();
        rows.sort_by_key(|p| (p.performance_date, p.start_time, p.id));
        rows
    }

    /// Blocking performances sharing `stage_id` and `date` with `of`, `of`
    /// itself excluded.
    pub fn siblings(
        &self,
        of: &StoredPerformance,
        stage_id: StageId,
        date: NaiveDate,
    ) -> Vec<StoredPerformance> {
        let store = self.store.read();
        store
            .performances
            .values()
            .filter(|p| {
                p.id != of.id
                    && p.blocks_slot()
                    && p.festival_id == of.festival_id
                    && p.stage_id == stage_id
                    && p.performance_date == date
            })
            .cloned()
            .collect()
    }

    pub fn create_performance(
        &self,
        new: NewPerformance,
    ) -> Result<StoredPerformance, DatabaseError> {
        let mut store = self.store.write();
        store.stage(new.stage_id)?;

        let mut performance = StoredPerformance {
            id: store.last_performance_id + 1,
            festival_id: new.festival_id.unwrap_or(DEFAULT_FESTIVAL_ID),
            artist_name: new.artist_name,
            stage_id: new.stage_id,
            performance_date: new.performance_date,
            start_time: new.start_time,
            duration_minutes: new.duration_minutes,
            setup_minutes: new.setup_minutes.unwrap_or(DEFAULT_SETUP_MINUTES),
            soundcheck_time: new.soundcheck_time,
            soundcheck_duration: new.soundcheck_duration.unwrap_or(DEFAULT_SOUNDCHECK_MINUTES),
            notes: new.notes,
            status: new.status.unwrap_or_default(),
            version: 1,
            updated_at: Utc::now(),
        };
        validate_times(&mut performance)?;
        store.check_slot(&performance)?;

        store.last_performance_id = performance.id;
        store.performances.insert(performance.id, performance.clone());
        Ok(performance)
    }

    /// Applies `patch` after re-validating the slot. With `expected_version`
    /// the write is rejected if someone else wrote first.
    pub fn update_performance(
        &self,
        id: PerformanceId,
        patch: PerformancePatch,
        expected_version: Option<u64>,
    ) -> Result<StoredPerformance, DatabaseError> {
        let mut store = self.store.write();
        let current = store
            .performances
            .get(&id)
            .ok_or(DatabaseError::PerformanceNotFound(id))?;
        if let Some(expected) = expected_version {
            if expected != current.version {
                return Err(DatabaseError::VersionMismatch {
                    expected,
                    actual: current.version,
                });
            }
        }

        let mut updated = current.clone();
        if let Some(artist_name) = patch.artist_name {
            updated.artist_name = artist_name;
        }
        if let Some(stage_id) = patch.stage_id {
            store.stage(stage_id)?;
            updated.stage_id = stage_id;
        }
        if let Some(date) = patch.performance_date {
            updated.performance_date = date;
        }
        if let Some(start_time) = patch.start_time {
            updated.start_time = start_time;
        }
        if let Some(duration) = patch.duration_minutes {
            updated.duration_minutes = duration;
        }
        if let Some(setup) = patch.setup_minutes {
            updated.setup_minutes = setup;
        }
        if patch.soundcheck_time.is_some() {
            updated.soundcheck_time = patch.soundcheck_time;
        }
        if let Some(soundcheck_duration) = patch.soundcheck_duration {
            updated.soundcheck_duration = soundcheck_duration;
        }
        if patch.notes.is_some() {
            updated.notes = patch.notes;
        }
        if let Some(status) = patch.status {
            updated.status = status;
        }
        validate_times(&mut updated)?;
        store.check_slot(&updated)?;

        updated.version += 1;
        updated.updated_at = Utc::now();
        store.performances.insert(id, updated.clone());
        Ok(updated)
    }

    /// Persists a drag move: only stage, date and start change.
    pub fn move_performance(
        &self,
        id: PerformanceId,
        stage_id: StageId,
        start_time: WallClock,
        performance_date: Option<NaiveDate>,
        expected_version: Option<u64>,
    ) -> Result<StoredPerformance, DatabaseError> {
        let patch = PerformancePatch {
            stage_id: Some(stage_id),
            start_time: Some(start_time),
            performance_date,
            ..PerformancePatch::default()
        };
        self.update_performance(id, patch, expected_version)
    }

    pub fn delete_performance(&self, id: PerformanceId) -> Result<StoredPerformance, DatabaseError> {
        let mut store = self.store.write();
        store
            .performances
            .remove(&id)
            .ok_or(DatabaseError::PerformanceNotFound(id))
    }

    pub fn stats(&self) -> StoreStats {
        let store = self.store.read();
        let mut timelines: HashMap<(u64, NaiveDate, StageId), StageTimeline> = HashMap::new();
        for p in store.performances.values().filter(|p| p.blocks_slot()) {
            timelines
                .entry((p.festival_id, p.performance_date, p.stage_id))
                .or_default()
                .insert_span(p.id, p.occupied_span());
        }
        let mut overlapping: Vec<_> = timelines
            .values()
            .flat_map(StageTimeline::overlapping_pairs)
            .collect();
        overlapping.sort_unstable();

        StoreStats {
            stages: store.stages.len(),
            performances: store.performances.len(),
            overlapping,
        }
    }
}
