//! Drag gesture state for moving a performance block.
//!
//! A gesture runs start → update* → drop or cancel. The only state carried
//! between updates is the previous unsnapped position, used by the placement
//! engine to tell which way the block is travelling.

use serde::{Deserialize, Serialize};

use crate::Result;
use crate::performance::{Performance, PerformanceId, StageId};
use crate::placement::{Placement, PlacementEngine};
use crate::time::{EventDay, TimelineScale, WallClock};

/// Persisted outcome of a drop.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct MoveRequest {
    pub performance_id: PerformanceId,
    pub stage_id: StageId,
    /// Grid minutes relative to the event day start.
    pub start_minutes: i64,
}

impl MoveRequest {
    pub fn start_time(&self, day: &EventDay) -> Result<WallClock> {
        day.wall_clock(self.start_minutes)
    }
}

#[derive(Debug, Clone)]
pub struct DragGesture {
    performance: Performance,
    engine: PlacementEngine,
    previous_minutes: f64,
    preview: Option<Placement>,
}

impl DragGesture {
    /// Starts dragging `performance`. Direction is first judged against its
    /// current start.
    #[allow(clippy::cast_precision_loss)]
    pub fn start(performance: Performance, engine: PlacementEngine) -> Self {
        Self {
            performance,
            engine,
            previous_minutes: performance.start_minutes as f64,
            preview: None,
        }
    }

    pub fn performance(&self) -> &Performance {
        &self.performance
    }

    pub fn previous_minutes(&self) -> f64 {
        self.previous_minutes
    }

    /// Placement shown for the latest update, if any.
    pub fn preview(&self) -> Option<&Placement> {
        self.preview.as_ref()
    }

    /// Pointer moved over `stage_id`; `desired_minutes` is the unsnapped block
    /// start.
    pub fn update(
        &mut self,
        desired_minutes: f64,
        stage_id: StageId,
        others: &[Performance],
    ) -> Placement {
        let placement = self.engine.propose(
            &self.performance,
            desired_minutes,
            stage_id,
            others,
            self.previous_minutes,
        );
        if desired_minutes.is_finite() {
            self.previous_minutes = desired_minutes;
        }
        self.preview = Some(placement);
        placement
    }

    /// Same as [`DragGesture::update`] with a pointer offset in pixels from the
    /// top of the stage column.
    pub fn update_pointer(
        &mut self,
        scale: &TimelineScale,
        pointer_y: f64,
        stage_id: StageId,
        others: &[Performance],
    ) -> Placement {
        let desired = scale.pointer_to_minutes(pointer_y, self.performance.duration_minutes);
        self.update(desired, stage_id, others)
    }

    /// Ends the gesture over `stage_id`. Returns `None` when the block ends up
    /// where it started.
    pub fn drop_at(
        mut self,
        desired_minutes: f64,
        stage_id: StageId,
        others: &[Performance],
    ) -> Option<MoveRequest> {
        let placement = self.update(desired_minutes, stage_id, others);
        let unchanged = placement.stage_id == self.performance.stage_id
            && placement.start_minutes == self.performance.start_minutes;
        if unchanged {
            tracing::debug!(performance_id = self.performance.id, "drop without change");
            return None;
        }
        Some(MoveRequest {
            performance_id: self.performance.id,
            stage_id: placement.stage_id,
            start_minutes: placement.start_minutes,
        })
    }

    /// Abandons the gesture. Nothing is persisted.
    pub fn cancel(self) {
        tracing::debug!(performance_id = self.performance.id, "drag cancelled");
    }
}
