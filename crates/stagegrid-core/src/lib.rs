//! Stagegrid Core Library
//!
//! Scheduling logic for festival stage grids: performance blocks with setup
//! buffers, collision-aware placement of a dragged block, grid snapping and
//! the per-stage timeline used to re-validate writes.
//!
//! Everything here is pure computation with no I/O:
//! - `placement`: resolves a desired drop position into a snapped start time
//! - `drag`: explicit state for one drag gesture (start, move, drop, cancel)
//! - `timeline`: ordered interval set of occupied spans on one stage
//! - `time`: wall clock, event day offsets and pointer coordinates

#![allow(clippy::must_use_candidate)]
#![allow(clippy::missing_panics_doc)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::module_name_repetitions)]

pub mod drag;
pub mod performance;
pub mod placement;
pub mod snap;
pub mod time;
pub mod timeline;

pub use drag::{DragGesture, MoveRequest};
pub use performance::{Performance, PerformanceId, Span, StageId};
pub use placement::{
    ClampPolicy, Placement, PlacementConfig, PlacementEngine, Resolution, propose_placement,
};
pub use snap::{DEFAULT_SNAP_MINUTES, SnapConfig};
pub use time::{EventDay, TimeSlot, TimelineScale, WallClock, time_blocks, time_slots};
pub use timeline::StageTimeline;

/// Result type for stagegrid-core operations
pub type Result<T> = std::result::Result<T, Error>;

/// Error types for stagegrid-core operations
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("Invalid wall clock time '{0}', expected HH:MM")]
    InvalidWallClock(String),

    #[error("Invalid date '{0}', expected YYYY-MM-DD")]
    InvalidDate(String),

    #[error("Invalid timeline scale: {0} pixels per minute")]
    InvalidScale(f64),
}
