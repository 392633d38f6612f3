//! Grid snapping for timeline positions.
//!
//! Snapping is applied only after collision resolution; snapping a raw
//! position first can push a block back into its neighbour.

use serde::{Deserialize, Serialize};

/// Default snap interval of the schedule grid.
pub const DEFAULT_SNAP_MINUTES: u32 = 5;

/// Snap settings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SnapConfig {
    /// Grid interval in minutes. `0` disables the grid (nearest whole minute).
    pub interval_minutes: u32,
}

impl Default for SnapConfig {
    fn default() -> Self {
        Self {
            interval_minutes: DEFAULT_SNAP_MINUTES,
        }
    }
}

impl SnapConfig {
    pub const fn new(interval_minutes: u32) -> Self {
        Self { interval_minutes }
    }

    /// Rounds to the nearest grid multiple, halves rounding up.
    ///
    /// Non-finite input snaps to `0`.
    #[allow(clippy::cast_possible_truncation)]
    pub fn snap_minutes(&self, value: f64) -> i64 {
        if !value.is_finite() {
            return 0;
        }
        let interval = f64::from(self.interval_minutes.max(1));
        let steps = (value / interval + 0.5).floor();
        (steps * interval) as i64
    }

    /// Whether `minutes` already lies on the grid.
    pub fn is_aligned(&self, minutes: i64) -> bool {
        minutes.rem_euclid(i64::from(self.interval_minutes.max(1))) == 0
    }
}
