//! Timeline coordinates: wall clock strings, event day offsets and pointer
//! positions.
//!
//! The grid measures everything in minutes relative to the event day start.
//! Storage and the wire use wall clock strings (`HH:MM`) and calendar dates.

use std::fmt;
use std::str::FromStr;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::{Error, Result};

const MINUTES_PER_HOUR: u32 = 60;
/// Events may run past midnight, so hours up to 47 are accepted.
const MAX_HOURS: u32 = 48;
/// Width of one grid row in the schedule view.
pub const GRID_BLOCK_MINUTES: i64 = 15;

/// Time of day in whole minutes since midnight.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct WallClock {
    minutes: u32,
}

impl WallClock {
    pub fn from_hm(hours: u32, minutes: u32) -> Result<Self> {
        if hours >= MAX_HOURS || minutes >= MINUTES_PER_HOUR {
            return Err(Error::InvalidWallClock(format!("{hours:02}:{minutes:02}")));
        }
        Ok(Self {
            minutes: hours * MINUTES_PER_HOUR + minutes,
        })
    }

    pub fn from_minutes(minutes: i64) -> Result<Self> {
        u32::try_from(minutes)
            .ok()
            .filter(|m| *m < MAX_HOURS * MINUTES_PER_HOUR)
            .map(|minutes| Self { minutes })
            .ok_or_else(|| Error::InvalidWallClock(minutes.to_string()))
    }

    pub fn minutes_since_midnight(&self) -> i64 {
        i64::from(self.minutes)
    }

    pub fn hours(&self) -> u32 {
        self.minutes / MINUTES_PER_HOUR
    }

    pub fn minutes(&self) -> u32 {
        self.minutes % MINUTES_PER_HOUR
    }
}

impl FromStr for WallClock {
    type Err = Error;

    /// Accepts `HH:MM` and `HH:MM:SS` (seconds are dropped).
    fn from_str(s: &str) -> Result<Self> {
        let invalid = || Error::InvalidWallClock(s.to_string());
        let mut parts = s.trim().split(':');
        let hours = parts.next().ok_or_else(invalid)?;
        let minutes = parts.next().ok_or_else(invalid)?;
        let digits = |field: &str| !field.is_empty() && field.bytes().all(|b| b.is_ascii_digit());
        if let Some(seconds) = parts.next() {
            if seconds.len() != 2
                || !digits(seconds)
                || seconds.parse::<u32>().map_or(true, |s| s >= 60)
            {
                return Err(invalid());
            }
        }
        if parts.next().is_some()
            || !digits(hours)
            || hours.len() > 2
            || !digits(minutes)
            || minutes.len() != 2
        {
            return Err(invalid());
        }
        let hours: u32 = hours.parse().map_err(|_| invalid())?;
        let minutes: u32 = minutes.parse().map_err(|_| invalid())?;
        Self::from_hm(hours, minutes).map_err(|_| invalid())
    }
}

impl fmt::Display for WallClock {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:02}:{:02}", self.hours(), self.minutes())
    }
}

impl TryFrom<String> for WallClock {
    type Error = Error;

    fn try_from(value: String) -> Result<Self> {
        value.parse()
    }
}

impl From<WallClock> for String {
    fn from(value: WallClock) -> Self {
        value.to_string()
    }
}

/// Parses a `YYYY-MM-DD` calendar date.
pub fn parse_date(s: &str) -> Result<NaiveDate> {
    NaiveDate::parse_from_str(s.trim(), "%Y-%m-%d").map_err(|_| Error::InvalidDate(s.to_string()))
}

/// Anchor of the grid: minute 0 of the timeline is `start`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventDay {
    pub start: WallClock,
}

impl Default for EventDay {
    fn default() -> Self {
        Self {
            start: WallClock { minutes: 9 * MINUTES_PER_HOUR },
        }
    }
}

impl EventDay {
    pub fn new(start: WallClock) -> Self {
        Self { start }
    }

    /// Minutes since midnight to grid minutes.
    pub fn to_relative(&self, absolute_minutes: i64) -> i64 {
        absolute_minutes - self.start.minutes_since_midnight()
    }

    /// Grid minutes to minutes since midnight.
    pub fn to_absolute(&self, relative_minutes: i64) -> i64 {
        relative_minutes + self.start.minutes_since_midnight()
    }

    pub fn wall_clock(&self, relative_minutes: i64) -> Result<WallClock> {
        WallClock::from_minutes(self.to_absolute(relative_minutes))
    }

    pub fn relative_of(&self, clock: WallClock) -> i64 {
        self.to_relative(clock.minutes_since_midnight())
    }
}

/// Vertical scale of the grid view.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TimelineScale {
    pub pixels_per_minute: f64,
}

impl Default for TimelineScale {
    fn default() -> Self {
        Self {
            pixels_per_minute: 2.0,
        }
    }
}

impl TimelineScale {
    pub fn new(pixels_per_minute: f64) -> Result<Self> {
        if !pixels_per_minute.is_finite() || pixels_per_minute <= 0.0 {
            return Err(Error::InvalidScale(pixels_per_minute));
        }
        Ok(Self { pixels_per_minute })
    }

    /// Desired block start for a pointer at `pointer_y` pixels from the top of
    /// the stage column. The pointer is centered inside the dragged block and
    /// the result never goes above the top of the grid.
    #[allow(clippy::cast_precision_loss)]
    pub fn pointer_to_minutes(&self, pointer_y: f64, duration_minutes: i64) -> f64 {
        let block_height = duration_minutes as f64 * self.pixels_per_minute;
        let adjusted = pointer_y - block_height / 2.0;
        (adjusted / self.pixels_per_minute).max(0.0)
    }

    #[allow(clippy::cast_precision_loss)]
    pub fn minutes_to_pixels(&self, minutes: i64) -> f64 {
        minutes as f64 * self.pixels_per_minute
    }
}

/// One row of the schedule grid.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimeSlot {
    pub time: WallClock,
    pub minutes: i64,
    pub slot_index: usize,
}

/// Rows from `from_hour` (inclusive) to `to_hour` (exclusive) every
/// `step_minutes`.
pub fn time_slots(from_hour: u32, to_hour: u32, step_minutes: u32) -> Vec<TimeSlot> {
    let step = step_minutes.max(1) as usize;
    let end = to_hour.min(MAX_HOURS) * MINUTES_PER_HOUR;
    (from_hour * MINUTES_PER_HOUR..end)
        .step_by(step)
        .enumerate()
        .map(|(slot_index, minutes)| TimeSlot {
            time: WallClock { minutes },
            minutes: i64::from(minutes),
            slot_index,
        })
        .collect()
}

/// Number of grid rows a performance of `duration_minutes` spans.
pub fn time_blocks(duration_minutes: i64) -> i64 {
    if duration_minutes <= 0 {
        return 0;
    }
    (duration_minutes + GRID_BLOCK_MINUTES - 1) / GRID_BLOCK_MINUTES
}
