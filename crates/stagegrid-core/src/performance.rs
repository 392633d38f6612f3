//! Performance blocks and the spans they occupy on a stage.

use serde::{Deserialize, Serialize};

/// Unique identifier for a performance.
pub type PerformanceId = u64;

/// Unique identifier for a stage or area column.
pub type StageId = u64;

/// A performance block placed on a stage timeline.
///
/// Times are minutes relative to the event day start. The setup buffer sits
/// immediately before `start_minutes`; there is no buffer after the end.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Performance {
    pub id: PerformanceId,
    pub stage_id: StageId,
    pub start_minutes: i64,
    pub duration_minutes: i64,
    pub setup_minutes: i64,
}

impl Performance {
    pub fn new(
        id: PerformanceId,
        stage_id: StageId,
        start_minutes: i64,
        duration_minutes: i64,
        setup_minutes: i64,
    ) -> Self {
        Self {
            id,
            stage_id,
            start_minutes,
            duration_minutes,
            setup_minutes,
        }
    }

    pub fn end_minutes(&self) -> i64 {
        self.start_minutes.saturating_add(self.duration_minutes)
    }

    /// Interval reserved on the stage, setup included.
    pub fn occupied_span(&self) -> Span {
        self.span_at(self.start_minutes)
    }

    /// Span this block would occupy if it started at `start_minutes`.
    pub fn span_at(&self, start_minutes: i64) -> Span {
        Span::new(
            start_minutes.saturating_sub(self.setup_minutes),
            start_minutes.saturating_add(self.duration_minutes),
        )
    }

    /// Copy of this block moved to another stage and start.
    pub fn moved_to(&self, stage_id: StageId, start_minutes: i64) -> Self {
        Self {
            stage_id,
            start_minutes,
            ..*self
        }
    }
}

/// Closed-open interval `[start, end)` in minutes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Span {
    pub start: i64,
    pub end: i64,
}

impl Span {
    pub const fn new(start: i64, end: i64) -> Self {
        Self { start, end }
    }

    pub fn len(&self) -> i64 {
        self.end.saturating_sub(self.start).max(0)
    }

    pub fn is_empty(&self) -> bool {
        self.end <= self.start
    }

    /// `[s1, e1)` and `[s2, e2)` overlap iff `s1 < e2 && s2 < e1`.
    pub fn overlaps(&self, other: &Span) -> bool {
        self.start < other.end && other.start < self.end
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_occupied_span_includes_setup() {
        let p = Performance::new(1, 1, 540, 30, 15);
        assert_eq!(p.end_minutes(), 570);
        assert_eq!(p.occupied_span(), Span::new(525, 570));
    }

    #[test]
    fn test_touching_spans_do_not_overlap() {
        let a = Span::new(100, 160);
        let b = Span::new(160, 200);
        assert!(!a.overlaps(&b));
        assert!(!b.overlaps(&a));
        assert!(a.overlaps(&Span::new(159, 170)));
    }

    #[test]
    fn test_moved_to_keeps_duration_and_setup() {
        let p = Performance::new(7, 1, 60, 45, 10);
        let moved = p.moved_to(2, 120);
        assert_eq!(moved.stage_id, 2);
        assert_eq!(moved.occupied_span(), Span::new(110, 165));
        assert_eq!(moved.span_at(0), Span::new(-10, 45));
    }

    #[test]
    fn test_extreme_values_saturate() {
        let p = Performance::new(1, 1, 10, i64::MAX, i64::MAX);
        assert_eq!(p.end_minutes(), i64::MAX);
        assert_eq!(p.occupied_span(), Span::new(10 - i64::MAX, i64::MAX));
        assert_eq!(p.occupied_span().len(), i64::MAX);
        assert_eq!(Span::new(i64::MIN, i64::MAX).len(), i64::MAX);

        let short = Performance::new(2, 1, 0, 30, 10);
        assert_eq!(short.span_at(i64::MAX), Span::new(i64::MAX - 10, i64::MAX));
    }

    #[test]
    fn test_serde_field_names() {
        let p = Performance::new(3, 2, 30, 60, 15);
        let json = serde_json::to_value(p).unwrap();
        assert_eq!(json["stage_id"], 2);
        assert_eq!(json["setup_minutes"], 15);
    }
}
