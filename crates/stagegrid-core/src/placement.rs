//! Performance placement engine.
//!
//! Resolves the raw position of a dragged performance block into a start time
//! on the destination stage next to the neighbour it collides with, then snaps
//! it to the grid. How close a downward move may come is set by
//! [`ClampPolicy`].
//!
//! Only the first colliding neighbour in time order is resolved per call. A
//! block squeezed between two neighbours can still land on the second one;
//! the server re-validates every write against the full stage timeline.

use serde::{Deserialize, Serialize};

use crate::performance::{Performance, PerformanceId, StageId};
use crate::snap::SnapConfig;

/// How a block approaching a neighbour from above is stopped.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ClampPolicy {
    /// The block's end touches the neighbour's occupied start.
    Touching,
    /// `neighbour_start + setup - duration`, the grid's historical stop point.
    /// Leaves the block overlapping the neighbour by its own setup length.
    #[default]
    SetupOffset,
}

/// Placement engine settings.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlacementConfig {
    pub snap: SnapConfig,
    pub clamp_policy: ClampPolicy,
}

/// What the engine did to the desired position.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Resolution {
    /// No neighbour in the way.
    Free,
    /// Already past the neighbour; placed right after it.
    PassedThrough { blocker: PerformanceId },
    /// Moving down into a neighbour; stopped before it.
    ClampedBefore { blocker: PerformanceId },
    /// Moving up (or holding still) into a neighbour; stopped after it.
    ClampedAfter { blocker: PerformanceId },
}

impl Resolution {
    pub fn blocker(&self) -> Option<PerformanceId> {
        match self {
            Resolution::Free => None,
            Resolution::PassedThrough { blocker }
            | Resolution::ClampedBefore { blocker }
            | Resolution::ClampedAfter { blocker } => Some(*blocker),
        }
    }
}

/// Proposed position for a moving block.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Placement {
    pub stage_id: StageId,
    /// Snapped, non-negative start in grid minutes.
    pub start_minutes: i64,
    pub resolution: Resolution,
}

#[derive(Debug, Default, Clone, Copy)]
pub struct PlacementEngine {
    config: PlacementConfig,
}

impl PlacementEngine {
    pub fn new(config: PlacementConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &PlacementConfig {
        &self.config
    }

    /// Proposes a start for `moving` on `stage_id`.
    ///
    /// `desired_minutes` is the unsnapped block start implied by the pointer.
    /// `previous_minutes` is the unsnapped position of the previous call in the
    /// same drag gesture (the block's original start on the first call); the
    /// direction of travel is judged against it. Entries of `others` that are
    /// `moving` itself or sit on another stage are ignored.
    ///
    /// Never fails: degenerate input still yields a snapped value `>= 0`.
    #[allow(clippy::cast_precision_loss)]
    pub fn propose(
        &self,
        moving: &Performance,
        desired_minutes: f64,
        stage_id: StageId,
        others: &[Performance],
        previous_minutes: f64,
    ) -> Placement {
        let desired = if desired_minutes.is_finite() {
            desired_minutes
        } else {
            0.0
        };
        let setup = moving.setup_minutes as f64;
        let duration = moving.duration_minutes as f64;

        let mut spans: Vec<(PerformanceId, f64, f64)> = others
            .iter()
            .filter(|other| other.id != moving.id && other.stage_id == stage_id)
            .map(|other| {
                let span = other.occupied_span();
                (other.id, span.start as f64, span.end as f64)
            })
            .collect();
        spans.sort_by(|a, b| a.1.total_cmp(&b.1));

        let occupied_start = desired - setup;
        let occupied_end = desired + duration;

        let mut resolved = desired;
        let mut resolution = Resolution::Free;

        if let Some(&(blocker, blocker_start, blocker_end)) = spans
            .iter()
            .find(|(_, start, end)| occupied_start < *end && *start < occupied_end)
        {
            if occupied_start >= blocker_end {
                resolved = blocker_end + setup;
                resolution = Resolution::PassedThrough { blocker };
            } else if desired > previous_minutes {
                resolved = match self.config.clamp_policy {
                    ClampPolicy::Touching => blocker_start - duration,
                    ClampPolicy::SetupOffset => blocker_start + setup - duration,
                };
                if resolved < setup {
                    resolved = setup;
                }
                resolution = Resolution::ClampedBefore { blocker };
            } else {
                resolved = blocker_end + setup;
                resolution = Resolution::ClampedAfter { blocker };
            }
            tracing::trace!(
                performance_id = moving.id,
                blocker,
                desired,
                resolved,
                "placement collision resolved"
            );
        }

        Placement {
            stage_id,
            start_minutes: self.config.snap.snap_minutes(resolved).max(0),
            resolution,
        }
    }
}

/// Resolved start for `moving` with the default engine (5-minute grid,
/// setup-offset clamp).
pub fn propose_placement(
    moving: &Performance,
    desired_minutes: f64,
    stage_id: StageId,
    others: &[Performance],
    previous_minutes: f64,
) -> i64 {
    PlacementEngine::default()
        .propose(moving, desired_minutes, stage_id, others, previous_minutes)
        .start_minutes
}

#[cfg(test)]
mod tests {
    use super::*;

    const STAGE: StageId = 1;

    /// Neighbour occupying `[100, 160)` with its setup.
    fn blocker() -> Performance {
        Performance::new(10, STAGE, 110, 50, 10)
    }

    fn moving() -> Performance {
        Performance::new(1, STAGE, 0, 30, 10)
    }

    fn engine(policy: ClampPolicy) -> PlacementEngine {
        PlacementEngine::new(PlacementConfig {
            clamp_policy: policy,
            ..PlacementConfig::default()
        })
    }

    #[test]
    fn test_free_space_keeps_desired_position() {
        let others = [
            Performance::new(2, STAGE, 20, 80, 20),
            Performance::new(3, STAGE, 310, 90, 10),
        ];
        let placement = PlacementEngine::default().propose(
            &Performance::new(1, STAGE, 0, 60, 10),
            151.0,
            STAGE,
            &others,
            120.0,
        );
        assert_eq!(placement.start_minutes, 150);
        assert_eq!(placement.resolution, Resolution::Free);
        // [140, 210) lies inside the gap [100, 300).
        assert!(placement.start_minutes - 10 >= 100);
        assert!(placement.start_minutes + 60 <= 300);
    }

    #[test]
    fn test_downward_clamp_touches_blocker() {
        let placement = engine(ClampPolicy::Touching).propose(
            &moving(),
            80.0,
            STAGE,
            &[blocker()],
            40.0,
        );
        assert_eq!(placement.start_minutes, 70);
        assert!(placement.start_minutes + 30 <= 100);
        assert_eq!(placement.resolution, Resolution::ClampedBefore { blocker: 10 });
    }

    #[test]
    fn test_downward_clamp_with_setup_offset_policy() {
        let placement = engine(ClampPolicy::SetupOffset).propose(
            &moving(),
            80.0,
            STAGE,
            &[blocker()],
            40.0,
        );
        assert_eq!(placement.start_minutes, 80);
    }

    #[test]
    fn test_default_engine_uses_setup_offset() {
        // Neighbour 540 (30 min, 15 setup); moving block 45 min with 10 setup.
        let others = [Performance::new(5, STAGE, 540, 30, 15)];
        let moving = Performance::new(1, STAGE, 400, 45, 10);
        assert_eq!(propose_placement(&moving, 530.0, STAGE, &others, 500.0), 490);
        assert_eq!(PlacementConfig::default().clamp_policy, ClampPolicy::SetupOffset);
    }

    #[test]
    fn test_upward_clamp_lands_after_blocker() {
        for policy in [ClampPolicy::Touching, ClampPolicy::SetupOffset] {
            let placement = engine(policy).propose(&moving(), 150.0, STAGE, &[blocker()], 200.0);
            assert_eq!(placement.start_minutes, 170);
            assert_eq!(placement.resolution, Resolution::ClampedAfter { blocker: 10 });
        }
    }

    #[test]
    fn test_holding_still_counts_as_upward() {
        let placement =
            PlacementEngine::default().propose(&moving(), 120.0, STAGE, &[blocker()], 120.0);
        assert_eq!(placement.start_minutes, 170);
    }

    #[test]
    fn test_past_blocker_is_not_pulled_back() {
        let placement =
            PlacementEngine::default().propose(&moving(), 200.0, STAGE, &[blocker()], 60.0);
        assert_eq!(placement.start_minutes, 200);
        assert_eq!(placement.resolution, Resolution::Free);
    }

    #[test]
    fn test_setup_offset_clamp_overlaps_by_setup() {
        let others = [Performance::new(5, STAGE, 540, 30, 15)];
        let moving = Performance::new(1, STAGE, 400, 45, 10);
        let placement = engine(ClampPolicy::SetupOffset).propose(&moving, 530.0, STAGE, &others, 500.0);
        assert_eq!(placement.start_minutes, 490);
        assert_eq!(placement.resolution, Resolution::ClampedBefore { blocker: 5 });

        let touching = engine(ClampPolicy::Touching).propose(&moving, 530.0, STAGE, &others, 500.0);
        assert_eq!(touching.start_minutes, 480);
    }

    #[test]
    fn test_downward_clamp_floors_at_setup() {
        let others = [Performance::new(2, STAGE, 20, 60, 10)];
        let placement = PlacementEngine::default().propose(&moving(), 15.0, STAGE, &others, 0.0);
        assert_eq!(placement.start_minutes, 10);
    }

    #[test]
    fn test_only_first_collision_is_resolved() {
        // Two neighbours [100, 160) and [170, 230). Pushing up out of the first
        // lands at 170, inside the second; the engine does not chain.
        let others = [blocker(), Performance::new(11, STAGE, 180, 50, 10)];
        let placement = PlacementEngine::default().propose(&moving(), 140.0, STAGE, &others, 300.0);
        assert_eq!(placement.start_minutes, 170);
        assert_eq!(placement.resolution.blocker(), Some(10));
    }

    #[test]
    fn test_ignores_self_and_other_stages() {
        let me = Performance::new(10, STAGE, 110, 30, 10);
        let elsewhere = Performance::new(20, 2, 110, 50, 10);
        let placement = PlacementEngine::default().propose(&me, 112.0, STAGE, &[me, elsewhere], 0.0);
        assert_eq!(placement.start_minutes, 110);
        assert_eq!(placement.resolution, Resolution::Free);
    }

    #[test]
    fn test_degenerate_inputs_are_clamped_and_snapped() {
        let zero = Performance::new(1, STAGE, 0, 0, 0);
        let negative = Performance::new(2, STAGE, 0, -30, -10);
        for moving in [zero, negative] {
            for desired in [-10_000.0, -3.0, f64::NAN, f64::NEG_INFINITY, 2.4] {
                let minutes = propose_placement(&moving, desired, STAGE, &[], 0.0);
                assert_eq!(minutes, 0);
            }
        }
        assert_eq!(propose_placement(&zero, 7.5, STAGE, &[], 0.0), 10);
    }

    #[test]
    fn test_result_is_snapped_and_non_negative() {
        let others = [
            blocker(),
            Performance::new(11, STAGE, 300, 45, 30),
            Performance::new(12, STAGE, 20, 15, 5),
        ];
        let mut previous = 0.0;
        let mut desired = -50.0;
        while desired < 500.0 {
            let minutes = propose_placement(&moving(), desired, STAGE, &others, previous);
            assert!(minutes >= 0, "{desired} -> {minutes}");
            assert_eq!(minutes % 5, 0, "{desired} -> {minutes}");
            previous = desired;
            desired += 3.7;
        }
    }

    #[test]
    fn test_same_input_same_result() {
        let others = [blocker()];
        let first = PlacementEngine::default().propose(&moving(), 97.3, STAGE, &others, 90.0);
        let second = PlacementEngine::default().propose(&moving(), 97.3, STAGE, &others, 90.0);
        assert_eq!(first, second);
    }

    #[test]
    fn test_resolution_serializes_with_kind_tag() {
        let json = serde_json::to_value(Resolution::ClampedAfter { blocker: 4 }).unwrap();
        assert_eq!(json["kind"], "clamped_after");
        assert_eq!(json["blocker"], 4);
    }
}
