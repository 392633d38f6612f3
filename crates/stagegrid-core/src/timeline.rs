//! Ordered set of occupied spans on one stage.
//!
//! Used to re-validate writes against every neighbour, not only the first
//! one the placement engine looks at. Spans are keyed by start; the longest
//! span seen bounds how far left a range query has to look.

use std::collections::{BTreeMap, HashMap};
use std::ops::Bound::Excluded;

use crate::performance::{Performance, PerformanceId, Span};

#[derive(Debug, Clone, Default)]
pub struct StageTimeline {
    by_start: BTreeMap<i64, Vec<PerformanceId>>,
    spans: HashMap<PerformanceId, Span>,
    /// Upper bound on span length; never shrinks on removal.
    max_len: i64,
}

impl StageTimeline {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_performances<'a>(performances: impl IntoIterator<Item = &'a Performance>) -> Self {
        let mut timeline = Self::new();
        for performance in performances {
            timeline.insert(performance);
        }
        timeline
    }

    pub fn len(&self) -> usize {
        self.spans.len()
    }

    pub fn is_empty(&self) -> bool {
        self.spans.is_empty()
    }

    pub fn span_of(&self, id: PerformanceId) -> Option<Span> {
        self.spans.get(&id).copied()
    }

    pub fn insert(&mut self, performance: &Performance) {
        self.insert_span(performance.id, performance.occupied_span());
    }

    /// Inserts or replaces the span of `id`.
    pub fn insert_span(&mut self, id: PerformanceId, span: Span) {
        self.remove(id);
        self.by_start.entry(span.start).or_default().push(id);
        self.spans.insert(id, span);
        self.max_len = self.max_len.max(span.len());
    }

    pub fn remove(&mut self, id: PerformanceId) -> Option<Span> {
        let span = self.spans.remove(&id)?;
        if let Some(ids) = self.by_start.get_mut(&span.start) {
            ids.retain(|other| *other != id);
            if ids.is_empty() {
                self.by_start.remove(&span.start);
            }
        }
        Some(span)
    }

    /// Spans in start order.
    pub fn iter(&self) -> impl Iterator<Item = (PerformanceId, Span)> + '_ {
        self.by_start
            .values()
            .flatten()
            .filter_map(|id| self.spans.get(id).map(|span| (*id, *span)))
    }

    /// Every performance whose span overlaps `span`, in start order.
    pub fn conflicts(&self, span: Span, exclude: Option<PerformanceId>) -> Vec<PerformanceId> {
        let lower = span.start.saturating_sub(self.max_len).saturating_sub(1);
        self.by_start
            .range((Excluded(lower), Excluded(span.end.max(lower.saturating_add(1)))))
            .flat_map(|(_, ids)| ids.iter().copied())
            .filter(|id| Some(*id) != exclude)
            .filter(|id| self.spans.get(id).is_some_and(|other| other.overlaps(&span)))
            .collect()
    }

    pub fn is_free(&self, span: Span, exclude: Option<PerformanceId>) -> bool {
        self.conflicts(span, exclude).is_empty()
    }

    /// Free intervals inside `within`, in order.
    pub fn gaps(&self, within: Span) -> Vec<Span> {
        let mut gaps = Vec::new();
        let mut cursor = within.start;
        for (_, span) in self.iter() {
            if span.end <= cursor || span.is_empty() {
                continue;
            }
            if span.start >= within.end {
                break;
            }
            if span.start > cursor {
                gaps.push(Span::new(cursor, span.start));
            }
            cursor = cursor.max(span.end);
        }
        if cursor < within.end {
            gaps.push(Span::new(cursor, within.end));
        }
        gaps
    }

    /// Pairs of performances whose spans overlap. Empty when the stage holds
    /// the no-overlap invariant.
    pub fn overlapping_pairs(&self) -> Vec<(PerformanceId, PerformanceId)> {
        let mut pairs = Vec::new();
        for (id, span) in self.iter() {
            for other in self.conflicts(span, Some(id)) {
                if id < other {
                    pairs.push((id, other));
                }
            }
        }
        pairs.sort_unstable();
        pairs.dedup();
        pairs
    }

    pub fn validate(&self) -> bool {
        self.overlapping_pairs().is_empty()
    }
}
