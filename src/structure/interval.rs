//! One-dimensional interval algebra used by the table builder.
//!
//! Intervals are closed `[start, end]` ranges on one axis. Overlap is tested
//! on interiors, so two cells that merely touch do not overlap; a zero-width
//! interval sitting on a shared edge is a valid gap.

use serde::{Deserialize, Serialize};

/// A closed interval on one axis.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Interval {
    /// Lower bound
    pub start: f32,
    /// Upper bound
    pub end: f32,
}

impl Interval {
    /// Create an interval; bounds are swapped if given in reverse.
    pub fn new(a: f32, b: f32) -> Self {
        if a <= b {
            Self { start: a, end: b }
        } else {
            Self { start: b, end: a }
        }
    }

    /// Length of the interval.
    pub fn len(&self) -> f32 {
        self.end - self.start
    }

    /// Check if the interval has zero length.
    pub fn is_empty(&self) -> bool {
        self.end <= self.start
    }

    /// Midpoint.
    pub fn midpoint(&self) -> f32 {
        (self.start + self.end) / 2.0
    }

    /// Check whether the interiors intersect.
    pub fn overlaps(&self, other: &Interval) -> bool {
        self.start < other.end && other.start < self.end
    }

    /// Check whether the closed intervals share at least one point.
    pub fn touches(&self, other: &Interval) -> bool {
        self.start <= other.end && other.start <= self.end
    }

    /// Check whether `other` lies within this interval.
    pub fn contains(&self, other: &Interval) -> bool {
        self.start <= other.start && other.end <= self.end
    }

    /// Check whether `x` lies within this interval.
    pub fn contains_point(&self, x: f32) -> bool {
        self.start <= x && x <= self.end
    }

    /// Common sub-interval of two touching intervals.
    pub fn intersect(&self, other: &Interval) -> Option<Interval> {
        if !self.touches(other) {
            return None;
        }
        Some(Interval {
            start: self.start.max(other.start),
            end: self.end.min(other.end),
        })
    }

    /// Smallest interval covering both.
    pub fn hull(&self, other: &Interval) -> Interval {
        Interval {
            start: self.start.min(other.start),
            end: self.end.max(other.end),
        }
    }

    /// Parts of this interval not covered by `other` (zero, one or two pieces).
    ///
    /// An interval whose interior `other` does not reach is returned as is.
    pub fn subtract(&self, other: &Interval) -> Vec<Interval> {
        if !self.overlaps(other) {
            return vec![*self];
        }
        let mut pieces = Vec::with_capacity(2);
        if other.start > self.start {
            pieces.push(Interval::new(self.start, other.start));
        }
        if other.end < self.end {
            pieces.push(Interval::new(other.end, self.end));
        }
        pieces
    }

    /// The gap between this interval and a later one, if they do not overlap.
    pub fn gap_to(&self, later: &Interval) -> Option<Interval> {
        if self.end <= later.start {
            Some(Interval {
                start: self.end,
                end: later.start,
            })
        } else {
            None
        }
    }
}

/// Subtract every interval in `cuts` from `base`.
pub fn subtract_all<'a>(base: Interval, cuts: impl IntoIterator<Item = &'a Interval>) -> Vec<Interval> {
    let mut pieces = vec![base];
    for cut in cuts {
        pieces = pieces.iter().flat_map(|p| p.subtract(cut)).collect();
        if pieces.is_empty() {
            break;
        }
    }
    pieces
}

/// Merge touching intervals into a sorted list of disjoint intervals.
pub fn union_all(mut intervals: Vec<Interval>) -> Vec<Interval> {
    intervals.sort_by(|a, b| a.start.total_cmp(&b.start).then(a.end.total_cmp(&b.end)));
    let mut merged: Vec<Interval> = Vec::with_capacity(intervals.len());
    for interval in intervals {
        match merged.last_mut() {
            Some(last) if last.touches(&interval) => *last = last.hull(&interval),
            _ => merged.push(interval),
        }
    }
    merged
}
