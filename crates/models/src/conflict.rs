//! Overlap detection between candidate and existing commitments.
//!
//! Intervals are half-open: a session ending exactly when another starts is
//! not a conflict.

use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::HashSet;

/// An absolute time interval `[start, end)`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Interval {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

impl Interval {
    pub fn new(start: DateTime<Utc>, end: DateTime<Utc>) -> Self {
        Self { start, end }
    }

    pub fn overlaps(&self, other: &Interval) -> bool {
        self.start < other.end && other.start < self.end
    }

    /// The shared part of two intervals, if any
    pub fn overlap(&self, other: &Interval) -> Option<Interval> {
        self.overlaps(other).then(|| Interval {
            start: self.start.max(other.start),
            end: self.end.min(other.end),
        })
    }
}

/// An existing commitment of a party
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Commitment<K> {
    /// Identifies the commitment; one report is produced per key
    pub key: K,
    pub interval: Interval,
}

/// A candidate interval overlapping an existing commitment
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Overlap<K> {
    pub key: K,
    pub existing: Interval,
    pub overlap: Interval,
}

/// Finds every commitment that overlaps any candidate interval.
///
/// Each commitment is reported once, with its first overlap in candidate
/// order. Results are ordered by the commitment's start.
pub fn find_overlaps<K>(candidates: &[Interval], existing: &[Commitment<K>]) -> Vec<Overlap<K>>
where
    K: Copy + Eq + std::hash::Hash,
{
    let mut sorted: Vec<Interval> = candidates.to_vec();
    sorted.sort_by_key(|i| i.start);

    let mut seen = HashSet::new();
    let mut overlaps = Vec::new();

    for commitment in existing {
        if seen.contains(&commitment.key) {
            continue;
        }

        let hit = sorted
            .iter()
            .take_while(|c| c.start < commitment.interval.end)
            .find_map(|c| c.overlap(&commitment.interval));

        if let Some(overlap) = hit {
            seen.insert(commitment.key);
            overlaps.push(Overlap {
                key: commitment.key,
                existing: commitment.interval,
                overlap,
            });
        }
    }

    overlaps.sort_by_key(|o| o.existing.start);
    overlaps
}
