//! Float keyframe track: ordered keyframes, bezier interpolation, and
//! constant-region analysis.
//!
//! A track always carries one permanent default keyframe that supplies the
//! value when the sequence is empty. The default logically sits at position 0
//! and is never part of position-based search.

use crate::keyframe::{CurveMode, FloatKeyframe};
use crate::{equiv, Direction};
use serde::{Deserialize, Serialize};

/// Cached neighbor indices that accelerate sequential scans.
///
/// `get_value` walks from the hinted index instead of rescanning from the
/// track head. A stale or absent hint degrades to a full scan, never to a
/// wrong answer.
#[derive(Debug, Clone, Copy, Default)]
pub struct SearchHint {
    prev: Option<usize>,
    next: Option<usize>,
}

impl SearchHint {
    pub fn clear(&mut self) {
        self.prev = None;
        self.next = None;
    }
}

/// Straight-segment test between two adjacent keyframes, `a` before `b` in
/// position order: both linear, or both facing control handles zero.
///
/// This is the single source of truth for "this segment does not bend";
/// `get_value`'s fast path and `is_constant` must agree on it, or constant
/// regions would get a flat gain while the curve moves.
fn flat_segment(a: &FloatKeyframe, b: &FloatKeyframe) -> bool {
    (a.mode == CurveMode::Linear && b.mode == CurveMode::Linear)
        || (equiv(a.control_out, 0.0) && equiv(b.control_in, 0.0))
}

/// Ordered, position-unique float keyframes plus a permanent default.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FloatTrack {
    default_key: FloatKeyframe,
    keys: Vec<FloatKeyframe>,
}

impl FloatTrack {
    pub fn new(default_value: f64) -> Self {
        Self {
            default_key: FloatKeyframe::linear(0, default_value),
            keys: Vec::new(),
        }
    }

    pub fn default_value(&self) -> f64 {
        self.default_key.value
    }

    pub fn set_default_value(&mut self, value: f64) {
        self.default_key.value = value;
    }

    pub fn default_key(&self) -> &FloatKeyframe {
        &self.default_key
    }

    pub fn keys(&self) -> &[FloatKeyframe] {
        &self.keys
    }

    pub fn len(&self) -> usize {
        self.keys.len()
    }

    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }

    pub fn first(&self) -> Option<&FloatKeyframe> {
        self.keys.first()
    }

    pub fn last(&self) -> Option<&FloatKeyframe> {
        self.keys.last()
    }

    /// Index of the keyframe at-or-before `position` (forward) or
    /// at-or-after (reverse), walking from the hint when possible.
    fn prev_index(&self, position: i64, direction: Direction, hint: Option<usize>) -> Option<usize> {
        match direction {
            Direction::Forward => {
                let mut i = hint.filter(|&i| i < self.keys.len()).unwrap_or_else(|| {
                    self.keys.len().saturating_sub(1)
                });
                if self.keys.is_empty() {
                    return None;
                }
                while i + 1 < self.keys.len() && self.keys[i + 1].position <= position {
                    i += 1;
                }
                loop {
                    if self.keys[i].position <= position {
                        return Some(i);
                    }
                    if i == 0 {
                        return None;
                    }
                    i -= 1;
                }
            }
            Direction::Reverse => {
                if self.keys.is_empty() {
                    return None;
                }
                let mut i = hint.filter(|&i| i < self.keys.len()).unwrap_or(0);
                while i > 0 && self.keys[i - 1].position >= position {
                    i -= 1;
                }
                loop {
                    if self.keys[i].position >= position {
                        return Some(i);
                    }
                    if i + 1 >= self.keys.len() {
                        return None;
                    }
                    i += 1;
                }
            }
        }
    }

    /// Index of the keyframe strictly after `position` (forward) or
    /// at-or-before it (reverse).
    fn next_index(&self, position: i64, direction: Direction, hint: Option<usize>) -> Option<usize> {
        match direction {
            Direction::Forward => {
                if self.keys.is_empty() {
                    return None;
                }
                let mut i = hint.filter(|&i| i < self.keys.len()).unwrap_or(0);
                while i > 0 && self.keys[i - 1].position > position {
                    i -= 1;
                }
                loop {
                    if self.keys[i].position > position {
                        return Some(i);
                    }
                    if i + 1 >= self.keys.len() {
                        return None;
                    }
                    i += 1;
                }
            }
            Direction::Reverse => {
                if self.keys.is_empty() {
                    return None;
                }
                let mut i = hint.filter(|&i| i < self.keys.len()).unwrap_or_else(|| {
                    self.keys.len() - 1
                });
                while i + 1 < self.keys.len() && self.keys[i + 1].position <= position {
                    i += 1;
                }
                loop {
                    if self.keys[i].position <= position {
                        return Some(i);
                    }
                    if i == 0 {
                        return None;
                    }
                    i -= 1;
                }
            }
        }
    }

    /// Evaluate the automation curve at `position`.
    ///
    /// The hint caches the neighbor indices of the previous call; sequential
    /// per-sample scans then cost O(1) per sample.
    pub fn get_value(&self, position: i64, direction: Direction, hint: &mut SearchHint) -> f64 {
        let prev = self.prev_index(position, direction, hint.prev);
        let next = self.next_index(position, direction, hint.next);
        hint.prev = prev;
        hint.next = next;

        let (prev, next) = match (prev, next) {
            (None, None) => return self.default_key.value,
            (None, Some(n)) => return self.keys[n].value,
            (Some(p), None) => return self.keys[p].value,
            (Some(p), Some(n)) if p == n => return self.keys[p].value,
            (Some(p), Some(n)) => (&self.keys[p], &self.keys[n]),
        };

        // Flat-region fast path: equal values joined by a straight segment.
        // Avoids accumulating float error across constant spans.
        if equiv(prev.value, next.value) {
            let flat = match direction {
                Direction::Forward => flat_segment(prev, next),
                Direction::Reverse => flat_segment(next, prev),
            };
            if flat {
                return prev.value;
            }
        }

        let (y1, y2, t) = match direction {
            Direction::Forward => {
                if next.position - prev.position == 0 {
                    return prev.value;
                }
                (
                    prev.value + prev.control_out * 2.0,
                    next.value + next.control_in * 2.0,
                    (position - prev.position) as f64 / (next.position - prev.position) as f64,
                )
            }
            Direction::Reverse => {
                if prev.position - next.position == 0 {
                    return prev.value;
                }
                (
                    prev.value + prev.control_in * 2.0,
                    next.value + next.control_out * 2.0,
                    (prev.position - position) as f64 / (prev.position - next.position) as f64,
                )
            }
        };

        if prev.mode == CurveMode::Linear && next.mode == CurveMode::Linear {
            return prev.value + t * (next.value - prev.value);
        }

        let y0 = prev.value;
        let y3 = next.value;
        let t2 = t * t;
        let t3 = t2 * t;
        let invt = 1.0 - t;
        let invt2 = invt * invt;
        let invt3 = invt2 * invt;

        invt3 * y0 + 3.0 * t * invt2 * y1 + 3.0 * t2 * invt * y2 + t3 * y3
    }

    /// Test whether the automation is constant over `length` units starting
    /// at `start` (in the playback direction), returning the constant value.
    ///
    /// Never returns a spurious constant: callers use this as the license to
    /// skip per-sample evaluation. False negatives only cost speed.
    pub fn is_constant(&self, start: i64, length: i64, direction: Direction) -> Option<f64> {
        let (start, end) = match direction {
            Direction::Forward => (start, start + length),
            Direction::Reverse => (start + 1 - length, start + 1),
        };

        if self.keys.is_empty() {
            return Some(self.default_key.value);
        }
        if self.keys.len() == 1 {
            return Some(self.keys[0].value);
        }
        let last = &self.keys[self.keys.len() - 1];
        if last.position <= start {
            return Some(last.value);
        }
        if self.keys[0].position > end {
            return Some(self.keys[0].value);
        }

        // Scan adjacent pairs crossing or inside the region.
        let mut constant = self.default_key.value;
        let mut prev_position: Option<i64> = None;
        for (i, current) in self.keys.iter().enumerate() {
            let mut test_current_next = false;
            let mut test_previous_current = false;

            // Pair straddles the whole region.
            if let Some(pp) = prev_position {
                if pp < start && current.position >= end {
                    constant = current.value;
                    test_previous_current = true;
                }
            }
            prev_position = Some(current.position);

            // Keyframe inside the region.
            if !test_previous_current && current.position < end && current.position >= start {
                constant = current.value;
                if i > 0 {
                    test_previous_current = true;
                }
                if i + 1 < self.keys.len() {
                    test_current_next = true;
                }
            }

            if test_current_next {
                let next = &self.keys[i + 1];
                if !equiv(current.value, next.value) || !flat_segment(current, next) {
                    return None;
                }
            }

            if test_previous_current {
                let previous = &self.keys[i - 1];
                if !equiv(current.value, previous.value) || !flat_segment(previous, current) {
                    return None;
                }
            }
        }

        Some(constant)
    }

    /// Insert a keyframe, replacing any existing keyframe at its position.
    pub fn insert_keyframe(&mut self, keyframe: FloatKeyframe) {
        match self.keys.binary_search_by_key(&keyframe.position, |k| k.position) {
            Ok(i) => self.keys[i] = keyframe,
            Err(i) => self.keys.insert(i, keyframe),
        }
    }

    /// Get or create the keyframe at `position`, templating a new one from
    /// the nearest keyframe at-or-before it (or the default).
    pub fn insert(&mut self, position: i64) -> &mut FloatKeyframe {
        let i = match self.keys.binary_search_by_key(&position, |k| k.position) {
            Ok(i) => i,
            Err(i) => {
                let mut template = if i > 0 {
                    self.keys[i - 1]
                } else if let Some(first) = self.keys.first() {
                    *first
                } else {
                    self.default_key
                };
                template.position = position;
                self.keys.insert(i, template);
                i
            }
        };
        &mut self.keys[i]
    }

    /// Remove keyframes in `[start, end)`. When `start == end` the keyframe
    /// exactly at `start` is removed. With `shift`, later keyframes slide
    /// back by the cleared length.
    pub fn clear(&mut self, start: i64, end: i64, shift: bool) {
        let length = end - start;
        self.keys.retain(|k| {
            if end != start {
                k.position < start || k.position >= end
            } else {
                k.position != start
            }
        });
        if shift {
            for k in &mut self.keys {
                if k.position >= end {
                    k.position -= length;
                }
            }
        }
    }

    /// Shift keyframes at-or-after `start` forward by `end - start` units.
    pub fn insert_silence(&mut self, start: i64, end: i64) {
        let length = end - start;
        for k in &mut self.keys {
            if k.position >= start {
                k.position += length;
            }
        }
    }

    /// Rescale keyframe positions from one unit rate to another.
    pub fn resample(&mut self, old_rate: f64, new_rate: f64) {
        for k in &mut self.keys {
            k.position = (k.position as f64 * new_rate / old_rate + 0.5) as i64;
        }
    }

    /// Verify keyframe positions are strictly increasing.
    pub fn validate(&self) -> crate::Result<()> {
        for pair in self.keys.windows(2) {
            if pair[1].position <= pair[0].position {
                return Err(crate::Error::KeyframeOutOfOrder(pair[1].position));
            }
        }
        Ok(())
    }

    /// Collapse runs of 3+ value-equal keyframes and drop keyframes whose
    /// position is out of order. Runs to a fixed point.
    pub fn optimize(&mut self) {
        self.default_key.position = 0;
        loop {
            let mut remove = None;
            for i in 1..self.keys.len() {
                if self.keys[i].position <= self.keys[i - 1].position {
                    remove = Some(i);
                    break;
                }
                if i >= 2
                    && self.keys[i].same_value(&self.keys[i - 1])
                    && self.keys[i - 1].same_value(&self.keys[i - 2])
                {
                    remove = Some(i - 1);
                    break;
                }
            }
            match remove {
                Some(i) => {
                    self.keys.remove(i);
                }
                None => break,
            }
        }
    }

    /// Min/max of keyframe values and bezier handles over `[start, end)`.
    /// Falls back to the default value when the track is empty.
    pub fn extents(&self, start: i64, end: i64) -> (f64, f64) {
        if self.keys.is_empty() {
            return (self.default_key.value, self.default_key.value);
        }
        let mut min = f64::INFINITY;
        let mut max = f64::NEG_INFINITY;
        let mut any = false;
        for k in &self.keys {
            if k.position >= start && k.position < end {
                any = true;
                for v in [k.value, k.value + k.control_in, k.value + k.control_out] {
                    min = min.min(v);
                    max = max.max(v);
                }
            }
        }
        if !any {
            // No keyframe inside the range: evaluate the boundaries.
            let mut hint = SearchHint::default();
            let a = self.get_value(start, Direction::Forward, &mut hint);
            let b = self.get_value(end.saturating_sub(1), Direction::Forward, &mut hint);
            return (a.min(b), a.max(b));
        }
        (min, max)
    }
}
