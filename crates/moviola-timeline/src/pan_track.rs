//! Pan keyframe track: per-channel weights, linear slope segments.
//!
//! Pan automation is evaluated as a sequence of straight-line segments
//! between keyframes. Renderers query one slope/intercept pair at a time and
//! advance, instead of evaluating a curve per sample.

use crate::keyframe::PanKeyframe;
use crate::Direction;
use serde::{Deserialize, Serialize};

/// One linear segment of a channel's pan curve.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PanSegment {
    /// Gain change per unit position.
    pub slope: f64,
    /// Gain at the segment's starting position.
    pub intercept: f64,
    /// Usable segment length, clipped to the next keyframe.
    pub len: i64,
}

/// Ordered pan keyframes plus a permanent default.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PanTrack {
    default_key: PanKeyframe,
    keys: Vec<PanKeyframe>,
}

impl PanTrack {
    /// New track with the given per-channel default weights.
    pub fn new(default_values: &[f64]) -> Self {
        Self {
            default_key: PanKeyframe::new(0, default_values),
            keys: Vec::new(),
        }
    }

    /// Equal-weight default across `channels` channels.
    pub fn equal(channels: usize) -> Self {
        let weight = 1.0 / channels.max(1) as f64;
        let values: Vec<f64> = (0..channels).map(|_| weight).collect();
        Self::new(&values)
    }

    pub fn default_key(&self) -> &PanKeyframe {
        &self.default_key
    }

    pub fn keys(&self) -> &[PanKeyframe] {
        &self.keys
    }

    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }

    /// Insert a keyframe, replacing any existing keyframe at its position.
    pub fn insert_keyframe(&mut self, keyframe: PanKeyframe) {
        match self.keys.binary_search_by_key(&keyframe.position, |k| k.position) {
            Ok(i) => self.keys[i] = keyframe,
            Err(i) => self.keys.insert(i, keyframe),
        }
    }

    /// Remove keyframes in `[start, end)`, optionally shifting later ones.
    pub fn clear(&mut self, start: i64, end: i64, shift: bool) {
        let length = end - start;
        self.keys.retain(|k| k.position < start || k.position >= end);
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

    /// Keyframe in effect at-or-before `position` in the playback direction,
    /// falling back over the sequence edge and finally the default.
    fn prev_key(&self, position: i64, direction: Direction) -> &PanKeyframe {
        match direction {
            Direction::Forward => {
                let i = self.keys.partition_point(|k| k.position <= position);
                if i > 0 {
                    &self.keys[i - 1]
                } else {
                    self.keys.first().unwrap_or(&self.default_key)
                }
            }
            Direction::Reverse => {
                let i = self.keys.partition_point(|k| k.position < position);
                if i < self.keys.len() {
                    &self.keys[i]
                } else {
                    self.keys.last().unwrap_or(&self.default_key)
                }
            }
        }
    }

    /// Next keyframe past `position` in the playback direction.
    fn next_key(&self, position: i64, direction: Direction) -> &PanKeyframe {
        match direction {
            Direction::Forward => {
                let i = self.keys.partition_point(|k| k.position <= position);
                if i < self.keys.len() {
                    &self.keys[i]
                } else {
                    self.keys.last().unwrap_or(&self.default_key)
                }
            }
            Direction::Reverse => {
                let i = self.keys.partition_point(|k| k.position < position);
                if i > 0 {
                    &self.keys[i - 1]
                } else {
                    self.keys.first().unwrap_or(&self.default_key)
                }
            }
        }
    }

    /// Slope/intercept segment for one channel starting at `position`,
    /// clipped to at most `max_len` units.
    pub fn channel_slope(
        &self,
        position: i64,
        max_len: i64,
        channel: usize,
        direction: Direction,
    ) -> PanSegment {
        let prev = self.prev_key(position, direction);
        let next = self.next_key(position, direction);
        let mut len = max_len.max(1);

        match direction {
            Direction::Forward => {
                if next.position > prev.position {
                    let slope = (next.value(channel) - prev.value(channel))
                        / (next.position - prev.position) as f64;
                    let intercept = (position - prev.position) as f64 * slope + prev.value(channel);
                    if next.position < position + len {
                        len = (next.position - position).max(1);
                    }
                    PanSegment { slope, intercept, len }
                } else {
                    PanSegment {
                        slope: 0.0,
                        intercept: prev.value(channel),
                        len,
                    }
                }
            }
            Direction::Reverse => {
                if next.position < prev.position {
                    let slope = (next.value(channel) - prev.value(channel))
                        / (next.position - prev.position) as f64;
                    let intercept = (position - prev.position) as f64 * slope + prev.value(channel);
                    if next.position > position - len {
                        len = (position - next.position).max(1);
                    }
                    PanSegment { slope, intercept, len }
                } else {
                    PanSegment {
                        slope: 0.0,
                        intercept: next.value(channel),
                        len,
                    }
                }
            }
        }
    }
}
