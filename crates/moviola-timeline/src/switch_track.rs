//! Boolean keyframe track (mute).

use crate::keyframe::SwitchKeyframe;
use crate::Direction;
use serde::{Deserialize, Serialize};

/// Ordered boolean keyframes plus a permanent default.
///
/// Used for mute automation: the value holds from a keyframe until the next
/// keyframe in the playback direction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SwitchTrack {
    default_key: SwitchKeyframe,
    keys: Vec<SwitchKeyframe>,
}

impl SwitchTrack {
    pub fn new(default_value: bool) -> Self {
        Self {
            default_key: SwitchKeyframe::new(0, default_value),
            keys: Vec::new(),
        }
    }

    pub fn default_value(&self) -> bool {
        self.default_key.value
    }

    pub fn keys(&self) -> &[SwitchKeyframe] {
        &self.keys
    }

    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }

    /// Insert a keyframe, replacing any existing keyframe at its position.
    pub fn insert_keyframe(&mut self, keyframe: SwitchKeyframe) {
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

    /// Value in effect at `position` for the given playback direction.
    pub fn value_at(&self, position: i64, direction: Direction) -> bool {
        match direction {
            Direction::Forward => {
                // Last keyframe at-or-before position.
                let i = self.keys.partition_point(|k| k.position <= position);
                if i == 0 {
                    self.keys
                        .first()
                        .map(|k| k.value)
                        .unwrap_or(self.default_key.value)
                } else {
                    self.keys[i - 1].value
                }
            }
            Direction::Reverse => {
                // First keyframe at-or-after position.
                let i = self.keys.partition_point(|k| k.position < position);
                if i >= self.keys.len() {
                    self.keys
                        .last()
                        .map(|k| k.value)
                        .unwrap_or(self.default_key.value)
                } else {
                    self.keys[i].value
                }
            }
        }
    }

    /// Longest run starting at `position` (in the playback direction, at
    /// most `max_len` units) over which the value is constant.
    ///
    /// Returns the constant value and the run length. Renderers use this to
    /// split fragments into maximal mute/unmute sub-runs.
    pub fn constant_span(&self, position: i64, max_len: i64, direction: Direction) -> (bool, i64) {
        let value = self.value_at(position, direction);
        let mut len = max_len.max(1);

        match direction {
            Direction::Forward => {
                let start = self.keys.partition_point(|k| k.position <= position);
                for k in &self.keys[start..] {
                    if k.position >= position + len {
                        break;
                    }
                    if k.value != value {
                        len = (k.position - position).max(1);
                        break;
                    }
                }
            }
            Direction::Reverse => {
                let end = self.keys.partition_point(|k| k.position < position);
                for k in self.keys[..end].iter().rev() {
                    if k.position <= position - len {
                        break;
                    }
                    if k.value != value {
                        len = (position - k.position).max(1);
                        break;
                    }
                }
            }
        }

        (value, len)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn track_with_mute_region() -> SwitchTrack {
        let mut track = SwitchTrack::new(false);
        track.insert_keyframe(SwitchKeyframe::new(100, true));
        track.insert_keyframe(SwitchKeyframe::new(300, false));
        track
    }

    #[test]
    fn test_default_when_empty() {
        let track = SwitchTrack::new(true);
        assert!(track.value_at(0, Direction::Forward));
        assert!(track.value_at(5000, Direction::Reverse));
    }

    #[test]
    fn test_value_holds_until_next_keyframe() {
        let track = track_with_mute_region();
        assert!(!track.value_at(50, Direction::Forward));
        assert!(track.value_at(100, Direction::Forward));
        assert!(track.value_at(299, Direction::Forward));
        assert!(!track.value_at(300, Direction::Forward));
    }

    #[test]
    fn test_constant_span_clips_to_next_change() {
        let track = track_with_mute_region();
        let (muted, len) = track.constant_span(0, 1000, Direction::Forward);
        assert!(!muted);
        assert_eq!(len, 100);

        let (muted, len) = track.constant_span(100, 1000, Direction::Forward);
        assert!(muted);
        assert_eq!(len, 200);

        let (muted, len) = track.constant_span(300, 1000, Direction::Forward);
        assert!(!muted);
        assert_eq!(len, 1000);
    }

    #[test]
    fn test_constant_span_reverse() {
        let track = track_with_mute_region();
        // Reverse playback reads the keyframe at-or-after the position, so
        // the unmuted region extends back to the keyframe at 100.
        let (muted, len) = track.constant_span(400, 1000, Direction::Reverse);
        assert!(!muted);
        assert_eq!(len, 300);

        let (muted, len) = track.constant_span(250, 200, Direction::Reverse);
        assert!(!muted);
        assert_eq!(len, 150);
    }

    #[test]
    fn test_constant_span_never_zero() {
        let track = track_with_mute_region();
        let (_, len) = track.constant_span(100, 0, Direction::Forward);
        assert!(len >= 1);
    }
}
