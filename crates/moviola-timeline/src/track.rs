//! One audio track: edits, automation, plugin chain.

use crate::automation::Automation;
use crate::edits::Edits;
use crate::id::TrackId;
use serde::{Deserialize, Serialize};

/// A named effect in a track's processing chain.
///
/// The render layer resolves `title` through its plugin registry; an
/// unresolvable or disabled plugin passes audio through unchanged.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PluginSpec {
    pub title: String,
    pub on: bool,
}

impl PluginSpec {
    pub fn new(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            on: true,
        }
    }
}

/// One track of a timeline.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Track {
    pub id: TrackId,
    pub title: String,
    /// Unplayable tracks are skipped by the render graph entirely.
    pub play: bool,
    /// Playback offset added to every project position read from this track.
    pub nudge: i64,
    pub automation: Automation,
    pub edits: Edits,
    pub plugins: Vec<PluginSpec>,
}

impl Track {
    /// Audio track with default automation for `channels` output channels.
    pub fn audio(id: TrackId, title: impl Into<String>, channels: usize) -> Self {
        Self {
            id,
            title: title.into(),
            play: true,
            nudge: 0,
            automation: Automation::audio(channels),
            edits: Edits::new(),
            plugins: Vec::new(),
        }
    }

    /// Covered length of this track's edit sequence.
    pub fn length(&self) -> i64 {
        self.edits.length()
    }

    /// Remove `[start, end)` from the track, keeping edits and automation
    /// keyframes aligned.
    pub fn clear(&mut self, start: i64, end: i64) {
        self.edits.clear(start, end);
        self.automation.clear(start, end, true);
    }

    /// Open a silent gap over `[start, end)`, shifting edits and automation
    /// keyframes together.
    pub fn insert_silence(&mut self, start: i64, end: i64) {
        self.edits.insert_silence(start, end);
        self.automation.insert_silence(start, end);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::edit::EditSource;

    #[test]
    fn test_audio_track_defaults() {
        let track = Track::audio(TrackId(1), "drums", 2);
        assert!(track.play);
        assert_eq!(track.nudge, 0);
        assert!(track.automation.fade().is_some());
        assert_eq!(track.length(), 0);
    }

    #[test]
    fn test_clear_keeps_edits_and_automation_aligned() {
        use crate::keyframe::FloatKeyframe;
        let mut track = Track::audio(TrackId(1), "drums", 2);
        track.edits.append(
            0,
            4800,
            EditSource::Asset {
                id: "kick.wav".into(),
                channel: 0,
            },
        );
        let fade = track.automation.fade_mut().unwrap();
        fade.insert_keyframe(FloatKeyframe::linear(1000, -6.0));
        fade.insert_keyframe(FloatKeyframe::linear(3000, -12.0));

        track.clear(500, 1500);
        assert_eq!(track.length(), 3800);
        // The 1000 keyframe was inside the cut; the 3000 one slid back.
        let fade = track.automation.fade().unwrap();
        assert_eq!(fade.len(), 1);
        assert_eq!(fade.keys()[0].position, 2000);
    }

    #[test]
    fn test_insert_silence_shifts_edits_and_automation() {
        use crate::keyframe::FloatKeyframe;
        let mut track = Track::audio(TrackId(1), "drums", 2);
        track.edits.append(0, 2000, EditSource::Silence);
        track
            .automation
            .fade_mut()
            .unwrap()
            .insert_keyframe(FloatKeyframe::linear(1000, -6.0));

        track.insert_silence(500, 800);
        assert_eq!(track.length(), 2300);
        assert_eq!(track.automation.fade().unwrap().keys()[0].position, 1300);
    }

    #[test]
    fn test_length_follows_edits() {
        let mut track = Track::audio(TrackId(1), "drums", 2);
        track.edits.append(
            0,
            4800,
            EditSource::Asset {
                id: "kick.wav".into(),
                channel: 0,
            },
        );
        assert_eq!(track.length(), 4800);
    }
}
