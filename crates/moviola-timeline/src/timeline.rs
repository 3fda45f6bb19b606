//! Top-level timeline: tracks plus session parameters.

use crate::edit::EditSource;
use crate::id::TimelineId;
use crate::track::Track;
use serde::{Deserialize, Serialize};

/// An editable project: an ordered set of tracks sharing a sample rate and
/// output channel count.
///
/// Timelines nest: an edit may reference another timeline as its source, and
/// the render layer plays it recursively.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Timeline {
    id: TimelineId,
    pub sample_rate: u32,
    pub channels: usize,
    pub tracks: Vec<Track>,
}

impl Timeline {
    pub fn new(id: TimelineId, sample_rate: u32, channels: usize) -> Self {
        Self {
            id,
            sample_rate,
            channels,
            tracks: Vec::new(),
        }
    }

    pub fn id(&self) -> TimelineId {
        self.id
    }

    pub fn add_track(&mut self, track: Track) -> &mut Track {
        self.tracks.push(track);
        self.tracks.last_mut().unwrap_or_else(|| unreachable!())
    }

    /// Longest track length; the project's total duration in samples.
    pub fn length(&self) -> i64 {
        self.tracks.iter().map(Track::length).max().unwrap_or(0)
    }

    /// Tracks the render graph should play.
    pub fn playable_tracks(&self) -> impl Iterator<Item = &Track> {
        self.tracks.iter().filter(|t| t.play)
    }

    /// Structural checks before rendering or saving: gap-free edit
    /// sequences, ordered keyframes, in-range nested channels.
    pub fn validate(&self) -> crate::Result<()> {
        for track in &self.tracks {
            track.edits.validate()?;
            if let Some(fade) = track.automation.fade() {
                fade.validate()?;
            }
            if let Some(speed) = track.automation.speed() {
                speed.validate()?;
            }
            for edit in &track.edits {
                if let EditSource::Nested { timeline, channel } = &edit.source {
                    if *channel >= timeline.channels {
                        return Err(crate::Error::ChannelOutOfRange {
                            channel: *channel,
                            channels: timeline.channels,
                        });
                    }
                }
            }
        }
        Ok(())
    }
}
