//! One edit: a span of project time mapped onto a source.

use crate::timeline::Timeline;
use crate::transition::Transition;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// What an edit plays.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum EditSource {
    /// No media; renders as zeros.
    Silence,
    /// One channel of a media asset, addressed by opaque id.
    Asset { id: String, channel: usize },
    /// One channel of another timeline, rendered recursively.
    Nested {
        timeline: Arc<Timeline>,
        channel: usize,
    },
}

impl EditSource {
    pub fn is_silence(&self) -> bool {
        matches!(self, EditSource::Silence)
    }

    pub fn channel(&self) -> usize {
        match self {
            EditSource::Silence => 0,
            EditSource::Asset { channel, .. } => *channel,
            EditSource::Nested { channel, .. } => *channel,
        }
    }
}

impl PartialEq for EditSource {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (EditSource::Silence, EditSource::Silence) => true,
            (
                EditSource::Asset { id: a, channel: ac },
                EditSource::Asset { id: b, channel: bc },
            ) => a == b && ac == bc,
            (
                EditSource::Nested { timeline: a, channel: ac },
                EditSource::Nested { timeline: b, channel: bc },
            ) => a.id() == b.id() && ac == bc,
            _ => false,
        }
    }
}

/// A contiguous span of a track's project time.
///
/// `startproject` is where the span begins on the track; `startsource` is the
/// offset into the source where playback of this span starts.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Edit {
    pub startproject: i64,
    pub startsource: i64,
    pub length: i64,
    pub source: EditSource,
    /// Transition blending this edit with the previous one. Plays over the
    /// head of this edit.
    pub transition: Option<Transition>,
}

impl Edit {
    pub fn new(startproject: i64, startsource: i64, length: i64, source: EditSource) -> Self {
        Self {
            startproject,
            startsource,
            length,
            source,
            transition: None,
        }
    }

    /// Silent filler edit.
    pub fn silence(startproject: i64, length: i64) -> Self {
        Self::new(startproject, 0, length, EditSource::Silence)
    }

    /// First project position past this edit.
    pub fn end_project(&self) -> i64 {
        self.startproject + self.length
    }

    /// Source position corresponding to a project position inside this edit.
    pub fn source_at(&self, project_position: i64) -> i64 {
        self.startsource + (project_position - self.startproject)
    }

    /// True when `position` falls inside `[startproject, end_project)`.
    pub fn contains(&self, position: i64) -> bool {
        position >= self.startproject && position < self.end_project()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_source_mapping() {
        let edit = Edit::new(
            1000,
            250,
            500,
            EditSource::Asset {
                id: "take1.wav".into(),
                channel: 0,
            },
        );
        assert_eq!(edit.end_project(), 1500);
        assert_eq!(edit.source_at(1000), 250);
        assert_eq!(edit.source_at(1499), 749);
        assert!(edit.contains(1000));
        assert!(!edit.contains(1500));
    }

    #[test]
    fn test_silence_edit() {
        let edit = Edit::silence(0, 100);
        assert!(edit.source.is_silence());
        assert_eq!(edit.length, 100);
    }
}
