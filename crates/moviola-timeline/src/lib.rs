//! Timeline data model for moviola.
//!
//! Provides the declarative side of the engine: keyframed automation curves,
//! edits mapping project time onto sources, tracks, and timelines. The
//! rendering pipeline in `moviola-render` consumes these structures but never
//! mutates them.
//!
//! # Example
//!
//! ```
//! use moviola_timeline::{FloatTrack, FloatKeyframe, CurveMode, Direction, SearchHint};
//!
//! let mut fade = FloatTrack::new(0.0);
//! fade.insert_keyframe(FloatKeyframe::linear(0, 0.0));
//! fade.insert_keyframe(FloatKeyframe::linear(1000, -20.0));
//!
//! let mut hint = SearchHint::default();
//! let mid = fade.get_value(500, Direction::Forward, &mut hint);
//! assert!((mid - -10.0).abs() < 1e-9);
//! ```

pub mod automation;
pub mod edit;
pub mod edits;
pub mod error;
pub mod float_track;
pub mod id;
pub mod keyframe;
pub mod pan_track;
pub mod switch_track;
pub mod timeline;
pub mod track;
pub mod transition;

pub use automation::{Automation, ParamKind, ParamTrack};
pub use edit::{Edit, EditSource};
pub use edits::Edits;
pub use error::{Error, Result};
pub use float_track::{FloatTrack, SearchHint};
pub use id::{IdAllocator, TimelineId, TrackId};
pub use keyframe::{CurveMode, FloatKeyframe, PanKeyframe, SwitchKeyframe};
pub use pan_track::{PanSegment, PanTrack};
pub use switch_track::SwitchTrack;
pub use timeline::Timeline;
pub use track::{PluginSpec, Track};
pub use transition::Transition;

/// Maximum number of output channels a pan keyframe can address.
pub const MAX_CHANNELS: usize = 8;

/// Float comparison tolerance used throughout the automation model.
///
/// Two automation values closer than this are treated as equal, both for
/// constant-region detection and keyframe optimization.
pub const EQUIV_EPSILON: f64 = 1e-3;

/// Tolerant float equality.
#[inline]
pub fn equiv(a: f64, b: f64) -> bool {
    (a - b).abs() < EQUIV_EPSILON
}

/// Playback direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, serde::Serialize, serde::Deserialize)]
pub enum Direction {
    #[default]
    Forward,
    Reverse,
}

impl Direction {
    pub fn is_forward(&self) -> bool {
        matches!(self, Self::Forward)
    }

    pub fn is_reverse(&self) -> bool {
        matches!(self, Self::Reverse)
    }
}
