//! Audio rendering pipeline for moviola timelines.
//!
//! Turns the declarative model from `moviola-timeline` into sample fragments:
//! per-edit source import with speed-curve resampling, edit and transition
//! traversal, and node-graph composition applying fade, mute, and pan
//! automation, in either playback direction.
//!
//! The entry point is [`RenderEngine::process_buffer`], which fills one
//! fragment of per-channel output buffers.

pub mod engine;
pub mod error;
pub mod graph;
pub mod module;
pub mod resample;
pub mod source;
pub mod stretch;
pub mod transition;

pub use engine::RenderEngine;
pub use error::{RenderError, RenderOutcome, Result};
pub use graph::{AudioPlugin, PluginRegistry};
pub use resample::{reverse_in_place, Resampler};
pub use source::{MemoryCache, MemoryReader, SharedCache, SourceCache, SourceReader};
pub use stretch::TimeStretch;
pub use transition::{CrossfadeTransition, TransitionBlend, TransitionRegistry};

/// Nested timelines deeper than this render as silence. Cycle safety: a
/// self-referencing timeline terminates instead of recursing forever.
pub const MAX_NESTED_DEPTH: usize = 8;

/// Samples of head/tail carried between fragments for speed-curve
/// interpolation continuity.
pub const SPEED_OVERLAP: usize = 4;

/// Fade values at or below this many dB are treated as silence.
pub const INFINITY_GAIN: f64 = -40.0;

/// dB to linear gain, with the silence floor applied.
#[inline]
pub fn db_to_gain(db: f64) -> f64 {
    if db <= INFINITY_GAIN {
        0.0
    } else {
        10.0_f64.powf(db / 20.0)
    }
}
