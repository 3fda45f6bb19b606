//! # Moviola - Timeline Audio Engine
//!
//! Automation-keyframe model and per-fragment audio rendering pipeline for a
//! timeline editor, built from modular subsystems.
//!
//! ## Architecture
//!
//! Moviola is an umbrella crate that coordinates:
//! - **moviola-timeline** - Declarative model (keyframes, automation curves,
//!   edits, tracks, timelines)
//! - **moviola-render** - Rendering pipeline (source import, speed-curve
//!   resampling, transitions, fade/pan/mute node graph, nested timelines)
//!
//! ## Quick Start
//!
//! ```ignore
//! use moviola::prelude::*;
//! use std::sync::Arc;
//!
//! let ids = IdAllocator::new();
//! let mut timeline = Timeline::new(ids.next_timeline(), 48000, 2);
//! let track = timeline.add_track(Track::audio(ids.next_track(), "music", 2));
//! track.edits.append(0, 48000, EditSource::Asset {
//!     id: "music.wav".into(),
//!     channel: 0,
//! });
//!
//! let cache = Arc::new(MemoryCache::new());
//! let mut engine = RenderEngine::new(Arc::new(timeline), cache);
//! let mut outputs = vec![vec![0.0; 1024]; 2];
//! let outcome = engine.process_buffer(&mut outputs, 1024, 0, Direction::Forward);
//! assert!(outcome.is_ok());
//! ```
//!
//! ## Feature Flags
//!
//! - `default` - Timeline model plus the render pipeline
//! - `render` - The rendering pipeline (disable for a model-only build)

/// Re-export of moviola-timeline for direct access
pub use moviola_timeline as timeline;

pub use moviola_timeline::{
    Automation,
    CurveMode,
    Direction,
    Edit,
    EditSource,
    Edits,
    FloatKeyframe,
    FloatTrack,
    IdAllocator,
    PanKeyframe,
    PanTrack,
    ParamKind,
    ParamTrack,
    PluginSpec,
    SearchHint,
    SwitchKeyframe,
    SwitchTrack,
    Timeline,
    TimelineId,
    Track,
    TrackId,
    Transition,
};

/// Re-export of moviola-render for direct access
#[cfg(feature = "render")]
pub use moviola_render as render;

#[cfg(feature = "render")]
pub use moviola_render::{
    db_to_gain, AudioPlugin, CrossfadeTransition, MemoryCache, MemoryReader, PluginRegistry,
    RenderEngine, RenderError, RenderOutcome, SourceCache, SourceReader, TimeStretch,
    TransitionBlend, TransitionRegistry,
};

/// Common imports for working with moviola.
pub mod prelude {
    pub use moviola_timeline::{
        Automation, CurveMode, Direction, Edit, EditSource, Edits, FloatKeyframe, FloatTrack,
        IdAllocator, PanKeyframe, PanTrack, ParamKind, ParamTrack, SearchHint, SwitchKeyframe,
        SwitchTrack, Timeline, TimelineId, Track, TrackId, Transition,
    };

    #[cfg(feature = "render")]
    pub use moviola_render::{
        MemoryCache, MemoryReader, RenderEngine, RenderOutcome, SourceCache, SourceReader,
    };
}
