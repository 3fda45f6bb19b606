//! Render engine.
//!
//! Owns the timeline, one [`TrackModule`]-backed node per track, and the
//! shared registries. Nested timelines get their own engines, built lazily
//! by the modules that reference them and rebuilt when the referenced
//! timeline's identity changes.

use crate::error::RenderOutcome;
use crate::graph::{PluginRegistry, TrackNode};
use crate::source::SharedCache;
use crate::stretch::TimeStretch;
use crate::transition::TransitionRegistry;
use moviola_timeline::{Direction, Timeline};
use std::sync::Arc;
use tracing::debug;

/// Context shared by every node of one engine, and inherited (one level
/// deeper) by nested engines.
pub struct EngineShared {
    pub(crate) cache: SharedCache,
    pub(crate) transitions: Arc<TransitionRegistry>,
    pub(crate) plugins: Arc<PluginRegistry>,
    /// Nesting depth of this engine; the root engine is at 0.
    pub(crate) depth: usize,
}

/// Synchronous single-threaded renderer for one timeline.
pub struct RenderEngine {
    timeline: Arc<Timeline>,
    shared: EngineShared,
    nodes: Vec<TrackNode>,
    temp: Vec<f64>,
    stretchers: Vec<TimeStretch>,
}

impl RenderEngine {
    /// Engine with the default transition and plugin registries.
    pub fn new(timeline: Arc<Timeline>, cache: SharedCache) -> Self {
        Self::with_registries(
            timeline,
            cache,
            Arc::new(TransitionRegistry::new()),
            Arc::new(PluginRegistry::new()),
        )
    }

    pub fn with_registries(
        timeline: Arc<Timeline>,
        cache: SharedCache,
        transitions: Arc<TransitionRegistry>,
        plugins: Arc<PluginRegistry>,
    ) -> Self {
        Self::build(
            timeline,
            EngineShared {
                cache,
                transitions,
                plugins,
                depth: 0,
            },
        )
    }

    /// Sub-engine for a nested timeline, one level deeper than its parent.
    pub(crate) fn nested(timeline: Arc<Timeline>, parent: &EngineShared) -> Self {
        Self::build(
            timeline,
            EngineShared {
                cache: parent.cache.clone(),
                transitions: parent.transitions.clone(),
                plugins: parent.plugins.clone(),
                depth: parent.depth + 1,
            },
        )
    }

    fn build(timeline: Arc<Timeline>, shared: EngineShared) -> Self {
        let nodes = timeline
            .tracks
            .iter()
            .map(|track| TrackNode::new(track, &shared.plugins))
            .collect();
        debug!(
            timeline = timeline.id().0,
            tracks = timeline.tracks.len(),
            depth = shared.depth,
            "render engine built"
        );
        Self {
            timeline,
            shared,
            nodes,
            temp: Vec::new(),
            stretchers: Vec::new(),
        }
    }

    pub fn timeline(&self) -> &Arc<Timeline> {
        &self.timeline
    }

    /// Fill one fragment of per-channel output buffers.
    ///
    /// `outputs` holds one buffer per output channel; each is cleared and
    /// then accumulated into by every playable track. `start_position` is
    /// the first project position in the playback direction; for reverse
    /// playback, `outputs[0]` holds the sample at `start_position` and the
    /// buffer runs backwards through project time.
    ///
    /// A single track's recoverable failure leaves its region silent and is
    /// recorded in the outcome; sibling tracks keep rendering.
    pub fn process_buffer(
        &mut self,
        outputs: &mut [Vec<f64>],
        len: i64,
        start_position: i64,
        direction: Direction,
    ) -> RenderOutcome {
        let len = len.max(0) as usize;
        let mut outcome = RenderOutcome::default();

        for output in outputs.iter_mut() {
            if output.len() < len {
                output.resize(len, 0.0);
            }
            output[..len].fill(0.0);
        }

        let mut temp = std::mem::take(&mut self.temp);
        if temp.len() < len {
            temp.resize(len, 0.0);
        }

        let timeline = self.timeline.clone();
        for (track, node) in timeline.tracks.iter().zip(self.nodes.iter_mut()) {
            if !track.play {
                continue;
            }
            if let Err(error) = node.render(
                track,
                outputs,
                &mut temp[..len],
                start_position,
                direction,
                timeline.sample_rate,
                &self.shared,
            ) {
                outcome.record(track.id, error);
            }
        }

        self.temp = temp;
        outcome
    }

    /// Render one fragment and time-stretch it for preview at `speed`.
    ///
    /// Returns the outcome and the real output length, which differs from
    /// `len` whenever `speed != 1`. Buffers grow as needed for slow speeds.
    pub fn process_preview(
        &mut self,
        outputs: &mut [Vec<f64>],
        len: i64,
        start_position: i64,
        direction: Direction,
        speed: f64,
        scrub_chop: bool,
    ) -> (RenderOutcome, usize) {
        let outcome = self.process_buffer(outputs, len, start_position, direction);
        let len = len.max(0) as usize;

        while self.stretchers.len() < outputs.len() {
            self.stretchers.push(TimeStretch::new());
        }

        let allocation = TimeStretch::output_allocation(len, speed);
        let mut real_len = if speed == 1.0 { len } else { 0 };
        for (output, stretch) in outputs.iter_mut().zip(self.stretchers.iter_mut()) {
            if output.len() < allocation {
                output.resize(allocation, 0.0);
            }
            let produced = stretch.process(output, speed, len, scrub_chop, self.timeline.sample_rate);
            real_len = real_len.max(produced);
        }
        (outcome, real_len)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::source::{MemoryCache, MemoryReader};
    use approx::assert_relative_eq;
    use moviola_timeline::{EditSource, IdAllocator, Track};

    fn ramp(len: usize) -> Vec<f64> {
        (0..len).map(|i| i as f64).collect()
    }

    fn simple_timeline(cache: &MemoryCache) -> Arc<Timeline> {
        let ids = IdAllocator::new();
        cache.insert("ramp", Box::new(MemoryReader::mono(48000, ramp(48000))));
        let mut timeline = Timeline::new(ids.next_timeline(), 48000, 1);
        let track = timeline.add_track(Track::audio(ids.next_track(), "a", 1));
        track.edits.append(
            0,
            48000,
            EditSource::Asset {
                id: "ramp".into(),
                channel: 0,
            },
        );
        Arc::new(timeline)
    }

    #[test]
    fn test_process_buffer_reads_source() {
        let cache = Arc::new(MemoryCache::new());
        let timeline = simple_timeline(&cache);
        let mut engine = RenderEngine::new(timeline, cache);

        let mut outputs = vec![vec![0.0; 64]];
        let outcome = engine.process_buffer(&mut outputs, 64, 100, Direction::Forward);
        assert!(outcome.is_ok());
        for (i, v) in outputs[0].iter().enumerate() {
            assert_relative_eq!(*v, (100 + i) as f64);
        }
    }

    #[test]
    fn test_missing_source_records_failure_and_zero_fills() {
        let _ = tracing_subscriber::fmt().with_test_writer().try_init();
        let ids = IdAllocator::new();
        let mut timeline = Timeline::new(ids.next_timeline(), 48000, 1);
        let track = timeline.add_track(Track::audio(ids.next_track(), "a", 1));
        track.edits.append(
            0,
            1000,
            EditSource::Asset {
                id: "missing".into(),
                channel: 0,
            },
        );
        let mut engine = RenderEngine::new(Arc::new(timeline), Arc::new(MemoryCache::new()));

        let mut outputs = vec![vec![1.0; 32]];
        let outcome = engine.process_buffer(&mut outputs, 32, 0, Direction::Forward);
        assert!(!outcome.is_ok());
        assert_eq!(outcome.failures().len(), 1);
        assert!(outputs[0].iter().all(|v| *v == 0.0));
    }

    #[test]
    fn test_nested_failure_is_recorded() {
        use crate::error::RenderError;
        let _ = tracing_subscriber::fmt().with_test_writer().try_init();
        let ids = IdAllocator::new();
        let mut inner = Timeline::new(ids.next_timeline(), 48000, 1);
        let track = inner.add_track(Track::audio(ids.next_track(), "a", 1));
        track.edits.append(
            0,
            1000,
            EditSource::Asset {
                id: "missing".into(),
                channel: 0,
            },
        );

        let mut outer = Timeline::new(ids.next_timeline(), 48000, 1);
        let track = outer.add_track(Track::audio(ids.next_track(), "nest", 1));
        track.edits.append(
            0,
            1000,
            EditSource::Nested {
                timeline: Arc::new(inner),
                channel: 0,
            },
        );
        let mut engine = RenderEngine::new(Arc::new(outer), Arc::new(MemoryCache::new()));

        let mut outputs = vec![vec![1.0; 32]];
        let outcome = engine.process_buffer(&mut outputs, 32, 0, Direction::Forward);
        assert!(!outcome.is_ok());
        assert_eq!(
            outcome.failures()[0].1,
            RenderError::SourceOpen("missing".into())
        );
        assert!(outputs[0].iter().all(|v| *v == 0.0));
    }

    #[test]
    fn test_preview_at_unity_speed_is_identity() {
        let cache = Arc::new(MemoryCache::new());
        let timeline = simple_timeline(&cache);
        let mut engine = RenderEngine::new(timeline, cache);

        let mut outputs = vec![vec![0.0; 32]];
        let (outcome, real_len) =
            engine.process_preview(&mut outputs, 32, 0, Direction::Forward, 1.0, false);
        assert!(outcome.is_ok());
        assert_eq!(real_len, 32);
        assert_relative_eq!(outputs[0][5], 5.0);
    }
}
