//! Node-graph composition.
//!
//! Each playable track becomes one node: the track module leaf feeding a
//! plugin chain, then fade automation, then mute-gated pan into the shared
//! per-channel output buffers. Tracks mix additively; output buffers are
//! accumulated into, never overwritten.

use crate::db_to_gain;
use crate::engine::EngineShared;
use crate::error::Result;
use crate::module::TrackModule;
use moviola_timeline::{equiv, Direction, FloatTrack, PanTrack, SearchHint, SwitchTrack, Track};
use std::collections::HashMap;

/// Effect instance attached to a track's chain.
pub trait AudioPlugin: Send {
    /// Process one fragment in place.
    fn process(&mut self, buffer: &mut [f64], start_position: i64, sample_rate: u32);
}

/// Name-to-factory table for plugin instantiation.
///
/// A plugin title with no registered factory renders as a pass-through.
#[derive(Default)]
pub struct PluginRegistry {
    factories: HashMap<String, Box<dyn Fn() -> Box<dyn AudioPlugin> + Send + Sync>>,
}

impl PluginRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register<F>(&mut self, title: impl Into<String>, factory: F)
    where
        F: Fn() -> Box<dyn AudioPlugin> + Send + Sync + 'static,
    {
        self.factories.insert(title.into(), Box::new(factory));
    }

    pub fn instantiate(&self, title: &str) -> Option<Box<dyn AudioPlugin>> {
        self.factories.get(title).map(|f| f())
    }
}

/// One track's node: module leaf plus instantiated plugin chain.
pub(crate) struct TrackNode {
    pub(crate) module: TrackModule,
    plugins: Vec<Option<Box<dyn AudioPlugin>>>,
}

impl TrackNode {
    pub(crate) fn new(track: &Track, registry: &PluginRegistry) -> Self {
        Self {
            module: TrackModule::new(),
            plugins: track
                .plugins
                .iter()
                .map(|spec| registry.instantiate(&spec.title))
                .collect(),
        }
    }

    /// Render one fragment of this track and accumulate it into the
    /// channel output buffers.
    #[allow(clippy::too_many_arguments)]
    pub(crate) fn render(
        &mut self,
        track: &Track,
        outputs: &mut [Vec<f64>],
        temp: &mut [f64],
        start_position: i64,
        direction: Direction,
        sample_rate: u32,
        shared: &EngineShared,
    ) -> Result<()> {
        let len = temp.len();

        // Leaf: pull samples from the fragment renderer. Recoverable
        // failures leave zeroed regions; keep compositing what we got.
        let result = self.module.render(
            track,
            temp,
            start_position,
            direction,
            sample_rate,
            true,
            shared,
        );

        // Plugin chain in order.
        for (spec, plugin) in track.plugins.iter().zip(self.plugins.iter_mut()) {
            if let (true, Some(plugin)) = (spec.on, plugin.as_mut()) {
                plugin.process(temp, start_position, sample_rate);
            }
        }

        render_fade(temp, start_position, direction, track.automation.fade());

        // Split the fragment into maximal constant-mute runs; muted runs
        // skip pan and mix work entirely.
        let mute = track.automation.mute();
        let pan = track.automation.pan();
        let mut i = 0usize;
        while i < len {
            let position = match direction {
                Direction::Forward => start_position + i as i64,
                Direction::Reverse => start_position - i as i64,
            };
            let remaining = (len - i) as i64;
            let (muted, run) = mute_span(mute, position, remaining, direction);
            let run = run.min(remaining) as usize;

            if !muted {
                for (channel, output) in outputs.iter_mut().enumerate() {
                    render_pan(
                        &temp[i..i + run],
                        &mut output[i..i + run],
                        position,
                        pan,
                        channel,
                        direction,
                    );
                }
            }
            i += run;
        }

        result
    }
}

/// Apply fade automation (in dB) over a fragment, in place.
pub(crate) fn render_fade(
    buffer: &mut [f64],
    start_position: i64,
    direction: Direction,
    fade: Option<&FloatTrack>,
) {
    let Some(fade) = fade else { return };
    let len = buffer.len() as i64;

    if let Some(db) = fade.is_constant(start_position, len, direction) {
        let gain = db_to_gain(db);
        for sample in buffer.iter_mut() {
            *sample *= gain;
        }
    } else {
        let mut hint = SearchHint::default();
        let mut position = start_position;
        for sample in buffer.iter_mut() {
            *sample *= db_to_gain(fade.get_value(position, direction, &mut hint));
            match direction {
                Direction::Forward => position += 1,
                Direction::Reverse => position -= 1,
            }
        }
    }
}

/// Accumulate `input` into `output` through one channel's pan curve,
/// evaluated as a sequence of slope/intercept segments.
pub(crate) fn render_pan(
    input: &[f64],
    output: &mut [f64],
    mut input_position: i64,
    pan: Option<&PanTrack>,
    channel: usize,
    direction: Direction,
) {
    let Some(pan) = pan else {
        // No pan automation: unity mix.
        for (out, sample) in output.iter_mut().zip(input) {
            *out += sample;
        }
        return;
    };

    let fragment_len = input.len();
    let mut i = 0usize;
    while i < fragment_len {
        let remaining = (fragment_len - i) as i64;
        let segment = pan.channel_slope(input_position, remaining, channel, direction);
        let slope_len = segment.len.min(remaining) as usize;

        if !equiv(segment.slope, 0.0) {
            for j in 0..slope_len {
                let value = segment.slope * j as f64 + segment.intercept;
                output[i + j] += input[i + j] * value;
            }
        } else {
            for j in 0..slope_len {
                output[i + j] += input[i + j] * segment.intercept;
            }
        }

        i += slope_len;
        match direction {
            Direction::Forward => input_position += slope_len as i64,
            Direction::Reverse => input_position -= slope_len as i64,
        }
    }
}

/// Length of the constant-mute run at `position`; absent mute automation
/// plays everything.
pub(crate) fn mute_span(
    mute: Option<&SwitchTrack>,
    position: i64,
    max_len: i64,
    direction: Direction,
) -> (bool, i64) {
    match mute {
        Some(mute) => mute.constant_span(position, max_len, direction),
        None => (false, max_len),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use moviola_timeline::{FloatKeyframe, PanKeyframe, SwitchKeyframe};

    #[test]
    fn test_render_fade_constant() {
        let fade = FloatTrack::new(-20.0);
        let mut buffer = vec![1.0; 16];
        render_fade(&mut buffer, 0, Direction::Forward, Some(&fade));
        for v in &buffer {
            assert_relative_eq!(*v, 0.1, epsilon = 1e-9);
        }
    }

    #[test]
    fn test_render_fade_floor_is_silence() {
        let fade = FloatTrack::new(-40.0);
        let mut buffer = vec![1.0; 8];
        render_fade(&mut buffer, 0, Direction::Forward, Some(&fade));
        assert!(buffer.iter().all(|v| *v == 0.0));
    }

    #[test]
    fn test_render_fade_ramp_midpoint() {
        let mut fade = FloatTrack::new(0.0);
        fade.insert_keyframe(FloatKeyframe::linear(0, 0.0));
        fade.insert_keyframe(FloatKeyframe::linear(1000, -20.0));
        let mut buffer = vec![1.0; 1];
        render_fade(&mut buffer, 500, Direction::Forward, Some(&fade));
        // Linear midpoint of the dB ramp is -10 dB.
        assert_relative_eq!(buffer[0], db_to_gain(-10.0), epsilon = 1e-9);
    }

    #[test]
    fn test_render_pan_accumulates() {
        let pan = PanTrack::new(&[0.5, 0.5]);
        let input = vec![1.0; 4];
        let mut output = vec![0.25; 4];
        render_pan(&input, &mut output, 0, Some(&pan), 0, Direction::Forward);
        for v in &output {
            assert_relative_eq!(*v, 0.75);
        }
    }

    #[test]
    fn test_render_pan_sweep() {
        let mut pan = PanTrack::new(&[0.0]);
        pan.insert_keyframe(PanKeyframe::new(0, &[0.0]));
        pan.insert_keyframe(PanKeyframe::new(4, &[1.0]));
        let input = vec![1.0; 4];
        let mut output = vec![0.0; 4];
        render_pan(&input, &mut output, 0, Some(&pan), 0, Direction::Forward);
        assert_relative_eq!(output[0], 0.0);
        assert_relative_eq!(output[2], 0.5);
    }

    #[test]
    fn test_mute_span_without_track_is_unmuted() {
        let (muted, len) = mute_span(None, 0, 100, Direction::Forward);
        assert!(!muted);
        assert_eq!(len, 100);
    }

    #[test]
    fn test_mute_span_with_keyframes() {
        let mut mute = SwitchTrack::new(false);
        mute.insert_keyframe(SwitchKeyframe::new(50, true));
        let (muted, len) = mute_span(Some(&mute), 0, 100, Direction::Forward);
        assert!(!muted);
        assert_eq!(len, 50);
    }
}
