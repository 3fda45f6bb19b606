//! Per-track source import and fragment rendering.
//!
//! [`TrackModule`] holds one track's render-time transient state: resampler
//! slots, the speed-curve overlap carry, scratch buffers, and the lazily
//! rebuilt nested sub-engine. `import_samples` fills one fragment for one
//! edit; `render` walks the edit sequence and blends transitions.

use crate::engine::{EngineShared, RenderEngine};
use crate::error::{RenderError, RenderOutcome, Result};
use crate::resample::{reverse_in_place, Resampler};
use crate::{MAX_NESTED_DEPTH, SPEED_OVERLAP};
use moviola_timeline::{
    Direction, Edit, EditSource, SearchHint, Timeline, TimelineId, Track,
};
use smallvec::SmallVec;
use std::sync::Arc;
use tracing::{debug, warn};

/// Resampler slot for the current edit.
const RESAMPLE_MAIN: usize = 0;
/// Resampler slot for the transition-outgoing edit, so the two concurrently
/// blended streams never share resampler state.
const RESAMPLE_TRANSITION: usize = 1;

struct NestedEngine {
    id: TimelineId,
    engine: Box<RenderEngine>,
    outputs: SmallVec<[Vec<f64>; 2]>,
}

/// Render-time transient state for one track.
pub struct TrackModule {
    resamplers: [Option<Resampler>; 2],
    speed_temp: Vec<f64>,
    transition_temp: Vec<f64>,
    prev_head: [f64; SPEED_OVERLAP],
    prev_tail: [f64; SPEED_OVERLAP],
    nested: Option<NestedEngine>,
}

impl TrackModule {
    pub fn new() -> Self {
        Self {
            resamplers: [None, None],
            speed_temp: Vec::new(),
            transition_temp: Vec::new(),
            prev_head: [0.0; SPEED_OVERLAP],
            prev_tail: [0.0; SPEED_OVERLAP],
            nested: None,
        }
    }

    /// Fill `buffer` for one edit starting at project position
    /// `start_project`, applying the track's speed curve.
    #[allow(clippy::too_many_arguments)]
    pub(crate) fn import_samples(
        &mut self,
        track: &Track,
        edit: &Edit,
        start_project: i64,
        direction: Direction,
        sample_rate: u32,
        buffer: &mut [f64],
        resampler_index: usize,
        shared: &EngineShared,
    ) -> Result<()> {
        let fragment_len = buffer.len() as i64;
        let mut start_source = start_project - edit.startproject + edit.startsource;
        let mut speed_fragment_len = fragment_len;

        // Integrate the speed curve to find the source-space read window.
        let mut have_speed = false;
        let mut speed_position1 = 0.0;
        let mut speed_position2 = 0.0;
        if track.automation.has_speed() {
            let speed = track
                .automation
                .speed()
                .unwrap_or_else(|| unreachable!("has_speed implies a speed track"));
            let mut hint = SearchHint::default();

            // Speed-adjusted position from the start of the edit.
            let mut speed_position = edit.startsource as f64;
            for i in edit.startproject..start_project {
                speed_position += speed.get_value(i, Direction::Forward, &mut hint);
            }
            speed_position1 = speed_position;

            // Min/max source position touched by this fragment. Handles
            // speed reversals and oscillation within one fragment.
            let mut max_position = speed_position;
            let mut min_position = speed_position;
            for i in start_project..start_project + fragment_len {
                speed_position += speed.get_value(i, Direction::Forward, &mut hint);
                if speed_position > max_position {
                    max_position = speed_position;
                }
                if speed_position < min_position {
                    min_position = speed_position;
                }
            }
            speed_position2 = speed_position;

            max_position += 1.0;
            speed_fragment_len = (max_position - min_position) as i64;
            start_source = min_position as i64;
            have_speed = true;
        }

        if speed_fragment_len == 0 {
            // Empty speed window: no data, caller hears silence.
            buffer.fill(0.0);
            self.prev_head = [0.0; SPEED_OVERLAP];
            self.prev_tail = [0.0; SPEED_OVERLAP];
            return Ok(());
        }

        // Resolve the source into either the caller's buffer or the speed
        // scratch buffer.
        let mut speed_temp = std::mem::take(&mut self.speed_temp);
        if have_speed && speed_temp.len() < speed_fragment_len as usize {
            speed_temp.resize(speed_fragment_len as usize, 0.0);
        }
        let read_result = {
            let dst: &mut [f64] = if have_speed {
                &mut speed_temp[..speed_fragment_len as usize]
            } else {
                buffer
            };
            self.read_source(
                track,
                edit,
                start_source,
                direction,
                sample_rate,
                dst,
                resampler_index,
                shared,
            )
        };

        if let Err(error) = read_result {
            // Recoverable: the fragment stays zero-filled.
            buffer.fill(0.0);
            self.speed_temp = speed_temp;
            return Err(error);
        }

        // Stretch the raw window back to exactly fragment_len samples,
        // carrying an overlap so consecutive fragments blend continuously.
        if have_speed {
            let speed_buffer = &speed_temp[..speed_fragment_len as usize];
            let speed = track
                .automation
                .speed()
                .unwrap_or_else(|| unreachable!("has_speed implies a speed track"));
            let mut hint = SearchHint::default();

            match direction {
                Direction::Reverse => {
                    // The source buffer is already reversed; map output
                    // samples back through the integrated speed position.
                    let mut out_offset = 0;
                    let mut speed_position = speed_position2 - start_source as f64;
                    let mut i = start_project + fragment_len;
                    while i != start_project {
                        let in_offset = clamp_i(
                            speed_fragment_len - 1 - speed_position as i64,
                            0,
                            speed_fragment_len - 1,
                        );
                        buffer[out_offset] = speed_buffer[in_offset as usize];
                        out_offset += 1;
                        speed_position -= speed.get_value(i, Direction::Reverse, &mut hint);
                        i -= 1;
                    }
                }
                Direction::Forward => {
                    let mut out_offset = 0;
                    let mut speed_position = speed_position1 - start_source as f64;
                    for i in start_project..start_project + fragment_len {
                        let speed_value = speed.get_value(i, Direction::Forward, &mut hint);
                        let next_speed_position = speed_position + speed_value;
                        let in_offset = speed_position as i64;

                        if speed_value.abs() >= 1.0 {
                            // Average the skipped source samples.
                            let total = speed_value.abs() as i64;
                            let mut accum = 0.0;
                            for j in 0..total {
                                let in_offset2 = clamp_i(
                                    in_offset + if speed_value > 0.0 { j } else { -j },
                                    0,
                                    speed_fragment_len - 1,
                                );
                                accum += speed_buffer[in_offset2 as usize];
                            }
                            buffer[out_offset] = accum / total as f64;
                        } else {
                            // Slow playback reads through the overlap carry
                            // from the previous fragment.
                            let overlap = SPEED_OVERLAP as i64;
                            let in_offset1 = if speed_value < 0.0 {
                                in_offset + overlap
                            } else {
                                in_offset - overlap
                            };
                            let in_offset1 =
                                clamp_i(in_offset1, -overlap, speed_fragment_len - 1 + overlap);
                            buffer[out_offset] = if in_offset1 >= speed_fragment_len {
                                self.prev_head[(in_offset1 - speed_fragment_len) as usize]
                            } else if in_offset1 >= 0 {
                                speed_buffer[in_offset1 as usize]
                            } else {
                                self.prev_tail[(overlap + in_offset1) as usize]
                            };
                        }

                        out_offset += 1;
                        speed_position = next_speed_position;
                    }
                }
            }

            for i in 0..SPEED_OVERLAP {
                let tail = clamp_i(
                    speed_fragment_len - SPEED_OVERLAP as i64 + i as i64,
                    0,
                    speed_fragment_len - 1,
                );
                self.prev_tail[i] = speed_buffer[tail as usize];
                let head = clamp_i(i as i64, 0, speed_fragment_len - 1);
                self.prev_head[i] = speed_buffer[head as usize];
            }
        }

        self.speed_temp = speed_temp;
        Ok(())
    }

    /// Read raw playback-order samples for one edit into `dst`.
    ///
    /// On return the buffer always runs forward in playback order: reverse
    /// playback reads `[start - len, start)` and reverses, so transitions
    /// and speed interpolation downstream can assume forward data.
    #[allow(clippy::too_many_arguments)]
    fn read_source(
        &mut self,
        _track: &Track,
        edit: &Edit,
        start_source: i64,
        direction: Direction,
        sample_rate: u32,
        dst: &mut [f64],
        resampler_index: usize,
        shared: &EngineShared,
    ) -> Result<()> {
        let len = dst.len() as i64;
        match &edit.source {
            EditSource::Nested { timeline, channel } => {
                if shared.depth >= MAX_NESTED_DEPTH {
                    // Cycle safety: too deep, render as silence.
                    debug!(depth = shared.depth, "nested depth limit reached");
                    dst.fill(0.0);
                    return Ok(());
                }
                if *channel >= timeline.channels {
                    warn!(
                        channel = *channel,
                        channels = timeline.channels,
                        "nested channel out of range"
                    );
                    dst.fill(0.0);
                    return Err(RenderError::NestedChannel {
                        channel: *channel,
                        channels: timeline.channels,
                    });
                }

                self.ensure_nested(timeline, shared);
                let mut nested = self
                    .nested
                    .take()
                    .unwrap_or_else(|| unreachable!("ensure_nested populates the engine"));

                let result = if sample_rate != timeline.sample_rate {
                    // Read through the rate converter. The nested engine
                    // already produces playback-order data, so the callback
                    // contract holds for both directions.
                    let mut resampler = self.resamplers[resampler_index]
                        .take()
                        .unwrap_or_default();
                    let channel = *channel;
                    let result = resampler.resample(
                        dst,
                        timeline.sample_rate,
                        sample_rate,
                        start_source,
                        direction,
                        |buf, pos| {
                            let len = buf.len() as i64;
                            ensure_outputs(&mut nested.outputs, timeline.channels, len as usize);
                            let outcome = nested
                                .engine
                                .process_buffer(&mut nested.outputs, len, pos, direction);
                            buf.copy_from_slice(&nested.outputs[channel][..len as usize]);
                            nested_result(outcome)
                        },
                    );
                    self.resamplers[resampler_index] = Some(resampler);
                    result
                } else {
                    ensure_outputs(&mut nested.outputs, timeline.channels, len as usize);
                    let outcome = nested
                        .engine
                        .process_buffer(&mut nested.outputs, len, start_source, direction);
                    dst.copy_from_slice(&nested.outputs[*channel][..len as usize]);
                    nested_result(outcome)
                };
                self.nested = Some(nested);
                result
            }
            EditSource::Asset { id, channel } => {
                self.nested = None;
                shared.cache.age();
                let Some(mut reader) = shared.cache.check_out(id) else {
                    warn!(asset = %id, "couldn't open source");
                    dst.fill(0.0);
                    return Err(RenderError::SourceOpen(id.clone()));
                };

                let result = if sample_rate != reader.sample_rate() {
                    let mut resampler = self.resamplers[resampler_index]
                        .take()
                        .unwrap_or_default();
                    let channel = *channel;
                    let result = resampler.resample(
                        dst,
                        reader.sample_rate(),
                        sample_rate,
                        start_source,
                        direction,
                        |buf, pos| {
                            let len = buf.len() as i64;
                            reader.set_position(if direction.is_reverse() {
                                pos - len
                            } else {
                                pos
                            });
                            reader.set_channel(channel);
                            reader.read_samples(buf)?;
                            if direction.is_reverse() {
                                reverse_in_place(buf);
                            }
                            Ok(())
                        },
                    );
                    self.resamplers[resampler_index] = Some(resampler);
                    result
                } else {
                    reader.set_position(if direction.is_reverse() {
                        start_source - len
                    } else {
                        start_source
                    });
                    reader.set_channel(*channel);
                    let result = reader.read_samples(dst);
                    if direction.is_reverse() {
                        reverse_in_place(dst);
                    }
                    result
                };

                shared.cache.check_in(id, reader);
                result
            }
            EditSource::Silence => {
                self.nested = None;
                dst.fill(0.0);
                Ok(())
            }
        }
    }

    /// Rebuild the nested sub-engine iff the referenced timeline's identity
    /// changed since the last call.
    fn ensure_nested(&mut self, timeline: &Arc<Timeline>, shared: &EngineShared) {
        let rebuild = match &self.nested {
            Some(nested) => nested.id != timeline.id(),
            None => true,
        };
        if rebuild {
            debug!(timeline = timeline.id().0, depth = shared.depth + 1, "building nested engine");
            self.nested = Some(NestedEngine {
                id: timeline.id(),
                engine: Box::new(RenderEngine::nested(timeline.clone(), shared)),
                outputs: SmallVec::new(),
            });
        }
    }

    /// Fill `buffer` for this track across possibly many edits and
    /// transitions, starting at `start_position` in the playback direction.
    pub(crate) fn render(
        &mut self,
        track: &Track,
        buffer: &mut [f64],
        mut start_position: i64,
        direction: Direction,
        sample_rate: u32,
        use_nudge: bool,
        shared: &EngineShared,
    ) -> Result<()> {
        let input_len = buffer.len() as i64;
        if use_nudge {
            start_position += track.nudge;
        }
        let end_position = match direction {
            Direction::Forward => start_position + input_len,
            Direction::Reverse => start_position - input_len,
        };
        buffer.fill(0.0);

        // First edit overlapping the requested span, scanned by direction.
        let edits = track.edits.as_slice();
        let mut cursor: Option<usize> = match direction {
            Direction::Forward => edits.iter().position(|e| {
                start_position < e.end_project() && end_position > e.startproject
            }),
            Direction::Reverse => edits.iter().rposition(|e| {
                end_position < e.end_project() && start_position > e.startproject
            }),
        };

        let mut buffer_offset = 0usize;
        let mut first_error: Option<RenderError> = None;

        // Fill the output one sub-fragment at a time.
        while start_position != end_position {
            let mut fragment_len = input_len;

            // Clamp to the end of the requested span.
            match direction {
                Direction::Forward => {
                    if start_position + fragment_len > end_position {
                        fragment_len = end_position - start_position;
                    }
                }
                Direction::Reverse => {
                    if start_position - fragment_len < end_position {
                        fragment_len = start_position - end_position;
                    }
                }
            }

            if let Some(i) = cursor {
                let edit = &edits[i];
                let edit_start = edit.startproject;
                let edit_end = edit.end_project();

                // Clamp to the end of the edit.
                match direction {
                    Direction::Forward => {
                        if start_position + fragment_len > edit_end {
                            fragment_len = edit_end - start_position;
                        }
                    }
                    Direction::Reverse => {
                        if start_position - fragment_len < edit_start {
                            fragment_len = start_position - edit_start;
                        }
                    }
                }

                // Clamp to the transition boundary so a transition never
                // spans more than one import call.
                let active_transition = edit
                    .transition
                    .as_ref()
                    .filter(|t| t.on && i > 0)
                    .map(|t| t.length);
                if let Some(transition_len) = active_transition {
                    match direction {
                        Direction::Forward => {
                            if start_position < edit_start + transition_len
                                && start_position + fragment_len > edit_start + transition_len
                            {
                                fragment_len = edit_start + transition_len - start_position;
                            }
                        }
                        Direction::Reverse => {
                            if start_position > edit_start
                                && start_position - fragment_len < edit_start
                            {
                                fragment_len = start_position - edit_start;
                            }
                        }
                    }
                }

                if fragment_len <= 0 {
                    // Must not spin.
                    return Err(RenderError::NonAdvancingFragment(start_position));
                }

                let (out_start, out_end) =
                    (buffer_offset, buffer_offset + fragment_len as usize);

                if let Err(error) = {
                    let out = &mut buffer[out_start..out_end];
                    self.import_samples(
                        track,
                        edit,
                        start_position,
                        direction,
                        sample_rate,
                        out,
                        RESAMPLE_MAIN,
                        shared,
                    )
                } {
                    first_error.get_or_insert(error);
                }

                // Blend the outgoing (previous) edit over the incoming head.
                if let (Some(transition), true) = (edit.transition.as_ref().filter(|t| t.on), i > 0)
                {
                    let previous_edit = &edits[i - 1];

                    let mut transition_temp = std::mem::take(&mut self.transition_temp);
                    if transition_temp.len() < fragment_len as usize {
                        transition_temp.resize(fragment_len as usize, 0.0);
                    }
                    // The outgoing segment, regardless of direction.
                    if let Err(error) = self.import_samples(
                        track,
                        previous_edit,
                        start_position,
                        direction,
                        sample_rate,
                        &mut transition_temp[..fragment_len as usize],
                        RESAMPLE_TRANSITION,
                        shared,
                    ) {
                        first_error.get_or_insert(error);
                    }

                    let out = &mut buffer[out_start..out_end];
                    let outgoing = &mut transition_temp[..fragment_len as usize];
                    // Blends run in forward time only.
                    let current_position;
                    if direction.is_reverse() {
                        reverse_in_place(out);
                        reverse_in_place(outgoing);
                        current_position = start_position - fragment_len - edit_start;
                    } else {
                        current_position = start_position - edit_start;
                    }
                    shared.transitions.get(&transition.title).process(
                        outgoing,
                        out,
                        current_position,
                        transition.length,
                    );
                    if direction.is_reverse() {
                        reverse_in_place(out);
                    }
                    self.transition_temp = transition_temp;
                }

                // Step to the next edit on crossing a boundary.
                match direction {
                    Direction::Forward => {
                        if start_position + fragment_len >= edit_end {
                            cursor = if i + 1 < edits.len() { Some(i + 1) } else { None };
                        }
                    }
                    Direction::Reverse => {
                        if start_position - fragment_len <= edit_start {
                            cursor = i.checked_sub(1);
                        }
                    }
                }
            }

            if fragment_len <= 0 {
                return Err(RenderError::NonAdvancingFragment(start_position));
            }
            buffer_offset += fragment_len as usize;
            match direction {
                Direction::Forward => start_position += fragment_len,
                Direction::Reverse => start_position -= fragment_len,
            }
        }

        match first_error {
            Some(error) => Err(error),
            None => Ok(()),
        }
    }
}

impl Default for TrackModule {
    fn default() -> Self {
        Self::new()
    }
}

fn clamp_i(value: i64, low: i64, high: i64) -> i64 {
    value.max(low).min(high)
}

/// Fold a nested engine's outcome into the enclosing track's result. Nested
/// failures are logged here and the first is re-raised, so the caller's
/// report names the nested fault instead of silently dropping it.
fn nested_result(outcome: RenderOutcome) -> Result<()> {
    match outcome.failures().first() {
        Some((track, error)) => {
            warn!(nested_track = track.0, %error, "nested render failed");
            Err(error.clone())
        }
        None => Ok(()),
    }
}

fn ensure_outputs(outputs: &mut SmallVec<[Vec<f64>; 2]>, channels: usize, len: usize) {
    while outputs.len() < channels {
        outputs.push(Vec::new());
    }
    for output in outputs.iter_mut() {
        if output.len() < len {
            output.resize(len, 0.0);
        }
    }
}
