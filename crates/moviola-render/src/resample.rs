//! Rate conversion.
//!
//! [`Resampler`] is a linear-interpolating rate converter fed by a
//! caller-supplied read callback. It carries its fractional source position
//! across calls so sequential fragments are seam-free. Resampling always
//! runs forward over playback-order data; for reverse playback the callback
//! delivers reversed source data (see [`Resampler::resample`]).

use crate::error::Result;
use moviola_timeline::Direction;

/// Reverse a buffer in place.
///
/// Pure transform used wherever reverse playback needs forward-running data:
/// after reverse source reads, and around transition blends.
pub fn reverse_in_place(buffer: &mut [f64]) {
    buffer.reverse();
}

/// Linear rate converter with carried inter-fragment state.
///
/// One resampler per concurrent logical stream: the importer keeps one for
/// the current edit and a second for the transition-outgoing edit so the two
/// blended streams never share interpolation state.
#[derive(Debug)]
pub struct Resampler {
    /// Expected (start, direction) of the next sequential call; anything
    /// else resets the carried state.
    next_start: Option<(i64, Direction)>,
    /// Integer source position the next input read starts at.
    in_position: i64,
    /// Fractional source offset past `in_position`, in `[0, 1)`.
    fraction: f64,
    input: Vec<f64>,
}

impl Resampler {
    pub fn new() -> Self {
        Self {
            next_start: None,
            in_position: 0,
            fraction: 0.0,
            input: Vec::new(),
        }
    }

    pub fn reset(&mut self) {
        self.next_start = None;
        self.fraction = 0.0;
    }

    /// Fill `output` at `out_rate` from a source running at `in_rate`.
    ///
    /// `start` is the fragment's starting position in output-rate units.
    /// `read(buf, pos)` must fill `buf` with playback-order source samples
    /// beginning at source position `pos`: a forward read of `[pos,
    /// pos+len)`, or for reverse playback a read of `(pos-len, pos]`
    /// reversed in place, mirroring how the importer reads assets.
    pub fn resample<F>(
        &mut self,
        output: &mut [f64],
        in_rate: u32,
        out_rate: u32,
        start: i64,
        direction: Direction,
        mut read: F,
    ) -> Result<()>
    where
        F: FnMut(&mut [f64], i64) -> Result<()>,
    {
        let ratio = in_rate as f64 / out_rate as f64;

        if self.next_start != Some((start, direction)) {
            // Random access: derive the source position from scratch.
            let source_start = start as f64 * ratio;
            self.in_position = source_start.floor() as i64;
            self.fraction = source_start - source_start.floor();
        }

        let in_len = (output.len() as f64 * ratio + self.fraction).ceil() as usize + 1;
        if self.input.len() < in_len {
            self.input.resize(in_len, 0.0);
        }
        read(&mut self.input[..in_len], self.in_position)?;

        let mut pos = self.fraction;
        for out in output.iter_mut() {
            let i = pos as usize;
            let frac = pos - i as f64;
            *out = self.input[i] * (1.0 - frac) + self.input[i + 1] * frac;
            pos += ratio;
        }

        let consumed = pos.floor() as i64;
        self.fraction = pos - consumed as f64;
        let out_len = output.len() as i64;
        match direction {
            Direction::Forward => {
                self.in_position += consumed;
                self.next_start = Some((start + out_len, direction));
            }
            Direction::Reverse => {
                self.in_position -= consumed;
                self.next_start = Some((start - out_len, direction));
            }
        }
        Ok(())
    }
}

impl Default for Resampler {
    fn default() -> Self {
        Self::new()
    }
}
