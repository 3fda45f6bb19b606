//! Preview time stretcher.
//!
//! Independent of the per-edit speed curve: this changes playback speed of
//! already-rendered fragments during interactive preview. Stateful across
//! fragments; one instance per output channel.

/// Real-time speed changer.
///
/// For speed > 1 it either chops the signal into dissolve/drop windows
/// (scrub-chop mode, keeps speech intelligible) or averages samples into an
/// accumulator. For speed < 1 it repeats samples. Output length differs from
/// input length; [`TimeStretch::process`] returns the real output length.
#[derive(Debug, Default)]
pub struct TimeStretch {
    chopper_buf: Vec<f64>,
    chopper_count: i64,
    dissolve_count: i64,
    drop_count: i64,
    dissolve_count0: f64,
    drop_count0: f64,
    drop_remain: f64,
    dissolve_remain: f64,

    // fast-forward accumulator state
    fastfwd_accum: f64,
    fastfwd_count: f64,
}

impl TimeStretch {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn reset(&mut self) {
        *self = Self::default();
    }

    /// Stretch `audio[..len]` in place for `speed`; returns the number of
    /// valid output samples.
    ///
    /// `audio` must hold at least [`TimeStretch::output_allocation`] samples:
    /// speeds below 1 write the expansion past `len`.
    pub fn process(
        &mut self,
        audio: &mut [f64],
        speed: f64,
        len: usize,
        scrub_chop: bool,
        sample_rate: u32,
    ) -> usize {
        debug_assert!(audio.len() >= Self::output_allocation(len, speed));
        if speed > 1.0 {
            if scrub_chop {
                self.process_chopped(audio, speed, len, sample_rate)
            } else {
                self.process_fastfwd(audio, speed, len)
            }
        } else if speed < 1.0 {
            // Repeat each sample 1/speed times, filling backwards so the
            // expansion can run in place.
            let interpolate_len = (1.0 / speed) as usize;
            let real_output_len = len * interpolate_len;
            let mut out = real_output_len;
            for i in (0..len).rev() {
                let sample = audio[i];
                for _ in 0..interpolate_len {
                    out -= 1;
                    audio[out] = sample;
                }
            }
            real_output_len
        } else {
            len
        }
    }

    /// Capacity the output buffer needs for `len` input samples at `speed`.
    pub fn output_allocation(len: usize, speed: f64) -> usize {
        if speed < 1.0 {
            len * (1.0 / speed) as usize
        } else {
            len
        }
    }

    fn process_chopped(&mut self, audio: &mut [f64], speed: f64, len: usize, sample_rate: u32) -> usize {
        // Longer windows at lower speeds keep the chopping intelligible.
        let denominator = if speed < 2.0 { 20.0 } else { 40.0 };
        let chopper_window = sample_rate as f64 * speed / denominator;

        // drop_count + 2 * dissolve_count must sum to the window.
        let (dissolve_count1, drop_count1) = if speed >= 2.0 {
            // Over 2x, drop samples between overlapping windows.
            let dissolve = chopper_window / speed;
            (dissolve, chopper_window - dissolve * 2.0)
        } else {
            // Under 2x, all input is used and the windows overlap slightly.
            let dissolve = chopper_window - chopper_window / speed;
            (dissolve, chopper_window / speed - dissolve)
        };

        // Speed changed: reset the window state.
        if dissolve_count1 != self.dissolve_count0 || drop_count1 != self.drop_count0 {
            self.dissolve_count = dissolve_count1 as i64;
            self.drop_count = drop_count1 as i64;
            self.drop_remain = 0.0;
            self.dissolve_remain = 0.0;
            self.chopper_count = 0;
        }
        self.dissolve_count0 = dissolve_count1;
        self.drop_count0 = drop_count1;
        let drop_remain0 = self.drop_count0 - self.drop_count0.floor();
        let dissolve_remain0 = self.dissolve_count0 - self.dissolve_count0.floor();

        let dissolve_allocate = (self.dissolve_count0 + 1.0) as usize;
        if self.chopper_buf.len() < dissolve_allocate {
            self.chopper_buf.resize(dissolve_allocate, 0.0);
        }

        let mut out = 0;
        for input in 0..len {
            let sample = audio[input];
            if speed > 2.0 {
                if self.chopper_count < self.dissolve_count {
                    // store outgoing dissolve buffer
                    self.chopper_buf[self.chopper_count as usize] = sample;
                } else if self.chopper_count < self.dissolve_count + self.drop_count {
                    // dropped
                } else {
                    // blend incoming dissolve buffer
                    let offset = (self.chopper_count - self.drop_count - self.dissolve_count) as usize;
                    let fraction = offset as f64 / self.dissolve_count as f64;
                    audio[out] = self.chopper_buf[offset] * (1.0 - fraction) + sample * fraction;
                    out += 1;
                }
            } else if self.chopper_count < self.drop_count {
                audio[out] = sample;
                out += 1;
            } else if self.chopper_count < self.drop_count + self.dissolve_count {
                // store outgoing dissolve buffer
                let offset = (self.chopper_count - self.drop_count) as usize;
                self.chopper_buf[offset] = sample;
            } else {
                // blend incoming dissolve buffer
                let offset = (self.chopper_count - self.drop_count - self.dissolve_count) as usize;
                let fraction = offset as f64 / self.dissolve_count as f64;
                audio[out] = self.chopper_buf[offset] * (1.0 - fraction) + sample * fraction;
                out += 1;
            }

            self.chopper_count += 1;
            if self.chopper_count >= self.drop_count + self.dissolve_count * 2 {
                self.chopper_count = 0;
                self.drop_count = self.drop_count0 as i64;
                self.dissolve_count = self.dissolve_count0 as i64;

                // Carry fractional window sizes so long runs don't drift.
                self.drop_remain += drop_remain0;
                self.dissolve_remain += dissolve_remain0;
                if self.drop_remain.trunc().abs() > 0.0 {
                    self.drop_count += self.drop_remain.trunc() as i64;
                    self.drop_remain -= self.drop_remain.trunc();
                }
                if self.dissolve_remain.trunc().abs() > 0.0 {
                    self.dissolve_count += self.dissolve_remain.trunc() as i64;
                    self.dissolve_remain -= self.dissolve_remain.trunc();
                }
            }
        }
        out
    }

    fn process_fastfwd(&mut self, audio: &mut [f64], speed: f64, len: usize) -> usize {
        let mut out = 0;
        for input in 0..len {
            let sample = audio[input];
            self.fastfwd_count += 1.0;
            let remain = self.fastfwd_count - speed;
            if remain >= 0.0 {
                // output a sample
                self.fastfwd_accum += sample * (1.0 - remain);
                self.fastfwd_accum /= speed;
                audio[out] = self.fastfwd_accum;
                out += 1;
                self.fastfwd_accum = sample * remain;
                self.fastfwd_count = remain;
            } else {
                // accumulate a sample
                self.fastfwd_accum += sample;
            }
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_unity_speed_is_identity() {
        let mut stretch = TimeStretch::new();
        let mut audio = [0.1, 0.2, 0.3, 0.4];
        let out = stretch.process(&mut audio, 1.0, 4, false, 48000);
        assert_eq!(out, 4);
        assert_eq!(audio, [0.1, 0.2, 0.3, 0.4]);
    }

    #[test]
    fn test_half_speed_repeats_samples() {
        let mut stretch = TimeStretch::new();
        let mut audio = vec![0.0; 8];
        audio[..4].copy_from_slice(&[1.0, 2.0, 3.0, 4.0]);
        let out = stretch.process(&mut audio, 0.5, 4, false, 48000);
        assert_eq!(out, 8);
        assert_eq!(audio, [1.0, 1.0, 2.0, 2.0, 3.0, 3.0, 4.0, 4.0]);
    }

    #[test]
    #[should_panic]
    fn test_slow_speed_rejects_undersized_buffer() {
        let mut stretch = TimeStretch::new();
        // Half speed needs room for 8 output samples.
        let mut audio = vec![0.0; 4];
        stretch.process(&mut audio, 0.5, 4, false, 48000);
    }

    #[test]
    fn test_double_speed_halves_output() {
        let mut stretch = TimeStretch::new();
        let mut audio: Vec<f64> = (0..4800).map(|i| (i % 7) as f64).collect();
        let len = audio.len();
        let out = stretch.process(&mut audio, 2.0, len, false, 48000);
        // Averaging consumes 2 input samples per output sample.
        assert_eq!(out, len / 2);
    }

    #[test]
    fn test_double_speed_averages_constant_signal() {
        let mut stretch = TimeStretch::new();
        let mut audio = vec![0.5; 4800];
        let len = audio.len();
        let out = stretch.process(&mut audio, 2.0, len, false, 48000);
        for v in &audio[1..out] {
            assert_relative_eq!(*v, 0.5, epsilon = 1e-9);
        }
    }

    #[test]
    fn test_scrub_chop_output_shorter_than_input() {
        let mut stretch = TimeStretch::new();
        let mut audio: Vec<f64> = (0..48000).map(|i| ((i as f64) * 0.001).sin()).collect();
        let len = audio.len();
        let out = stretch.process(&mut audio, 3.0, len, true, 48000);
        assert!(out < len);
        assert!(out > 0);
    }
}
