//! Keyframe primitives.
//!
//! A keyframe is one timestamped sample of an automatable parameter. Float
//! keyframes carry bezier control offsets; switch keyframes carry a boolean;
//! pan keyframes carry one weight per output channel.
//!
//! Serialized attribute names match the original project file format so
//! clipboard data stays interchangeable.

use crate::{equiv, MAX_CHANNELS};
use serde::{Deserialize, Serialize};
use smallvec::SmallVec;

/// Interpolation mode of a float keyframe.
///
/// Serializes as an integer enum (`MODE` attribute).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(into = "u8", try_from = "u8")]
pub enum CurveMode {
    #[default]
    Linear,
    /// Bezier with mirrored control offsets, keeping the curve smooth
    /// through the keyframe.
    BezierLocked,
    /// Bezier with independent control offsets.
    BezierUnlocked,
}

impl From<CurveMode> for u8 {
    fn from(mode: CurveMode) -> u8 {
        match mode {
            CurveMode::Linear => 0,
            CurveMode::BezierLocked => 1,
            CurveMode::BezierUnlocked => 2,
        }
    }
}

impl TryFrom<u8> for CurveMode {
    type Error = String;

    fn try_from(value: u8) -> Result<Self, String> {
        match value {
            0 => Ok(CurveMode::Linear),
            1 => Ok(CurveMode::BezierLocked),
            2 => Ok(CurveMode::BezierUnlocked),
            other => Err(format!("invalid curve mode {other}")),
        }
    }
}

/// One float parameter sample at a timeline position.
///
/// Control values are offsets from `value`, not absolute curve points.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FloatKeyframe {
    #[serde(rename = "POSITION", default)]
    pub position: i64,
    #[serde(rename = "VALUE")]
    pub value: f64,
    #[serde(rename = "CONTROL_IN_VALUE", default)]
    pub control_in: f64,
    #[serde(rename = "CONTROL_OUT_VALUE", default)]
    pub control_out: f64,
    #[serde(rename = "MODE", default)]
    pub mode: CurveMode,
}

impl FloatKeyframe {
    pub fn new(position: i64, value: f64, mode: CurveMode) -> Self {
        Self {
            position,
            value,
            control_in: 0.0,
            control_out: 0.0,
            mode,
        }
    }

    /// Linear keyframe with zero control offsets.
    pub fn linear(position: i64, value: f64) -> Self {
        Self::new(position, value, CurveMode::Linear)
    }

    /// Set the incoming control offset, mirroring onto the outgoing side in
    /// locked mode.
    pub fn set_control_in(&mut self, value: f64) {
        self.control_in = value;
        if self.mode == CurveMode::BezierLocked {
            self.control_out = -value;
        }
    }

    /// Set the outgoing control offset, mirroring onto the incoming side in
    /// locked mode.
    pub fn set_control_out(&mut self, value: f64) {
        self.control_out = value;
        if self.mode == CurveMode::BezierLocked {
            self.control_in = -value;
        }
    }

    /// Change the interpolation mode. Entering locked mode reconciles the
    /// control offsets: the larger magnitude wins and is negated onto the
    /// other side.
    pub fn set_mode(&mut self, mode: CurveMode) {
        self.mode = mode;
        if mode == CurveMode::BezierLocked {
            if self.control_in.abs() >= self.control_out.abs() {
                self.control_out = -self.control_in;
            } else {
                self.control_in = -self.control_out;
            }
        }
    }

    /// Value-equality used by keyframe optimization: position is ignored.
    pub fn same_value(&self, other: &FloatKeyframe) -> bool {
        equiv(self.value, other.value)
            && equiv(self.control_in, other.control_in)
            && equiv(self.control_out, other.control_out)
            && self.mode == other.mode
    }
}

/// One boolean parameter sample (mute).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SwitchKeyframe {
    #[serde(rename = "POSITION", default)]
    pub position: i64,
    #[serde(rename = "VALUE")]
    pub value: bool,
}

impl SwitchKeyframe {
    pub fn new(position: i64, value: bool) -> Self {
        Self { position, value }
    }
}

/// One pan sample: a weight per output channel.
///
/// Pan keyframes interpolate linearly; they carry no bezier controls.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PanKeyframe {
    #[serde(rename = "POSITION", default)]
    pub position: i64,
    #[serde(rename = "VALUES")]
    pub values: SmallVec<[f64; MAX_CHANNELS]>,
}

impl PanKeyframe {
    pub fn new(position: i64, values: &[f64]) -> Self {
        Self {
            position,
            values: SmallVec::from_slice(values),
        }
    }

    /// Weight for a channel; channels beyond the stored weights are silent.
    pub fn value(&self, channel: usize) -> f64 {
        self.values.get(channel).copied().unwrap_or(0.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_locked_mode_mirrors_controls() {
        let mut kf = FloatKeyframe::new(0, 1.0, CurveMode::BezierLocked);
        kf.set_control_out(0.5);
        assert_eq!(kf.control_in, -0.5);
        kf.set_control_in(0.25);
        assert_eq!(kf.control_out, -0.25);
    }

    #[test]
    fn test_entering_locked_mode_larger_magnitude_wins() {
        let mut kf = FloatKeyframe::new(0, 1.0, CurveMode::BezierUnlocked);
        kf.set_control_in(0.1);
        kf.set_control_out(-0.8);
        kf.set_mode(CurveMode::BezierLocked);
        assert_eq!(kf.control_out, -0.8);
        assert_eq!(kf.control_in, 0.8);
    }

    #[test]
    fn test_unlocked_mode_keeps_controls_independent() {
        let mut kf = FloatKeyframe::new(0, 1.0, CurveMode::BezierUnlocked);
        kf.set_control_in(0.3);
        kf.set_control_out(0.7);
        assert_eq!(kf.control_in, 0.3);
        assert_eq!(kf.control_out, 0.7);
    }

    #[test]
    fn test_keyframe_attribute_names() {
        let kf = FloatKeyframe::linear(100, -6.0);
        let json = serde_json::to_value(&kf).unwrap();
        assert_eq!(json["POSITION"], 100);
        assert_eq!(json["VALUE"], -6.0);
        assert_eq!(json["MODE"], 0);
    }

    #[test]
    fn test_mode_round_trip() {
        let mut kf = FloatKeyframe::new(10, 2.0, CurveMode::BezierUnlocked);
        kf.set_control_in(-1.0);
        let json = serde_json::to_string(&kf).unwrap();
        let back: FloatKeyframe = serde_json::from_str(&json).unwrap();
        assert_eq!(back, kf);
    }

    #[test]
    fn test_pan_keyframe_out_of_range_channel() {
        let kf = PanKeyframe::new(0, &[0.5, 0.5]);
        assert_eq!(kf.value(0), 0.5);
        assert_eq!(kf.value(5), 0.0);
    }
}
