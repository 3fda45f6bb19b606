//! Per-track parameter set.
//!
//! Every automatable parameter kind is a closed enum variant; each kind owns
//! at most one keyframe track. Kinds that do not apply to a track's media
//! type (camera geometry on an audio track) stay absent.

use crate::float_track::FloatTrack;
use crate::pan_track::PanTrack;
use crate::switch_track::SwitchTrack;
use crate::{equiv, Direction, SearchHint};
use serde::{Deserialize, Serialize};

/// Automatable parameter kinds.
///
/// The serialized tag-pair title of each kind is stable project-file
/// vocabulary; see [`ParamKind::save_title`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ParamKind {
    Mute,
    CameraX,
    CameraY,
    CameraZ,
    ProjectorX,
    ProjectorY,
    ProjectorZ,
    Fade,
    Pan,
    Mode,
    Mask,
    Speed,
    Transition,
    PluginSet,
}

impl ParamKind {
    pub const ALL: [ParamKind; 14] = [
        ParamKind::Mute,
        ParamKind::CameraX,
        ParamKind::CameraY,
        ParamKind::CameraZ,
        ParamKind::ProjectorX,
        ParamKind::ProjectorY,
        ParamKind::ProjectorZ,
        ParamKind::Fade,
        ParamKind::Pan,
        ParamKind::Mode,
        ParamKind::Mask,
        ParamKind::Speed,
        ParamKind::Transition,
        ParamKind::PluginSet,
    ];

    pub fn index(&self) -> usize {
        Self::ALL.iter().position(|k| k == self).unwrap_or(0)
    }

    /// Tag-pair title wrapping this parameter's keyframe list on save.
    pub fn save_title(&self) -> &'static str {
        match self {
            ParamKind::Mute => "MUTEAUTOS",
            ParamKind::CameraX => "CAMERA_X",
            ParamKind::CameraY => "CAMERA_Y",
            ParamKind::CameraZ => "CAMERA_Z",
            ParamKind::ProjectorX => "PROJECTOR_X",
            ParamKind::ProjectorY => "PROJECTOR_Y",
            ParamKind::ProjectorZ => "PROJECTOR_Z",
            ParamKind::Fade => "FADEAUTOS",
            ParamKind::Pan => "PANAUTOS",
            ParamKind::Mode => "MODEAUTOS",
            ParamKind::Mask => "MASKAUTOS",
            ParamKind::Speed => "SPEEDAUTOS",
            ParamKind::Transition => "TRANSITIONAUTOS",
            ParamKind::PluginSet => "PLUGINSETAUTOS",
        }
    }

    pub fn from_save_title(title: &str) -> Option<ParamKind> {
        Self::ALL.iter().copied().find(|k| k.save_title() == title)
    }

    /// Like [`ParamKind::from_save_title`] but failing loudly, for loaders.
    pub fn parse_save_title(title: &str) -> crate::Result<ParamKind> {
        Self::from_save_title(title).ok_or_else(|| crate::Error::UnknownParamTag(title.to_string()))
    }
}

/// One parameter's keyframe track, tagged by value type.
///
/// Each variant supplies its own interpolation, copy, and serialization
/// behavior; there is no open-ended subtyping.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum ParamTrack {
    Float(FloatTrack),
    Switch(SwitchTrack),
    Pan(PanTrack),
}

impl ParamTrack {
    pub fn as_float(&self) -> Option<&FloatTrack> {
        match self {
            ParamTrack::Float(t) => Some(t),
            _ => None,
        }
    }

    pub fn as_float_mut(&mut self) -> Option<&mut FloatTrack> {
        match self {
            ParamTrack::Float(t) => Some(t),
            _ => None,
        }
    }

    pub fn as_switch(&self) -> Option<&SwitchTrack> {
        match self {
            ParamTrack::Switch(t) => Some(t),
            _ => None,
        }
    }

    pub fn as_switch_mut(&mut self) -> Option<&mut SwitchTrack> {
        match self {
            ParamTrack::Switch(t) => Some(t),
            _ => None,
        }
    }

    pub fn as_pan(&self) -> Option<&PanTrack> {
        match self {
            ParamTrack::Pan(t) => Some(t),
            _ => None,
        }
    }

    pub fn as_pan_mut(&mut self) -> Option<&mut PanTrack> {
        match self {
            ParamTrack::Pan(t) => Some(t),
            _ => None,
        }
    }

    /// Remove keyframes in a range across any variant.
    pub fn clear(&mut self, start: i64, end: i64, shift: bool) {
        match self {
            ParamTrack::Float(t) => t.clear(start, end, shift),
            ParamTrack::Switch(t) => t.clear(start, end, shift),
            ParamTrack::Pan(t) => t.clear(start, end, shift),
        }
    }

    /// Shift keyframes forward for a silence insertion, any variant.
    pub fn insert_silence(&mut self, start: i64, end: i64) {
        match self {
            ParamTrack::Float(t) => t.insert_silence(start, end),
            ParamTrack::Switch(t) => t.insert_silence(start, end),
            ParamTrack::Pan(t) => t.insert_silence(start, end),
        }
    }
}

/// The full set of keyframe tracks for one track.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Automation {
    tracks: Vec<Option<ParamTrack>>,
}

impl Automation {
    /// Empty parameter set; all kinds absent.
    pub fn new() -> Self {
        Self {
            tracks: (0..ParamKind::ALL.len()).map(|_| None).collect(),
        }
    }

    /// Parameter set for an audio track: mute off, unity fade (0 dB),
    /// equal-weight pan, unity speed.
    pub fn audio(channels: usize) -> Self {
        let mut automation = Self::new();
        automation.set(ParamKind::Mute, ParamTrack::Switch(SwitchTrack::new(false)));
        automation.set(ParamKind::Fade, ParamTrack::Float(FloatTrack::new(0.0)));
        automation.set(ParamKind::Pan, ParamTrack::Pan(PanTrack::equal(channels)));
        automation.set(ParamKind::Speed, ParamTrack::Float(FloatTrack::new(1.0)));
        automation
    }

    pub fn get(&self, kind: ParamKind) -> Option<&ParamTrack> {
        self.tracks[kind.index()].as_ref()
    }

    pub fn get_mut(&mut self, kind: ParamKind) -> Option<&mut ParamTrack> {
        self.tracks[kind.index()].as_mut()
    }

    pub fn set(&mut self, kind: ParamKind, track: ParamTrack) {
        self.tracks[kind.index()] = Some(track);
    }

    pub fn fade(&self) -> Option<&FloatTrack> {
        self.get(ParamKind::Fade).and_then(ParamTrack::as_float)
    }

    pub fn fade_mut(&mut self) -> Option<&mut FloatTrack> {
        self.get_mut(ParamKind::Fade).and_then(ParamTrack::as_float_mut)
    }

    pub fn mute(&self) -> Option<&SwitchTrack> {
        self.get(ParamKind::Mute).and_then(ParamTrack::as_switch)
    }

    pub fn mute_mut(&mut self) -> Option<&mut SwitchTrack> {
        self.get_mut(ParamKind::Mute).and_then(ParamTrack::as_switch_mut)
    }

    pub fn pan(&self) -> Option<&PanTrack> {
        self.get(ParamKind::Pan).and_then(ParamTrack::as_pan)
    }

    pub fn pan_mut(&mut self) -> Option<&mut PanTrack> {
        self.get_mut(ParamKind::Pan).and_then(ParamTrack::as_pan_mut)
    }

    pub fn speed(&self) -> Option<&FloatTrack> {
        self.get(ParamKind::Speed).and_then(ParamTrack::as_float)
    }

    pub fn speed_mut(&mut self) -> Option<&mut FloatTrack> {
        self.get_mut(ParamKind::Speed).and_then(ParamTrack::as_float_mut)
    }

    /// True when the speed curve deviates from identity anywhere.
    pub fn has_speed(&self) -> bool {
        let Some(speed) = self.speed() else {
            return false;
        };
        if speed.is_empty() {
            return !equiv(speed.default_value(), 1.0);
        }
        speed.keys().iter().any(|k| {
            !equiv(k.value, 1.0) || !equiv(k.control_in, 0.0) || !equiv(k.control_out, 0.0)
        })
    }

    /// Instantaneous speed at a project position.
    pub fn speed_at(&self, position: i64, direction: Direction, hint: &mut SearchHint) -> f64 {
        self.speed()
            .map(|s| s.get_value(position, direction, hint))
            .unwrap_or(1.0)
    }

    /// Remove all keyframes in `[start, end)` across every present kind.
    pub fn clear(&mut self, start: i64, end: i64, shift: bool) {
        for track in self.tracks.iter_mut().flatten() {
            track.clear(start, end, shift);
        }
    }

    /// Shift all keyframes forward for a silence insertion.
    pub fn insert_silence(&mut self, start: i64, end: i64) {
        for track in self.tracks.iter_mut().flatten() {
            track.insert_silence(start, end);
        }
    }
}

impl Default for Automation {
    fn default() -> Self {
        Self::new()
    }
}
