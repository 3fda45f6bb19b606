//! Transition attached to an edit.

use crate::float_track::FloatTrack;
use serde::{Deserialize, Serialize};

/// Blend between the tail of the previous edit and the head of its owner.
///
/// `title` names the blend algorithm; the render layer resolves it through a
/// registry. The transition covers the first `length` units of the owning
/// edit.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Transition {
    pub title: String,
    pub length: i64,
    pub on: bool,
    /// Optional shaping curve for the blend, domain `[0, length)`.
    pub params: FloatTrack,
}

impl Transition {
    pub fn new(title: impl Into<String>, length: i64) -> Self {
        Self {
            title: title.into(),
            length,
            on: true,
            params: FloatTrack::new(0.0),
        }
    }

    /// True when the transition still covers `offset` units into the edit.
    pub fn covers(&self, offset: i64) -> bool {
        self.on && offset < self.length
    }
}
