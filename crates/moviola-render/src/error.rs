//! Render error taxonomy.
//!
//! Recoverable faults (unopenable source, bad channel, empty speed window)
//! leave the affected region zero-filled and let the render continue;
//! structural faults abort the render call.

use moviola_timeline::TrackId;
use thiserror::Error;

/// Error type for render operations.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RenderError {
    /// Source could not be checked out of the cache. Recoverable; the
    /// fragment stays zero-filled.
    #[error("Couldn't open source {0}")]
    SourceOpen(String),

    /// Edit channel beyond the nested timeline's channel count. Recoverable.
    #[error("Channel {channel} not in nested timeline ({channels} channels)")]
    NestedChannel { channel: usize, channels: usize },

    /// Source read failed mid-fragment. Recoverable.
    #[error("Read failed in source {0}")]
    SourceRead(String),

    /// Fragment cursor failed to advance. Structural; the render call
    /// aborts rather than spinning.
    #[error("Fragment did not advance at position {0}")]
    NonAdvancingFragment(i64),
}

/// Result type alias.
pub type Result<T> = core::result::Result<T, RenderError>;

/// Per-call render report.
///
/// A single track's failure must not blank the whole mix, so recoverable
/// track errors are recorded here while sibling tracks keep rendering.
#[derive(Debug, Default)]
#[must_use]
pub struct RenderOutcome {
    failures: Vec<(TrackId, RenderError)>,
}

impl RenderOutcome {
    pub fn record(&mut self, track: TrackId, error: RenderError) {
        self.failures.push((track, error));
    }

    pub fn is_ok(&self) -> bool {
        self.failures.is_empty()
    }

    pub fn failures(&self) -> &[(TrackId, RenderError)] {
        &self.failures
    }
}
