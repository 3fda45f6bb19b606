//! Error types.

use thiserror::Error;

/// Error type for timeline operations.
#[derive(Error, Debug)]
pub enum Error {
    /// Edit sequence is not contiguous.
    #[error("Edit at project position {position} is not contiguous (expected {expected})")]
    EditNotContiguous { position: i64, expected: i64 },

    /// Keyframe positions are out of order.
    #[error("Keyframe at position {0} is out of order")]
    KeyframeOutOfOrder(i64),

    /// Channel index beyond the track's channel count.
    #[error("Channel {channel} out of range (track has {channels})")]
    ChannelOutOfRange { channel: usize, channels: usize },

    /// Unknown parameter kind tag while deserializing.
    #[error("Unknown parameter tag: {0}")]
    UnknownParamTag(String),
}

/// Result type alias.
pub type Result<T> = core::result::Result<T, Error>;
