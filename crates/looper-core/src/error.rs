//! Error types for looper-core.

use crate::loops::LoopId;
use thiserror::Error;

/// Error type for looper-core operations.
///
/// Invalid tempo and beats-per-bar values are not errors: tempo is clamped and
/// an unsupported beats-per-bar value leaves the previous one in place.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum Error {
    #[error("Metronome already running")]
    AlreadyRunning,

    #[error("Invalid loop state: {0} already holds takes, its beats can no longer change")]
    InvalidLoopState(LoopId),

    #[error("Channel mismatch: cannot concatenate a buffer with zero channels")]
    ChannelMismatch,

    #[error("Invalid beats value: {0}. Must be one of 1, 2, 4, 8, 16, 32")]
    InvalidBeats(u32),

    #[error("Unknown loop: {0}")]
    UnknownLoop(LoopId),

    #[error("Recorder busy: {0} is already recording")]
    RecorderBusy(LoopId),

    #[error("Invalid config: {0}")]
    InvalidConfig(String),
}

/// Result type alias.
pub type Result<T> = core::result::Result<T, Error>;
