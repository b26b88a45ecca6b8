//! Loop state machine types.

use serde::{Deserialize, Serialize};

/// Where a loop stands. `recording` and `playing` are independent flags; both
/// at once is an overdub.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum LoopState {
    #[default]
    Idle,
    Playing,
    Recording,
    PlayingAndRecording,
}

impl LoopState {
    pub fn from_flags(playing: bool, recording: bool) -> Self {
        match (playing, recording) {
            (false, false) => LoopState::Idle,
            (true, false) => LoopState::Playing,
            (false, true) => LoopState::Recording,
            (true, true) => LoopState::PlayingAndRecording,
        }
    }

    pub fn is_playing(self) -> bool {
        matches!(self, LoopState::Playing | LoopState::PlayingAndRecording)
    }

    pub fn is_recording(self) -> bool {
        matches!(self, LoopState::Recording | LoopState::PlayingAndRecording)
    }
}

/// What a control press on a loop did.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum LoopTransition {
    /// Nothing changed (e.g. an empty loop pressed while another records).
    None,
    StartedPlaying,
    /// Recording armed; audio is accepted from `gate_opens_at` on.
    StartedRecording { gate_opens_at: f64 },
    /// Recording finished; `take_kept` is false when the take was too short.
    StoppedRecording { take_kept: bool },
    /// Playback (and recording, if any) stopped.
    Stopped { take_kept: Option<bool> },
}
