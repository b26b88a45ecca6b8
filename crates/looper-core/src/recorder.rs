//! Input capture: routes delivered frames into the loop being recorded.

use crate::loops::{LoopId, LoopRegistry};
use crate::{AudioBuffer, Result};

/// What happened to one delivered frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FrameOutcome {
    /// Not recording, or the target loop is still gated.
    Ignored,
    Written,
    /// Written, and the take reached the loop length so a new take opened.
    RolledOver,
}

/// Session-wide capture slot. Bound to at most one loop at a time.
#[derive(Debug, Default)]
pub struct Recorder {
    recording: bool,
    target: Option<LoopId>,
}

impl Recorder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Bind frame delivery to `target`. Calling it again just rebinds.
    pub fn start(&mut self, target: LoopId) {
        if !self.recording {
            tracing::debug!(loop_id = %target, "Recorder attached");
        }
        self.recording = true;
        self.target = Some(target);
    }

    /// Detach frame delivery. Safe to call when stopped.
    pub fn stop(&mut self) {
        if let Some(target) = self.target.take() {
            tracing::debug!(loop_id = %target, "Recorder detached");
        }
        self.recording = false;
    }

    pub fn is_recording(&self) -> bool {
        self.recording
    }

    pub fn target(&self) -> Option<LoopId> {
        self.target
    }

    /// Append `frame` to the target loop's current take.
    ///
    /// Frames arriving after a stop, or before the loop's record gate opened,
    /// are dropped without error.
    pub fn on_frame(&mut self, frame: &AudioBuffer, loops: &mut LoopRegistry) -> Result<FrameOutcome> {
        if !self.recording {
            return Ok(FrameOutcome::Ignored);
        }
        let Some(lp) = self.target.and_then(|id| loops.get_mut(id)) else {
            return Ok(FrameOutcome::Ignored);
        };
        if !lp.is_recording() || lp.is_locked() {
            return Ok(FrameOutcome::Ignored);
        }

        if lp.write_frame(frame)? {
            Ok(FrameOutcome::RolledOver)
        } else {
            Ok(FrameOutcome::Written)
        }
    }

    /// Channel-wise concatenation of two captured buffers.
    ///
    /// See [`AudioBuffer::concatenate`].
    pub fn concatenate(a: &AudioBuffer, b: &AudioBuffer) -> Result<AudioBuffer> {
        AudioBuffer::concatenate(a, b)
    }
}
