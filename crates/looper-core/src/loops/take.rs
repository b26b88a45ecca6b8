//! One recorded pass of a loop.

use crate::AudioBuffer;
use std::sync::Arc;

/// A take slot.
///
/// `Pending` is a pass that has been opened but has not received audio yet.
/// A `Recorded` buffer only grows while it is the loop's current take and is
/// immutable afterwards; playback instances hold their own `Arc`, so growing
/// a take never alters audio that is already scheduled.
#[derive(Debug, Clone, Default)]
pub enum Take {
    #[default]
    Pending,
    Recorded(Arc<AudioBuffer>),
}

impl Take {
    /// Length in seconds; a pending take is zero-length.
    pub fn duration(&self) -> f64 {
        match self {
            Take::Pending => 0.0,
            Take::Recorded(buffer) => buffer.duration(),
        }
    }

    pub fn is_recorded(&self) -> bool {
        matches!(self, Take::Recorded(_))
    }

    pub fn buffer(&self) -> Option<&Arc<AudioBuffer>> {
        match self {
            Take::Pending => None,
            Take::Recorded(buffer) => Some(buffer),
        }
    }
}
