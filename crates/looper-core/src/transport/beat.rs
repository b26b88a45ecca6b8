//! Beat events and the two strategies the metronome drives with them.

use super::click::Click;
use serde::{Deserialize, Serialize};

/// One dispatched beat of the grid.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Beat {
    /// Absolute clock time the beat sounds at.
    pub time: f64,
    /// 1-based beat number since the metronome started.
    pub num: u64,
    /// First beat of a bar.
    pub bar_start: bool,
}

/// Receives beats once their time has actually arrived (the draw callback).
pub trait BeatListener {
    fn on_beat(&mut self, beat: &Beat);
}

impl<F: FnMut(&Beat)> BeatListener for F {
    fn on_beat(&mut self, beat: &Beat) {
        self(beat)
    }
}

/// No-op listener for sessions without a visual surface.
impl BeatListener for () {
    fn on_beat(&mut self, _beat: &Beat) {}
}

/// Receives beats ahead of time, inside the lookahead window.
///
/// This is where audio is committed: loop playback for the beat and the
/// metronome click.
pub trait BeatScheduler {
    fn schedule_beat(&mut self, beat: &Beat);

    fn schedule_click(&mut self, click: Click);
}

/// `true` when `num` opens a group of `beats` beats.
///
/// A group of one beat starts on every beat.
#[inline]
pub fn opens_group(num: u64, beats: u32) -> bool {
    beats <= 1 || num % beats as u64 == 1
}
