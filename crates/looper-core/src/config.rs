//! Looper configuration.

use crate::transport::ClickSettings;
use crate::{Error, Result};
use serde::{Deserialize, Serialize};

/// Slowest accepted tempo in BPM.
pub const MIN_TEMPO: u32 = 20;

/// Fastest accepted tempo in BPM.
pub const MAX_TEMPO: u32 = 220;

/// Beats-per-bar (and beats-per-loop) values the engine accepts.
pub const ALLOWED_BEATS: [u32; 6] = [1, 2, 4, 8, 16, 32];

pub const DEFAULT_TEMPO: u32 = 90;
pub const DEFAULT_BEATS_PER_BAR: u32 = 4;

/// Scheduling window of the lookahead tick, in seconds.
pub const LOOKAHEAD: f64 = 0.1;

/// Wall-clock interval between two lookahead ticks.
pub const TICK_INTERVAL_MS: u64 = 25;

/// Wall-clock interval between two draw passes (~60 Hz).
pub const DRAW_INTERVAL_MS: u64 = 16;

/// Takes shorter than this are treated as accidental taps.
pub const MIN_TAKE_DURATION: f64 = 0.7;

/// One audio-frame-delivery quantum, used as the rollover tolerance.
pub const FRAME_EPSILON: f64 = 0.025;

/// Scheduled playback handles older than this are considered finished.
pub const PLAYBACK_RETENTION: f64 = 0.1;

#[inline]
pub fn is_allowed_beats(beats: u32) -> bool {
    ALLOWED_BEATS.contains(&beats)
}

/// Configuration for a looper session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LooperConfig {
    pub tempo: u32,
    pub beats_per_bar: u32,
    pub muted: bool,
    pub lookahead: f64,
    pub tick_interval_ms: u64,
    pub draw_interval_ms: u64,
    pub min_take_duration: f64,
    pub frame_epsilon: f64,
    pub playback_retention: f64,
    pub click: ClickSettings,
}

impl Default for LooperConfig {
    fn default() -> Self {
        Self {
            tempo: DEFAULT_TEMPO,
            beats_per_bar: DEFAULT_BEATS_PER_BAR,
            muted: false,
            lookahead: LOOKAHEAD,
            tick_interval_ms: TICK_INTERVAL_MS,
            draw_interval_ms: DRAW_INTERVAL_MS,
            min_take_duration: MIN_TAKE_DURATION,
            frame_epsilon: FRAME_EPSILON,
            playback_retention: PLAYBACK_RETENTION,
            click: ClickSettings::default(),
        }
    }
}

impl LooperConfig {
    pub fn validate(&self) -> Result<()> {
        if !is_allowed_beats(self.beats_per_bar) {
            return Err(Error::InvalidConfig(format!(
                "beats_per_bar {} not in {:?}",
                self.beats_per_bar, ALLOWED_BEATS
            )));
        }
        if self.lookahead.is_nan() || self.lookahead <= 0.0 {
            return Err(Error::InvalidConfig(format!(
                "lookahead {} must be positive",
                self.lookahead
            )));
        }
        if self.tick_interval_ms == 0 || self.tick_interval_ms as f64 / 1000.0 >= self.lookahead {
            return Err(Error::InvalidConfig(format!(
                "tick_interval_ms {} must be non-zero and shorter than the lookahead ({}s)",
                self.tick_interval_ms, self.lookahead
            )));
        }
        if self.draw_interval_ms == 0 {
            return Err(Error::InvalidConfig("draw_interval_ms must be non-zero".into()));
        }
        if self.min_take_duration < 0.0 || self.frame_epsilon < 0.0 || self.playback_retention < 0.0
        {
            return Err(Error::InvalidConfig("durations must be non-negative".into()));
        }
        self.click.validate()
    }

    /// Interval between lookahead ticks, in seconds.
    pub fn tick_interval(&self) -> f64 {
        self.tick_interval_ms as f64 / 1000.0
    }
}
