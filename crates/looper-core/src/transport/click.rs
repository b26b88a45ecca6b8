//! Metronome click settings and the click events handed to the sink.

use crate::{Error, Result};
use serde::{Deserialize, Serialize};

/// One audible metronome "bip": a short tone starting at `time`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Click {
    pub time: f64,
    pub frequency: f32,
    pub duration: f64,
    pub gain: f32,
    pub accent: bool,
}

impl Click {
    #[inline]
    pub fn end(&self) -> f64 {
        self.time + self.duration
    }
}

/// Click-specific settings (pitch of accented and normal beats, length, gain).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClickSettings {
    pub accent_hz: f32,
    pub normal_hz: f32,
    pub length: f64,
    pub gain: f32,
}

impl Default for ClickSettings {
    fn default() -> Self {
        Self {
            accent_hz: 440.0,
            normal_hz: 220.0,
            length: 0.05,
            gain: 1.0,
        }
    }
}

impl ClickSettings {
    pub fn validate(&self) -> Result<()> {
        if self.accent_hz <= 0.0 || self.normal_hz <= 0.0 {
            return Err(Error::InvalidConfig(format!(
                "click frequencies must be positive (accent={}, normal={})",
                self.accent_hz, self.normal_hz
            )));
        }
        if self.length <= 0.0 {
            return Err(Error::InvalidConfig(format!(
                "click length {} must be positive",
                self.length
            )));
        }
        Ok(())
    }

    pub fn set_gain(&mut self, gain: f32) {
        self.gain = gain.clamp(0.0, 1.0);
    }

    pub fn click_at(&self, time: f64, accent: bool) -> Click {
        Click {
            time,
            frequency: if accent { self.accent_hz } else { self.normal_hz },
            duration: self.length,
            gain: self.gain,
            accent,
        }
    }
}
