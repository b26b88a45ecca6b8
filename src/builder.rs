//! Builder for configuring and constructing a `LooperEngine`.

use crate::core::{AudioSink, BeatListener, LooperConfig, NullSink};
use crate::{LooperEngine, Result};

/// Starts from [`LooperConfig::default`]; individual setters override single
/// fields, [`config`](Self::config) replaces the whole table.
///
/// # Example
///
/// ```ignore
/// use looper::prelude::*;
///
/// let engine = LooperEngine::builder()
///     .tempo(120)
///     .beats_per_bar(4)
///     .build()?;
///
/// let id = engine.handle().add_loop()?;
/// engine.handle().action(id)?;
/// ```
#[derive(Debug, Clone, Default)]
pub struct LooperEngineBuilder {
    config: LooperConfig,
}

impl LooperEngineBuilder {
    /// Default: 90 BPM. Clamped to [20, 220].
    pub fn tempo(mut self, bpm: u32) -> Self {
        self.config.tempo = bpm;
        self
    }

    /// Default: 4
    pub fn beats_per_bar(mut self, beats: u32) -> Self {
        self.config.beats_per_bar = beats;
        self
    }

    pub fn muted(mut self, muted: bool) -> Self {
        self.config.muted = muted;
        self
    }

    pub fn config(mut self, config: LooperConfig) -> Self {
        self.config = config;
        self
    }

    /// Engine that schedules into a [`NullSink`] and draws nowhere.
    pub fn build(self) -> Result<LooperEngine> {
        self.build_with(NullSink::default(), ())
    }

    /// Engine with the output sink and draw listener wired in.
    pub fn build_with<S, L>(self, sink: S, listener: L) -> Result<LooperEngine>
    where
        S: AudioSink + Send + 'static,
        L: BeatListener + Send + 'static,
    {
        LooperEngine::spawn(self.config, sink, listener)
    }
}
