//! A single looped phrase: its takes and its record/play state.

use super::state::LoopState;
use super::take::Take;
use super::LoopId;
use crate::config::{is_allowed_beats, LooperConfig};
use crate::sink::{AudioSink, Destination, SourceId};
use crate::{AudioBuffer, Error, Result};
use std::sync::Arc;

/// Per-loop timing thresholds, taken from [`LooperConfig`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LoopSettings {
    pub min_take_duration: f64,
    pub frame_epsilon: f64,
    pub playback_retention: f64,
}

impl From<&LooperConfig> for LoopSettings {
    fn from(config: &LooperConfig) -> Self {
        Self {
            min_take_duration: config.min_take_duration,
            frame_epsilon: config.frame_epsilon,
            playback_retention: config.playback_retention,
        }
    }
}

impl Default for LoopSettings {
    fn default() -> Self {
        Self::from(&LooperConfig::default())
    }
}

/// A playback instance this loop started and may still have to cancel.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScheduledPlayback {
    pub time: f64,
    pub source: SourceId,
    pub destination: Destination,
}

/// Quantized record-start gate: audio is refused until the clock reaches
/// `opens_at`.
#[derive(Debug, Clone, Copy, PartialEq)]
struct RecordGate {
    opens_at: f64,
}

pub struct Loop {
    id: LoopId,
    beats: u32,
    duration: f64,
    takes: Vec<Take>,
    current_take: Option<usize>,
    playing: bool,
    recording: bool,
    locked: bool,
    gate: Option<RecordGate>,
    scheduled: Vec<ScheduledPlayback>,
    destination: Destination,
    settings: LoopSettings,
}

impl Loop {
    pub(crate) fn new(
        id: LoopId,
        beats: u32,
        beat_duration: f64,
        destination: Destination,
        settings: LoopSettings,
    ) -> Self {
        Self {
            id,
            beats,
            duration: beats as f64 * beat_duration,
            takes: Vec::new(),
            current_take: None,
            playing: false,
            recording: false,
            locked: true,
            gate: None,
            scheduled: Vec::new(),
            destination,
            settings,
        }
    }

    pub fn id(&self) -> LoopId {
        self.id
    }

    pub fn beats(&self) -> u32 {
        self.beats
    }

    /// Loop length in seconds.
    pub fn duration(&self) -> f64 {
        self.duration
    }

    pub fn takes(&self) -> &[Take] {
        &self.takes
    }

    pub fn current_take_index(&self) -> Option<usize> {
        self.current_take
    }

    pub fn current_take(&self) -> Option<&Take> {
        self.current_take.and_then(|index| self.takes.get(index))
    }

    pub fn is_empty(&self) -> bool {
        self.takes.is_empty()
    }

    pub fn is_playing(&self) -> bool {
        self.playing
    }

    pub fn is_recording(&self) -> bool {
        self.recording
    }

    /// Recording on top of at least one earlier take.
    pub fn is_overdubbing(&self) -> bool {
        self.recording && self.takes.len() > 1
    }

    pub fn is_locked(&self) -> bool {
        self.locked
    }

    /// When the pending record-start gate opens, if one is armed.
    pub fn gate_opens_at(&self) -> Option<f64> {
        self.gate.map(|gate| gate.opens_at)
    }

    pub fn state(&self) -> LoopState {
        LoopState::from_flags(self.playing, self.recording)
    }

    pub fn destination(&self) -> Destination {
        self.destination
    }

    /// Route future playback instances to `destination`.
    pub fn set_destination(&mut self, destination: Destination) {
        self.destination = destination;
    }

    pub fn scheduled(&self) -> &[ScheduledPlayback] {
        &self.scheduled
    }

    /// Change the loop length. Only allowed while the loop holds no take.
    pub fn set_beats(&mut self, beats: u32, beat_duration: f64) -> Result<u32> {
        if !self.is_empty() {
            return Err(Error::InvalidLoopState(self.id));
        }
        if !is_allowed_beats(beats) {
            return Err(Error::InvalidBeats(beats));
        }
        self.beats = beats;
        self.duration = beats as f64 * beat_duration;
        Ok(self.beats)
    }

    /// Follow a tempo change; a loop that already holds audio keeps its length.
    pub(crate) fn retime(&mut self, beat_duration: f64) {
        if self.is_empty() {
            self.duration = self.beats as f64 * beat_duration;
        }
    }

    /// 1-based position of beat `num` inside this loop.
    pub fn beat_in_loop(&self, num: u64) -> u32 {
        match (num % self.beats.max(1) as u64) as u32 {
            0 => self.beats.max(1),
            position => position,
        }
    }

    fn increment_take(&mut self) {
        self.current_take = Some(self.takes.len());
        self.takes.push(Take::Pending);
    }

    pub(crate) fn begin_playing(&mut self) {
        self.playing = true;
    }

    /// Open a new take and lock it until `opens_at`.
    pub(crate) fn begin_recording(&mut self, opens_at: f64) {
        self.increment_take();
        self.gate = Some(RecordGate { opens_at });
        self.locked = true;
        self.recording = true;
    }

    /// Open the record gate if its time has come. Returns true when it opened.
    pub(crate) fn open_gate_if_due(&mut self, now: f64) -> bool {
        match self.gate {
            Some(gate) if now >= gate.opens_at => {
                self.gate = None;
                self.locked = false;
                true
            }
            _ => false,
        }
    }

    /// Stop recording and drop the current take if it is shorter than the
    /// minimum take length. Returns whether the take was kept.
    pub(crate) fn finish_recording(&mut self) -> bool {
        self.gate = None;
        self.recording = false;
        self.locked = true;

        let Some(index) = self.current_take else {
            return false;
        };
        let too_short = self
            .takes
            .get(index)
            .is_some_and(|take| take.duration() < self.settings.min_take_duration);

        if too_short {
            self.takes.truncate(index);
            self.current_take = index.checked_sub(1);
            false
        } else {
            true
        }
    }

    /// Append a captured frame to the current take.
    ///
    /// Once the take is within one frame quantum of the loop length a fresh
    /// take is opened, so the next pass overdubs on top. Returns true on such
    /// a rollover.
    pub(crate) fn write_frame(&mut self, frame: &AudioBuffer) -> Result<bool> {
        if frame.num_channels() == 0 {
            return Err(Error::ChannelMismatch);
        }
        let Some(take) = self.current_take.and_then(|index| self.takes.get_mut(index)) else {
            return Ok(false);
        };

        let length = match take {
            Take::Pending => {
                *take = Take::Recorded(Arc::new(frame.clone()));
                frame.duration()
            }
            Take::Recorded(buffer) => {
                let buffer = Arc::make_mut(buffer);
                buffer.append(frame)?;
                buffer.duration()
            }
        };

        if length > self.duration - self.settings.frame_epsilon {
            self.increment_take();
            tracing::debug!(loop_id = %self.id, takes = self.takes.len(), "Take rolled over");
            return Ok(true);
        }
        Ok(false)
    }

    /// Schedule every recorded take to start at `time`.
    ///
    /// Handles older than the retention window are forgotten first; they have
    /// finished playing. Returns how many playback instances were started.
    pub fn play<S: AudioSink + ?Sized>(&mut self, time: f64, now: f64, sink: &mut S) -> usize {
        let horizon = now - self.settings.playback_retention;
        self.scheduled.retain(|playback| playback.time >= horizon);

        let mut started = 0;
        for take in &self.takes {
            let Take::Recorded(buffer) = take else {
                continue;
            };
            let source = sink.create_playback_source(Arc::clone(buffer));
            sink.connect(source, self.destination);
            sink.schedule_playback(source, time);
            self.scheduled.push(ScheduledPlayback {
                time,
                source,
                destination: self.destination,
            });
            started += 1;
        }
        started
    }

    /// Cancel every in-flight playback instance and stop playing.
    pub(crate) fn halt_playback<S: AudioSink + ?Sized>(&mut self, sink: &mut S) {
        for playback in self.scheduled.drain(..) {
            sink.stop(playback.source);
            sink.disconnect(playback.source, playback.destination);
        }
        self.playing = false;
    }
}
