//! Session context: one metronome, one loops registry, one recorder.
//!
//! Everything runs on the caller's thread. The owner drives three entry
//! points at their own cadence: [`LooperSession::tick`] (lookahead
//! scheduling), [`LooperSession::draw`] (beat delivery once due) and
//! [`LooperSession::deliver_frame`] (captured input). Control-surface calls
//! happen between them, never from inside one.

use crate::clock::Clock;
use crate::config::LooperConfig;
use crate::loops::{Loop, LoopId, LoopRegistry, LoopSettings, LoopState, LoopTransition};
use crate::recorder::{FrameOutcome, Recorder};
use crate::sink::{AudioSink, Destination};
use crate::transport::{Beat, BeatListener, BeatScheduler, Click, Metronome};
use crate::{AudioBuffer, Result};
use serde::{Deserialize, Serialize};

/// Feeds beats committed by the metronome into the registry and the sink.
struct BeatDispatch<'a, S: AudioSink + ?Sized> {
    loops: &'a mut LoopRegistry,
    sink: &'a mut S,
    now: f64,
}

impl<S: AudioSink + ?Sized> BeatScheduler for BeatDispatch<'_, S> {
    fn schedule_beat(&mut self, beat: &Beat) {
        self.loops
            .dispatch_playback_for_beat(beat, self.now, &mut *self.sink);
    }

    fn schedule_click(&mut self, click: Click) {
        self.sink.schedule_click(click);
    }
}

pub struct LooperSession<C: Clock, S: AudioSink, L: BeatListener> {
    config: LooperConfig,
    clock: C,
    sink: S,
    listener: L,
    metronome: Metronome,
    loops: LoopRegistry,
    recorder: Recorder,
}

impl<C: Clock, S: AudioSink, L: BeatListener> LooperSession<C, S, L> {
    /// Build a session from a validated config with its collaborators wired.
    pub fn new(config: LooperConfig, clock: C, sink: S, listener: L) -> Result<Self> {
        config.validate()?;
        let metronome = Metronome::new(&config);
        let loops = LoopRegistry::new(LoopSettings::from(&config));

        Ok(Self {
            config,
            clock,
            sink,
            listener,
            metronome,
            loops,
            recorder: Recorder::new(),
        })
    }

    pub fn config(&self) -> &LooperConfig {
        &self.config
    }

    pub fn now(&self) -> f64 {
        self.clock.now()
    }

    pub fn clock(&self) -> &C {
        &self.clock
    }

    pub fn sink(&self) -> &S {
        &self.sink
    }

    pub fn sink_mut(&mut self) -> &mut S {
        &mut self.sink
    }

    pub fn listener(&self) -> &L {
        &self.listener
    }

    pub fn listener_mut(&mut self) -> &mut L {
        &mut self.listener
    }

    pub fn metronome(&self) -> &Metronome {
        &self.metronome
    }

    pub fn loops(&self) -> &LoopRegistry {
        &self.loops
    }

    pub fn get_loop(&self, id: LoopId) -> Option<&Loop> {
        self.loops.get(id)
    }

    pub fn recorder(&self) -> &Recorder {
        &self.recorder
    }

    // =========================================================================
    // Transport
    // =========================================================================

    /// Clamp and apply a new tempo. Empty loops follow the new beat length.
    pub fn set_tempo(&mut self, bpm: u32) -> u32 {
        let tempo = self.metronome.set_tempo(bpm);
        self.loops.retime_empty(self.metronome.beat_duration());
        tracing::debug!(tempo, "Tempo set");
        tempo
    }

    /// Unsupported values are ignored. Returns the setting in effect.
    pub fn set_beats_per_bar(&mut self, beats: u32) -> u32 {
        self.metronome.set_beats_per_bar(beats)
    }

    /// Give every empty loop `beats` beats.
    pub fn apply_beats_to_empty_loops(&mut self, beats: u32) -> Result<usize> {
        self.loops
            .apply_beats_to_empty(beats, self.metronome.beat_duration())
    }

    pub fn mute(&mut self, muted: bool) {
        self.metronome.mute(muted);
    }

    pub fn toggle_mute(&mut self) -> bool {
        self.metronome.toggle_mute()
    }

    pub fn set_click_gain(&mut self, gain: f32) {
        self.metronome.set_click_gain(gain);
    }

    /// Start the beat grid at the current clock time and schedule the first
    /// lookahead window right away.
    pub fn start_metronome(&mut self) -> Result<()> {
        let now = self.clock.now();
        self.metronome.start(now)?;
        self.schedule_ahead(now);
        Ok(())
    }

    /// Stop the grid and forget every pending beat. Idempotent.
    pub fn stop_metronome(&mut self) {
        self.metronome.stop();
    }

    fn ensure_metronome(&mut self) -> Result<()> {
        if self.metronome.is_running() {
            return Ok(());
        }
        self.start_metronome()
    }

    // =========================================================================
    // Loops
    // =========================================================================

    /// New empty loop at the current beats-per-bar setting.
    pub fn add_loop(&mut self) -> LoopId {
        let id = self.loops.insert(
            self.metronome.beats_per_bar(),
            self.metronome.beat_duration(),
        );
        tracing::info!(loop_id = %id, "Loop added");
        id
    }

    pub fn add_loop_with_beats(&mut self, beats: u32) -> Result<LoopId> {
        let id = self.loops.add(beats, self.metronome.beat_duration())?;
        tracing::info!(loop_id = %id, beats, "Loop added");
        Ok(id)
    }

    /// Stop `id` and drop it from the session.
    pub fn remove_loop(&mut self, id: LoopId) -> Result<()> {
        self.stop_loop(id)?;
        self.loops.remove(id);
        tracing::info!(loop_id = %id, "Loop removed");
        Ok(())
    }

    pub fn set_loop_beats(&mut self, id: LoopId, beats: u32) -> Result<u32> {
        let beat_duration = self.metronome.beat_duration();
        self.loops.require_mut(id)?.set_beats(beats, beat_duration)
    }

    pub fn set_loop_destination(&mut self, id: LoopId, destination: Destination) -> Result<()> {
        self.loops.require_mut(id)?.set_destination(destination);
        Ok(())
    }

    /// The single control press on a loop.
    ///
    /// While another loop records, a press only brings a recorded loop into
    /// playback; pressing the recording loop finishes its take. Otherwise the
    /// first press on a stopped loop starts playback (and the metronome), and
    /// the next press (or the first one on an empty loop) arms a recording
    /// that starts on the loop's next bar boundary.
    pub fn action(&mut self, id: LoopId) -> Result<LoopTransition> {
        self.fire_due_timers(self.clock.now());

        if let Some(current) = self.loops.current_recording() {
            if current == id {
                let take_kept = self.finish_recording(id)?;
                return Ok(LoopTransition::StoppedRecording { take_kept });
            }
            let lp = self.loops.require_mut(id)?;
            if lp.is_empty() || lp.is_playing() {
                return Ok(LoopTransition::None);
            }
            lp.begin_playing();
            self.ensure_metronome()?;
            tracing::info!(loop_id = %id, "Loop playing");
            return Ok(LoopTransition::StartedPlaying);
        }

        let lp = self.loops.require_mut(id)?;
        if !lp.is_playing() {
            lp.begin_playing();
            let has_takes = !lp.is_empty();
            self.ensure_metronome()?;
            if has_takes {
                tracing::info!(loop_id = %id, "Loop playing");
                return Ok(LoopTransition::StartedPlaying);
            }
        }

        self.begin_recording(id)
    }

    /// Stop recording (keeping or discarding the take) and playback of `id`.
    ///
    /// The metronome stops with the last playing loop.
    pub fn stop_loop(&mut self, id: LoopId) -> Result<LoopTransition> {
        self.fire_due_timers(self.clock.now());

        let lp = self.loops.require_mut(id)?;
        let take_kept = if lp.is_recording() {
            Some(self.finish_recording(id)?)
        } else {
            None
        };

        let lp = self.loops.require_mut(id)?;
        if lp.is_playing() {
            lp.halt_playback(&mut self.sink);
            tracing::info!(loop_id = %id, "Loop stopped");
        }

        if !self.loops.is_any_playing() {
            self.metronome.stop();
        }
        Ok(LoopTransition::Stopped { take_kept })
    }

    fn begin_recording(&mut self, id: LoopId) -> Result<LoopTransition> {
        self.loops.set_current_recording(id)?;
        let now = self.clock.now();

        let lp = self.loops.require_mut(id)?;
        let opens_at = self.metronome.next_bar_boundary(lp.beats());
        lp.begin_recording(opens_at);
        self.recorder.start(id);
        tracing::info!(
            loop_id = %id,
            opens_at,
            delay = (opens_at - now).max(0.0),
            "Recording armed"
        );

        // A boundary already behind the clock opens at once.
        self.fire_due_timers(now);
        Ok(LoopTransition::StartedRecording {
            gate_opens_at: opens_at,
        })
    }

    fn finish_recording(&mut self, id: LoopId) -> Result<bool> {
        let lp = self.loops.require_mut(id)?;
        let kept = lp.finish_recording();
        let takes = lp.takes().len();

        if self.loops.current_recording() == Some(id) {
            self.loops.clear_current_recording();
            self.recorder.stop();
        }
        tracing::info!(loop_id = %id, kept, takes, "Recording finished");
        Ok(kept)
    }

    // =========================================================================
    // Cooperative entry points
    // =========================================================================

    /// Lookahead pass: commit every beat inside the scheduling window.
    ///
    /// Returns how many beats were scheduled.
    pub fn tick(&mut self) -> usize {
        let now = self.clock.now();
        self.fire_due_timers(now);
        self.schedule_ahead(now)
    }

    /// Draw pass: hand every beat whose time has come to the listener.
    pub fn draw(&mut self) -> usize {
        let now = self.clock.now();
        self.fire_due_timers(now);
        self.metronome.drain_due(now, &mut self.listener)
    }

    /// Feed one captured input frame to the recorder.
    pub fn deliver_frame(&mut self, frame: &AudioBuffer) -> Result<FrameOutcome> {
        self.fire_due_timers(self.clock.now());
        self.recorder.on_frame(frame, &mut self.loops)
    }

    /// Open the record gate of the recording loop once its boundary is
    /// reached. Returns true when a gate opened.
    pub fn fire_due_timers(&mut self, now: f64) -> bool {
        let Some(lp) = self.loops.current_recording_loop_mut() else {
            return false;
        };
        if lp.open_gate_if_due(now) {
            tracing::debug!(loop_id = %lp.id(), now, "Record gate opened");
            return true;
        }
        false
    }

    fn schedule_ahead(&mut self, now: f64) -> usize {
        let mut dispatch = BeatDispatch {
            loops: &mut self.loops,
            sink: &mut self.sink,
            now,
        };
        self.metronome.tick(now, &mut dispatch)
    }

    // =========================================================================
    // Snapshot
    // =========================================================================

    pub fn snapshot(&self) -> SessionSnapshot {
        SessionSnapshot {
            time: self.clock.now(),
            tempo: self.metronome.tempo(),
            beats_per_bar: self.metronome.beats_per_bar(),
            beat_duration: self.metronome.beat_duration(),
            running: self.metronome.is_running(),
            muted: self.metronome.is_muted(),
            beats_count: self.metronome.beats_count(),
            recording: self.loops.current_recording(),
            loops: self.loops.iter().map(LoopSnapshot::from).collect(),
        }
    }
}

/// Serializable view of a session, for status displays and logs.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionSnapshot {
    pub time: f64,
    pub tempo: u32,
    pub beats_per_bar: u32,
    pub beat_duration: f64,
    pub running: bool,
    pub muted: bool,
    pub beats_count: u64,
    pub recording: Option<LoopId>,
    pub loops: Vec<LoopSnapshot>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LoopSnapshot {
    pub id: LoopId,
    pub beats: u32,
    pub duration: f64,
    pub state: LoopState,
    /// Seconds of audio per take; a pending take shows as 0.
    pub takes: Vec<f64>,
    pub locked: bool,
    pub destination: Destination,
}

impl From<&Loop> for LoopSnapshot {
    fn from(lp: &Loop) -> Self {
        Self {
            id: lp.id(),
            beats: lp.beats(),
            duration: lp.duration(),
            state: lp.state(),
            takes: lp.takes().iter().map(|take| take.duration()).collect(),
            locked: lp.is_locked(),
            destination: lp.destination(),
        }
    }
}
