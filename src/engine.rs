//! LooperEngine: a looper session running on its own scheduler thread.
//!
//! The session itself is single-threaded. The scheduler thread owns it and
//! interleaves the three cooperative callbacks (lookahead tick, draw, frame
//! delivery) with commands from any number of [`LooperHandle`]s, so no call
//! ever runs inside another.

use crate::core::{
    AudioBuffer, AudioSink, BeatListener, Destination, LoopId, LoopTransition,
    LooperConfig, LooperSession, SessionSnapshot, SystemClock,
};
use crate::{Error, Result};
use crossbeam_channel::{bounded, select, Receiver, Sender, TrySendError};
use parking_lot::Mutex;
use std::sync::atomic::{AtomicBool, AtomicU32, AtomicU64, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

const COMMAND_CAPACITY: usize = 64;
const FRAME_CAPACITY: usize = 256;

type Reply<T> = Sender<looper_core::Result<T>>;

pub(crate) enum Command {
    AddLoop { beats: Option<u32>, reply: Reply<LoopId> },
    RemoveLoop { id: LoopId, reply: Reply<()> },
    Action { id: LoopId, reply: Reply<LoopTransition> },
    StopLoop { id: LoopId, reply: Reply<LoopTransition> },
    SetLoopBeats { id: LoopId, beats: u32, reply: Reply<u32> },
    SetLoopDestination { id: LoopId, destination: Destination, reply: Reply<()> },
    ApplyBeatsToEmpty { beats: u32, reply: Reply<usize> },
    SetTempo { bpm: u32, reply: Sender<u32> },
    SetBeatsPerBar { beats: u32, reply: Sender<u32> },
    Mute(bool),
    ToggleMute { reply: Sender<bool> },
    SetClickGain(f32),
    StartMetronome { reply: Reply<()> },
    StopMetronome,
    Snapshot { reply: Sender<SessionSnapshot> },
    Shutdown,
}

/// Transport state published by the scheduler thread after every pass.
#[derive(Debug)]
pub struct EngineStatus {
    running: AtomicBool,
    beats_count: AtomicU64,
    tempo: AtomicU32,
    dropped_frames: AtomicU64,
}

impl EngineStatus {
    fn new(config: &LooperConfig) -> Self {
        Self {
            running: AtomicBool::new(false),
            beats_count: AtomicU64::new(0),
            tempo: AtomicU32::new(config.tempo),
            dropped_frames: AtomicU64::new(0),
        }
    }

    fn publish<S: AudioSink, L: BeatListener>(&self, session: &LooperSession<SystemClock, S, L>) {
        let metronome = session.metronome();
        self.running.store(metronome.is_running(), Ordering::Release);
        self.beats_count
            .store(metronome.beats_count(), Ordering::Release);
        self.tempo.store(metronome.tempo(), Ordering::Release);
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::Acquire)
    }

    pub fn beats_count(&self) -> u64 {
        self.beats_count.load(Ordering::Acquire)
    }

    pub fn tempo(&self) -> u32 {
        self.tempo.load(Ordering::Acquire)
    }

    /// Input frames discarded because the frame queue was full.
    pub fn dropped_frames(&self) -> u64 {
        self.dropped_frames.load(Ordering::Relaxed)
    }
}

/// Cloneable control surface of a running engine.
///
/// Every call is forwarded to the scheduler thread; calls that can fail or
/// return a value wait for its reply.
#[derive(Clone)]
pub struct LooperHandle {
    command_tx: Sender<Command>,
    frame_tx: Sender<AudioBuffer>,
    status: Arc<EngineStatus>,
}

impl LooperHandle {
    fn send(&self, command: Command) -> Result<()> {
        self.command_tx
            .send(command)
            .map_err(|_| Error::EngineStopped)
    }

    fn request<T>(&self, make: impl FnOnce(Sender<T>) -> Command) -> Result<T> {
        let (reply_tx, reply_rx) = bounded(1);
        self.send(make(reply_tx))?;
        reply_rx.recv().map_err(|_| Error::EngineStopped)
    }

    /// New empty loop at the current beats-per-bar setting.
    pub fn add_loop(&self) -> Result<LoopId> {
        Ok(self.request(|reply| Command::AddLoop { beats: None, reply })??)
    }

    pub fn add_loop_with_beats(&self, beats: u32) -> Result<LoopId> {
        Ok(self.request(|reply| Command::AddLoop {
            beats: Some(beats),
            reply,
        })??)
    }

    pub fn remove_loop(&self, id: LoopId) -> Result<()> {
        Ok(self.request(|reply| Command::RemoveLoop { id, reply })??)
    }

    /// The single control press on a loop.
    pub fn action(&self, id: LoopId) -> Result<LoopTransition> {
        Ok(self.request(|reply| Command::Action { id, reply })??)
    }

    pub fn stop_loop(&self, id: LoopId) -> Result<LoopTransition> {
        Ok(self.request(|reply| Command::StopLoop { id, reply })??)
    }

    pub fn set_loop_beats(&self, id: LoopId, beats: u32) -> Result<u32> {
        Ok(self.request(|reply| Command::SetLoopBeats { id, beats, reply })??)
    }

    pub fn set_loop_destination(&self, id: LoopId, destination: Destination) -> Result<()> {
        Ok(self.request(|reply| Command::SetLoopDestination {
            id,
            destination,
            reply,
        })??)
    }

    pub fn apply_beats_to_empty_loops(&self, beats: u32) -> Result<usize> {
        Ok(self.request(|reply| Command::ApplyBeatsToEmpty { beats, reply })??)
    }

    /// Returns the tempo actually applied.
    pub fn set_tempo(&self, bpm: u32) -> Result<u32> {
        self.request(|reply| Command::SetTempo { bpm, reply })
    }

    /// Returns the setting in effect; unsupported values are ignored.
    pub fn set_beats_per_bar(&self, beats: u32) -> Result<u32> {
        self.request(|reply| Command::SetBeatsPerBar { beats, reply })
    }

    pub fn mute(&self, muted: bool) -> Result<()> {
        self.send(Command::Mute(muted))
    }

    pub fn toggle_mute(&self) -> Result<bool> {
        self.request(|reply| Command::ToggleMute { reply })
    }

    pub fn set_click_gain(&self, gain: f32) -> Result<()> {
        self.send(Command::SetClickGain(gain))
    }

    pub fn start_metronome(&self) -> Result<()> {
        Ok(self.request(|reply| Command::StartMetronome { reply })??)
    }

    pub fn stop_metronome(&self) -> Result<()> {
        self.send(Command::StopMetronome)
    }

    pub fn snapshot(&self) -> Result<SessionSnapshot> {
        self.request(|reply| Command::Snapshot { reply })
    }

    /// Queue one captured input frame without blocking.
    ///
    /// Safe to call from an audio input callback. When the scheduler thread
    /// falls behind and the queue is full, the frame is dropped and counted in
    /// [`EngineStatus::dropped_frames`].
    pub fn deliver_frame(&self, frame: AudioBuffer) -> Result<()> {
        match self.frame_tx.try_send(frame) {
            Ok(()) => Ok(()),
            Err(TrySendError::Full(_)) => {
                let dropped = self.status.dropped_frames.fetch_add(1, Ordering::Relaxed) + 1;
                tracing::warn!(dropped, "Frame queue full, input frame dropped");
                Ok(())
            }
            Err(TrySendError::Disconnected(_)) => Err(Error::EngineStopped),
        }
    }

    pub fn status(&self) -> &EngineStatus {
        &self.status
    }
}

/// Looper running on a dedicated scheduler thread.
///
/// The thread stops on [`shutdown`](Self::shutdown) or when the engine is
/// dropped.
///
/// # Example
///
/// ```ignore
/// use looper::prelude::*;
///
/// let engine = LooperEngine::builder().tempo(100).build()?;
/// let looper = engine.handle();
///
/// let id = looper.add_loop()?;
/// looper.action(id)?; // metronome starts, recording arms on the next bar
///
/// // From the input callback: never blocks, drops the frame if the queue is full.
/// looper.deliver_frame(frame)?;
/// ```
pub struct LooperEngine {
    handle: LooperHandle,
    shutdown: Arc<AtomicBool>,
    thread_handle: Mutex<Option<JoinHandle<()>>>,
}

impl LooperEngine {
    /// Create a new engine builder
    pub fn builder() -> crate::LooperEngineBuilder {
        crate::LooperEngineBuilder::default()
    }

    pub(crate) fn spawn<S, L>(config: LooperConfig, sink: S, listener: L) -> Result<Self>
    where
        S: AudioSink + Send + 'static,
        L: BeatListener + Send + 'static,
    {
        let status = Arc::new(EngineStatus::new(&config));
        let session = LooperSession::new(config, SystemClock::new(), sink, listener)?;

        let (command_tx, command_rx) = bounded(COMMAND_CAPACITY);
        let (frame_tx, frame_rx) = bounded(FRAME_CAPACITY);
        let shutdown = Arc::new(AtomicBool::new(false));

        let runner = Runner {
            session,
            commands: command_rx,
            frames: frame_rx,
            status: Arc::clone(&status),
            shutdown: Arc::clone(&shutdown),
        };
        let thread_handle = thread::Builder::new()
            .name("looper-scheduler".into())
            .spawn(move || runner.run())?;

        tracing::info!("Looper engine started");
        Ok(Self {
            handle: LooperHandle {
                command_tx,
                frame_tx,
                status,
            },
            shutdown,
            thread_handle: Mutex::new(Some(thread_handle)),
        })
    }

    pub fn handle(&self) -> &LooperHandle {
        &self.handle
    }

    pub fn is_running(&self) -> bool {
        self.handle.status.is_running()
    }

    pub fn beats_count(&self) -> u64 {
        self.handle.status.beats_count()
    }

    pub fn tempo(&self) -> u32 {
        self.handle.status.tempo()
    }

    /// Stop the scheduler thread and wait for it. Idempotent.
    pub fn shutdown(&self) {
        self.shutdown.store(true, Ordering::Release);
        let _ = self.handle.command_tx.try_send(Command::Shutdown);

        if let Some(handle) = self.thread_handle.lock().take() {
            let _ = handle.join();
            tracing::info!("Looper engine stopped");
        }
    }
}

impl Drop for LooperEngine {
    fn drop(&mut self) {
        self.shutdown();
    }
}

/// Scheduler thread state.
struct Runner<S: AudioSink, L: BeatListener> {
    session: LooperSession<SystemClock, S, L>,
    commands: Receiver<Command>,
    frames: Receiver<AudioBuffer>,
    status: Arc<EngineStatus>,
    shutdown: Arc<AtomicBool>,
}

impl<S: AudioSink, L: BeatListener> Runner<S, L> {
    fn run(mut self) {
        let tick_every = Duration::from_millis(self.session.config().tick_interval_ms);
        let draw_every = Duration::from_millis(self.session.config().draw_interval_ms);
        let commands = self.commands.clone();
        let frames = self.frames.clone();
        let mut next_tick = Instant::now();
        let mut next_draw = Instant::now();

        loop {
            if self.shutdown.load(Ordering::Acquire) {
                break;
            }

            let timeout = next_tick
                .min(next_draw)
                .saturating_duration_since(Instant::now());

            select! {
                recv(commands) -> msg => match msg {
                    Ok(Command::Shutdown) | Err(_) => break,
                    Ok(command) => self.handle_command(command),
                },
                recv(frames) -> msg => {
                    if let Ok(frame) = msg {
                        if let Err(e) = self.session.deliver_frame(&frame) {
                            tracing::warn!(error = %e, "Dropped input frame");
                        }
                    }
                },
                default(timeout) => {},
            }

            let now = Instant::now();
            if now >= next_tick {
                self.session.tick();
                next_tick = now + tick_every;
            }
            if now >= next_draw {
                self.session.draw();
                next_draw = now + draw_every;
            }
            self.status.publish(&self.session);
        }

        self.session.stop_metronome();
        self.status.publish(&self.session);
    }

    fn handle_command(&mut self, command: Command) {
        let session = &mut self.session;
        // A caller that gave up waiting has dropped its receiver; nothing to do.
        match command {
            Command::AddLoop { beats, reply } => {
                let result = match beats {
                    Some(beats) => session.add_loop_with_beats(beats),
                    None => Ok(session.add_loop()),
                };
                let _ = reply.send(result);
            }
            Command::RemoveLoop { id, reply } => {
                let _ = reply.send(session.remove_loop(id));
            }
            Command::Action { id, reply } => {
                let _ = reply.send(session.action(id));
            }
            Command::StopLoop { id, reply } => {
                let _ = reply.send(session.stop_loop(id));
            }
            Command::SetLoopBeats { id, beats, reply } => {
                let _ = reply.send(session.set_loop_beats(id, beats));
            }
            Command::SetLoopDestination {
                id,
                destination,
                reply,
            } => {
                let _ = reply.send(session.set_loop_destination(id, destination));
            }
            Command::ApplyBeatsToEmpty { beats, reply } => {
                let _ = reply.send(session.apply_beats_to_empty_loops(beats));
            }
            Command::SetTempo { bpm, reply } => {
                let _ = reply.send(session.set_tempo(bpm));
            }
            Command::SetBeatsPerBar { beats, reply } => {
                let _ = reply.send(session.set_beats_per_bar(beats));
            }
            Command::Mute(muted) => session.mute(muted),
            Command::ToggleMute { reply } => {
                let _ = reply.send(session.toggle_mute());
            }
            Command::SetClickGain(gain) => session.set_click_gain(gain),
            Command::StartMetronome { reply } => {
                let _ = reply.send(session.start_metronome());
            }
            Command::StopMetronome => session.stop_metronome(),
            Command::Snapshot { reply } => {
                let _ = reply.send(session.snapshot());
            }
            Command::Shutdown => {}
        }
    }
}
