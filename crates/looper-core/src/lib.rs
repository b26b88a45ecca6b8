//! Live looping engine: lookahead metronome, loop state machine, recorder.
//!
//! # Primary API
//!
//! - [`LooperSession`]: Session context owning every component
//! - [`Metronome`]: Lookahead beat scheduler with draw-gated delivery
//! - [`Loop`] / [`LoopRegistry`]: Record/play/overdub state and playback sync
//! - [`Recorder`]: Routes captured frames into the recording loop
//!
//! # Collaborators
//!
//! - [`Clock`]: Monotonic time source ([`SystemClock`], [`ManualClock`])
//! - [`AudioSink`]: Where playback and clicks are scheduled ([`NullSink`], [`ScheduleLog`])
//! - [`BeatListener`]: Per-beat draw callback, never called early
//!
//! # Example
//!
//! ```ignore
//! use looper_core::{LooperConfig, LooperSession, ManualClock, NullSink};
//!
//! let clock = ManualClock::new(0.0);
//! let mut session = LooperSession::new(LooperConfig::default(), clock.clone(), NullSink::default(), ())?;
//!
//! let id = session.add_loop();
//! session.action(id)?; // start the metronome and arm recording
//!
//! clock.advance(0.025);
//! session.tick();
//! session.deliver_frame(&frame)?;
//! ```

pub mod error;
pub use error::{Error, Result};

pub mod config;
pub use config::{LooperConfig, ALLOWED_BEATS, MAX_TEMPO, MIN_TEMPO};

mod clock;
pub use clock::{Clock, ManualClock, SystemClock};

mod buffer;
pub use buffer::AudioBuffer;

pub mod sink;
pub use sink::{AudioSink, Destination, NullSink, ScheduleLog, SinkEvent, SourceId};

pub(crate) mod transport;
pub use transport::{opens_group, Beat, BeatListener, BeatScheduler, Click, ClickSettings, Metronome};

pub mod loops;
pub use loops::{
    Loop, LoopId, LoopRegistry, LoopSettings, LoopState, LoopTransition, ScheduledPlayback, Take,
};

mod recorder;
pub use recorder::{FrameOutcome, Recorder};

mod session;
pub use session::{LoopSnapshot, LooperSession, SessionSnapshot};
