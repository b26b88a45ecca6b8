//! # Looper - Live Looping Station
//!
//! Beat-quantized recording, layered overdubs and phase-locked loop playback.
//!
//! ## Architecture
//!
//! Looper is an umbrella crate over:
//! - **looper-core** - Cooperative engine (Metronome, Loop, LoopRegistry, Recorder, LooperSession)
//! - **looper** - Threaded runtime ([`LooperEngine`]) driving a session on its own scheduler thread
//!
//! ## Quick Start
//!
//! ```ignore
//! use looper::prelude::*;
//!
//! let engine = LooperEngine::builder()
//!     .tempo(120)
//!     .build_with(ScheduleLog::new(), |beat: &Beat| println!("beat {}", beat.num))?;
//!
//! let looper = engine.handle();
//! let id = looper.add_loop()?;
//!
//! // First press: metronome starts, recording arms on the next bar.
//! looper.action(id)?;
//! looper.deliver_frame(frame)?;
//!
//! // Second press: the take is kept (or dropped if too short) and plays back.
//! looper.action(id)?;
//! ```

/// Re-export of looper-core for direct access
pub use looper_core as core;

pub use looper_core::{
    // Collaborators
    AudioBuffer,
    AudioSink,
    Beat,
    BeatListener,
    Clock,
    Destination,
    ManualClock,
    NullSink,
    ScheduleLog,
    SinkEvent,
    SourceId,
    SystemClock,

    // Transport
    Click,
    ClickSettings,
    Metronome,

    // Loops
    FrameOutcome,
    Loop,
    LoopId,
    LoopRegistry,
    LoopState,
    LoopTransition,
    Recorder,
    Take,

    // Session
    LoopSnapshot,
    LooperConfig,
    LooperSession,
    SessionSnapshot,
};

mod error;
pub use error::{Error, Result};

mod builder;
mod engine;

pub use builder::LooperEngineBuilder;
pub use engine::{EngineStatus, LooperEngine, LooperHandle};

/// Convenience prelude for common imports
pub mod prelude {
    // Main engine
    pub use crate::{LooperEngine, LooperEngineBuilder, LooperHandle};

    // Essential types
    pub use crate::core::{AudioBuffer, Beat, Destination, LoopId, LoopTransition};

    // Sinks
    pub use crate::core::{AudioSink, NullSink, ScheduleLog};

    // Configuration
    pub use crate::core::LooperConfig;
}
