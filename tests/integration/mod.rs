//! Integration test modules for looper
//!
//! Test categories:
//! - session: Metronome grid, record gates, takes, multi-loop sync (manual clock)
//! - engine: Scheduler thread, command handle, status publishing (system clock)
//! - properties: Invariants over random control sequences

pub mod properties;
pub mod session;
