//! Tolerance constants for timing tests.

/// Exact scheduling math (tempo and step sizes chosen to be binary-exact).
pub const TIME_EPSILON: f64 = 1e-9;

/// Float sample comparisons.
pub const FLOAT_EPSILON: f32 = 1e-6;

/// Wall-clock slack for tests that run the real scheduler thread.
pub const THREAD_SLACK_MS: u64 = 2000;
