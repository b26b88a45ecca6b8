//! Clock oracle: the monotonic time source every scheduling decision uses.

use atomic_float::AtomicF64;
use std::sync::atomic::Ordering;
use std::sync::Arc;
use std::time::Instant;

/// Monotonic audio-time source, in seconds.
pub trait Clock {
    fn now(&self) -> f64;
}

impl<C: Clock + ?Sized> Clock for Arc<C> {
    fn now(&self) -> f64 {
        (**self).now()
    }
}

/// Wall clock measured from the moment it was created.
#[derive(Debug, Clone, Copy)]
pub struct SystemClock {
    origin: Instant,
}

impl SystemClock {
    pub fn new() -> Self {
        Self {
            origin: Instant::now(),
        }
    }
}

impl Default for SystemClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for SystemClock {
    #[inline]
    fn now(&self) -> f64 {
        self.origin.elapsed().as_secs_f64()
    }
}

/// Clock that only moves when told to.
///
/// Clones share the same time, so a test (or an offline driver) can keep one
/// copy while the session owns another.
#[derive(Debug, Clone, Default)]
pub struct ManualClock {
    time: Arc<AtomicF64>,
}

impl ManualClock {
    pub fn new(start: f64) -> Self {
        Self {
            time: Arc::new(AtomicF64::new(start)),
        }
    }

    pub fn set(&self, time: f64) {
        self.time.store(time, Ordering::Release);
    }

    /// Move forward by `seconds` and return the new time.
    pub fn advance(&self, seconds: f64) -> f64 {
        let step = seconds.max(0.0);
        self.time.fetch_add(step, Ordering::AcqRel) + step
    }
}

impl Clock for ManualClock {
    #[inline]
    fn now(&self) -> f64 {
        self.time.load(Ordering::Acquire)
    }
}
