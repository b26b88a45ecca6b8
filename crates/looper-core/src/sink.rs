//! Audio sink: the output side the engine schedules playback on.
//!
//! The engine never mixes or filters signal itself. It hands captured buffers
//! to the sink, wires them to a destination, and tells the sink when to start
//! and stop them.

use crate::transport::Click;
use crate::AudioBuffer;
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;

/// Handle of one playback instance created by the sink.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SourceId(pub u64);

/// Output route a loop plays into (a bus, a channel strip, the master out).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Destination(pub u32);

impl Destination {
    pub const MASTER: Destination = Destination(0);
}

impl Default for Destination {
    fn default() -> Self {
        Self::MASTER
    }
}

impl fmt::Display for Destination {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "dest_{}", self.0)
    }
}

/// Collaborator that turns scheduling decisions into sound.
///
/// All times are absolute [`Clock`](crate::Clock) seconds.
pub trait AudioSink {
    fn create_playback_source(&mut self, buffer: Arc<AudioBuffer>) -> SourceId;

    fn connect(&mut self, source: SourceId, destination: Destination);

    fn disconnect(&mut self, source: SourceId, destination: Destination);

    fn schedule_playback(&mut self, source: SourceId, time: f64);

    /// Stop a playback instance, whether it already started or not.
    fn stop(&mut self, source: SourceId);

    fn schedule_click(&mut self, click: Click);
}

impl<S: AudioSink + ?Sized> AudioSink for Box<S> {
    fn create_playback_source(&mut self, buffer: Arc<AudioBuffer>) -> SourceId {
        (**self).create_playback_source(buffer)
    }

    fn connect(&mut self, source: SourceId, destination: Destination) {
        (**self).connect(source, destination)
    }

    fn disconnect(&mut self, source: SourceId, destination: Destination) {
        (**self).disconnect(source, destination)
    }

    fn schedule_playback(&mut self, source: SourceId, time: f64) {
        (**self).schedule_playback(source, time)
    }

    fn stop(&mut self, source: SourceId) {
        (**self).stop(source)
    }

    fn schedule_click(&mut self, click: Click) {
        (**self).schedule_click(click)
    }
}

/// Sink that accepts everything and plays nothing.
#[derive(Debug, Default)]
pub struct NullSink {
    next_id: u64,
}

impl AudioSink for NullSink {
    fn create_playback_source(&mut self, _buffer: Arc<AudioBuffer>) -> SourceId {
        self.next_id += 1;
        SourceId(self.next_id)
    }

    fn connect(&mut self, _source: SourceId, _destination: Destination) {}

    fn disconnect(&mut self, _source: SourceId, _destination: Destination) {}

    fn schedule_playback(&mut self, _source: SourceId, _time: f64) {}

    fn stop(&mut self, _source: SourceId) {}

    fn schedule_click(&mut self, _click: Click) {}
}

/// One call received by a [`ScheduleLog`].
#[derive(Debug, Clone, PartialEq)]
pub enum SinkEvent {
    Created { source: SourceId, duration: f64 },
    Connected { source: SourceId, destination: Destination },
    Disconnected { source: SourceId, destination: Destination },
    Scheduled { source: SourceId, time: f64 },
    Stopped { source: SourceId },
    Click(Click),
}

#[derive(Debug, Default)]
struct LogInner {
    next_id: u64,
    events: Vec<SinkEvent>,
}

/// Sink that records every call it receives.
///
/// Clones share one log, so the engine thread can own one copy while the
/// caller inspects another.
#[derive(Debug, Clone, Default)]
pub struct ScheduleLog {
    inner: Arc<Mutex<LogInner>>,
}

impl ScheduleLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn events(&self) -> Vec<SinkEvent> {
        self.inner.lock().events.clone()
    }

    pub fn clear(&self) {
        self.inner.lock().events.clear();
    }

    /// `(source, start time)` of every scheduled playback, in call order.
    pub fn scheduled(&self) -> Vec<(SourceId, f64)> {
        self.inner
            .lock()
            .events
            .iter()
            .filter_map(|event| match event {
                SinkEvent::Scheduled { source, time } => Some((*source, *time)),
                _ => None,
            })
            .collect()
    }

    pub fn stopped(&self) -> Vec<SourceId> {
        self.inner
            .lock()
            .events
            .iter()
            .filter_map(|event| match event {
                SinkEvent::Stopped { source } => Some(*source),
                _ => None,
            })
            .collect()
    }

    pub fn clicks(&self) -> Vec<Click> {
        self.inner
            .lock()
            .events
            .iter()
            .filter_map(|event| match event {
                SinkEvent::Click(click) => Some(*click),
                _ => None,
            })
            .collect()
    }

    /// Destination each source was connected to.
    pub fn destination_of(&self, source: SourceId) -> Option<Destination> {
        self.inner.lock().events.iter().find_map(|event| match event {
            SinkEvent::Connected {
                source: s,
                destination,
            } if *s == source => Some(*destination),
            _ => None,
        })
    }

    fn push(&self, event: SinkEvent) {
        self.inner.lock().events.push(event);
    }
}

impl AudioSink for ScheduleLog {
    fn create_playback_source(&mut self, buffer: Arc<AudioBuffer>) -> SourceId {
        let mut inner = self.inner.lock();
        inner.next_id += 1;
        let source = SourceId(inner.next_id);
        inner.events.push(SinkEvent::Created {
            source,
            duration: buffer.duration(),
        });
        source
    }

    fn connect(&mut self, source: SourceId, destination: Destination) {
        self.push(SinkEvent::Connected {
            source,
            destination,
        });
    }

    fn disconnect(&mut self, source: SourceId, destination: Destination) {
        self.push(SinkEvent::Disconnected {
            source,
            destination,
        });
    }

    fn schedule_playback(&mut self, source: SourceId, time: f64) {
        self.push(SinkEvent::Scheduled { source, time });
    }

    fn stop(&mut self, source: SourceId) {
        self.push(SinkEvent::Stopped { source });
    }

    fn schedule_click(&mut self, click: Click) {
        self.push(SinkEvent::Click(click));
    }
}
