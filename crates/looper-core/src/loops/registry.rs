//! Ordered collection of loops plus the single recording slot.

use super::phrase::{Loop, LoopSettings};
use super::LoopId;
use crate::config::is_allowed_beats;
use crate::sink::{AudioSink, Destination};
use crate::transport::{opens_group, Beat};
use crate::{Error, Result};

/// Every loop of a session, in creation order.
///
/// At most one loop is the current recording target at a time.
pub struct LoopRegistry {
    loops: Vec<Loop>,
    recording: Option<LoopId>,
    next_id: u64,
    settings: LoopSettings,
    destination: Destination,
}

impl LoopRegistry {
    pub fn new(settings: LoopSettings) -> Self {
        Self {
            loops: Vec::new(),
            recording: None,
            next_id: 1,
            settings,
            destination: Destination::MASTER,
        }
    }

    /// Route handed to loops created from now on.
    pub fn set_default_destination(&mut self, destination: Destination) {
        self.destination = destination;
    }

    pub fn default_destination(&self) -> Destination {
        self.destination
    }

    /// Create an empty loop of `beats` beats on the default route.
    ///
    /// Fails with [`Error::InvalidBeats`] unless `beats` is one of
    /// [`ALLOWED_BEATS`](crate::ALLOWED_BEATS).
    pub fn add(&mut self, beats: u32, beat_duration: f64) -> Result<LoopId> {
        if !is_allowed_beats(beats) {
            return Err(Error::InvalidBeats(beats));
        }
        Ok(self.insert(beats, beat_duration))
    }

    /// `beats` must already be an allowed loop length.
    pub(crate) fn insert(&mut self, beats: u32, beat_duration: f64) -> LoopId {
        let id = LoopId(self.next_id);
        self.next_id += 1;
        self.loops.push(Loop::new(
            id,
            beats,
            beat_duration,
            self.destination,
            self.settings,
        ));
        id
    }

    pub fn get(&self, id: LoopId) -> Option<&Loop> {
        self.loops.iter().find(|lp| lp.id() == id)
    }

    pub fn get_mut(&mut self, id: LoopId) -> Option<&mut Loop> {
        self.loops.iter_mut().find(|lp| lp.id() == id)
    }

    pub(crate) fn require_mut(&mut self, id: LoopId) -> Result<&mut Loop> {
        self.get_mut(id).ok_or(Error::UnknownLoop(id))
    }

    pub fn iter(&self) -> impl Iterator<Item = &Loop> {
        self.loops.iter()
    }

    pub fn len(&self) -> usize {
        self.loops.len()
    }

    pub fn is_empty(&self) -> bool {
        self.loops.is_empty()
    }

    /// Index of `id` in creation order.
    pub fn position(&self, id: LoopId) -> Option<usize> {
        self.loops.iter().position(|lp| lp.id() == id)
    }

    /// Drop a loop from the collection. Callers stop it first.
    pub(crate) fn remove(&mut self, id: LoopId) -> Option<Loop> {
        let index = self.position(id)?;
        if self.recording == Some(id) {
            self.recording = None;
        }
        Some(self.loops.remove(index))
    }

    /// Claim the recording slot for `id`.
    pub fn set_current_recording(&mut self, id: LoopId) -> Result<()> {
        match self.recording {
            Some(current) if current != id => Err(Error::RecorderBusy(current)),
            _ => {
                self.recording = Some(id);
                Ok(())
            }
        }
    }

    pub fn clear_current_recording(&mut self) {
        self.recording = None;
    }

    pub fn current_recording(&self) -> Option<LoopId> {
        self.recording
    }

    pub fn current_recording_loop(&self) -> Option<&Loop> {
        self.recording.and_then(|id| self.get(id))
    }

    pub(crate) fn current_recording_loop_mut(&mut self) -> Option<&mut Loop> {
        let id = self.recording?;
        self.get_mut(id)
    }

    /// Start every playing loop whose group opens on `beat`.
    ///
    /// A one-beat loop restarts on every beat, an N-beat loop on beats
    /// 1, N+1, 2N+1, ... Returns how many loops were restarted.
    pub fn dispatch_playback_for_beat<S: AudioSink + ?Sized>(
        &mut self,
        beat: &Beat,
        now: f64,
        sink: &mut S,
    ) -> usize {
        let mut restarted = 0;
        for lp in self
            .loops
            .iter_mut()
            .filter(|lp| lp.is_playing() && opens_group(beat.num, lp.beats()))
        {
            lp.play(beat.time, now, sink);
            restarted += 1;
        }
        restarted
    }

    pub fn is_any_playing(&self) -> bool {
        self.loops.iter().any(Loop::is_playing)
    }

    /// Set `beats` on every loop that holds no take yet.
    ///
    /// Loops with takes keep their length. Returns how many loops changed.
    pub fn apply_beats_to_empty(&mut self, beats: u32, beat_duration: f64) -> Result<usize> {
        if !is_allowed_beats(beats) {
            return Err(Error::InvalidBeats(beats));
        }
        let mut changed = 0;
        for lp in self.loops.iter_mut().filter(|lp| lp.is_empty()) {
            lp.set_beats(beats, beat_duration)?;
            changed += 1;
        }
        Ok(changed)
    }

    /// Recompute the length of every empty loop after a tempo change.
    pub(crate) fn retime_empty(&mut self, beat_duration: f64) {
        for lp in &mut self.loops {
            lp.retime(beat_duration);
        }
    }
}

impl Default for LoopRegistry {
    fn default() -> Self {
        Self::new(LoopSettings::default())
    }
}
