//! Lookahead beat scheduler.
//!
//! Two clocks are at work here. [`Metronome::tick`] runs ahead of real time:
//! every beat that falls inside the lookahead window is committed to audio
//! right away, so timer jitter never leaves a gap. [`Metronome::drain_due`]
//! runs on the draw cadence and only hands a beat to the listener once the
//! clock has reached it, so nothing observable fires early.

use super::beat::{opens_group, Beat, BeatListener, BeatScheduler};
use super::click::ClickSettings;
use crate::config::{is_allowed_beats, LooperConfig, ALLOWED_BEATS, MAX_TEMPO, MIN_TEMPO};
use crate::{Error, Result};
use std::collections::VecDeque;

pub struct Metronome {
    tempo: u32,
    beats_per_bar: u32,
    beat_duration: f64,
    lookahead: f64,
    running: bool,
    first_beat: bool,
    next_beat_time: f64,
    beats_count: u64,
    queue: VecDeque<Beat>,
    muted: bool,
    click: ClickSettings,
}

impl Metronome {
    pub fn new(config: &LooperConfig) -> Self {
        let mut metronome = Self {
            tempo: config.tempo,
            beats_per_bar: config.beats_per_bar,
            beat_duration: 0.0,
            lookahead: config.lookahead,
            running: false,
            first_beat: false,
            next_beat_time: 0.0,
            beats_count: 0,
            queue: VecDeque::with_capacity(16),
            muted: config.muted,
            click: config.click,
        };
        metronome.set_tempo(config.tempo);
        metronome
    }

    /// Clamp to `[20, 220]` BPM and return the tempo actually applied.
    pub fn set_tempo(&mut self, bpm: u32) -> u32 {
        self.tempo = bpm.clamp(MIN_TEMPO, MAX_TEMPO);
        self.beat_duration = 60.0 / self.tempo as f64;
        self.tempo
    }

    pub fn tempo(&self) -> u32 {
        self.tempo
    }

    /// Seconds per beat at the current tempo.
    pub fn beat_duration(&self) -> f64 {
        self.beat_duration
    }

    /// Apply `beats` if it is one of the supported values, otherwise keep the
    /// current setting. Returns the setting in effect.
    pub fn set_beats_per_bar(&mut self, beats: u32) -> u32 {
        if is_allowed_beats(beats) {
            self.beats_per_bar = beats;
        }
        self.beats_per_bar
    }

    pub fn beats_per_bar(&self) -> u32 {
        self.beats_per_bar
    }

    pub fn allowed_beats(&self) -> &'static [u32] {
        &ALLOWED_BEATS
    }

    pub fn mute(&mut self, muted: bool) {
        self.muted = muted;
    }

    pub fn toggle_mute(&mut self) -> bool {
        self.muted = !self.muted;
        self.muted
    }

    pub fn is_muted(&self) -> bool {
        self.muted
    }

    pub fn set_click_gain(&mut self, gain: f32) {
        self.click.set_gain(gain);
    }

    pub fn click_settings(&self) -> &ClickSettings {
        &self.click
    }

    pub fn is_running(&self) -> bool {
        self.running
    }

    /// Whether the most recently scheduled beat opened a bar.
    pub fn is_first_beat(&self) -> bool {
        self.first_beat
    }

    pub fn beats_count(&self) -> u64 {
        self.beats_count
    }

    /// Clock time of the next beat not yet scheduled.
    pub fn next_beat_time(&self) -> f64 {
        self.next_beat_time
    }

    /// Beats scheduled but not yet handed to the listener.
    pub fn pending_beats(&self) -> impl Iterator<Item = &Beat> {
        self.queue.iter()
    }

    /// Start ticking with the first beat at `now`.
    pub fn start(&mut self, now: f64) -> Result<()> {
        if self.running {
            return Err(Error::AlreadyRunning);
        }
        self.next_beat_time = now;
        self.running = true;
        tracing::info!(tempo = self.tempo, beats_per_bar = self.beats_per_bar, "Metronome started");
        Ok(())
    }

    /// Stop and forget every pending beat. Safe to call when stopped.
    pub fn stop(&mut self) {
        if self.running {
            tracing::info!(beats = self.beats_count, "Metronome stopped");
        }
        self.reset();
    }

    pub fn reset(&mut self) {
        self.running = false;
        self.first_beat = false;
        self.next_beat_time = 0.0;
        self.beats_count = 0;
        self.queue.clear();
    }

    /// Schedule every beat that falls inside `[.., now + lookahead)`.
    ///
    /// Each beat is numbered, handed to `scheduler` for playback, clicked
    /// (unless muted) and queued for the draw pass. Returns how many beats
    /// were scheduled.
    pub fn tick<S: BeatScheduler + ?Sized>(&mut self, now: f64, scheduler: &mut S) -> usize {
        if !self.running {
            return 0;
        }

        let mut scheduled = 0;
        while self.next_beat_time < now + self.lookahead {
            self.beats_count += 1;
            self.first_beat = opens_group(self.beats_count, self.beats_per_bar);

            let beat = Beat {
                time: self.next_beat_time,
                num: self.beats_count,
                bar_start: self.first_beat,
            };

            scheduler.schedule_beat(&beat);
            if !self.muted {
                scheduler.schedule_click(self.click.click_at(beat.time, beat.bar_start));
            }

            self.queue.push_back(beat);
            self.next_beat_time += self.beat_duration;
            scheduled += 1;
        }

        if scheduled > 0 {
            tracing::debug!(
                beats = self.beats_count,
                next = self.next_beat_time,
                "Scheduled {} beat(s)",
                scheduled
            );
        }
        scheduled
    }

    /// Hand every queued beat whose time has arrived to `listener`, oldest
    /// first. Returns how many beats were delivered.
    pub fn drain_due<L: BeatListener + ?Sized>(&mut self, now: f64, listener: &mut L) -> usize {
        let mut delivered = 0;
        while let Some(beat) = self.queue.front() {
            if beat.time > now {
                break;
            }
            listener.on_beat(beat);
            self.queue.pop_front();
            delivered += 1;
        }
        delivered
    }

    /// Clock time of the next beat that opens a group of `beats` beats.
    ///
    /// This is the quantization target for recording into a loop of that
    /// length: `next_beat_time` if the next beat already opens a group,
    /// otherwise as many beats later as it takes to reach one.
    pub fn next_bar_boundary(&self, beats: u32) -> f64 {
        let beats = beats.max(1) as u64;
        let position = self.beats_count % beats;
        if position > 0 {
            self.next_beat_time + (beats - position) as f64 * self.beat_duration
        } else {
            self.next_beat_time
        }
    }
}
