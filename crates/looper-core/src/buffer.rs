//! Planar audio buffers captured from the input and replayed by loops.

use crate::{Error, Result};

/// Planar `f32` audio: one sample run per channel, all of equal length.
#[derive(Debug, Clone, PartialEq)]
pub struct AudioBuffer {
    channels: Vec<Vec<f32>>,
    sample_rate: f64,
}

impl AudioBuffer {
    /// Wrap per-channel sample runs.
    ///
    /// Runs longer than the shortest one are truncated so every channel has
    /// the same number of frames.
    pub fn from_channels(mut channels: Vec<Vec<f32>>, sample_rate: f64) -> Self {
        let frames = channels.iter().map(Vec::len).min().unwrap_or(0);
        for channel in &mut channels {
            channel.truncate(frames);
        }
        Self {
            channels,
            sample_rate,
        }
    }

    /// De-interleave `ch0, ch1, .. chN` frames as delivered by input callbacks.
    pub fn from_interleaved(data: &[f32], num_channels: usize, sample_rate: f64) -> Self {
        if num_channels == 0 {
            return Self::from_channels(Vec::new(), sample_rate);
        }
        let frames = data.len() / num_channels;
        let mut channels = vec![Vec::with_capacity(frames); num_channels];
        for frame in data.chunks_exact(num_channels) {
            for (channel, &sample) in channels.iter_mut().zip(frame) {
                channel.push(sample);
            }
        }
        Self {
            channels,
            sample_rate,
        }
    }

    pub fn silent(num_channels: usize, frames: usize, sample_rate: f64) -> Self {
        Self {
            channels: vec![vec![0.0; frames]; num_channels],
            sample_rate,
        }
    }

    #[inline]
    pub fn num_channels(&self) -> usize {
        self.channels.len()
    }

    #[inline]
    pub fn frames(&self) -> usize {
        self.channels.first().map_or(0, Vec::len)
    }

    #[inline]
    pub fn sample_rate(&self) -> f64 {
        self.sample_rate
    }

    /// Length in seconds.
    #[inline]
    pub fn duration(&self) -> f64 {
        if self.sample_rate > 0.0 {
            self.frames() as f64 / self.sample_rate
        } else {
            0.0
        }
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.frames() == 0
    }

    /// Samples of channel `ch`, or `None` past the last channel.
    #[inline]
    pub fn channel(&self, ch: usize) -> Option<&[f32]> {
        self.channels.get(ch).map(Vec::as_slice)
    }

    pub fn channels(&self) -> impl Iterator<Item = &[f32]> {
        self.channels.iter().map(Vec::as_slice)
    }

    /// Join `a` then `b` into a new buffer.
    ///
    /// Keeps `min(a.channels, b.channels)` channels and `a`'s sample rate.
    /// Fails with [`Error::ChannelMismatch`] only when either side has no
    /// channels at all.
    pub fn concatenate(a: &AudioBuffer, b: &AudioBuffer) -> Result<AudioBuffer> {
        let num_channels = a.num_channels().min(b.num_channels());
        if num_channels == 0 {
            return Err(Error::ChannelMismatch);
        }

        let channels = a
            .channels
            .iter()
            .zip(&b.channels)
            .map(|(head, tail)| {
                let mut joined = Vec::with_capacity(head.len() + tail.len());
                joined.extend_from_slice(head);
                joined.extend_from_slice(tail);
                joined
            })
            .collect();

        Ok(AudioBuffer {
            channels,
            sample_rate: a.sample_rate,
        })
    }

    /// In-place form of [`AudioBuffer::concatenate`]: `self` followed by `tail`.
    pub fn append(&mut self, tail: &AudioBuffer) -> Result<()> {
        let num_channels = self.num_channels().min(tail.num_channels());
        if num_channels == 0 {
            return Err(Error::ChannelMismatch);
        }

        self.channels.truncate(num_channels);
        for (channel, samples) in self.channels.iter_mut().zip(&tail.channels) {
            channel.extend_from_slice(samples);
        }
        Ok(())
    }
}
