//! Sine source standing in for a decoded asset.
//!
//! Writes into whatever native layout it was built for (planar or
//! interleaved, f32 or i16) so the converter sees realistic buffer lists.

use std::f64::consts::TAU;

use audio_tap_core::models::buffer::{AudioBufferList, MediaTime, TapFlags, TimeRange};
use audio_tap_core::models::error::TapError;
use audio_tap_core::models::format::{AudioFormatDescriptor, SampleRepresentation};
use audio_tap_core::traits::tap_source::{PulledAudio, SourceAudio};

pub struct ToneGenerator {
    format: AudioFormatDescriptor,
    frequency: f64,
    amplitude: f32,
    phase: f64,
    position: i64,
    max_frames_per_pull: Option<u32>,
    remaining: Option<u64>,
    pending_failures: u32,
    failure_status: i32,
}

impl ToneGenerator {
    pub fn new(format: AudioFormatDescriptor, frequency: f64) -> Self {
        Self {
            format,
            frequency,
            amplitude: 0.5,
            phase: 0.0,
            position: 0,
            max_frames_per_pull: None,
            remaining: None,
            pending_failures: 0,
            failure_status: 0,
        }
    }

    pub fn with_amplitude(mut self, amplitude: f32) -> Self {
        self.amplitude = amplitude.clamp(0.0, 1.0);
        self
    }

    /// Deliver at most `max_frames` per pull, whatever was requested.
    pub fn with_short_reads(mut self, max_frames: u32) -> Self {
        self.max_frames_per_pull = Some(max_frames);
        self
    }

    /// End the stream after `frames` frames.
    pub fn with_length(mut self, frames: u64) -> Self {
        self.remaining = Some(frames);
        self
    }

    /// Make the next `count` pulls fail with `status`.
    pub fn fail_next_pulls(&mut self, count: u32, status: i32) {
        self.pending_failures = count;
        self.failure_status = status;
    }

    pub fn format(&self) -> &AudioFormatDescriptor {
        &self.format
    }

    /// Frames produced so far.
    pub fn position(&self) -> i64 {
        self.position
    }

    fn next_sample(&mut self) -> f32 {
        let value = self.amplitude * self.phase.sin() as f32;
        self.phase = (self.phase + TAU * self.frequency / self.format.sample_rate) % TAU;
        value
    }

    fn write_sample(&self, io: &mut AudioBufferList, frame: usize, channel: usize, value: f32) {
        let per_sample = self.format.representation.bytes_per_sample();
        let (buffer, offset) = if self.format.interleaved {
            (0, (frame * self.format.channels as usize + channel) * per_sample)
        } else {
            (channel, frame * per_sample)
        };
        let Some(target) = io.buffers.get_mut(buffer).and_then(|b| b.data.get_mut(offset..offset + per_sample)) else {
            return;
        };
        match self.format.representation {
            SampleRepresentation::Float32 => target.copy_from_slice(&value.to_ne_bytes()),
            SampleRepresentation::Int16 => {
                let scaled = (value * 32767.0).round() as i16;
                target.copy_from_slice(&scaled.to_ne_bytes());
            }
        }
    }
}

impl SourceAudio for ToneGenerator {
    fn pull(&mut self, requested_frames: u32, io: &mut AudioBufferList) -> Result<PulledAudio, TapError> {
        if self.pending_failures > 0 {
            self.pending_failures -= 1;
            return Err(TapError::SourcePullFailed(self.failure_status));
        }

        let capacity = io
            .buffers
            .iter()
            .map(|b| b.data.len() / self.format.bytes_per_frame())
            .min()
            .unwrap_or(0);
        let mut frames = requested_frames.min(capacity as u32);
        if let Some(max) = self.max_frames_per_pull {
            frames = frames.min(max);
        }
        if let Some(remaining) = self.remaining {
            frames = frames.min(remaining.min(u32::MAX as u64) as u32);
        }

        for frame in 0..frames as usize {
            let value = self.next_sample();
            for channel in 0..self.format.channels as usize {
                self.write_sample(io, frame, channel, value);
            }
        }

        let mut flags = TapFlags::default();
        if self.position == 0 && frames > 0 {
            flags = flags | TapFlags::START_OF_STREAM;
        }
        if let Some(remaining) = self.remaining.as_mut() {
            *remaining -= frames as u64;
            if *remaining == 0 {
                flags = flags | TapFlags::END_OF_STREAM;
            }
        }

        let timescale = self.format.sample_rate.round() as i32;
        let start = MediaTime::new(self.position, timescale);
        self.position += frames as i64;

        Ok(PulledAudio {
            frames,
            flags,
            time_range: TimeRange {
                start,
                duration: MediaTime::new(frames as i64, timescale),
            },
        })
    }
}
