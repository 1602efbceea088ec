use serde::{Deserialize, Serialize};

use super::error::TapError;

/// How individual samples are stored.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SampleRepresentation {
    Float32,
    Int16,
}

impl SampleRepresentation {
    pub fn bytes_per_sample(self) -> usize {
        match self {
            Self::Float32 => 4,
            Self::Int16 => 2,
        }
    }
}

/// Sample rate, channel count and sample layout of a PCM stream.
///
/// The engine's target format is one of these; it is fixed when the engine is
/// built and never changes while a tap session is active.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AudioFormatDescriptor {
    pub sample_rate: f64,
    pub channels: u16,
    pub representation: SampleRepresentation,
    /// `false` means one buffer per channel (planar).
    pub interleaved: bool,
}

impl AudioFormatDescriptor {
    /// Planar 32-bit float at the given rate and channel count.
    pub const fn standard(sample_rate: f64, channels: u16) -> Self {
        Self {
            sample_rate,
            channels,
            representation: SampleRepresentation::Float32,
            interleaved: false,
        }
    }

    pub fn is_standard(&self) -> bool {
        self.representation == SampleRepresentation::Float32 && !self.interleaved
    }

    /// Number of separate buffers a buffer list in this format carries.
    pub fn buffer_count(&self) -> usize {
        if self.interleaved {
            1
        } else {
            self.channels as usize
        }
    }

    /// Bytes occupied by one frame inside a single buffer of the list.
    pub fn bytes_per_frame(&self) -> usize {
        let per_sample = self.representation.bytes_per_sample();
        if self.interleaved {
            per_sample * self.channels as usize
        } else {
            per_sample
        }
    }

    /// Same sample rate and channel count, ignoring storage layout.
    pub fn same_shape(&self, other: &AudioFormatDescriptor) -> bool {
        (self.sample_rate - other.sample_rate).abs() < 0.01 && self.channels == other.channels
    }
}

impl Default for AudioFormatDescriptor {
    fn default() -> Self {
        Self::standard(44100.0, 2)
    }
}

/// Native stream layout handed over by the playback pipeline when a tap is prepared.
///
/// Mirrors the fields of a platform stream basic description that matter for
/// linear PCM. Not under the caller's control.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct StreamDescription {
    pub sample_rate_hz: u32,
    pub is_float: bool,
    pub is_non_interleaved: bool,
    pub bytes_per_frame: u32,
    pub channels_per_frame: u32,
    pub bits_per_channel: u32,
}

impl StreamDescription {
    pub fn from_format(format: &AudioFormatDescriptor) -> Self {
        Self {
            sample_rate_hz: format.sample_rate.round() as u32,
            is_float: format.representation == SampleRepresentation::Float32,
            is_non_interleaved: !format.interleaved,
            bytes_per_frame: format.bytes_per_frame() as u32,
            channels_per_frame: format.channels as u32,
            bits_per_channel: (format.representation.bytes_per_sample() * 8) as u32,
        }
    }

    /// Interpret the description, rejecting layouts the converter cannot read.
    pub fn to_format(&self) -> Result<AudioFormatDescriptor, TapError> {
        if self.sample_rate_hz == 0 {
            return Err(TapError::InvalidStreamDescription("sample rate is zero".into()));
        }
        if self.channels_per_frame == 0 || self.channels_per_frame > u16::MAX as u32 {
            return Err(TapError::InvalidStreamDescription(format!(
                "unsupported channel count: {}",
                self.channels_per_frame
            )));
        }

        let representation = match (self.is_float, self.bits_per_channel) {
            (true, 32) => SampleRepresentation::Float32,
            (false, 16) => SampleRepresentation::Int16,
            (is_float, bits) => {
                return Err(TapError::InvalidStreamDescription(format!(
                    "unsupported sample layout: {} bits, float = {}",
                    bits, is_float
                )))
            }
        };

        let format = AudioFormatDescriptor {
            sample_rate: self.sample_rate_hz as f64,
            channels: self.channels_per_frame as u16,
            representation,
            interleaved: !self.is_non_interleaved,
        };

        if format.bytes_per_frame() != self.bytes_per_frame as usize {
            return Err(TapError::InvalidStreamDescription(format!(
                "bytes per frame {} does not match layout (expected {})",
                self.bytes_per_frame,
                format.bytes_per_frame()
            )));
        }

        Ok(format)
    }
}
