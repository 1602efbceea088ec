use crate::models::buffer::{AudioBufferList, PcmBuffer};
use crate::models::config::FormatMismatchPolicy;
use crate::models::error::TapError;
use crate::models::format::{AudioFormatDescriptor, SampleRepresentation};

use super::resampler::StreamResampler;

/// Converts native-format buffer lists into planar f32 buffers in the target format.
///
/// When the negotiated format already has the target's rate and channel count,
/// each channel is copied sample for sample. Other layouts (interleaved, 16-bit)
/// are decoded on the way. Rate or channel differences are governed by the
/// configured [`FormatMismatchPolicy`].
#[derive(Debug, Clone)]
pub struct PcmConverter {
    target: AudioFormatDescriptor,
    policy: FormatMismatchPolicy,
}

impl PcmConverter {
    pub fn new(target: AudioFormatDescriptor, policy: FormatMismatchPolicy) -> Self {
        Self { target, policy }
    }

    pub fn target(&self) -> &AudioFormatDescriptor {
        &self.target
    }

    /// Convert `frames` frames of `list` (laid out as `native`) into a new PCM buffer.
    ///
    /// Resampling, if the policy allows it, treats the block as a stream of its own.
    pub fn convert(
        &self,
        list: &AudioBufferList,
        frames: usize,
        native: &AudioFormatDescriptor,
    ) -> Result<PcmBuffer, TapError> {
        self.convert_stream(list, frames, native, &mut StreamResampler::new())?
            .ok_or_else(|| TapError::BufferConstruction("block too short to resample".into()))
    }

    /// Convert one cycle of a continuous stream.
    ///
    /// `resampler` carries the interpolation state between cycles of one
    /// session. Returns `None` when resampling produced no frames this cycle.
    pub fn convert_stream(
        &self,
        list: &AudioBufferList,
        frames: usize,
        native: &AudioFormatDescriptor,
        resampler: &mut StreamResampler,
    ) -> Result<Option<PcmBuffer>, TapError> {
        validate_list(list, frames, native)?;

        if native.same_shape(&self.target) {
            let mut pcm = PcmBuffer::new(self.target, frames)?;
            for ch in 0..self.target.channels as usize {
                let out = pcm
                    .channel_mut(ch)
                    .ok_or_else(|| TapError::BufferConstruction(format!("missing channel {}", ch)))?;
                decode_channel(list, native, ch, frames, &mut out[..frames]);
            }
            pcm.set_frame_length(frames)?;
            return Ok(Some(pcm));
        }

        match self.policy {
            FormatMismatchPolicy::Reject => Err(self.mismatch(native)),
            FormatMismatchPolicy::Resample => self.convert_resampled(list, frames, native, resampler),
        }
    }

    fn convert_resampled(
        &self,
        list: &AudioBufferList,
        frames: usize,
        native: &AudioFormatDescriptor,
        resampler: &mut StreamResampler,
    ) -> Result<Option<PcmBuffer>, TapError> {
        // Only mono → N upmixing is supported; anything else would need a channel map.
        if native.channels != self.target.channels && native.channels != 1 {
            return Err(self.mismatch(native));
        }

        let decoded: Vec<Vec<f32>> = (0..native.channels as usize)
            .map(|ch| {
                let mut samples = vec![0.0f32; frames];
                decode_channel(list, native, ch, frames, &mut samples);
                samples
            })
            .collect();
        let resampled = if (native.sample_rate - self.target.sample_rate).abs() < 0.01 {
            decoded
        } else {
            resampler.process(&decoded, native.sample_rate, self.target.sample_rate)
        };

        let output_frames = resampled.first().map(Vec::len).unwrap_or(0);
        if output_frames == 0 {
            return Ok(None);
        }
        let mut pcm = PcmBuffer::new(self.target, output_frames)?;
        for ch in 0..self.target.channels as usize {
            let source = &resampled[ch.min(resampled.len() - 1)];
            let out = pcm
                .channel_mut(ch)
                .ok_or_else(|| TapError::BufferConstruction(format!("missing channel {}", ch)))?;
            out[..output_frames].copy_from_slice(source);
        }
        pcm.set_frame_length(output_frames)?;
        Ok(Some(pcm))
    }

    fn mismatch(&self, native: &AudioFormatDescriptor) -> TapError {
        TapError::FormatMismatch {
            source_rate: native.sample_rate.round() as u32,
            source_channels: native.channels,
            target_rate: self.target.sample_rate.round() as u32,
            target_channels: self.target.channels,
        }
    }
}

fn validate_list(list: &AudioBufferList, frames: usize, native: &AudioFormatDescriptor) -> Result<(), TapError> {
    if frames == 0 {
        return Err(TapError::BufferConstruction("no frames to convert".into()));
    }
    if list.len() != native.buffer_count() {
        return Err(TapError::BufferConstruction(format!(
            "expected {} buffers, got {}",
            native.buffer_count(),
            list.len()
        )));
    }

    let needed = frames * native.bytes_per_frame();
    for (i, buffer) in list.buffers.iter().enumerate() {
        if buffer.data.len() < needed {
            return Err(TapError::BufferConstruction(format!(
                "buffer {} holds {} bytes, {} frames need {}",
                i,
                buffer.data.len(),
                frames,
                needed
            )));
        }
    }
    Ok(())
}

/// Decode one channel of `list` into `out` (`out.len()` frames).
fn decode_channel(list: &AudioBufferList, native: &AudioFormatDescriptor, channel: usize, frames: usize, out: &mut [f32]) {
    let bytes_per_sample = native.representation.bytes_per_sample();
    let (data, stride, offset) = if native.interleaved {
        (&list.buffers[0].data, native.channels as usize, channel)
    } else {
        (&list.buffers[channel].data, 1, 0)
    };

    for (frame, sample) in out.iter_mut().enumerate().take(frames) {
        let start = (frame * stride + offset) * bytes_per_sample;
        let bytes = &data[start..start + bytes_per_sample];
        *sample = match native.representation {
            SampleRepresentation::Float32 => f32::from_ne_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]),
            SampleRepresentation::Int16 => i16::from_ne_bytes([bytes[0], bytes[1]]) as f32 / 32768.0,
        };
    }
}
