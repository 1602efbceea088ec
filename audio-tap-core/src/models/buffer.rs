use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::error::TapError;
use super::format::AudioFormatDescriptor;

/// One buffer of a native buffer list, as the playback pipeline fills it.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct RawAudioBuffer {
    /// Channels interleaved inside this buffer (1 for planar layouts).
    pub channels: u32,
    pub data: Vec<u8>,
}

/// Native-format buffer list passed in and out of a tap process cycle.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct AudioBufferList {
    pub buffers: Vec<RawAudioBuffer>,
}

impl AudioBufferList {
    /// Zeroed list able to hold `frames` frames in `format`.
    pub fn allocate(format: &AudioFormatDescriptor, frames: usize) -> Self {
        let channels_per_buffer = if format.interleaved { format.channels as u32 } else { 1 };
        let bytes = frames * format.bytes_per_frame();
        Self {
            buffers: (0..format.buffer_count())
                .map(|_| RawAudioBuffer {
                    channels: channels_per_buffer,
                    data: vec![0u8; bytes],
                })
                .collect(),
        }
    }

    pub fn len(&self) -> usize {
        self.buffers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buffers.is_empty()
    }
}

/// Flags exchanged with the pipeline on every process cycle.
///
/// Whatever the pipeline reports when source audio is pulled is echoed back unchanged.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct TapFlags(pub u32);

impl TapFlags {
    pub const START_OF_STREAM: TapFlags = TapFlags(1 << 8);
    pub const END_OF_STREAM: TapFlags = TapFlags(1 << 9);

    pub fn contains(self, other: TapFlags) -> bool {
        self.0 & other.0 == other.0
    }
}

impl std::ops::BitOr for TapFlags {
    type Output = TapFlags;

    fn bitor(self, rhs: TapFlags) -> TapFlags {
        TapFlags(self.0 | rhs.0)
    }
}

/// Rational media time (value / timescale).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct MediaTime {
    pub value: i64,
    pub timescale: i32,
}

impl MediaTime {
    pub fn new(value: i64, timescale: i32) -> Self {
        Self { value, timescale }
    }

    pub fn seconds(&self) -> f64 {
        if self.timescale == 0 {
            return 0.0;
        }
        self.value as f64 / self.timescale as f64
    }
}

/// Media time range covered by the audio of one process cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct TimeRange {
    pub start: MediaTime,
    pub duration: MediaTime,
}

/// Monotonic host time in nanoseconds since the engine's clock origin.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize)]
pub struct HostTime(pub u64);

impl HostTime {
    pub fn as_nanos(self) -> u64 {
        self.0
    }

    pub fn as_secs_f64(self) -> f64 {
        self.0 as f64 / 1_000_000_000.0
    }
}

/// Planar f32 PCM buffer with a fixed frame capacity.
#[derive(Debug, Clone, PartialEq)]
pub struct PcmBuffer {
    format: AudioFormatDescriptor,
    frame_capacity: usize,
    frame_length: usize,
    channels: Vec<Vec<f32>>,
}

impl PcmBuffer {
    /// Allocate a zeroed buffer. Only planar float formats can back a `PcmBuffer`.
    pub fn new(format: AudioFormatDescriptor, frame_capacity: usize) -> Result<Self, TapError> {
        if !format.is_standard() {
            return Err(TapError::BufferConstruction("PCM buffers must be planar float".into()));
        }
        if frame_capacity == 0 {
            return Err(TapError::BufferConstruction("frame capacity is zero".into()));
        }
        if format.channels == 0 {
            return Err(TapError::BufferConstruction("format has no channels".into()));
        }

        Ok(Self {
            format,
            frame_capacity,
            frame_length: 0,
            channels: vec![vec![0.0; frame_capacity]; format.channels as usize],
        })
    }

    pub fn format(&self) -> &AudioFormatDescriptor {
        &self.format
    }

    pub fn frame_capacity(&self) -> usize {
        self.frame_capacity
    }

    pub fn frame_length(&self) -> usize {
        self.frame_length
    }

    pub fn set_frame_length(&mut self, frames: usize) -> Result<(), TapError> {
        if frames > self.frame_capacity {
            return Err(TapError::BufferConstruction(format!(
                "frame length {} exceeds capacity {}",
                frames, self.frame_capacity
            )));
        }
        self.frame_length = frames;
        Ok(())
    }

    pub fn channel_count(&self) -> usize {
        self.channels.len()
    }

    /// Valid samples of one channel (`frame_length` long).
    pub fn channel(&self, index: usize) -> Option<&[f32]> {
        self.channels.get(index).map(|c| &c[..self.frame_length])
    }

    /// Whole-capacity storage of one channel, for filling.
    pub fn channel_mut(&mut self, index: usize) -> Option<&mut [f32]> {
        self.channels.get_mut(index).map(|c| c.as_mut_slice())
    }
}

/// A converted PCM buffer stamped with capture time, ready for a recorder sink.
#[derive(Debug, Clone, PartialEq)]
pub struct TimedAudioBuffer {
    buffer: PcmBuffer,
    host_time: HostTime,
    source_time: TimeRange,
    session_id: Uuid,
}

impl TimedAudioBuffer {
    /// Package a filled PCM buffer. Empty buffers are refused.
    pub fn new(
        buffer: PcmBuffer,
        host_time: HostTime,
        source_time: TimeRange,
        session_id: Uuid,
    ) -> Result<Self, TapError> {
        if buffer.frame_length() == 0 {
            return Err(TapError::SampleBufferPackaging("buffer holds no frames".into()));
        }
        if buffer.channel_count() != buffer.format().channels as usize {
            return Err(TapError::SampleBufferPackaging(format!(
                "buffer has {} channels, format declares {}",
                buffer.channel_count(),
                buffer.format().channels
            )));
        }

        Ok(Self {
            buffer,
            host_time,
            source_time,
            session_id,
        })
    }

    pub fn frame_count(&self) -> usize {
        self.buffer.frame_length()
    }

    pub fn channel_count(&self) -> usize {
        self.buffer.channel_count()
    }

    pub fn format(&self) -> &AudioFormatDescriptor {
        self.buffer.format()
    }

    pub fn host_time(&self) -> HostTime {
        self.host_time
    }

    pub fn source_time(&self) -> TimeRange {
        self.source_time
    }

    pub fn session_id(&self) -> Uuid {
        self.session_id
    }

    pub fn channel(&self, index: usize) -> Option<&[f32]> {
        self.buffer.channel(index)
    }

    pub fn duration_secs(&self) -> f64 {
        self.frame_count() as f64 / self.format().sample_rate
    }

    pub fn into_pcm(self) -> PcmBuffer {
        self.buffer
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::format::SampleRepresentation;

    #[test]
    fn allocate_planar_list() {
        let list = AudioBufferList::allocate(&AudioFormatDescriptor::default(), 512);
        assert_eq!(list.len(), 2);
        assert_eq!(list.buffers[0].channels, 1);
        assert_eq!(list.buffers[0].data.len(), 512 * 4);
    }

    #[test]
    fn allocate_interleaved_list() {
        let format = AudioFormatDescriptor {
            sample_rate: 48000.0,
            channels: 2,
            representation: SampleRepresentation::Int16,
            interleaved: true,
        };
        let list = AudioBufferList::allocate(&format, 100);
        assert_eq!(list.len(), 1);
        assert_eq!(list.buffers[0].channels, 2);
        assert_eq!(list.buffers[0].data.len(), 400);
    }

    #[test]
    fn pcm_buffer_rejects_zero_capacity() {
        assert!(PcmBuffer::new(AudioFormatDescriptor::default(), 0).is_err());
    }

    #[test]
    fn pcm_buffer_rejects_interleaved_format() {
        let format = AudioFormatDescriptor {
            interleaved: true,
            ..AudioFormatDescriptor::default()
        };
        assert!(PcmBuffer::new(format, 16).is_err());
    }

    #[test]
    fn frame_length_bounded_by_capacity() {
        let mut buf = PcmBuffer::new(AudioFormatDescriptor::default(), 8).unwrap();
        assert!(buf.set_frame_length(8).is_ok());
        assert!(buf.set_frame_length(9).is_err());
        assert_eq!(buf.channel(0).unwrap().len(), 8);
    }

    #[test]
    fn timed_buffer_refuses_empty_pcm() {
        let buf = PcmBuffer::new(AudioFormatDescriptor::default(), 8).unwrap();
        let result = TimedAudioBuffer::new(buf, HostTime(1), TimeRange::default(), Uuid::nil());
        assert!(matches!(result, Err(TapError::SampleBufferPackaging(_))));
    }

    #[test]
    fn timed_buffer_duration() {
        let mut buf = PcmBuffer::new(AudioFormatDescriptor::default(), 441).unwrap();
        buf.set_frame_length(441).unwrap();
        let timed = TimedAudioBuffer::new(buf, HostTime(5), TimeRange::default(), Uuid::nil()).unwrap();
        assert!((timed.duration_secs() - 0.01).abs() < 1e-9);
        assert_eq!(timed.channel_count(), 2);
    }

    #[test]
    fn flags_combine() {
        let flags = TapFlags::START_OF_STREAM | TapFlags::END_OF_STREAM;
        assert!(flags.contains(TapFlags::END_OF_STREAM));
        assert!(!TapFlags::default().contains(TapFlags::START_OF_STREAM));
    }

    #[test]
    fn media_time_seconds() {
        assert_eq!(MediaTime::new(44100, 44100).seconds(), 1.0);
        assert_eq!(MediaTime::new(5, 0).seconds(), 0.0);
    }
}
