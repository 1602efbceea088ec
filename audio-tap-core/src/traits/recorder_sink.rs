use crate::models::buffer::TimedAudioBuffer;
use crate::models::format::AudioFormatDescriptor;

/// Downstream consumer of tapped audio (typically a recorder's audio input).
///
/// `set_desired_format` is called from the application thread when the sink is
/// attached (`Some`) or detached (`None`). `accept` is called from the
/// playback pipeline's render thread and must not block.
pub trait RecorderSink: Send + Sync {
    /// Format the sink should expect, or `None` once it is no longer attached.
    fn set_desired_format(&self, format: Option<AudioFormatDescriptor>);

    /// Take ownership of one converted, timestamped buffer.
    fn accept(&self, buffer: TimedAudioBuffer);
}
