use uuid::Uuid;

use crate::models::buffer::AudioBufferList;
use crate::models::error::TapError;
use crate::models::format::AudioFormatDescriptor;
use crate::processing::resampler::StreamResampler;
use crate::traits::tap_source::{PulledAudio, SourceAudio};

/// Everything the client needs to handle one process cycle.
pub struct BufferDelivery<'a> {
    pub session_id: Uuid,
    pub requested_frames: u32,
    /// Format negotiated at prepare time.
    pub processing_format: &'a AudioFormatDescriptor,
    pub source: &'a mut dyn SourceAudio,
    pub io: &'a mut AudioBufferList,
    /// Per-session resampling state, reset whenever the format is renegotiated.
    pub resampler: &'a mut StreamResampler,
}

/// Receiver of a processing tap's callbacks.
///
/// A tap only holds a weak reference to its client; once the client is gone
/// the tap passes audio through untouched.
pub trait TapClient: Send + Sync {
    /// Tap storage was allocated (init).
    fn session_created(&self, _session_id: Uuid) {}

    /// Tap storage was released (finalize).
    fn session_finalized(&self, _session_id: Uuid) {}

    /// The pipeline's processing format was unusable; the tap stays unprepared.
    fn session_prepare_failed(&self, _session_id: Uuid, _error: &TapError) {}

    /// Render-thread entry point for every cycle. Must pull source audio exactly once.
    fn on_buffer_delivered(&self, delivery: BufferDelivery<'_>) -> Result<PulledAudio, TapError>;
}
