use std::sync::{Arc, Weak};

use uuid::Uuid;

use crate::models::audio_models::AudioTrack;
use crate::models::format::AudioFormatDescriptor;
use crate::processing::resampler::StreamResampler;
use crate::traits::tap_client::TapClient;

/// Per-tap storage: one active interception of one track.
///
/// Lives inside its [`ProcessingTap`](super::processing_tap::ProcessingTap) and
/// is released with it. Holds only a weak reference to the client so a tap left
/// behind in a player item never keeps the engine alive.
pub struct TapSession {
    id: Uuid,
    track: AudioTrack,
    processing_format: Option<AudioFormatDescriptor>,
    max_frames: u32,
    client: Weak<dyn TapClient>,
    orphan_reported: bool,
    resampler: StreamResampler,
}

impl TapSession {
    pub(crate) fn new(track: AudioTrack, client: Weak<dyn TapClient>) -> Self {
        Self {
            id: Uuid::new_v4(),
            track,
            processing_format: None,
            max_frames: 0,
            client,
            orphan_reported: false,
            resampler: StreamResampler::new(),
        }
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn track(&self) -> &AudioTrack {
        &self.track
    }

    pub fn processing_format(&self) -> Option<&AudioFormatDescriptor> {
        self.processing_format.as_ref()
    }

    pub fn max_frames(&self) -> u32 {
        self.max_frames
    }

    pub(crate) fn negotiate(&mut self, format: AudioFormatDescriptor, max_frames: u32) {
        self.processing_format = Some(format);
        self.max_frames = max_frames;
        self.resampler.reset();
    }

    pub(crate) fn reset_negotiation(&mut self) {
        self.processing_format = None;
        self.max_frames = 0;
        self.resampler.reset();
    }

    /// Conversion state carried from one cycle to the next.
    pub(crate) fn resampler_mut(&mut self) -> &mut StreamResampler {
        &mut self.resampler
    }

    pub(crate) fn client(&self) -> Option<Arc<dyn TapClient>> {
        self.client.upgrade()
    }

    /// True the first time it is called after the client went away.
    pub(crate) fn mark_orphaned(&mut self) -> bool {
        !std::mem::replace(&mut self.orphan_reported, true)
    }
}

impl std::fmt::Debug for TapSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TapSession")
            .field("id", &self.id)
            .field("track", &self.track)
            .field("processing_format", &self.processing_format)
            .field("max_frames", &self.max_frames)
            .finish()
    }
}
