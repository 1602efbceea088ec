use std::sync::Weak;

use crate::models::audio_models::AudioTrack;
use crate::models::config::TapCreationFlags;
use crate::traits::tap_client::TapClient;

/// Callback table version understood by [`ProcessingTap`](super::processing_tap::ProcessingTap).
pub const TAP_CALLBACKS_VERSION: u32 = 0;

/// Everything needed to create a processing tap on one track.
#[derive(Clone)]
pub struct TapDescriptor {
    pub version: u32,
    pub flags: TapCreationFlags,
    pub track: AudioTrack,
    pub client: Weak<dyn TapClient>,
}

impl TapDescriptor {
    pub fn new(track: AudioTrack, flags: TapCreationFlags, client: Weak<dyn TapClient>) -> Self {
        Self {
            version: TAP_CALLBACKS_VERSION,
            flags,
            track,
            client,
        }
    }
}

impl std::fmt::Debug for TapDescriptor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TapDescriptor")
            .field("version", &self.version)
            .field("flags", &self.flags)
            .field("track", &self.track)
            .field("client_alive", &(self.client.strong_count() > 0))
            .finish()
    }
}
