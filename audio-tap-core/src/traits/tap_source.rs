use crate::models::audio_models::AudioTrack;
use crate::models::buffer::{AudioBufferList, TapFlags, TimeRange};
use crate::models::error::TapError;
use crate::tap::descriptor::TapDescriptor;
use crate::tap::mix::AudioMix;
use crate::tap::processing_tap::ProcessingTap;

/// Result of pulling source audio inside a process cycle.
///
/// `frames` may be smaller than what was requested; it is passed back to the
/// pipeline exactly as reported.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct PulledAudio {
    pub frames: u32,
    pub flags: TapFlags,
    pub time_range: TimeRange,
}

/// Audio upstream of a tap, supplied by the pipeline for each process cycle.
pub trait SourceAudio {
    /// Fill `io` with up to `requested_frames` frames of native-format audio.
    fn pull(&mut self, requested_frames: u32, io: &mut AudioBufferList) -> Result<PulledAudio, TapError>;
}

/// A player (or player item) whose audio track can carry a processing tap.
///
/// Implemented by playback backends. The engine only ever asks for the track
/// list, asks for a tap to be created, and applies or clears its mix.
pub trait TapSource: Send + Sync {
    /// Handle to the item a mix was applied to.
    type MixTarget: Send + Sync;

    /// Audio tracks of the current item, in asset order.
    ///
    /// Returns `Err(TapError::NoPlayerItem)` when there is no current item.
    fn audio_tracks(&self) -> Result<Vec<AudioTrack>, TapError>;

    /// Create a processing tap that this source's pipeline will host.
    fn create_tap(&self, descriptor: TapDescriptor) -> Result<ProcessingTap, TapError> {
        ProcessingTap::create(descriptor)
    }

    /// Apply `mix` to the current item, replacing its mix, and return that item.
    ///
    /// On error the mix is dropped, which finalizes any tap it carried.
    fn apply_audio_mix(&self, mix: AudioMix) -> Result<Self::MixTarget, TapError>;

    /// Clear the mix on `target`, even if it is no longer the current item.
    fn clear_audio_mix(&self, target: &Self::MixTarget);
}
