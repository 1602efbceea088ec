use std::sync::atomic::{AtomicU64, Ordering};

use parking_lot::Mutex;
use uuid::Uuid;

use audio_tap_core::models::audio_models::AudioTrack;
use audio_tap_core::models::buffer::{AudioBufferList, MediaTime};
use audio_tap_core::models::error::TapError;
use audio_tap_core::models::config::TapCreationFlags;
use audio_tap_core::models::format::{AudioFormatDescriptor, SampleRepresentation, StreamDescription};
use audio_tap_core::tap::descriptor::TapDescriptor;
use audio_tap_core::tap::mix::AudioMix;
use audio_tap_core::tap::processing_tap::ProcessingTap;
use audio_tap_core::traits::tap_source::{PulledAudio, SourceAudio};

use crate::generator::ToneGenerator;

/// Largest cycle the pipeline announces when preparing a tap.
pub const MAX_FRAMES_PER_CYCLE: u32 = 4096;

/// A playable item: its tracks, its decoded audio and the mix applied to it.
///
/// The mix lock is held for the whole of a render cycle, so replacing the mix
/// waits for any cycle in flight and the outgoing tap is never dropped mid-process.
pub struct PlayerItem {
    tracks: Vec<AudioTrack>,
    audio: Mutex<ToneGenerator>,
    mix: Mutex<Option<AppliedMix>>,
    tap_creation_status: Mutex<Option<i32>>,
    stream_description: Mutex<Option<StreamDescription>>,
    mix_changes: AtomicU64,
}

struct AppliedMix {
    mix: AudioMix,
    /// Prepare runs once per hosted tap, whether or not it succeeds.
    prepare_attempted: bool,
}

impl PlayerItem {
    pub fn new(tracks: Vec<AudioTrack>, audio: ToneGenerator) -> Self {
        Self {
            tracks,
            audio: Mutex::new(audio),
            mix: Mutex::new(None),
            tap_creation_status: Mutex::new(None),
            stream_description: Mutex::new(None),
            mix_changes: AtomicU64::new(0),
        }
    }

    /// Item with a single audio track playing `audio`.
    pub fn with_audio(audio: ToneGenerator) -> Self {
        Self::new(vec![AudioTrack::audio(1, "Main Audio")], audio)
    }

    pub fn tracks(&self) -> &[AudioTrack] {
        &self.tracks
    }

    pub fn native_format(&self) -> AudioFormatDescriptor {
        *self.audio.lock().format()
    }

    /// Make every tap creation on this item fail with `status` until cleared.
    pub fn fail_tap_creation(&self, status: Option<i32>) {
        *self.tap_creation_status.lock() = status;
    }

    /// Make the next `count` source pulls fail with `status`.
    pub fn fail_next_pulls(&self, count: u32, status: i32) {
        self.audio.lock().fail_next_pulls(count, status);
    }

    /// Hand taps `description` at prepare instead of the native format.
    pub fn set_stream_description(&self, description: Option<StreamDescription>) {
        *self.stream_description.lock() = description;
    }

    pub fn create_tap(&self, descriptor: TapDescriptor) -> Result<ProcessingTap, TapError> {
        if let Some(status) = *self.tap_creation_status.lock() {
            return Err(TapError::TapCreationFailed(status));
        }
        ProcessingTap::create(descriptor)
    }

    /// Replace the applied mix. The outgoing tap is unprepared and finalized.
    pub fn set_audio_mix(&self, mix: Option<AudioMix>) {
        let incoming = mix.map(|mix| AppliedMix {
            mix,
            prepare_attempted: false,
        });
        let previous = std::mem::replace(&mut *self.mix.lock(), incoming);
        self.mix_changes.fetch_add(1, Ordering::Relaxed);
        if let Some(previous) = previous {
            log::debug!("replacing audio mix with {} input(s)", previous.mix.input_parameters.len());
        }
    }

    /// Number of times a mix (or `None`) has been applied.
    pub fn mix_changes(&self) -> u64 {
        self.mix_changes.load(Ordering::Relaxed)
    }

    /// Session of the tap currently hosted by the applied mix.
    pub fn active_session(&self) -> Option<Uuid> {
        self.mix
            .lock()
            .as_mut()
            .and_then(|applied| applied.mix.tap_mut())
            .map(|tap| tap.session_id())
    }

    pub fn mix_volume(&self) -> Option<f32> {
        self.mix
            .lock()
            .as_ref()
            .and_then(|applied| applied.mix.input_parameters.first())
            .map(|params| params.volume_at(MediaTime::default()))
    }

    /// Run one render cycle of `requested_frames` frames.
    ///
    /// Without a tap the source is pulled directly. A tap is prepared on its
    /// first cycle with the item's native format. The mix volume scales the
    /// audio before a post-effects tap sees it and after a pre-effects tap.
    pub fn render(&self, requested_frames: u32) -> Result<PulledAudio, TapError> {
        let native = self.native_format();
        let mut io = AudioBufferList::allocate(&native, requested_frames as usize);

        let mut mix = self.mix.lock();
        let mut audio = self.audio.lock();
        let Some(applied) = mix.as_mut() else {
            return audio.pull(requested_frames, &mut io);
        };

        let now = MediaTime::new(audio.position(), native.sample_rate.round() as i32);
        let volume = applied
            .mix
            .input_parameters
            .first()
            .map(|params| params.volume_at(now))
            .unwrap_or(1.0);

        let Some(tap) = applied.mix.tap_mut() else {
            let pulled = audio.pull(requested_frames, &mut io)?;
            apply_volume(&mut io, &native, pulled.frames, volume);
            return Ok(pulled);
        };

        if !applied.prepare_attempted {
            applied.prepare_attempted = true;
            let description = self
                .stream_description
                .lock()
                .unwrap_or_else(|| StreamDescription::from_format(&native));
            if let Err(e) = tap.prepare(MAX_FRAMES_PER_CYCLE, &description) {
                log::warn!("tap session {} left unprepared: {}", tap.session_id(), e);
            }
        }

        match tap.flags() {
            TapCreationFlags::PostEffects => {
                let mut scaled = ScaledSource {
                    inner: &mut *audio,
                    format: native,
                    volume,
                };
                tap.process(requested_frames, &mut scaled, &mut io)
            }
            TapCreationFlags::PreEffects => {
                let pulled = tap.process(requested_frames, &mut *audio as &mut dyn SourceAudio, &mut io)?;
                apply_volume(&mut io, &native, pulled.frames, volume);
                Ok(pulled)
            }
        }
    }
}

/// Source audio with the mix volume already applied.
struct ScaledSource<'a> {
    inner: &'a mut ToneGenerator,
    format: AudioFormatDescriptor,
    volume: f32,
}

impl SourceAudio for ScaledSource<'_> {
    fn pull(&mut self, requested_frames: u32, io: &mut AudioBufferList) -> Result<PulledAudio, TapError> {
        let pulled = self.inner.pull(requested_frames, io)?;
        apply_volume(io, &self.format, pulled.frames, self.volume);
        Ok(pulled)
    }
}

/// Scale the first `frames` frames of every buffer in `io` by `volume`.
fn apply_volume(io: &mut AudioBufferList, format: &AudioFormatDescriptor, frames: u32, volume: f32) {
    if volume == 1.0 {
        return;
    }
    let per_sample = format.representation.bytes_per_sample();
    let bytes = frames as usize * format.bytes_per_frame();
    for buffer in &mut io.buffers {
        let end = bytes.min(buffer.data.len());
        for sample in buffer.data[..end].chunks_exact_mut(per_sample) {
            match format.representation {
                SampleRepresentation::Float32 => {
                    if let Ok(raw) = <[u8; 4]>::try_from(&*sample) {
                        sample.copy_from_slice(&(f32::from_ne_bytes(raw) * volume).to_ne_bytes());
                    }
                }
                SampleRepresentation::Int16 => {
                    if let Ok(raw) = <[u8; 2]>::try_from(&*sample) {
                        let value = (i16::from_ne_bytes(raw) as f32 * volume).round() as i16;
                        sample.copy_from_slice(&value.to_ne_bytes());
                    }
                }
            }
        }
    }
}

impl std::fmt::Debug for PlayerItem {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PlayerItem")
            .field("tracks", &self.tracks)
            .field("mix_changes", &self.mix_changes())
            .finish()
    }
}
