//! # audio-tap-core
//!
//! Platform-agnostic audio tap core library.
//!
//! Intercepts a player's audio track mid-playback through a processing tap,
//! converts every delivered buffer to a fixed PCM format, stamps it with a
//! monotonic host time and forwards it to a recorder sink. Playback backends
//! implement the `TapSource` trait and host the `ProcessingTap` on their
//! render thread.
//!
//! ## Architecture
//!
//! ```text
//! audio-tap-core (this crate)
//! ├── engine/       ← AudioTapEngine, ErrorSlot
//! ├── models/       ← TapError, TapState, TapConfiguration, formats, buffers
//! ├── processing/   ← PcmConverter, HostClock
//! ├── sinks/        ← ChannelSink
//! ├── tap/          ← ProcessingTap, TapSession, TapDescriptor, AudioMix
//! └── traits/       ← RecorderSink, TapSource, SourceAudio, TapClient, TapObserver
//! ```

pub mod engine;
pub mod models;
pub mod processing;
pub mod sinks;
pub mod tap;
pub mod traits;

// Re-export key types at crate root for convenience.
pub use engine::audio_tap_engine::AudioTapEngine;
pub use engine::error_slot::ErrorSlot;
pub use models::audio_models::{AudioTrack, MediaType, TapDiagnostics};
pub use models::buffer::{
    AudioBufferList, HostTime, MediaTime, PcmBuffer, RawAudioBuffer, TapFlags, TimeRange, TimedAudioBuffer,
};
pub use models::config::{FormatMismatchPolicy, TapConfiguration, TapCreationFlags};
pub use models::error::{TapError, TapErrorRecord};
pub use models::format::{AudioFormatDescriptor, SampleRepresentation, StreamDescription};
pub use models::state::TapState;
pub use processing::converter::PcmConverter;
pub use processing::host_clock::HostClock;
pub use sinks::channel_sink::ChannelSink;
pub use tap::descriptor::TapDescriptor;
pub use tap::mix::{AudioMix, MixInputParameters};
pub use tap::processing_tap::ProcessingTap;
pub use tap::session::TapSession;
pub use traits::recorder_sink::RecorderSink;
pub use traits::tap_client::{BufferDelivery, TapClient};
pub use traits::tap_observer::TapObserver;
pub use traits::tap_source::{PulledAudio, SourceAudio, TapSource};
