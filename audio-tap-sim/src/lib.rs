//! # audio-tap-sim
//!
//! Software playback backend for audio-tap-kit.
//!
//! Provides:
//! - `ToneGenerator`: Sine source in any native PCM layout, with short reads and pull faults
//! - `PlayerItem`: Tracks, decoded audio and the applied mix; hosts the processing tap
//! - `SimulatedPlayer`: Steps render cycles by hand or on a `playback-render` thread
//! - `PlayerTapSource`: Taps whichever item is current at each call
//! - `ItemTapSource`: Taps one pinned item
//!
//! ## Usage
//! ```ignore
//! use std::sync::Arc;
//! use audio_tap_core::{AudioFormatDescriptor, AudioTapEngine, ChannelSink};
//! use audio_tap_sim::{PlayerItem, PlayerTapSource, SimulatedPlayer, ToneGenerator};
//!
//! let item = PlayerItem::with_audio(ToneGenerator::new(AudioFormatDescriptor::default(), 440.0));
//! let player = Arc::new(SimulatedPlayer::with_item(item, 1024));
//! let engine = AudioTapEngine::with_defaults(PlayerTapSource::new(&player));
//! let (sink, buffers) = ChannelSink::bounded(64);
//! engine.attach_sink(Some(sink))?;
//! player.play()?;
//! ```

pub mod generator;
pub mod item;
pub mod player;
pub mod source;

pub use generator::ToneGenerator;
pub use item::PlayerItem;
pub use player::SimulatedPlayer;
pub use source::{ItemTapSource, PlayerTapSource};
