pub mod audio_tap_engine;
pub mod error_slot;
mod shared;
