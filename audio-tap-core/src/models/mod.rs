pub mod audio_models;
pub mod buffer;
pub mod config;
pub mod error;
pub mod format;
pub mod state;
