use chrono::{DateTime, Utc};
use thiserror::Error;
use uuid::Uuid;

/// Errors that can occur while installing or running an audio tap.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum TapError {
    #[error("player has no current item")]
    NoPlayerItem,

    #[error("no audio track found")]
    NoAudioTrack,

    #[error("creating processing tap failed with status {0}")]
    TapCreationFailed(i32),

    #[error("configuration failed: {0}")]
    ConfigurationFailed(String),

    #[error("getting source audio failed with status {0}")]
    SourcePullFailed(i32),

    #[error("format mismatch: source {source_rate} Hz / {source_channels} ch, target {target_rate} Hz / {target_channels} ch")]
    FormatMismatch {
        source_rate: u32,
        source_channels: u16,
        target_rate: u32,
        target_channels: u16,
    },

    #[error("invalid stream description: {0}")]
    InvalidStreamDescription(String),

    #[error("PCM buffer construction failed: {0}")]
    BufferConstruction(String),

    #[error("sample buffer packaging failed: {0}")]
    SampleBufferPackaging(String),
}

impl TapError {
    /// Setup-time errors: the tap cannot exist for this session.
    ///
    /// Everything else only costs one buffer interval.
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            Self::NoPlayerItem | Self::NoAudioTrack | Self::TapCreationFailed(_) | Self::ConfigurationFailed(_)
        )
    }
}

/// A failure published to the engine's observable error slot.
#[derive(Debug, Clone, PartialEq)]
pub struct TapErrorRecord {
    pub error: TapError,
    /// Session that was active when the failure happened, if any.
    pub session_id: Option<Uuid>,
    pub occurred_at: DateTime<Utc>,
}

impl TapErrorRecord {
    pub fn new(error: TapError, session_id: Option<Uuid>) -> Self {
        Self {
            error,
            session_id,
            occurred_at: Utc::now(),
        }
    }
}
