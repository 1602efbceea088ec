use serde::{Deserialize, Serialize};

/// Media type of a track in the player's current asset.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MediaType {
    Audio,
    Video,
}

/// A track of the player's current asset.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct AudioTrack {
    pub id: u32,
    pub media_type: MediaType,
    pub label: String,
}

impl AudioTrack {
    pub fn audio(id: u32, label: impl Into<String>) -> Self {
        Self {
            id,
            media_type: MediaType::Audio,
            label: label.into(),
        }
    }

    pub fn is_audio(&self) -> bool {
        self.media_type == MediaType::Audio
    }
}

/// Counters for debugging tap sessions.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TapDiagnostics {
    pub sessions_created: u64,
    pub sessions_finalized: u64,
    pub process_cycles: u64,
    pub buffers_forwarded: u64,
    pub buffers_discarded: u64,
    pub frames_forwarded: u64,
    pub pull_failures: u64,
    pub conversion_failures: u64,
}
