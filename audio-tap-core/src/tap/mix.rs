use crate::models::audio_models::AudioTrack;
use crate::models::buffer::MediaTime;

use super::processing_tap::ProcessingTap;

/// Volume applied to a track from `at` onwards.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct VolumePoint {
    pub volume: f32,
    pub at: MediaTime,
}

/// Per-track mix settings: volume ramp and an optional processing tap.
#[derive(Debug)]
pub struct MixInputParameters {
    pub track: AudioTrack,
    pub volume_points: Vec<VolumePoint>,
    pub tap: Option<ProcessingTap>,
}

impl MixInputParameters {
    pub fn new(track: AudioTrack) -> Self {
        Self {
            track,
            volume_points: Vec::new(),
            tap: None,
        }
    }

    /// Set the volume from `at` onwards, replacing any point at the same time.
    pub fn set_volume(&mut self, volume: f32, at: MediaTime) {
        self.volume_points.retain(|p| p.at != at);
        self.volume_points.push(VolumePoint { volume, at });
        self.volume_points
            .sort_by(|a, b| a.at.seconds().partial_cmp(&b.at.seconds()).unwrap_or(std::cmp::Ordering::Equal));
    }

    /// Volume in effect at `time` (1.0 before the first point).
    pub fn volume_at(&self, time: MediaTime) -> f32 {
        self.volume_points
            .iter()
            .take_while(|p| p.at.seconds() <= time.seconds())
            .last()
            .map(|p| p.volume)
            .unwrap_or(1.0)
    }

    pub fn set_tap(&mut self, tap: ProcessingTap) {
        self.tap = Some(tap);
    }
}

/// Mix configuration applied to a player item.
#[derive(Debug, Default)]
pub struct AudioMix {
    pub input_parameters: Vec<MixInputParameters>,
}

impl AudioMix {
    pub fn new(input_parameters: Vec<MixInputParameters>) -> Self {
        Self { input_parameters }
    }

    /// Parameters for `track`, if the mix has any.
    pub fn parameters_for_mut(&mut self, track: &AudioTrack) -> Option<&mut MixInputParameters> {
        self.input_parameters.iter_mut().find(|p| p.track.id == track.id)
    }

    /// The first tap in the mix, for pipelines that host a single tap.
    pub fn tap_mut(&mut self) -> Option<&mut ProcessingTap> {
        self.input_parameters.iter_mut().find_map(|p| p.tap.as_mut())
    }
}
