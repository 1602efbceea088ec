use std::path::Path;

use serde::{Deserialize, Serialize};

use super::error::TapError;
use super::format::AudioFormatDescriptor;

/// Where in the pipeline the tap sits relative to the item's audio effects.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TapCreationFlags {
    PreEffects,
    #[default]
    PostEffects,
}

/// What to do when the negotiated processing format differs from the target.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FormatMismatchPolicy {
    /// Drop the buffer and publish a `FormatMismatch` error.
    #[default]
    Reject,
    /// Linear resampling per channel; mono sources are duplicated to stereo.
    Resample,
}

/// Configuration for an audio tap engine.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TapConfiguration {
    /// Format delivered to the sink (default: 44.1 kHz, 2 ch, planar f32).
    pub target_format: AudioFormatDescriptor,

    /// Tap placement requested at creation (default: post-effects).
    pub creation_flags: TapCreationFlags,

    /// Volume applied at time zero on the tapped track (default: 1.0).
    pub mix_volume: f32,

    pub mismatch_policy: FormatMismatchPolicy,

    /// Pending records per error subscriber before new ones are dropped.
    pub error_channel_capacity: usize,
}

impl TapConfiguration {
    pub fn validate(&self) -> Result<(), String> {
        if self.target_format.sample_rate <= 0.0 {
            return Err("sample rate must be positive".into());
        }
        if ![1, 2].contains(&self.target_format.channels) {
            return Err(format!("unsupported channel count: {}", self.target_format.channels));
        }
        if !self.target_format.is_standard() {
            return Err("target format must be planar 32-bit float".into());
        }
        if !(0.0..=1.0).contains(&self.mix_volume) {
            return Err(format!("mix volume out of range: {}", self.mix_volume));
        }
        if self.error_channel_capacity == 0 {
            return Err("error channel capacity must be non-zero".into());
        }
        Ok(())
    }

    pub fn from_json_str(json: &str) -> Result<Self, TapError> {
        let config: Self = serde_json::from_str(json)
            .map_err(|e| TapError::ConfigurationFailed(format!("invalid configuration JSON: {}", e)))?;
        config.validate().map_err(TapError::ConfigurationFailed)?;
        Ok(config)
    }

    pub fn from_json_file(path: &Path) -> Result<Self, TapError> {
        let json = std::fs::read_to_string(path).map_err(|e| {
            TapError::ConfigurationFailed(format!("failed to read {}: {}", path.display(), e))
        })?;
        Self::from_json_str(&json)
    }
}

impl Default for TapConfiguration {
    fn default() -> Self {
        Self {
            target_format: AudioFormatDescriptor::default(),
            creation_flags: TapCreationFlags::PostEffects,
            mix_volume: 1.0,
            mismatch_policy: FormatMismatchPolicy::Reject,
            error_channel_capacity: 16,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::format::SampleRepresentation;

    #[test]
    fn default_is_valid() {
        assert!(TapConfiguration::default().validate().is_ok());
    }

    #[test]
    fn rejects_interleaved_target() {
        let config = TapConfiguration {
            target_format: AudioFormatDescriptor {
                interleaved: true,
                ..AudioFormatDescriptor::default()
            },
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn rejects_integer_target() {
        let config = TapConfiguration {
            target_format: AudioFormatDescriptor {
                representation: SampleRepresentation::Int16,
                ..AudioFormatDescriptor::default()
            },
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn rejects_bad_volume_and_capacity() {
        let loud = TapConfiguration {
            mix_volume: 1.5,
            ..Default::default()
        };
        assert!(loud.validate().is_err());

        let no_capacity = TapConfiguration {
            error_channel_capacity: 0,
            ..Default::default()
        };
        assert!(no_capacity.validate().is_err());
    }

    #[test]
    fn partial_json_falls_back_to_defaults() {
        let config = TapConfiguration::from_json_str(r#"{ "mismatch_policy": "resample" }"#).unwrap();
        assert_eq!(config.mismatch_policy, FormatMismatchPolicy::Resample);
        assert_eq!(config.target_format, AudioFormatDescriptor::default());
        assert_eq!(config.creation_flags, TapCreationFlags::PostEffects);
    }

    #[test]
    fn json_with_invalid_values_is_rejected() {
        let err = TapConfiguration::from_json_str(r#"{ "mix_volume": -1.0 }"#).unwrap_err();
        assert!(matches!(err, TapError::ConfigurationFailed(_)));

        let err = TapConfiguration::from_json_str("not json").unwrap_err();
        assert!(matches!(err, TapError::ConfigurationFailed(_)));
    }

    #[test]
    fn serializes_enums_in_snake_case() {
        let json = serde_json::to_string(&TapConfiguration::default()).unwrap();
        assert!(json.contains("\"post_effects\""));
        assert!(json.contains("\"reject\""));
        assert!(json.contains("\"float32\""));
    }

    #[test]
    fn missing_file_is_configuration_error() {
        let err = TapConfiguration::from_json_file(Path::new("/nonexistent/tap.json")).unwrap_err();
        assert!(matches!(err, TapError::ConfigurationFailed(_)));
    }
}
