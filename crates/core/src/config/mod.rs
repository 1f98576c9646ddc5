use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::{LineVizError, Result};

/// Top-level configuration structure for the application.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    pub audio: AudioConfig,
}

impl AppConfig {
    pub fn from_json(json: &str) -> Result<Self> {
        serde_json::from_str(json).map_err(|err| LineVizError::Load(err.to_string()))
    }

    pub fn to_json(&self) -> Result<String> {
        serde_json::to_string_pretty(self).map_err(|err| LineVizError::Load(err.to_string()))
    }

    pub fn load(path: &Path) -> Result<Self> {
        let json = std::fs::read_to_string(path)?;
        Self::from_json(&json)
    }
}

/// Configuration specific to the audio subsystem.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AudioConfig {
    pub sample_rate: u32,
    pub block_size: usize,
}

impl Default for AudioConfig {
    fn default() -> Self {
        Self {
            sample_rate: 48_000,
            block_size: 1024,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_round_trip_through_json() {
        let config = AppConfig::default();
        let json = config.to_json().unwrap();
        let restored = AppConfig::from_json(&json).unwrap();
        assert_eq!(restored.audio.sample_rate, 48_000);
        assert_eq!(restored.audio.block_size, 1024);
    }

    #[test]
    fn malformed_json_is_a_load_error() {
        let err = AppConfig::from_json("{not json").unwrap_err();
        assert!(matches!(err, LineVizError::Load(_)));
    }
}
