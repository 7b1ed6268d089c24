//! Harness configuration
//!
//! Holds the fixed parameters of one round-trip run. Can be loaded from a
//! JSON file; missing fields fall back to the defaults below.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;

pub const DEFAULT_SAMPLE_RATE: u32 = 48000;
pub const DEFAULT_FRAME_DURATION_US: u32 = 10000;
pub const DEFAULT_CHANNEL_COUNT: u16 = 1;
pub const DEFAULT_DROP_INTERVAL: u32 = 20;
pub const DEFAULT_AUDIO_DURATION_SECONDS: u32 = 10;
pub const DEFAULT_OUTPUT_PATH: &str = "plc_test.wav";

fn default_sample_rate() -> u32 {
    DEFAULT_SAMPLE_RATE
}

fn default_frame_duration_us() -> u32 {
    DEFAULT_FRAME_DURATION_US
}

fn default_channel_count() -> u16 {
    DEFAULT_CHANNEL_COUNT
}

fn default_drop_interval() -> u32 {
    DEFAULT_DROP_INTERVAL
}

fn default_audio_duration_seconds() -> u32 {
    DEFAULT_AUDIO_DURATION_SECONDS
}

fn default_output_path() -> PathBuf {
    PathBuf::from(DEFAULT_OUTPUT_PATH)
}

/// Errors loading or validating a configuration
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read config {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse config {}: {source}", .path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("{0}")]
    Invalid(String),
}

/// Parameters of a round-trip run
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HarnessConfig {
    /// Output and codec sample rate in Hz
    #[serde(default = "default_sample_rate")]
    pub sample_rate_hz: u32,
    /// Codec frame duration in microseconds
    #[serde(default = "default_frame_duration_us")]
    pub frame_duration_us: u32,
    #[serde(default = "default_channel_count")]
    pub channel_count: u16,
    /// Drop one frame in every N (0 = no loss)
    #[serde(default = "default_drop_interval")]
    pub drop_interval: u32,
    /// Length of generated audio in seconds
    #[serde(default = "default_audio_duration_seconds")]
    pub audio_duration_seconds: u32,
    /// WAV file receiving the decoded audio
    #[serde(default = "default_output_path")]
    pub output_path: PathBuf,
}

impl Default for HarnessConfig {
    fn default() -> Self {
        Self {
            sample_rate_hz: default_sample_rate(),
            frame_duration_us: default_frame_duration_us(),
            channel_count: default_channel_count(),
            drop_interval: default_drop_interval(),
            audio_duration_seconds: default_audio_duration_seconds(),
            output_path: default_output_path(),
        }
    }
}

impl HarnessConfig {
    /// Load a config file, failing on unreadable or malformed input
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let config: Self = serde_json::from_str(&contents).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })?;
        tracing::info!(path = %path.display(), "Loaded config from disk");
        Ok(config)
    }

    /// Save config as pretty JSON, creating parent directories if needed
    pub fn save(&self, path: &Path) -> Result<(), ConfigError> {
        let io_err = |source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        };
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).map_err(io_err)?;
        }
        let json = serde_json::to_string_pretty(self).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })?;
        std::fs::write(path, json).map_err(io_err)?;
        tracing::info!(path = %path.display(), "Config saved to disk");
        Ok(())
    }

    /// Reject values no codec could run with
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.sample_rate_hz == 0 {
            return Err(ConfigError::Invalid("sample_rate_hz must be non-zero".into()));
        }
        if self.frame_duration_us == 0 {
            return Err(ConfigError::Invalid(
                "frame_duration_us must be non-zero".into(),
            ));
        }
        if self.channel_count == 0 {
            return Err(ConfigError::Invalid("channel_count must be non-zero".into()));
        }
        if self.audio_duration_seconds == 0 {
            return Err(ConfigError::Invalid(
                "audio_duration_seconds must be non-zero".into(),
            ));
        }
        if self.output_path.as_os_str().is_empty() {
            return Err(ConfigError::Invalid("output_path must not be empty".into()));
        }
        if crate::audio::wav::data_bytes(self.channel_count, self.target_samples()).is_none() {
            return Err(ConfigError::Invalid(format!(
                "{} s of {} channel audio at {} Hz exceeds the 4 GiB WAV limit",
                self.audio_duration_seconds, self.channel_count, self.sample_rate_hz
            )));
        }
        Ok(())
    }

    /// Samples per channel the run has to produce
    pub fn target_samples(&self) -> u64 {
        u64::from(self.sample_rate_hz) * u64::from(self.audio_duration_seconds)
    }
}
