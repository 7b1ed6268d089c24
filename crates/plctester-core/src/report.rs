//! Summary of a completed round-trip run

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Outcome of one driver run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunReport {
    /// Codec name as reported by the codec
    pub codec: String,
    pub sample_rate_hz: u32,
    pub frame_duration_us: u32,
    pub channel_count: u16,
    /// Negotiated samples per channel per frame
    pub samples_per_frame: usize,
    /// Negotiated encoded frame size
    pub octets_per_frame: usize,
    pub drop_interval: u32,
    /// Frames that went through the encoder
    pub frames_encoded: u64,
    /// 1-based indices of frames decoded through concealment
    pub lost_frames: Vec<u64>,
    /// Samples per channel written to the output
    pub total_samples: u64,
    /// WAV file written, when the run targeted a file
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub output_path: Option<PathBuf>,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
}

impl RunReport {
    pub fn frames_lost(&self) -> u64 {
        self.lost_frames.len() as u64
    }

    /// Fraction of frames concealed (0.0 to 1.0)
    pub fn loss_ratio(&self) -> f64 {
        if self.frames_encoded == 0 {
            0.0
        } else {
            self.frames_lost() as f64 / self.frames_encoded as f64
        }
    }

    /// Seconds of audio written
    pub fn audio_seconds(&self) -> f64 {
        if self.sample_rate_hz == 0 {
            0.0
        } else {
            self.total_samples as f64 / f64::from(self.sample_rate_hz)
        }
    }

    /// Wall-clock duration of the run in milliseconds
    pub fn elapsed_ms(&self) -> i64 {
        (self.finished_at - self.started_at).num_milliseconds()
    }

    /// Write the report as pretty JSON
    pub fn save_json(&self, path: &Path) -> std::io::Result<()> {
        let json = serde_json::to_string_pretty(self)?;
        std::fs::write(path, json)
    }
}
