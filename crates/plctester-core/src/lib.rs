//! Plctester Core - Codec round-trip simulation with packet-loss concealment
//!
//! This library drives an audio codec through a deterministic
//! encode → simulated loss → decode loop and writes the decoded audio to a
//! WAV file for inspection. The test tone, the frame cadence and the loss
//! pattern are reproducible sample-for-sample across runs.

pub mod audio;
pub mod codec;
pub mod config;
pub mod driver;
pub mod error;
pub mod report;

pub use audio::{loss::LossScheduler, signal::ToneGenerator, wav::WavWriter};
pub use codec::{g711::G711Codec, Codec, FrameConfig, Payload};
pub use config::HarnessConfig;
pub use driver::{DriverState, RoundTripDriver};
pub use error::HarnessError;
pub use report::RunReport;

/// Application version from Cargo.toml
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Build date stamped by build.rs
pub const BUILD_DATE: &str = env!("BUILD_DATE");

/// Native sample rate of the built-in waveform table
pub const TABLE_SAMPLE_RATE: u32 = 96000;

/// Attenuation divisor applied to every generated sample (-12dB headroom)
pub const SIGNAL_ATTENUATION: i16 = 4;
