//! Plctester - codec round-trip harness with simulated packet loss
//!
//! This library re-exports the simulation loop, test signal, codec and WAV
//! output from `plctester-core`.

pub use plctester_core::{audio, codec, config, driver, error, report};

pub use plctester_core::{
    Codec, DriverState, FrameConfig, G711Codec, HarnessConfig, HarnessError, LossScheduler,
    Payload, RoundTripDriver, RunReport, ToneGenerator, WavWriter,
};
pub use plctester_core::{BUILD_DATE, SIGNAL_ATTENUATION, TABLE_SAMPLE_RATE, VERSION};
