//! Encode → simulated loss → decode round-trip loop
//!
//! The driver owns every piece of per-run state: the tone generator, the
//! loss scheduler, the codec sessions, the frame buffers and the audio
//! sink. Each run starts from fresh state, so a driver can be run again
//! and always produces the same output for the same configuration.
//!
//! ## Frame cycle
//!
//! 1. Generate one frame of test tone
//! 2. Encode it into `octets_per_frame` bytes
//! 3. Ask the [`LossScheduler`] whether the frame is dropped
//! 4. Decode the payload, or run concealment for a dropped frame
//! 5. Append the decoded frame to the sink

use crate::audio::loss::LossScheduler;
use crate::audio::signal::ToneGenerator;
use crate::audio::wav::{AudioSink, WavWriter};
use crate::codec::{Codec, FrameConfig, FrameDecoder, FrameEncoder, Payload};
use crate::config::HarnessConfig;
use crate::error::HarnessError;
use crate::report::RunReport;
use chrono::Utc;
use std::io;

/// Driver lifecycle state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DriverState {
    /// Not started yet
    Idle,
    /// Inside the frame loop
    Running,
    /// Last run completed and the output was finalized
    Finished,
    /// Last run aborted on an error
    Failed,
}

/// Runs a codec through the round-trip loop for a fixed configuration
pub struct RoundTripDriver<C: Codec> {
    codec: C,
    config: HarnessConfig,
    state: DriverState,
}

impl<C: Codec> RoundTripDriver<C> {
    /// Create a driver, validating the configuration up front
    pub fn new(codec: C, config: HarnessConfig) -> Result<Self, HarnessError> {
        config.validate()?;
        Ok(Self {
            codec,
            config,
            state: DriverState::Idle,
        })
    }

    pub fn state(&self) -> DriverState {
        self.state
    }

    pub fn config(&self) -> &HarnessConfig {
        &self.config
    }

    pub fn codec(&self) -> &C {
        &self.codec
    }

    /// Run into the WAV file named by `output_path`
    pub fn run(&mut self) -> Result<RunReport, HarnessError> {
        let path = self.config.output_path.clone();
        let (mut report, ()) = self.run_with_sink(|channels, sample_rate| {
            WavWriter::create(&path, channels, sample_rate)
        })?;
        report.output_path = Some(path);
        Ok(report)
    }

    /// Run into a sink produced by `open_sink(channels, sample_rate)`
    ///
    /// Returns the report together with whatever the sink hands back from
    /// [`AudioSink::finalize`].
    pub fn run_with_sink<S, F>(
        &mut self,
        open_sink: F,
    ) -> Result<(RunReport, S::Output), HarnessError>
    where
        S: AudioSink,
        F: FnOnce(u16, u32) -> io::Result<S>,
    {
        self.state = DriverState::Running;
        let result = self.execute(open_sink);

        match &result {
            Ok((report, _)) => {
                self.state = DriverState::Finished;
                tracing::info!(
                    frames = report.frames_encoded,
                    lost = report.frames_lost(),
                    total_samples = report.total_samples,
                    elapsed_ms = report.elapsed_ms(),
                    "Round trip finished"
                );
            }
            Err(e) => {
                self.state = DriverState::Failed;
                tracing::error!(error = %e, frame = ?e.frame(), "Round trip failed");
            }
        }

        result
    }

    fn execute<S, F>(&self, open_sink: F) -> Result<(RunReport, S::Output), HarnessError>
    where
        S: AudioSink,
        F: FnOnce(u16, u32) -> io::Result<S>,
    {
        let started_at = Utc::now();
        let config = &self.config;

        let mut sink = open_sink(config.channel_count, config.sample_rate_hz).map_err(
            |source| HarnessError::SinkOpenFailed {
                path: config.output_path.clone(),
                source,
            },
        )?;

        let frame = self
            .codec
            .negotiate(
                config.frame_duration_us,
                config.sample_rate_hz,
                config.channel_count,
            )
            .map_err(HarnessError::CodecSetupFailed)?;
        let mut encoder = self
            .codec
            .open_encoder(&frame)
            .map_err(HarnessError::CodecSetupFailed)?;
        let mut decoder = self
            .codec
            .open_decoder(&frame)
            .map_err(HarnessError::CodecSetupFailed)?;

        tracing::info!(
            codec = self.codec.name(),
            sample_rate = frame.sample_rate(),
            frame_duration_us = frame.frame_duration_us(),
            channels = frame.channels(),
            samples_per_frame = frame.samples_per_frame(),
            octets_per_frame = frame.octets_per_frame(),
            drop_interval = config.drop_interval,
            seconds = config.audio_duration_seconds,
            "Starting round trip"
        );

        let mut generator = ToneGenerator::for_sample_rate(frame.sample_rate());
        let mut scheduler = LossScheduler::new(config.drop_interval);
        let mut pcm = vec![0i16; frame.pcm_len()];
        let mut encoded = vec![0u8; frame.octets_per_frame()];

        let channels = usize::from(frame.channels());
        let target = config.target_samples();
        let mut generated: u64 = 0;
        let mut frame_index: u64 = 0;
        let expected = expected_frames(config, &frame);
        let mut lost_frames = match config.drop_interval {
            0 => Vec::new(),
            n => Vec::with_capacity((expected / u64::from(n)) as usize),
        };
        tracing::debug!(expected_frames = expected, "Frame loop sized");

        while generated < target {
            frame_index += 1;

            generator.fill_interleaved(&mut pcm, channels);

            encoder
                .encode(&pcm, &mut encoded)
                .map_err(|source| HarnessError::CodecEncodeFailed {
                    frame: frame_index,
                    source,
                })?;

            let payload = if scheduler.on_frame_encoded() {
                tracing::debug!(frame = frame_index, "Concealing dropped frame");
                lost_frames.push(frame_index);
                Payload::Lost
            } else {
                Payload::Delivered(&encoded)
            };

            decoder
                .decode(payload, &mut pcm)
                .map_err(|source| HarnessError::CodecDecodeFailed {
                    frame: frame_index,
                    source,
                })?;

            sink.write_samples(&pcm)
                .map_err(|source| HarnessError::SinkWriteFailed {
                    frame: frame_index,
                    source,
                })?;

            generated += frame.samples_per_frame() as u64;
            tracing::trace!(frame = frame_index, generated, "Frame written");
        }

        let total_samples = sink.total_samples();
        let output = sink.finalize().map_err(HarnessError::SinkFinalizeFailed)?;
        drop(encoder);
        drop(decoder);

        let report = RunReport {
            codec: self.codec.name().to_string(),
            sample_rate_hz: frame.sample_rate(),
            frame_duration_us: frame.frame_duration_us(),
            channel_count: frame.channels(),
            samples_per_frame: frame.samples_per_frame(),
            octets_per_frame: frame.octets_per_frame(),
            drop_interval: config.drop_interval,
            frames_encoded: frame_index,
            lost_frames,
            total_samples,
            output_path: None,
            started_at,
            finished_at: Utc::now(),
        };

        Ok((report, output))
    }
}

/// Frames a run of `config` produces for a negotiated layout
pub fn expected_frames(config: &HarnessConfig, frame: &FrameConfig) -> u64 {
    config
        .target_samples()
        .div_ceil(frame.samples_per_frame() as u64)
}
