//! E2E tests for fatal error paths
//!
//! Every failure must abort the run, surface a distinct error and leave the
//! driver in the failed state.

use plctester::audio::wav::AudioSink;
use plctester::codec::{Codec, CodecError, FrameConfig, FrameDecoder, FrameEncoder, Payload};
use plctester::{DriverState, G711Codec, HarnessConfig, HarnessError, RoundTripDriver};
use std::cell::Cell;
use std::io::{self, Write};
use std::rc::Rc;
use std::sync::{Arc, Mutex};

/// Sink that accepts `limit` writes and then fails
struct FlakySink {
    limit: usize,
    writes: usize,
    samples: u64,
    finalized: Rc<Cell<bool>>,
}

impl AudioSink for FlakySink {
    type Output = usize;

    fn write_samples(&mut self, samples: &[i16]) -> io::Result<()> {
        if self.writes == self.limit {
            return Err(io::Error::other("disk full"));
        }
        self.writes += 1;
        self.samples += samples.len() as u64;
        Ok(())
    }

    fn total_samples(&self) -> u64 {
        self.samples
    }

    fn finalize(self) -> io::Result<usize> {
        self.finalized.set(true);
        Ok(self.writes)
    }
}

/// Codec whose encoder or decoder breaks on a given frame
#[derive(Clone, Copy)]
struct BrokenCodec {
    fail_encode_at: Option<u64>,
    fail_decode_at: Option<u64>,
}

struct BrokenEncoder {
    fail_at: Option<u64>,
    frame: u64,
}

struct BrokenDecoder {
    fail_at: Option<u64>,
    frame: u64,
}

impl Codec for BrokenCodec {
    type Encoder = BrokenEncoder;
    type Decoder = BrokenDecoder;

    fn name(&self) -> &'static str {
        "broken"
    }

    fn negotiate(
        &self,
        frame_duration_us: u32,
        sample_rate: u32,
        channels: u16,
    ) -> Result<FrameConfig, CodecError> {
        G711Codec::mu_law().negotiate(frame_duration_us, sample_rate, channels)
    }

    fn open_encoder(&self, _config: &FrameConfig) -> Result<BrokenEncoder, CodecError> {
        Ok(BrokenEncoder {
            fail_at: self.fail_encode_at,
            frame: 0,
        })
    }

    fn open_decoder(&self, _config: &FrameConfig) -> Result<BrokenDecoder, CodecError> {
        Ok(BrokenDecoder {
            fail_at: self.fail_decode_at,
            frame: 0,
        })
    }
}

impl FrameEncoder for BrokenEncoder {
    fn encode(&mut self, pcm: &[i16], _out: &mut [u8]) -> Result<(), CodecError> {
        self.frame += 1;
        if Some(self.frame) == self.fail_at {
            return Err(CodecError::InvalidFrameSize {
                expected: 0,
                actual: pcm.len(),
            });
        }
        Ok(())
    }
}

impl FrameDecoder for BrokenDecoder {
    fn decode(&mut self, _payload: Payload<'_>, pcm: &mut [i16]) -> Result<(), CodecError> {
        self.frame += 1;
        if Some(self.frame) == self.fail_at {
            return Err(CodecError::InvalidFrameLayout("corrupt state".into()));
        }
        pcm.fill(0);
        Ok(())
    }
}

fn short_config() -> HarnessConfig {
    HarnessConfig {
        sample_rate_hz: 8000,
        frame_duration_us: 20000,
        audio_duration_seconds: 1,
        ..Default::default()
    }
}

fn flaky(
    limit: usize,
    finalized: &Rc<Cell<bool>>,
) -> impl FnOnce(u16, u32) -> io::Result<FlakySink> {
    let finalized = Rc::clone(finalized);
    move |_, _| {
        Ok(FlakySink {
            limit,
            writes: 0,
            samples: 0,
            finalized,
        })
    }
}

#[test]
fn test_sink_write_failure_aborts() {
    let finalized = Rc::new(Cell::new(false));
    let mut driver = RoundTripDriver::new(G711Codec::mu_law(), short_config()).unwrap();

    let err = driver.run_with_sink(flaky(10, &finalized)).unwrap_err();

    assert!(matches!(err, HarnessError::SinkWriteFailed { frame: 11, .. }));
    assert_eq!(err.frame(), Some(11));
    assert_eq!(driver.state(), DriverState::Failed);
    assert!(!finalized.get(), "failed runs must not finalize the output");
}

#[test]
fn test_sink_completes_when_healthy() {
    let finalized = Rc::new(Cell::new(false));
    let mut driver = RoundTripDriver::new(G711Codec::mu_law(), short_config()).unwrap();

    let (report, writes) = driver.run_with_sink(flaky(usize::MAX, &finalized)).unwrap();

    assert_eq!(writes, 50);
    assert_eq!(report.total_samples, 8000);
    assert!(finalized.get());
}

#[test]
fn test_encode_failure_aborts() {
    let codec = BrokenCodec {
        fail_encode_at: Some(3),
        fail_decode_at: None,
    };
    let finalized = Rc::new(Cell::new(false));
    let mut driver = RoundTripDriver::new(codec, short_config()).unwrap();

    let err = driver.run_with_sink(flaky(usize::MAX, &finalized)).unwrap_err();

    assert!(matches!(err, HarnessError::CodecEncodeFailed { frame: 3, .. }));
    assert_eq!(driver.state(), DriverState::Failed);
    assert!(!finalized.get());
}

#[test]
fn test_decode_failure_aborts() {
    let codec = BrokenCodec {
        fail_encode_at: None,
        fail_decode_at: Some(20),
    };
    let finalized = Rc::new(Cell::new(false));
    let mut driver = RoundTripDriver::new(codec, short_config()).unwrap();

    let err = driver.run_with_sink(flaky(usize::MAX, &finalized)).unwrap_err();

    assert!(matches!(err, HarnessError::CodecDecodeFailed { frame: 20, .. }));
    assert!(!finalized.get());
}

#[test]
fn test_unsupported_configuration_is_setup_failure() {
    let config = HarnessConfig {
        sample_rate_hz: 44100,
        frame_duration_us: 7500,
        ..short_config()
    };
    let finalized = Rc::new(Cell::new(false));
    let mut driver = RoundTripDriver::new(G711Codec::mu_law(), config).unwrap();

    let err = driver.run_with_sink(flaky(usize::MAX, &finalized)).unwrap_err();

    assert!(matches!(
        err,
        HarnessError::CodecSetupFailed(CodecError::UnsupportedFrameDuration { .. })
    ));
    assert_eq!(driver.state(), DriverState::Failed);
}

#[test]
fn test_driver_recovers_after_failure() {
    let finalized = Rc::new(Cell::new(false));
    let mut driver = RoundTripDriver::new(G711Codec::mu_law(), short_config()).unwrap();

    assert!(driver.run_with_sink(flaky(5, &finalized)).is_err());
    assert_eq!(driver.state(), DriverState::Failed);

    let (report, _) = driver.run_with_sink(flaky(usize::MAX, &finalized)).unwrap();
    assert_eq!(driver.state(), DriverState::Finished);
    assert_eq!(report.frames_encoded, 50);
    assert_eq!(report.lost_frames, vec![20, 40]);
}

/// Log writer collecting formatted events into a shared buffer
#[derive(Clone, Default)]
struct CapturedLog(Arc<Mutex<Vec<u8>>>);

impl Write for CapturedLog {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.0.lock().unwrap().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

/// A failed run is reported by exactly one error event carrying the frame
#[test]
fn test_failure_logged_once() {
    let log = CapturedLog::default();
    let writer = log.clone();
    let subscriber = tracing_subscriber::fmt()
        .with_writer(move || writer.clone())
        .with_ansi(false)
        .with_max_level(tracing::Level::ERROR)
        .finish();

    let finalized = Rc::new(Cell::new(false));
    let mut driver = RoundTripDriver::new(G711Codec::mu_law(), short_config()).unwrap();
    tracing::subscriber::with_default(subscriber, || {
        assert!(driver.run_with_sink(flaky(10, &finalized)).is_err());
    });

    let output = String::from_utf8(log.0.lock().unwrap().clone()).unwrap();
    let errors: Vec<&str> = output.lines().filter(|l| l.contains("ERROR")).collect();
    assert_eq!(errors.len(), 1, "log was: {}", output);
    assert!(errors[0].contains("Round trip failed"));
    assert!(errors[0].contains("frame=Some(11)"));
}
