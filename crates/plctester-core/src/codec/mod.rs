//! Codec interface used by the round-trip driver
//!
//! A [`Codec`] negotiates the frame layout for a rate/duration pair and
//! opens independent encode and decode sessions. Lost frames reach the
//! decoder as [`Payload::Lost`], which is never confused with an empty or
//! malformed payload.
//!
//! Implementations:
//! - G.711 companding with frame-repeat concealment ([`g711`])
//! - Frame-repeat/fadeout concealment state ([`plc`])

pub mod g711;
pub mod plc;

use thiserror::Error;

/// Errors reported by codec setup, encode or decode
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CodecError {
    #[error("Unsupported sample rate: {0} Hz")]
    UnsupportedSampleRate(u32),

    #[error("Unsupported frame duration {duration_us} us at {sample_rate} Hz")]
    UnsupportedFrameDuration { duration_us: u32, sample_rate: u32 },

    #[error("Unsupported channel count: {0}")]
    UnsupportedChannelCount(u16),

    #[error("Invalid frame size: expected {expected}, got {actual}")]
    InvalidFrameSize { expected: usize, actual: usize },

    #[error("Invalid frame layout: {0}")]
    InvalidFrameLayout(String),
}

/// Fixed per-run frame layout negotiated with the codec
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FrameConfig {
    sample_rate: u32,
    frame_duration_us: u32,
    channels: u16,
    samples_per_frame: usize,
    octets_per_frame: usize,
}

impl FrameConfig {
    /// Build a layout, rejecting zero-sized frames or buffers
    pub fn new(
        sample_rate: u32,
        frame_duration_us: u32,
        channels: u16,
        samples_per_frame: usize,
        octets_per_frame: usize,
    ) -> Result<Self, CodecError> {
        if channels == 0 {
            return Err(CodecError::UnsupportedChannelCount(channels));
        }
        if samples_per_frame == 0 || octets_per_frame == 0 {
            return Err(CodecError::InvalidFrameLayout(format!(
                "{} samples / {} octets per frame",
                samples_per_frame, octets_per_frame
            )));
        }

        Ok(Self {
            sample_rate,
            frame_duration_us,
            channels,
            samples_per_frame,
            octets_per_frame,
        })
    }

    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    pub fn frame_duration_us(&self) -> u32 {
        self.frame_duration_us
    }

    pub fn channels(&self) -> u16 {
        self.channels
    }

    /// Samples per channel in one frame
    pub fn samples_per_frame(&self) -> usize {
        self.samples_per_frame
    }

    /// Encoded frame size in bytes
    pub fn octets_per_frame(&self) -> usize {
        self.octets_per_frame
    }

    /// Interleaved PCM buffer length for one frame
    pub fn pcm_len(&self) -> usize {
        self.samples_per_frame * usize::from(self.channels)
    }
}

/// Decoder input for one frame
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Payload<'a> {
    /// The encoded frame arrived
    Delivered(&'a [u8]),
    /// The frame was lost; run concealment
    Lost,
}

impl Payload<'_> {
    pub fn is_lost(&self) -> bool {
        matches!(self, Payload::Lost)
    }
}

/// Encode session for one stream
pub trait FrameEncoder {
    /// Encode one interleaved PCM frame into exactly `octets_per_frame` bytes
    fn encode(&mut self, pcm: &[i16], out: &mut [u8]) -> Result<(), CodecError>;
}

/// Decode session for one stream
pub trait FrameDecoder {
    /// Decode (or conceal) one frame into an interleaved PCM buffer
    fn decode(&mut self, payload: Payload<'_>, pcm: &mut [i16]) -> Result<(), CodecError>;
}

/// Audio codec with packet-loss concealment
pub trait Codec {
    type Encoder: FrameEncoder;
    type Decoder: FrameDecoder;

    /// Short codec name for logs and reports
    fn name(&self) -> &'static str;

    /// Report the frame layout for the given parameters
    fn negotiate(
        &self,
        frame_duration_us: u32,
        sample_rate: u32,
        channels: u16,
    ) -> Result<FrameConfig, CodecError>;

    fn open_encoder(&self, config: &FrameConfig) -> Result<Self::Encoder, CodecError>;

    fn open_decoder(&self, config: &FrameConfig) -> Result<Self::Decoder, CodecError>;
}

/// Check a buffer against the length a frame layout requires
pub(crate) fn check_len(expected: usize, actual: usize) -> Result<(), CodecError> {
    if expected == actual {
        Ok(())
    } else {
        Err(CodecError::InvalidFrameSize { expected, actual })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_frame_config_lengths() {
        let config = FrameConfig::new(48000, 10000, 2, 480, 960).unwrap();
        assert_eq!(config.pcm_len(), 960);
        assert_eq!(config.octets_per_frame(), 960);
        assert_eq!(config.channels(), 2);
    }

    #[test]
    fn test_frame_config_rejects_empty_layout() {
        assert!(matches!(
            FrameConfig::new(48000, 10000, 1, 0, 155),
            Err(CodecError::InvalidFrameLayout(_))
        ));
        assert!(matches!(
            FrameConfig::new(48000, 10000, 0, 480, 155),
            Err(CodecError::UnsupportedChannelCount(0))
        ));
    }

    #[test]
    fn test_lost_payload_differs_from_empty() {
        assert!(Payload::Lost.is_lost());
        assert!(!Payload::Delivered(&[]).is_lost());
        assert_ne!(Payload::Lost, Payload::Delivered(&[]));
    }
}
