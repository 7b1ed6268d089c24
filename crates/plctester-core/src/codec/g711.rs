//! G.711 reference codec with frame-repeat concealment
//!
//! Implements μ-law (PCMU) and A-law (PCMA) companding using the classic
//! 16-bit segment search. Each sample maps to one byte, so a frame of
//! `samples_per_frame × channels` samples encodes to as many octets.
//! Lost frames are concealed by [`FrameConcealer`].

use super::plc::FrameConcealer;
use super::{check_len, Codec, CodecError, FrameConfig, FrameDecoder, FrameEncoder, Payload};

/// Sample rates accepted by [`G711Codec::negotiate`]
pub const SUPPORTED_RATES: [u32; 6] = [8000, 16000, 24000, 32000, 44100, 48000];

/// Frame durations must be a multiple of this many microseconds
pub const FRAME_DURATION_STEP_US: u32 = 2500;

/// Longest accepted frame duration
pub const MAX_FRAME_DURATION_US: u32 = 20000;

const BIAS: i32 = 0x84;
const CLIP: i32 = 32635;
const SEG_END: [i32; 8] = [0xFF, 0x1FF, 0x3FF, 0x7FF, 0xFFF, 0x1FFF, 0x3FFF, 0x7FFF];

/// G.711 companding law
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum G711Variant {
    /// μ-law (PCMU)
    #[default]
    MuLaw,
    /// A-law (PCMA)
    ALaw,
}

impl G711Variant {
    fn encode(self, sample: i16) -> u8 {
        match self {
            G711Variant::MuLaw => linear_to_mulaw(sample),
            G711Variant::ALaw => linear_to_alaw(sample),
        }
    }

    fn decode(self, byte: u8) -> i16 {
        match self {
            G711Variant::MuLaw => mulaw_to_linear(byte),
            G711Variant::ALaw => alaw_to_linear(byte),
        }
    }
}

impl std::str::FromStr for G711Variant {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "mulaw" | "ulaw" | "pcmu" => Ok(G711Variant::MuLaw),
            "alaw" | "pcma" => Ok(G711Variant::ALaw),
            other => Err(format!("unknown G.711 variant '{}'", other)),
        }
    }
}

fn segment(value: i32) -> usize {
    SEG_END
        .iter()
        .position(|&end| value <= end)
        .unwrap_or(SEG_END.len())
}

/// Convert a linear sample to μ-law
pub fn linear_to_mulaw(sample: i16) -> u8 {
    let mut pcm = i32::from(sample);
    let mask = if pcm < 0 {
        pcm = -pcm;
        0x7F
    } else {
        0xFF
    };

    let pcm = pcm.min(CLIP) + BIAS;
    let seg = segment(pcm);
    if seg >= 8 {
        return (0x7F ^ mask) as u8;
    }

    let uval = ((seg as i32) << 4) | ((pcm >> (seg + 3)) & 0x0F);
    (uval ^ mask) as u8
}

/// Convert a μ-law byte to a linear sample
pub fn mulaw_to_linear(byte: u8) -> i16 {
    let u = i32::from(!byte);
    let mut t = ((u & 0x0F) << 3) + BIAS;
    t <<= (u & 0x70) >> 4;

    let value = if u & 0x80 != 0 { BIAS - t } else { t - BIAS };
    value as i16
}

/// Convert a linear sample to A-law
pub fn linear_to_alaw(sample: i16) -> u8 {
    let mut pcm = i32::from(sample);
    let mask = if pcm >= 0 {
        0xD5
    } else {
        pcm = (-pcm - 8).max(0);
        0x55
    };

    let seg = segment(pcm);
    if seg >= 8 {
        return (0x7F ^ mask) as u8;
    }

    let mut aval = (seg as i32) << 4;
    if seg < 2 {
        aval |= (pcm >> 4) & 0x0F;
    } else {
        aval |= (pcm >> (seg + 3)) & 0x0F;
    }
    (aval ^ mask) as u8
}

/// Convert an A-law byte to a linear sample
pub fn alaw_to_linear(byte: u8) -> i16 {
    let a = i32::from(byte ^ 0x55);
    let mut t = (a & 0x0F) << 4;
    let seg = (a & 0x70) >> 4;

    match seg {
        0 => t += 8,
        1 => t += 0x108,
        _ => {
            t += 0x108;
            t <<= seg - 1;
        }
    }

    let value = if a & 0x80 != 0 { t } else { -t };
    value as i16
}

/// G.711 codec factory
#[derive(Debug, Clone, Copy, Default)]
pub struct G711Codec {
    variant: G711Variant,
}

impl G711Codec {
    pub fn new(variant: G711Variant) -> Self {
        Self { variant }
    }

    pub fn mu_law() -> Self {
        Self::new(G711Variant::MuLaw)
    }

    pub fn a_law() -> Self {
        Self::new(G711Variant::ALaw)
    }

    pub fn variant(&self) -> G711Variant {
        self.variant
    }
}

impl Codec for G711Codec {
    type Encoder = G711Encoder;
    type Decoder = G711Decoder;

    fn name(&self) -> &'static str {
        match self.variant {
            G711Variant::MuLaw => "g711-mulaw",
            G711Variant::ALaw => "g711-alaw",
        }
    }

    fn negotiate(
        &self,
        frame_duration_us: u32,
        sample_rate: u32,
        channels: u16,
    ) -> Result<FrameConfig, CodecError> {
        if !SUPPORTED_RATES.contains(&sample_rate) {
            return Err(CodecError::UnsupportedSampleRate(sample_rate));
        }
        if !(1..=2).contains(&channels) {
            return Err(CodecError::UnsupportedChannelCount(channels));
        }

        let unsupported = CodecError::UnsupportedFrameDuration {
            duration_us: frame_duration_us,
            sample_rate,
        };
        if frame_duration_us == 0
            || frame_duration_us > MAX_FRAME_DURATION_US
            || frame_duration_us % FRAME_DURATION_STEP_US != 0
        {
            return Err(unsupported);
        }

        let scaled = u64::from(sample_rate) * u64::from(frame_duration_us);
        if scaled % 1_000_000 != 0 {
            return Err(unsupported);
        }
        let samples_per_frame = (scaled / 1_000_000) as usize;

        FrameConfig::new(
            sample_rate,
            frame_duration_us,
            channels,
            samples_per_frame,
            samples_per_frame * usize::from(channels),
        )
    }

    fn open_encoder(&self, config: &FrameConfig) -> Result<G711Encoder, CodecError> {
        tracing::debug!(codec = self.name(), "Opened encoder session");
        Ok(G711Encoder {
            variant: self.variant,
            config: *config,
        })
    }

    fn open_decoder(&self, config: &FrameConfig) -> Result<G711Decoder, CodecError> {
        tracing::debug!(codec = self.name(), "Opened decoder session");
        Ok(G711Decoder {
            variant: self.variant,
            config: *config,
            plc: FrameConcealer::new(config.pcm_len()),
        })
    }
}

/// G.711 encode session
#[derive(Debug)]
pub struct G711Encoder {
    variant: G711Variant,
    config: FrameConfig,
}

impl FrameEncoder for G711Encoder {
    fn encode(&mut self, pcm: &[i16], out: &mut [u8]) -> Result<(), CodecError> {
        check_len(self.config.pcm_len(), pcm.len())?;
        check_len(self.config.octets_per_frame(), out.len())?;

        for (dst, &sample) in out.iter_mut().zip(pcm) {
            *dst = self.variant.encode(sample);
        }
        Ok(())
    }
}

/// G.711 decode session with concealment
#[derive(Debug)]
pub struct G711Decoder {
    variant: G711Variant,
    config: FrameConfig,
    plc: FrameConcealer,
}

impl G711Decoder {
    /// Consecutive frames concealed so far
    pub fn consecutive_losses(&self) -> u32 {
        self.plc.consecutive_losses()
    }
}

impl FrameDecoder for G711Decoder {
    fn decode(&mut self, payload: Payload<'_>, pcm: &mut [i16]) -> Result<(), CodecError> {
        check_len(self.config.pcm_len(), pcm.len())?;

        match payload {
            Payload::Lost => {
                self.plc.conceal(pcm);
            }
            Payload::Delivered(bytes) => {
                check_len(self.config.octets_per_frame(), bytes.len())?;
                for (dst, &byte) in pcm.iter_mut().zip(bytes) {
                    *dst = self.variant.decode(byte);
                }
                self.plc.store_frame(pcm);
            }
        }
        Ok(())
    }
}
