//! WAV container output for decoded audio
//!
//! Writes 16-bit PCM through `hound`, which emits the canonical 44-byte
//! RIFF header for mono and stereo. The header starts out with a zero
//! sample count and is patched on [`AudioSink::finalize`], once the real
//! length is known.
//!
//! ## File Format
//!
//! ```text
//! "RIFF" u32(data_bytes + 36) "WAVE"
//! "fmt " u32(16) u16(1) u16(channels) u32(rate) u32(byte_rate) u16(block_align) u16(16)
//! "data" u32(data_bytes) [i16_le samples...]
//! ```

use std::fs::File;
use std::io::{self, BufReader, BufWriter, Read, Seek, Write};
use std::path::Path;

/// Size of the canonical PCM header in bytes
pub const HEADER_LEN: usize = 44;

/// Widest layout that still fits the canonical PCM header
pub const MAX_CHANNELS: u16 = 2;

/// Largest data chunk a RIFF size field can describe
pub const MAX_DATA_BYTES: u64 = u32::MAX as u64 - 36;

const BITS_PER_SAMPLE: u16 = 16;

/// Destination for decoded audio frames
pub trait AudioSink {
    /// Value handed back once the sink has been finalized
    type Output;

    /// Append interleaved samples in arrival order
    fn write_samples(&mut self, samples: &[i16]) -> io::Result<()>;

    /// Samples per channel written so far
    fn total_samples(&self) -> u64;

    /// Complete the container and release the underlying handle
    fn finalize(self) -> io::Result<Self::Output>;
}

/// Format of a 16-bit PCM stream, checked against the header's field widths
pub fn pcm16_spec(channels: u16, sample_rate: u32) -> io::Result<hound::WavSpec> {
    if !(1..=MAX_CHANNELS).contains(&channels) {
        return Err(io::Error::new(
            io::ErrorKind::InvalidInput,
            format!("WAV output supports 1 or 2 channels, got {}", channels),
        ));
    }

    let block_align = u32::from(channels) * u32::from(BITS_PER_SAMPLE / 8);
    if sample_rate == 0 || sample_rate.checked_mul(block_align).is_none() {
        return Err(io::Error::new(
            io::ErrorKind::InvalidInput,
            format!("Sample rate {} Hz does not fit a WAV header", sample_rate),
        ));
    }

    Ok(hound::WavSpec {
        channels,
        sample_rate,
        bits_per_sample: BITS_PER_SAMPLE,
        sample_format: hound::SampleFormat::Int,
    })
}

/// Data chunk length for `total_samples` samples per channel, if it fits
pub fn data_bytes(channels: u16, total_samples: u64) -> Option<u64> {
    total_samples
        .checked_mul(u64::from(channels) * u64::from(BITS_PER_SAMPLE / 8))
        .filter(|&bytes| bytes <= MAX_DATA_BYTES)
}

fn into_io(err: hound::Error) -> io::Error {
    match err {
        hound::Error::IoError(e) => e,
        other => io::Error::new(io::ErrorKind::InvalidData, other),
    }
}

/// Streaming 16-bit PCM WAV writer with a two-pass header
pub struct WavWriter<W: Write + Seek> {
    inner: hound::WavWriter<W>,
    channels: u16,
    sample_rate: u32,
    /// Interleaved samples written across all channels
    samples_written: u64,
    /// Number of write calls, one per decoded frame in the harness
    frame_count: u64,
}

impl WavWriter<BufWriter<File>> {
    /// Create (or truncate) `path` and write a placeholder header
    pub fn create(path: &Path, channels: u16, sample_rate: u32) -> io::Result<Self> {
        let spec = pcm16_spec(channels, sample_rate)?;
        let file = File::create(path)?;
        tracing::debug!(path = %path.display(), channels, sample_rate, "Opened WAV output");
        Self::with_spec(BufWriter::with_capacity(8192, file), spec)
    }
}

impl<W: Write + Seek> WavWriter<W> {
    /// Wrap a seekable writer and emit the placeholder header
    pub fn new(inner: W, channels: u16, sample_rate: u32) -> io::Result<Self> {
        Self::with_spec(inner, pcm16_spec(channels, sample_rate)?)
    }

    fn with_spec(inner: W, spec: hound::WavSpec) -> io::Result<Self> {
        let inner = hound::WavWriter::new(inner, spec).map_err(into_io)?;
        Ok(Self {
            inner,
            channels: spec.channels,
            sample_rate: spec.sample_rate,
            samples_written: 0,
            frame_count: 0,
        })
    }

    pub fn channels(&self) -> u16 {
        self.channels
    }

    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    pub fn frame_count(&self) -> u64 {
        self.frame_count
    }
}

impl<W: Write + Seek> AudioSink for WavWriter<W> {
    type Output = ();

    fn write_samples(&mut self, samples: &[i16]) -> io::Result<()> {
        let written = self.samples_written + samples.len() as u64;
        if data_bytes(1, written).is_none() {
            return Err(io::Error::new(
                io::ErrorKind::InvalidInput,
                format!("{} samples exceed the WAV size limit", written),
            ));
        }

        for &sample in samples {
            self.inner.write_sample(sample).map_err(into_io)?;
        }

        self.samples_written = written;
        self.frame_count += 1;
        Ok(())
    }

    fn total_samples(&self) -> u64 {
        self.samples_written / u64::from(self.channels)
    }

    fn finalize(self) -> io::Result<()> {
        let total_samples = self.total_samples();
        let frames = self.frame_count;

        self.inner.finalize().map_err(into_io)?;

        tracing::debug!(
            total_samples,
            frames,
            data_bytes = self.samples_written * 2,
            "Finalized WAV header"
        );
        Ok(())
    }
}

/// A WAV file read back into memory
#[derive(Debug, Clone)]
pub struct WavFile {
    pub spec: hound::WavSpec,
    /// Samples per channel declared by the header
    pub declared_samples: u64,
    /// Interleaved samples
    pub samples: Vec<i16>,
}

impl WavFile {
    /// Read a file produced by [`WavWriter`]
    pub fn open(path: &Path) -> io::Result<Self> {
        Self::read_from(BufReader::new(File::open(path)?))
    }

    /// Read the header and every sample declared by its data chunk
    ///
    /// Samples are pulled one at a time, so a corrupt length field costs
    /// nothing until the data is actually there.
    pub fn read_from<R: Read>(reader: R) -> io::Result<Self> {
        let mut reader = hound::WavReader::new(reader).map_err(into_io)?;
        let spec = reader.spec();

        let is_pcm16 =
            spec.sample_format == hound::SampleFormat::Int && spec.bits_per_sample == BITS_PER_SAMPLE;
        if !is_pcm16 {
            return Err(io::Error::new(
                io::ErrorKind::InvalidData,
                "Invalid WAV header: only 16-bit PCM is supported",
            ));
        }

        let declared_samples = u64::from(reader.duration());
        let mut samples = Vec::new();
        for sample in reader.samples::<i16>() {
            samples.push(sample.map_err(into_io)?);
        }

        Ok(Self {
            spec,
            declared_samples,
            samples,
        })
    }

    /// Samples per channel declared by the header
    pub fn total_samples(&self) -> u64 {
        self.declared_samples
    }

    /// Samples of one channel, de-interleaved
    pub fn channel(&self, index: usize) -> Vec<i16> {
        let channels = usize::from(self.spec.channels.max(1));
        self.samples
            .iter()
            .skip(index)
            .step_by(channels)
            .copied()
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    fn u16_at(bytes: &[u8], pos: usize) -> u16 {
        u16::from_le_bytes([bytes[pos], bytes[pos + 1]])
    }

    fn u32_at(bytes: &[u8], pos: usize) -> u32 {
        u32::from_le_bytes([bytes[pos], bytes[pos + 1], bytes[pos + 2], bytes[pos + 3]])
    }

    /// Run `write` against an in-memory writer and return the finished bytes
    fn written(
        channels: u16,
        rate: u32,
        write: impl FnOnce(&mut WavWriter<&mut Cursor<Vec<u8>>>),
    ) -> Vec<u8> {
        let mut buffer = Cursor::new(Vec::new());
        let mut writer = WavWriter::new(&mut buffer, channels, rate).unwrap();
        write(&mut writer);
        writer.finalize().unwrap();
        buffer.into_inner()
    }

    #[test]
    fn test_empty_file_is_bare_header() {
        let bytes = written(1, 48000, |_| {});

        assert_eq!(bytes.len(), HEADER_LEN);
        assert_eq!(&bytes[0..4], b"RIFF");
        assert_eq!(u32_at(&bytes, 4), 36);
        assert_eq!(u32_at(&bytes, 40), 0);
    }

    #[test]
    fn test_header_layout() {
        let bytes = written(2, 44100, |w| w.write_samples(&[0; 2000]).unwrap());

        assert_eq!(&bytes[8..16], b"WAVEfmt ");
        assert_eq!(u32_at(&bytes, 16), 16);
        assert_eq!(u16_at(&bytes, 20), 1);
        assert_eq!(u16_at(&bytes, 22), 2);
        assert_eq!(u32_at(&bytes, 24), 44100);
        assert_eq!(u32_at(&bytes, 28), 44100 * 4);
        assert_eq!(u16_at(&bytes, 32), 4);
        assert_eq!(u16_at(&bytes, 34), 16);
        assert_eq!(&bytes[36..40], b"data");
        assert_eq!(u32_at(&bytes, 40), 4000);
        assert_eq!(u32_at(&bytes, 4), 4036);
    }

    #[test]
    fn test_finalize_patches_sample_count() {
        let mut buffer = Cursor::new(Vec::new());
        let mut writer = WavWriter::new(&mut buffer, 1, 8000).unwrap();
        for _ in 0..3 {
            writer.write_samples(&[1, -1, 256, -256]).unwrap();
        }
        assert_eq!(writer.frame_count(), 3);
        assert_eq!(writer.total_samples(), 12);
        writer.finalize().unwrap();

        let bytes = buffer.into_inner();
        assert_eq!(bytes.len(), HEADER_LEN + 24);
        assert_eq!(u32_at(&bytes, 40), 24);

        let wav = WavFile::read_from(Cursor::new(bytes)).unwrap();
        assert_eq!(wav.total_samples(), 12);
        assert_eq!(&wav.samples[..4], &[1, -1, 256, -256]);
    }

    #[test]
    fn test_samples_are_little_endian() {
        let bytes = written(1, 8000, |w| w.write_samples(&[0x1234, -2]).unwrap());
        assert_eq!(&bytes[HEADER_LEN..], &[0x34, 0x12, 0xFE, 0xFF]);
    }

    #[test]
    fn test_stereo_sample_count_is_per_channel() {
        let bytes = written(2, 48000, |w| w.write_samples(&[1, 2, 3, 4, 5, 6]).unwrap());
        assert_eq!(u32_at(&bytes, 40), 12);

        let wav = WavFile::read_from(Cursor::new(bytes)).unwrap();
        assert_eq!(wav.spec.channels, 2);
        assert_eq!(wav.total_samples(), 3);
        assert_eq!(wav.channel(0), vec![1, 3, 5]);
        assert_eq!(wav.channel(1), vec![2, 4, 6]);
    }

    #[test]
    fn test_channel_count_outside_header_rejected() {
        for channels in [0, 3, 40000] {
            let err = WavWriter::new(Cursor::new(Vec::new()), channels, 48000)
                .err()
                .unwrap();
            assert_eq!(err.kind(), io::ErrorKind::InvalidInput);
        }
    }

    #[test]
    fn test_byte_rate_overflow_rejected() {
        let err = WavWriter::new(Cursor::new(Vec::new()), 1, 3_000_000_000)
            .err()
            .unwrap();
        assert_eq!(err.kind(), io::ErrorKind::InvalidInput);

        let err = WavWriter::new(Cursor::new(Vec::new()), 2, u32::MAX / 2 + 1)
            .err()
            .unwrap();
        assert_eq!(err.kind(), io::ErrorKind::InvalidInput);

        assert!(WavWriter::new(Cursor::new(Vec::new()), 2, u32::MAX / 4).is_ok());
    }

    #[test]
    fn test_data_bytes_limit() {
        assert_eq!(data_bytes(1, 480_000), Some(960_000));
        assert_eq!(data_bytes(2, 480_000), Some(1_920_000));
        assert_eq!(data_bytes(1, MAX_DATA_BYTES / 2), Some(MAX_DATA_BYTES - 1));
        assert_eq!(data_bytes(1, MAX_DATA_BYTES / 2 + 1), None);
        assert_eq!(data_bytes(2, u64::MAX), None);
    }

    #[test]
    fn test_reader_rejects_garbage() {
        let mut bytes = written(1, 8000, |w| w.write_samples(&[5; 8]).unwrap());
        bytes[0] = b'X';
        assert!(WavFile::read_from(Cursor::new(bytes)).is_err());

        assert!(WavFile::read_from(Cursor::new(vec![0u8; 10])).is_err());
    }

    #[test]
    fn test_reader_does_not_trust_declared_length() {
        let mut bytes = written(1, 8000, |w| w.write_samples(&[5; 8]).unwrap());
        // Claim almost 4 GiB of data while only 16 bytes follow the header
        let huge = (MAX_DATA_BYTES as u32).to_le_bytes();
        bytes[40..44].copy_from_slice(&huge);
        bytes[4..8].copy_from_slice(&u32::MAX.to_le_bytes());

        assert!(WavFile::read_from(Cursor::new(bytes)).is_err());
    }

    #[test]
    fn test_create_on_disk() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out.wav");

        let mut writer = WavWriter::create(&path, 1, 16000).unwrap();
        writer.write_samples(&[7; 160]).unwrap();
        writer.finalize().unwrap();

        let wav = WavFile::open(&path).unwrap();
        assert_eq!(wav.spec.sample_rate, 16000);
        assert_eq!(wav.samples.len(), 160);
        assert!(wav.samples.iter().all(|&s| s == 7));

        let reader = hound::WavReader::open(&path).unwrap();
        assert_eq!(reader.duration(), 160);
    }
}
