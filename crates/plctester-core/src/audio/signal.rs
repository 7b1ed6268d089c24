//! Deterministic test tone generation
//!
//! Replays a pre-computed waveform table at an integer phase step, so the
//! emitted sample sequence is identical on every run for a given output
//! sample rate.

use std::borrow::Cow;

/// One period of a 300 Hz sine sampled at 96 kHz, full scale
static SINE_300HZ_96K: [i16; 320] = [
         0,    643,   1286,   1929,   2571,   3212,   3851,   4489,   5126,   5760,
      6393,   7022,   7649,   8273,   8894,   9512,  10126,  10735,  11341,  11943,
     12539,  13131,  13718,  14300,  14876,  15446,  16011,  16569,  17121,  17666,
     18204,  18736,  19260,  19777,  20286,  20787,  21280,  21766,  22242,  22710,
     23170,  23620,  24062,  24494,  24916,  25329,  25732,  26126,  26509,  26882,
     27245,  27597,  27938,  28269,  28589,  28898,  29196,  29482,  29757,  30021,
     30273,  30513,  30742,  30958,  31163,  31356,  31537,  31705,  31862,  32006,
     32137,  32257,  32364,  32458,  32540,  32609,  32666,  32710,  32742,  32761,
     32767,  32761,  32742,  32710,  32666,  32609,  32540,  32458,  32364,  32257,
     32137,  32006,  31862,  31705,  31537,  31356,  31163,  30958,  30742,  30513,
     30273,  30021,  29757,  29482,  29196,  28898,  28589,  28269,  27938,  27597,
     27245,  26882,  26509,  26126,  25732,  25329,  24916,  24494,  24062,  23620,
     23170,  22710,  22242,  21766,  21280,  20787,  20286,  19777,  19260,  18736,
     18204,  17666,  17121,  16569,  16011,  15446,  14876,  14300,  13718,  13131,
     12539,  11943,  11341,  10735,  10126,   9512,   8894,   8273,   7649,   7022,
      6393,   5760,   5126,   4489,   3851,   3212,   2571,   1929,   1286,    643,
         0,   -643,  -1286,  -1929,  -2571,  -3212,  -3851,  -4489,  -5126,  -5760,
     -6393,  -7022,  -7649,  -8273,  -8894,  -9512, -10126, -10735, -11341, -11943,
    -12539, -13131, -13718, -14300, -14876, -15446, -16011, -16569, -17121, -17666,
    -18204, -18736, -19260, -19777, -20286, -20787, -21280, -21766, -22242, -22710,
    -23170, -23620, -24062, -24494, -24916, -25329, -25732, -26126, -26509, -26882,
    -27245, -27597, -27938, -28269, -28589, -28898, -29196, -29482, -29757, -30021,
    -30273, -30513, -30742, -30958, -31163, -31356, -31537, -31705, -31862, -32006,
    -32137, -32257, -32364, -32458, -32540, -32609, -32666, -32710, -32742, -32761,
    -32767, -32761, -32742, -32710, -32666, -32609, -32540, -32458, -32364, -32257,
    -32137, -32006, -31862, -31705, -31537, -31356, -31163, -30958, -30742, -30513,
    -30273, -30021, -29757, -29482, -29196, -28898, -28589, -28269, -27938, -27597,
    -27245, -26882, -26509, -26126, -25732, -25329, -24916, -24494, -24062, -23620,
    -23170, -22710, -22242, -21766, -21280, -20787, -20286, -19777, -19260, -18736,
    -18204, -17666, -17121, -16569, -16011, -15446, -14876, -14300, -13718, -13131,
    -12539, -11943, -11341, -10735, -10126,  -9512,  -8894,  -8273,  -7649,  -7022,
     -6393,  -5760,  -5126,  -4489,  -3851,  -3212,  -2571,  -1929,  -1286,   -643,
];

/// Immutable table of reference tone samples
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WaveformTable {
    samples: Cow<'static, [i16]>,
    native_rate: u32,
}

impl WaveformTable {
    /// Create a table from owned samples recorded at `native_rate` Hz
    ///
    /// # Panics
    /// Panics if `samples` is empty or `native_rate` is zero
    pub fn new(samples: Vec<i16>, native_rate: u32) -> Self {
        assert!(!samples.is_empty(), "Waveform table must not be empty");
        assert!(native_rate > 0, "Native sample rate must be non-zero");

        Self {
            samples: Cow::Owned(samples),
            native_rate,
        }
    }

    /// The built-in 300 Hz reference tone at 96 kHz
    pub fn sine_300hz() -> Self {
        Self {
            samples: Cow::Borrowed(&SINE_300HZ_96K[..]),
            native_rate: crate::TABLE_SAMPLE_RATE,
        }
    }

    pub fn samples(&self) -> &[i16] {
        &self.samples
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    pub fn native_rate(&self) -> u32 {
        self.native_rate
    }

    /// Cursor increment per output sample when playing at `output_rate` Hz
    ///
    /// For a 96 kHz table, 44.1 kHz is special-cased to a step of 2, the same
    /// as 48 kHz, which shifts the reproduced tone to roughly 275.6 Hz.
    /// Every other combination uses
    /// the truncated quotient `native_rate / output_rate`, clamped to at
    /// least 1, so rates that do not divide the native rate play a slightly
    /// detuned tone.
    pub fn phase_step(&self, output_rate: u32) -> usize {
        if output_rate == 44100 && self.native_rate == crate::TABLE_SAMPLE_RATE {
            return 2;
        }
        if output_rate == 0 {
            return 1;
        }
        ((self.native_rate / output_rate) as usize).max(1)
    }

    /// Whether `output_rate` reproduces the table's tone frequency exactly
    pub fn is_exact_rate(&self, output_rate: u32) -> bool {
        output_rate != 0 && output_rate <= self.native_rate && self.native_rate % output_rate == 0
    }
}

impl Default for WaveformTable {
    fn default() -> Self {
        Self::sine_300hz()
    }
}

/// Periodic tone generator reading a [`WaveformTable`] at a fixed phase step
///
/// Every sample is the table value divided by [`crate::SIGNAL_ATTENUATION`]
/// so the decoded signal keeps headroom after codec processing.
///
/// # Example
/// ```
/// use plctester_core::audio::signal::ToneGenerator;
///
/// let mut gen = ToneGenerator::for_sample_rate(48000);
/// let mut frame = [0i16; 480];
/// gen.next_frame(&mut frame);
/// assert_eq!(frame[0], 0);
/// ```
#[derive(Debug, Clone)]
pub struct ToneGenerator {
    table: WaveformTable,
    /// Current index into the table
    cursor: usize,
    /// Fixed increment per output sample
    step: usize,
}

impl ToneGenerator {
    /// Create a generator over `table` for the given output sample rate
    pub fn new(table: WaveformTable, output_rate: u32) -> Self {
        let step = table.phase_step(output_rate);

        if !table.is_exact_rate(output_rate) {
            tracing::warn!(
                output_rate,
                table_rate = table.native_rate(),
                step,
                "Output rate does not divide the table rate, test tone is detuned"
            );
        }

        Self {
            table,
            cursor: 0,
            step,
        }
    }

    /// Generator over the built-in 300 Hz tone
    pub fn for_sample_rate(output_rate: u32) -> Self {
        Self::new(WaveformTable::sine_300hz(), output_rate)
    }

    /// Create a generator with an explicit step, bypassing the rate policy
    ///
    /// # Panics
    /// Panics if `step` is zero
    pub fn with_step(table: WaveformTable, step: usize) -> Self {
        assert!(step > 0, "Phase step must be non-zero");
        Self {
            table,
            cursor: 0,
            step,
        }
    }

    /// Get the next attenuated sample and advance the cursor
    pub fn next_sample(&mut self) -> i16 {
        let sample = self.table.samples()[self.cursor] / crate::SIGNAL_ATTENUATION;
        self.cursor = (self.cursor + self.step) % self.table.len();
        sample
    }

    /// Fill a mono frame with consecutive samples
    pub fn next_frame(&mut self, frame: &mut [i16]) {
        for sample in frame.iter_mut() {
            *sample = self.next_sample();
        }
    }

    /// Fill an interleaved frame, copying each sample to every channel
    ///
    /// The cursor advances once per sample frame, not once per channel.
    /// Trailing samples that do not form a whole sample frame are zeroed.
    pub fn fill_interleaved(&mut self, frame: &mut [i16], channels: usize) {
        if channels <= 1 {
            self.next_frame(frame);
            return;
        }

        let mut chunks = frame.chunks_exact_mut(channels);
        for chunk in &mut chunks {
            let sample = self.next_sample();
            chunk.fill(sample);
        }
        chunks.into_remainder().fill(0);
    }

    /// Current table index
    pub fn cursor(&self) -> usize {
        self.cursor
    }

    /// Cursor increment per sample
    pub fn step(&self) -> usize {
        self.step
    }

    /// Number of samples before the cursor sequence repeats
    pub fn period(&self) -> usize {
        let len = self.table.len();
        len / gcd(len, self.step)
    }

    pub fn table(&self) -> &WaveformTable {
        &self.table
    }

    /// Rewind to the start of the table
    pub fn reset(&mut self) {
        self.cursor = 0;
    }
}

fn gcd(mut a: usize, mut b: usize) -> usize {
    while b != 0 {
        let t = a % b;
        a = b;
        b = t;
    }
    a
}
