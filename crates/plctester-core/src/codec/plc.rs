//! Packet loss concealment by frame repetition
//!
//! Strategy:
//! - 1st loss: repeat the last good frame at `fadeout_factor`
//! - n-th consecutive loss: gain `fadeout_factor^n`
//! - more than `max_losses` consecutive losses: silence

/// Default gain applied per consecutive loss
pub const DEFAULT_FADEOUT: f32 = 0.85;

/// Default consecutive losses before the output goes silent
pub const DEFAULT_MAX_LOSSES: u32 = 5;

/// Concealment state for one decode session
#[derive(Debug, Clone)]
pub struct FrameConcealer {
    /// Last successfully decoded frame (interleaved)
    last_frame: Vec<i16>,
    consecutive_losses: u32,
    max_losses: u32,
    fadeout_factor: f32,
}

impl FrameConcealer {
    /// Create a concealer for frames of `frame_len` interleaved samples
    pub fn new(frame_len: usize) -> Self {
        Self::with_config(frame_len, DEFAULT_MAX_LOSSES, DEFAULT_FADEOUT)
    }

    pub fn with_config(frame_len: usize, max_losses: u32, fadeout_factor: f32) -> Self {
        Self {
            last_frame: vec![0; frame_len],
            consecutive_losses: 0,
            max_losses,
            fadeout_factor: fadeout_factor.clamp(0.0, 1.0),
        }
    }

    /// Remember a good frame and leave concealment mode
    pub fn store_frame(&mut self, samples: &[i16]) {
        self.last_frame.clear();
        self.last_frame.extend_from_slice(samples);
        self.consecutive_losses = 0;
    }

    /// Write a concealment frame into `out`
    ///
    /// `out` is filled up to the length of the stored frame; anything past
    /// that is zeroed.
    pub fn conceal(&mut self, out: &mut [i16]) {
        self.consecutive_losses = self.consecutive_losses.saturating_add(1);

        if self.consecutive_losses > self.max_losses {
            out.fill(0);
            return;
        }

        let gain = self.fadeout_factor.powi(self.consecutive_losses as i32);
        let repeated = out.len().min(self.last_frame.len());
        for (dst, &src) in out.iter_mut().zip(&self.last_frame) {
            *dst = (f32::from(src) * gain).round() as i16;
        }
        out[repeated..].fill(0);
    }

    pub fn consecutive_losses(&self) -> u32 {
        self.consecutive_losses
    }

    pub fn is_concealing(&self) -> bool {
        self.consecutive_losses > 0
    }

    pub fn reset(&mut self) {
        self.last_frame.fill(0);
        self.consecutive_losses = 0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_first_loss_repeats_attenuated() {
        let mut plc = FrameConcealer::new(4);
        plc.store_frame(&[1000, -1000, 200, 0]);

        let mut out = [0i16; 4];
        plc.conceal(&mut out);
        assert_eq!(out, [850, -850, 170, 0]);
        assert!(plc.is_concealing());
    }

    #[test]
    fn test_consecutive_losses_fade() {
        let mut plc = FrameConcealer::new(1);
        plc.store_frame(&[10000]);

        let mut out = [0i16; 1];
        plc.conceal(&mut out);
        assert_eq!(out[0], 8500);
        plc.conceal(&mut out);
        assert_eq!(out[0], 7225);
        plc.conceal(&mut out);
        assert_eq!(out[0], 6141);
    }

    #[test]
    fn test_silence_after_max_losses() {
        let mut plc = FrameConcealer::new(8);
        plc.store_frame(&[1000; 8]);

        let mut out = [0i16; 8];
        for _ in 0..DEFAULT_MAX_LOSSES {
            plc.conceal(&mut out);
            assert!(out.iter().all(|&s| s != 0));
        }
        plc.conceal(&mut out);
        assert!(out.iter().all(|&s| s == 0));
    }

    #[test]
    fn test_good_frame_resets_fade() {
        let mut plc = FrameConcealer::new(1);
        plc.store_frame(&[10000]);
        let mut out = [0i16; 1];
        plc.conceal(&mut out);
        plc.conceal(&mut out);
        assert_eq!(plc.consecutive_losses(), 2);

        plc.store_frame(&[10000]);
        assert_eq!(plc.consecutive_losses(), 0);
        plc.conceal(&mut out);
        assert_eq!(out[0], 8500);
    }

    #[test]
    fn test_loss_before_any_frame_is_silent() {
        let mut plc = FrameConcealer::new(4);
        let mut out = [123i16; 4];
        plc.conceal(&mut out);
        assert_eq!(out, [0; 4]);
    }

    #[test]
    fn test_reset() {
        let mut plc = FrameConcealer::new(2);
        plc.store_frame(&[5, 5]);
        let mut out = [0i16; 2];
        plc.conceal(&mut out);

        plc.reset();
        assert_eq!(plc.consecutive_losses(), 0);
        plc.conceal(&mut out);
        assert_eq!(out, [0, 0]);
    }
}
