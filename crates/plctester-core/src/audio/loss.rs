//! Periodic frame loss injection
//!
//! Marks exactly one frame in every `interval` frames as lost, starting with
//! frame number `interval` (1-based). The lost frames drive the decoder's
//! concealment path; they are simulated input, not faults.

/// Decides per encoded frame whether it is delivered or dropped
#[derive(Debug, Clone)]
pub struct LossScheduler {
    /// Drop interval N (0 disables loss injection)
    interval: u32,
    /// Frames seen since the last drop
    counter: u32,
}

impl LossScheduler {
    /// Create a scheduler dropping one frame every `interval` frames
    ///
    /// An interval of 0 never drops anything.
    pub fn new(interval: u32) -> Self {
        Self {
            interval,
            counter: 0,
        }
    }

    /// Scheduler that delivers every frame
    pub fn disabled() -> Self {
        Self::new(0)
    }

    /// Register one encoded frame and report whether it is dropped
    pub fn on_frame_encoded(&mut self) -> bool {
        if self.interval == 0 {
            return false;
        }

        self.counter += 1;
        if self.counter == self.interval {
            self.counter = 0;
            true
        } else {
            false
        }
    }

    pub fn interval(&self) -> u32 {
        self.interval
    }

    /// Frames counted since the last drop
    pub fn counter(&self) -> u32 {
        self.counter
    }

    pub fn is_enabled(&self) -> bool {
        self.interval != 0
    }

    /// Number of frames out of `frames` that this policy drops
    pub fn expected_losses(&self, frames: u64) -> u64 {
        if self.interval == 0 {
            0
        } else {
            frames / u64::from(self.interval)
        }
    }

    pub fn reset(&mut self) {
        self.counter = 0;
    }
}

impl Default for LossScheduler {
    fn default() -> Self {
        Self::new(crate::config::DEFAULT_DROP_INTERVAL)
    }
}
