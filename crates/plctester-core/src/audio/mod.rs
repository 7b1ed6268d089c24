//! Audio processing module
//!
//! This module contains the sample-level pieces of the harness:
//! - Deterministic test tone generation ([`signal`])
//! - Periodic frame loss injection ([`loss`])
//! - WAV container writing and reading ([`wav`])

pub mod loss;
pub mod signal;
pub mod wav;
