//! Errors that abort a round-trip run
//!
//! Every variant is fatal for the run. Simulated frame loss is not an error
//! and never shows up here.

use crate::codec::CodecError;
use crate::config::ConfigError;
use std::io;
use std::path::PathBuf;
use thiserror::Error;

/// Errors that can occur while driving the encode/decode loop
#[derive(Error, Debug)]
pub enum HarnessError {
    #[error("Invalid configuration: {0}")]
    InvalidConfig(#[from] ConfigError),

    #[error("Failed to open audio output {}: {source}", .path.display())]
    SinkOpenFailed {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("Codec setup failed: {0}")]
    CodecSetupFailed(#[source] CodecError),

    #[error("Encoding frame {frame} failed: {source}")]
    CodecEncodeFailed {
        frame: u64,
        #[source]
        source: CodecError,
    },

    #[error("Decoding frame {frame} failed: {source}")]
    CodecDecodeFailed {
        frame: u64,
        #[source]
        source: CodecError,
    },

    #[error("Writing frame {frame} to audio output failed: {source}")]
    SinkWriteFailed {
        frame: u64,
        #[source]
        source: io::Error,
    },

    #[error("Failed to finalize audio output: {0}")]
    SinkFinalizeFailed(#[source] io::Error),
}

impl HarnessError {
    /// Frame number (1-based) the error occurred on, if it happened in the loop
    pub fn frame(&self) -> Option<u64> {
        match self {
            HarnessError::CodecEncodeFailed { frame, .. }
            | HarnessError::CodecDecodeFailed { frame, .. }
            | HarnessError::SinkWriteFailed { frame, .. } => Some(*frame),
            _ => None,
        }
    }
}
