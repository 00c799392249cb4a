//! Error types for the fingerprint engine

use std::fmt;
use std::io;

/// Errors surfaced by the fingerprint engine
#[derive(Debug)]
pub enum EngineError {
    /// Invalid input parameters (empty waveform, non-finite samples,
    /// sample rate below twice the target rate, bad configuration)
    InvalidInput(String),

    /// Waveform too short to produce a single complete STFT frame
    /// after decimation
    TooShort(String),

    /// Database file failed magic, structure or length checks
    IndexCorrupt(String),

    /// Underlying read/write failure while loading or saving the index
    IndexIo(io::Error),
}

impl fmt::Display for EngineError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EngineError::InvalidInput(msg) => write!(f, "Invalid input: {}", msg),
            EngineError::TooShort(msg) => write!(f, "Input too short: {}", msg),
            EngineError::IndexCorrupt(msg) => write!(f, "Index corrupt: {}", msg),
            EngineError::IndexIo(err) => write!(f, "Index I/O error: {}", err),
        }
    }
}

impl std::error::Error for EngineError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            EngineError::IndexIo(err) => Some(err),
            _ => None,
        }
    }
}

impl From<io::Error> for EngineError {
    fn from(err: io::Error) -> Self {
        EngineError::IndexIo(err)
    }
}
