//! Feature extraction: spectral peaks and their combinatorial pairing
//!
//! A spectrogram is reduced to sparse time-frequency peaks, and peaks are
//! paired inside a bounded target zone into compact fingerprint addresses.

pub mod pairing;
pub mod peaks;

use serde::{Deserialize, Serialize};

/// A sparse spectrogram feature point
///
/// Integer coordinates into the spectrogram grid; the magnitude that
/// selected the peak is discarded after extraction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Peak {
    /// Time frame index
    pub frame: usize,
    /// Frequency bin index
    pub bin: usize,
}

/// An anchor-target pair reduced to an address and its anchor time
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Fingerprint {
    /// Packed `(anchor_bin, target_bin, frame_delta)` address
    pub address: u64,
    /// Anchor frame index
    pub anchor: u32,
}
