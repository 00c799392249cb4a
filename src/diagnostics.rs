//! Optional pipeline diagnostics
//!
//! The pipeline can surface its intermediates as tagged records so an
//! external visualizer can plot signals, spectrograms, peaks and pair
//! structure without the core ever drawing anything. Collection is opt-in
//! and costs nothing when no collector is supplied.

use crate::features::{Fingerprint, Peak};

/// One tagged intermediate from the pipeline
#[derive(Debug, Clone)]
pub enum Artifact {
    /// Decimated waveform entering the spectral stages
    Resampled {
        /// Decimated samples
        samples: Vec<f32>,
        /// Effective rate in Hz
        rate: f64,
        /// Decimation factor applied
        factor: usize,
    },
    /// Spectrogram magnitudes and axes
    Spectrogram {
        /// Flat frame-major magnitude matrix
        magnitudes: Vec<f32>,
        /// Number of time frames
        num_frames: usize,
        /// Number of frequency bins
        num_bins: usize,
        /// Seconds per frame
        dt: f64,
        /// Hz per bin
        df: f64,
    },
    /// Selected feature points
    Peaks(Vec<Peak>),
    /// Final anchor-target pairs
    Fingerprints(Vec<Fingerprint>),
}

/// Collector the pipeline fills when diagnostics are requested
#[derive(Debug, Default)]
pub struct Diagnostics {
    artifacts: Vec<Artifact>,
}

impl Diagnostics {
    /// Create an empty collector
    pub fn new() -> Self {
        Self::default()
    }

    /// Record one artifact
    pub fn record(&mut self, artifact: Artifact) {
        self.artifacts.push(artifact);
    }

    /// Collected artifacts in pipeline order
    pub fn artifacts(&self) -> &[Artifact] {
        &self.artifacts
    }

    /// Consume the collector, yielding its artifacts
    pub fn into_artifacts(self) -> Vec<Artifact> {
        self.artifacts
    }
}
