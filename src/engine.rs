//! Engine facade: learn, identify, list, open, save
//!
//! Ties the pipeline stages together behind the five public operations.
//! Learn and identify run the identical waveform -> fingerprints chain, so
//! anchor frames on both paths share one time base and offset histograms
//! line up.

use std::path::Path;

use crate::config::EngineConfig;
use crate::diagnostics::{Artifact, Diagnostics};
use crate::dsp::resample::resample;
use crate::dsp::spectrogram::stft;
use crate::error::EngineError;
use crate::features::pairing::pair_peaks;
use crate::features::peaks::find_peaks;
use crate::features::Fingerprint;
use crate::matching::{self, MatchOutcome};
use crate::store::{FingerprintStore, Track};

/// Fingerprint recognition engine
///
/// Owns the fingerprint store and the configuration shared by every
/// operation. All processing is synchronous and single-threaded; callers
/// parallelize batch learning by sharding tracks over separate engines and
/// merging the stores afterwards.
#[derive(Debug)]
pub struct Engine {
    config: EngineConfig,
    store: FingerprintStore,
}

impl Engine {
    /// Create an engine over an empty store
    ///
    /// # Errors
    ///
    /// Returns `EngineError::InvalidInput` when the configuration fails
    /// validation.
    pub fn new(config: EngineConfig) -> Result<Self, EngineError> {
        config.validate()?;
        Ok(Self {
            config,
            store: FingerprintStore::new(),
        })
    }

    /// Create an engine over a store loaded from `path`
    ///
    /// # Errors
    ///
    /// Configuration errors as for [`Engine::new`], plus
    /// `EngineError::IndexCorrupt` / `EngineError::IndexIo` from the load.
    /// Nothing is loaded partially; on error the caller can fall back to
    /// [`Engine::new`] explicitly.
    pub fn open(path: &Path, config: EngineConfig) -> Result<Self, EngineError> {
        config.validate()?;
        let store = FingerprintStore::load(path)?;
        Ok(Self { config, store })
    }

    /// Save the store to `path` by atomic replacement
    ///
    /// # Errors
    ///
    /// Returns `EngineError::IndexIo` on write failure; an existing file at
    /// `path` stays intact in that case.
    pub fn save(&self, path: &Path) -> Result<(), EngineError> {
        self.store.save(path)
    }

    /// Learn a recording under a new track id
    ///
    /// Re-learning an existing name yields a new id; callers that want
    /// deduplication check [`Engine::tracks`] first.
    ///
    /// # Arguments
    ///
    /// * `name` - Display name for the track
    /// * `samples` - Mono samples in [-1, 1]
    /// * `sample_rate` - Input rate in Hz, at least twice the target rate
    ///
    /// # Errors
    ///
    /// `EngineError::InvalidInput` for an unusable waveform or rate,
    /// `EngineError::TooShort` when the recording yields no fingerprints.
    pub fn learn(
        &mut self,
        name: &str,
        samples: &[f32],
        sample_rate: u32,
    ) -> Result<u32, EngineError> {
        let prints = self.fingerprint(samples, sample_rate)?;
        if prints.is_empty() {
            return Err(EngineError::TooShort(format!(
                "recording {:?} produced no fingerprints",
                name
            )));
        }
        let id = self.store.insert(name, &prints)?;
        log::info!(
            "Learned track {} ({:?}): {} fingerprints",
            id,
            name,
            prints.len()
        );
        Ok(id)
    }

    /// Identify a recording against the learned tracks
    ///
    /// Returns [`MatchOutcome::NoMatch`] when nothing clears the matcher
    /// thresholds and [`MatchOutcome::Ambiguous`] when the two best tracks
    /// are closer than the configured margin.
    ///
    /// # Errors
    ///
    /// `EngineError::InvalidInput` / `EngineError::TooShort` as for
    /// [`Engine::learn`]; a clean query that merely matches nothing is not
    /// an error.
    pub fn identify(&self, samples: &[f32], sample_rate: u32) -> Result<MatchOutcome, EngineError> {
        let prints = self.fingerprint(samples, sample_rate)?;
        if prints.is_empty() {
            log::debug!("Query produced no fingerprints");
            return Ok(MatchOutcome::NoMatch);
        }
        Ok(matching::query(&self.store, &prints, &self.config))
    }

    /// All learned tracks in insertion order
    pub fn tracks(&self) -> impl Iterator<Item = &Track> {
        self.store.tracks()
    }

    /// Read-only view of the underlying store
    pub fn store(&self) -> &FingerprintStore {
        &self.store
    }

    /// Consume the engine, yielding its store (for merge workflows)
    pub fn into_store(self) -> FingerprintStore {
        self.store
    }

    /// The engine's configuration
    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Run the waveform -> fingerprints pipeline
    ///
    /// Exposed so callers can inspect or store fingerprints themselves,
    /// e.g. when sharding batch learning over worker stores.
    pub fn fingerprint(
        &self,
        samples: &[f32],
        sample_rate: u32,
    ) -> Result<Vec<Fingerprint>, EngineError> {
        run_pipeline(&self.config, samples, sample_rate, None)
    }

    /// Run the pipeline and collect tagged intermediates
    pub fn fingerprint_with_diagnostics(
        &self,
        samples: &[f32],
        sample_rate: u32,
        diagnostics: &mut Diagnostics,
    ) -> Result<Vec<Fingerprint>, EngineError> {
        run_pipeline(&self.config, samples, sample_rate, Some(diagnostics))
    }
}

/// The shared learn/query pipeline:
/// validate -> resample -> spectrogram -> peaks -> pairs
fn run_pipeline(
    config: &EngineConfig,
    samples: &[f32],
    sample_rate: u32,
    mut diagnostics: Option<&mut Diagnostics>,
) -> Result<Vec<Fingerprint>, EngineError> {
    let resampled = resample(samples, sample_rate, config.target_rate, config.fir_order)?;
    if let Some(diag) = diagnostics.as_deref_mut() {
        diag.record(Artifact::Resampled {
            samples: resampled.samples.clone(),
            rate: resampled.rate,
            factor: resampled.factor,
        });
    }

    let spectrogram = stft(
        &resampled.samples,
        resampled.rate,
        config.window_len,
        config.hop,
    )?;
    if let Some(diag) = diagnostics.as_deref_mut() {
        diag.record(Artifact::Spectrogram {
            magnitudes: spectrogram.magnitudes().to_vec(),
            num_frames: spectrogram.num_frames(),
            num_bins: spectrogram.num_bins(),
            dt: spectrogram.dt(),
            df: spectrogram.df(),
        });
    }

    let peaks = find_peaks(
        &spectrogram,
        config.nms_alpha,
        config.nms_time_half,
        config.percentile,
    );
    if let Some(diag) = diagnostics.as_deref_mut() {
        diag.record(Artifact::Peaks(peaks.clone()));
    }

    let prints = pair_peaks(
        &peaks,
        config.dt_min,
        config.dt_max,
        config.df_max,
        config.fanout,
    );
    if let Some(diag) = diagnostics.as_deref_mut() {
        diag.record(Artifact::Fingerprints(prints.clone()));
    }
    Ok(prints)
}
