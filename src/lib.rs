//! # Waveprint
//!
//! An acoustic fingerprint recognition engine: short recordings are reduced
//! to compact, noise-robust sets of hash-like addresses, indexed for all
//! known tracks, and identified by address overlap plus temporal coherence.
//!
//! ## Quick Start
//!
//! ```no_run
//! use waveprint::{Engine, EngineConfig, MatchOutcome};
//!
//! // Mono samples in [-1, 1] with their sample rate, decoded elsewhere.
//! let recording: Vec<f32> = vec![];
//! let clip: Vec<f32> = vec![];
//!
//! let mut engine = Engine::new(EngineConfig::default())?;
//! let track_id = engine.learn("my recording", &recording, 44100)?;
//!
//! match engine.identify(&clip, 44100)? {
//!     MatchOutcome::Match(m) => println!("track {} (score {})", m.track_id, m.score),
//!     MatchOutcome::NoMatch => println!("unknown recording"),
//!     MatchOutcome::Ambiguous { .. } => println!("ambiguous"),
//! }
//! # Ok::<(), waveprint::EngineError>(())
//! ```
//!
//! ## Architecture
//!
//! The pipeline, identical for learning and queries:
//!
//! ```text
//! Waveform -> Resample -> Spectrogram -> Peaks -> Fingerprints -> Store / Matcher
//! ```
//!
//! The core is single-threaded and synchronous; it operates on finite
//! buffers and returns the single best match or none. Audio capture and
//! decoding are collaborator concerns - the engine consumes mono float
//! samples with a sample rate.

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod config;
pub mod diagnostics;
pub mod dsp;
pub mod engine;
pub mod error;
pub mod features;
pub mod matching;
pub mod store;

// Re-export main types
pub use config::EngineConfig;
pub use diagnostics::{Artifact, Diagnostics};
pub use engine::Engine;
pub use error::EngineError;
pub use features::{Fingerprint, Peak};
pub use matching::{MatchOutcome, TrackMatch};
pub use store::{FingerprintStore, Posting, Track};
