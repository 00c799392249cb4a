//! Signal-processing leaves of the pipeline
//!
//! - Anti-aliased decimation to the engine's working rate
//! - Short-time spectrogram computation
//! - Window functions and FIR design shared by both

pub mod resample;
pub mod spectrogram;
pub mod windows;
