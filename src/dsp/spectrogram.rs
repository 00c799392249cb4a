//! Short-time spectrogram computation
//!
//! Windowed FFT over successive frames producing a time-frequency magnitude
//! matrix: frames of `window_len` samples at stride `hop`, Hamming windowed,
//! one-sided spectrum of `window_len / 2 + 1` bins. The final partial frame
//! is zero-padded.

use rustfft::num_complex::Complex;
use rustfft::FftPlanner;

use crate::dsp::windows::hamming;
use crate::error::EngineError;

/// Time-frequency magnitude matrix with its axis steps
///
/// Stored as one flat row-major buffer (frame-major); rows are borrowed as
/// slices through [`Spectrogram::frame`].
#[derive(Debug, Clone)]
pub struct Spectrogram {
    data: Vec<f32>,
    num_frames: usize,
    num_bins: usize,
    dt: f64,
    df: f64,
}

impl Spectrogram {
    /// Number of time frames
    pub fn num_frames(&self) -> usize {
        self.num_frames
    }

    /// Number of frequency bins (`window_len / 2 + 1`, bin 0 = DC)
    pub fn num_bins(&self) -> usize {
        self.num_bins
    }

    /// Seconds per frame (`hop / rate`)
    pub fn dt(&self) -> f64 {
        self.dt
    }

    /// Hz per bin (`rate / window_len`)
    pub fn df(&self) -> f64 {
        self.df
    }

    /// Magnitude row for one frame
    pub fn frame(&self, frame: usize) -> &[f32] {
        let start = frame * self.num_bins;
        &self.data[start..start + self.num_bins]
    }

    /// Magnitude at a single time-frequency cell
    pub fn at(&self, frame: usize, bin: usize) -> f32 {
        self.data[frame * self.num_bins + bin]
    }

    /// The whole matrix as one flat frame-major slice
    pub fn magnitudes(&self) -> &[f32] {
        &self.data
    }

    /// Build a spectrogram from a raw matrix, for neighborhood tests
    #[cfg(test)]
    pub(crate) fn from_raw(data: Vec<f32>, num_frames: usize, num_bins: usize) -> Self {
        assert_eq!(data.len(), num_frames * num_bins);
        Self {
            data,
            num_frames,
            num_bins,
            dt: 512.0 / 11025.0,
            df: 11025.0 / 1024.0,
        }
    }
}

/// Compute the short-time spectrogram of a waveform
///
/// # Arguments
///
/// * `samples` - Mono samples
/// * `rate` - Sample rate in Hz
/// * `window_len` - STFT window size in samples
/// * `hop` - Stride between frames in samples
///
/// # Returns
///
/// A [`Spectrogram`] with `ceil((len - window_len) / hop) + 1` frames and
/// `window_len / 2 + 1` bins of non-negative magnitudes `|X[k]|`.
///
/// # Errors
///
/// Returns `EngineError::TooShort` when the waveform holds fewer samples
/// than one complete window.
pub fn stft(
    samples: &[f32],
    rate: f64,
    window_len: usize,
    hop: usize,
) -> Result<Spectrogram, EngineError> {
    if samples.len() < window_len {
        return Err(EngineError::TooShort(format!(
            "{} samples, need at least one full window of {}",
            samples.len(),
            window_len
        )));
    }

    let num_frames = (samples.len() - window_len).div_ceil(hop) + 1;
    let num_bins = window_len / 2 + 1;

    log::debug!(
        "Computing spectrogram: {} samples -> {} frames x {} bins",
        samples.len(),
        num_frames,
        num_bins
    );

    let window = hamming(window_len);
    let mut planner = FftPlanner::<f32>::new();
    let fft = planner.plan_fft_forward(window_len);

    let mut data = Vec::with_capacity(num_frames * num_bins);
    // One complex buffer reused across frames.
    let mut buffer: Vec<Complex<f32>> = vec![Complex { re: 0.0, im: 0.0 }; window_len];

    for frame_idx in 0..num_frames {
        let start = frame_idx * hop;
        let end = (start + window_len).min(samples.len());
        let len = end - start;

        for (i, slot) in buffer.iter_mut().enumerate() {
            let sample = if i < len { samples[start + i] } else { 0.0 };
            *slot = Complex {
                re: sample * window[i],
                im: 0.0,
            };
        }

        fft.process(&mut buffer);

        data.extend(
            buffer[..num_bins]
                .iter()
                .map(|c| (c.re * c.re + c.im * c.im).sqrt()),
        );
    }

    Ok(Spectrogram {
        data,
        num_frames,
        num_bins,
        dt: hop as f64 / rate,
        df: rate / window_len as f64,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::f32::consts::PI;

    fn sine(freq: f32, fs: u32, count: usize) -> Vec<f32> {
        (0..count)
            .map(|i| (2.0 * PI * freq * i as f32 / fs as f32).sin() * 0.5)
            .collect()
    }

    #[test]
    fn test_too_short_rejected() {
        let samples = vec![0.1f32; 1023];
        let result = stft(&samples, 11025.0, 1024, 512);
        assert!(matches!(result, Err(EngineError::TooShort(_))));
    }

    #[test]
    fn test_exact_window_yields_one_frame() {
        let samples = vec![0.1f32; 1024];
        let spec = stft(&samples, 11025.0, 1024, 512).unwrap();
        assert_eq!(spec.num_frames(), 1);
        assert_eq!(spec.num_bins(), 513);
    }

    #[test]
    fn test_frame_count_formula() {
        // len = 1024 + 512 * 10 + 1: the trailing remainder forces one
        // zero-padded frame on top of the 11 complete positions.
        let len = 1024 + 512 * 10 + 1;
        let samples = vec![0.1f32; len];
        let spec = stft(&samples, 11025.0, 1024, 512).unwrap();
        let expected = (len - 1024usize).div_ceil(512) + 1;
        assert_eq!(spec.num_frames(), expected);
        assert_eq!(spec.num_frames(), 12);
    }

    #[test]
    fn test_axis_steps() {
        let samples = vec![0.1f32; 4096];
        let spec = stft(&samples, 11025.0, 1024, 512).unwrap();
        assert!((spec.dt() - 512.0 / 11025.0).abs() < 1e-12);
        assert!((spec.df() - 11025.0 / 1024.0).abs() < 1e-12);
    }

    #[test]
    fn test_sine_lands_in_expected_bin() {
        let fs = 11025;
        let samples = sine(1000.0, fs, 8192);
        let spec = stft(&samples, fs as f64, 1024, 512).unwrap();

        // Average magnitudes across frames, find the dominant bin.
        let mut averaged = vec![0.0f32; spec.num_bins()];
        for t in 0..spec.num_frames() {
            for (avg, &m) in averaged.iter_mut().zip(spec.frame(t)) {
                *avg += m;
            }
        }
        let dominant = averaged
            .iter()
            .enumerate()
            .max_by(|a, b| a.1.partial_cmp(b.1).unwrap())
            .map(|(i, _)| i)
            .unwrap();

        let expected = (1000.0 / spec.df()).round() as usize;
        assert!(
            dominant.abs_diff(expected) <= 1,
            "dominant bin {} not within 1 of expected {}",
            dominant,
            expected
        );
    }

    #[test]
    fn test_magnitudes_non_negative() {
        let samples = sine(440.0, 11025, 4096);
        let spec = stft(&samples, 11025.0, 1024, 512).unwrap();
        assert!(spec.magnitudes().iter().all(|&m| m >= 0.0));
    }
}
