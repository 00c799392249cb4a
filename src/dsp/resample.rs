//! Anti-aliased waveform decimation
//!
//! Converts an input mono waveform to roughly the configured target rate:
//! a windowed-sinc FIR low-pass removes energy above the target Nyquist,
//! then the filtered signal is decimated by an integer factor.
//!
//! The convolution is centered (the signal is zero-padded by half the kernel
//! on both sides), so the filter's group delay cancels and the first output
//! sample corresponds to input sample 0. Learn and query paths run the same
//! code, so temporal offsets stay aligned.

use crate::dsp::windows::lowpass_fir;
use crate::error::EngineError;

/// A decimated waveform with its effective rate
#[derive(Debug, Clone)]
pub struct Resampled {
    /// Decimated samples
    pub samples: Vec<f32>,
    /// Effective output rate in Hz, `fs / factor`
    pub rate: f64,
    /// Integer decimation factor
    pub factor: usize,
}

/// Resample a waveform to approximately `target_rate`
///
/// The decimation factor is `round(fs / target_rate)`; the effective output
/// rate `fs / factor` is returned alongside the samples and may differ
/// slightly from `target_rate` when the rates do not divide evenly.
///
/// # Arguments
///
/// * `samples` - Mono samples in [-1, 1]
/// * `fs` - Input sample rate in Hz
/// * `target_rate` - Desired post-decimation rate in Hz
/// * `fir_taps` - Anti-alias FIR length (odd)
///
/// # Errors
///
/// Returns `EngineError::InvalidInput` for an empty waveform, non-finite
/// samples, or `fs < 2 * target_rate`.
pub fn resample(
    samples: &[f32],
    fs: u32,
    target_rate: u32,
    fir_taps: usize,
) -> Result<Resampled, EngineError> {
    if samples.is_empty() {
        return Err(EngineError::InvalidInput("Empty waveform".to_string()));
    }
    if samples.iter().any(|s| !s.is_finite()) {
        return Err(EngineError::InvalidInput(
            "Waveform contains non-finite samples".to_string(),
        ));
    }
    if fs < 2 * target_rate {
        return Err(EngineError::InvalidInput(format!(
            "Sample rate {} Hz is below twice the target rate {} Hz",
            fs, target_rate
        )));
    }
    if fir_taps < 3 || fir_taps % 2 == 0 {
        return Err(EngineError::InvalidInput(format!(
            "FIR tap count must be odd and >= 3, got {}",
            fir_taps
        )));
    }

    let factor = (fs as f64 / target_rate as f64).round() as usize;
    // Cutoff at half the target rate, normalized to the input Nyquist fs/2.
    let cutoff = target_rate as f32 / fs as f32;

    log::debug!(
        "Resampling {} samples: {} Hz -> {:.1} Hz (factor {}, cutoff {:.4})",
        samples.len(),
        fs,
        fs as f64 / factor as f64,
        factor,
        cutoff
    );

    let kernel = lowpass_fir(fir_taps, cutoff);
    let filtered = convolve_same(samples, &kernel);
    let decimated: Vec<f32> = filtered.iter().copied().step_by(factor).collect();

    Ok(Resampled {
        samples: decimated,
        rate: fs as f64 / factor as f64,
        factor,
    })
}

/// Centered same-length convolution
///
/// The signal is treated as zero outside its bounds on both ends, so output
/// sample n is aligned with input sample n and the linear-phase kernel's
/// group delay cancels. Inputs shorter than the kernel are handled by the
/// same zero extension.
fn convolve_same(signal: &[f32], kernel: &[f32]) -> Vec<f32> {
    let half = kernel.len() / 2;
    let n = signal.len();
    let mut output = Vec::with_capacity(n);

    for i in 0..n {
        let mut acc = 0.0f32;
        // output[i] = sum_k signal[i + half - k] * kernel[k]
        for (k, &c) in kernel.iter().enumerate() {
            let j = i as isize + half as isize - k as isize;
            if j >= 0 && (j as usize) < n {
                acc += signal[j as usize] * c;
            }
        }
        output.push(acc);
    }
    output
}
