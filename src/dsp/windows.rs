//! Window functions and FIR filter design
//!
//! Provides the Hamming window used for both spectral analysis and
//! anti-alias filter design, plus the windowed-sinc low-pass kernel.
//! Spectral analysis uses the periodic (DFT-even) variant, filter design
//! the symmetric variant.

use std::f32::consts::PI;

/// Hamming cosine coefficients
const HAMMING_COEFFICIENTS: [f32; 2] = [0.54, -0.46];

/// Create a Hamming window
///
/// Even lengths produce the periodic (DFT-even) variant for spectral
/// analysis; odd lengths produce the symmetric variant for filter design.
pub fn hamming(count: usize) -> Vec<f32> {
    cosine(&HAMMING_COEFFICIENTS, count)
}

/// Create a generalized cosine window
///
/// `w[n] = sum_k c_k * cos(2 pi k n / (count - 1))`
fn cosine(coefficients: &[f32], count: usize) -> Vec<f32> {
    if count % 2 == 0 {
        // Periodic window: symmetric window one sample longer, last dropped.
        let mut window = symmetric_cosine(coefficients, count + 1);
        window.truncate(count);
        window
    } else {
        symmetric_cosine(coefficients, count)
    }
}

fn symmetric_cosine(coefficients: &[f32], count: usize) -> Vec<f32> {
    debug_assert!(count % 2 == 1, "symmetric cosine window length must be odd");
    (0..count)
        .map(|n| {
            coefficients
                .iter()
                .enumerate()
                .map(|(k, &c)| c * ((2.0 * PI * k as f32 * n as f32) / (count - 1) as f32).cos())
                .sum()
        })
        .collect()
}

/// Design a linear-phase windowed-sinc low-pass kernel
///
/// # Arguments
///
/// * `taps` - Kernel length (filter order + 1), must be odd
/// * `cutoff` - Cutoff frequency normalized to the Nyquist frequency, in (0, 1)
///
/// # Returns
///
/// The sinc kernel multiplied by a symmetric Hamming window. DC gain is
/// approximately unity.
pub fn lowpass_fir(taps: usize, cutoff: f32) -> Vec<f32> {
    debug_assert!(taps % 2 == 1, "FIR tap count must be odd");
    debug_assert!(cutoff > 0.0 && cutoff < 1.0, "cutoff must be in (0, 1)");

    let order = taps - 1;
    let mut kernel = vec![cutoff; taps];
    // Ideal low-pass: h[n] = sin(pi * fc * m) / (pi * m), m = n - order/2.
    // The center sample stays at fc; the rest are filled symmetrically.
    for i in 0..order / 2 {
        let m = i as f32 - (order as f32 / 2.0);
        let coefficient = (PI * cutoff * m).sin() / (PI * m);
        kernel[i] = coefficient;
        kernel[taps - 1 - i] = coefficient;
    }

    let window = hamming(taps);
    for (h, w) in kernel.iter_mut().zip(window.iter()) {
        *h *= w;
    }
    kernel
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hamming_symmetric_endpoints() {
        let window = hamming(11);
        // Hamming endpoints are 0.54 - 0.46 = 0.08.
        assert!((window[0] - 0.08).abs() < 1e-6);
        assert!((window[10] - 0.08).abs() < 1e-6);
        // Center of a symmetric window is the maximum, 0.54 + 0.46 = 1.0.
        assert!((window[5] - 1.0).abs() < 1e-6);
    }

    #[test]
    fn test_hamming_symmetry() {
        let window = hamming(101);
        for i in 0..window.len() / 2 {
            assert!(
                (window[i] - window[window.len() - 1 - i]).abs() < 1e-6,
                "window not symmetric at index {}",
                i
            );
        }
    }

    #[test]
    fn test_hamming_periodic_length() {
        let window = hamming(1024);
        assert_eq!(window.len(), 1024);
        // Periodic variant: w[0] is the symmetric endpoint, the dropped last
        // sample would have mirrored it.
        assert!((window[0] - 0.08).abs() < 1e-6);
        assert!((window[512] - 1.0).abs() < 1e-6);
    }

    #[test]
    fn test_lowpass_fir_dc_gain() {
        let kernel = lowpass_fir(101, 0.25);
        let gain: f32 = kernel.iter().sum();
        assert!(
            (gain - 1.0).abs() < 0.01,
            "low-pass DC gain should be ~1.0, got {}",
            gain
        );
    }

    #[test]
    fn test_lowpass_fir_symmetry() {
        let kernel = lowpass_fir(51, 0.5);
        for i in 0..kernel.len() / 2 {
            assert!(
                (kernel[i] - kernel[kernel.len() - 1 - i]).abs() < 1e-6,
                "kernel not linear-phase at index {}",
                i
            );
        }
    }
}
