//! Spectral peak extraction
//!
//! Two-stage selection of sparse feature points from a magnitude
//! spectrogram:
//!
//! 1. Non-maximum suppression over a rectangular neighborhood whose
//!    frequency half-width grows logarithmically with the bin index, so the
//!    suppression respects the diminishing informativeness of high
//!    frequencies.
//! 2. A percentile threshold over a larger neighborhood, so the cut adapts
//!    to per-recording loudness instead of using an absolute level.
//!
//! Both max filters are separable (a frequency pass, then a time pass), and
//! the percentile test is a rank count rather than a sort, so no per-cell
//! ordering work is done.

use crate::dsp::spectrogram::Spectrogram;
use crate::features::Peak;

/// The percentile neighborhood extends this many times beyond the NMS
/// window on both axes.
const PERCENTILE_WINDOW_SCALE: usize = 4;

/// Extract peaks from a spectrogram
///
/// # Arguments
///
/// * `spec` - Magnitude spectrogram
/// * `alpha` - Log-frequency width coefficient; the frequency half-width at
///   bin f is `max(1, floor(alpha * ln(1 + f)))`
/// * `time_half` - Time half-width in frames
/// * `percentile` - Retention percentile in (0, 100]
///
/// # Returns
///
/// Peaks sorted by `(frame, bin)` ascending. A cell survives only if it is
/// strictly greater than every other cell of its NMS rectangle (ties resolve
/// toward the earlier-time, higher-frequency cell, keeping the output
/// deterministic) and strictly exceeds the percentile of the wider
/// neighborhood.
pub fn find_peaks(spec: &Spectrogram, alpha: f32, time_half: usize, percentile: f32) -> Vec<Peak> {
    let frames = spec.num_frames();
    let bins = spec.num_bins();
    if frames == 0 || bins == 0 {
        return Vec::new();
    }

    let freq_half = frequency_half_widths(alpha, bins);
    let neighborhood_max = windowed_max(spec, &freq_half, time_half);

    let mut candidates = Vec::new();
    for t in 0..frames {
        let row = spec.frame(t);
        for (f, &m) in row.iter().enumerate() {
            if m > 0.0 && m == neighborhood_max[t * bins + f] {
                candidates.push(Peak { frame: t, bin: f });
            }
        }
    }
    log::debug!(
        "NMS: {} candidates out of {} cells",
        candidates.len(),
        frames * bins
    );

    let peaks: Vec<Peak> = candidates
        .into_iter()
        .filter(|p| wins_ties(spec, *p, &freq_half, time_half))
        .filter(|p| exceeds_percentile(spec, *p, &freq_half, time_half, percentile))
        .collect();

    log::debug!("Peak extraction kept {} peaks", peaks.len());
    peaks
}

/// Per-bin frequency half-widths, `max(1, floor(alpha * ln(1 + f)))`
fn frequency_half_widths(alpha: f32, bins: usize) -> Vec<usize> {
    (0..bins)
        .map(|f| ((alpha * ((1 + f) as f32).ln()).floor() as usize).max(1))
        .collect()
}

/// Max over each cell's NMS rectangle, computed as two separable passes
///
/// The frequency half-width depends only on the bin index, so filtering
/// rows by frequency first and the result by time yields exactly the
/// rectangle `[t - time_half, t + time_half] x [f - w_f(f), f + w_f(f)]`.
fn windowed_max(spec: &Spectrogram, freq_half: &[usize], time_half: usize) -> Vec<f32> {
    let frames = spec.num_frames();
    let bins = spec.num_bins();

    let mut freq_max = vec![0.0f32; frames * bins];
    for t in 0..frames {
        let row = spec.frame(t);
        for f in 0..bins {
            let lo = f.saturating_sub(freq_half[f]);
            let hi = (f + freq_half[f]).min(bins - 1);
            let mut m = row[lo];
            for &v in &row[lo + 1..=hi] {
                m = m.max(v);
            }
            freq_max[t * bins + f] = m;
        }
    }

    let mut rect_max = vec![0.0f32; frames * bins];
    for t in 0..frames {
        let lo = t.saturating_sub(time_half);
        let hi = (t + time_half).min(frames - 1);
        for f in 0..bins {
            let mut m = freq_max[lo * bins + f];
            for tt in lo + 1..=hi {
                m = m.max(freq_max[tt * bins + f]);
            }
            rect_max[t * bins + f] = m;
        }
    }
    rect_max
}

/// Resolve equal-valued maxima deterministically
///
/// A candidate is discarded when an equal-valued cell of its rectangle
/// precedes it in `(frame ascending, bin descending)` order, i.e. the
/// later-time, lower-frequency member of a tie loses.
fn wins_ties(spec: &Spectrogram, peak: Peak, freq_half: &[usize], time_half: usize) -> bool {
    let m = spec.at(peak.frame, peak.bin);
    let lo_t = peak.frame.saturating_sub(time_half);
    let hi_t = (peak.frame + time_half).min(spec.num_frames() - 1);
    let half = freq_half[peak.bin];
    let lo_f = peak.bin.saturating_sub(half);
    let hi_f = (peak.bin + half).min(spec.num_bins() - 1);

    for t in lo_t..=hi_t {
        for f in lo_f..=hi_f {
            if t == peak.frame && f == peak.bin {
                continue;
            }
            if spec.at(t, f) == m && (t < peak.frame || (t == peak.frame && f > peak.bin)) {
                return false;
            }
        }
    }
    true
}

/// Percentile retention test over the wider neighborhood
///
/// The candidate magnitude strictly exceeds the nearest-rank p-th
/// percentile of the neighborhood exactly when at least
/// `ceil(p/100 * N)` of the N neighborhood cells are strictly below it,
/// so a counting pass replaces any per-cell sort.
fn exceeds_percentile(
    spec: &Spectrogram,
    peak: Peak,
    freq_half: &[usize],
    time_half: usize,
    percentile: f32,
) -> bool {
    let m = spec.at(peak.frame, peak.bin);
    let t_reach = time_half * PERCENTILE_WINDOW_SCALE;
    let f_reach = freq_half[peak.bin] * PERCENTILE_WINDOW_SCALE;
    let lo_t = peak.frame.saturating_sub(t_reach);
    let hi_t = (peak.frame + t_reach).min(spec.num_frames() - 1);
    let lo_f = peak.bin.saturating_sub(f_reach);
    let hi_f = (peak.bin + f_reach).min(spec.num_bins() - 1);

    let mut below = 0usize;
    let mut total = 0usize;
    for t in lo_t..=hi_t {
        let row = spec.frame(t);
        for &v in &row[lo_f..=hi_f] {
            total += 1;
            if v < m {
                below += 1;
            }
        }
    }

    let rank = ((percentile as f64 / 100.0) * total as f64).ceil() as usize;
    below >= rank
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dsp::spectrogram::stft;

    /// Build a spectrogram-shaped matrix directly for neighborhood tests.
    fn matrix(frames: usize, bins: usize, cells: &[(usize, usize, f32)], background: f32) -> Spectrogram {
        let mut data = vec![background; frames * bins];
        for &(t, f, v) in cells {
            data[t * bins + f] = v;
        }
        Spectrogram::from_raw(data, frames, bins)
    }

    #[test]
    fn test_single_spike_found() {
        let spec = matrix(32, 32, &[(10, 12, 1.0)], 0.1);
        let peaks = find_peaks(&spec, 4.0, 3, 75.0);
        assert_eq!(peaks, vec![Peak { frame: 10, bin: 12 }]);
    }

    #[test]
    fn test_flat_matrix_yields_no_peaks() {
        let spec = matrix(16, 16, &[], 0.5);
        let peaks = find_peaks(&spec, 4.0, 3, 75.0);
        assert!(
            peaks.is_empty(),
            "uniform magnitudes must not produce peaks, got {:?}",
            peaks
        );
    }

    #[test]
    fn test_silence_yields_no_peaks() {
        let spec = matrix(16, 16, &[], 0.0);
        let peaks = find_peaks(&spec, 4.0, 3, 75.0);
        assert!(peaks.is_empty());
    }

    #[test]
    fn test_time_tie_keeps_earlier_frame() {
        // Two equal maxima one frame apart, inside each other's window.
        let spec = matrix(32, 32, &[(10, 12, 1.0), (11, 12, 1.0)], 0.1);
        let peaks = find_peaks(&spec, 4.0, 3, 75.0);
        assert_eq!(peaks, vec![Peak { frame: 10, bin: 12 }]);
    }

    #[test]
    fn test_frequency_tie_keeps_higher_bin() {
        let spec = matrix(32, 32, &[(10, 12, 1.0), (10, 13, 1.0)], 0.1);
        let peaks = find_peaks(&spec, 4.0, 3, 75.0);
        assert_eq!(peaks, vec![Peak { frame: 10, bin: 13 }]);
    }

    #[test]
    fn test_distant_spikes_both_kept() {
        // Far enough apart that neither suppresses the other.
        let spec = matrix(64, 64, &[(5, 8, 1.0), (40, 50, 0.9)], 0.1);
        let peaks = find_peaks(&spec, 4.0, 3, 75.0);
        assert_eq!(
            peaks,
            vec![Peak { frame: 5, bin: 8 }, Peak { frame: 40, bin: 50 }]
        );
    }

    #[test]
    fn test_weak_peak_in_loud_surroundings_discarded() {
        // A local max whose wider neighborhood is mostly louder: NMS keeps
        // it (nothing nearby beats it inside the small window), the
        // percentile stage must drop it. Loud blocks sit outside the NMS
        // rectangle of (16, 16) but inside the 4x percentile window.
        let mut cells = Vec::new();
        for t in (4..12).chain(20..28) {
            for f in 0..33 {
                cells.push((t, f, 0.8));
            }
        }
        cells.push((16, 16, 0.5));
        let spec = matrix(33, 33, &cells, 0.0);
        let peaks = find_peaks(&spec, 4.0, 3, 75.0);
        assert!(
            !peaks.contains(&Peak { frame: 16, bin: 16 }),
            "a peak quieter than 25% of its surroundings must be dropped"
        );
    }

    #[test]
    fn test_edge_cells_handled() {
        // Spikes on every border of the grid; windows must clip, not panic.
        let spec = matrix(
            32,
            32,
            &[(0, 0, 1.0), (0, 31, 1.0), (31, 0, 1.0), (31, 31, 1.0)],
            0.1,
        );
        let peaks = find_peaks(&spec, 4.0, 3, 75.0);
        assert_eq!(peaks.len(), 4);
    }

    #[test]
    fn test_output_sorted() {
        let spec = matrix(64, 64, &[(40, 10, 1.0), (5, 50, 1.0), (20, 20, 1.0)], 0.0);
        let peaks = find_peaks(&spec, 4.0, 3, 75.0);
        let mut sorted = peaks.clone();
        sorted.sort();
        assert_eq!(peaks, sorted);
    }

    #[test]
    fn test_real_signal_peak_density_bounded() {
        // A tone sweep at 11025 Hz: peak count must stay well below the
        // cell count divided by the minimum suppression area.
        let fs = 11025u32;
        let samples: Vec<f32> = (0..fs as usize * 2)
            .map(|i| {
                let t = i as f32 / fs as f32;
                let freq = 400.0 + 1200.0 * t;
                (2.0 * std::f32::consts::PI * freq * t).sin() * 0.5
            })
            .collect();
        let spec = stft(&samples, fs as f64, 1024, 512).unwrap();
        let peaks = find_peaks(&spec, 4.0, 3, 75.0);
        let cells = spec.num_frames() * spec.num_bins();
        assert!(!peaks.is_empty(), "sweep should produce peaks");
        assert!(
            peaks.len() * 3 * 2 < cells,
            "{} peaks is too dense for {} cells",
            peaks.len(),
            cells
        );
    }
}
