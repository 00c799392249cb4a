//! Combinatorial peak pairing
//!
//! Each peak acts once as an anchor and is paired with up to `fanout` later
//! peaks inside its target zone, a bounded time-frequency rectangle. The
//! pair `(anchor_bin, target_bin, frame_delta)` packs into one 64-bit
//! address; the anchor's frame index rides alongside so matching can test
//! temporal coherence.
//!
//! Bounded zones keep the output at `O(fanout * peaks)`, and the fan-out
//! redundancy lets a partial, noisy recording still carry intact pairs.

use crate::features::{Fingerprint, Peak};

/// Pack an anchor-target relation into its address
///
/// Layout: `(anchor_bin << 32) | (target_bin << 16) | frame_delta`, all
/// little fields 16 bits wide. The layout is pinned by the database format
/// version and must not change for the life of a database; it is
/// collision-free while bins and frame deltas stay below 2^16, which the
/// configuration validation enforces.
pub fn pack_address(anchor_bin: usize, target_bin: usize, frame_delta: usize) -> u64 {
    debug_assert!(anchor_bin < (1 << 16), "anchor bin out of address range");
    debug_assert!(target_bin < (1 << 16), "target bin out of address range");
    debug_assert!(frame_delta < (1 << 16), "frame delta out of address range");
    ((anchor_bin as u64) << 32) | ((target_bin as u64) << 16) | frame_delta as u64
}

/// Unpack an address into `(anchor_bin, target_bin, frame_delta)`
pub fn unpack_address(address: u64) -> (u16, u16, u16) {
    (
        (address >> 32) as u16,
        (address >> 16) as u16,
        address as u16,
    )
}

/// Pair peaks into fingerprints
///
/// # Arguments
///
/// * `peaks` - Feature points sorted by `(frame, bin)` ascending
/// * `dt_min`, `dt_max` - Target zone time bounds in frames (inclusive)
/// * `df_max` - Target zone frequency bound in bins (absolute difference)
/// * `fanout` - Maximum targets per anchor, taken closest-first by
///   `(frame delta, bin distance)`
///
/// # Returns
///
/// At most `peaks.len() * fanout` fingerprints, in anchor order.
pub fn pair_peaks(
    peaks: &[Peak],
    dt_min: usize,
    dt_max: usize,
    df_max: usize,
    fanout: usize,
) -> Vec<Fingerprint> {
    debug_assert!(peaks.windows(2).all(|w| w[0] <= w[1]), "peaks must be sorted");

    let mut prints = Vec::new();
    // (frame delta, bin distance, target bin) - sorting this triple is the
    // closest-first order, with the bin index as the deterministic tail.
    let mut zone: Vec<(usize, usize, usize)> = Vec::new();

    for (i, anchor) in peaks.iter().enumerate() {
        zone.clear();
        for target in &peaks[i + 1..] {
            let dt = target.frame - anchor.frame;
            if dt > dt_max {
                break;
            }
            if dt < dt_min {
                continue;
            }
            let df = target.bin.abs_diff(anchor.bin);
            if df > df_max {
                continue;
            }
            zone.push((dt, df, target.bin));
        }
        zone.sort_unstable();
        for &(dt, _, target_bin) in zone.iter().take(fanout) {
            prints.push(Fingerprint {
                address: pack_address(anchor.bin, target_bin, dt),
                anchor: anchor.frame as u32,
            });
        }
    }

    log::debug!(
        "Paired {} peaks into {} fingerprints",
        peaks.len(),
        prints.len()
    );
    prints
}

#[cfg(test)]
mod tests {
    use super::*;

    fn peak(frame: usize, bin: usize) -> Peak {
        Peak { frame, bin }
    }

    #[test]
    fn test_address_roundtrip() {
        let address = pack_address(513, 212, 31);
        assert_eq!(unpack_address(address), (513, 212, 31));
    }

    #[test]
    fn test_addresses_distinct_across_fields() {
        // Same component values in different roles must not collide.
        let a = pack_address(5, 7, 3);
        let b = pack_address(7, 5, 3);
        let c = pack_address(3, 7, 5);
        assert_ne!(a, b);
        assert_ne!(a, c);
        assert_ne!(b, c);
    }

    #[test]
    fn test_zone_time_bounds() {
        let peaks = vec![peak(10, 100), peak(10, 120), peak(11, 100), peak(50, 100)];
        let prints = pair_peaks(&peaks, 1, 32, 64, 5);
        // Anchor (10,100): same-frame (10,120) excluded by dt_min, (50,100)
        // excluded by dt_max, leaving (11,100). Anchor (10,120) likewise
        // pairs only with (11,100); (11,100) and (50,100) have no targets.
        assert_eq!(prints.len(), 2);
        assert_eq!(prints[0].address, pack_address(100, 100, 1));
        assert_eq!(prints[0].anchor, 10);
        assert_eq!(prints[1].address, pack_address(120, 100, 1));
    }

    #[test]
    fn test_zone_frequency_bound() {
        let peaks = vec![peak(10, 100), peak(12, 180), peak(12, 160)];
        let prints = pair_peaks(&peaks, 1, 32, 64, 5);
        // |180 - 100| = 80 exceeds df_max, |160 - 100| = 60 does not.
        assert_eq!(prints.len(), 1);
        assert_eq!(prints[0].address, pack_address(100, 160, 2));
    }

    #[test]
    fn test_fanout_cap_keeps_closest() {
        let peaks = vec![
            peak(10, 100),
            peak(11, 101), // dt 1, df 1
            peak(11, 110), // dt 1, df 10
            peak(12, 100), // dt 2, df 0
            peak(13, 102), // dt 3, df 2
            peak(14, 100), // dt 4, df 0
        ];
        let prints = pair_peaks(&peaks, 1, 32, 64, 2);
        let from_first: Vec<_> = prints.iter().filter(|p| p.anchor == 10).collect();
        assert_eq!(from_first.len(), 2);
        // Closest-first by (dt, df): (11,101) then (11,110).
        assert_eq!(from_first[0].address, pack_address(100, 101, 1));
        assert_eq!(from_first[1].address, pack_address(100, 110, 1));
    }

    #[test]
    fn test_fingerprint_bound() {
        let peaks: Vec<Peak> = (0..100).map(|i| peak(i, (i * 7) % 64)).collect();
        let fanout = 5;
        let prints = pair_peaks(&peaks, 1, 32, 64, fanout);
        assert!(
            prints.len() <= peaks.len() * fanout,
            "{} fingerprints exceeds bound {}",
            prints.len(),
            peaks.len() * fanout
        );
    }

    #[test]
    fn test_empty_and_single_peak() {
        assert!(pair_peaks(&[], 1, 32, 64, 5).is_empty());
        assert!(pair_peaks(&[peak(0, 0)], 1, 32, 64, 5).is_empty());
    }

    #[test]
    fn test_deterministic_order() {
        let peaks: Vec<Peak> = (0..50).map(|i| peak(i / 2, (i * 13) % 100)).collect();
        let mut sorted = peaks.clone();
        sorted.sort();
        let a = pair_peaks(&sorted, 1, 32, 64, 5);
        let b = pair_peaks(&sorted, 1, 32, 64, 5);
        assert_eq!(a, b);
    }
}
