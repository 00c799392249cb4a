//! Two-stage fingerprint matching
//!
//! Stage 1 recalls postings for every query address and accumulates match
//! lists per track, discarding tracks below the `k_min` floor. Stage 2
//! verifies temporal coherence: a genuine match shares one offset between
//! query and database time axes, so each surviving track is scored by the
//! largest bucket of its offset histogram. The decision requires the best
//! score to clear `s_min` and to lead the runner-up by `margin`; anything
//! closer is reported as ambiguous rather than picked arbitrarily.
//!
//! Work is linear in the postings touched; the index is never scanned.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::config::EngineConfig;
use crate::features::Fingerprint;
use crate::store::FingerprintStore;

/// A verified identification
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrackMatch {
    /// Identified track
    pub track_id: u32,
    /// Size of the winning offset bucket
    pub score: usize,
    /// Winning offset in frames: database anchor minus query anchor, so a
    /// positive value places the query inside the track at that frame
    pub offset: i64,
}

/// Result of a query
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum MatchOutcome {
    /// Exactly one track cleared the score floor and the margin
    Match(TrackMatch),
    /// No track reached `k_min` matches or the `s_min` score floor
    NoMatch,
    /// The two best tracks scored within the margin of each other; both
    /// contenders are surfaced as the diagnostic
    Ambiguous {
        /// Highest-scoring contender
        best: TrackMatch,
        /// Contender that the margin check failed against
        runner_up: TrackMatch,
    },
}

impl MatchOutcome {
    /// The identified track, when the outcome is a match
    pub fn matched(&self) -> Option<&TrackMatch> {
        match self {
            MatchOutcome::Match(m) => Some(m),
            _ => None,
        }
    }
}

/// Query the store with a fingerprint set
///
/// Uses `k_min`, `s_min`, `margin` and `bucket` from the configuration.
/// Returns at most one track; candidates that tie within the margin yield
/// [`MatchOutcome::Ambiguous`].
pub fn query(
    store: &FingerprintStore,
    prints: &[Fingerprint],
    config: &EngineConfig,
) -> MatchOutcome {
    // Stage 1: candidate extraction by address overlap.
    let mut offsets_by_track: HashMap<u32, Vec<i64>> = HashMap::new();
    for print in prints {
        for posting in store.recall(print.address) {
            offsets_by_track
                .entry(posting.track_id)
                .or_default()
                .push(posting.anchor as i64 - print.anchor as i64);
        }
    }
    let candidates = offsets_by_track.len();
    offsets_by_track.retain(|_, offsets| offsets.len() >= config.k_min);

    log::debug!(
        "Stage 1: {} query fingerprints, {} candidate tracks, {} past k_min={}",
        prints.len(),
        candidates,
        offsets_by_track.len(),
        config.k_min
    );

    // Stage 2: time-coherence verification per track.
    let mut scored: Vec<TrackMatch> = offsets_by_track
        .iter()
        .map(|(&track_id, offsets)| {
            let (score, offset) = best_bucket(offsets, config.bucket);
            TrackMatch {
                track_id,
                score,
                offset,
            }
        })
        .collect();
    // Deterministic ranking: score descending, then track id.
    scored.sort_unstable_by(|a, b| b.score.cmp(&a.score).then(a.track_id.cmp(&b.track_id)));

    let Some(&best) = scored.first() else {
        return MatchOutcome::NoMatch;
    };
    if best.score < config.s_min {
        log::debug!(
            "Best candidate track {} scored {} below s_min={}",
            best.track_id,
            best.score,
            config.s_min
        );
        return MatchOutcome::NoMatch;
    }
    if let Some(&runner_up) = scored.get(1) {
        if best.score < runner_up.score + config.margin {
            log::debug!(
                "Ambiguous: track {} ({}) vs track {} ({}) within margin {}",
                best.track_id,
                best.score,
                runner_up.track_id,
                runner_up.score,
                config.margin
            );
            return MatchOutcome::Ambiguous { best, runner_up };
        }
    }
    MatchOutcome::Match(best)
}

/// Largest histogram bucket of an offset multiset
///
/// Offsets are bucketed by floor division by `bucket`. Equal-count buckets
/// resolve toward the bucket closest to offset zero (then toward the
/// non-negative side), keeping the result deterministic. Returns the bucket
/// population and its representative offset, the bucket's lower edge.
fn best_bucket(offsets: &[i64], bucket: usize) -> (usize, i64) {
    let width = bucket as i64;
    let mut histogram: HashMap<i64, usize> = HashMap::new();
    for &delta in offsets {
        *histogram.entry(delta.div_euclid(width)).or_insert(0) += 1;
    }

    let (&index, &count) = histogram
        .iter()
        .min_by(|(ia, ca), (ib, cb)| {
            cb.cmp(ca)
                .then(ia.unsigned_abs().cmp(&ib.unsigned_abs()))
                .then(ib.cmp(ia))
        })
        .expect("offsets is non-empty past the k_min floor");
    (count, index * width)
}
