//! Approximate lookup: toggle-bit candidate expansion plus sliding-window
//! voting over tracked candidate ids.
//!
//! Each probe frame comes with a toggle mask marking its unreliable bits.
//! Every subset of those bits is tried flipped, each resulting candidate is
//! probed against the posting index, and the tracks seen there accumulate
//! votes inside a bounded window of probe frames. The first track whose
//! window reaches `block` frames with `count / window >= threshold` wins;
//! the probe stops there.

use hashbrown::HashMap;
use std::time::Instant;
use tracing::debug;

use crate::{IndexError, LookupConfig, TrackIndex};

/// A track whose sliding window crossed the confidence threshold.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Match {
    pub id: i64,
    /// Lowest track position seen inside the winning window, i.e. where the
    /// probe aligned.
    pub pos: u32,
    /// `count / window_length` at emission time.
    pub score: f64,
}

/// Vote window for one candidate id: probe-frame indices bounding the window,
/// the lowest track position seen, and the votes collected.
#[derive(Clone, Copy, Debug)]
struct Window {
    start: u32,
    last: u32,
    pos: u32,
    count: u32,
}

/// Expands `frame` into every value reachable by flipping a subset of the
/// bits set in `toggle`, the unmodified frame first. Permutation `p` flips
/// the j-th highest toggle bit iff bit j of `p` is set, so the order is
/// deterministic and duplicates are impossible.
pub(crate) fn expand_candidates(frame: u32, toggle: u32, out: &mut Vec<u32>) {
    out.clear();
    out.push(frame);

    let mut bits = [0u32; 32];
    let mut n = 0usize;
    let mut probe = 0x8000_0000u32;
    while probe != 0 {
        if toggle & probe != 0 {
            bits[n] = probe;
            n += 1;
        }
        probe >>= 1;
    }

    let total = 1usize << n;
    for perm in 1..total {
        let mut value = frame;
        for (j, &mask) in bits[..n].iter().enumerate() {
            if perm & (1 << j) != 0 {
                value ^= mask;
            }
        }
        out.push(value);
    }
}

impl TrackIndex {
    /// Runs a probe against the index, returning at most one match (the
    /// first track to cross `threshold`). Hash and toggle slices must be the
    /// same non-zero length, and every toggle mask must respect the
    /// configured popcount cap; these are validated up front so a failing
    /// probe does no work.
    pub fn lookup(
        &self,
        frames: &[u32],
        toggles: &[u32],
        threshold: f64,
        cfg: &LookupConfig,
    ) -> Result<Vec<Match>, IndexError> {
        if frames.is_empty() || toggles.is_empty() {
            return Err(IndexError::EmptyProbe);
        }
        if frames.len() != toggles.len() {
            return Err(IndexError::ProbeLengthMismatch {
                hashes: frames.len(),
                toggles: toggles.len(),
            });
        }
        for &toggle in toggles {
            let popcount = toggle.count_ones();
            if popcount > cfg.max_toggle_bits {
                return Err(IndexError::ToggleTooWide {
                    popcount,
                    limit: cfg.max_toggle_bits,
                });
            }
        }

        let started = Instant::now();
        debug!(n_frames = frames.len(), threshold, "lookup probe");

        let mut tracker: HashMap<i64, Window> = HashMap::new();
        let mut candidates: Vec<u32> = Vec::new();
        let mut results: Vec<Match> = Vec::new();

        for (i, (&frame, &toggle)) in frames.iter().zip(toggles.iter()).enumerate() {
            expand_candidates(frame, toggle, &mut candidates);
            for &candidate in &candidates {
                if let Some(found) =
                    self.probe_candidate(i as u32, threshold, candidate, &mut tracker, cfg)
                {
                    results.push(found);
                    break;
                }
            }
            if !results.is_empty() {
                break;
            }
        }

        debug!(
            found = results.len(),
            elapsed_us = started.elapsed().as_micros() as u64,
            "lookup done"
        );
        Ok(results)
    }

    /// Scans one candidate's posting list head-first, updating the tracker.
    /// Returns a match as soon as a tracked id's window reaches `block`
    /// frames with a score at or above `threshold`.
    fn probe_candidate(
        &self,
        current: u32,
        threshold: f64,
        candidate: u32,
        tracker: &mut HashMap<i64, Window>,
        cfg: &LookupConfig,
    ) -> Option<Match> {
        let mut cursor = self.posting_head(candidate);
        let mut scanned = 0usize;
        while let Some(handle) = cursor {
            if scanned >= cfg.entries_per_frame_limit {
                break;
            }
            let entry = self.entry(handle);
            match tracker.get_mut(&entry.id) {
                None => {
                    tracker.insert(
                        entry.id,
                        Window {
                            start: current,
                            last: current,
                            pos: entry.pos,
                            count: 1,
                        },
                    );
                }
                Some(window) => {
                    if current <= window.last + cfg.steps {
                        // Still inside the active window.
                        window.pos = window.pos.min(entry.pos);
                        window.count += 1;
                        window.last = current;

                        let length = window.last - window.start + 1;
                        if length >= cfg.block {
                            let score = f64::from(window.count) / f64::from(length);
                            if score >= threshold {
                                let found = Match {
                                    id: entry.id,
                                    pos: window.pos,
                                    score,
                                };
                                tracker.remove(&entry.id);
                                return Some(found);
                            }
                        }
                    } else {
                        // Fell out of range; restart the window here.
                        *window = Window {
                            start: current,
                            last: current,
                            pos: entry.pos,
                            count: 1,
                        };
                    }
                }
            }
            cursor = entry.next;
            scanned += 1;
        }
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ascending_track(n: u32) -> Vec<u32> {
        (1..=n).map(|i| i * 100).collect()
    }

    #[test]
    fn expansion_with_zero_toggle_is_identity() {
        let mut out = Vec::new();
        expand_candidates(0xDEADBEEF, 0, &mut out);
        assert_eq!(out, vec![0xDEADBEEF]);
    }

    #[test]
    fn expansion_order_is_msb_first() {
        let mut out = Vec::new();
        expand_candidates(0x0, 0b101, &mut out);
        // Toggle bits MSB-first: 0b100 then 0b001; permutation bit 0 drives
        // the highest toggle bit.
        assert_eq!(out, vec![0b000, 0b100, 0b001, 0b101]);
    }

    #[test]
    fn expansion_covers_all_subsets() {
        let toggle = 0x8000_0011u32;
        let mut out = Vec::new();
        expand_candidates(0x1234_5678, toggle, &mut out);
        assert_eq!(out.len(), 8);
        let unique: std::collections::HashSet<u32> = out.iter().copied().collect();
        assert_eq!(unique.len(), 8);
        for value in unique {
            assert_eq!(value & !toggle, 0x1234_5678 & !toggle);
        }
    }

    #[test]
    fn exact_probe_matches_at_aligned_position() {
        let mut index = TrackIndex::new();
        let frames = ascending_track(300);
        index.insert_track(77, &frames).expect("insert");

        let probe = &frames[10..160];
        let toggles = vec![0u32; probe.len()];
        let cfg = LookupConfig::default();
        let hits = index.lookup(probe, &toggles, 0.80, &cfg).expect("lookup");

        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].id, 77);
        assert_eq!(hits[0].pos, 10);
        assert!(hits[0].score >= 0.80);
    }

    #[test]
    fn probe_shorter_than_block_never_matches() {
        let mut index = TrackIndex::new();
        let frames = ascending_track(300);
        index.insert_track(1, &frames).expect("insert");

        let cfg = LookupConfig::default();
        let probe = &frames[..(cfg.block - 1) as usize];
        let toggles = vec![0u32; probe.len()];
        let hits = index.lookup(probe, &toggles, 0.01, &cfg).expect("lookup");
        assert!(hits.is_empty());
    }

    #[test]
    fn toggled_bits_recover_corrupted_frames() {
        let mut index = TrackIndex::new();
        let frames = ascending_track(200);
        index.insert_track(5, &frames).expect("insert");

        // Corrupt the low bit of every probe frame and mark it unreliable.
        let probe: Vec<u32> = frames[..150].iter().map(|f| f ^ 0x1).collect();
        let toggles = vec![0x1u32; probe.len()];
        let cfg = LookupConfig::default();
        let hits = index.lookup(&probe, &toggles, 0.80, &cfg).expect("lookup");
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].id, 5);
    }

    #[test]
    fn stale_window_restarts_instead_of_accumulating() {
        let mut index = TrackIndex::new();
        let frames = ascending_track(400);
        index.insert_track(3, &frames).expect("insert");

        // First 40 probe frames align with the track, then a gap longer than
        // `steps` of misses, then 80 more aligned frames. The window must
        // restart after the gap, so no 100-frame window ever forms.
        let cfg = LookupConfig::default();
        let mut probe: Vec<u32> = frames[..40].to_vec();
        probe.extend(std::iter::repeat(0xFFFF_0000u32).take(30));
        probe.extend_from_slice(&frames[200..280]);
        let toggles = vec![0u32; probe.len()];

        let hits = index.lookup(&probe, &toggles, 0.30, &cfg).expect("lookup");
        assert!(hits.is_empty());
    }

    #[test]
    fn posting_scan_respects_entry_limit() {
        let mut index = TrackIndex::new();
        for id in 1..=11i64 {
            index.insert_track(id, &[0xCAFE]).expect("insert");
        }

        let cfg = LookupConfig::default();
        let mut tracker = HashMap::new();
        let hit = index.probe_candidate(0, 0.30, 0xCAFE, &mut tracker, &cfg);
        assert!(hit.is_none());
        // Eleven entries share the frame, but only the head-first ten may be
        // examined; the first-inserted track stays untracked.
        assert_eq!(tracker.len(), cfg.entries_per_frame_limit);
        assert!(!tracker.contains_key(&1));
    }

    #[test]
    fn first_hit_wins_among_identical_tracks() {
        let mut index = TrackIndex::new();
        let frames = ascending_track(200);
        for id in [10, 20, 30] {
            index.insert_track(id, &frames).expect("insert");
        }

        let probe = &frames[..150];
        let toggles = vec![0u32; probe.len()];
        let cfg = LookupConfig::default();
        let hits = index.lookup(probe, &toggles, 0.50, &cfg).expect("lookup");

        // Posting lists are head-first by recency, so the last track added
        // is tracked first and crosses the threshold first.
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].id, 30);
    }

    #[test]
    fn empty_index_yields_no_matches() {
        let index = TrackIndex::new();
        let probe = vec![1u32; 150];
        let toggles = vec![0u32; 150];
        let cfg = LookupConfig::default();
        let hits = index.lookup(&probe, &toggles, 0.30, &cfg).expect("lookup");
        assert!(hits.is_empty());
    }

    #[test]
    fn probe_validation_errors() {
        let index = TrackIndex::new();
        let cfg = LookupConfig::default();

        let err = index.lookup(&[], &[], 0.3, &cfg).expect_err("empty");
        assert!(matches!(err, IndexError::EmptyProbe));

        let err = index
            .lookup(&[1, 2], &[0], 0.3, &cfg)
            .expect_err("length mismatch");
        assert!(matches!(err, IndexError::ProbeLengthMismatch { .. }));

        let err = index
            .lookup(&[1], &[0x1FFF], 0.3, &cfg)
            .expect_err("toggle too wide");
        assert!(matches!(
            err,
            IndexError::ToggleTooWide {
                popcount: 13,
                limit: 12
            }
        ));
    }
}
