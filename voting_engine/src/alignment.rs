use std::collections::HashMap;
use std::sync::{Arc, Mutex, OnceLock};

use crate::profile::ValueProfile;

/// Voter-perspective weighted similarity between two profiles, in [0, 1].
///
/// Intentionally asymmetric: only the first profile's importance weights the
/// average, modeling that the voter's priorities matter, not the target's.
/// No shared salient issue yields 0 (neutral), not an undefined value.
pub fn alignment_score(a: &ValueProfile, b: &ValueProfile) -> f64 {
    let mut sum = 0.0;
    let mut weight_sum = 0.0;
    let len = a.importance.len().min(b.importance.len());
    for i in 0..len {
        let w = a.importance[i];
        if w <= 0.0 {
            continue;
        }
        if b.importance[i] <= 0.0 {
            continue;
        }
        // stance range is 20
        let sim = 1.0 - (a.stance[i] - b.stance[i]).abs() / 20.0;
        sum += sim.clamp(0.0, 1.0) * w;
        weight_sum += w;
    }
    if weight_sum == 0.0 {
        0.0
    } else {
        sum / weight_sum
    }
}

/// Strongest single-issue contribution of `a` against `b`: the maximum of
/// `similarity * a.importance` over the shared salient issues.
pub fn best_single_issue(a: &ValueProfile, b: &ValueProfile) -> f64 {
    let mut best = 0.0;
    let len = a.importance.len().min(b.importance.len());
    for i in 0..len {
        let w = a.importance[i];
        if w <= 0.0 || b.importance[i] <= 0.0 {
            continue;
        }
        let sim = 1.0 - (a.stance[i] - b.stance[i]).abs() / 20.0;
        let score = sim.clamp(0.0, 1.0) * w;
        if score > best {
            best = score;
        }
    }
    best
}

fn pack(key: (u32, u32)) -> u64 {
    ((key.0 as u64) << 32) | key.1 as u64
}

/// Single-flight memo for alignment scores, keyed by a stable identity pair.
///
/// At most one computation runs per key: concurrent first callers block on
/// the in-flight cell and all read the same memoized value. Owned by the
/// simulation session and cleared whenever the candidate/party composition
/// changes, so a stale score can never outlive the profiles it was computed
/// from.
#[derive(Debug, Default)]
pub struct AlignmentCache {
    cells: Mutex<HashMap<u64, Arc<OnceLock<f64>>>>,
}

impl AlignmentCache {
    pub fn new() -> AlignmentCache {
        AlignmentCache {
            cells: Mutex::new(HashMap::new()),
        }
    }

    /// Returns the memoized score for `key`, computing it at most once.
    pub fn score<F>(&self, key: (u32, u32), compute: F) -> f64
    where
        F: FnOnce() -> f64,
    {
        let cell = {
            let mut cells = self.cells.lock().unwrap();
            cells
                .entry(pack(key))
                .or_insert_with(|| Arc::new(OnceLock::new()))
                .clone()
        };
        // The map lock is released before computing: other keys proceed
        // concurrently, same-key callers block on the cell.
        *cell.get_or_init(compute)
    }

    pub fn clear(&self) {
        self.cells.lock().unwrap().clear();
    }

    pub fn len(&self) -> usize {
        self.cells.lock().unwrap().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::profile::{IssueStance, IssueVocabulary};
    use std::sync::atomic::{AtomicU32, Ordering};

    fn profile(stances: &[(&str, f64, f64)], vocab: &IssueVocabulary) -> ValueProfile {
        let list: Vec<IssueStance> = stances
            .iter()
            .map(|(n, w, s)| IssueStance::new(n, *w, *s))
            .collect();
        ValueProfile::build(&list, vocab)
    }

    fn vocab(names: &[&str]) -> IssueVocabulary {
        let list: Vec<IssueStance> = names
            .iter()
            .map(|n| IssueStance::new(n, 1.0, 0.0))
            .collect();
        IssueVocabulary::from_stances(&list)
    }

    #[test]
    fn no_shared_salient_issue_scores_zero() {
        let v = vocab(&["a", "b"]);
        let left = profile(&[("a", 0.9, 5.0)], &v);
        let right = profile(&[("b", 0.9, 5.0)], &v);
        assert_eq!(alignment_score(&left, &right), 0.0);
    }

    #[test]
    fn alignment_is_asymmetric() {
        let v = vocab(&["a", "b"]);
        // The two sides weight the issues differently, so each perspective
        // averages the same per-issue similarities with different weights.
        let left = profile(&[("a", 1.0, 10.0), ("b", 0.1, 0.0)], &v);
        let right = profile(&[("a", 0.5, 8.0), ("b", 1.0, -8.0)], &v);
        let ab = alignment_score(&left, &right);
        let ba = alignment_score(&right, &left);
        // sim_a = 0.9, sim_b = 0.6
        assert!((ab - (0.9 * 1.0 + 0.6 * 0.1) / 1.1).abs() < 1e-12);
        assert!((ba - (0.9 * 0.5 + 0.6 * 1.0) / 1.5).abs() < 1e-12);
        assert!((ab - ba).abs() > 1e-12, "expected asymmetry, got {} vs {}", ab, ba);
    }

    #[test]
    fn identical_stances_score_one() {
        let v = vocab(&["a"]);
        let p = profile(&[("a", 0.5, 3.0)], &v);
        assert!((alignment_score(&p, &p) - 1.0).abs() < 1e-12);
    }

    #[test]
    fn opposite_extremes_score_zero() {
        let v = vocab(&["a"]);
        let left = profile(&[("a", 1.0, 10.0)], &v);
        let right = profile(&[("a", 1.0, -10.0)], &v);
        assert_eq!(alignment_score(&left, &right), 0.0);
    }

    #[test]
    fn best_single_issue_picks_strongest() {
        let v = vocab(&["a", "b"]);
        let left = profile(&[("a", 1.0, 0.0), ("b", 0.2, 0.0)], &v);
        let right = profile(&[("a", 0.5, 0.0), ("b", 0.5, 0.0)], &v);
        assert!((best_single_issue(&left, &right) - 1.0).abs() < 1e-12);
    }

    #[test]
    fn cache_computes_each_key_once() {
        let cache = AlignmentCache::new();
        let calls = AtomicU32::new(0);
        for _ in 0..3 {
            let got = cache.score((7, 9), || {
                calls.fetch_add(1, Ordering::SeqCst);
                0.25
            });
            assert_eq!(got, 0.25);
        }
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert_eq!(cache.len(), 1);
        cache.clear();
        assert!(cache.is_empty());
    }

    #[test]
    fn cache_single_flight_under_concurrency() {
        use std::sync::atomic::AtomicU32 as Counter;
        let cache = Arc::new(AlignmentCache::new());
        let calls = Arc::new(Counter::new(0));
        let mut handles = Vec::new();
        for _ in 0..8 {
            let cache = Arc::clone(&cache);
            let calls = Arc::clone(&calls);
            handles.push(std::thread::spawn(move || {
                cache.score((1, 2), || {
                    calls.fetch_add(1, Ordering::SeqCst);
                    std::thread::sleep(std::time::Duration::from_millis(5));
                    0.5
                })
            }));
        }
        for h in handles {
            assert_eq!(h.join().unwrap(), 0.5);
        }
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }
}
