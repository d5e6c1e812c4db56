use std::ops::{AddAssign, Range};

use rayon::prelude::*;

/// Contiguous index chunks over `0..len`, one per available worker.
///
/// Chunk boundaries depend only on `len` and the worker count, never on
/// scheduling, so partial results can be merged in a fixed order.
pub fn chunk_ranges(len: usize) -> Vec<Range<usize>> {
    if len == 0 {
        return Vec::new();
    }
    let workers = std::thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(1);
    let chunks = workers.min(len);
    let size = (len + chunks - 1) / chunks;
    let mut ranges = Vec::with_capacity(chunks);
    let mut start = 0;
    while start < len {
        let end = (start + size).min(len);
        ranges.push(start..end);
        start = end;
    }
    ranges
}

/// Parallel map over the index chunks of `0..len`. Partials come back in
/// chunk order, so a deterministic reduction only has to fold left to
/// right; final tallies are invariant to thread scheduling.
pub fn map_chunks<R, F>(len: usize, f: F) -> Vec<R>
where
    R: Send,
    F: Fn(Range<usize>) -> R + Send + Sync,
{
    chunk_ranges(len).into_par_iter().map(f).collect()
}

/// Folds per-chunk tally vectors elementwise, in chunk-index order.
pub fn merge_tallies<T>(partials: Vec<Vec<T>>) -> Vec<T>
where
    T: AddAssign + Copy + Default,
{
    let width = match partials.first() {
        Some(p) => p.len(),
        None => return Vec::new(),
    };
    let mut merged = vec![T::default(); width];
    for part in partials {
        for (slot, value) in merged.iter_mut().zip(part) {
            *slot += value;
        }
    }
    merged
}

/// Parallel per-item map that preserves input order: chunked evaluation,
/// then concatenation in chunk order.
pub fn map_ordered<R, F>(len: usize, f: F) -> Vec<R>
where
    R: Send,
    F: Fn(usize) -> R + Sync,
{
    map_chunks(len, |range| range.map(&f).collect::<Vec<R>>())
        .into_iter()
        .flatten()
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn chunks_cover_range_in_order() {
        let ranges = chunk_ranges(103);
        assert_eq!(ranges.first().unwrap().start, 0);
        assert_eq!(ranges.last().unwrap().end, 103);
        for pair in ranges.windows(2) {
            assert_eq!(pair[0].end, pair[1].start);
        }
    }

    #[test]
    fn empty_input_has_no_chunks() {
        assert!(chunk_ranges(0).is_empty());
        let merged: Vec<u64> = merge_tallies(Vec::new());
        assert!(merged.is_empty());
    }

    #[test]
    fn merge_is_elementwise_sum() {
        let merged = merge_tallies(vec![vec![1u64, 2, 3], vec![10, 20, 30]]);
        assert_eq!(merged, vec![11, 22, 33]);
    }

    #[test]
    fn map_ordered_preserves_order() {
        let doubled = map_ordered(1000, |i| i * 2);
        assert_eq!(doubled.len(), 1000);
        assert_eq!(doubled[0], 0);
        assert_eq!(doubled[999], 1998);
    }

    #[test]
    fn chunked_tally_matches_sequential() {
        let n = 997;
        let partials = map_chunks(n, |range| {
            let mut counts = vec![0u64; 4];
            for i in range {
                counts[i % 4] += 1;
            }
            counts
        });
        let merged = merge_tallies(partials);
        let mut expected = vec![0u64; 4];
        for i in 0..n {
            expected[i % 4] += 1;
        }
        assert_eq!(merged, expected);
    }
}
