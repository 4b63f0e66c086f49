//! Slice boundary rule.
//!
//! Onset positions partition the audio into contiguous intervals: slice `i`
//! spans `[onsets[i], onsets[i+1])`. The final onset has no known end
//! boundary, so it produces no trailing slice; `n` onsets yield `n - 1`
//! slices. Slices never carry audio themselves; playback reads
//! `pcm[start..end]` from the owning sample.

/// Turn an ascending onset-position list into `(start, end)` intervals.
///
/// 0 or 1 positions yield no intervals. Positions are assumed sorted
/// ascending; equal neighbors would produce an empty interval and are
/// skipped.
pub fn materialize(onsets: &[u64]) -> Vec<(u64, u64)> {
    onsets
        .windows(2)
        .filter(|w| w[1] > w[0])
        .map(|w| (w[0], w[1]))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_partition_rule() {
        let slices = materialize(&[0, 100, 250, 400]);
        assert_eq!(slices, vec![(0, 100), (100, 250), (250, 400)]);
    }

    #[test]
    fn test_no_trailing_slice() {
        // the final onset never opens an interval
        let slices = materialize(&[10, 20]);
        assert_eq!(slices, vec![(10, 20)]);
    }

    #[test]
    fn test_degenerate_inputs() {
        assert!(materialize(&[]).is_empty());
        assert!(materialize(&[42]).is_empty());
    }

    #[test]
    fn test_duplicate_positions_skipped() {
        let slices = materialize(&[0, 100, 100, 200]);
        assert_eq!(slices, vec![(0, 100), (100, 200)]);
    }

    #[test]
    fn test_contiguous_no_gaps() {
        let onsets: Vec<u64> = (0..10).map(|i| i * 37).collect();
        let slices = materialize(&onsets);
        assert_eq!(slices.len(), 9);
        for w in slices.windows(2) {
            assert_eq!(w[0].1, w[1].0);
        }
    }
}
