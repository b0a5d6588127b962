//! Merge sparse bins along one axis at a time, judged on each axis's marginal.

use std::collections::BTreeMap;

use op_core::{Error, Result};

use crate::histogram::NdHistogram;

/// Result of [`merge_sparse_bins`].
#[derive(Debug, Clone)]
pub struct BinMergeOutcome {
    /// Histogram after all merges.
    pub histogram: NdHistogram,
    /// Merges performed per axis (every axis listed, zero included).
    pub merges: BTreeMap<String, usize>,
}

/// Merge adjacent bins whose marginal fraction is below `min_fraction`.
///
/// Axes are processed in grid order. On each axis the leftmost sparse bin is
/// merged into its smaller neighbour (ties go left) until no bin is sparse
/// or the axis is down to `min_bins` bins.
pub fn merge_sparse_bins(
    hist: &NdHistogram,
    min_fraction: f64,
    min_bins: usize,
) -> Result<BinMergeOutcome> {
    if !(0.0..=1.0).contains(&min_fraction) {
        return Err(Error::invalid_argument(format!(
            "merge min fraction must be in [0, 1] (got {min_fraction})"
        )));
    }
    if min_bins < 1 {
        return Err(Error::invalid_argument("merge min bins must be >= 1"));
    }

    let total = hist.total();
    let fraction = |c: u64| if total == 0 { 0.0 } else { c as f64 / total as f64 };

    let mut current = hist.clone();
    let mut merges = BTreeMap::new();
    for axis in 0..current.n_axes() {
        let name = current.axes()[axis].name.clone();
        let mut n_merges = 0usize;
        loop {
            let marginal = current.marginal(axis);
            if marginal.len() <= min_bins {
                break;
            }
            let Some(sparse) = marginal.iter().position(|&c| fraction(c) < min_fraction) else {
                break;
            };
            let left = match (sparse.checked_sub(1), marginal.get(sparse + 1)) {
                (Some(l), Some(&right)) if marginal[l] <= right => l,
                (Some(_), Some(_)) => sparse,
                (Some(l), None) => l,
                (None, _) => sparse,
            };
            current = current.merge_adjacent_bins(axis, left)?;
            n_merges += 1;
        }
        if n_merges > 0 {
            let bins = current.axes()[axis].n_bins();
            tracing::info!(axis = %name, merges = n_merges, bins, "merged sparse bins");
        }
        merges.insert(name, n_merges);
    }

    Ok(BinMergeOutcome { histogram: current, merges })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::histogram::HistogramAxis;
    use proptest::prelude::*;

    fn hist_1d(edges: &[u64], counts: &[u64]) -> NdHistogram {
        NdHistogram::from_counts(
            vec![HistogramAxis { name: "n_muons".into(), edges: edges.to_vec() }],
            counts.to_vec(),
        )
        .unwrap()
    }

    #[test]
    fn sparse_middle_bin_is_absorbed() {
        let h = hist_1d(&[0, 1, 2, 3], &[100, 1, 100]);
        let out = merge_sparse_bins(&h, 0.02, 1).unwrap();
        assert_eq!(out.merges["n_muons"], 1);
        assert_eq!(out.histogram.counts(), &[101, 100]);
        assert_eq!(out.histogram.boundaries().get("n_muons"), Some(&[0u64, 2, 3][..]));
    }

    #[test]
    fn floor_is_respected() {
        let h = hist_1d(&[0, 1, 2], &[1, 1]);
        let out = merge_sparse_bins(&h, 0.9, 2).unwrap();
        assert_eq!(out.merges["n_muons"], 0);
        assert_eq!(out.histogram.counts(), &[1, 1]);
    }

    #[test]
    fn edge_bins_merge_inward() {
        let h = hist_1d(&[0, 1, 2, 3, 4], &[1, 50, 50, 1]);
        let out = merge_sparse_bins(&h, 0.05, 1).unwrap();
        assert_eq!(out.merges["n_muons"], 2);
        assert_eq!(out.histogram.counts(), &[51, 51]);
        assert_eq!(out.histogram.axes()[0].edges, vec![0, 2, 4]);
    }

    #[test]
    fn merges_into_smaller_neighbour() {
        let h = hist_1d(&[0, 1, 2, 3], &[80, 1, 40]);
        let out = merge_sparse_bins(&h, 0.05, 1).unwrap();
        assert_eq!(out.histogram.counts(), &[80, 41]);
    }

    #[test]
    fn two_axes_use_marginals() {
        let h = NdHistogram::from_counts(
            vec![
                HistogramAxis { name: "a".into(), edges: vec![0, 1, 2, 3] },
                HistogramAxis { name: "b".into(), edges: vec![0, 1, 2] },
            ],
            vec![50, 50, 1, 0, 50, 50],
        )
        .unwrap();
        let out = merge_sparse_bins(&h, 0.05, 1).unwrap();
        assert_eq!(out.merges["a"], 1);
        assert_eq!(out.merges["b"], 0);
        assert_eq!(out.histogram.shape(), vec![2, 2]);
        assert_eq!(out.histogram.total(), 201);
    }

    #[test]
    fn bad_parameters() {
        let h = hist_1d(&[0, 1], &[1]);
        assert!(merge_sparse_bins(&h, 1.5, 1).is_err());
        assert!(merge_sparse_bins(&h, 0.1, 0).is_err());
    }

    proptest! {
        #[test]
        fn merging_keeps_total_and_floor(
            counts in proptest::collection::vec(0u64..50, 12),
            min_fraction in 0.0f64..0.5,
            min_bins in 1usize..4,
        ) {
            let axes = vec![
                HistogramAxis { name: "a".into(), edges: vec![0, 1, 2, 3, 4] },
                HistogramAxis { name: "b".into(), edges: vec![0, 2, 4, 6] },
            ];
            let h = NdHistogram::from_counts(axes, counts).unwrap();
            let out = merge_sparse_bins(&h, min_fraction, min_bins).unwrap();
            prop_assert_eq!(out.histogram.total(), h.total());
            for (before, after) in h.shape().iter().zip(out.histogram.shape()) {
                prop_assert!(after <= *before);
                prop_assert!(after >= min_bins.min(*before));
            }
        }
    }
}
