//! Agglomerate sparse grid cells across axes into contiguous groups.
//!
//! Unlike [`crate::merge_bins`], this works on individual cells, so a
//! combination of per-axis-common bins that is jointly rare is still found.
//! The sparsest group is always processed first (min-heap on count with lazy
//! invalidation). It is merged into the adjacent group that keeps the union a
//! hyper-rectangle and gives the smallest combined count; when no adjacent
//! group keeps it rectangular, the smallest adjacent group is used instead.

use std::cmp::Reverse;
use std::collections::{BTreeMap, BTreeSet, BinaryHeap};

use op_core::{Error, Result};

use crate::histogram::{HistogramAxis, NdHistogram};
use crate::summary::{HistogramSummary, summarize_counts};

/// One group of merged cells.
#[derive(Debug, Clone, PartialEq)]
pub struct MergedGroup {
    /// Multi-indices of the member cells (grid axis order), sorted row-major.
    pub cells: Vec<Vec<usize>>,
    /// Summed count.
    pub count: u64,
    /// `count / total`.
    pub fraction: f64,
}

/// A merged group with its cells keyed by axis name.
#[derive(Debug, Clone, PartialEq)]
pub struct LabeledGroup {
    /// Member cells as `axis -> bin index`.
    pub cells: Vec<BTreeMap<String, usize>>,
    /// Summed count.
    pub count: u64,
    /// `count / total`.
    pub fraction: f64,
}

impl MergedGroup {
    /// Key the cell indices by the names of `axes`.
    pub fn labeled(&self, axes: &[HistogramAxis]) -> LabeledGroup {
        let cells = self
            .cells
            .iter()
            .map(|idx| axes.iter().zip(idx).map(|(a, &i)| (a.name.clone(), i)).collect())
            .collect();
        LabeledGroup { cells, count: self.count, fraction: self.fraction }
    }
}

/// Result of [`merge_sparse_cells`].
#[derive(Debug, Clone)]
pub struct CellMergeOutcome {
    /// Final groups, ordered by their first cell; they partition the grid.
    pub groups: Vec<MergedGroup>,
    /// Summary over group fractions.
    pub summary: HistogramSummary,
}

struct Group {
    cells: Vec<usize>,
    count: u64,
    lo: Vec<usize>,
    hi: Vec<usize>,
}

impl Group {
    fn union_is_box(&self, other: &Group) -> bool {
        let volume: usize = (0..self.lo.len())
            .map(|a| self.hi[a].max(other.hi[a]) - self.lo[a].min(other.lo[a]) + 1)
            .product();
        volume == self.cells.len() + other.cells.len()
    }

    fn absorb(&mut self, other: Group) {
        for a in 0..self.lo.len() {
            self.lo[a] = self.lo[a].min(other.lo[a]);
            self.hi[a] = self.hi[a].max(other.hi[a]);
        }
        self.count += other.count;
        self.cells.extend(other.cells);
    }
}

/// Merge grid cells until every group holds at least `min_fraction` of the total.
///
/// Merging stops early only when a single group is left.
pub fn merge_sparse_cells(hist: &NdHistogram, min_fraction: f64) -> Result<CellMergeOutcome> {
    if !(0.0..=1.0).contains(&min_fraction) {
        return Err(Error::invalid_argument(format!(
            "cell merge min fraction must be in [0, 1] (got {min_fraction})"
        )));
    }

    let total = hist.total();
    let fraction = |c: u64| if total == 0 { 0.0 } else { c as f64 / total as f64 };
    let shape = hist.shape();
    let strides = hist.strides().to_vec();

    let mut groups: Vec<Option<Group>> = hist
        .counts()
        .iter()
        .enumerate()
        .map(|(flat, &count)| {
            let idx = hist.unravel(flat);
            Some(Group { cells: vec![flat], count, lo: idx.clone(), hi: idx })
        })
        .collect();
    let mut owner: Vec<usize> = (0..groups.len()).collect();
    let mut alive = groups.len();

    let mut heap: BinaryHeap<Reverse<(u64, usize)>> =
        hist.counts().iter().enumerate().map(|(id, &c)| Reverse((c, id))).collect();

    let mut n_merges = 0usize;
    while let Some(Reverse((count, id))) = heap.pop() {
        let Some(group) = &groups[id] else { continue };
        if group.count != count {
            continue;
        }
        if fraction(count) >= min_fraction || alive <= 1 {
            break;
        }

        let mut neighbours = BTreeSet::new();
        for &cell in &group.cells {
            let idx = hist.unravel(cell);
            for a in 0..shape.len() {
                if idx[a] > 0 {
                    neighbours.insert(owner[cell - strides[a]]);
                }
                if idx[a] + 1 < shape[a] {
                    neighbours.insert(owner[cell + strides[a]]);
                }
            }
        }
        neighbours.remove(&id);

        let target = neighbours
            .iter()
            .filter_map(|&nid| groups[nid].as_ref().map(|n| (nid, n)))
            .min_by_key(|(nid, n)| (!group.union_is_box(n), group.count + n.count, *nid))
            .map(|(nid, _)| nid);
        let Some(target) = target else { continue };

        let Some(sparse) = groups[id].take() else { continue };
        for &cell in &sparse.cells {
            owner[cell] = target;
        }
        if let Some(dest) = groups[target].as_mut() {
            dest.absorb(sparse);
            heap.push(Reverse((dest.count, target)));
        }
        alive -= 1;
        n_merges += 1;
    }

    let mut out: Vec<MergedGroup> = groups
        .into_iter()
        .flatten()
        .map(|mut g| {
            g.cells.sort_unstable();
            MergedGroup {
                cells: g.cells.iter().map(|&c| hist.unravel(c)).collect(),
                count: g.count,
                fraction: fraction(g.count),
            }
        })
        .collect();
    out.sort_by(|a, b| a.cells[0].cmp(&b.cells[0]));

    let counts: Vec<u64> = out.iter().map(|g| g.count).collect();
    let summary = summarize_counts(&counts, total);
    let n_groups = out.len();
    tracing::info!(cells = hist.n_cells(), groups = n_groups, merges = n_merges, "merged cells");
    Ok(CellMergeOutcome { groups: out, summary })
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use proptest::prelude::*;

    fn grid(shape: &[usize], counts: Vec<u64>) -> NdHistogram {
        let axes = shape
            .iter()
            .enumerate()
            .map(|(i, &n)| HistogramAxis {
                name: format!("axis{i}"),
                edges: (0..=n as u64).collect(),
            })
            .collect();
        NdHistogram::from_counts(axes, counts).unwrap()
    }

    #[test]
    fn diagonal_grid_pairs_up() {
        let h = grid(&[2, 2], vec![100, 1, 1, 100]);
        let out = merge_sparse_cells(&h, 0.05).unwrap();
        let mut counts: Vec<u64> = out.groups.iter().map(|g| g.count).collect();
        counts.sort();
        assert_eq!(counts, vec![101, 101]);
        assert_relative_eq!(out.summary.min_fraction, 0.5);
        assert_relative_eq!(out.summary.max_fraction, 0.5);
        // Both groups stay rectangular.
        assert_eq!(out.groups[0].cells, vec![vec![0, 0], vec![0, 1]]);
        assert_eq!(out.groups[1].cells, vec![vec![1, 0], vec![1, 1]]);
    }

    #[test]
    fn nothing_to_merge() {
        let h = grid(&[3], vec![10, 10, 10]);
        let out = merge_sparse_cells(&h, 0.1).unwrap();
        assert_eq!(out.groups.len(), 3);
        assert!(out.groups.iter().all(|g| g.cells.len() == 1));
    }

    #[test]
    fn empty_cells_are_absorbed() {
        let h = grid(&[1, 4], vec![0, 30, 0, 30]);
        let out = merge_sparse_cells(&h, 0.2).unwrap();
        assert_eq!(out.groups.len(), 2);
        assert_eq!(out.summary.zero_bins, 0);
        assert_eq!(out.groups.iter().map(|g| g.count).sum::<u64>(), 60);
    }

    #[test]
    fn all_empty_grid_collapses_to_one_group() {
        let h = grid(&[2, 2], vec![0, 0, 0, 0]);
        let out = merge_sparse_cells(&h, 0.1).unwrap();
        assert_eq!(out.groups.len(), 1);
        assert_eq!(out.groups[0].cells.len(), 4);
        assert_eq!(out.summary.min_nonzero_fraction, None);
    }

    #[test]
    fn jointly_rare_cell_is_merged() {
        // Both marginals are balanced but cell (1,1) is rare.
        let h = grid(&[2, 2], vec![50, 50, 99, 1]);
        let out = merge_sparse_cells(&h, 0.05).unwrap();
        assert_eq!(out.groups.len(), 3);
        let merged = out.groups.iter().find(|g| g.cells.len() == 2).unwrap();
        assert_eq!(merged.count, 51);
        assert_eq!(merged.cells, vec![vec![0, 1], vec![1, 1]]);
    }

    #[test]
    fn labeled_cells_use_axis_names() {
        let h = grid(&[2, 2], vec![100, 1, 1, 100]);
        let out = merge_sparse_cells(&h, 0.05).unwrap();
        let labeled = out.groups[0].labeled(h.axes());
        assert_eq!(labeled.cells[1]["axis0"], 0);
        assert_eq!(labeled.cells[1]["axis1"], 1);
    }

    #[test]
    fn bad_fraction() {
        let h = grid(&[1], vec![1]);
        assert!(merge_sparse_cells(&h, -0.1).is_err());
    }

    proptest! {
        #[test]
        fn groups_partition_the_grid(
            counts in proptest::collection::vec(0u64..40, 24),
            min_fraction in 0.0f64..0.4,
        ) {
            let h = grid(&[2, 3, 4], counts);
            let out = merge_sparse_cells(&h, min_fraction).unwrap();
            let mut seen = vec![0usize; h.n_cells()];
            for g in &out.groups {
                let sum: u64 = g.cells.iter().map(|c| h.count_at(c)).sum();
                prop_assert_eq!(sum, g.count);
                for c in &g.cells {
                    seen[h.flat_index(c)] += 1;
                }
            }
            prop_assert!(seen.iter().all(|&s| s == 1));
            prop_assert_eq!(out.groups.iter().map(|g| g.count).sum::<u64>(), h.total());
            if out.groups.len() > 1 && h.total() > 0 {
                prop_assert!(out.groups.iter().all(|g| g.fraction >= min_fraction));
            }
        }
    }
}
