//! Dense n-dimensional occupancy grid filled in a single pass over a count table.
//!
//! Cells are stored in a flat row-major array: the last axis varies fastest
//! and `strides[a]` is the flat-index step for one bin along axis `a`.

use op_core::{BinBoundaries, CountTable, Error, Result};

/// One gridded axis.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HistogramAxis {
    /// Axis name.
    pub name: String,
    /// Bin edges (strictly increasing, length = n_bins + 1).
    pub edges: Vec<u64>,
}

impl HistogramAxis {
    /// Number of bins on this axis.
    pub fn n_bins(&self) -> usize {
        self.edges.len() - 1
    }

    /// Half-open interval `[lo, hi)` of bin `bin`.
    pub fn interval(&self, bin: usize) -> (u64, u64) {
        (self.edges[bin], self.edges[bin + 1])
    }
}

/// Dense n-dimensional histogram of event counts.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NdHistogram {
    axes: Vec<HistogramAxis>,
    strides: Vec<usize>,
    counts: Vec<u64>,
}

fn validate_edges(axis: &HistogramAxis) -> Result<()> {
    if axis.edges.len() < 2 {
        return Err(Error::validation(format!(
            "axis '{}' needs at least 2 edges (got {})",
            axis.name,
            axis.edges.len()
        )));
    }
    if !axis.edges.windows(2).all(|w| w[0] < w[1]) {
        return Err(Error::validation(format!(
            "axis '{}' edges must be strictly increasing",
            axis.name
        )));
    }
    Ok(())
}

fn row_major_strides(axes: &[HistogramAxis]) -> Result<(Vec<usize>, usize)> {
    let mut strides = vec![0usize; axes.len()];
    let mut size = 1usize;
    for (a, axis) in axes.iter().enumerate().rev() {
        strides[a] = size;
        size = size.checked_mul(axis.n_bins()).ok_or_else(|| {
            Error::Computation("histogram grid size overflows usize".to_string())
        })?;
    }
    Ok((strides, size))
}

impl NdHistogram {
    /// Empty grid over `axes`.
    pub fn zeros(axes: Vec<HistogramAxis>) -> Result<Self> {
        for axis in &axes {
            validate_edges(axis)?;
        }
        let (strides, size) = row_major_strides(&axes)?;
        Ok(Self { axes, strides, counts: vec![0; size] })
    }

    /// Grid over `axes` with the given row-major cell counts.
    pub fn from_counts(axes: Vec<HistogramAxis>, counts: Vec<u64>) -> Result<Self> {
        let mut h = Self::zeros(axes)?;
        if counts.len() != h.counts.len() {
            return Err(Error::validation(format!(
                "expected {} cell counts for shape {:?}, got {}",
                h.counts.len(),
                h.shape(),
                counts.len()
            )));
        }
        h.counts = counts;
        Ok(h)
    }

    /// Axes in grid order.
    pub fn axes(&self) -> &[HistogramAxis] {
        &self.axes
    }

    /// Number of axes.
    pub fn n_axes(&self) -> usize {
        self.axes.len()
    }

    /// Bins per axis.
    pub fn shape(&self) -> Vec<usize> {
        self.axes.iter().map(HistogramAxis::n_bins).collect()
    }

    /// Flat-index step per axis.
    pub fn strides(&self) -> &[usize] {
        &self.strides
    }

    /// Number of cells.
    pub fn n_cells(&self) -> usize {
        self.counts.len()
    }

    /// Row-major cell counts.
    pub fn counts(&self) -> &[u64] {
        &self.counts
    }

    /// Sum over all cells.
    pub fn total(&self) -> u64 {
        self.counts.iter().sum()
    }

    /// Flat index of a multi-index.
    pub fn flat_index(&self, index: &[usize]) -> usize {
        index.iter().zip(&self.strides).map(|(i, s)| i * s).sum()
    }

    /// Multi-index of a flat index.
    pub fn unravel(&self, flat: usize) -> Vec<usize> {
        self.axes
            .iter()
            .zip(&self.strides)
            .map(|(axis, &stride)| (flat / stride) % axis.n_bins())
            .collect()
    }

    /// Count of the cell at `index`.
    pub fn count_at(&self, index: &[usize]) -> u64 {
        self.counts[self.flat_index(index)]
    }

    /// Current per-axis edges.
    pub fn boundaries(&self) -> BinBoundaries {
        self.axes.iter().map(|a| (a.name.clone(), a.edges.clone())).collect()
    }

    /// Position of axis `name`.
    pub fn axis_index(&self, name: &str) -> Option<usize> {
        self.axes.iter().position(|a| a.name == name)
    }

    /// `(outer, n_bins, inner)` such that flat = (o * n_bins + b) * inner + i.
    fn split_at_axis(&self, axis: usize) -> (usize, usize, usize) {
        let n = self.axes[axis].n_bins();
        let inner = self.strides[axis];
        let outer = self.counts.len() / (n * inner);
        (outer, n, inner)
    }

    /// Projection of the grid onto one axis.
    pub fn marginal(&self, axis: usize) -> Vec<u64> {
        let (outer, n, inner) = self.split_at_axis(axis);
        let mut out = vec![0u64; n];
        for o in 0..outer {
            for (b, slot) in out.iter_mut().enumerate() {
                let start = (o * n + b) * inner;
                *slot += self.counts[start..start + inner].iter().sum::<u64>();
            }
        }
        out
    }

    /// New grid with bins `left` and `left + 1` of `axis` combined.
    ///
    /// The shared interior edge is dropped and the two slabs are summed.
    pub fn merge_adjacent_bins(&self, axis: usize, left: usize) -> Result<Self> {
        let (outer, n, inner) = self.split_at_axis(axis);
        if left + 1 >= n {
            return Err(Error::invalid_argument(format!(
                "cannot merge bin {left} with its right neighbour on axis '{}' ({n} bins)",
                self.axes[axis].name
            )));
        }

        let mut axes = self.axes.clone();
        axes[axis].edges.remove(left + 1);
        let mut merged = Self::zeros(axes)?;
        for o in 0..outer {
            for b in 0..n {
                let nb = if b > left { b - 1 } else { b };
                let src = (o * n + b) * inner;
                let dst = (o * (n - 1) + nb) * inner;
                for i in 0..inner {
                    merged.counts[dst + i] += self.counts[src + i];
                }
            }
        }
        Ok(merged)
    }
}

/// Fill a histogram over the axes of `boundaries` from `table`.
///
/// Axes of the table that are not in `boundaries` are not gridded. Every row
/// must fall inside `[first_edge, last_edge)` on every gridded axis.
pub fn build_histogram(table: &CountTable, boundaries: &BinBoundaries) -> Result<NdHistogram> {
    let mut columns = Vec::with_capacity(boundaries.len());
    let mut axes = Vec::with_capacity(boundaries.len());
    for (name, edges) in boundaries.iter() {
        let column = table.column(name).ok_or_else(|| {
            Error::invalid_argument(format!("boundary axis '{name}' is not in the count table"))
        })?;
        columns.push(column);
        axes.push(HistogramAxis { name: name.to_string(), edges: edges.to_vec() });
    }

    let mut hist = NdHistogram::zeros(axes)?;
    for row in 0..table.n_rows() {
        let mut flat = 0usize;
        for (a, column) in columns.iter().enumerate() {
            let val = column[row];
            let axis = &hist.axes[a];
            let bin = find_bin(&axis.edges, val).ok_or_else(|| {
                Error::validation(format!(
                    "row {row}: value {val} on axis '{}' is outside [{}, {})",
                    axis.name,
                    axis.edges[0],
                    axis.edges[axis.edges.len() - 1]
                ))
            })?;
            flat += bin * hist.strides[a];
        }
        hist.counts[flat] += 1;
    }

    tracing::debug!(shape = ?hist.shape(), entries = table.n_rows(), "histogram filled");
    Ok(hist)
}

/// Find the bin index for a value given sorted bin edges.
///
/// Returns `None` for underflow/overflow.
fn find_bin(edges: &[u64], val: u64) -> Option<usize> {
    if val < edges[0] || val >= edges[edges.len() - 1] {
        return None;
    }
    match edges.binary_search(&val) {
        Ok(i) => Some(i),
        Err(i) => Some(i - 1),
    }
}
