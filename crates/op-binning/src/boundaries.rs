//! Equal-population bin boundaries on integer count axes.
//!
//! Quantiles are found directly on the integer support: a counting array of
//! size `max - min + 1` is built and its prefix sum searched. This is only
//! reasonable because axes are small object counts; it is not a general
//! quantile estimator.

use op_core::{BinBoundaries, CountTable, Error, Result};

use crate::plan::AxisPlan;

/// Largest `max - min + 1` span accepted for the counting array.
pub const MAX_SUPPORT: u64 = 1 << 24;

/// Cumulative counts over the integer range `[min, max]`.
#[derive(Debug, Clone)]
pub(crate) struct IntegerCdf {
    min: u64,
    cumulative: Vec<u64>,
}

impl IntegerCdf {
    /// `None` for an empty sample.
    pub(crate) fn from_values(values: &[u64]) -> Result<Option<Self>> {
        let (Some(&min), Some(&max)) = (values.iter().min(), values.iter().max()) else {
            return Ok(None);
        };
        // Checked before adding one so a full u64 range cannot overflow.
        let width = max - min;
        if width >= MAX_SUPPORT {
            return Err(Error::Computation(format!(
                "value range [{min}, {max}] is too wide for integer binning (span {width} + 1 > {MAX_SUPPORT})"
            )));
        }
        let span = width + 1;

        let mut cumulative = vec![0u64; span as usize];
        for &v in values {
            cumulative[(v - min) as usize] += 1;
        }
        let mut acc = 0u64;
        for c in cumulative.iter_mut() {
            acc += *c;
            *c = acc;
        }
        Ok(Some(Self { min, cumulative }))
    }

    pub(crate) fn min(&self) -> u64 {
        self.min
    }

    pub(crate) fn max(&self) -> u64 {
        self.min + self.cumulative.len() as u64 - 1
    }

    pub(crate) fn total(&self) -> u64 {
        self.cumulative.last().copied().unwrap_or(0)
    }

    /// Offset of the smallest value `v` with `C[v] * den >= num`.
    fn offset_at_ratio(&self, num: u128, den: u128) -> usize {
        let idx = self.cumulative.partition_point(|&c| (c as u128) * den < num);
        idx.min(self.cumulative.len() - 1)
    }

    /// Smallest value `v` with `C[v] >= q * N`.
    pub(crate) fn quantile(&self, q: f64) -> u64 {
        let target = q * self.total() as f64;
        let idx = self.cumulative.partition_point(|&c| (c as f64) < target);
        self.min + idx.min(self.cumulative.len() - 1) as u64
    }
}

/// Compute bin edges splitting `values` into `n_bins` roughly equal-population bins.
///
/// The first edge is the sample minimum and the last is the maximum plus one.
/// Asking for more bins than there are distinct values silently yields fewer
/// bins. An empty sample yields an empty edge list.
pub fn compute_boundaries(values: &[u64], n_bins: usize) -> Result<Vec<u64>> {
    if n_bins < 1 {
        return Err(Error::invalid_argument(format!("n_bins must be >= 1 (got {n_bins})")));
    }
    let Some(cdf) = IntegerCdf::from_values(values)? else {
        return Ok(Vec::new());
    };

    let Some(upper) = cdf.max().checked_add(1) else {
        return Err(Error::Computation(format!(
            "value {} has no representable upper edge",
            cdf.max()
        )));
    };

    // With at least one bin per event every populated value already gets its
    // own edge, so larger requests give the same result.
    let total = cdf.total();
    let n_bins = n_bins.min(usize::try_from(total).unwrap_or(usize::MAX));
    let mut edges = Vec::with_capacity(n_bins + 1);
    edges.push(cdf.min());
    for i in 1..n_bins {
        let offset = cdf.offset_at_ratio(i as u128 * total as u128, n_bins as u128);
        // Edge sits just above the bin holding the i-th quantile.
        edges.push(cdf.min() + offset as u64 + 1);
    }
    edges.push(upper);

    edges.sort_unstable();
    edges.dedup();
    Ok(edges)
}

/// Compute boundaries for every axis of `plan`, in plan order.
///
/// Axes whose column is empty are left out of the result.
pub fn compute_bin_boundaries(table: &CountTable, plan: &AxisPlan) -> Result<BinBoundaries> {
    let mut out = BinBoundaries::new();
    for axis in plan.axes() {
        let values = table
            .column(&axis.name)
            .ok_or_else(|| Error::invalid_argument(format!("unknown axis '{}'", axis.name)))?;
        let edges = compute_boundaries(values, axis.n_bins)?;
        if edges.is_empty() {
            tracing::warn!(axis = %axis.name, "axis has no values; leaving it out of the grid");
            continue;
        }
        let bins = edges.len() - 1;
        tracing::debug!(axis = %axis.name, requested = axis.n_bins, bins, "boundaries");
        out.insert(axis.name.clone(), edges);
    }
    Ok(out)
}
