//! Boundaries -> histogram -> summary for one axis plan.

use op_core::{BinBoundaries, CountTable, Result};

use crate::boundaries::compute_bin_boundaries;
use crate::histogram::{NdHistogram, build_histogram};
use crate::plan::AxisPlan;
use crate::summary::{HistogramSummary, histogram_summary};

/// One evaluated candidate binning.
#[derive(Debug, Clone)]
pub struct Evaluation {
    /// Edges per gridded axis.
    pub boundaries: BinBoundaries,
    /// Filled grid.
    pub histogram: NdHistogram,
    /// Occupancy summary of `histogram`.
    pub summary: HistogramSummary,
}

/// Build boundaries, histogram and summary for `plan`.
pub fn evaluate(table: &CountTable, plan: &AxisPlan) -> Result<Evaluation> {
    let boundaries = compute_bin_boundaries(table, plan)?;
    let histogram = build_histogram(table, &boundaries)?;
    let summary = histogram_summary(&histogram);
    Ok(Evaluation { boundaries, histogram, summary })
}
