//! Most and least populated cells of a histogram.

use crate::histogram::NdHistogram;

/// Interval `[lo, hi)` of a cell along one axis.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AxisInterval {
    /// Axis name.
    pub axis: String,
    /// Inclusive lower edge.
    pub lo: u64,
    /// Exclusive upper edge.
    pub hi: u64,
}

/// One cell with its location, count and fraction.
#[derive(Debug, Clone, PartialEq)]
pub struct CellReport {
    /// Multi-index in grid axis order.
    pub index: Vec<usize>,
    /// Interval per axis.
    pub intervals: Vec<AxisInterval>,
    /// Events in the cell.
    pub count: u64,
    /// `count / total`.
    pub fraction: f64,
}

fn cell_report(hist: &NdHistogram, flat: usize) -> CellReport {
    let index = hist.unravel(flat);
    let intervals = hist
        .axes()
        .iter()
        .zip(&index)
        .map(|(axis, &bin)| {
            let (lo, hi) = axis.interval(bin);
            AxisInterval { axis: axis.name.clone(), lo, hi }
        })
        .collect();
    let total = hist.total();
    let count = hist.counts()[flat];
    let fraction = if total == 0 { 0.0 } else { count as f64 / total as f64 };
    CellReport { index, intervals, count, fraction }
}

fn ranked(hist: &NdHistogram, n: usize, descending: bool) -> Vec<CellReport> {
    let counts = hist.counts();
    let mut order: Vec<usize> = (0..counts.len()).collect();
    // Stable sort keeps row-major order among equal counts.
    if descending {
        order.sort_by(|&a, &b| counts[b].cmp(&counts[a]));
    } else {
        order.sort_by_key(|&i| counts[i]);
    }
    order.into_iter().take(n).map(|flat| cell_report(hist, flat)).collect()
}

/// The `n` fullest cells, largest first.
pub fn top_cells(hist: &NdHistogram, n: usize) -> Vec<CellReport> {
    ranked(hist, n, true)
}

/// The `n` emptiest cells, smallest first.
pub fn bottom_cells(hist: &NdHistogram, n: usize) -> Vec<CellReport> {
    ranked(hist, n, false)
}
