//! Occupancy summaries and the two score tuples used to rank candidate binnings.
//!
//! Both scores are minimized and compared lexicographically. An undefined
//! `min_nonzero_fraction` (every cell empty) always ranks worse than any
//! defined value and never satisfies a minimum target.

use std::cmp::Ordering;

use op_core::{Error, Result};

use crate::histogram::NdHistogram;

/// Occupancy statistics of a grid (or of merged groups).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct HistogramSummary {
    /// Largest cell fraction.
    pub max_fraction: f64,
    /// Smallest cell fraction, empty cells included.
    pub min_fraction: f64,
    /// Smallest non-zero cell fraction; `None` when every cell is empty.
    pub min_nonzero_fraction: Option<f64>,
    /// Number of empty cells.
    pub zero_bins: usize,
}

/// Summarize cell counts as fractions of `total`.
pub fn summarize_counts(counts: &[u64], total: u64) -> HistogramSummary {
    let frac = |c: u64| if total == 0 { 0.0 } else { c as f64 / total as f64 };
    let max = counts.iter().copied().max().unwrap_or(0);
    let min = counts.iter().copied().min().unwrap_or(0);
    let min_nonzero = counts.iter().copied().filter(|&c| c > 0).min();
    HistogramSummary {
        max_fraction: frac(max),
        min_fraction: frac(min),
        min_nonzero_fraction: min_nonzero.map(frac),
        zero_bins: counts.iter().filter(|&&c| c == 0).count(),
    }
}

/// Summarize a histogram's cells.
pub fn histogram_summary(hist: &NdHistogram) -> HistogramSummary {
    summarize_counts(hist.counts(), hist.total())
}

/// Optional occupancy targets for the target scan.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct FractionTargets {
    /// Every non-empty cell should hold at least this fraction.
    pub min_fraction: Option<f64>,
    /// No cell should hold more than this fraction.
    pub max_fraction: Option<f64>,
}

fn check_fraction(name: &str, value: f64) -> Result<()> {
    if !(0.0..=1.0).contains(&value) {
        return Err(Error::invalid_argument(format!("{name} must be in [0, 1] (got {value})")));
    }
    Ok(())
}

impl FractionTargets {
    /// Both bounds in `[0, 1]` and `min <= max`.
    pub fn validate(&self) -> Result<()> {
        if let Some(min) = self.min_fraction {
            check_fraction("target min fraction", min)?;
        }
        if let Some(max) = self.max_fraction {
            check_fraction("target max fraction", max)?;
        }
        if let (Some(min), Some(max)) = (self.min_fraction, self.max_fraction)
            && min > max
        {
            return Err(Error::invalid_argument(format!(
                "target min fraction {min} exceeds target max fraction {max}"
            )));
        }
        Ok(())
    }
}

/// Target-scan ranking: `(violates_max, violates_min, violation, max_fraction, -min_fraction)`.
#[derive(Debug, Clone, Copy)]
pub struct TargetScanScore {
    /// Max target supplied and exceeded.
    pub violates_max: bool,
    /// Min target supplied and not reached.
    pub violates_min: bool,
    /// Summed overshoot and undershoot.
    pub violation: f64,
    /// Largest cell fraction.
    pub max_fraction: f64,
    /// Negated smallest cell fraction.
    pub neg_min_fraction: f64,
}

impl TargetScanScore {
    /// Score a summary against `targets`.
    pub fn new(summary: &HistogramSummary, targets: &FractionTargets) -> Self {
        let mut violation = 0.0;
        let mut violates_max = false;
        let mut violates_min = false;

        if let Some(max) = targets.max_fraction
            && summary.max_fraction > max
        {
            violates_max = true;
            violation += summary.max_fraction - max;
        }
        if let Some(min) = targets.min_fraction {
            let undershoot = match summary.min_nonzero_fraction {
                Some(v) => (min - v).max(0.0),
                None => min,
            };
            // An empty grid never meets a minimum, even a zero one.
            if undershoot > 0.0 || summary.min_nonzero_fraction.is_none() {
                violates_min = true;
                violation += undershoot;
            }
        }

        Self {
            violates_max,
            violates_min,
            violation,
            max_fraction: summary.max_fraction,
            neg_min_fraction: -summary.min_fraction,
        }
    }

    /// `true` if no supplied target is violated.
    pub fn meets_targets(&self) -> bool {
        !self.violates_max && !self.violates_min
    }
}

impl Ord for TargetScanScore {
    fn cmp(&self, other: &Self) -> Ordering {
        self.violates_max
            .cmp(&other.violates_max)
            .then(self.violates_min.cmp(&other.violates_min))
            .then(self.violation.total_cmp(&other.violation))
            .then(self.max_fraction.total_cmp(&other.max_fraction))
            .then(self.neg_min_fraction.total_cmp(&other.neg_min_fraction))
    }
}

impl PartialOrd for TargetScanScore {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl PartialEq for TargetScanScore {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for TargetScanScore {}

/// Adaptive-search ranking:
/// `(max_overshoot, min_nonzero_undershoot, zero_bins, -min_nonzero_fraction, max_fraction)`.
///
/// `zero_bins` sits third so that, at equal balance, grids with fewer
/// structurally empty cells win.
#[derive(Debug, Clone, Copy)]
pub struct AdaptiveScore {
    /// `max(0, max_fraction - target_max)`.
    pub max_overshoot: f64,
    /// `max(0, target_min - min_nonzero_fraction)`; `target_min` when undefined.
    pub min_undershoot: f64,
    /// Empty cells.
    pub zero_bins: usize,
    /// Negated min non-zero fraction; `0` when undefined.
    pub neg_min_nonzero_fraction: f64,
    /// Largest cell fraction.
    pub max_fraction: f64,
}

impl AdaptiveScore {
    /// Score a summary against the adaptive targets.
    pub fn new(summary: &HistogramSummary, target_min: f64, target_max: f64) -> Self {
        let min_nonzero = summary.min_nonzero_fraction;
        Self {
            max_overshoot: (summary.max_fraction - target_max).max(0.0),
            min_undershoot: match min_nonzero {
                Some(v) => (target_min - v).max(0.0),
                None => target_min,
            },
            zero_bins: summary.zero_bins,
            neg_min_nonzero_fraction: min_nonzero.map(|v| -v).unwrap_or(0.0),
            max_fraction: summary.max_fraction,
        }
    }
}

/// `max_fraction <= target_max` and a defined `min_nonzero_fraction >= target_min`.
pub fn targets_satisfied(summary: &HistogramSummary, target_min: f64, target_max: f64) -> bool {
    summary.max_fraction <= target_max
        && summary.min_nonzero_fraction.is_some_and(|v| v >= target_min)
}

impl Ord for AdaptiveScore {
    fn cmp(&self, other: &Self) -> Ordering {
        self.max_overshoot
            .total_cmp(&other.max_overshoot)
            .then(self.min_undershoot.total_cmp(&other.min_undershoot))
            .then(self.zero_bins.cmp(&other.zero_bins))
            .then(self.neg_min_nonzero_fraction.total_cmp(&other.neg_min_nonzero_fraction))
            .then(self.max_fraction.total_cmp(&other.max_fraction))
    }
}

impl PartialOrd for AdaptiveScore {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl PartialEq for AdaptiveScore {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for AdaptiveScore {}
