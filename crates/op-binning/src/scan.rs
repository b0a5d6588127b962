//! Brute-force scan over a uniform bins-per-axis value.

use op_core::{CountTable, Error, Result};

use crate::pipeline::{Evaluation, evaluate};
use crate::plan::AxisPlanConfig;
use crate::summary::{FractionTargets, HistogramSummary, TargetScanScore};

/// Scan range and targets.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TargetScanConfig {
    /// Smallest uniform bins-per-axis tried.
    pub bins_min: usize,
    /// Largest uniform bins-per-axis tried (inclusive).
    pub bins_max: usize,
    /// Occupancy targets.
    pub targets: FractionTargets,
}

impl TargetScanConfig {
    /// `1 <= bins_min <= bins_max` and valid targets.
    pub fn validate(&self) -> Result<()> {
        if self.bins_min < 1 {
            return Err(Error::invalid_argument(format!(
                "scan minimum bins must be >= 1 (got {})",
                self.bins_min
            )));
        }
        if self.bins_max < self.bins_min {
            return Err(Error::invalid_argument(format!(
                "scan range is empty: max {} < min {}",
                self.bins_max, self.bins_min
            )));
        }
        self.targets.validate()
    }
}

/// One scanned value.
#[derive(Debug, Clone, Copy)]
pub struct ScanCandidate {
    /// Uniform bins-per-axis requested.
    pub bins_per_axis: usize,
    /// Occupancy of the resulting grid.
    pub summary: HistogramSummary,
    /// Its rank.
    pub score: TargetScanScore,
}

/// Result of [`scan_bins_per_axis`].
#[derive(Debug, Clone)]
pub struct ScanOutcome {
    /// Chosen uniform bins-per-axis.
    pub bins_per_axis: usize,
    /// The chosen candidate.
    pub evaluation: Evaluation,
    /// Its score.
    pub score: TargetScanScore,
    /// `false` when no candidate met every supplied target.
    pub meets_targets: bool,
    /// Every candidate in scan order.
    pub candidates: Vec<ScanCandidate>,
}

/// Try every uniform bins-per-axis in the range and keep the best-scoring one.
///
/// Axes overridden in `axes` keep their override for every candidate. Ties go
/// to the smaller bins-per-axis. Unmet targets are not an error: the closest
/// candidate is returned with `meets_targets == false`.
pub fn scan_bins_per_axis(
    table: &CountTable,
    axes: &AxisPlanConfig,
    config: &TargetScanConfig,
) -> Result<ScanOutcome> {
    config.validate()?;

    let mut candidates = Vec::new();
    let mut best: Option<(usize, Evaluation, TargetScanScore)> = None;
    for bins in config.bins_min..=config.bins_max {
        let plan = axes.with_bins_per_axis(bins).resolve(table)?;
        let evaluation = evaluate(table, &plan)?;
        let score = TargetScanScore::new(&evaluation.summary, &config.targets);
        tracing::info!(
            bins,
            max_fraction = evaluation.summary.max_fraction,
            min_nonzero_fraction = ?evaluation.summary.min_nonzero_fraction,
            meets_targets = score.meets_targets(),
            "scan candidate"
        );
        candidates.push(ScanCandidate { bins_per_axis: bins, summary: evaluation.summary, score });
        if best.as_ref().is_none_or(|(_, _, b)| score < *b) {
            best = Some((bins, evaluation, score));
        }
    }

    let Some((bins_per_axis, evaluation, score)) = best else {
        return Err(Error::Computation("target scan evaluated no candidates".to_string()));
    };
    let meets_targets = score.meets_targets();
    if !meets_targets {
        let violation = score.violation;
        tracing::warn!(bins_per_axis, violation, "no scan candidate meets targets");
    }
    Ok(ScanOutcome { bins_per_axis, evaluation, score, meets_targets, candidates })
}
