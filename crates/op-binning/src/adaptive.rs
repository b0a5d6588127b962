//! Greedy per-axis descent on bins-per-axis.
//!
//! Each step tries taking one bin off every free axis above the floor, keeps
//! the single best move if it strictly improves the [`AdaptiveScore`], and
//! stops as soon as both targets hold. This is hill climbing: the result is
//! locally non-worsening, not a global optimum.

use op_core::{CountTable, Error, Result};

use crate::pipeline::{Evaluation, evaluate};
use crate::plan::{AxisPlan, AxisPlanConfig};
use crate::summary::{AdaptiveScore, targets_satisfied};

/// Targets and floor for [`adaptive_search`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AdaptiveConfig {
    /// Every non-empty cell should hold at least this fraction.
    pub target_min_fraction: f64,
    /// No cell should hold more than this fraction.
    pub target_max_fraction: f64,
    /// Free axes are never reduced below this many bins.
    pub min_bins: usize,
}

impl AdaptiveConfig {
    /// Fractions in `[0, 1]`, `min <= max`, floor at least one.
    pub fn validate(&self) -> Result<()> {
        for (name, v) in [
            ("target min fraction", self.target_min_fraction),
            ("target max fraction", self.target_max_fraction),
        ] {
            if !(0.0..=1.0).contains(&v) {
                return Err(Error::invalid_argument(format!("{name} must be in [0, 1] (got {v})")));
            }
        }
        if self.target_min_fraction > self.target_max_fraction {
            return Err(Error::invalid_argument(format!(
                "target min fraction {} exceeds target max fraction {}",
                self.target_min_fraction, self.target_max_fraction
            )));
        }
        if self.min_bins < 1 {
            return Err(Error::invalid_argument("adaptive min bins must be >= 1"));
        }
        Ok(())
    }
}

/// One accepted move.
#[derive(Debug, Clone)]
pub struct AdaptiveStep {
    /// Axis that lost a bin.
    pub axis: String,
    /// Its requested bins after the move.
    pub bins: usize,
    /// Score after the move.
    pub score: AdaptiveScore,
}

/// Result of [`adaptive_search`].
#[derive(Debug, Clone)]
pub struct AdaptiveOutcome {
    /// Final per-axis bin request.
    pub plan: AxisPlan,
    /// Final candidate.
    pub evaluation: Evaluation,
    /// Its score.
    pub score: AdaptiveScore,
    /// Both targets hold for the final grid.
    pub targets_met: bool,
    /// Accepted moves in order.
    pub steps: Vec<AdaptiveStep>,
}

/// Reduce bins-per-axis greedily, starting from the plan `axes` resolves to.
///
/// Overridden axes are fixed. Among equally good moves the first axis in plan
/// order wins.
pub fn adaptive_search(
    table: &CountTable,
    axes: &AxisPlanConfig,
    config: &AdaptiveConfig,
) -> Result<AdaptiveOutcome> {
    config.validate()?;
    let (target_min, target_max) = (config.target_min_fraction, config.target_max_fraction);

    let mut plan = axes.resolve(table)?;
    let mut evaluation = evaluate(table, &plan)?;
    let mut score = AdaptiveScore::new(&evaluation.summary, target_min, target_max);
    let mut steps = Vec::new();

    while !targets_satisfied(&evaluation.summary, target_min, target_max) {
        let mut best: Option<(usize, AxisPlan, Evaluation, AdaptiveScore)> = None;
        for (index, axis) in plan.axes().iter().enumerate() {
            if axis.fixed || axis.n_bins <= config.min_bins {
                continue;
            }
            let candidate = plan.with_bins(index, axis.n_bins - 1);
            let eval = evaluate(table, &candidate)?;
            let cand_score = AdaptiveScore::new(&eval.summary, target_min, target_max);
            tracing::debug!(axis = %axis.name, bins = axis.n_bins - 1, score = ?cand_score, "try");
            if best.as_ref().is_none_or(|(_, _, _, b)| cand_score < *b) {
                best = Some((index, candidate, eval, cand_score));
            }
        }

        let Some((index, candidate, eval, cand_score)) = best else { break };
        if cand_score >= score {
            break;
        }
        let axis = candidate.axes()[index].name.clone();
        let bins = candidate.axes()[index].n_bins;
        let max_fraction = eval.summary.max_fraction;
        tracing::info!(axis = %axis, bins, max_fraction, "adaptive step");
        steps.push(AdaptiveStep { axis, bins, score: cand_score });
        plan = candidate;
        evaluation = eval;
        score = cand_score;
    }

    let targets_met = targets_satisfied(&evaluation.summary, target_min, target_max);
    if !targets_met {
        tracing::warn!(steps = steps.len(), "adaptive search stopped before meeting targets");
    }
    Ok(AdaptiveOutcome { plan, evaluation, score, targets_met, steps })
}
