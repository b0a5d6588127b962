//! Per-axis binning configuration, validated once against a table's axes.

use std::collections::BTreeMap;

use op_core::{CountTable, Error, Result};

/// Bins per axis used when nothing else is requested.
pub const DEFAULT_BINS_PER_AXIS: usize = 4;

/// Which axes to grid and how many bins each gets.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AxisPlanConfig {
    /// Axes left out of the grid entirely.
    pub ignore_axes: Vec<String>,
    /// Uniform bins-per-axis for axes without an override.
    pub bins_per_axis: usize,
    /// Per-axis bins; these axes are fixed during adaptive search.
    pub overrides: BTreeMap<String, usize>,
}

impl Default for AxisPlanConfig {
    fn default() -> Self {
        Self {
            ignore_axes: Vec::new(),
            bins_per_axis: DEFAULT_BINS_PER_AXIS,
            overrides: BTreeMap::new(),
        }
    }
}

/// Requested bin count for one gridded axis.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AxisBins {
    /// Axis name.
    pub name: String,
    /// Requested number of bins (the boundary computer may produce fewer).
    pub n_bins: usize,
    /// Set by an explicit override.
    pub fixed: bool,
}

/// Validated, ordered list of gridded axes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AxisPlan {
    axes: Vec<AxisBins>,
}

impl AxisPlanConfig {
    /// Same configuration with a different uniform bin count.
    pub fn with_bins_per_axis(&self, bins_per_axis: usize) -> Self {
        Self { bins_per_axis, ..self.clone() }
    }

    /// Check the configuration against `table` and resolve it into a plan.
    ///
    /// Axes keep table order. Fails on unknown axis names, on an axis that is
    /// both ignored and overridden, and on bin counts below one.
    pub fn resolve(&self, table: &CountTable) -> Result<AxisPlan> {
        if self.bins_per_axis < 1 {
            return Err(Error::invalid_argument(format!(
                "bins per axis must be >= 1 (got {})",
                self.bins_per_axis
            )));
        }
        for axis in &self.ignore_axes {
            if !table.contains_axis(axis) {
                return Err(unknown_axis("ignore list", axis, table));
            }
        }
        for (axis, &bins) in &self.overrides {
            if !table.contains_axis(axis) {
                return Err(unknown_axis("bins-per-axis override", axis, table));
            }
            if self.ignore_axes.iter().any(|a| a == axis) {
                return Err(Error::invalid_argument(format!(
                    "axis '{axis}' is both ignored and overridden"
                )));
            }
            if bins < 1 {
                return Err(Error::invalid_argument(format!(
                    "override for '{axis}' must be >= 1 (got {bins})"
                )));
            }
        }

        let axes = table
            .axis_names()
            .filter(|name| !self.ignore_axes.iter().any(|a| a == name))
            .map(|name| {
                let fixed = self.overrides.get(name).copied();
                AxisBins {
                    name: name.to_string(),
                    n_bins: fixed.unwrap_or(self.bins_per_axis),
                    fixed: fixed.is_some(),
                }
            })
            .collect();
        Ok(AxisPlan { axes })
    }
}

fn unknown_axis(source: &str, axis: &str, table: &CountTable) -> Error {
    let known: Vec<&str> = table.axis_names().collect();
    Error::invalid_argument(format!(
        "unknown axis '{axis}' in {source}; known axes: {}",
        known.join(", ")
    ))
}

impl AxisPlan {
    /// Gridded axes in order.
    pub fn axes(&self) -> &[AxisBins] {
        &self.axes
    }

    /// Requested bins for `name`.
    pub fn bins(&self, name: &str) -> Option<usize> {
        self.axes.iter().find(|a| a.name == name).map(|a| a.n_bins)
    }

    /// Copy of the plan with axis `index` set to `n_bins`.
    pub fn with_bins(&self, index: usize, n_bins: usize) -> Self {
        let mut axes = self.axes.clone();
        axes[index].n_bins = n_bins;
        Self { axes }
    }

    /// `(axis, bins)` pairs, for reporting.
    pub fn bins_per_axis(&self) -> Vec<(String, usize)> {
        self.axes.iter().map(|a| (a.name.clone(), a.n_bins)).collect()
    }
}

/// Parse one `AXIS=INT` override entry.
pub fn parse_bins_override(entry: &str) -> Result<(String, usize)> {
    let Some((axis, value)) = entry.split_once('=') else {
        return Err(Error::invalid_argument(format!(
            "invalid bins-per-axis override '{entry}'; expected AXIS=INT"
        )));
    };
    if axis.is_empty() {
        return Err(Error::invalid_argument(format!(
            "invalid bins-per-axis override '{entry}'; axis cannot be empty"
        )));
    }
    let bins: i64 = value.trim().parse().map_err(|_| {
        Error::invalid_argument(format!(
            "invalid bins-per-axis override '{entry}'; bins must be an integer"
        ))
    })?;
    if bins < 1 {
        return Err(Error::invalid_argument(format!(
            "invalid bins-per-axis override '{entry}'; bins must be >= 1"
        )));
    }
    Ok((axis.to_string(), bins as usize))
}

/// Parse a list of `AXIS=INT` entries, rejecting duplicate axes.
pub fn parse_bins_overrides<S: AsRef<str>>(entries: &[S]) -> Result<BTreeMap<String, usize>> {
    let mut out = BTreeMap::new();
    for entry in entries {
        let (axis, bins) = parse_bins_override(entry.as_ref())?;
        if out.insert(axis.clone(), bins).is_some() {
            return Err(Error::invalid_argument(format!(
                "duplicate bins-per-axis override for axis '{axis}'"
            )));
        }
    }
    Ok(out)
}
