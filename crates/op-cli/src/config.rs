//! Partition run configuration, shared by `objpart partition` flags and
//! `objpart run --config`.

use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use op_binning::{AdaptiveConfig, AxisPlanConfig, FractionTargets, TargetScanConfig};

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PartitionConfig {
    /// Dataset path: a Parquet file or a directory of them.
    pub dataset: String,

    /// Files to read from a dataset directory (0 = all).
    #[serde(default = "default_n_files")]
    pub n_files: usize,

    /// Save the collected count table to this Parquet file.
    #[serde(default)]
    pub output: Option<PathBuf>,

    #[serde(default)]
    pub ignore_axes: Vec<String>,

    #[serde(default = "default_bins_per_axis")]
    pub bins_per_axis: usize,

    /// Per-axis bins; these axes are fixed during adaptive search.
    #[serde(default)]
    pub bins_per_axis_override: BTreeMap<String, usize>,

    /// Clip each axis at this quantile before computing boundaries.
    #[serde(default)]
    pub tail_cap_quantile: Option<f64>,

    #[serde(default)]
    pub target_min_fraction: Option<f64>,
    #[serde(default)]
    pub target_max_fraction: Option<f64>,

    /// Uniform bins-per-axis scan range (inclusive).
    #[serde(default)]
    pub bins_scan_min: Option<usize>,
    #[serde(default)]
    pub bins_scan_max: Option<usize>,

    #[serde(default)]
    pub adaptive: bool,
    #[serde(default = "default_min_bins")]
    pub adaptive_min_bins: usize,

    /// Marginal (per-axis) sparse-bin merge threshold.
    #[serde(default)]
    pub merge_min_fraction: Option<f64>,
    #[serde(default = "default_min_bins")]
    pub merge_min_bins: usize,

    /// Cross-axis sparse-cell merge threshold.
    #[serde(default)]
    pub merge_cells_min_fraction: Option<f64>,

    #[serde(default = "default_boundaries_out")]
    pub boundaries_out: PathBuf,
    #[serde(default = "default_histogram_out")]
    pub histogram_out: PathBuf,

    /// Rows in the top/bottom cell tables.
    #[serde(default = "default_top")]
    pub top: usize,
}

pub fn default_n_files() -> usize {
    1
}

pub fn default_bins_per_axis() -> usize {
    op_binning::DEFAULT_BINS_PER_AXIS
}

pub fn default_min_bins() -> usize {
    1
}

pub fn default_boundaries_out() -> PathBuf {
    PathBuf::from("bin_boundaries.yaml")
}

pub fn default_histogram_out() -> PathBuf {
    PathBuf::from("histogram.json.gz")
}

pub fn default_top() -> usize {
    10
}

fn check_fraction(name: &str, value: Option<f64>) -> Result<()> {
    if let Some(v) = value
        && !(0.0..=1.0).contains(&v)
    {
        anyhow::bail!("{name} must be in [0, 1] (got {v})");
    }
    Ok(())
}

impl PartitionConfig {
    /// Reject invalid option combinations before any data is read.
    pub fn validate(&self) -> Result<()> {
        if self.dataset.trim().is_empty() {
            anyhow::bail!("dataset must be non-empty");
        }
        if self.bins_per_axis < 1 {
            anyhow::bail!("bins_per_axis must be >= 1 (got {})", self.bins_per_axis);
        }
        if let Some((axis, _)) = self.bins_per_axis_override.iter().find(|(_, n)| **n < 1) {
            anyhow::bail!("bins_per_axis_override for '{axis}' must be >= 1");
        }
        if let Some(q) = self.tail_cap_quantile
            && !(q > 0.0 && q <= 1.0)
        {
            anyhow::bail!("tail_cap_quantile must be in (0, 1] (got {q})");
        }
        check_fraction("target_min_fraction", self.target_min_fraction)?;
        check_fraction("target_max_fraction", self.target_max_fraction)?;
        check_fraction("merge_min_fraction", self.merge_min_fraction)?;
        check_fraction("merge_cells_min_fraction", self.merge_cells_min_fraction)?;
        if let (Some(min), Some(max)) = (self.target_min_fraction, self.target_max_fraction)
            && min > max
        {
            anyhow::bail!("target_min_fraction {min} exceeds target_max_fraction {max}");
        }

        match (self.bins_scan_min, self.bins_scan_max) {
            (Some(min), Some(max)) => {
                if min < 1 {
                    anyhow::bail!("bins_scan_min must be >= 1 (got {min})");
                }
                if max < min {
                    anyhow::bail!("bins_scan_max ({max}) must be >= bins_scan_min ({min})");
                }
            }
            (None, None) => {}
            _ => anyhow::bail!("bins_scan_min and bins_scan_max must be given together"),
        }

        if self.adaptive {
            if self.bins_scan_min.is_some() {
                anyhow::bail!("adaptive search cannot be combined with a bins scan range");
            }
            if self.target_min_fraction.is_none() || self.target_max_fraction.is_none() {
                anyhow::bail!(
                    "adaptive search requires both target_min_fraction and target_max_fraction"
                );
            }
        }
        if self.adaptive_min_bins < 1 {
            anyhow::bail!("adaptive_min_bins must be >= 1");
        }
        if self.merge_min_bins < 1 {
            anyhow::bail!("merge_min_bins must be >= 1");
        }
        if self.merge_min_fraction.is_some() && self.merge_cells_min_fraction.is_some() {
            anyhow::bail!("merge_min_fraction and merge_cells_min_fraction are mutually exclusive");
        }
        Ok(())
    }

    pub fn axis_plan(&self) -> AxisPlanConfig {
        AxisPlanConfig {
            ignore_axes: self.ignore_axes.clone(),
            bins_per_axis: self.bins_per_axis,
            overrides: self.bins_per_axis_override.clone(),
        }
    }

    pub fn targets(&self) -> FractionTargets {
        FractionTargets {
            min_fraction: self.target_min_fraction,
            max_fraction: self.target_max_fraction,
        }
    }

    pub fn scan(&self) -> Option<TargetScanConfig> {
        let (bins_min, bins_max) = (self.bins_scan_min?, self.bins_scan_max?);
        Some(TargetScanConfig { bins_min, bins_max, targets: self.targets() })
    }

    pub fn adaptive(&self) -> Option<AdaptiveConfig> {
        if !self.adaptive {
            return None;
        }
        Some(AdaptiveConfig {
            target_min_fraction: self.target_min_fraction?,
            target_max_fraction: self.target_max_fraction?,
            min_bins: self.adaptive_min_bins,
        })
    }
}

pub fn read_partition_config(path: &Path) -> Result<PartitionConfig> {
    let bytes = std::fs::read(path)?;
    let ext = path.extension().and_then(|s| s.to_str()).unwrap_or("").to_ascii_lowercase();
    let cfg: PartitionConfig = if ext == "json" {
        serde_json::from_slice(&bytes)?
    } else {
        // Default: YAML (serde_yaml_ng).
        serde_yaml_ng::from_slice(&bytes)?
    };
    Ok(cfg)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn base() -> PartitionConfig {
        serde_yaml_ng::from_str("dataset: counts.parquet\n").unwrap()
    }

    #[test]
    fn defaults_from_minimal_yaml() {
        let cfg = base();
        assert_eq!(cfg.n_files, 1);
        assert_eq!(cfg.bins_per_axis, 4);
        assert_eq!(cfg.top, 10);
        assert_eq!(cfg.boundaries_out, PathBuf::from("bin_boundaries.yaml"));
        assert_eq!(cfg.histogram_out, PathBuf::from("histogram.json.gz"));
        assert!(cfg.validate().is_ok());
        assert!(cfg.scan().is_none());
        assert!(cfg.adaptive().is_none());
    }

    #[test]
    fn adaptive_with_scan_is_rejected() {
        let cfg = PartitionConfig {
            adaptive: true,
            target_min_fraction: Some(0.01),
            target_max_fraction: Some(0.2),
            bins_scan_min: Some(2),
            bins_scan_max: Some(5),
            ..base()
        };
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn adaptive_needs_both_targets() {
        let cfg = PartitionConfig { adaptive: true, target_max_fraction: Some(0.2), ..base() };
        assert!(cfg.validate().is_err());
        let ok = PartitionConfig { target_min_fraction: Some(0.01), ..cfg };
        assert!(ok.validate().is_ok());
        assert_eq!(ok.adaptive().unwrap().min_bins, 1);
    }

    #[test]
    fn both_merge_modes_are_rejected() {
        let cfg = PartitionConfig {
            merge_min_fraction: Some(0.01),
            merge_cells_min_fraction: Some(0.01),
            ..base()
        };
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn scan_range_checks() {
        let half = PartitionConfig { bins_scan_min: Some(2), ..base() };
        assert!(half.validate().is_err());
        let reversed = PartitionConfig { bins_scan_max: Some(1), ..half.clone() };
        assert!(reversed.validate().is_err());
        let ok = PartitionConfig { bins_scan_max: Some(6), ..half };
        assert!(ok.validate().is_ok());
        assert_eq!(ok.scan().unwrap().bins_max, 6);
    }

    #[test]
    fn quantile_and_floor_checks() {
        assert!(PartitionConfig { tail_cap_quantile: Some(0.0), ..base() }.validate().is_err());
        assert!(PartitionConfig { tail_cap_quantile: Some(1.0), ..base() }.validate().is_ok());
        assert!(PartitionConfig { merge_min_bins: 0, ..base() }.validate().is_err());
        assert!(PartitionConfig { adaptive_min_bins: 0, ..base() }.validate().is_err());
    }

    #[test]
    fn unknown_keys_are_rejected() {
        let err = serde_yaml_ng::from_str::<PartitionConfig>("dataset: a\nbins: 3\n");
        assert!(err.is_err());
    }
}
