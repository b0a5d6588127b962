//! # op-binning
//!
//! Adaptive multi-axis binning for per-event object counts.
//!
//! Per-axis integer samples are turned into equal-population bin edges,
//! composed into a dense n-dimensional occupancy grid, and then shaped by
//! tail capping, marginal bin merging or cross-axis cell merging, and by a
//! search over bins-per-axis.
//!
//! ## Example
//!
//! ```
//! use op_binning::{AxisPlanConfig, evaluate, merge_sparse_cells};
//! use op_core::CountTable;
//!
//! let table = CountTable::from_columns([
//!     ("n_muons", vec![0, 1, 1, 2, 2, 2, 3, 3, 4, 4]),
//!     ("n_electrons", vec![1, 2, 1, 0, 1, 2, 3, 3, 2, 0]),
//! ])
//! .unwrap();
//! let plan = AxisPlanConfig::default().resolve(&table).unwrap();
//! let eval = evaluate(&table, &plan).unwrap();
//! assert_eq!(eval.boundaries.get("n_muons"), Some(&[0u64, 2, 3, 4, 5][..]));
//!
//! let merged = merge_sparse_cells(&eval.histogram, 0.15).unwrap();
//! assert_eq!(merged.groups.iter().map(|g| g.count).sum::<u64>(), 10);
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod adaptive;
pub mod boundaries;
pub mod histogram;
pub mod merge_bins;
pub mod merge_cells;
pub mod pipeline;
pub mod plan;
pub mod report;
pub mod scan;
pub mod summary;
pub mod tail;
pub mod usage;

pub use adaptive::{AdaptiveConfig, AdaptiveOutcome, AdaptiveStep, adaptive_search};
pub use boundaries::{MAX_SUPPORT, compute_bin_boundaries, compute_boundaries};
pub use histogram::{HistogramAxis, NdHistogram, build_histogram};
pub use merge_bins::{BinMergeOutcome, merge_sparse_bins};
pub use merge_cells::{CellMergeOutcome, LabeledGroup, MergedGroup, merge_sparse_cells};
pub use pipeline::{Evaluation, evaluate};
pub use plan::{
    AxisBins, AxisPlan, AxisPlanConfig, DEFAULT_BINS_PER_AXIS, parse_bins_override,
    parse_bins_overrides,
};
pub use report::{AxisInterval, CellReport, bottom_cells, top_cells};
pub use scan::{ScanCandidate, ScanOutcome, TargetScanConfig, scan_bins_per_axis};
pub use summary::{
    AdaptiveScore, FractionTargets, HistogramSummary, TargetScanScore, histogram_summary,
    summarize_counts, targets_satisfied,
};
pub use tail::{TailCapOutcome, apply_tail_caps};
pub use usage::usage_fraction;
