//! objpart CLI

use anyhow::Result;
use clap::{Args, Parser, Subcommand};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use op_binning::{
    Evaluation, LabeledGroup, NdHistogram, TargetScanScore, adaptive_search, apply_tail_caps,
    bottom_cells, evaluate, histogram_summary, merge_sparse_bins, merge_sparse_cells,
    parse_bins_overrides, scan_bins_per_axis, top_cells, usage_fraction,
};
use op_io::{
    BoundaryDocument, CountSource, ParquetCountSource, read_boundary_document, read_histogram,
    write_boundary_document, write_count_table, write_histogram,
};

mod config;
mod report;

use config::{PartitionConfig, read_partition_config};

#[derive(Parser)]
#[command(name = "objpart")]
#[command(about = "objpart - balanced multi-axis partitioning of per-event object counts")]
#[command(version)]
struct Cli {
    /// Log verbosity level (trace, debug, info, warn, error)
    #[arg(long, global = true, default_value = "warn")]
    log_level: tracing::Level,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Bin a dataset's object counts into balanced cells
    Partition {
        /// Dataset: a Parquet file or a directory of Parquet files
        dataset: String,

        #[command(flatten)]
        args: PartitionArgs,
    },

    /// Run a partition described by a YAML/JSON config file
    Run {
        /// Config file (`.yaml`/`.yml` or `.json`)
        #[arg(short, long)]
        config: PathBuf,
    },

    /// Fraction of events kept by `axis >= value` cuts on a saved binning
    CalcUsage {
        /// Boundary document written by `partition`
        #[arg(short, long, default_value = "bin_boundaries.yaml")]
        boundaries: PathBuf,

        /// Histogram blob; used for one group per cell when the document has no merged cells
        #[arg(long)]
        histogram: Option<PathBuf>,

        /// Cut as AXIS=VALUE (repeat for multiple axes)
        #[arg(long = "cut")]
        cuts: Vec<String>,
    },

    /// Print version information
    Version,
}

#[derive(Args)]
struct PartitionArgs {
    /// Save the collected object counts to this Parquet file
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Number of files in the dataset to read (0 for all files)
    #[arg(short = 'n', long, default_value = "1")]
    n_files: usize,

    /// Axis to leave out of the binning (repeat for multiple axes)
    #[arg(long)]
    ignore_axes: Vec<String>,

    /// Bins per axis
    #[arg(long, default_value_t = config::default_bins_per_axis())]
    bins_per_axis: usize,

    /// Per-axis bins as AXIS=INT (repeat for multiple axes)
    #[arg(long)]
    bins_per_axis_override: Vec<String>,

    /// Clip every non-ignored axis at this quantile, in (0, 1]
    #[arg(long)]
    tail_cap_quantile: Option<f64>,

    /// Target minimum non-empty cell fraction
    #[arg(long)]
    target_min_fraction: Option<f64>,

    /// Target maximum cell fraction
    #[arg(long)]
    target_max_fraction: Option<f64>,

    /// Scan uniform bins-per-axis from this value. Requires `--bins-scan-max`.
    #[arg(long, requires = "bins_scan_max")]
    bins_scan_min: Option<usize>,

    /// Scan uniform bins-per-axis up to this value. Requires `--bins-scan-min`.
    #[arg(long, requires = "bins_scan_min")]
    bins_scan_max: Option<usize>,

    /// Greedy per-axis bin reduction towards the targets
    #[arg(long)]
    adaptive: bool,

    /// Floor for adaptive reduction
    #[arg(long, default_value = "1")]
    adaptive_min_bins: usize,

    /// Merge adjacent bins whose marginal fraction is below this
    #[arg(long)]
    merge_min_fraction: Option<f64>,

    /// Floor for marginal bin merging
    #[arg(long, default_value = "1")]
    merge_min_bins: usize,

    /// Merge grid cells across axes until every group reaches this fraction
    #[arg(long)]
    merge_cells_min_fraction: Option<f64>,

    /// Boundary document output
    #[arg(long, default_value = "bin_boundaries.yaml")]
    boundaries_out: PathBuf,

    /// Histogram blob output
    #[arg(long, default_value = "histogram.json.gz")]
    histogram_out: PathBuf,

    /// Rows in the top/bottom cell tables
    #[arg(long, default_value = "10")]
    top: usize,
}

impl PartitionArgs {
    fn into_config(self, dataset: String) -> Result<PartitionConfig> {
        Ok(PartitionConfig {
            dataset,
            n_files: self.n_files,
            output: self.output,
            ignore_axes: self.ignore_axes,
            bins_per_axis: self.bins_per_axis,
            bins_per_axis_override: parse_bins_overrides(&self.bins_per_axis_override)?,
            tail_cap_quantile: self.tail_cap_quantile,
            target_min_fraction: self.target_min_fraction,
            target_max_fraction: self.target_max_fraction,
            bins_scan_min: self.bins_scan_min,
            bins_scan_max: self.bins_scan_max,
            adaptive: self.adaptive,
            adaptive_min_bins: self.adaptive_min_bins,
            merge_min_fraction: self.merge_min_fraction,
            merge_min_bins: self.merge_min_bins,
            merge_cells_min_fraction: self.merge_cells_min_fraction,
            boundaries_out: self.boundaries_out,
            histogram_out: self.histogram_out,
            top: self.top,
        })
    }
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    tracing_subscriber::fmt()
        .with_max_level(cli.log_level)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    match cli.command {
        Commands::Partition { dataset, args } => cmd_partition(&args.into_config(dataset)?),
        Commands::Run { config } => {
            tracing::info!(path = %config.display(), "loading run config");
            cmd_partition(&read_partition_config(&config)?)
        }
        Commands::CalcUsage { boundaries, histogram, cuts } => {
            cmd_calc_usage(&boundaries, histogram.as_deref(), &cuts)
        }
        Commands::Version => {
            println!("objpart {}", op_core::VERSION);
            Ok(())
        }
    }
}

fn cmd_partition(cfg: &PartitionConfig) -> Result<()> {
    cfg.validate()?;

    let mut table = ParquetCountSource::new().collect_counts(&cfg.dataset, cfg.n_files)?;
    let axes = cfg.axis_plan();
    axes.resolve(&table)?;
    if let Some(path) = &cfg.output {
        write_count_table(path, &table)?;
    }

    if let Some(q) = cfg.tail_cap_quantile {
        let capped = apply_tail_caps(&table, &cfg.ignore_axes, q)?;
        for (axis, cap) in &capped.caps {
            println!("Tail cap: {axis} clipped at {cap}");
        }
        table = capped.table;
    }

    let (evaluation, targets_met): (Evaluation, Option<bool>) = if let Some(scan) = cfg.scan() {
        let out = scan_bins_per_axis(&table, &axes, &scan)?;
        println!("Selected bins per axis: {}", out.bins_per_axis);
        (out.evaluation, Some(out.meets_targets))
    } else if let Some(adaptive) = cfg.adaptive() {
        let out = adaptive_search(&table, &axes, &adaptive)?;
        println!(
            "Adaptive bins per axis: {} ({} steps)",
            report::bins_list(&out.plan.bins_per_axis()),
            out.steps.len()
        );
        (out.evaluation, Some(out.targets_met))
    } else {
        let eval = evaluate(&table, &axes.resolve(&table)?)?;
        let targets = cfg.targets();
        let supplied = targets.min_fraction.is_some() || targets.max_fraction.is_some();
        let score = TargetScanScore::new(&eval.summary, &targets);
        (eval, supplied.then(|| score.meets_targets()))
    };

    let mut hist = evaluation.histogram;
    if let Some(min_fraction) = cfg.merge_min_fraction {
        let merged = merge_sparse_bins(&hist, min_fraction, cfg.merge_min_bins)?;
        for (axis, n) in merged.merges.iter().filter(|(_, n)| **n > 0) {
            println!("Merged {n} sparse bins on {axis}");
        }
        hist = merged.histogram;
    }

    let mut doc = BoundaryDocument::new(&hist.boundaries());
    let mut cell_merge = None;
    if let Some(min_fraction) = cfg.merge_cells_min_fraction {
        let merged = merge_sparse_cells(&hist, min_fraction)?;
        let groups: Vec<LabeledGroup> =
            merged.groups.iter().map(|g| g.labeled(hist.axes())).collect();
        doc = doc.with_merged_cells(min_fraction, &groups);
        cell_merge = Some(merged);
    }

    write_boundary_document(&cfg.boundaries_out, &doc)?;
    write_histogram(&cfg.histogram_out, &hist)?;
    tracing::info!(
        boundaries = %cfg.boundaries_out.display(),
        histogram = %cfg.histogram_out.display(),
        "outputs written"
    );

    let top = top_cells(&hist, cfg.top);
    let bottom = bottom_cells(&hist, cfg.top);
    print!("{}", report::cell_table(&format!("Top {} bins", cfg.top), &top));
    print!("{}", report::cell_table(&format!("Least {} bins", cfg.top), &bottom));
    println!("{}", report::summary_line("Histogram summary", &histogram_summary(&hist)));
    if let Some(merged) = &cell_merge {
        print!("{}", report::group_lines(&merged.groups));
        println!("{}", report::summary_line("Merged cell summary", &merged.summary));
    }
    if targets_met == Some(false) {
        println!("Note: targets not met; showing the closest configuration");
    }
    Ok(())
}

fn parse_cut(entry: &str) -> Result<(String, u64)> {
    let Some((axis, value)) = entry.split_once('=') else {
        anyhow::bail!("invalid --cut value '{entry}'; expected AXIS=VALUE");
    };
    let axis = axis.trim();
    if axis.is_empty() {
        anyhow::bail!("invalid --cut value '{entry}'; axis cannot be empty");
    }
    let value: u64 = value
        .trim()
        .parse()
        .map_err(|_| anyhow::anyhow!("invalid --cut value '{entry}'; value must be an integer"))?;
    Ok((axis.to_string(), value))
}

/// One group per histogram cell.
fn cell_groups(hist: &NdHistogram) -> Vec<LabeledGroup> {
    let total = hist.total();
    (0..hist.n_cells())
        .map(|flat| {
            let index = hist.unravel(flat);
            let count = hist.counts()[flat];
            LabeledGroup {
                cells: vec![
                    hist.axes().iter().zip(index).map(|(a, i)| (a.name.clone(), i)).collect(),
                ],
                count,
                fraction: if total == 0 { 0.0 } else { count as f64 / total as f64 },
            }
        })
        .collect()
}

fn cmd_calc_usage(boundaries: &Path, histogram: Option<&Path>, cuts: &[String]) -> Result<()> {
    let mut cut_map = BTreeMap::new();
    for entry in cuts {
        let (axis, value) = parse_cut(entry)?;
        if cut_map.insert(axis.clone(), value).is_some() {
            anyhow::bail!("duplicate --cut axis '{axis}'");
        }
    }

    tracing::info!(path = %boundaries.display(), "loading boundaries");
    let doc = read_boundary_document(boundaries)?;
    let groups = match (doc.groups(), histogram) {
        (Some(groups), _) => groups,
        (None, Some(path)) => cell_groups(&read_histogram(path)?),
        (None, None) => anyhow::bail!(
            "{} has no merged_cells section; pass --histogram to use one group per cell",
            boundaries.display()
        ),
    };

    let usage = usage_fraction(&doc.boundaries()?, &groups, &cut_map)?;
    println!("Usage fraction: {usage:.6}");
    Ok(())
}
