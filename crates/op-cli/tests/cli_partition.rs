use std::path::{Path, PathBuf};
use std::process::{Command, Output};
use std::time::{SystemTime, UNIX_EPOCH};

use op_core::CountTable;
use op_io::{read_boundary_document, read_count_table, read_histogram, write_count_table};

fn bin_path() -> PathBuf {
    PathBuf::from(env!("CARGO_BIN_EXE_objpart"))
}

fn tmp_dir(name: &str) -> PathBuf {
    let nanos = SystemTime::now().duration_since(UNIX_EPOCH).unwrap().as_nanos();
    let mut p = std::env::temp_dir();
    p.push(format!("objpart_cli_partition_{}_{}_{}", std::process::id(), nanos, name));
    std::fs::create_dir_all(&p).unwrap();
    p
}

fn run(args: &[&str]) -> Output {
    Command::new(bin_path())
        .args(args)
        .output()
        .unwrap_or_else(|e| panic!("failed to run {:?} {:?}: {}", bin_path(), args, e))
}

fn s(p: &Path) -> String {
    p.to_string_lossy().into_owned()
}

fn write_sample(dir: &Path) -> PathBuf {
    let table = CountTable::from_columns([
        ("n_muons", vec![0, 1, 1, 2, 2, 2, 3, 3, 4, 4]),
        ("n_electrons", vec![1, 2, 1, 0, 1, 2, 3, 3, 2, 0]),
        ("n_jets", vec![0, 1, 0, 1, 0, 1, 0, 1, 0, 9]),
    ])
    .unwrap();
    let path = dir.join("counts.parquet");
    write_count_table(&path, &table).unwrap();
    path
}

#[test]
fn partition_writes_boundaries_and_histogram() {
    let dir = tmp_dir("basic");
    let data = write_sample(&dir);
    let boundaries = dir.join("bin_boundaries.yaml");
    let histogram = dir.join("histogram.json.gz");

    let out = run(&[
        "partition",
        &s(&data),
        "--ignore-axes",
        "n_jets",
        "--boundaries-out",
        &s(&boundaries),
        "--histogram-out",
        &s(&histogram),
    ]);
    assert!(
        out.status.success(),
        "partition failed, stderr={}",
        String::from_utf8_lossy(&out.stderr)
    );

    let doc = read_boundary_document(&boundaries).unwrap();
    assert_eq!(doc.axes["n_muons"], vec![0, 2, 3, 4, 5]);
    assert_eq!(doc.axes["n_electrons"], vec![0, 2, 3, 4]);
    assert!(!doc.axes.contains_key("n_jets"));
    assert!(doc.merged_cells.is_none());

    let hist = read_histogram(&histogram).unwrap();
    assert_eq!(hist.shape(), vec![4, 3]);
    assert_eq!(hist.total(), 10);

    let stdout = String::from_utf8_lossy(&out.stdout);
    assert!(stdout.contains("Top 10 bins"), "stdout={stdout}");
    assert!(stdout.contains("Least 10 bins"), "stdout={stdout}");
    assert!(stdout.contains("Histogram summary: max fraction 0.2000"), "stdout={stdout}");
}

#[test]
fn partition_saves_counts_and_applies_overrides() {
    let dir = tmp_dir("overrides");
    let data = write_sample(&dir);
    let saved = dir.join("saved.parquet");
    let boundaries = dir.join("b.yaml");

    let out = run(&[
        "partition",
        &s(&data),
        "-o",
        &s(&saved),
        "--bins-per-axis",
        "2",
        "--bins-per-axis-override",
        "n_muons=1",
        "--tail-cap-quantile",
        "0.9",
        "--boundaries-out",
        &s(&boundaries),
        "--histogram-out",
        &s(&dir.join("h.json.gz")),
        "--top",
        "3",
    ]);
    assert!(
        out.status.success(),
        "partition failed, stderr={}",
        String::from_utf8_lossy(&out.stderr)
    );

    assert_eq!(read_count_table(&saved).unwrap().n_rows(), 10);
    let doc = read_boundary_document(&boundaries).unwrap();
    assert_eq!(doc.axes["n_muons"], vec![0, 5]);
    // The lone 9 is clipped to the 0.9 quantile.
    assert_eq!(*doc.axes["n_jets"].last().unwrap(), 2);
    let stdout = String::from_utf8_lossy(&out.stdout);
    assert!(stdout.contains("Tail cap: n_jets clipped at 1"), "stdout={stdout}");
    assert!(stdout.contains("Top 3 bins"), "stdout={stdout}");
}

#[test]
fn partition_reads_dataset_directory() {
    let dir = tmp_dir("directory");
    for (i, rows) in [vec![0u64, 1, 2], vec![3, 4], vec![5]].into_iter().enumerate() {
        let t = CountTable::from_columns([("n_jets", rows)]).unwrap();
        write_count_table(&dir.join(format!("part{i}.parquet")), &t).unwrap();
    }
    let histogram = dir.join("h.json.gz");

    let out = run(&[
        "partition",
        &s(&dir),
        "-n",
        "2",
        "--boundaries-out",
        &s(&dir.join("b.yaml")),
        "--histogram-out",
        &s(&histogram),
    ]);
    assert!(
        out.status.success(),
        "partition failed, stderr={}",
        String::from_utf8_lossy(&out.stderr)
    );
    assert_eq!(read_histogram(&histogram).unwrap().total(), 5);
}

#[test]
fn partition_scan_reports_selection() {
    let dir = tmp_dir("scan");
    let data = write_sample(&dir);

    let out = run(&[
        "partition",
        &s(&data),
        "--ignore-axes",
        "n_jets",
        "--bins-scan-min",
        "1",
        "--bins-scan-max",
        "4",
        "--target-max-fraction",
        "0.01",
        "--boundaries-out",
        &s(&dir.join("b.yaml")),
        "--histogram-out",
        &s(&dir.join("h.json.gz")),
    ]);
    assert!(
        out.status.success(),
        "partition --bins-scan failed, stderr={}",
        String::from_utf8_lossy(&out.stderr)
    );
    let stdout = String::from_utf8_lossy(&out.stdout);
    assert!(stdout.contains("Selected bins per axis: 4"), "stdout={stdout}");
    assert!(stdout.contains("targets not met"), "stdout={stdout}");
}

#[test]
fn partition_rejects_adaptive_with_scan() {
    let dir = tmp_dir("bad_combo");
    let data = write_sample(&dir);

    let out = run(&[
        "partition",
        &s(&data),
        "--adaptive",
        "--target-min-fraction",
        "0.01",
        "--target-max-fraction",
        "0.5",
        "--bins-scan-min",
        "2",
        "--bins-scan-max",
        "4",
        "--boundaries-out",
        &s(&dir.join("b.yaml")),
    ]);
    assert!(!out.status.success());
    let stderr = String::from_utf8_lossy(&out.stderr);
    assert!(stderr.contains("adaptive"), "stderr={stderr}");
    assert!(!dir.join("b.yaml").exists());
}

#[test]
fn partition_rejects_bad_override() {
    let dir = tmp_dir("bad_override");
    let data = write_sample(&dir);

    let out = run(&["partition", &s(&data), "--bins-per-axis-override", "n_muons"]);
    assert!(!out.status.success());
    let stderr = String::from_utf8_lossy(&out.stderr);
    assert!(stderr.contains("AXIS=INT"), "stderr={stderr}");
}

#[test]
fn partition_unknown_override_writes_nothing() {
    let dir = tmp_dir("unknown_override");
    let data = write_sample(&dir);
    let saved = dir.join("saved.parquet");

    let out = run(&[
        "partition",
        &s(&data),
        "-o",
        &s(&saved),
        "--bins-per-axis-override",
        "n_taus=2",
        "--boundaries-out",
        &s(&dir.join("b.yaml")),
    ]);
    assert!(!out.status.success());
    let stderr = String::from_utf8_lossy(&out.stderr);
    assert!(stderr.contains("n_taus"), "stderr={stderr}");
    assert!(!saved.exists());
    assert!(!dir.join("b.yaml").exists());
}

#[test]
fn partition_adaptive_drops_the_unbalanced_split() {
    let dir = tmp_dir("adaptive");
    let mut muons = Vec::new();
    let mut electrons = Vec::new();
    for (m, e, n) in [(0u64, 0u64, 9usize), (0, 1, 3), (1, 0, 9), (1, 1, 3)] {
        muons.extend(std::iter::repeat_n(m, n));
        electrons.extend(std::iter::repeat_n(e, n));
    }
    let table =
        CountTable::from_columns([("n_muons", muons), ("n_electrons", electrons)]).unwrap();
    let data = dir.join("counts.parquet");
    write_count_table(&data, &table).unwrap();
    let boundaries = dir.join("b.yaml");

    let out = run(&[
        "partition",
        &s(&data),
        "--bins-per-axis",
        "2",
        "--adaptive",
        "--target-min-fraction",
        "0.2",
        "--target-max-fraction",
        "1.0",
        "--boundaries-out",
        &s(&boundaries),
        "--histogram-out",
        &s(&dir.join("h.json.gz")),
    ]);
    assert!(
        out.status.success(),
        "partition --adaptive failed, stderr={}",
        String::from_utf8_lossy(&out.stderr)
    );
    let stdout = String::from_utf8_lossy(&out.stdout);
    assert!(
        stdout.contains("Adaptive bins per axis: n_muons=2, n_electrons=1 (1 steps)"),
        "stdout={stdout}"
    );
    assert!(!stdout.contains("targets not met"), "stdout={stdout}");

    let doc = read_boundary_document(&boundaries).unwrap();
    assert_eq!(doc.axes["n_muons"], vec![0, 1, 2]);
    assert_eq!(doc.axes["n_electrons"], vec![0, 2]);
}

#[test]
fn partition_merges_sparse_marginal_bin() {
    let dir = tmp_dir("merge_bins");
    let mut jets = vec![0u64; 10];
    jets.push(1);
    jets.extend([2u64; 10]);
    let data = dir.join("counts.parquet");
    write_count_table(&data, &CountTable::from_columns([("n_jets", jets)]).unwrap()).unwrap();
    let boundaries = dir.join("b.yaml");
    let histogram = dir.join("h.json.gz");

    let out = run(&[
        "partition",
        &s(&data),
        "--merge-min-fraction",
        "0.1",
        "--boundaries-out",
        &s(&boundaries),
        "--histogram-out",
        &s(&histogram),
    ]);
    assert!(
        out.status.success(),
        "partition --merge-min-fraction failed, stderr={}",
        String::from_utf8_lossy(&out.stderr)
    );
    let stdout = String::from_utf8_lossy(&out.stdout);
    assert!(stdout.contains("Merged 1 sparse bins on n_jets"), "stdout={stdout}");

    let doc = read_boundary_document(&boundaries).unwrap();
    assert_eq!(doc.axes["n_jets"], vec![0, 2, 3]);
    let hist = read_histogram(&histogram).unwrap();
    assert_eq!(hist.counts(), &[11, 10]);
}

#[test]
fn run_config_with_cell_merge() {
    let dir = tmp_dir("run_config");
    let data = write_sample(&dir);
    let boundaries = dir.join("b.yaml");
    let config = dir.join("partition.yaml");
    std::fs::write(
        &config,
        format!(
            "dataset: {}\nignore_axes: [n_jets]\nmerge_cells_min_fraction: 0.15\n\
             boundaries_out: {}\nhistogram_out: {}\n",
            s(&data),
            s(&boundaries),
            s(&dir.join("h.json.gz"))
        ),
    )
    .unwrap();

    let out = run(&["run", "--config", &s(&config)]);
    assert!(
        out.status.success(),
        "run --config failed, stderr={}",
        String::from_utf8_lossy(&out.stderr)
    );

    let doc = read_boundary_document(&boundaries).unwrap();
    let merged = doc.merged_cells.unwrap();
    assert_eq!(merged.groups.iter().map(|g| g.count).sum::<u64>(), 10);
    assert!(merged.groups.iter().all(|g| g.fraction >= 0.15));
    let stdout = String::from_utf8_lossy(&out.stdout);
    assert!(stdout.contains("Merged cell summary"), "stdout={stdout}");
}

#[test]
fn version_prints() {
    let out = run(&["version"]);
    assert!(out.status.success());
    assert!(String::from_utf8_lossy(&out.stdout).starts_with("objpart "));
}
