//! Where count tables come from.

use std::path::{Path, PathBuf};

use op_core::{CountTable, Error, Result};

use crate::parquet::read_count_table;

/// Upstream provider of per-event count tables.
pub trait CountSource {
    /// Collect the count table of `dataset`, reading at most `n_files` files
    /// (`0` = all).
    fn collect_counts(&self, dataset: &str, n_files: usize) -> Result<CountTable>;
}

/// Reads datasets stored as Parquet: either a single file or a directory of
/// `.parquet` files.
#[derive(Debug, Clone, Default)]
pub struct ParquetCountSource {
    root: Option<PathBuf>,
}

impl ParquetCountSource {
    /// Resolve dataset names relative to the working directory.
    pub fn new() -> Self {
        Self::default()
    }

    /// Resolve dataset names relative to `root`.
    pub fn with_root(root: impl Into<PathBuf>) -> Self {
        Self { root: Some(root.into()) }
    }

    fn resolve(&self, dataset: &str) -> PathBuf {
        match &self.root {
            Some(root) => root.join(dataset),
            None => PathBuf::from(dataset),
        }
    }
}

/// `.parquet` files directly inside `dir`, sorted by name.
pub fn list_parquet_files(dir: &Path) -> Result<Vec<PathBuf>> {
    let mut files = Vec::new();
    for entry in std::fs::read_dir(dir)? {
        let path = entry?.path();
        if path.is_file() && path.extension().is_some_and(|e| e == "parquet") {
            files.push(path);
        }
    }
    files.sort();
    Ok(files)
}

/// Append `next`'s rows to `acc`; both must have the same axes in the same order.
fn concat_tables(acc: CountTable, next: CountTable, source: &Path) -> Result<CountTable> {
    let acc_axes: Vec<&str> = acc.axis_names().collect();
    let next_axes: Vec<&str> = next.axis_names().collect();
    if acc_axes != next_axes {
        return Err(Error::validation(format!(
            "{}: axes {:?} do not match earlier files {:?}",
            source.display(),
            next_axes,
            acc_axes
        )));
    }
    let mut out = CountTable::new();
    for (a, b) in acc.columns().iter().zip(next.columns()) {
        let mut values = a.values.clone();
        values.extend_from_slice(&b.values);
        out.push_column(a.name.clone(), values)?;
    }
    Ok(out)
}

impl CountSource for ParquetCountSource {
    fn collect_counts(&self, dataset: &str, n_files: usize) -> Result<CountTable> {
        let path = self.resolve(dataset);
        if path.is_file() {
            return Ok(read_count_table(&path)?);
        }
        if !path.is_dir() {
            return Err(Error::Io(std::io::Error::new(
                std::io::ErrorKind::NotFound,
                format!("dataset '{}' not found", path.display()),
            )));
        }

        let mut files = list_parquet_files(&path)?;
        if n_files > 0 {
            files.truncate(n_files);
        }
        let Some((first, rest)) = files.split_first() else {
            return Err(Error::validation(format!(
                "dataset directory '{}' has no .parquet files",
                path.display()
            )));
        };

        let mut table = read_count_table(first)?;
        for file in rest {
            table = concat_tables(table, read_count_table(file)?, file)?;
        }
        tracing::info!(
            dataset,
            files = files.len(),
            rows = table.n_rows(),
            axes = table.n_axes(),
            "collected counts"
        );
        Ok(table)
    }
}
