//! Parquet read/write for count tables.
//!
//! Every integer column of the file becomes one axis; other columns are
//! skipped. Values must be non-negative and non-null.

use std::fs::File;
use std::path::Path;
use std::sync::Arc;

use arrow::array::{Array, ArrayRef, AsArray, Int64Array};
use arrow::compute::cast;
use arrow::datatypes::{DataType, Field, Int64Type, Schema, UInt64Type};
use arrow::record_batch::RecordBatch;
use parquet::arrow::ArrowWriter;
use parquet::arrow::arrow_reader::ParquetRecordBatchReaderBuilder;
use parquet::basic::Compression;
use parquet::file::properties::WriterProperties;

use op_core::CountTable;

/// Error type for Parquet operations.
#[derive(Debug, thiserror::Error)]
pub enum ParquetError {
    #[error("Parquet read/write error: {0}")]
    Parquet(#[from] parquet::errors::ParquetError),

    #[error("Arrow error: {0}")]
    Arrow(#[from] arrow::error::ArrowError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("{path}: no integer count columns")]
    NoCountColumns { path: String },

    #[error("column '{col}' has {nulls} null values")]
    Nulls { col: String, nulls: usize },

    #[error("column '{col}' row {row}: value {value} is not a valid count")]
    InvalidCount { col: String, row: usize, value: String },

    #[error("count table error: {0}")]
    Table(#[from] op_core::Error),
}

impl From<ParquetError> for op_core::Error {
    fn from(err: ParquetError) -> Self {
        match err {
            ParquetError::Io(e) => op_core::Error::Io(e),
            ParquetError::Table(e) => e,
            other => op_core::Error::Validation(other.to_string()),
        }
    }
}

/// Read a Parquet file into Arrow RecordBatches.
pub fn read_parquet_batches(path: &Path) -> Result<Vec<RecordBatch>, ParquetError> {
    let file = File::open(path)?;
    let builder = ParquetRecordBatchReaderBuilder::try_new(file)?;
    let reader = builder.build()?;
    let batches: Result<Vec<_>, _> = reader.collect();
    Ok(batches?)
}

fn is_integer(dt: &DataType) -> bool {
    matches!(
        dt,
        DataType::Int8
            | DataType::Int16
            | DataType::Int32
            | DataType::Int64
            | DataType::UInt8
            | DataType::UInt16
            | DataType::UInt32
            | DataType::UInt64
    )
}

/// Convert one integer column into counts.
fn column_counts(name: &str, column: &ArrayRef) -> Result<Vec<u64>, ParquetError> {
    if column.null_count() > 0 {
        return Err(ParquetError::Nulls { col: name.into(), nulls: column.null_count() });
    }
    if column.data_type() == &DataType::UInt64 {
        return Ok(column.as_primitive::<UInt64Type>().values().to_vec());
    }

    let widened = cast(column, &DataType::Int64)?;
    let values = widened.as_primitive::<Int64Type>().values();
    values
        .iter()
        .enumerate()
        .map(|(row, &v)| {
            u64::try_from(v).map_err(|_| ParquetError::InvalidCount {
                col: name.into(),
                row,
                value: v.to_string(),
            })
        })
        .collect()
}

/// Convert RecordBatches into a [`CountTable`], one axis per integer column.
pub fn count_table_from_batches(
    batches: &[RecordBatch],
    source: &str,
) -> Result<CountTable, ParquetError> {
    let Some(first) = batches.first() else {
        return Err(ParquetError::NoCountColumns { path: source.into() });
    };
    let schema = first.schema();
    let mut columns: Vec<(String, Vec<u64>)> = Vec::new();
    for field in schema.fields() {
        if is_integer(field.data_type()) {
            columns.push((field.name().clone(), Vec::new()));
        } else {
            tracing::debug!(column = %field.name(), "skipping non-integer column");
        }
    }
    if columns.is_empty() {
        return Err(ParquetError::NoCountColumns { path: source.into() });
    }

    for batch in batches {
        for (name, values) in columns.iter_mut() {
            let column = batch.column_by_name(name).ok_or_else(|| {
                ParquetError::Arrow(arrow::error::ArrowError::SchemaError(format!(
                    "column '{name}' missing from a later batch"
                )))
            })?;
            values.extend(column_counts(name, column)?);
        }
    }

    Ok(CountTable::from_columns(columns)?)
}

/// Read a Parquet file into a [`CountTable`].
pub fn read_count_table(path: &Path) -> Result<CountTable, ParquetError> {
    let batches = read_parquet_batches(path)?;
    let table = count_table_from_batches(&batches, &path.display().to_string())?;
    tracing::info!(
        path = %path.display(),
        rows = table.n_rows(),
        axes = table.n_axes(),
        "read count table"
    );
    Ok(table)
}

/// Write a [`CountTable`] to a Snappy-compressed Parquet file with `Int64` columns.
pub fn write_count_table(path: &Path, table: &CountTable) -> Result<(), ParquetError> {
    if table.is_empty() {
        return Err(ParquetError::NoCountColumns { path: path.display().to_string() });
    }

    let mut fields = Vec::with_capacity(table.n_axes());
    let mut arrays: Vec<ArrayRef> = Vec::with_capacity(table.n_axes());
    for column in table.columns() {
        let values = column
            .values
            .iter()
            .enumerate()
            .map(|(row, &v)| {
                i64::try_from(v).map_err(|_| ParquetError::InvalidCount {
                    col: column.name.clone(),
                    row,
                    value: v.to_string(),
                })
            })
            .collect::<Result<Vec<i64>, _>>()?;
        fields.push(Field::new(&column.name, DataType::Int64, false));
        arrays.push(Arc::new(Int64Array::from(values)) as ArrayRef);
    }
    let batch = RecordBatch::try_new(Arc::new(Schema::new(fields)), arrays)?;

    let props = WriterProperties::builder().set_compression(Compression::SNAPPY).build();
    let file = File::create(path)?;
    let mut writer = ArrowWriter::try_new(file, batch.schema(), Some(props))?;
    writer.write(&batch)?;
    writer.close()?;

    tracing::info!(path = %path.display(), rows = table.n_rows(), "wrote count table");
    Ok(())
}
