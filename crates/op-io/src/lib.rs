//! # op-io
//!
//! Inputs and outputs around the binning engine: Parquet count tables,
//! the [`CountSource`] trait, the boundary YAML document and the compressed
//! histogram blob.

#![allow(missing_docs)]
#![warn(clippy::all)]

pub mod boundaries_doc;
pub mod histogram_blob;
pub mod parquet;
pub mod source;

pub use boundaries_doc::{
    BoundaryDocument, GroupRecord, MergedCellsSection, read_boundary_document,
    write_boundary_document,
};
pub use histogram_blob::{
    HISTOGRAM_FORMAT_VERSION, decode_histogram, encode_histogram, read_histogram, write_histogram,
};
pub use parquet::{ParquetError, read_count_table, write_count_table};
pub use source::{CountSource, ParquetCountSource, list_parquet_files};
