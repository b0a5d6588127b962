//! # op-core
//!
//! Core types for objpart: the per-event count table, per-axis bin
//! boundaries and the shared error type.

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod error;
pub mod types;

pub use error::{Error, Result};
pub use types::{AxisEdges, BinBoundaries, CountColumn, CountTable};

/// objpart version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
