//! Gzip-compressed JSON snapshot of an [`NdHistogram`].

use std::fs::File;
use std::io::{BufReader, BufWriter, Read, Write};
use std::path::Path;

use flate2::Compression;
use flate2::read::GzDecoder;
use flate2::write::GzEncoder;
use serde::{Deserialize, Serialize};

use op_binning::{HistogramAxis, NdHistogram};
use op_core::{Error, Result};

/// Blob layout version written by this crate.
pub const HISTOGRAM_FORMAT_VERSION: u32 = 1;

#[derive(Debug, Serialize, Deserialize)]
struct AxisRecord {
    name: String,
    edges: Vec<u64>,
}

#[derive(Debug, Serialize, Deserialize)]
struct HistogramRecord {
    format_version: u32,
    axes: Vec<AxisRecord>,
    counts: Vec<u64>,
}

/// Serialize `hist` to gzip JSON bytes.
pub fn encode_histogram(hist: &NdHistogram) -> Result<Vec<u8>> {
    let record = HistogramRecord {
        format_version: HISTOGRAM_FORMAT_VERSION,
        axes: hist
            .axes()
            .iter()
            .map(|a| AxisRecord { name: a.name.clone(), edges: a.edges.clone() })
            .collect(),
        counts: hist.counts().to_vec(),
    };
    let mut encoder = GzEncoder::new(Vec::new(), Compression::default());
    serde_json::to_writer(&mut encoder, &record)?;
    Ok(encoder.finish()?)
}

/// Rebuild a histogram from gzip JSON bytes.
pub fn decode_histogram(bytes: &[u8]) -> Result<NdHistogram> {
    let mut json = Vec::new();
    GzDecoder::new(bytes).read_to_end(&mut json)?;
    let record: HistogramRecord = serde_json::from_slice(&json)?;
    if record.format_version != HISTOGRAM_FORMAT_VERSION {
        return Err(Error::validation(format!(
            "unsupported histogram format version {} (expected {HISTOGRAM_FORMAT_VERSION})",
            record.format_version
        )));
    }
    let axes = record
        .axes
        .into_iter()
        .map(|a| HistogramAxis { name: a.name, edges: a.edges })
        .collect();
    NdHistogram::from_counts(axes, record.counts)
}

/// Write `hist` to `path`.
pub fn write_histogram(path: &Path, hist: &NdHistogram) -> Result<()> {
    let bytes = encode_histogram(hist)?;
    let mut out = BufWriter::new(File::create(path)?);
    out.write_all(&bytes)?;
    out.flush()?;
    tracing::info!(path = %path.display(), cells = hist.n_cells(), "wrote histogram");
    Ok(())
}

/// Read a histogram written by [`write_histogram`].
pub fn read_histogram(path: &Path) -> Result<NdHistogram> {
    let mut bytes = Vec::new();
    BufReader::new(File::open(path)?).read_to_end(&mut bytes)?;
    decode_histogram(&bytes)
}
