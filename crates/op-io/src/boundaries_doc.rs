//! YAML document holding per-axis bin edges and, optionally, merged cell groups.
//!
//! ```yaml
//! axes:
//!   n_electrons: [0, 2, 3, 4]
//!   n_muons: [0, 2, 3, 4, 5]
//! merged_cells:
//!   min_fraction: 0.05
//!   groups:
//!     - cells: [{n_electrons: 0, n_muons: 0}]
//!       count: 2
//!       fraction: 0.2
//! ```

use std::collections::BTreeMap;
use std::path::Path;

use serde::{Deserialize, Serialize};

use op_binning::LabeledGroup;
use op_core::{BinBoundaries, Error, Result};

/// On-disk boundary document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BoundaryDocument {
    /// Edges per axis.
    pub axes: BTreeMap<String, Vec<u64>>,
    /// Cell groups from the cross-axis merger; `null` when it did not run.
    #[serde(default)]
    pub merged_cells: Option<MergedCellsSection>,
}

/// The `merged_cells` section.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MergedCellsSection {
    /// Threshold the groups were merged to.
    #[serde(default)]
    pub min_fraction: f64,
    /// Groups in output order.
    pub groups: Vec<GroupRecord>,
}

/// One stored group.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GroupRecord {
    /// Member cells as `axis -> bin index`.
    pub cells: Vec<BTreeMap<String, usize>>,
    /// Summed count.
    pub count: u64,
    /// Fraction of all events.
    pub fraction: f64,
}

impl From<&LabeledGroup> for GroupRecord {
    fn from(g: &LabeledGroup) -> Self {
        Self { cells: g.cells.clone(), count: g.count, fraction: g.fraction }
    }
}

impl From<GroupRecord> for LabeledGroup {
    fn from(g: GroupRecord) -> Self {
        Self { cells: g.cells, count: g.count, fraction: g.fraction }
    }
}

impl BoundaryDocument {
    /// Document with edges only.
    pub fn new(boundaries: &BinBoundaries) -> Self {
        Self { axes: boundaries.to_map(), merged_cells: None }
    }

    /// Attach merged cell groups.
    pub fn with_merged_cells(mut self, min_fraction: f64, groups: &[LabeledGroup]) -> Self {
        self.merged_cells = Some(MergedCellsSection {
            min_fraction,
            groups: groups.iter().map(GroupRecord::from).collect(),
        });
        self
    }

    /// Edges as [`BinBoundaries`], checked to be strictly increasing with at least two entries.
    pub fn boundaries(&self) -> Result<BinBoundaries> {
        for (axis, edges) in &self.axes {
            if edges.len() < 2 || !edges.windows(2).all(|w| w[0] < w[1]) {
                return Err(Error::validation(format!(
                    "axis '{axis}': edges must be strictly increasing with at least 2 entries"
                )));
            }
        }
        Ok(BinBoundaries::from_map(self.axes.clone()))
    }

    /// Stored groups, if any.
    pub fn groups(&self) -> Option<Vec<LabeledGroup>> {
        self.merged_cells
            .as_ref()
            .map(|m| m.groups.iter().cloned().map(LabeledGroup::from).collect())
    }
}

/// Write `doc` as YAML.
pub fn write_boundary_document(path: &Path, doc: &BoundaryDocument) -> Result<()> {
    std::fs::write(path, serde_yaml_ng::to_string(doc)?)?;
    tracing::info!(path = %path.display(), axes = doc.axes.len(), "wrote boundaries");
    Ok(())
}

/// Read a YAML (or `.json`) boundary document.
pub fn read_boundary_document(path: &Path) -> Result<BoundaryDocument> {
    let bytes = std::fs::read(path)?;
    let ext = path.extension().and_then(|s| s.to_str()).unwrap_or("").to_ascii_lowercase();
    let doc: BoundaryDocument = if ext == "json" {
        serde_json::from_slice(&bytes)?
    } else {
        serde_yaml_ng::from_slice(&bytes)?
    };
    doc.boundaries()?;
    Ok(doc)
}
