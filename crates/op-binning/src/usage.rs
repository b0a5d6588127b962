//! Fraction of events kept by a set of `axis >= value` cuts on merged groups.

use std::collections::BTreeMap;

use op_core::{BinBoundaries, Error, Result};

use crate::merge_cells::LabeledGroup;

/// Sum the fractions of groups lying entirely above every cut.
///
/// A group counts only if, for each cut axis, every member cell's bin lower
/// edge is `>=` the cut value.
pub fn usage_fraction(
    boundaries: &BinBoundaries,
    groups: &[LabeledGroup],
    cuts: &BTreeMap<String, u64>,
) -> Result<f64> {
    for axis in cuts.keys() {
        if !boundaries.contains_axis(axis) {
            return Err(Error::invalid_argument(format!("cut on unknown axis '{axis}'")));
        }
    }

    let mut usage = 0.0;
    for group in groups {
        let mut passes = true;
        for cell in &group.cells {
            for (axis, &cut) in cuts {
                let lower = lower_edge(boundaries, cell, axis)?;
                passes &= lower >= cut;
            }
        }
        if passes {
            usage += group.fraction;
        }
    }
    Ok(usage)
}

fn lower_edge(
    boundaries: &BinBoundaries,
    cell: &BTreeMap<String, usize>,
    axis: &str,
) -> Result<u64> {
    let bin = *cell
        .get(axis)
        .ok_or_else(|| Error::validation(format!("group cell has no bin for axis '{axis}'")))?;
    let edges = boundaries.get(axis).unwrap_or_default();
    if bin + 1 >= edges.len() {
        return Err(Error::validation(format!(
            "bin {bin} is out of range for axis '{axis}' ({} bins)",
            edges.len().saturating_sub(1)
        )));
    }
    Ok(edges[bin])
}
