//! Quantile tail capping of long-tailed axes.

use std::collections::BTreeMap;

use op_core::{CountTable, Error, Result};

use crate::boundaries::IntegerCdf;

/// Result of [`apply_tail_caps`].
#[derive(Debug, Clone)]
pub struct TailCapOutcome {
    /// Copy of the input with capped axes clipped.
    pub table: CountTable,
    /// Applied cap per axis; only axes that were actually changed appear.
    pub caps: BTreeMap<String, u64>,
}

/// Clip every non-ignored axis at its `quantile` value.
///
/// `quantile` must lie in `(0, 1]`. Axes whose maximum already sits at or
/// below the cap are left untouched and omitted from the cap map.
pub fn apply_tail_caps<S: AsRef<str>>(
    table: &CountTable,
    ignore_axes: &[S],
    quantile: f64,
) -> Result<TailCapOutcome> {
    if !(quantile > 0.0 && quantile <= 1.0) {
        return Err(Error::invalid_argument(format!(
            "tail-cap quantile must be in (0, 1] (got {quantile})"
        )));
    }
    for axis in ignore_axes {
        let axis = axis.as_ref();
        if !table.contains_axis(axis) {
            return Err(Error::invalid_argument(format!("unknown axis '{axis}' in ignore list")));
        }
    }

    let mut caps = BTreeMap::new();
    let mut out = CountTable::new();
    for column in table.columns() {
        let ignored = ignore_axes.iter().any(|a| a.as_ref() == column.name);
        if ignored {
            out.push_column(column.name.clone(), column.values.clone())?;
            continue;
        }
        let cap = IntegerCdf::from_values(&column.values)?.and_then(|cdf| {
            let cap = cdf.quantile(quantile);
            (cap < cdf.max()).then_some(cap)
        });

        match cap {
            Some(cap) => {
                let clipped = column.values.iter().map(|&v| v.min(cap)).collect();
                tracing::info!(axis = %column.name, cap, quantile, "tail cap applied");
                caps.insert(column.name.clone(), cap);
                out.push_column(column.name.clone(), clipped)?;
            }
            None => out.push_column(column.name.clone(), column.values.clone())?,
        }
    }

    Ok(TailCapOutcome { table: out, caps })
}
