//! Common data types for objpart

use std::collections::BTreeMap;

use crate::{Error, Result};

/// One named axis of per-event object counts.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CountColumn {
    /// Axis name (e.g. `n_jets`).
    pub name: String,
    /// One non-negative count per event.
    pub values: Vec<u64>,
}

/// Per-event object counts, one column per axis.
///
/// Columns keep their insertion order, which fixes the axis order of every
/// histogram built from the table. All columns have the same length.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CountTable {
    columns: Vec<CountColumn>,
}

impl CountTable {
    /// Create an empty table (no axes, no rows).
    pub fn new() -> Self {
        Self { columns: Vec::new() }
    }

    /// Build a table from `(axis, values)` pairs.
    ///
    /// Fails if an axis name repeats or the columns have different lengths.
    pub fn from_columns<I, S>(columns: I) -> Result<Self>
    where
        I: IntoIterator<Item = (S, Vec<u64>)>,
        S: Into<String>,
    {
        let mut table = Self::new();
        for (name, values) in columns {
            table.push_column(name, values)?;
        }
        Ok(table)
    }

    /// Append a column.
    pub fn push_column(&mut self, name: impl Into<String>, values: Vec<u64>) -> Result<()> {
        let name = name.into();
        if name.is_empty() {
            return Err(Error::validation("axis name must be non-empty"));
        }
        if self.contains_axis(&name) {
            return Err(Error::validation(format!("duplicate axis '{name}'")));
        }
        if let Some(first) = self.columns.first()
            && first.values.len() != values.len()
        {
            return Err(Error::validation(format!(
                "axis '{name}' has {} rows, expected {} (axis '{}')",
                values.len(),
                first.values.len(),
                first.name
            )));
        }
        self.columns.push(CountColumn { name, values });
        Ok(())
    }

    /// Number of events (rows).
    pub fn n_rows(&self) -> usize {
        self.columns.first().map(|c| c.values.len()).unwrap_or(0)
    }

    /// Number of axes (columns).
    pub fn n_axes(&self) -> usize {
        self.columns.len()
    }

    /// `true` when the table has no rows.
    pub fn is_empty(&self) -> bool {
        self.n_rows() == 0
    }

    /// Axis names in table order.
    pub fn axis_names(&self) -> impl Iterator<Item = &str> {
        self.columns.iter().map(|c| c.name.as_str())
    }

    /// `true` if the table has a column named `name`.
    pub fn contains_axis(&self, name: &str) -> bool {
        self.columns.iter().any(|c| c.name == name)
    }

    /// Values of one axis.
    pub fn column(&self, name: &str) -> Option<&[u64]> {
        self.columns.iter().find(|c| c.name == name).map(|c| c.values.as_slice())
    }

    /// All columns in table order.
    pub fn columns(&self) -> &[CountColumn] {
        &self.columns
    }
}

/// Bin edges of one axis.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AxisEdges {
    /// Axis name.
    pub name: String,
    /// Strictly increasing edges; bins are `[edges[i], edges[i + 1])`.
    pub edges: Vec<u64>,
}

/// Per-axis bin boundaries, in axis insertion order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BinBoundaries {
    axes: Vec<AxisEdges>,
}

impl BinBoundaries {
    /// Create an empty boundary set.
    pub fn new() -> Self {
        Self { axes: Vec::new() }
    }

    /// Set the edges of `name`, keeping its position if it already exists.
    pub fn insert(&mut self, name: impl Into<String>, edges: Vec<u64>) {
        let name = name.into();
        match self.axes.iter_mut().find(|a| a.name == name) {
            Some(axis) => axis.edges = edges,
            None => self.axes.push(AxisEdges { name, edges }),
        }
    }

    /// Edges of one axis.
    pub fn get(&self, name: &str) -> Option<&[u64]> {
        self.axes.iter().find(|a| a.name == name).map(|a| a.edges.as_slice())
    }

    /// Number of bins on `name` (`edges - 1`), `None` for unknown or degenerate axes.
    pub fn n_bins(&self, name: &str) -> Option<usize> {
        self.get(name).and_then(|e| e.len().checked_sub(1))
    }

    /// `true` if `name` has edges.
    pub fn contains_axis(&self, name: &str) -> bool {
        self.axes.iter().any(|a| a.name == name)
    }

    /// Number of axes.
    pub fn len(&self) -> usize {
        self.axes.len()
    }

    /// `true` when no axis has been inserted.
    pub fn is_empty(&self) -> bool {
        self.axes.is_empty()
    }

    /// `(axis, edges)` pairs in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &[u64])> {
        self.axes.iter().map(|a| (a.name.as_str(), a.edges.as_slice()))
    }

    /// Sorted-key view used by the boundary document.
    pub fn to_map(&self) -> BTreeMap<String, Vec<u64>> {
        self.axes.iter().map(|a| (a.name.clone(), a.edges.clone())).collect()
    }

    /// Build from a sorted-key map (axis order = key order).
    pub fn from_map(map: BTreeMap<String, Vec<u64>>) -> Self {
        Self { axes: map.into_iter().map(|(name, edges)| AxisEdges { name, edges }).collect() }
    }
}

impl<S: Into<String>> FromIterator<(S, Vec<u64>)> for BinBoundaries {
    fn from_iter<T: IntoIterator<Item = (S, Vec<u64>)>>(iter: T) -> Self {
        let mut out = Self::new();
        for (name, edges) in iter {
            out.insert(name, edges);
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn table_keeps_column_order() {
        let t = CountTable::from_columns([
            ("n_muons", vec![0, 1, 2]),
            ("n_electrons", vec![1, 0, 2]),
        ])
        .unwrap();
        assert_eq!(t.n_rows(), 3);
        assert_eq!(t.n_axes(), 2);
        assert_eq!(t.axis_names().collect::<Vec<_>>(), vec!["n_muons", "n_electrons"]);
        assert_eq!(t.column("n_electrons"), Some(&[1u64, 0, 2][..]));
        assert_eq!(t.column("n_jets"), None);
    }

    #[test]
    fn table_rejects_ragged_columns() {
        let err = CountTable::from_columns([("a", vec![0, 1]), ("b", vec![0])]).unwrap_err();
        assert!(matches!(err, Error::Validation(_)));
    }

    #[test]
    fn table_rejects_duplicate_axis() {
        let err = CountTable::from_columns([("a", vec![0]), ("a", vec![1])]).unwrap_err();
        assert!(err.to_string().contains("duplicate axis"));
    }

    #[test]
    fn empty_table_has_no_rows() {
        let t = CountTable::new();
        assert_eq!(t.n_rows(), 0);
        assert!(t.is_empty());
    }

    #[test]
    fn boundaries_insert_replaces_in_place() {
        let mut b = BinBoundaries::new();
        b.insert("z", vec![0, 1]);
        b.insert("a", vec![0, 2, 4]);
        b.insert("z", vec![0, 3, 5]);
        let names: Vec<&str> = b.iter().map(|(n, _)| n).collect();
        assert_eq!(names, vec!["z", "a"]);
        assert_eq!(b.get("z"), Some(&[0u64, 3, 5][..]));
        assert_eq!(b.n_bins("a"), Some(2));
    }

    #[test]
    fn boundaries_map_round_trip() {
        let b: BinBoundaries =
            [("n_muons", vec![0, 2, 5]), ("n_jets", vec![0, 1])].into_iter().collect();
        let map = b.to_map();
        let back = BinBoundaries::from_map(map);
        assert_eq!(back.get("n_muons"), b.get("n_muons"));
        assert_eq!(back.get("n_jets"), b.get("n_jets"));
        // Sorted-key order after the map round trip.
        assert_eq!(back.iter().next().map(|(n, _)| n), Some("n_jets"));
    }
}
