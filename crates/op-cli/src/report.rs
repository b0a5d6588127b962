//! Console tables and summary lines.

use op_binning::{CellReport, HistogramSummary, MergedGroup};

/// Render cells as an aligned table: one interval column per axis, then count and fraction.
pub fn cell_table(title: &str, cells: &[CellReport]) -> String {
    let mut out = format!("{title}\n");
    let Some(first) = cells.first() else {
        out.push_str("  (no cells)\n");
        return out;
    };

    let mut header: Vec<String> = first.intervals.iter().map(|i| i.axis.clone()).collect();
    header.push("count".to_string());
    header.push("fraction".to_string());

    let rows: Vec<Vec<String>> = cells
        .iter()
        .map(|c| {
            let mut row: Vec<String> =
                c.intervals.iter().map(|i| format!("[{}, {})", i.lo, i.hi)).collect();
            row.push(c.count.to_string());
            row.push(format!("{:.4}", c.fraction));
            row
        })
        .collect();

    let mut widths: Vec<usize> = header.iter().map(String::len).collect();
    for row in &rows {
        for (w, cell) in widths.iter_mut().zip(row) {
            *w = (*w).max(cell.len());
        }
    }

    let fmt_row = |row: &[String]| {
        let cols: Vec<String> =
            row.iter().zip(&widths).map(|(c, w)| format!("{c:<w$}", w = *w)).collect();
        format!("  {}\n", cols.join("  ").trim_end())
    };
    out.push_str(&fmt_row(&header));
    for row in &rows {
        out.push_str(&fmt_row(row));
    }
    out
}

/// `label: max fraction .., min fraction .., min nonzero fraction .., zero bins ..`.
pub fn summary_line(label: &str, s: &HistogramSummary) -> String {
    let min_nonzero = match s.min_nonzero_fraction {
        Some(v) => format!("{v:.4}"),
        None => "undefined".to_string(),
    };
    format!(
        "{label}: max fraction {:.4}, min fraction {:.4}, min nonzero fraction {min_nonzero}, zero bins {}",
        s.max_fraction, s.min_fraction, s.zero_bins
    )
}

/// Largest and smallest merged groups.
pub fn group_lines(groups: &[MergedGroup]) -> String {
    let Some(largest) = groups.iter().max_by_key(|g| g.count) else {
        return "Merged cells: no groups\n".to_string();
    };
    let smallest = groups.iter().min_by_key(|g| g.count).unwrap_or(largest);
    format!(
        "Merged cells: {} groups; largest {} cells ({:.4}), smallest {} cells ({:.4})\n",
        groups.len(),
        largest.cells.len(),
        largest.fraction,
        smallest.cells.len(),
        smallest.fraction
    )
}

/// `name=bins` list.
pub fn bins_list(bins: &[(String, usize)]) -> String {
    bins.iter().map(|(a, n)| format!("{a}={n}")).collect::<Vec<_>>().join(", ")
}

#[cfg(test)]
mod tests {
    use super::*;
    use op_binning::AxisInterval;

    fn cell(lo: u64, hi: u64, count: u64, fraction: f64) -> CellReport {
        CellReport {
            index: vec![0],
            intervals: vec![AxisInterval { axis: "n_muons".into(), lo, hi }],
            count,
            fraction,
        }
    }

    #[test]
    fn table_is_aligned() {
        let t = cell_table("Top 2 bins", &[cell(0, 2, 120, 0.6), cell(10, 100, 8, 0.04)]);
        let lines: Vec<&str> = t.lines().collect();
        assert_eq!(lines[0], "Top 2 bins");
        assert_eq!(lines[1], "  n_muons    count  fraction");
        assert_eq!(lines[2], "  [0, 2)     120    0.6000");
        assert_eq!(lines[3], "  [10, 100)  8      0.0400");
    }

    #[test]
    fn empty_table() {
        assert!(cell_table("Top 0 bins", &[]).contains("(no cells)"));
    }

    #[test]
    fn undefined_min_nonzero() {
        let s = HistogramSummary {
            max_fraction: 0.0,
            min_fraction: 0.0,
            min_nonzero_fraction: None,
            zero_bins: 4,
        };
        let line = summary_line("Histogram summary", &s);
        assert!(line.contains("min nonzero fraction undefined"));
        assert!(line.ends_with("zero bins 4"));
    }

    #[test]
    fn bins_are_listed() {
        assert_eq!(bins_list(&[("a".into(), 3), ("b".into(), 2)]), "a=3, b=2");
    }
}
