#![no_main]

use libfuzzer_sys::fuzz_target;
use op_binning::{build_histogram, compute_boundaries};
use op_core::{BinBoundaries, CountTable};

fuzz_target!(|data: &[u8]| {
    if data.len() < 2 {
        return;
    }

    let n_bins = usize::from(data[0] % 16) + 1;
    let (a, b): (Vec<u64>, Vec<u64>) = data[1..]
        .chunks_exact(2)
        .map(|c| (u64::from(c[0]) * 1000, u64::from(c[1])))
        .unzip();
    if a.is_empty() {
        return;
    }

    let Ok(table) = CountTable::from_columns([("a", a.clone()), ("b", b.clone())]) else {
        return;
    };
    let mut boundaries = BinBoundaries::new();
    for (name, values) in [("a", &a), ("b", &b)] {
        let edges = compute_boundaries(values, n_bins).expect("n_bins >= 1");
        assert!(edges.windows(2).all(|w| w[0] < w[1]));
        assert!(edges.len() <= n_bins + 1);
        boundaries.insert(name, edges);
    }

    let hist = build_histogram(&table, &boundaries).expect("edges cover every value");
    assert_eq!(hist.total(), table.n_rows() as u64);
});
