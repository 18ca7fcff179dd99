//! Edge selection: correlation matrix to sparse undirected edge list.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// A retained pairwise correlation. `a < b` lexicographically.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Edge {
    pub a: String,
    pub b: String,
    pub corr: f64,
}

impl Edge {
    /// Build an edge with its endpoints in canonical order.
    pub fn new(x: &str, y: &str, corr: f64) -> Self {
        let (a, b) = if x <= y { (x, y) } else { (y, x) };
        Self {
            a: a.to_string(),
            b: b.to_string(),
            corr,
        }
    }
}

/// Select the strongest edges of a correlation matrix.
///
/// Every node proposes its `max_per_node` strongest partners with
/// `corr > min_corr`. Proposals are merged per unordered pair (keeping the
/// larger value if both directions disagree), sorted strongest first and
/// capped at `max_edges`.
pub fn select_edges(
    ids: &[String],
    corr: &[Vec<f64>],
    max_per_node: usize,
    min_corr: f64,
    max_edges: usize,
) -> Vec<Edge> {
    let n = ids.len().min(corr.len());
    let mut merged: BTreeMap<(usize, usize), f64> = BTreeMap::new();

    for i in 0..n {
        let mut candidates: Vec<(usize, f64)> = (0..n)
            .filter(|&j| j != i)
            .filter_map(|j| corr[i].get(j).map(|&c| (j, c)))
            .filter(|&(_, c)| c.is_finite() && c > min_corr)
            .collect();
        candidates.sort_by(|x, y| y.1.total_cmp(&x.1).then_with(|| x.0.cmp(&y.0)));
        candidates.truncate(max_per_node);

        for (j, c) in candidates {
            let key = if ids[i] <= ids[j] { (i, j) } else { (j, i) };
            merged
                .entry(key)
                .and_modify(|existing| *existing = existing.max(c))
                .or_insert(c);
        }
    }

    let mut edges: Vec<Edge> = merged
        .into_iter()
        .map(|((i, j), c)| Edge::new(&ids[i], &ids[j], c))
        .collect();
    edges.sort_by(|x, y| {
        y.corr
            .total_cmp(&x.corr)
            .then_with(|| x.a.cmp(&y.a))
            .then_with(|| x.b.cmp(&y.b))
    });
    edges.truncate(max_edges);
    edges
}
