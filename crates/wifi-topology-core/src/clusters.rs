//! Connected-component clustering over the edge graph.

use std::collections::{HashMap, HashSet};

use crate::edges::Edge;

/// Cluster membership of one entity. `id == 0` means "not clustered".
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ClusterAssignment {
    pub id: u32,
    pub size: usize,
}

impl ClusterAssignment {
    const ISOLATED: Self = Self { id: 0, size: 1 };
}

/// Result of one clustering pass.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Clustering {
    /// Assignment for every input id.
    pub assignments: HashMap<String, ClusterAssignment>,
    /// Sizes of clusters with two or more members, largest first.
    pub sizes: Vec<usize>,
}

impl Clustering {
    /// Assignment for `id`; unknown ids are isolated.
    pub fn get(&self, id: &str) -> ClusterAssignment {
        self.assignments
            .get(id)
            .copied()
            .unwrap_or(ClusterAssignment::ISOLATED)
    }

    /// Number of clusters with two or more members.
    pub fn count(&self) -> usize {
        self.sizes.len()
    }
}

/// Label connected components of the graph formed by edges with
/// `corr > min_corr`.
///
/// Traversal is iterative and visits roots in `ids` order, so ids are
/// deterministic for identical input but carry no meaning across snapshots.
pub fn detect_clusters(ids: &[String], edges: &[Edge], min_corr: f64) -> Clustering {
    let index: HashMap<&str, usize> = ids.iter().enumerate().map(|(i, id)| (id.as_str(), i)).collect();
    let mut adjacency: Vec<Vec<usize>> = vec![Vec::new(); ids.len()];
    let mut linked: HashSet<(usize, usize)> = HashSet::new();

    for edge in edges.iter().filter(|e| e.corr > min_corr) {
        let (Some(&a), Some(&b)) = (index.get(edge.a.as_str()), index.get(edge.b.as_str())) else {
            continue;
        };
        if a == b {
            continue;
        }
        let key = (a.min(b), a.max(b));
        if linked.insert(key) {
            adjacency[a].push(b);
            adjacency[b].push(a);
        }
    }

    let mut visited = vec![false; ids.len()];
    let mut result = Clustering::default();
    let mut next_id = 1u32;

    for root in 0..ids.len() {
        if visited[root] {
            continue;
        }
        visited[root] = true;
        let mut component = vec![root];
        let mut stack = vec![root];
        while let Some(node) = stack.pop() {
            for &next in &adjacency[node] {
                if !visited[next] {
                    visited[next] = true;
                    component.push(next);
                    stack.push(next);
                }
            }
        }

        let assignment = if component.len() >= 2 {
            let a = ClusterAssignment {
                id: next_id,
                size: component.len(),
            };
            next_id += 1;
            result.sizes.push(component.len());
            a
        } else {
            ClusterAssignment::ISOLATED
        };
        for member in component {
            result.assignments.insert(ids[member].clone(), assignment);
        }
    }

    result.sizes.sort_unstable_by(|a, b| b.cmp(a));
    result
}
