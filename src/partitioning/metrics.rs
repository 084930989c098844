//! Partitioning metrics utilities.
//!
//! Edge cut and replication factor of a vertex assignment. The fragment
//! builder logs both at `debug` level; tests use them to compare partitioners.

use super::PartitionMap;
use crate::topology::edge_list::EdgeList;
use crate::topology::vertex::VertexId;
use hashbrown::{HashMap, HashSet};
use rayon::prelude::*;

/// Number of edges whose endpoints live on different partitions (O(E)).
///
/// Endpoints missing from `pm` are not counted.
pub fn edge_cut<E: Sync>(g: &EdgeList<E>, pm: &PartitionMap) -> usize {
    g.edges
        .par_iter()
        .filter(|&&(u, v, _)| match (pm.get(u), pm.get(v)) {
            (Some(pu), Some(pv)) => pu != pv,
            _ => false,
        })
        .count()
}

/// Average number of partitions a vertex is present on, as owner or as an
/// outer copy referenced by an edge (O(E)).
pub fn replication_factor<E>(g: &EdgeList<E>, pm: &PartitionMap) -> f64 {
    let verts = g.vertex_ids();
    if verts.is_empty() {
        return 0.0;
    }
    let mut present: HashMap<VertexId, HashSet<usize>> = verts
        .iter()
        .filter_map(|&v| pm.get(v).map(|p| (v, HashSet::from_iter([p]))))
        .collect();
    for &(u, v, _) in &g.edges {
        let (Some(pu), Some(pv)) = (pm.get(u), pm.get(v)) else {
            continue;
        };
        if let Some(s) = present.get_mut(&v) {
            s.insert(pu);
        }
        if let Some(s) = present.get_mut(&u) {
            s.insert(pv);
        }
    }
    let total: usize = present.values().map(HashSet::len).sum();
    total as f64 / verts.len() as f64
}
