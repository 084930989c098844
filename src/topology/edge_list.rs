//! Whole-graph edge list, the input of [`FragmentBuilder`](super::builder::FragmentBuilder).

use crate::topology::vertex::VertexId;
use itertools::Itertools;

/// Numeric weight of an edge payload.
pub trait EdgeWeight {
    fn weight(&self) -> f64;
}

/// Unweighted edges count as distance 1.
impl EdgeWeight for () {
    #[inline]
    fn weight(&self) -> f64 {
        1.0
    }
}

impl EdgeWeight for f64 {
    #[inline]
    fn weight(&self) -> f64 {
        *self
    }
}

impl EdgeWeight for f32 {
    #[inline]
    fn weight(&self) -> f64 {
        f64::from(*self)
    }
}

impl EdgeWeight for u32 {
    #[inline]
    fn weight(&self) -> f64 {
        f64::from(*self)
    }
}

/// A graph as loaded: explicit vertices plus edges with payload `E`.
///
/// When `directed` is false every edge is stored once here and symmetrised
/// when fragments are built.
#[derive(Debug, Clone, PartialEq)]
pub struct EdgeList<E> {
    pub vertices: Vec<VertexId>,
    pub edges: Vec<(VertexId, VertexId, E)>,
    pub directed: bool,
}

impl<E> Default for EdgeList<E> {
    fn default() -> Self {
        Self {
            vertices: Vec::new(),
            edges: Vec::new(),
            directed: true,
        }
    }
}

impl<E> EdgeList<E> {
    pub fn new(directed: bool) -> Self {
        Self {
            directed,
            ..Self::default()
        }
    }

    /// Build from `(src, dst, payload)` triples of raw ids.
    pub fn from_edges(directed: bool, edges: impl IntoIterator<Item = (u64, u64, E)>) -> Self {
        Self {
            vertices: Vec::new(),
            edges: edges
                .into_iter()
                .map(|(s, d, e)| (VertexId::new(s), VertexId::new(d), e))
                .collect(),
            directed,
        }
    }

    pub fn add_vertex(&mut self, v: VertexId) {
        self.vertices.push(v);
    }

    pub fn add_edge(&mut self, src: VertexId, dst: VertexId, data: E) {
        self.edges.push((src, dst, data));
    }

    pub fn edge_count(&self) -> usize {
        self.edges.len()
    }

    /// Sorted, de-duplicated set of every vertex named explicitly or by an edge.
    pub fn vertex_ids(&self) -> Vec<VertexId> {
        self.vertices
            .iter()
            .copied()
            .chain(self.edges.iter().flat_map(|&(s, d, _)| [s, d]))
            .sorted_unstable()
            .dedup()
            .collect()
    }
}

impl<E: Clone> EdgeList<E> {
    /// Directed edges the fragments will hold: both directions for undirected lists.
    pub fn directed_edges(&self) -> Vec<(VertexId, VertexId, E)> {
        if self.directed {
            return self.edges.clone();
        }
        let mut out = Vec::with_capacity(self.edges.len() * 2);
        for (s, d, e) in &self.edges {
            out.push((*s, *d, e.clone()));
            if s != d {
                out.push((*d, *s, e.clone()));
            }
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn vertex_ids_include_isolated_and_endpoints() {
        let mut g = EdgeList::from_edges(true, [(3, 1, ()), (1, 2, ())]);
        g.add_vertex(VertexId::new(9));
        let ids: Vec<u64> = g.vertex_ids().into_iter().map(VertexId::get).collect();
        assert_eq!(ids, vec![1, 2, 3, 9]);
    }

    #[test]
    fn undirected_lists_are_symmetrised() {
        let g = EdgeList::from_edges(false, [(0, 1, 2.0), (4, 4, 1.0)]);
        let e = g.directed_edges();
        assert_eq!(e.len(), 3);
        assert!(e.contains(&(VertexId::new(1), VertexId::new(0), 2.0)));
    }
}
