//! Fragment construction from a whole-graph edge list.
//!
//! Steps, for every partition:
//! 1. assign owners with a [`Partitioner`],
//! 2. bucket edges by the owner of their source (outgoing rows) and of their
//!    target (incoming rows),
//! 3. collect outer vertices, order them by `(owner, gid)`,
//! 4. derive mirror lists from the peers' outer lists so both sides agree on
//!    positions,
//! 5. freeze both adjacency blocks as CSR.

use crate::debug_invariants::DebugInvariants;
use crate::engine_error::EngineError;
use crate::overlap::Overlap;
use crate::partitioning::{
    PartitionMap, Partitioner, RangePartitioner, edge_cut, replication_factor,
};
use crate::topology::edge_list::EdgeList;
use crate::topology::fragment::{Csr, Fragment, validate_overlap};
use crate::topology::vertex::{LocalId, PartitionId, VertexId};
use hashbrown::HashMap;
use itertools::Itertools;
use once_cell::sync::OnceCell;
use rayon::prelude::*;
use std::sync::Arc;

/// Builds [`Fragment`]s out of an [`EdgeList`].
pub struct FragmentBuilder<'g, E> {
    graph: &'g EdgeList<E>,
    n_parts: usize,
    partitioner: Box<dyn Partitioner + Send + Sync + 'g>,
}

/// Per-run state shared by the fragments of one build.
struct Plan<E> {
    map: Arc<PartitionMap>,
    edges: Vec<(VertexId, VertexId, E)>,
    out_deg: HashMap<VertexId, u32>,
    in_deg: HashMap<VertexId, u32>,
    /// Inner ids per partition, ascending.
    inner: Vec<Vec<VertexId>>,
    /// Outer ids per partition, ordered by `(owner, gid)`.
    outer: Vec<Vec<(PartitionId, VertexId)>>,
    /// Edge indices per partition whose source is inner there.
    out_rows: Vec<Vec<usize>>,
    /// Edge indices per partition whose target is inner there.
    in_rows: Vec<Vec<usize>>,
}

impl<'g, E> FragmentBuilder<'g, E>
where
    E: Clone + Send + Sync,
{
    pub fn new(graph: &'g EdgeList<E>, n_parts: usize) -> Self {
        Self {
            graph,
            n_parts,
            partitioner: Box::new(RangePartitioner),
        }
    }

    /// Replace the default contiguous-range placement.
    pub fn partitioner(mut self, p: impl Partitioner + Send + Sync + 'g) -> Self {
        self.partitioner = Box::new(p);
        self
    }

    /// Build every fragment of the graph.
    pub fn build(self) -> Result<Vec<Fragment<E>>, EngineError> {
        let plan = self.plan()?;
        let frags = (0..self.n_parts)
            .into_par_iter()
            .map(|fid| assemble(&plan, fid))
            .collect::<Vec<_>>();
        crate::debug_invariants!(validate_overlap(&frags), "overlap");
        log::info!(
            "built {} fragments: {} vertices, {} edges",
            frags.len(),
            plan.map.len(),
            plan.edges.len()
        );
        Ok(frags)
    }

    /// Build only fragment `fid`, for one-process-per-partition runs.
    pub fn build_one(self, fid: PartitionId) -> Result<Fragment<E>, EngineError> {
        if fid >= self.n_parts {
            return Err(EngineError::Configuration(format!(
                "fragment {fid} requested but only {} partitions exist",
                self.n_parts
            )));
        }
        let plan = self.plan()?;
        Ok(assemble(&plan, fid))
    }

    fn plan(&self) -> Result<Plan<E>, EngineError> {
        if self.n_parts == 0 {
            return Err(EngineError::Configuration(
                "partition count must be at least 1".into(),
            ));
        }
        let vertices = self.graph.vertex_ids();
        let map = self.partitioner.assign(&vertices, self.n_parts);
        if map.n_parts() != self.n_parts {
            return Err(EngineError::Configuration(format!(
                "partition map covers {} partitions, builder asked for {}",
                map.n_parts(),
                self.n_parts
            )));
        }
        map.validate()?;
        let mut inner = vec![Vec::new(); self.n_parts];
        for &v in &vertices {
            inner[map.owner(v)?].push(v);
        }
        if log::log_enabled!(log::Level::Debug) {
            log::debug!(
                "partitioning: edge cut {}, replication factor {:.3}",
                edge_cut(self.graph, &map),
                replication_factor(self.graph, &map)
            );
        }

        let edges = self.graph.directed_edges();
        let mut out_deg: HashMap<VertexId, u32> = HashMap::with_capacity(vertices.len());
        let mut in_deg: HashMap<VertexId, u32> = HashMap::with_capacity(vertices.len());
        let mut outer: Vec<Vec<(PartitionId, VertexId)>> = vec![Vec::new(); self.n_parts];
        let mut out_rows = vec![Vec::new(); self.n_parts];
        let mut in_rows = vec![Vec::new(); self.n_parts];
        for (i, &(s, d, _)) in edges.iter().enumerate() {
            let ps = map.owner(s)?;
            let pd = map.owner(d)?;
            *out_deg.entry(s).or_default() += 1;
            *in_deg.entry(d).or_default() += 1;
            out_rows[ps].push(i);
            in_rows[pd].push(i);
            if ps != pd {
                outer[ps].push((pd, d));
                outer[pd].push((ps, s));
            }
        }
        for o in &mut outer {
            o.sort_unstable();
            o.dedup();
        }
        Ok(Plan {
            map: Arc::new(map),
            edges,
            out_deg,
            in_deg,
            inner,
            outer,
            out_rows,
            in_rows,
        })
    }
}

fn assemble<E: Clone>(plan: &Plan<E>, fid: PartitionId) -> Fragment<E> {
    let n_parts = plan.map.n_parts();
    let inner = &plan.inner[fid];
    let outer = &plan.outer[fid];
    let inner_num = inner.len();

    let gids: Vec<VertexId> = inner
        .iter()
        .copied()
        .chain(outer.iter().map(|&(_, g)| g))
        .collect();
    let index_of: HashMap<VertexId, LocalId> = gids
        .iter()
        .enumerate()
        .map(|(i, &g)| (g, LocalId::from_index(i)))
        .collect();

    // outer groups are contiguous because `outer` is sorted by owner first
    let mut outer_offsets = vec![0usize; n_parts + 1];
    for &(owner, _) in outer {
        outer_offsets[owner + 1] += 1;
    }
    outer_offsets[0] = inner_num;
    for p in 0..n_parts {
        outer_offsets[p + 1] += outer_offsets[p];
    }

    let mut overlap = Overlap::new(n_parts);
    for (i, &(owner, _)) in outer.iter().enumerate() {
        overlap.add_outer(owner, LocalId::from_index(inner_num + i));
    }
    for (peer, peer_outer) in plan.outer.iter().enumerate() {
        if peer == fid {
            continue;
        }
        for &(_, g) in peer_outer.iter().filter(|(owner, _)| *owner == fid) {
            overlap.add_mirror(peer, index_of[&g]);
        }
    }

    let csr = |rows: &[usize], key: fn(&(VertexId, VertexId, E)) -> (VertexId, VertexId)| {
        let entries = rows
            .iter()
            .map(|&i| {
                let e = &plan.edges[i];
                let (row, nbr) = key(e);
                (index_of[&row].index(), index_of[&nbr], e.2.clone())
            })
            .sorted_by_key(|&(r, n, _)| (r, n))
            .collect::<Vec<_>>();
        Csr::from_sorted(inner_num, entries)
    };
    let out_csr = csr(&plan.out_rows[fid], |e| (e.0, e.1));
    let in_csr = csr(&plan.in_rows[fid], |e| (e.1, e.0));

    let out_degree = gids
        .iter()
        .map(|g| plan.out_deg.get(g).copied().unwrap_or(0))
        .collect();
    let in_degree = gids
        .iter()
        .map(|g| plan.in_deg.get(g).copied().unwrap_or(0))
        .collect();

    log::debug!(
        "fragment {fid}: {inner_num} inner, {} outer, {} out-edges, {} in-edges",
        outer.len(),
        out_csr.len(),
        in_csr.len()
    );

    let frag = Fragment {
        fid,
        gids,
        inner_num,
        index_of,
        outer_offsets,
        out_csr,
        in_csr,
        out_degree,
        in_degree,
        overlap,
        partition_map: Arc::clone(&plan.map),
        max_degree: OnceCell::new(),
    };
    frag.debug_assert_invariants();
    frag
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::partitioning::HashPartitioner;

    fn chain(n: u64) -> EdgeList<f64> {
        EdgeList::from_edges(true, (0..n - 1).map(|i| (i, i + 1, 1.0)))
    }

    #[test]
    fn single_partition_has_no_outer_vertices() {
        let g = chain(4);
        let frags = FragmentBuilder::new(&g, 1).build().unwrap();
        let f = &frags[0];
        assert_eq!(f.inner_vertices_num(), 4);
        assert_eq!(f.outer_vertices_num(), 0);
        assert_eq!(f.edge_num(), 3);
        f.validate_invariants().unwrap();
    }

    #[test]
    fn outer_and_mirror_lists_line_up() {
        let g = chain(6);
        let frags = FragmentBuilder::new(&g, 2).build().unwrap();
        validate_overlap(&frags).unwrap();
        // vertices 0..3 on partition 0, 3..6 on partition 1; edge 2 -> 3 crosses
        let f0 = &frags[0];
        let f1 = &frags[1];
        let outer0: Vec<_> = f0.outer_vertices_of(1).map(|v| f0.gid(v).get()).collect();
        assert_eq!(outer0, vec![3]);
        let mirror1: Vec<_> = f1.mirror_vertices_of(0).iter().map(|&v| f1.gid(v).get()).collect();
        assert_eq!(mirror1, vec![3]);
        let v2 = f0.inner_local(VertexId::new(2)).unwrap();
        let nbrs: Vec<_> = f0.out_edges(v2).map(|n| f0.gid(n.neighbor).get()).collect();
        assert_eq!(nbrs, vec![3]);
        assert_eq!(f0.owner_of(f0.local(VertexId::new(3)).unwrap()), 1);
    }

    #[test]
    fn resolve_reports_owner_and_unknown_ids() {
        let g = chain(6);
        let frags = FragmentBuilder::new(&g, 3)
            .partitioner(HashPartitioner::new(1))
            .build()
            .unwrap();
        for f in &frags {
            f.validate_invariants().unwrap();
            for v in f.inner_vertices() {
                let r = f.resolve(f.gid(v)).unwrap();
                assert_eq!(r.owner, f.fid());
                assert_eq!(r.local, Some(v));
            }
            assert_eq!(
                f.resolve(VertexId::new(99)),
                Err(EngineError::UnknownVertex(VertexId::new(99)))
            );
        }
    }

    #[test]
    fn undirected_edges_show_up_in_both_directions() {
        let g = EdgeList::from_edges(false, [(0u64, 1u64, ())]);
        let f = &FragmentBuilder::new(&g, 1).build().unwrap()[0];
        let v0 = f.inner_local(VertexId::new(0)).unwrap();
        assert_eq!(f.out_degree(v0), 1);
        assert_eq!(f.in_degree(v0), 1);
    }

    #[test]
    fn degrees_of_outer_vertices_are_global() {
        let g = EdgeList::from_edges(true, [(0u64, 2u64, ()), (1, 2, ()), (2, 3, ()), (2, 0, ())]);
        let mut map = PartitionMap::with_capacity(2, 4);
        for (v, p) in [(0, 0), (1, 1), (2, 1), (3, 1)] {
            map.insert(VertexId::new(v), p);
        }
        let frags = FragmentBuilder::new(&g, 2).partitioner(map).build().unwrap();
        let f0 = &frags[0];
        let v2 = f0.local(VertexId::new(2)).unwrap();
        assert!(f0.is_outer(v2));
        assert_eq!(f0.out_degree(v2), 2);
        assert_eq!(f0.in_degree(v2), 2);
    }

    #[test]
    fn mismatched_map_is_rejected() {
        let g = chain(3);
        let map = PartitionMap::with_capacity(3, 0);
        let err = FragmentBuilder::new(&g, 2).partitioner(map).build().unwrap_err();
        assert!(matches!(err, EngineError::Configuration(_)));
        let mut map = PartitionMap::with_capacity(2, 2);
        map.insert(VertexId::new(0), 0);
        map.insert(VertexId::new(1), 1);
        let err = FragmentBuilder::new(&g, 2).partitioner(map).build().unwrap_err();
        assert_eq!(err, EngineError::UnknownVertex(VertexId::new(2)));
    }
}
