//! Partition store: one fragment of a partitioned graph.
//!
//! A [`Fragment`] owns a contiguous range of *inner* vertices, every edge
//! leaving or entering an inner vertex, and read-only *outer* copies of the
//! remote endpoints of those edges. Local ids are laid out as
//!
//! ```text
//! 0 .. n_inner                 inner vertices, ascending global id
//! n_inner .. n_inner + n_outer outer vertices, grouped by owner, ascending global id
//! ```
//!
//! Adjacency is stored as two frozen CSR blocks (outgoing and incoming) with
//! one row per inner vertex; rows are sorted by neighbour local id so
//! iteration order is deterministic. Fragments are immutable after build.

use crate::debug_invariants::{DebugInvariants, ensure};
use crate::engine_error::EngineError;
use crate::overlap::Overlap;
use crate::partitioning::PartitionMap;
use crate::topology::vertex::{LocalId, LocalRange, PartitionId, VertexId};
use hashbrown::HashMap;
use once_cell::sync::OnceCell;
use std::sync::Arc;

/// Compressed rows of `(neighbour, payload)`.
#[derive(Clone, Debug)]
pub struct Csr<E> {
    pub offsets: Vec<u32>,
    pub nbrs: Vec<LocalId>,
    pub data: Vec<E>,
}

impl<E> Csr<E> {
    /// Build from entries already sorted by `(row, neighbour)`.
    pub fn from_sorted(rows: usize, entries: Vec<(usize, LocalId, E)>) -> Self {
        let mut offsets = vec![0u32; rows + 1];
        for &(r, _, _) in &entries {
            offsets[r + 1] += 1;
        }
        for i in 0..rows {
            offsets[i + 1] += offsets[i];
        }
        let mut nbrs = Vec::with_capacity(entries.len());
        let mut data = Vec::with_capacity(entries.len());
        for (_, n, e) in entries {
            nbrs.push(n);
            data.push(e);
        }
        Self {
            offsets,
            nbrs,
            data,
        }
    }

    #[inline]
    pub fn rows(&self) -> usize {
        self.offsets.len() - 1
    }

    #[inline]
    pub fn row(&self, r: usize) -> AdjList<'_, E> {
        if r >= self.rows() {
            return AdjList {
                nbrs: &[],
                data: &[],
            };
        }
        let lo = self.offsets[r] as usize;
        let hi = self.offsets[r + 1] as usize;
        AdjList {
            nbrs: &self.nbrs[lo..hi],
            data: &self.data[lo..hi],
        }
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.nbrs.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.nbrs.is_empty()
    }
}

/// One adjacency entry.
#[derive(Debug)]
pub struct Nbr<'a, E> {
    pub neighbor: LocalId,
    pub data: &'a E,
}

impl<E> Clone for Nbr<'_, E> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<E> Copy for Nbr<'_, E> {}

/// Lazy, finite, exact-size adjacency list of one vertex.
#[derive(Debug)]
pub struct AdjList<'a, E> {
    nbrs: &'a [LocalId],
    data: &'a [E],
}

impl<E> Clone for AdjList<'_, E> {
    fn clone(&self) -> Self {
        Self {
            nbrs: self.nbrs,
            data: self.data,
        }
    }
}

impl<'a, E> AdjList<'a, E> {
    pub fn neighbors(&self) -> &'a [LocalId] {
        self.nbrs
    }
}

impl<'a, E> Iterator for AdjList<'a, E> {
    type Item = Nbr<'a, E>;

    #[inline]
    fn next(&mut self) -> Option<Nbr<'a, E>> {
        let (&n, rest_n) = self.nbrs.split_first()?;
        let (d, rest_d) = self.data.split_first()?;
        self.nbrs = rest_n;
        self.data = rest_d;
        Some(Nbr {
            neighbor: n,
            data: d,
        })
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        (self.nbrs.len(), Some(self.nbrs.len()))
    }
}

impl<E> ExactSizeIterator for AdjList<'_, E> {}

/// Result of [`Fragment::resolve`].
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct Resolved {
    pub owner: PartitionId,
    /// Present when the vertex is inner or outer on this fragment.
    pub local: Option<LocalId>,
}

/// One partition of the graph.
#[derive(Debug)]
pub struct Fragment<E> {
    pub(crate) fid: PartitionId,
    pub(crate) gids: Vec<VertexId>,
    pub(crate) inner_num: usize,
    pub(crate) index_of: HashMap<VertexId, LocalId>,
    /// `outer_offsets[p]..outer_offsets[p + 1]` are the outer vertices owned by `p`.
    pub(crate) outer_offsets: Vec<usize>,
    pub(crate) out_csr: Csr<E>,
    pub(crate) in_csr: Csr<E>,
    pub(crate) out_degree: Vec<u32>,
    pub(crate) in_degree: Vec<u32>,
    pub(crate) overlap: Overlap,
    pub(crate) partition_map: Arc<PartitionMap>,
    pub(crate) max_degree: OnceCell<Option<(u64, VertexId)>>,
}

impl<E> Fragment<E> {
    #[inline]
    pub fn fid(&self) -> PartitionId {
        self.fid
    }

    /// Number of partitions in the whole graph.
    #[inline]
    pub fn fnum(&self) -> usize {
        self.partition_map.n_parts()
    }

    /// Vertex count of the whole graph.
    #[inline]
    pub fn total_vertices(&self) -> usize {
        self.partition_map.len()
    }

    #[inline]
    pub fn inner_vertices_num(&self) -> usize {
        self.inner_num
    }

    #[inline]
    pub fn outer_vertices_num(&self) -> usize {
        self.gids.len() - self.inner_num
    }

    /// Inner plus outer.
    #[inline]
    pub fn vertices_num(&self) -> usize {
        self.gids.len()
    }

    pub fn inner_vertices(&self) -> LocalRange {
        LocalRange::new(0, self.inner_num)
    }

    pub fn outer_vertices(&self) -> LocalRange {
        LocalRange::new(self.inner_num, self.gids.len())
    }

    pub fn vertices(&self) -> LocalRange {
        LocalRange::new(0, self.gids.len())
    }

    /// Outer vertices owned by `peer`, ascending global id.
    pub fn outer_vertices_of(&self, peer: PartitionId) -> LocalRange {
        if peer + 1 >= self.outer_offsets.len() {
            return LocalRange::new(self.inner_num, self.inner_num);
        }
        LocalRange::new(self.outer_offsets[peer], self.outer_offsets[peer + 1])
    }

    /// Inner vertices mirrored on `peer`, ascending global id.
    pub fn mirror_vertices_of(&self, peer: PartitionId) -> &[LocalId] {
        if peer >= self.overlap.n_parts() {
            return &[];
        }
        self.overlap.mirrors_to(peer)
    }

    #[inline]
    pub fn overlap(&self) -> &Overlap {
        &self.overlap
    }

    #[inline]
    pub fn partition_map(&self) -> &PartitionMap {
        &self.partition_map
    }

    #[inline]
    pub fn gid(&self, v: LocalId) -> VertexId {
        self.gids[v.index()]
    }

    /// Local id of `gid` if it is inner or outer here.
    #[inline]
    pub fn local(&self, gid: VertexId) -> Option<LocalId> {
        self.index_of.get(&gid).copied()
    }

    /// Local id of `gid` if this fragment owns it.
    #[inline]
    pub fn inner_local(&self, gid: VertexId) -> Option<LocalId> {
        self.local(gid).filter(|&v| self.is_inner(v))
    }

    #[inline]
    pub fn is_inner(&self, v: LocalId) -> bool {
        v.index() < self.inner_num
    }

    #[inline]
    pub fn is_outer(&self, v: LocalId) -> bool {
        let i = v.index();
        i >= self.inner_num && i < self.gids.len()
    }

    /// Authoritative partition of a local vertex.
    pub fn owner_of(&self, v: LocalId) -> PartitionId {
        if self.is_inner(v) {
            return self.fid;
        }
        // outer groups are contiguous per owner
        self.outer_offsets
            .partition_point(|&start| start <= v.index())
            .saturating_sub(1)
    }

    /// Owner and, when present here, local id of a global vertex.
    pub fn resolve(&self, gid: VertexId) -> Result<Resolved, EngineError> {
        let owner = self.partition_map.owner(gid)?;
        Ok(Resolved {
            owner,
            local: self.local(gid),
        })
    }

    /// Local inner id for a message addressed to `gid`, or the reason it
    /// cannot be delivered here.
    pub fn resolve_inner(&self, gid: VertexId) -> Result<LocalId, EngineError> {
        match self.inner_local(gid) {
            Some(v) => Ok(v),
            None => {
                let owner = self.partition_map.owner(gid)?;
                Err(EngineError::PartitionMismatch {
                    vertex: gid,
                    expected: owner,
                    found: self.fid,
                })
            }
        }
    }

    /// Outgoing edges of an inner vertex. Outer vertices have none here.
    #[inline]
    pub fn out_edges(&self, v: LocalId) -> AdjList<'_, E> {
        self.out_csr.row(v.index())
    }

    /// Incoming edges of an inner vertex.
    #[inline]
    pub fn in_edges(&self, v: LocalId) -> AdjList<'_, E> {
        self.in_csr.row(v.index())
    }

    /// Out-degree in the whole graph, valid for inner and outer vertices.
    #[inline]
    pub fn out_degree(&self, v: LocalId) -> usize {
        self.out_degree[v.index()] as usize
    }

    /// In-degree in the whole graph, valid for inner and outer vertices.
    #[inline]
    pub fn in_degree(&self, v: LocalId) -> usize {
        self.in_degree[v.index()] as usize
    }

    #[inline]
    pub fn degree(&self, v: LocalId) -> usize {
        self.out_degree(v) + self.in_degree(v)
    }

    /// Number of outgoing edges stored on this fragment.
    pub fn edge_num(&self) -> usize {
        self.out_csr.len()
    }

    /// `(degree, gid)` of the inner vertex with the largest in+out degree,
    /// ties broken towards the smaller id. Computed on first use.
    pub fn max_degree_inner(&self) -> Option<(u64, VertexId)> {
        *self.max_degree.get_or_init(|| {
            self.inner_vertices()
                .map(|v| (self.degree(v) as u64, self.gid(v)))
                .max_by(|a, b| a.0.cmp(&b.0).then(b.1.cmp(&a.1)))
        })
    }
}

impl<E> DebugInvariants for Fragment<E> {
    fn debug_assert_invariants(&self) {
        crate::debug_invariants!(self.validate_invariants(), "fragment");
    }

    fn validate_invariants(&self) -> Result<(), EngineError> {
        let n = self.gids.len();
        ensure(self.inner_num <= n, || {
            EngineError::Configuration(format!(
                "fragment {}: inner count exceeds vertices",
                self.fid
            ))
        })?;
        ensure(self.out_degree.len() == n && self.in_degree.len() == n, || {
            EngineError::Configuration(format!("fragment {}: degree arrays out of sync", self.fid))
        })?;
        for (i, &g) in self.gids.iter().enumerate() {
            let v = LocalId::from_index(i);
            ensure(self.index_of.get(&g) == Some(&v), || {
                EngineError::Configuration(format!("fragment {}: index of {g} is stale", self.fid))
            })?;
            let expected = self.partition_map.owner(g)?;
            let found = self.owner_of(v);
            ensure(expected == found, || EngineError::PartitionMismatch {
                vertex: g,
                expected,
                found,
            })?;
            if i >= self.inner_num {
                ensure(found != self.fid, || EngineError::PartitionMismatch {
                    vertex: g,
                    expected,
                    found: self.fid,
                })?;
            }
        }
        for w in self.gids[..self.inner_num].windows(2) {
            ensure(w[0] < w[1], || {
                EngineError::Configuration(format!("fragment {}: inner ids not sorted", self.fid))
            })?;
        }
        for csr in [&self.out_csr, &self.in_csr] {
            ensure(csr.rows() == self.inner_num, || {
                EngineError::Configuration(format!("fragment {}: CSR row count", self.fid))
            })?;
            ensure(csr.offsets.windows(2).all(|w| w[0] <= w[1]), || {
                EngineError::Configuration(format!("fragment {}: CSR offsets decrease", self.fid))
            })?;
            ensure(csr.nbrs.iter().all(|u| u.index() < n), || {
                EngineError::Configuration(format!("fragment {}: dangling CSR neighbour", self.fid))
            })?;
        }
        Ok(())
    }
}

/// Cross-check that mirror lists on every owner line up with the outer
/// lists of every peer.
pub fn validate_overlap<E>(frags: &[Fragment<E>]) -> Result<(), EngineError> {
    for f in frags {
        for p in f.overlap.neighbours() {
            let Some(peer) = frags.get(p) else {
                return Err(EngineError::Configuration(format!(
                    "fragment {} links to missing partition {p}",
                    f.fid
                )));
            };
            let mine: Vec<VertexId> = f.mirror_vertices_of(p).iter().map(|&v| f.gid(v)).collect();
            let theirs: Vec<VertexId> =
                peer.outer_vertices_of(f.fid).map(|v| peer.gid(v)).collect();
            if mine != theirs {
                let vertex = mine
                    .iter()
                    .zip(&theirs)
                    .find(|(a, b)| a != b)
                    .map(|(a, _)| *a)
                    .or_else(|| mine.get(theirs.len()).or(theirs.get(mine.len())).copied())
                    .unwrap_or_default();
                return Err(EngineError::PartitionMismatch {
                    vertex,
                    expected: f.fid,
                    found: p,
                });
            }
        }
    }
    Ok(())
}
