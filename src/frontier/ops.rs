//! Set-at-a-time operators over active sets.
//!
//! [`vertex_map`] filters a set, optionally touching each kept vertex.
//! [`EdgeMap`] pushes values from the members of a set across their edges:
//! `check` screens an edge against the values seen when it is visited, and
//! `update` proposes the target's new value from the source value and the
//! target's current one. Proposals are applied with a compare-exchange loop,
//! so racing writers to one target are reduced rather than lost. Targets
//! whose value changed form the next set.

use super::ActiveSet;
use crate::data::{AtomicArray, AtomicScalar};
use crate::engine::EdgeDir;
use crate::topology::fragment::Fragment;
use crate::topology::vertex::{LocalId, LocalRange};
use rayon::prelude::*;

/// Members of `set` in `range` for which `f` holds.
pub fn vertex_map<F>(set: &ActiveSet, range: LocalRange, f: F) -> ActiveSet
where
    F: Fn(LocalId) -> bool + Sync + Send,
{
    let out = ActiveSet::new(set.capacity());
    set.par_for_each_in(range, |v| {
        if f(v) {
            out.insert(v);
        }
    });
    out
}

/// Edge traversal bound to one fragment and one value array.
#[derive(Debug)]
pub struct EdgeMap<'a, E, V: AtomicScalar> {
    frag: &'a Fragment<E>,
    values: &'a AtomicArray<V>,
    dir: EdgeDir,
}

impl<'a, E: Sync, V: AtomicScalar> EdgeMap<'a, E, V> {
    /// Traverses out-edges until told otherwise.
    pub fn new(frag: &'a Fragment<E>, values: &'a AtomicArray<V>) -> Self {
        Self {
            frag,
            values,
            dir: EdgeDir::Out,
        }
    }

    /// `In` walks in-edges backwards: the frontier vertex is still the source.
    pub fn dir(mut self, dir: EdgeDir) -> Self {
        self.dir = dir;
        self
    }

    /// Push across the edges of every member of `frontier` in `range`;
    /// changed targets join `out`.
    pub fn apply<C, U>(
        &self,
        frontier: &ActiveSet,
        range: LocalRange,
        check: C,
        update: U,
        out: &ActiveSet,
    ) where
        C: Fn(V, V, &E) -> bool + Sync + Send,
        U: Fn(V, V, &E) -> Option<V> + Sync + Send,
    {
        let push = |s: V, t: LocalId, data: &E| {
            if check(s, self.values.get(t), data)
                && self.values.update(t, |cur| update(s, cur, data))
            {
                out.insert(t);
            }
        };
        frontier.par_for_each_in(range, |u| {
            let s = self.values.get(u);
            if self.dir.includes_out() {
                for e in self.frag.out_edges(u) {
                    push(s, e.neighbor, e.data);
                }
            }
            if self.dir.includes_in() {
                for e in self.frag.in_edges(u) {
                    push(s, e.neighbor, e.data);
                }
            }
        });
    }
}

/// One out-edge step from the inner members of `frontier`, as a fresh set.
pub fn edge_map<E, V, C, U>(
    frag: &Fragment<E>,
    values: &AtomicArray<V>,
    frontier: &ActiveSet,
    check: C,
    update: U,
) -> ActiveSet
where
    E: Sync,
    V: AtomicScalar,
    C: Fn(V, V, &E) -> bool + Sync + Send,
    U: Fn(V, V, &E) -> Option<V> + Sync + Send,
{
    let out = ActiveSet::new(frag.vertices_num());
    EdgeMap::new(frag, values).apply(frontier, frag.inner_vertices(), check, update, &out);
    out
}
