//! Active-set tracking.
//!
//! An [`ActiveSet`] is an atomic bitset plus per-thread lists of the ids that
//! were inserted while the set was sparse. The lists make `clear` and
//! iteration proportional to the number of active vertices; once the set is
//! dense (bulk activation or many inserts) both fall back to word scans.
//!
//! A [`Frontier`] holds the `current` set read during a round and the `next`
//! set written during it. [`Frontier::swap`] promotes `next` and clears the
//! new `next`. The operators in [`ops`] build whole sets at a time.

pub mod bitset;
pub mod ops;

pub use bitset::AtomicBitset;
pub use ops::{EdgeMap, edge_map, vertex_map};

use crate::topology::vertex::{LocalId, LocalRange};
use parking_lot::Mutex;
use rayon::prelude::*;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

/// Above `capacity / DENSE_DIVISOR` members the set is treated as dense.
const DENSE_DIVISOR: usize = 16;

pub struct ActiveSet {
    bits: AtomicBitset,
    shards: Vec<Mutex<Vec<LocalId>>>,
    count: AtomicUsize,
    /// Set by bulk activation; shards then no longer list every member.
    bulk: AtomicBool,
}

impl ActiveSet {
    pub fn new(capacity: usize) -> Self {
        let n_shards = rayon::current_num_threads() + 1;
        Self {
            bits: AtomicBitset::with_size(capacity),
            shards: (0..n_shards).map(|_| Mutex::new(Vec::new())).collect(),
            count: AtomicUsize::new(0),
            bulk: AtomicBool::new(false),
        }
    }

    #[inline]
    pub fn capacity(&self) -> usize {
        self.bits.capacity()
    }

    /// Idempotent and thread safe; `true` if `v` was not yet active.
    pub fn insert(&self, v: LocalId) -> bool {
        if !self.bits.set(v.index()) {
            return false;
        }
        self.count.fetch_add(1, Ordering::AcqRel);
        if !self.bulk.load(Ordering::Acquire) {
            let shard = rayon::current_thread_index().map_or(0, |t| t + 1) % self.shards.len();
            self.shards[shard].lock().push(v);
        }
        true
    }

    /// Activate every vertex of `range`.
    pub fn insert_range(&self, range: LocalRange) {
        self.bulk.store(true, Ordering::Release);
        let added = self.bits.set_range(range.as_range());
        self.count.fetch_add(added, Ordering::AcqRel);
    }

    #[inline]
    pub fn contains(&self, v: LocalId) -> bool {
        v.index() < self.capacity() && self.bits.get(v.index())
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.count.load(Ordering::Acquire)
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn is_dense(&self) -> bool {
        self.bulk.load(Ordering::Acquire) || self.len() * DENSE_DIVISOR > self.capacity()
    }

    /// `true` if no vertex of `range` is active.
    pub fn is_empty_over(&self, range: LocalRange) -> bool {
        if self.is_empty() {
            return true;
        }
        if self.is_dense() {
            return self.bits.none_in(range.as_range());
        }
        self.shards
            .iter()
            .all(|s| s.lock().iter().all(|&v| !range.contains(v)))
    }

    /// Active vertices of `range`, ascending.
    pub fn members_in(&self, range: LocalRange) -> Vec<LocalId> {
        if self.is_empty() {
            return Vec::new();
        }
        if self.is_dense() {
            return self
                .bits
                .ones_in(range.as_range())
                .into_iter()
                .map(LocalId::from_index)
                .collect();
        }
        let mut out: Vec<LocalId> = self
            .shards
            .iter()
            .flat_map(|s| {
                s.lock()
                    .iter()
                    .copied()
                    .filter(|&v| range.contains(v))
                    .collect::<Vec<_>>()
            })
            .collect();
        out.sort_unstable();
        out
    }

    /// Run `f` on every active vertex of `range` in parallel.
    pub fn par_for_each_in<F>(&self, range: LocalRange, f: F)
    where
        F: Fn(LocalId) + Sync + Send,
    {
        self.members_in(range).into_par_iter().for_each(f);
    }

    /// Reset to empty; O(active) while sparse.
    pub fn clear(&mut self) {
        if self.is_dense() {
            self.bits.clear_all();
            for s in &mut self.shards {
                s.get_mut().clear();
            }
        } else {
            for s in &mut self.shards {
                for v in s.get_mut().drain(..) {
                    self.bits.clear_bit(v.index());
                }
            }
        }
        *self.count.get_mut() = 0;
        *self.bulk.get_mut() = false;
    }
}

impl std::fmt::Debug for ActiveSet {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ActiveSet")
            .field("capacity", &self.capacity())
            .field("len", &self.len())
            .finish()
    }
}

/// Current and next active sets of one partition.
#[derive(Debug)]
pub struct Frontier {
    current: ActiveSet,
    next: ActiveSet,
}

impl Frontier {
    pub fn new(capacity: usize) -> Self {
        Self {
            current: ActiveSet::new(capacity),
            next: ActiveSet::new(capacity),
        }
    }

    #[inline]
    pub fn current(&self) -> &ActiveSet {
        &self.current
    }

    #[inline]
    pub fn next(&self) -> &ActiveSet {
        &self.next
    }

    /// Promote `next` to `current` and clear the new `next`.
    pub fn swap(&mut self) {
        std::mem::swap(&mut self.current, &mut self.next);
        self.next.clear();
    }
}
