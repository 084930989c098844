//! `VertexArray<T>`: per-vertex storage indexed by [`LocalId`].

use crate::topology::vertex::{LocalId, LocalRange};
use rayon::prelude::*;
use std::ops::{Index, IndexMut};

/// Dense array with one slot per local vertex (inner and outer).
#[derive(Clone, Debug, PartialEq)]
pub struct VertexArray<T> {
    data: Vec<T>,
}

impl<T: Clone> VertexArray<T> {
    pub fn new(len: usize, init: T) -> Self {
        Self {
            data: vec![init; len],
        }
    }

    /// Overwrite every slot with `value`.
    pub fn fill(&mut self, value: T) {
        self.data.fill(value);
    }

    /// Overwrite the slots of `range` with `value`.
    pub fn fill_range(&mut self, range: LocalRange, value: T) {
        self.data[range.as_range()].fill(value);
    }
}

impl<T> VertexArray<T> {
    pub fn from_vec(data: Vec<T>) -> Self {
        Self { data }
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.data.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    #[inline]
    pub fn as_slice(&self) -> &[T] {
        &self.data
    }

    #[inline]
    pub fn as_mut_slice(&mut self) -> &mut [T] {
        &mut self.data
    }

    #[inline]
    pub fn get(&self, v: LocalId) -> Option<&T> {
        self.data.get(v.index())
    }

    /// Slots of `range`, e.g. the inner vertices.
    pub fn slice(&self, range: LocalRange) -> &[T] {
        &self.data[range.as_range()]
    }

    pub fn slice_mut(&mut self, range: LocalRange) -> &mut [T] {
        &mut self.data[range.as_range()]
    }

    pub fn iter(&self) -> impl Iterator<Item = (LocalId, &T)> {
        self.data
            .iter()
            .enumerate()
            .map(|(i, x)| (LocalId::from_index(i), x))
    }

    pub fn into_vec(self) -> Vec<T> {
        self.data
    }
}

impl<T: Send + Sync> VertexArray<T> {
    /// Parallel mutable walk over `range`, one task per slot.
    pub fn par_for_each_mut<F>(&mut self, range: LocalRange, f: F)
    where
        F: Fn(LocalId, &mut T) + Sync + Send,
    {
        let base = range.as_range().start;
        self.data[range.as_range()]
            .par_iter_mut()
            .enumerate()
            .for_each(|(i, x)| f(LocalId::from_index(base + i), x));
    }
}

impl<T> Index<LocalId> for VertexArray<T> {
    type Output = T;
    #[inline]
    fn index(&self, v: LocalId) -> &T {
        &self.data[v.index()]
    }
}

impl<T> IndexMut<LocalId> for VertexArray<T> {
    #[inline]
    fn index_mut(&mut self, v: LocalId) -> &mut T {
        &mut self.data[v.index()]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn index_and_fill_range() {
        let mut a = VertexArray::new(5, 0u32);
        a[LocalId::new(1)] = 7;
        a.fill_range(LocalRange::new(3, 5), 9);
        assert_eq!(a.as_slice(), &[0, 7, 0, 9, 9]);
        assert_eq!(a.slice(LocalRange::new(1, 3)), &[7, 0]);
        assert_eq!(a.get(LocalId::new(9)), None);
    }

    #[test]
    fn parallel_writes_hit_their_own_slot() {
        let mut a = VertexArray::new(100, 0usize);
        a.par_for_each_mut(LocalRange::new(10, 100), |v, x| *x = v.index());
        assert!(a.iter().skip(10).all(|(v, &x)| x == v.index()));
        assert!(a.as_slice()[..10].iter().all(|&x| x == 0));
    }
}
