//! Vertex identifiers.
//!
//! Two id spaces coexist:
//! - [`VertexId`] is the global, externally visible id of a vertex. It is
//!   stable across the whole run and `0` is an ordinary id.
//! - [`LocalId`] is a dense index into one partition's arrays. Inner
//!   vertices come first (`0..n_inner`), outer vertices follow.
//!
//! Both are `repr(transparent)` so slices of them can be cast to their raw
//! integers with `bytemuck` when they go on the wire.

use bytemuck::{Pod, Zeroable};
use std::fmt;

/// Index of a partition (fragment) in `0..n_partitions`.
pub type PartitionId = usize;

/// Global vertex id.
#[derive(
    Copy,
    Clone,
    PartialEq,
    Eq,
    Hash,
    PartialOrd,
    Ord,
    Default,
    Pod,
    Zeroable,
    serde::Serialize,
    serde::Deserialize,
)]
#[repr(transparent)]
pub struct VertexId(u64);

impl VertexId {
    #[inline]
    pub const fn new(raw: u64) -> Self {
        VertexId(raw)
    }

    /// Returns the raw `u64`.
    #[inline]
    pub const fn get(self) -> u64 {
        self.0
    }
}

impl From<u64> for VertexId {
    #[inline]
    fn from(raw: u64) -> Self {
        VertexId(raw)
    }
}

impl fmt::Debug for VertexId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("VertexId").field(&self.0).finish()
    }
}

/// Prints only the raw integer, which is what result files contain.
impl fmt::Display for VertexId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Partition-local dense vertex index.
#[derive(Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Pod, Zeroable, Default)]
#[repr(transparent)]
pub struct LocalId(u32);

impl LocalId {
    #[inline]
    pub const fn new(raw: u32) -> Self {
        LocalId(raw)
    }

    /// Build from an array index.
    ///
    /// # Panics
    /// Panics if `i` does not fit in `u32`; fragments never hold that many vertices.
    #[inline]
    pub fn from_index(i: usize) -> Self {
        debug_assert!(i <= u32::MAX as usize, "local id overflow: {i}");
        LocalId(i as u32)
    }

    #[inline]
    pub const fn index(self) -> usize {
        self.0 as usize
    }

    #[inline]
    pub const fn get(self) -> u32 {
        self.0
    }
}

impl fmt::Debug for LocalId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "L{}", self.0)
    }
}

impl fmt::Display for LocalId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Iterator over a contiguous run of local ids.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct LocalRange {
    start: u32,
    end: u32,
}

impl LocalRange {
    pub fn new(start: usize, end: usize) -> Self {
        debug_assert!(start <= end);
        Self {
            start: start as u32,
            end: end as u32,
        }
    }

    #[inline]
    pub fn len(&self) -> usize {
        (self.end - self.start) as usize
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.start == self.end
    }

    #[inline]
    pub fn contains(&self, v: LocalId) -> bool {
        self.start <= v.0 && v.0 < self.end
    }

    /// Index range for slicing per-vertex arrays.
    #[inline]
    pub fn as_range(&self) -> std::ops::Range<usize> {
        self.start as usize..self.end as usize
    }
}

impl Iterator for LocalRange {
    type Item = LocalId;

    #[inline]
    fn next(&mut self) -> Option<LocalId> {
        if self.start < self.end {
            let v = LocalId(self.start);
            self.start += 1;
            Some(v)
        } else {
            None
        }
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let n = self.len();
        (n, Some(n))
    }
}

impl ExactSizeIterator for LocalRange {}

impl DoubleEndedIterator for LocalRange {
    fn next_back(&mut self) -> Option<LocalId> {
        if self.start < self.end {
            self.end -= 1;
            Some(LocalId(self.end))
        } else {
            None
        }
    }
}

static_assertions::assert_eq_size!(VertexId, u64);
static_assertions::assert_eq_size!(LocalId, u32);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn zero_is_a_valid_global_id() {
        let v = VertexId::new(0);
        assert_eq!(v.get(), 0);
        assert_eq!(format!("{v}"), "0");
        assert_eq!(format!("{v:?}"), "VertexId(0)");
    }

    #[test]
    fn local_range_is_restartable() {
        let r = LocalRange::new(2, 5);
        let a: Vec<_> = r.clone().map(LocalId::index).collect();
        let b: Vec<_> = r.clone().map(LocalId::index).collect();
        assert_eq!(a, vec![2, 3, 4]);
        assert_eq!(a, b);
        assert_eq!(r.len(), 3);
        assert!(r.contains(LocalId::new(4)));
        assert!(!r.contains(LocalId::new(5)));
        assert_eq!(r.rev().next(), Some(LocalId::new(4)));
    }

    #[test]
    fn ids_cast_to_raw_integers() {
        let ids = [VertexId::new(3), VertexId::new(9)];
        let raw: &[u64] = bytemuck::cast_slice(&ids);
        assert_eq!(raw, &[3, 9]);
    }
}
