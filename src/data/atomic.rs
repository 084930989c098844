//! Lock-free per-vertex scalars.
//!
//! [`AtomicScalar`] maps a plain scalar onto an atomic cell. Integer types use
//! the native atomic min/add; floats are stored as their bit pattern and
//! updated with a compare-exchange loop, so concurrent `fetch_min` calls never
//! lose an update.

use super::vertex_array::VertexArray;
use crate::topology::vertex::LocalId;
use bytemuck::Pod;
use std::sync::atomic::{AtomicI32, AtomicI64, AtomicU32, AtomicU64, Ordering};

/// Scalar with an atomic cell representation.
pub trait AtomicScalar: Pod + PartialOrd + Send + Sync + 'static {
    type Cell: Send + Sync;

    fn new_cell(v: Self) -> Self::Cell;
    fn load(cell: &Self::Cell) -> Self;
    fn store(cell: &Self::Cell, v: Self);
    /// Lower the cell to `v` if `v` is smaller; `true` when it was lowered.
    fn fetch_min(cell: &Self::Cell, v: Self) -> bool;
    /// Add `v`, returning the previous value.
    fn fetch_add(cell: &Self::Cell, v: Self) -> Self;
    /// Replace the value with `f(current)` until no other writer interferes;
    /// `f` returning `None` keeps it. `true` when a new value was stored.
    fn fetch_update<F>(cell: &Self::Cell, f: F) -> bool
    where
        F: FnMut(Self) -> Option<Self>;
}

macro_rules! impl_atomic_int {
    ($t:ty, $cell:ty) => {
        impl AtomicScalar for $t {
            type Cell = $cell;

            #[inline]
            fn new_cell(v: Self) -> $cell {
                <$cell>::new(v)
            }
            #[inline]
            fn load(cell: &$cell) -> Self {
                cell.load(Ordering::Acquire)
            }
            #[inline]
            fn store(cell: &$cell, v: Self) {
                cell.store(v, Ordering::Release)
            }
            #[inline]
            fn fetch_min(cell: &$cell, v: Self) -> bool {
                cell.fetch_min(v, Ordering::AcqRel) > v
            }
            #[inline]
            fn fetch_add(cell: &$cell, v: Self) -> Self {
                cell.fetch_add(v, Ordering::AcqRel)
            }
            #[inline]
            fn fetch_update<F>(cell: &$cell, f: F) -> bool
            where
                F: FnMut(Self) -> Option<Self>,
            {
                cell.fetch_update(Ordering::AcqRel, Ordering::Acquire, f).is_ok()
            }
        }
    };
}

impl_atomic_int!(u32, AtomicU32);
impl_atomic_int!(u64, AtomicU64);
impl_atomic_int!(i32, AtomicI32);
impl_atomic_int!(i64, AtomicI64);

macro_rules! impl_atomic_float {
    ($t:ty, $cell:ty) => {
        impl AtomicScalar for $t {
            type Cell = $cell;

            #[inline]
            fn new_cell(v: Self) -> $cell {
                <$cell>::new(v.to_bits())
            }
            #[inline]
            fn load(cell: &$cell) -> Self {
                <$t>::from_bits(cell.load(Ordering::Acquire))
            }
            #[inline]
            fn store(cell: &$cell, v: Self) {
                cell.store(v.to_bits(), Ordering::Release)
            }
            fn fetch_min(cell: &$cell, v: Self) -> bool {
                let mut cur = cell.load(Ordering::Relaxed);
                loop {
                    // NaN never wins
                    if !(v < <$t>::from_bits(cur)) {
                        return false;
                    }
                    match cell.compare_exchange_weak(
                        cur,
                        v.to_bits(),
                        Ordering::AcqRel,
                        Ordering::Relaxed,
                    ) {
                        Ok(_) => return true,
                        Err(actual) => cur = actual,
                    }
                }
            }
            fn fetch_add(cell: &$cell, v: Self) -> Self {
                let mut cur = cell.load(Ordering::Relaxed);
                loop {
                    let old = <$t>::from_bits(cur);
                    match cell.compare_exchange_weak(
                        cur,
                        (old + v).to_bits(),
                        Ordering::AcqRel,
                        Ordering::Relaxed,
                    ) {
                        Ok(_) => return old,
                        Err(actual) => cur = actual,
                    }
                }
            }
            fn fetch_update<F>(cell: &$cell, mut f: F) -> bool
            where
                F: FnMut(Self) -> Option<Self>,
            {
                cell.fetch_update(Ordering::AcqRel, Ordering::Acquire, |bits| {
                    f(<$t>::from_bits(bits)).map(<$t>::to_bits)
                })
                .is_ok()
            }
        }
    };
}

impl_atomic_float!(f32, AtomicU32);
impl_atomic_float!(f64, AtomicU64);

/// One atomic cell per local vertex; writable through `&self`.
pub struct AtomicArray<T: AtomicScalar> {
    cells: Vec<T::Cell>,
}

impl<T: AtomicScalar> AtomicArray<T> {
    pub fn new(len: usize, init: T) -> Self {
        Self {
            cells: (0..len).map(|_| T::new_cell(init)).collect(),
        }
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.cells.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }

    #[inline]
    pub fn get(&self, v: LocalId) -> T {
        T::load(&self.cells[v.index()])
    }

    #[inline]
    pub fn set(&self, v: LocalId, value: T) {
        T::store(&self.cells[v.index()], value)
    }

    /// `true` when `value` lowered the stored value.
    #[inline]
    pub fn fetch_min(&self, v: LocalId, value: T) -> bool {
        T::fetch_min(&self.cells[v.index()], value)
    }

    #[inline]
    pub fn fetch_add(&self, v: LocalId, value: T) -> T {
        T::fetch_add(&self.cells[v.index()], value)
    }

    /// Compare-exchange loop over `f`; see [`AtomicScalar::fetch_update`].
    #[inline]
    pub fn update<F>(&self, v: LocalId, f: F) -> bool
    where
        F: FnMut(T) -> Option<T>,
    {
        T::fetch_update(&self.cells[v.index()], f)
    }

    /// Plain copy of every slot.
    pub fn snapshot(&self) -> VertexArray<T> {
        VertexArray::from_vec(self.cells.iter().map(T::load).collect())
    }
}

impl<T: AtomicScalar + std::fmt::Debug> std::fmt::Debug for AtomicArray<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_list()
            .entries(self.cells.iter().map(T::load))
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rayon::prelude::*;

    #[test]
    fn float_min_only_lowers() {
        let a = AtomicArray::new(1, f64::INFINITY);
        let v = LocalId::new(0);
        assert!(a.fetch_min(v, 3.0));
        assert!(!a.fetch_min(v, 4.0));
        assert!(!a.fetch_min(v, 3.0));
        assert!(!a.fetch_min(v, f64::NAN));
        assert_eq!(a.get(v), 3.0);
    }

    #[test]
    fn parallel_float_add_loses_nothing() {
        let a = AtomicArray::new(1, 0.0_f64);
        (0..10_000).into_par_iter().for_each(|_| {
            a.fetch_add(LocalId::new(0), 1.0);
        });
        assert_eq!(a.get(LocalId::new(0)), 10_000.0);
    }

    #[test]
    fn concurrent_updates_serialise() {
        let a = AtomicArray::new(1, 0.0_f64);
        (0..1_000).into_par_iter().for_each(|i| {
            a.update(LocalId::new(0), |x| (i as f64 > x).then_some(i as f64));
        });
        assert_eq!(a.get(LocalId::new(0)), 999.0);
        assert!(!a.update(LocalId::new(0), |_| None));
    }

    #[test]
    fn signed_cells() {
        let a = AtomicArray::new(2, 0_i64);
        assert!(a.fetch_min(LocalId::new(0), -4));
        assert_eq!(a.fetch_add(LocalId::new(1), -2), 0);
        assert!(a.update(LocalId::new(1), |x| Some(x * 3)));
        assert_eq!(a.snapshot().as_slice(), &[-4, -6]);
    }

    #[test]
    fn int_min_reports_improvement() {
        let a = AtomicArray::new(2, u32::MAX);
        assert!(a.fetch_min(LocalId::new(1), 5));
        assert!(!a.fetch_min(LocalId::new(1), 5));
        assert_eq!(a.snapshot().as_slice(), &[u32::MAX, 5]);
    }
}
