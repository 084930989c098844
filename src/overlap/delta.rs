//! Delta trait: rules for fusing vertex values arriving from other partitions.
//!
//! Every fusion reports whether the local value changed, so callers can
//! activate a vertex only when a message actually improved it. `MinDelta`,
//! `MaxDelta` and `CopyDelta` are idempotent: fusing the same part twice
//! leaves the value as after the first fusion.

use num_traits::Zero;

/// How an incoming value merges into the local one.
pub trait Delta<V>: Sized {
    /// `true` if `local` changed.
    fn fuse(local: &mut V, incoming: V) -> bool;
}

/// Pre-send combiner over messages with the same destination.
pub type Combiner<M> = fn(&mut M, M) -> bool;

/// Copy-overwrites-local.
#[derive(Copy, Clone, Debug, Default)]
pub struct CopyDelta;

impl<V: Clone + PartialEq + Send> Delta<V> for CopyDelta {
    #[inline]
    fn fuse(local: &mut V, incoming: V) -> bool {
        if *local == incoming {
            false
        } else {
            *local = incoming;
            true
        }
    }
}

/// Additive delta for accumulated quantities (rank mass, gather caches).
#[derive(Copy, Clone, Debug, Default)]
pub struct AddDelta;

impl<V> Delta<V> for AddDelta
where
    V: std::ops::AddAssign + Zero + Copy + Send,
{
    #[inline]
    fn fuse(local: &mut V, incoming: V) -> bool {
        if incoming.is_zero() {
            return false;
        }
        *local += incoming;
        true
    }
}

/// Keep the smaller value (shortest paths, labels).
#[derive(Copy, Clone, Debug, Default)]
pub struct MinDelta;

impl<V: PartialOrd + Copy + Send> Delta<V> for MinDelta {
    #[inline]
    fn fuse(local: &mut V, incoming: V) -> bool {
        if incoming < *local {
            *local = incoming;
            true
        } else {
            false
        }
    }
}

/// Keep the larger value.
#[derive(Copy, Clone, Debug, Default)]
pub struct MaxDelta;

impl<V: PartialOrd + Copy + Send> Delta<V> for MaxDelta {
    #[inline]
    fn fuse(local: &mut V, incoming: V) -> bool {
        if incoming > *local {
            *local = incoming;
            true
        } else {
            false
        }
    }
}

/// Combiner built from a delta.
pub fn combiner_of<D, M>() -> Combiner<M>
where
    D: Delta<M>,
{
    <D as Delta<M>>::fuse
}
