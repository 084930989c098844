//! Overlap module: which vertices a fragment shares with its peers and how
//! values arriving from peers are fused.
//!
//! This module re-exports the [`overlap`] and [`delta`] submodules.

pub mod delta;
#[allow(clippy::module_inception)]
pub mod overlap;

pub use delta::{AddDelta, Combiner, CopyDelta, Delta, MaxDelta, MinDelta, combiner_of};
pub use overlap::{Overlap, PeerLinks};
