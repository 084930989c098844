//! Partitioned graph topology.
//!
//! An [`EdgeList`] is the whole graph as loaded; [`FragmentBuilder`] cuts it
//! into one [`Fragment`] per partition. A fragment numbers its vertices
//! locally: the inner vertices it owns come first, then the outer vertices
//! (endpoints of cut edges owned elsewhere), grouped by owner.

pub mod builder;
pub mod edge_list;
pub mod fragment;
pub mod vertex;

pub use builder::FragmentBuilder;
pub use edge_list::{EdgeList, EdgeWeight};
pub use fragment::{AdjList, Fragment, Nbr, Resolved, validate_overlap};
pub use vertex::{LocalId, LocalRange, PartitionId, VertexId};
