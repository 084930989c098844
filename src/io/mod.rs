//! Graph input and result output.
//!
//! Readers implement [`EdgeListReader`] and produce an
//! [`EdgeList`](crate::topology::EdgeList) with `f64` weights; results are
//! written as `"<id> <value>"` lines by [`write_results`].

pub mod loader;
pub mod output;

pub use loader::{
    AdjReader, EdgeListReader, TsvReader, load_format, read_edge_list, synthetic_powerlaw,
};
pub use output::{OutputValue, for_each_inner_vertex, write_partition, write_results};
