//! Reference vertex programs built on the public engine API.
//!
//! - [`pagerank`] and [`sssp`]: incremental programs (PEval/IncEval).
//! - [`pagerank_gas`] and [`sssp_gas`]: the same algorithms as
//!   gather-apply-scatter programs, run through [`GasDriver`](crate::engine::GasDriver).

pub mod pagerank;
pub mod pagerank_gas;
pub mod sssp;
pub mod sssp_gas;

pub use pagerank::{PageRank, PageRankConfig};
pub use pagerank_gas::{PageRankGas, PageRankGasConfig};
pub use sssp::{SourceSelection, Sssp, SsspConfig};
pub use sssp_gas::{SsspGas, SsspGasConfig};
