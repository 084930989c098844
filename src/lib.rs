#![cfg_attr(docsrs, feature(doc_cfg))]
//! # fragment-engine
//!
//! fragment-engine is a partitioned, vertex-centric graph processing core. A
//! graph is cut into fragments, one per worker; vertex programs run in rounds
//! over the active vertices of each fragment, and updates for vertices owned
//! elsewhere travel between rounds until every fragment is quiescent or a
//! round bound is hit.
//!
//! ## Features
//! - Fragments with inner/outer vertices, in- and out-edge CSR and global degrees
//! - Double-buffered or atomic per-vertex values
//! - Active-set tracking with per-thread shards
//! - Batch-shuffle and channel delivery, with per-destination combiners
//! - Incremental programs (`init`, `peval`, `inc_eval`) and gather-apply-scatter
//!   programs on the same round loop
//! - Pluggable communication backends (serial, in-process, MPI)
//! - Reference PageRank and SSSP in both program shapes
//!
//! ## Determinism
//!
//! Partitioners and the synthetic graph generator draw from seeds in their
//! configuration. Collective reductions fold contributions in rank order, so
//! every partition sees bit-identical results.
//!
//! ## Usage
//!
//! ```no_run
//! use fragment_engine::prelude::*;
//! use fragment_engine::apps::{Sssp, SsspConfig};
//!
//! # fn main() -> Result<(), EngineError> {
//! let graph = fragment_engine::io::load_format("graph.tsv", "tsv")?;
//! let fragments = FragmentBuilder::new(&graph, 4).build()?;
//! let engine = Engine::new(EngineConfig::default())?;
//! let out = engine.run(&fragments, &Sssp::new(SsspConfig::from_source(0)))?;
//! fragment_engine::io::write_results(std::io::stdout().lock(), &out.values)?;
//! # Ok(())
//! # }
//! ```
//!
//! Optional features: `mpi-support` (MPI communicator), `check-invariants`
//! (structural checks in release builds).

pub mod algs;
pub mod apps;
pub mod data;
pub mod debug_invariants;
pub mod engine;
pub mod engine_error;
pub mod frontier;
pub mod io;
pub mod message;
pub mod overlap;
pub mod partitioning;
pub mod topology;

pub use debug_invariants::DebugInvariants;

/// A convenient prelude to import the most-used traits & types:
pub mod prelude {
    pub use crate::algs::communicator::{Communicator, NoComm, RayonComm};
    #[cfg(feature = "mpi-support")]
    pub use crate::algs::communicator::MpiComm;
    pub use crate::data::{AtomicArray, AtomicScalar, Buffering, DoubleBuffer, VertexDataStore};
    pub use crate::debug_invariants::DebugInvariants;
    pub use crate::engine::{
        EdgeDir, EdgeView, Engine, EngineConfig, GasDriver, GasProgram, GasSignals,
        IncrementalProgram, ProgramRound, Round, RunOutcome, RunReport, Termination, VertexView,
    };
    pub use crate::engine_error::EngineError;
    pub use crate::frontier::{ActiveSet, EdgeMap, Frontier, edge_map, vertex_map};
    pub use crate::message::{DeliveryMode, MessageManager};
    pub use crate::overlap::{AddDelta, Combiner, MinDelta, combiner_of};
    pub use crate::partitioning::{HashPartitioner, PartitionMap, Partitioner, RangePartitioner};
    pub use crate::topology::{EdgeList, EdgeWeight, Fragment, FragmentBuilder, LocalId, VertexId};
}
