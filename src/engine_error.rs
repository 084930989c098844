//! EngineError: unified error type for fragment-engine public APIs
//!
//! Every fallible operation in the crate returns `Result<_, EngineError>`.
//! Fatal kinds (`UnknownVertex`, `PartitionMismatch`, `CommError`) abort the
//! run; `NonConvergence` is never returned as an `Err` and only travels inside
//! a [`RunReport`](crate::engine::report::RunReport).

use crate::topology::vertex::VertexId;
use thiserror::Error;

/// Unified error type for engine operations.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum EngineError {
    /// A global vertex id is not owned by any partition.
    #[error("unknown vertex {0}: no partition owns it")]
    UnknownVertex(VertexId),
    /// A vertex showed up on a partition that disagrees with the load-time assignment.
    #[error("partition mismatch for vertex {vertex}: owned by {expected}, seen on {found}")]
    PartitionMismatch {
        vertex: VertexId,
        expected: usize,
        found: usize,
    },
    /// Invalid run or program configuration, rejected before any round starts.
    #[error("configuration error: {0}")]
    Configuration(String),
    /// The round bound was reached while work remained. Reported, not raised.
    #[error("no convergence within {bound} incremental rounds")]
    NonConvergence { bound: usize },
    /// Communication with a neighbour failed or produced a malformed frame.
    #[error("communication error with rank {neighbor}: {reason}")]
    CommError { neighbor: usize, reason: String },
    /// Reading an input file failed.
    #[error("I/O error on `{path}`: {reason}")]
    Io { path: String, reason: String },
    /// An input line could not be parsed.
    #[error("parse error at line {line}: {reason}")]
    Parse { line: usize, reason: String },
}

impl EngineError {
    /// `true` for errors that only echo a failure elsewhere (a peer aborted).
    pub fn is_secondary(&self) -> bool {
        matches!(self, EngineError::CommError { .. })
    }
}
