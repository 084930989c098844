//! Round scheduler.
//!
//! Every partition walks the same state machine:
//!
//! ```text
//! Init -> PEval -> (Barrier -> IncEval)* -> Terminated
//! ```
//!
//! After each barrier the partitions vote: the run continues while some
//! partition has active inner vertices, sent updates during the round or
//! called `force_continue`, and the optional round bound is not reached.
//! `finalize` runs once on the way out, however the loop ended.

pub mod config;
pub mod gas;
pub mod program;
pub mod report;
pub mod runner;
mod worker;

pub use config::EngineConfig;
pub use gas::{EdgeDir, EdgeView, GasDriver, GasProgram, GasSignals, VertexView};
pub use program::{IncrementalProgram, ProgramRound, Round};
pub use report::{RunOutcome, RunReport, Termination};
pub use runner::Engine;
