//! Incremental (PIE) vertex programs.
//!
//! A program supplies three hooks the scheduler drives:
//! - `peval`: partial evaluation over the whole fragment, runs exactly once,
//! - `inc_eval`: incremental evaluation of the current frontier and of the
//!   updates received at the previous barrier, runs once per round,
//! - `finalize`: post-processing after the last round.
//!
//! Programs read and write vertex values through [`Round::values`], activate
//! vertices for the next round through [`Round::frontier`] and exchange
//! updates through [`Round::messages`].

use crate::algs::communicator::Communicator;
use crate::data::{AtomicScalar, Buffering, VertexDataStore};
use crate::engine::config::EngineConfig;
use crate::engine_error::EngineError;
use crate::frontier::Frontier;
use crate::message::{DeliveryMode, MessageManager};
use crate::overlap::Combiner;
use crate::topology::fragment::Fragment;
use bytemuck::Pod;

/// Everything a program may touch during one round.
pub struct Round<'a, C: Communicator, M: Pod + Send + Sync, V: AtomicScalar> {
    /// `0` for `init`/`peval`, then `1, 2, ...` for incremental rounds.
    pub step: usize,
    pub values: &'a mut VertexDataStore<V>,
    pub frontier: &'a Frontier,
    pub messages: &'a mut MessageManager<C, M, V>,
    pub config: &'a EngineConfig,
}

impl<'a, C, M, V> Round<'a, C, M, V>
where
    C: Communicator,
    M: Pod + Send + Sync,
    V: AtomicScalar,
{
    pub fn new(
        step: usize,
        values: &'a mut VertexDataStore<V>,
        frontier: &'a Frontier,
        messages: &'a mut MessageManager<C, M, V>,
        config: &'a EngineConfig,
    ) -> Self {
        Self {
            step,
            values,
            frontier,
            messages,
            config,
        }
    }
}

/// The round context of program `P` over communicator `C`.
pub type ProgramRound<'a, C, P> =
    Round<'a, C, <P as IncrementalProgram>::Message, <P as IncrementalProgram>::Value>;

pub trait IncrementalProgram: Sync + Sized {
    type Edge: Send + Sync;
    /// Per-vertex value held by the engine.
    type Value: AtomicScalar;
    /// Payload of updates sent to other vertices.
    type Message: Pod + Send + Sync;
    /// Per-partition program state for the whole run.
    type Context: Send;

    fn buffering(&self) -> Buffering;

    fn delivery_mode(&self) -> DeliveryMode {
        DeliveryMode::BatchShuffle
    }

    /// Value every local vertex starts with.
    fn initial_value(&self) -> Self::Value;

    /// Merge applied to updates with equal destinations before they travel.
    fn combiner(&self) -> Option<Combiner<Self::Message>> {
        None
    }

    /// Reject configurations the program cannot run under.
    fn validate(&self, _config: &EngineConfig) -> Result<(), EngineError> {
        Ok(())
    }

    fn init<C: Communicator>(
        &self,
        frag: &Fragment<Self::Edge>,
        round: &mut ProgramRound<'_, C, Self>,
    ) -> Result<Self::Context, EngineError>;

    fn peval<C: Communicator>(
        &self,
        frag: &Fragment<Self::Edge>,
        ctx: &mut Self::Context,
        round: &mut ProgramRound<'_, C, Self>,
    ) -> Result<(), EngineError>;

    fn inc_eval<C: Communicator>(
        &self,
        frag: &Fragment<Self::Edge>,
        ctx: &mut Self::Context,
        round: &mut ProgramRound<'_, C, Self>,
    ) -> Result<(), EngineError>;

    fn finalize<C: Communicator>(
        &self,
        _frag: &Fragment<Self::Edge>,
        _ctx: &mut Self::Context,
        _round: &mut ProgramRound<'_, C, Self>,
    ) -> Result<(), EngineError> {
        Ok(())
    }
}
