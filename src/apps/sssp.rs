//! Single-source shortest paths by incremental relaxation.
//!
//! Distances live in an atomic array and only ever decrease. PEval relaxes
//! the out-edges of the sources; every IncEval round first folds in the
//! distances other partitions proposed for our inner vertices, then relaxes
//! the out-edges of every vertex whose distance dropped. Improved outer
//! vertices are forwarded to their owners with a min combiner.

use crate::algs::communicator::Communicator;
use crate::data::Buffering;
use crate::engine::{EngineConfig, IncrementalProgram, ProgramRound};
use crate::engine_error::EngineError;
use crate::frontier::{ActiveSet, EdgeMap};
use crate::message::{DeliveryMode, MessageManager};
use crate::overlap::{Combiner, MinDelta, combiner_of};
use crate::topology::edge_list::EdgeWeight;
use crate::topology::fragment::Fragment;
use crate::topology::vertex::{LocalId, VertexId};
use serde::{Deserialize, Serialize};
use std::marker::PhantomData;

/// Where the search starts: the listed ids, plus the vertex with the largest
/// in+out degree (smallest id on ties) when `max_degree` is set.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SourceSelection {
    pub ids: Vec<VertexId>,
    pub max_degree: bool,
}

impl SourceSelection {
    pub fn explicit(ids: impl IntoIterator<Item = VertexId>) -> Self {
        Self {
            ids: ids.into_iter().collect(),
            max_degree: false,
        }
    }

    pub fn max_degree() -> Self {
        Self {
            ids: Vec::new(),
            max_degree: true,
        }
    }

    pub fn with_max_degree(mut self) -> Self {
        self.max_degree = true;
        self
    }

    /// `true` when no source would be selected.
    pub fn is_empty(&self) -> bool {
        self.ids.is_empty() && !self.max_degree
    }

    /// Local ids of the selected sources this partition owns. Every
    /// partition must call this, as the max-degree pick is a collective.
    pub(crate) fn resolve<C, E, M, S>(
        &self,
        frag: &Fragment<E>,
        messages: &MessageManager<C, M, S>,
    ) -> Result<Vec<LocalId>, EngineError>
    where
        C: Communicator,
        M: bytemuck::Pod + Send + Sync,
        S: crate::data::AtomicScalar,
    {
        if self.is_empty() {
            return Err(EngineError::Configuration("sssp needs at least one source".into()));
        }
        let mut ids = self.ids.clone();
        if self.max_degree {
            ids.push(max_degree_source(frag, messages)?);
        }
        let mut local = Vec::new();
        for gid in ids {
            if frag.resolve(gid)?.owner == frag.fid() {
                local.push(frag.resolve_inner(gid)?);
            }
        }
        local.sort_unstable();
        local.dedup();
        Ok(local)
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SsspConfig {
    pub sources: SourceSelection,
}

impl SsspConfig {
    pub fn from_source(source: u64) -> Self {
        Self {
            sources: SourceSelection::explicit([VertexId::new(source)]),
        }
    }
}

impl Default for SsspConfig {
    fn default() -> Self {
        Self::from_source(0)
    }
}

#[derive(Clone, Debug)]
pub struct Sssp<E> {
    config: SsspConfig,
    _edge: PhantomData<fn() -> E>,
}

impl<E> Sssp<E> {
    pub fn new(config: SsspConfig) -> Self {
        Self {
            config,
            _edge: PhantomData,
        }
    }
}

#[derive(Debug, Default)]
pub struct SsspContext {
    /// Sources owned by this partition.
    sources: Vec<LocalId>,
}

#[inline]
fn improves<E: EdgeWeight>(du: f64, dv: f64, e: &E) -> bool {
    du + e.weight() < dv
}

#[inline]
fn relaxed<E: EdgeWeight>(du: f64, dv: f64, e: &E) -> Option<f64> {
    improves(du, dv, e).then(|| du + e.weight())
}

/// Global id of the max-degree vertex, agreed on by every partition.
fn max_degree_source<C, E, M, S>(
    frag: &Fragment<E>,
    messages: &MessageManager<C, M, S>,
) -> Result<VertexId, EngineError>
where
    C: Communicator,
    M: bytemuck::Pod + Send + Sync,
    S: crate::data::AtomicScalar,
{
    // degree + 1 so that an empty partition (0) never wins
    let (deg, gid) = frag
        .max_degree_inner()
        .map_or((0, 0), |(d, g)| (d + 1, g.get()));
    let degs = messages.all_gather_u64(deg)?;
    let gids = messages.all_gather_u64(gid)?;
    degs.into_iter()
        .zip(gids)
        .filter(|&(d, _)| d > 0)
        .max_by(|a, b| a.0.cmp(&b.0).then(b.1.cmp(&a.1)))
        .map(|(_, g)| VertexId::new(g))
        .ok_or_else(|| EngineError::Configuration("max-degree source on an empty graph".into()))
}

impl<E: EdgeWeight + Send + Sync> IncrementalProgram for Sssp<E> {
    type Edge = E;
    type Value = f64;
    type Message = f64;
    type Context = SsspContext;

    fn buffering(&self) -> Buffering {
        Buffering::InPlace
    }

    fn delivery_mode(&self) -> DeliveryMode {
        DeliveryMode::Channel
    }

    fn initial_value(&self) -> f64 {
        f64::INFINITY
    }

    fn combiner(&self) -> Option<Combiner<f64>> {
        Some(combiner_of::<MinDelta, f64>())
    }

    fn validate(&self, _config: &EngineConfig) -> Result<(), EngineError> {
        if self.config.sources.is_empty() {
            return Err(EngineError::Configuration("sssp needs at least one source".into()));
        }
        Ok(())
    }

    fn init<C: Communicator>(
        &self,
        frag: &Fragment<E>,
        round: &mut ProgramRound<'_, C, Self>,
    ) -> Result<SsspContext, EngineError> {
        let ctx = SsspContext {
            sources: self.config.sources.resolve(frag, round.messages)?,
        };
        log::debug!("sssp fragment {}: {} local sources", frag.fid(), ctx.sources.len());
        Ok(ctx)
    }

    fn peval<C: Communicator>(
        &self,
        frag: &Fragment<E>,
        ctx: &mut SsspContext,
        round: &mut ProgramRound<'_, C, Self>,
    ) -> Result<(), EngineError> {
        let dist = round.values.try_in_place()?;
        let next = round.frontier.next();
        let seeds = ActiveSet::new(frag.vertices_num());
        for &s in &ctx.sources {
            dist.set(s, 0.0);
            seeds.insert(s);
        }
        EdgeMap::new(frag, dist).apply(&seeds, frag.inner_vertices(), improves, relaxed, next);
        for v in next.members_in(frag.outer_vertices()) {
            round.messages.sync_state_on_outer_vertex(frag, v, dist.get(v));
        }
        round.messages.force_continue();
        Ok(())
    }

    fn inc_eval<C: Communicator>(
        &self,
        frag: &Fragment<E>,
        _ctx: &mut SsspContext,
        round: &mut ProgramRound<'_, C, Self>,
    ) -> Result<(), EngineError> {
        let dist = round.values.try_in_place()?;
        let current = round.frontier.current();
        let next = round.frontier.next();
        round.messages.parallel_process(frag, |v, d| {
            if dist.fetch_min(v, d) {
                current.insert(v);
            }
        })?;

        EdgeMap::new(frag, dist).apply(current, frag.inner_vertices(), improves, relaxed, next);

        for v in next.members_in(frag.outer_vertices()) {
            round.messages.sync_state_on_outer_vertex(frag, v, dist.get(v));
        }
        Ok(())
    }
}
