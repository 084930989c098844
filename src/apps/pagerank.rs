//! PageRank as an incremental program over double-buffered values.
//!
//! Between rounds a vertex stores its rank divided by its out-degree (or the
//! rank itself when it has no outgoing edge), so a gather is a plain sum over
//! in-edges. Dangling vertices keep their rank and their mass is spread over
//! every vertex through the next round's base term, which keeps the total at
//! one. `finalize` turns the stored values back into ranks.

use crate::algs::communicator::Communicator;
use crate::data::Buffering;
use crate::engine::{EngineConfig, IncrementalProgram, ProgramRound};
use crate::engine_error::EngineError;
use crate::topology::fragment::Fragment;
use crate::topology::vertex::LocalId;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use std::marker::PhantomData;

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PageRankConfig {
    pub damping: f64,
    /// Stop once no rank moves by more than this; `None` runs to the round bound.
    pub tolerance: Option<f64>,
}

impl Default for PageRankConfig {
    fn default() -> Self {
        Self {
            damping: 0.85,
            tolerance: Some(1e-10),
        }
    }
}

#[derive(Clone, Debug)]
pub struct PageRank<E> {
    config: PageRankConfig,
    _edge: PhantomData<fn() -> E>,
}

impl<E> PageRank<E> {
    pub fn new(config: PageRankConfig) -> Self {
        Self {
            config,
            _edge: PhantomData,
        }
    }
}

impl<E> Default for PageRank<E> {
    fn default() -> Self {
        Self::new(PageRankConfig::default())
    }
}

#[derive(Debug)]
pub struct PageRankContext {
    total: f64,
    dangling_sum: f64,
}

#[inline]
fn scale<E>(frag: &Fragment<E>, u: LocalId) -> f64 {
    match frag.out_degree(u) {
        0 => 1.0,
        d => d as f64,
    }
}

impl<E: Send + Sync> IncrementalProgram for PageRank<E> {
    type Edge = E;
    type Value = f64;
    type Message = ();
    type Context = PageRankContext;

    fn buffering(&self) -> Buffering {
        Buffering::Double
    }

    fn initial_value(&self) -> f64 {
        0.0
    }

    fn validate(&self, config: &EngineConfig) -> Result<(), EngineError> {
        if !(0.0..=1.0).contains(&self.config.damping) {
            return Err(EngineError::Configuration(format!(
                "damping must lie in [0, 1], got {}",
                self.config.damping
            )));
        }
        if self.config.tolerance.is_none() && config.max_rounds.is_none() {
            return Err(EngineError::Configuration(
                "pagerank needs a tolerance or a round bound".into(),
            ));
        }
        Ok(())
    }

    fn init<C: Communicator>(
        &self,
        frag: &Fragment<E>,
        _round: &mut ProgramRound<'_, C, Self>,
    ) -> Result<PageRankContext, EngineError> {
        Ok(PageRankContext {
            total: frag.total_vertices().max(1) as f64,
            dangling_sum: 0.0,
        })
    }

    fn peval<C: Communicator>(
        &self,
        frag: &Fragment<E>,
        ctx: &mut PageRankContext,
        round: &mut ProgramRound<'_, C, Self>,
    ) -> Result<(), EngineError> {
        let p = 1.0 / ctx.total;
        let mut dangling = 0u64;
        for u in frag.inner_vertices() {
            if frag.out_degree(u) == 0 {
                dangling += 1;
            }
            round.values.set_current(u, p / scale(frag, u));
        }
        let dangling = round.messages.sum_u64(dangling)?;
        ctx.dangling_sum = p * dangling as f64;

        round.messages.sync_inner_vertices(frag, round.values);
        round.frontier.next().insert_range(frag.inner_vertices());
        Ok(())
    }

    fn inc_eval<C: Communicator>(
        &self,
        frag: &Fragment<E>,
        ctx: &mut PageRankContext,
        round: &mut ProgramRound<'_, C, Self>,
    ) -> Result<(), EngineError> {
        let d = self.config.damping;
        let base = (1.0 - d) / ctx.total + d * ctx.dangling_sum / ctx.total;
        round.messages.update_outer_vertices(frag, round.values)?;

        let buf = round.values.try_double_mut()?;
        let (cur, next) = buf.split_mut();
        next.par_for_each_mut(frag.inner_vertices(), |u, slot| {
            let sum: f64 = frag.in_edges(u).map(|e| cur[e.neighbor]).sum();
            *slot = (d * sum + base) / scale(frag, u);
        });
        let next = &*next;

        let diff = frag
            .inner_vertices()
            .as_range()
            .into_par_iter()
            .map(|i| {
                let u = LocalId::from_index(i);
                ((next[u] - cur[u]) * scale(frag, u)).abs()
            })
            .reduce(|| 0.0, f64::max);
        let dangling: f64 = frag
            .inner_vertices()
            .filter(|&u| frag.out_degree(u) == 0)
            .map(|u| next[u])
            .sum();
        buf.swap();

        ctx.dangling_sum = round.messages.sum_f64(dangling)?;
        let diff = round.messages.max_f64(diff)?;
        log::debug!("pagerank round {}: max change {diff:e}", round.step);

        if self.config.tolerance.is_none_or(|t| diff > t) {
            round.messages.sync_inner_vertices(frag, round.values);
            round.frontier.next().insert_range(frag.inner_vertices());
        }
        Ok(())
    }

    fn finalize<C: Communicator>(
        &self,
        frag: &Fragment<E>,
        _ctx: &mut PageRankContext,
        round: &mut ProgramRound<'_, C, Self>,
    ) -> Result<(), EngineError> {
        for u in frag.inner_vertices() {
            let r = round.values.get(u) * scale(frag, u);
            round.values.set_current(u, r);
        }
        Ok(())
    }
}
