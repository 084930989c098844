//! PageRank written as a gather-apply-scatter program.
//!
//! Ranks are unnormalised: every vertex starts at 1 and settles at
//! `reset + (1 - reset) * sum(in-neighbour rank / out-degree)`. In dynamic
//! mode a vertex only wakes its out-neighbours while its rank still moves by
//! more than the tolerance; with a fixed iteration count every vertex runs in
//! every round.

use crate::engine::gas::Signals;
use crate::engine::{EdgeDir, EdgeView, EngineConfig, GasProgram, VertexView};
use crate::message::DeliveryMode;
use crate::topology::fragment::Fragment;
use crate::topology::vertex::LocalId;
use serde::{Deserialize, Serialize};
use std::marker::PhantomData;

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PageRankGasConfig {
    pub reset_prob: f64,
    pub tolerance: f64,
    /// Run exactly this many synchronous rounds instead of until convergence.
    pub iterations: Option<usize>,
    pub use_delta_cache: bool,
}

impl Default for PageRankGasConfig {
    fn default() -> Self {
        Self {
            reset_prob: 0.15,
            tolerance: 1e-2,
            iterations: None,
            use_delta_cache: false,
        }
    }
}

impl PageRankGasConfig {
    /// Engine settings this configuration implies: a fixed iteration count
    /// forces batch delivery and becomes the round bound.
    pub fn apply_to(&self, mut config: EngineConfig) -> EngineConfig {
        if let Some(k) = self.iterations {
            log::info!("pagerank: {k} fixed iterations, forcing synchronous delivery");
            config.mode = Some(DeliveryMode::BatchShuffle);
            config.max_rounds = Some(k);
        }
        config
    }
}

#[derive(Copy, Clone, Debug, Default, PartialEq)]
pub struct PageRankState {
    pub last_change: f64,
}

#[derive(Clone, Debug)]
pub struct PageRankGas<E> {
    config: PageRankGasConfig,
    _edge: PhantomData<fn() -> E>,
}

impl<E> PageRankGas<E> {
    pub fn new(config: PageRankGasConfig) -> Self {
        Self {
            config,
            _edge: PhantomData,
        }
    }

    pub fn config(&self) -> &PageRankGasConfig {
        &self.config
    }

    fn moving(&self, change: f64) -> bool {
        change.abs() > self.config.tolerance
    }
}

impl<E> Default for PageRankGas<E> {
    fn default() -> Self {
        Self::new(PageRankGasConfig::default())
    }
}

impl<E: Send + Sync> GasProgram for PageRankGas<E> {
    type Edge = E;
    type Value = f64;
    type Gather = f64;
    type Message = ();
    type State = PageRankState;

    fn init_value(&self, _frag: &Fragment<E>, _v: LocalId) -> f64 {
        1.0
    }

    fn initial_message(&self, _frag: &Fragment<E>, _v: LocalId) -> Option<()> {
        Some(())
    }

    fn merge_message(&self, _acc: &mut (), _msg: ()) {}

    fn gather_edges(&self, _v: &VertexView<f64>, _state: &PageRankState) -> EdgeDir {
        EdgeDir::In
    }

    fn gather(&self, _v: &VertexView<f64>, edge: &EdgeView<'_, E, f64>) -> f64 {
        edge.source.value / edge.source.out_degree as f64
    }

    fn merge_gather(&self, acc: &mut f64, g: f64) {
        *acc += g;
    }

    fn apply(
        &self,
        v: &VertexView<f64>,
        value: &mut f64,
        state: &mut PageRankState,
        total: Option<f64>,
        signals: &mut Signals<Self>,
    ) {
        let reset = self.config.reset_prob;
        let new = (1.0 - reset) * total.unwrap_or(0.0) + reset;
        state.last_change = new - *value;
        *value = new;
        if self.config.iterations.is_some() {
            signals.signal(v.local, ());
        }
    }

    fn scatter_edges(&self, _v: &VertexView<f64>, state: &PageRankState) -> EdgeDir {
        if self.config.iterations.is_some() {
            EdgeDir::None
        } else if self.config.use_delta_cache || self.moving(state.last_change) {
            EdgeDir::Out
        } else {
            EdgeDir::None
        }
    }

    fn scatter(
        &self,
        v: &VertexView<f64>,
        state: &PageRankState,
        edge: &EdgeView<'_, E, f64>,
        signals: &mut Signals<Self>,
    ) {
        if self.config.use_delta_cache {
            signals.post_delta(edge.target.local, state.last_change / v.out_degree as f64);
        }
        if self.moving(state.last_change) {
            signals.signal(edge.target.local, ());
        }
    }

    fn use_delta_cache(&self) -> bool {
        self.config.use_delta_cache
    }
}
