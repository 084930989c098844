//! Shortest paths as a gather-apply-scatter program.
//!
//! Nothing is gathered: the merged message of a round is the best distance
//! proposed to the vertex. A vertex whose distance dropped proposes
//! `dist + weight` to every neighbour that would improve, following out-edges
//! only when `directed` is set and both directions otherwise.

use super::sssp::SourceSelection;
use crate::algs::communicator::Communicator;
use crate::engine::gas::Signals;
use crate::engine::{EdgeDir, EdgeView, GasProgram, VertexView};
use crate::message::MessageManager;
use crate::engine_error::EngineError;
use crate::topology::edge_list::EdgeWeight;
use crate::topology::fragment::Fragment;
use crate::topology::vertex::LocalId;
use serde::{Deserialize, Serialize};
use std::marker::PhantomData;

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SsspGasConfig {
    pub sources: SourceSelection,
    pub directed: bool,
}

#[derive(Copy, Clone, Debug, PartialEq)]
pub struct SsspState {
    pub min_dist: f64,
    pub changed: bool,
}

impl Default for SsspState {
    fn default() -> Self {
        Self {
            min_dist: f64::INFINITY,
            changed: false,
        }
    }
}

#[derive(Clone, Debug)]
pub struct SsspGas<E> {
    config: SsspGasConfig,
    _edge: PhantomData<fn() -> E>,
}

impl<E> SsspGas<E> {
    pub fn new(config: SsspGasConfig) -> Self {
        Self {
            config,
            _edge: PhantomData,
        }
    }
}

impl<E: EdgeWeight + Send + Sync> GasProgram for SsspGas<E> {
    type Edge = E;
    type Value = f64;
    type Gather = ();
    type Message = f64;
    type State = SsspState;

    fn prepare<C: Communicator>(
        &self,
        frag: &Fragment<E>,
        messages: &MessageManager<C, f64, f64>,
    ) -> Result<Vec<(LocalId, f64)>, EngineError> {
        let sources = self.config.sources.resolve(frag, messages)?;
        Ok(sources.into_iter().map(|s| (s, 0.0)).collect())
    }

    fn init_value(&self, _frag: &Fragment<E>, _v: LocalId) -> f64 {
        f64::INFINITY
    }

    fn initial_message(&self, _frag: &Fragment<E>, _v: LocalId) -> Option<f64> {
        None
    }

    fn merge_message(&self, acc: &mut f64, msg: f64) {
        if msg < *acc {
            *acc = msg;
        }
    }

    fn init(&self, state: &mut SsspState, msg: f64) {
        state.min_dist = msg;
    }

    fn gather_edges(&self, _v: &VertexView<f64>, _state: &SsspState) -> EdgeDir {
        EdgeDir::None
    }

    fn gather(&self, _v: &VertexView<f64>, _edge: &EdgeView<'_, E, f64>) {}

    fn merge_gather(&self, _acc: &mut (), _g: ()) {}

    fn apply(
        &self,
        _v: &VertexView<f64>,
        value: &mut f64,
        state: &mut SsspState,
        _total: Option<()>,
        _signals: &mut Signals<Self>,
    ) {
        state.changed = *value > state.min_dist;
        if state.changed {
            *value = state.min_dist;
        }
    }

    fn scatter_edges(&self, _v: &VertexView<f64>, state: &SsspState) -> EdgeDir {
        match (state.changed, self.config.directed) {
            (false, _) => EdgeDir::None,
            (true, true) => EdgeDir::Out,
            (true, false) => EdgeDir::All,
        }
    }

    fn scatter(
        &self,
        v: &VertexView<f64>,
        _state: &SsspState,
        edge: &EdgeView<'_, E, f64>,
        signals: &mut Signals<Self>,
    ) {
        let other = edge.other(v.local);
        let d = v.value + edge.data.weight();
        if other.value > d {
            signals.signal(other.local, d);
        }
    }
}
