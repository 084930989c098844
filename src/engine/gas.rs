//! Gather-apply-scatter programs and their adapter onto the round loop.
//!
//! A [`GasProgram`] is written per vertex. [`GasDriver`] runs it as an
//! [`IncrementalProgram`] with synchronous semantics: in every round the
//! vertices that received a message first run `init` and `gather` over a
//! stable snapshot of the values, then all of them `apply`, then all of them
//! `scatter`. Signals raised during a round activate their targets in the
//! next round.
//!
//! With [`GasProgram::use_delta_cache`] the driver keeps each vertex's last
//! gather result and adjusts it by the deltas its neighbours post, skipping
//! the next gather. Vertices with in-neighbours on another partition never
//! use the cache.

use super::program::{IncrementalProgram, ProgramRound};
use crate::algs::communicator::Communicator;
use crate::data::{AtomicArray, AtomicScalar, Buffering};
use crate::engine_error::EngineError;
use crate::message::{DeliveryMode, MessageManager};
use crate::topology::fragment::Fragment;
use crate::topology::vertex::{LocalId, VertexId};
use bytemuck::{Pod, Zeroable};
use rayon::prelude::*;

/// Which edges of a vertex a gather or scatter visits.
#[derive(Copy, Clone, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub enum EdgeDir {
    In,
    Out,
    All,
    None,
}

impl EdgeDir {
    #[inline]
    pub fn includes_in(self) -> bool {
        matches!(self, EdgeDir::In | EdgeDir::All)
    }

    #[inline]
    pub fn includes_out(self) -> bool {
        matches!(self, EdgeDir::Out | EdgeDir::All)
    }
}

/// Read-only snapshot of one vertex.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct VertexView<V> {
    pub local: LocalId,
    pub gid: VertexId,
    pub value: V,
    /// Degrees in the whole graph.
    pub in_degree: usize,
    pub out_degree: usize,
}

/// One edge with snapshots of both endpoints.
#[derive(Debug)]
pub struct EdgeView<'a, E, V> {
    pub source: VertexView<V>,
    pub target: VertexView<V>,
    pub data: &'a E,
}

impl<E, V> EdgeView<'_, E, V> {
    /// The endpoint that is not `v`.
    pub fn other(&self, v: LocalId) -> &VertexView<V> {
        if self.source.local == v {
            &self.target
        } else {
            &self.source
        }
    }
}

/// Side effects a vertex raises in `apply` or `scatter`.
#[derive(Debug)]
pub struct GasSignals<M, G> {
    signals: Vec<(LocalId, M)>,
    deltas: Vec<(LocalId, G)>,
    clears: Vec<LocalId>,
}

impl<M, G> Default for GasSignals<M, G> {
    fn default() -> Self {
        Self {
            signals: Vec::new(),
            deltas: Vec::new(),
            clears: Vec::new(),
        }
    }
}

impl<M, G> GasSignals<M, G> {
    /// Activate `v` next round with `msg`.
    pub fn signal(&mut self, v: LocalId, msg: M) {
        self.signals.push((v, msg));
    }

    /// Adjust `v`'s cached gather by `delta`.
    pub fn post_delta(&mut self, v: LocalId, delta: G) {
        self.deltas.push((v, delta));
    }

    /// Force `v` to gather again next time it runs.
    pub fn clear_gather_cache(&mut self, v: LocalId) {
        self.clears.push(v);
    }

    fn extend(&mut self, other: GasSignals<M, G>) {
        self.signals.extend(other.signals);
        self.deltas.extend(other.deltas);
        self.clears.extend(other.clears);
    }
}

pub type Signals<G> = GasSignals<<G as GasProgram>::Message, <G as GasProgram>::Gather>;

pub trait GasProgram: Sync + Sized {
    type Edge: Send + Sync;
    type Value: AtomicScalar;
    /// Result of gathering one edge; merged with [`GasProgram::merge_gather`].
    type Gather: Copy + Send + Sync;
    type Message: Pod + Send + Sync;
    /// Per-vertex program state, kept across rounds.
    type State: Copy + Default + Send + Sync;

    /// Runs once per partition before the first round, on every partition,
    /// so it may use the collectives of `messages`. Returns messages that
    /// activate inner vertices in the first round on top of
    /// [`GasProgram::initial_message`].
    fn prepare<C: Communicator>(
        &self,
        _frag: &Fragment<Self::Edge>,
        _messages: &MessageManager<C, Self::Message, Self::Value>,
    ) -> Result<Vec<(LocalId, Self::Message)>, EngineError> {
        Ok(Vec::new())
    }

    fn init_value(&self, frag: &Fragment<Self::Edge>, v: LocalId) -> Self::Value;

    /// Message that activates `v` in the first round, if any.
    fn initial_message(&self, frag: &Fragment<Self::Edge>, v: LocalId) -> Option<Self::Message>;

    fn merge_message(&self, acc: &mut Self::Message, msg: Self::Message);

    /// Receive the merged message of the round.
    fn init(&self, _state: &mut Self::State, _msg: Self::Message) {}

    fn gather_edges(&self, v: &VertexView<Self::Value>, state: &Self::State) -> EdgeDir;

    fn gather(
        &self,
        v: &VertexView<Self::Value>,
        edge: &EdgeView<'_, Self::Edge, Self::Value>,
    ) -> Self::Gather;

    fn merge_gather(&self, acc: &mut Self::Gather, g: Self::Gather);

    /// `total` is `None` when no edge was gathered.
    fn apply(
        &self,
        v: &VertexView<Self::Value>,
        value: &mut Self::Value,
        state: &mut Self::State,
        total: Option<Self::Gather>,
        signals: &mut Signals<Self>,
    );

    fn scatter_edges(&self, v: &VertexView<Self::Value>, state: &Self::State) -> EdgeDir;

    fn scatter(
        &self,
        v: &VertexView<Self::Value>,
        state: &Self::State,
        edge: &EdgeView<'_, Self::Edge, Self::Value>,
        signals: &mut Signals<Self>,
    );

    fn use_delta_cache(&self) -> bool {
        false
    }
}

/// Per-partition state of a GAS run.
pub struct GasContext<G: GasProgram> {
    states: Vec<G::State>,
    pending: Vec<Option<G::Message>>,
    cache: Vec<Option<G::Gather>>,
    cacheable: Vec<bool>,
}

impl<G: GasProgram> GasContext<G> {
    pub fn state(&self, v: LocalId) -> &G::State {
        &self.states[v.index()]
    }
}

/// Runs a [`GasProgram`] on the incremental round loop.
#[derive(Clone, Debug)]
pub struct GasDriver<G> {
    program: G,
}

impl<G: GasProgram> GasDriver<G> {
    pub fn new(program: G) -> Self {
        Self { program }
    }

    pub fn program(&self) -> &G {
        &self.program
    }

    fn merge_pending(&self, ctx: &mut GasContext<G>, v: LocalId, msg: G::Message) {
        match &mut ctx.pending[v.index()] {
            Some(acc) => self.program.merge_message(acc, msg),
            slot @ None => *slot = Some(msg),
        }
    }

    fn gather_one(
        &self,
        frag: &Fragment<G::Edge>,
        values: &AtomicArray<G::Value>,
        view: &VertexView<G::Value>,
        dir: EdgeDir,
    ) -> Option<G::Gather> {
        let mut acc: Option<G::Gather> = None;
        let mut fold = |g: G::Gather| match &mut acc {
            Some(a) => self.program.merge_gather(a, g),
            None => acc = Some(g),
        };
        if dir.includes_in() {
            for e in frag.in_edges(view.local) {
                let edge = EdgeView {
                    source: view_of(frag, values, e.neighbor),
                    target: *view,
                    data: e.data,
                };
                fold(self.program.gather(view, &edge));
            }
        }
        if dir.includes_out() {
            for e in frag.out_edges(view.local) {
                let edge = EdgeView {
                    source: *view,
                    target: view_of(frag, values, e.neighbor),
                    data: e.data,
                };
                fold(self.program.gather(view, &edge));
            }
        }
        acc
    }

    fn scatter_one(
        &self,
        frag: &Fragment<G::Edge>,
        values: &AtomicArray<G::Value>,
        view: &VertexView<G::Value>,
        state: &G::State,
        signals: &mut Signals<G>,
    ) {
        let dir = self.program.scatter_edges(view, state);
        if dir.includes_in() {
            for e in frag.in_edges(view.local) {
                let edge = EdgeView {
                    source: view_of(frag, values, e.neighbor),
                    target: *view,
                    data: e.data,
                };
                self.program.scatter(view, state, &edge, signals);
            }
        }
        if dir.includes_out() {
            for e in frag.out_edges(view.local) {
                let edge = EdgeView {
                    source: *view,
                    target: view_of(frag, values, e.neighbor),
                    data: e.data,
                };
                self.program.scatter(view, state, &edge, signals);
            }
        }
    }
}

#[inline]
fn view_of<E, V: AtomicScalar>(
    frag: &Fragment<E>,
    values: &AtomicArray<V>,
    v: LocalId,
) -> VertexView<V> {
    VertexView {
        local: v,
        gid: frag.gid(v),
        value: values.get(v),
        in_degree: frag.in_degree(v),
        out_degree: frag.out_degree(v),
    }
}

impl<G: GasProgram> IncrementalProgram for GasDriver<G> {
    type Edge = G::Edge;
    type Value = G::Value;
    type Message = G::Message;
    type Context = GasContext<G>;

    fn buffering(&self) -> Buffering {
        Buffering::InPlace
    }

    fn delivery_mode(&self) -> DeliveryMode {
        DeliveryMode::BatchShuffle
    }

    fn initial_value(&self) -> G::Value {
        G::Value::zeroed()
    }

    fn init<C: Communicator>(
        &self,
        frag: &Fragment<G::Edge>,
        round: &mut ProgramRound<'_, C, Self>,
    ) -> Result<GasContext<G>, EngineError> {
        let seeds = self.program.prepare(frag, round.messages)?;
        for v in frag.vertices() {
            round.values.set(v, self.program.init_value(frag, v));
        }
        let n = frag.inner_vertices_num();
        let cacheable = frag
            .inner_vertices()
            .map(|v| frag.in_edges(v).all(|e| frag.is_inner(e.neighbor)))
            .collect();
        let mut ctx = GasContext {
            states: vec![G::State::default(); n],
            pending: vec![None; n],
            cache: vec![None; n],
            cacheable,
        };
        for (v, msg) in seeds {
            if !frag.is_inner(v) {
                return Err(EngineError::PartitionMismatch {
                    vertex: frag.gid(v),
                    expected: frag.owner_of(v),
                    found: frag.fid(),
                });
            }
            self.merge_pending(&mut ctx, v, msg);
        }
        Ok(ctx)
    }

    fn peval<C: Communicator>(
        &self,
        frag: &Fragment<G::Edge>,
        ctx: &mut GasContext<G>,
        round: &mut ProgramRound<'_, C, Self>,
    ) -> Result<(), EngineError> {
        for v in frag.inner_vertices() {
            if let Some(msg) = self.program.initial_message(frag, v) {
                self.merge_pending(ctx, v, msg);
            }
            if ctx.pending[v.index()].is_some() {
                round.frontier.next().insert(v);
            }
        }
        round.messages.sync_inner_vertices(frag, round.values);
        Ok(())
    }

    fn inc_eval<C: Communicator>(
        &self,
        frag: &Fragment<G::Edge>,
        ctx: &mut GasContext<G>,
        round: &mut ProgramRound<'_, C, Self>,
    ) -> Result<(), EngineError> {
        round.messages.update_outer_vertices(frag, round.values)?;
        for (v, msg) in round.messages.take_updates(frag)? {
            self.merge_pending(ctx, v, msg);
            round.frontier.current().insert(v);
        }
        let active = round.frontier.current().members_in(frag.inner_vertices());
        let values = round.values.try_in_place()?;
        let use_cache = self.program.use_delta_cache();

        // init + gather, against values from before this round's apply
        let inputs: Vec<(LocalId, G::State, Option<G::Gather>, bool)> = {
            let msgs: Vec<Option<G::Message>> = active
                .iter()
                .map(|v| ctx.pending[v.index()].take())
                .collect();
            let ctx = &*ctx;
            active
                .par_iter()
                .zip(msgs)
                .map(|(&v, msg)| {
                    let mut state = ctx.states[v.index()];
                    if let Some(m) = msg {
                        self.program.init(&mut state, m);
                    }
                    let view = view_of(frag, values, v);
                    let dir = self.program.gather_edges(&view, &state);
                    let cached = use_cache && ctx.cacheable[v.index()];
                    let total = match (dir, cached, ctx.cache[v.index()]) {
                        (EdgeDir::None, _, _) => None,
                        (_, true, Some(hit)) => Some(hit),
                        _ => self.gather_one(frag, values, &view, dir),
                    };
                    (v, state, total, cached && dir != EdgeDir::None)
                })
                .collect()
        };

        // apply
        let applied: Vec<(LocalId, G::State, Signals<G>)> = inputs
            .par_iter()
            .map(|&(v, mut state, total, _)| {
                let view = view_of(frag, values, v);
                let mut value = view.value;
                let mut signals = Signals::<G>::default();
                self.program.apply(&view, &mut value, &mut state, total, &mut signals);
                values.set(v, value);
                (v, state, signals)
            })
            .collect();
        for (&(v, _, total, keep), (_, state, _)) in inputs.iter().zip(&applied) {
            ctx.states[v.index()] = *state;
            if keep {
                ctx.cache[v.index()] = total;
            }
        }

        // scatter
        let ctx_ref = &*ctx;
        let scattered: Vec<Signals<G>> = applied
            .into_par_iter()
            .map(|(v, _, mut signals)| {
                let view = view_of(frag, values, v);
                self.scatter_one(frag, values, &view, &ctx_ref.states[v.index()], &mut signals);
                signals
            })
            .collect();
        let mut all = Signals::<G>::default();
        for s in scattered {
            all.extend(s);
        }

        // route
        for (v, msg) in all.signals {
            if frag.is_inner(v) {
                self.merge_pending(ctx, v, msg);
                round.frontier.next().insert(v);
            } else {
                round.messages.sync_state_on_outer_vertex(frag, v, msg);
            }
        }
        if use_cache {
            for (v, delta) in all.deltas {
                if let Some(Some(acc)) = ctx.cache.get_mut(v.index()) {
                    self.program.merge_gather(acc, delta);
                }
            }
            for v in all.clears {
                if let Some(slot) = ctx.cache.get_mut(v.index()) {
                    *slot = None;
                }
            }
        }

        round.messages.sync_inner_vertices(frag, round.values);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::{Engine, EngineConfig};
    use crate::topology::builder::FragmentBuilder;
    use crate::topology::edge_list::EdgeList;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Every vertex runs `rounds` times and counts the edges it gathers.
    struct CountGathers {
        rounds: u32,
        clear: bool,
        gathered: AtomicUsize,
    }

    impl GasProgram for CountGathers {
        type Edge = ();
        type Value = u64;
        type Gather = u64;
        type Message = u64;
        type State = u32;

        fn init_value(&self, _frag: &Fragment<()>, _v: LocalId) -> u64 {
            0
        }

        fn initial_message(&self, _frag: &Fragment<()>, _v: LocalId) -> Option<u64> {
            Some(1)
        }

        fn merge_message(&self, acc: &mut u64, msg: u64) {
            *acc = (*acc).max(msg);
        }

        fn gather_edges(&self, _v: &VertexView<u64>, _state: &u32) -> EdgeDir {
            EdgeDir::In
        }

        fn gather(&self, _v: &VertexView<u64>, _edge: &EdgeView<'_, (), u64>) -> u64 {
            self.gathered.fetch_add(1, Ordering::Relaxed);
            1
        }

        fn merge_gather(&self, acc: &mut u64, g: u64) {
            *acc += g;
        }

        fn apply(
            &self,
            v: &VertexView<u64>,
            value: &mut u64,
            state: &mut u32,
            total: Option<u64>,
            signals: &mut Signals<Self>,
        ) {
            *state += 1;
            *value += total.unwrap_or(0);
            if *state < self.rounds {
                signals.signal(v.local, 1);
            }
            if self.clear {
                signals.clear_gather_cache(v.local);
            }
        }

        fn scatter_edges(&self, _v: &VertexView<u64>, _state: &u32) -> EdgeDir {
            EdgeDir::None
        }

        fn scatter(
            &self,
            _v: &VertexView<u64>,
            _state: &u32,
            _edge: &EdgeView<'_, (), u64>,
            _signals: &mut Signals<Self>,
        ) {
        }

        fn use_delta_cache(&self) -> bool {
            true
        }
    }

    fn gathers(clear: bool) -> (usize, Vec<u64>) {
        let g = EdgeList::from_edges(true, [(0, 1, ())]);
        let frags = FragmentBuilder::new(&g, 1).build().unwrap();
        let driver = GasDriver::new(CountGathers {
            rounds: 3,
            clear,
            gathered: AtomicUsize::new(0),
        });
        let out = Engine::new(EngineConfig::default()).unwrap().run(&frags, &driver).unwrap();
        assert_eq!(out.report.inc_rounds, 3);
        let values = out.values.iter().map(|&(_, v)| v).collect();
        (driver.program().gathered.load(Ordering::Relaxed), values)
    }

    #[test]
    fn cached_gather_is_reused() {
        let (n, values) = gathers(false);
        assert_eq!(n, 1);
        assert_eq!(values, vec![0, 3]);
    }

    #[test]
    fn cleared_cache_forces_a_fresh_gather() {
        let (n, values) = gathers(true);
        assert_eq!(n, 3);
        assert_eq!(values, vec![0, 3]);
    }
}
