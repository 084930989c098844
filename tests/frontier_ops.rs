mod util;

use fragment_engine::prelude::*;
use util::*;

/// Shortest paths written set-at-a-time: seed with a vertex filter, then one
/// edge step per round from whatever changed.
struct SetSssp {
    source: VertexId,
}

fn check(s: f64, d: f64, w: &f64) -> bool {
    s + w < d
}

fn update(s: f64, d: f64, w: &f64) -> Option<f64> {
    (s + w < d).then_some(s + w)
}

impl IncrementalProgram for SetSssp {
    type Edge = f64;
    type Value = f64;
    type Message = f64;
    type Context = ();

    fn buffering(&self) -> Buffering {
        Buffering::InPlace
    }

    fn initial_value(&self) -> f64 {
        f64::INFINITY
    }

    fn combiner(&self) -> Option<Combiner<f64>> {
        Some(combiner_of::<MinDelta, f64>())
    }

    fn init<C: Communicator>(
        &self,
        frag: &Fragment<f64>,
        _round: &mut ProgramRound<'_, C, Self>,
    ) -> Result<(), EngineError> {
        frag.resolve(self.source).map(|_| ())
    }

    fn peval<C: Communicator>(
        &self,
        frag: &Fragment<f64>,
        _ctx: &mut (),
        round: &mut ProgramRound<'_, C, Self>,
    ) -> Result<(), EngineError> {
        let dist = round.values.try_in_place()?;
        let all = ActiveSet::new(frag.vertices_num());
        all.insert_range(frag.inner_vertices());
        let seeds = vertex_map(&all, frag.inner_vertices(), |v| {
            let is_source = frag.gid(v) == self.source;
            if is_source {
                dist.set(v, 0.0);
            }
            is_source
        });
        let next = round.frontier.next();
        EdgeMap::new(frag, dist).apply(&seeds, frag.inner_vertices(), check, update, next);
        for v in next.members_in(frag.outer_vertices()) {
            round.messages.sync_state_on_outer_vertex(frag, v, dist.get(v));
        }
        Ok(())
    }

    fn inc_eval<C: Communicator>(
        &self,
        frag: &Fragment<f64>,
        _ctx: &mut (),
        round: &mut ProgramRound<'_, C, Self>,
    ) -> Result<(), EngineError> {
        let dist = round.values.try_in_place()?;
        let current = round.frontier.current();
        round.messages.parallel_process(frag, |v, d| {
            if dist.fetch_min(v, d) {
                current.insert(v);
            }
        })?;
        let next = round.frontier.next();
        EdgeMap::new(frag, dist).apply(current, frag.inner_vertices(), check, update, next);
        for v in next.members_in(frag.outer_vertices()) {
            round.messages.sync_state_on_outer_vertex(frag, v, dist.get(v));
        }
        Ok(())
    }
}

#[test]
fn set_at_a_time_sssp_matches_dijkstra() {
    for seed in [3, 11] {
        let g = random_graph(60, 0.05, seed);
        let want = dijkstra(&g, 60, &[0], false);
        for parts in 1..=3 {
            for mode in [DeliveryMode::BatchShuffle, DeliveryMode::Channel] {
                let prog = SetSssp { source: vid(0) };
                let out = run(&g, parts, EngineConfig::default().with_mode(mode), &prog).unwrap();
                assert_close(&values(&out), &want, 1e-9);
                assert!(out.report.converged());
            }
        }
    }
}

#[test]
fn set_at_a_time_sssp_on_the_small_graph() {
    let prog = SetSssp { source: vid(0) };
    let out = run(&small_weighted(), 2, EngineConfig::default(), &prog).unwrap();
    assert_eq!(values(&out), vec![0.0, 1.0, 3.0, 10.0]);
}

#[test]
fn local_edge_steps_converge_without_an_engine() {
    let g = chain(6);
    let frag = FragmentBuilder::new(&g, 1).build_one(0).unwrap();
    let dist = AtomicArray::new(frag.vertices_num(), f64::INFINITY);
    let src = frag.inner_local(vid(0)).unwrap();
    dist.set(src, 0.0);
    let mut frontier = ActiveSet::new(frag.vertices_num());
    frontier.insert(src);
    let mut steps = 0;
    while !frontier.is_empty() {
        frontier = edge_map(&frag, &dist, &frontier, check, update);
        steps += 1;
    }
    assert_eq!(steps, 6);
    let d: Vec<f64> = (0..6).map(|i| dist.get(frag.inner_local(vid(i)).unwrap())).collect();
    assert_eq!(d, vec![0.0, 1.0, 2.0, 3.0, 4.0, 5.0]);
}
