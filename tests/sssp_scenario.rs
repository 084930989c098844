mod util;

use fragment_engine::apps::{Sssp, SsspConfig};
use fragment_engine::io::write_results;
use fragment_engine::prelude::*;
use util::*;

const MODES: [DeliveryMode; 2] = [DeliveryMode::BatchShuffle, DeliveryMode::Channel];

#[test]
fn small_graph_on_one_partition() {
    for mode in MODES {
        let out = run(
            &small_weighted(),
            1,
            EngineConfig::default().with_mode(mode),
            &Sssp::new(SsspConfig::from_source(0)),
        )
        .unwrap();
        assert_eq!(values(&out), vec![0.0, 1.0, 3.0, 10.0], "{mode:?}");
        assert_eq!(out.report.inc_rounds, 2, "{mode:?}");
        assert!(out.report.converged());

        let mut text = Vec::new();
        write_results(&mut text, &out.values).unwrap();
        assert_eq!(String::from_utf8(text).unwrap(), "0 0\n1 1\n2 3\n3 10\n");
    }
}

#[test]
fn small_graph_on_every_partition_count() {
    for parts in 1..=4 {
        for mode in MODES {
            let out = run(
                &small_weighted(),
                parts,
                EngineConfig::default().with_mode(mode),
                &Sssp::new(SsspConfig::from_source(0)),
            )
            .unwrap();
            assert_eq!(values(&out), vec![0.0, 1.0, 3.0, 10.0], "{parts} parts, {mode:?}");
        }
    }
}

#[test]
fn unreachable_vertices_print_infinity() {
    let mut g = small_weighted();
    g.add_vertex(vid(4));
    let out = run(&g, 2, EngineConfig::default(), &Sssp::new(SsspConfig::from_source(1))).unwrap();
    let mut text = Vec::new();
    write_results(&mut text, &out.values).unwrap();
    assert_eq!(
        String::from_utf8(text).unwrap(),
        "0 infinity\n1 0\n2 2\n3 infinity\n4 infinity\n"
    );
}

#[test]
fn matches_dijkstra_on_random_graphs() {
    for seed in 0..4 {
        let g = random_graph(60, 0.05, seed);
        let want = dijkstra(&g, 60, &[0], false);
        for parts in [1, 3] {
            for mode in MODES {
                let out = run(
                    &g,
                    parts,
                    EngineConfig::default().with_mode(mode),
                    &Sssp::new(SsspConfig::from_source(0)),
                )
                .unwrap();
                assert_close(&values(&out), &want, 1e-9);
            }
        }
    }
}

#[test]
fn distances_only_decrease_from_round_to_round() {
    let g = random_graph(40, 0.08, 11);
    let truth = dijkstra(&g, 40, &[0], false);
    let mut prev: Option<Vec<f64>> = None;
    // a shortest path has at most 39 hops and every round extends it by one
    for bound in 0..=41 {
        let config = EngineConfig::default()
            .with_threads(1)
            .with_mode(DeliveryMode::BatchShuffle)
            .with_max_rounds(bound)
            .unwrap();
        let out = run(&g, 2, config, &Sssp::new(SsspConfig::from_source(0))).unwrap();
        let d = values(&out);
        for (i, (&x, &t)) in d.iter().zip(&truth).enumerate() {
            assert!(x >= t - 1e-9, "vertex {i} below its true distance");
        }
        if let Some(p) = &prev {
            for (i, (&x, &y)) in d.iter().zip(p).enumerate() {
                assert!(x <= y, "vertex {i} grew from {y} to {x} at bound {bound}");
            }
        }
        prev = Some(d);
    }
    assert_close(prev.as_deref().unwrap(), &truth, 1e-9);
}
