mod util;

use fragment_engine::apps::{PageRank, PageRankConfig, Sssp, SsspConfig};
use fragment_engine::io::{
    load_format, read_edge_list, synthetic_powerlaw, write_partition, write_results,
};
use fragment_engine::prelude::*;
use std::path::PathBuf;
use util::*;

fn temp_file(name: &str, contents: &str) -> PathBuf {
    let path = std::env::temp_dir().join(format!("fragment-engine-{}-{name}", std::process::id()));
    std::fs::write(&path, contents).unwrap();
    path
}

#[test]
fn tsv_file_to_result_lines() {
    let path = temp_file("small.tsv", "# src dst weight\n0\t1\t1\n1\t2\t2\n0\t3\t10\n");
    let g = load_format(&path, "tsv").unwrap();
    std::fs::remove_file(&path).ok();

    let out = run(&g, 2, EngineConfig::default(), &Sssp::new(SsspConfig::from_source(0))).unwrap();
    let mut text = Vec::new();
    write_results(&mut text, &out.values).unwrap();
    assert_eq!(String::from_utf8(text).unwrap(), "0 0\n1 1\n2 3\n3 10\n");
}

#[test]
fn adj_and_snap_describe_the_same_graph() {
    let adj = read_edge_list("0 2 1 2\n1 1 2\n2 1 0\n3 0\n".as_bytes(), "adj", true).unwrap();
    let snap = read_edge_list("0 1\n0 2\n1 2\n2 0\n".as_bytes(), "snap", true).unwrap();
    assert_eq!(adj.edges, snap.edges);
    let a = run(&adj, 2, EngineConfig::default(), &Sssp::new(SsspConfig::from_source(1))).unwrap();
    let d = values(&a);
    assert_eq!(d[..3], [2.0, 0.0, 1.0]);
    assert!(d[3].is_infinite());
}

#[test]
fn per_partition_output_covers_every_vertex_once() {
    let g = chain(7);
    let frags = fragments(&g, 3);
    let mut lines = Vec::new();
    for f in &frags {
        let mut store = VertexDataStore::new(Buffering::InPlace, f.vertices_num(), f64::INFINITY);
        for v in f.inner_vertices() {
            store.set(v, f.gid(v).get() as f64);
        }
        let mut buf = Vec::new();
        write_partition(&mut buf, f, &store).unwrap();
        lines.extend(String::from_utf8(buf).unwrap().lines().map(str::to_owned));
    }
    lines.sort();
    let want: Vec<String> = (0..7).map(|i| format!("{i} {i}")).collect();
    assert_eq!(lines, want);
}

#[test]
fn pagerank_on_a_synthetic_powerlaw_graph() {
    let g = synthetic_powerlaw(300, true, 2.1, 100, 42).unwrap();
    let out = run(
        &g,
        4,
        EngineConfig::default(),
        &PageRank::new(PageRankConfig {
            tolerance: Some(1e-9),
            ..Default::default()
        }),
    )
    .unwrap();
    let total: f64 = values(&out).iter().sum();
    assert!((total - 1.0).abs() < 1e-9, "{total}");
    assert_eq!(out.values.len(), 300);
}

#[test]
fn invalid_powerlaw_exponent_is_rejected() {
    assert!(matches!(
        synthetic_powerlaw(10, true, 0.0, 5, 1),
        Err(EngineError::Configuration(_))
    ));
    let tiny = synthetic_powerlaw(1, false, 2.0, 5, 1).unwrap();
    assert_eq!(tiny.edge_count(), 0);
    assert_eq!(tiny.vertices.len(), 1);
}
