#![allow(dead_code)]
use fragment_engine::prelude::*;
use rand::rngs::SmallRng;
use rand::{Rng, SeedableRng};
use std::cmp::Ordering;
use std::collections::BinaryHeap;

pub fn vid(u: u64) -> VertexId {
    VertexId::new(u)
}

/// `0->1 (1), 1->2 (2), 0->3 (10)`.
pub fn small_weighted() -> EdgeList<f64> {
    EdgeList::from_edges(true, [(0, 1, 1.0), (1, 2, 2.0), (0, 3, 10.0)])
}

/// Directed path `0 -> 1 -> ... -> n-1`, unit weights.
pub fn chain(n: u64) -> EdgeList<f64> {
    EdgeList::from_edges(true, (1..n).map(|i| (i - 1, i, 1.0)))
}

/// Erdos-Renyi style digraph on `0..n` with weights in `[1, 10)`.
pub fn random_graph(n: u64, p: f64, seed: u64) -> EdgeList<f64> {
    let mut rng = SmallRng::seed_from_u64(seed);
    let mut g = EdgeList::new(true);
    for v in 0..n {
        g.add_vertex(vid(v));
    }
    for u in 0..n {
        for v in 0..n {
            if u != v && rng.r#gen::<f64>() < p {
                g.add_edge(vid(u), vid(v), rng.gen_range(1.0..10.0));
            }
        }
    }
    g
}

pub fn fragments<E: Clone + Send + Sync>(g: &EdgeList<E>, parts: usize) -> Vec<Fragment<E>> {
    FragmentBuilder::new(g, parts).build().expect("build fragments")
}

pub fn run<P: IncrementalProgram>(
    g: &EdgeList<P::Edge>,
    parts: usize,
    config: EngineConfig,
    program: &P,
) -> Result<RunOutcome<P::Value>, EngineError>
where
    P::Edge: Clone,
{
    Engine::new(config)?.run(&fragments(g, parts), program)
}

pub fn values<V: Copy>(out: &RunOutcome<V>) -> Vec<V> {
    out.values.iter().map(|&(_, v)| v).collect()
}

#[derive(PartialEq)]
struct Entry(f64, usize);

impl Eq for Entry {}

impl PartialOrd for Entry {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Entry {
    fn cmp(&self, other: &Self) -> Ordering {
        other.0.total_cmp(&self.0).then(other.1.cmp(&self.1))
    }
}

/// Reference distances over dense ids `0..n`.
pub fn dijkstra(g: &EdgeList<f64>, n: usize, sources: &[u64], undirected: bool) -> Vec<f64> {
    let mut adj = vec![Vec::new(); n];
    for &(s, t, w) in &g.edges {
        adj[s.get() as usize].push((t.get() as usize, w));
        if undirected {
            adj[t.get() as usize].push((s.get() as usize, w));
        }
    }
    let mut dist = vec![f64::INFINITY; n];
    let mut heap = BinaryHeap::new();
    for &s in sources {
        dist[s as usize] = 0.0;
        heap.push(Entry(0.0, s as usize));
    }
    while let Some(Entry(d, u)) = heap.pop() {
        if d > dist[u] {
            continue;
        }
        for &(v, w) in &adj[u] {
            if d + w < dist[v] {
                dist[v] = d + w;
                heap.push(Entry(d + w, v));
            }
        }
    }
    dist
}

pub fn assert_close(got: &[f64], want: &[f64], tol: f64) {
    assert_eq!(got.len(), want.len());
    for (i, (a, b)) in got.iter().zip(want).enumerate() {
        let same = (a.is_infinite() && b.is_infinite()) || (a - b).abs() <= tol;
        assert!(same, "vertex {i}: got {a}, want {b}");
    }
}
