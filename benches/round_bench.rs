use criterion::{BenchmarkId, Criterion, criterion_group, criterion_main};
use fragment_engine::apps::{PageRank, PageRankGas, PageRankGasConfig, Sssp, SsspConfig};
use fragment_engine::io::synthetic_powerlaw;
use fragment_engine::prelude::*;

fn bench_sssp(c: &mut Criterion) {
    let g = synthetic_powerlaw(5_000, true, 2.1, 500, 7).expect("graph");
    let mut group = c.benchmark_group("sssp");
    for parts in [1usize, 4] {
        let frags = FragmentBuilder::new(&g, parts).build().expect("fragments");
        for mode in [DeliveryMode::BatchShuffle, DeliveryMode::Channel] {
            let engine = Engine::new(EngineConfig::default().with_mode(mode)).expect("engine");
            let prog = Sssp::new(SsspConfig::from_source(0));
            let id = BenchmarkId::new(format!("{mode:?}"), parts);
            group.bench_with_input(id, &frags, |b, frags| {
                b.iter(|| engine.run(frags, &prog).expect("run"))
            });
        }
    }
    group.finish();
}

fn bench_pagerank(c: &mut Criterion) {
    let g = synthetic_powerlaw(5_000, true, 2.1, 500, 11).expect("graph");
    let mut group = c.benchmark_group("pagerank");
    group.sample_size(10);
    for parts in [1usize, 4] {
        let frags = FragmentBuilder::new(&g, parts).build().expect("fragments");
        let bounded = EngineConfig::default().with_max_rounds(10).expect("bound");
        let engine = Engine::new(bounded).expect("engine");
        group.bench_with_input(BenchmarkId::new("incremental", parts), &frags, |b, frags| {
            b.iter(|| engine.run(frags, &PageRank::default()).expect("run"))
        });
        let gas = GasDriver::new(PageRankGas::new(PageRankGasConfig {
            iterations: Some(10),
            ..Default::default()
        }));
        let gas_config = gas.program().config().apply_to(EngineConfig::default());
        let gas_engine = Engine::new(gas_config).expect("engine");
        group.bench_with_input(BenchmarkId::new("gas", parts), &frags, |b, frags| {
            b.iter(|| gas_engine.run(frags, &gas).expect("run"))
        });
    }
    group.finish();
}

criterion_group!(benches, bench_sssp, bench_pagerank);
criterion_main!(benches);
