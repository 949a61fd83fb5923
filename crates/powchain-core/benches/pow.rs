use criterion::{criterion_group, criterion_main, Criterion};
use powchain_core::{genesis_block, mine::mine, now_timestamp, rehash};
use std::hint::black_box;

fn bench_pow(c: &mut Criterion) {
    let genesis = genesis_block();

    c.bench_function("mine_difficulty_3", |b| {
        let timestamp = now_timestamp();
        let mut round = 0u64;
        b.iter(|| {
            round += 1;
            let data = format!("bench payload {round}");
            black_box(mine(1, &genesis.hash, timestamp, &data));
        });
    });

    c.bench_function("rehash", |b| {
        b.iter(|| {
            black_box(rehash(
                black_box(1),
                &genesis.hash,
                1_700_000_001.5,
                "block 1",
                black_box(115_997),
            ))
        });
    });
}

criterion_group!(benches, bench_pow);
criterion_main!(benches);
