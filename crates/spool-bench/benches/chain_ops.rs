//! Criterion micro-benchmarks for chain building, reconciliation,
//! coalescing and sent-byte accounting.

use std::hint::black_box;

use criterion::{criterion_group, criterion_main, BatchSize, Criterion};
use spool_arena::Arena;
use spool_bench::{bench_config, file_chain, filled_chain};
use spool_chain::{chain_of_bufs, coalesce_file, update_chains, update_sent, Bufs, OutputCtx};
use spool_core::{Chain, FileId, OwnerTag};

const TAG: OwnerTag = OwnerTag(1);

/// Benchmark: build a 64 x 4 KiB chain over one allocation.
fn bench_chain_of_bufs_64(c: &mut Criterion) {
    let mut arena = Arena::new(bench_config()).unwrap();
    c.bench_function("chain_of_bufs_64x4k", |b| {
        b.iter(|| {
            arena.reset();
            let head = chain_of_bufs(&mut arena, Bufs::new(64, 4096)).unwrap();
            black_box(head);
        });
    });
}

/// Benchmark: account a send that ends halfway through a 256-buffer chain.
fn bench_update_sent_partial(c: &mut Criterion) {
    c.bench_function("update_sent_256x1k_half", |b| {
        b.iter_batched(
            || {
                let mut arena = Arena::new(bench_config()).unwrap();
                let head = filled_chain(&mut arena, 256, 1024, TAG).unwrap();
                (arena, head)
            },
            |(mut arena, head)| {
                let resume = update_sent(&mut arena, head, 128 * 1024 + 512).unwrap();
                black_box(resume);
            },
            BatchSize::SmallInput,
        );
    });
}

/// Benchmark: fold a drained 256-buffer out chain and reclaim all of it.
fn bench_update_chains_reclaim(c: &mut Criterion) {
    c.bench_function("update_chains_reclaim_256", |b| {
        b.iter_batched(
            || {
                let mut arena = Arena::new(bench_config()).unwrap();
                let head = filled_chain(&mut arena, 256, 1024, TAG).unwrap();
                update_sent(&mut arena, head, 256 * 1024).unwrap();
                (arena, head)
            },
            |(mut arena, head)| {
                let (mut free, mut busy, mut out): (Chain, Chain, Chain) = (None, None, head);
                update_chains(&mut arena, &mut free, &mut busy, &mut out, TAG).unwrap();
                black_box(free);
            },
            BatchSize::SmallInput,
        );
    });
}

/// Benchmark: steady-state produce/send/reclaim round on a recycled context.
fn bench_output_ctx_round(c: &mut Criterion) {
    let mut arena = Arena::new(bench_config()).unwrap();
    let mut ctx = OutputCtx::new(TAG, Bufs::new(16, 4096)).unwrap();
    let payload = vec![0u8; 4096];

    c.bench_function("output_ctx_round_16x4k", |b| {
        b.iter(|| {
            let mut out: Chain = None;
            while let Some(cl) = ctx.get_buf(&mut arena).unwrap() {
                let buf = arena.buf_of(cl).unwrap();
                arena.fill(buf, &payload).unwrap();
                arena.set_next(cl, out).unwrap();
                out = Some(cl);
            }
            ctx.update(&mut arena, &mut out).unwrap();
            update_sent(&mut arena, ctx.busy(), 16 * 4096).unwrap();
            ctx.update(&mut arena, &mut out).unwrap();
            black_box(ctx.free());
        });
    });
}

/// Benchmark: coalesce 256 contiguous 8 KiB file ranges under a 1 MiB limit.
fn bench_coalesce_file(c: &mut Criterion) {
    let mut arena = Arena::new(bench_config()).unwrap();
    let head = file_chain(&mut arena, FileId(3), 256, 8192).unwrap();

    c.bench_function("coalesce_file_256x8k", |b| {
        b.iter(|| {
            let mut chain = head;
            let total = coalesce_file(&arena, &mut chain, 1 << 20).unwrap();
            black_box((total, chain));
        });
    });
}

criterion_group!(
    benches,
    bench_chain_of_bufs_64,
    bench_update_sent_partial,
    bench_update_chains_reclaim,
    bench_output_ctx_round,
    bench_coalesce_file
);
criterion_main!(benches);
