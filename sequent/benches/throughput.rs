//! Pipeline throughput benchmarks.
//!
//! Measures the cost of the three hot paths: assembling a workflow,
//! pushing a burst through a two-stage pipeline, and raw cursor
//! hand-off.

use criterion::{black_box, criterion_group, criterion_main, Criterion};
use sequent::prelude::*;
use sequent::store::Cursor;

fn two_stage_spec() -> WorkflowSpec {
    WorkflowSpec::new()
        .group(GroupSpec::new("parse").handler("count"))
        .group(GroupSpec::new("index").handler("count").wait_for("parse"))
        .publisher("bench")
        .capacity(1024)
}

fn counting_handlers() -> HandlerRegistry<u64> {
    let mut handlers = HandlerRegistry::new();
    handlers.register_fn("count", |_: &u64, _| Ok(()));
    handlers
}

fn pipeline_benchmarks(c: &mut Criterion) {
    let rt = tokio::runtime::Runtime::new().unwrap();
    let mut group = c.benchmark_group("pipeline");

    group.bench_function("build_and_shutdown_two_groups", |b| {
        b.iter(|| {
            rt.block_on(async {
                let workflow = build_workflow(two_stage_spec(), counting_handlers())
                    .await
                    .unwrap();
                workflow.shutdown().await;
            })
        })
    });

    group.bench_function("publish_drain_100_events", |b| {
        let workflow = Arc::new(rt.block_on(async {
            build_workflow(two_stage_spec(), counting_handlers())
                .await
                .unwrap()
        }));

        b.iter(|| {
            rt.block_on(async {
                let mut last = 0;
                for i in 0..100u64 {
                    last = workflow.publish("bench", black_box(i)).await.unwrap();
                }
                while workflow.status("index").map(|s| s.cursor) != Some(last) {
                    tokio::task::yield_now().await;
                }
            })
        });

        rt.block_on(async { workflow.shutdown().await });
    });

    group.finish();
}

fn cursor_benchmarks(c: &mut Criterion) {
    let mut group = c.benchmark_group("cursor");

    group.bench_function("advance_and_read", |b| {
        let cursor = Cursor::new();
        let mut next = 0i64;
        b.iter(|| {
            cursor.advance(black_box(next));
            next += 1;
            black_box(cursor.get())
        })
    });

    group.finish();
}

criterion_group!(benches, pipeline_benchmarks, cursor_benchmarks);
criterion_main!(benches);
