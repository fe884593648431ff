// Copyright 2024 Google LLC
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// https://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or https://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use dealpar::{Backend, CallbackPair, Capabilities, System, WorkCategory};
use std::hint::black_box;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

const NUM_THREADS: &[usize] = &[1, 2, 4, 8];
const WORK_PER_WORKER: &[u64] = &[0, 10_000, 1_000_000];

/// Overhead of an initialize + run cycle, for each backend and worker count.
fn dispatch(c: &mut Criterion) {
    let mut group = c.benchmark_group("dispatch");
    for &work in WORK_PER_WORKER {
        for backend in Capabilities::global().iter() {
            for &num_threads in NUM_THREADS {
                if backend == Backend::Direct && num_threads != 1 {
                    continue;
                }
                group.throughput(Throughput::Elements(num_threads as u64 * work));
                group.bench_with_input(
                    BenchmarkId::new(format!("{backend}@{num_threads}"), work),
                    &work,
                    |bencher, &work| {
                        let mut system = busy_system(backend, num_threads, work);
                        bencher.iter(|| {
                            system.initialize().unwrap();
                            system.run(1).unwrap();
                        })
                    },
                );
            }
        }
    }
    group.finish();
}

/// A system whose workers each sum `work` integers.
fn busy_system(backend: Backend, num_threads: usize, work: u64) -> System {
    let sink = Arc::new(AtomicU64::new(0));
    let mut system = System::new();
    system.register_callbacks(
        WorkCategory::Solve,
        CallbackPair::new(
            move |_| {
                let sum = (0..black_box(work)).sum::<u64>();
                sink.fetch_add(sum, Ordering::Relaxed);
            },
            |_| (),
        ),
    );
    system.configure(WorkCategory::Solve, num_threads).unwrap();
    system.prefer_backend(backend).unwrap();
    system
}

criterion_group!(benches, dispatch);
criterion_main!(benches);
