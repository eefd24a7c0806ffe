#![expect(missing_docs, reason = "benchmarks")]

use std::hint::black_box;
use std::sync::Arc;
use std::thread;

use bounded_queue::BoundedQueue;
use criterion::{Criterion, criterion_group, criterion_main};
use leak_tracker::AllocationTracker;

fn entrypoint(c: &mut Criterion) {
    let mut g = c.benchmark_group("queue_round_trip");

    g.bench_function("same_thread", |b| {
        let queue = BoundedQueue::<u64, u64, ()>::new(1).unwrap();

        b.iter(|| {
            let receiver = queue.push(black_box(42)).unwrap();
            queue.process_next(Ok).unwrap();
            black_box(receiver.wait().unwrap());
        });
    });

    g.bench_function("same_thread_tracked", |b| {
        let tracker = Arc::new(AllocationTracker::new());
        let queue = BoundedQueue::<u64, u64, ()>::builder()
            .capacity(1)
            .tracker(tracker)
            .build()
            .unwrap();

        b.iter(|| {
            let receiver = queue.push(black_box(42)).unwrap();
            queue.process_next(Ok).unwrap();
            black_box(receiver.wait().unwrap());
        });
    });

    g.bench_function("cross_thread", |b| {
        let queue = BoundedQueue::<u64, u64, ()>::new(16).unwrap();

        let consumer = thread::spawn({
            let queue = queue.clone();
            move || queue.serve(Ok)
        });

        b.iter(|| {
            let receiver = queue.push(black_box(42)).unwrap();
            black_box(receiver.wait().unwrap());
        });

        queue.close();
        consumer.join().unwrap();
    });

    g.finish();
}

criterion_group!(benches, entrypoint);
criterion_main!(benches);
