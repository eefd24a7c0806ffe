//! Runs a small pool of consumer threads over a bounded queue, with one consumer that crashes
//! on a particular input, and checks for leaked allocations at the end.

use std::sync::Arc;
use std::thread;

use bounded_queue::BoundedQueue;
use leak_tracker::AllocationTracker;
use result_channel::ChannelError;

const CRASHING_INPUT: u64 = 13;

fn collatz_steps(mut n: u64) -> Result<u32, String> {
    if n == 0 {
        return Err("zero has no Collatz sequence".to_string());
    }

    if n == CRASHING_INPUT {
        panic!("simulated consumer crash on {n}");
    }

    let mut steps: u32 = 0;

    while n != 1 {
        n = if n % 2 == 0 {
            n >> 1
        } else {
            n.checked_mul(3)
                .and_then(|n| n.checked_add(1))
                .ok_or_else(|| "sequence overflowed u64".to_string())?
        };
        steps = steps.saturating_add(1);
    }

    Ok(steps)
}

fn main() {
    let tracker = Arc::new(AllocationTracker::new());

    let queue = BoundedQueue::<u64, u32, String>::builder()
        .capacity(4)
        .tracker(Arc::clone(&tracker))
        .build()
        .expect("capacity is not zero");

    let consumers: Vec<_> = (0..3)
        .map(|_| {
            let queue = queue.clone();
            thread::spawn(move || queue.serve(collatz_steps))
        })
        .collect();

    let receivers: Vec<_> = (0..20)
        .map(|n| (n, queue.push(n).expect("queue is open")))
        .collect();

    for (n, receiver) in receivers {
        match receiver.wait() {
            Ok(steps) => println!("{n:>3}: {steps} steps"),
            Err(ChannelError::Failed(reason)) => println!("{n:>3}: failed: {reason}"),
            Err(ChannelError::SenderDropped) => println!("{n:>3}: consumer crashed"),
            Err(other) => println!("{n:>3}: {other}"),
        }
    }

    queue.close();

    for consumer in consumers {
        match consumer.join() {
            Ok(processed) => println!("consumer finished after {processed} items"),
            Err(_) => println!("consumer thread panicked"),
        }
    }

    drop(queue);

    let report = tracker.leak_report();
    println!("outstanding allocations: {}", report.len());
    report.print_to_stdout();
}
