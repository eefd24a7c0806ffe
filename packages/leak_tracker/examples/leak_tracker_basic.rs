//! Records a few allocations, leaks one on purpose and prints the leak report.

use std::sync::Arc;

use leak_tracker::{AllocationTracker, Tracked};

fn main() {
    let tracker = Arc::new(AllocationTracker::new());

    let released = Tracked::new(vec![1, 2, 3], Some(&tracker));
    let leaked = Tracked::new(String::from("never released"), Some(&tracker));

    drop(released);
    std::mem::forget(leaked);

    // A free for an address the tracker has never seen is reported, not fatal.
    if let Err(anomaly) = tracker.record_free(0xdead_beef) {
        println!("anomaly: {anomaly}");
    }

    tracker.leak_report().print_to_stdout();
}
