//! Integration tests for `result_channel` that pass endpoints between real threads.

use std::sync::Arc;
use std::thread;
use std::time::Duration;

use futures::executor::block_on;
use leak_tracker::AllocationTracker;
use result_channel::{AlreadyResolved, ChannelError, ResultChannel};
use testing::with_watchdog;

#[cfg_attr(miri, ignore)]
#[test]
fn value_resolved_on_worker_thread_reaches_blocked_receiver() {
    with_watchdog(|| {
        let (sender, receiver) = ResultChannel::<u32, String>::create();

        let worker = thread::spawn(move || {
            thread::sleep(Duration::from_millis(10));
            sender.resolve(42)
        });

        assert_eq!(receiver.wait(), Ok(42));
        assert_eq!(worker.join().unwrap(), Ok(()));
    });
}

#[cfg_attr(miri, ignore)]
#[test]
fn panicking_worker_releases_receiver_with_sender_dropped() {
    with_watchdog(|| {
        let (sender, receiver) = ResultChannel::<u32, String>::create();

        let worker = thread::spawn(move || {
            let _sender = sender;
            panic!("worker failed before resolving");
        });

        assert_eq!(receiver.wait(), Err(ChannelError::SenderDropped));
        worker.join().unwrap_err();
    });
}

#[cfg_attr(miri, ignore)]
#[test]
fn only_one_of_racing_resolvers_wins() {
    with_watchdog(|| {
        let (sender, receiver) = ResultChannel::<usize, ()>::create();
        let sender = Arc::new(sender);

        let resolvers: Vec<_> = (0..8)
            .map(|i| {
                let sender = Arc::clone(&sender);
                thread::spawn(move || sender.resolve(i))
            })
            .collect();

        let winners = resolvers
            .into_iter()
            .map(|resolver| resolver.join().unwrap())
            .filter(|outcome| *outcome != Err(AlreadyResolved))
            .count();

        assert_eq!(winners, 1);

        let value = receiver.wait().unwrap();
        assert!(value < 8);
        assert_eq!(receiver.wait(), Err(ChannelError::AlreadyConsumed));
    });
}

#[cfg_attr(miri, ignore)]
#[test]
fn timed_out_wait_can_be_followed_by_successful_wait() {
    with_watchdog(|| {
        let (sender, receiver) = ResultChannel::<&str, ()>::create();

        assert_eq!(
            receiver.wait_timeout(Duration::from_millis(5)),
            Err(ChannelError::TimedOut)
        );

        let worker = thread::spawn(move || sender.resolve("late").unwrap());

        assert_eq!(receiver.wait_timeout(Duration::from_secs(5)), Ok("late"));
        worker.join().unwrap();
    });
}

#[cfg_attr(miri, ignore)]
#[test]
fn awaited_receiver_is_woken_by_worker() {
    with_watchdog(|| {
        let (sender, receiver) = ResultChannel::<u32, &str>::create();

        let worker = thread::spawn(move || {
            thread::sleep(Duration::from_millis(10));
            sender.resolve_error("unsupported").unwrap();
        });

        assert_eq!(
            block_on(receiver),
            Err(ChannelError::Failed("unsupported"))
        );
        worker.join().unwrap();
    });
}

#[cfg_attr(miri, ignore)]
#[test]
fn tracked_channels_leave_no_leaks_once_endpoints_are_gone() {
    with_watchdog(|| {
        let tracker = Arc::new(AllocationTracker::new());

        let receivers: Vec<_> = (0..32_u32)
            .map(|i| {
                let (sender, receiver) = ResultChannel::<u32, ()>::create_tracked(&tracker);
                thread::spawn(move || sender.resolve(i).unwrap());
                receiver
            })
            .collect();

        let total: u32 = receivers.iter().map(|r| r.wait().unwrap()).sum();
        assert_eq!(total, (0..32).sum());

        // Worker threads may still be dropping their senders, but every receiver is still alive.
        assert_eq!(tracker.outstanding_count(), 32);

        drop(receivers);

        // The last sender may be dropped slightly after its receiver observed the value.
        while tracker.outstanding_count() != 0 {
            thread::yield_now();
        }

        assert!(tracker.leak_report().is_empty());
        assert_eq!(tracker.anomaly_count(), 0);
    });
}
