#![cfg_attr(coverage_nightly, feature(coverage_attribute))]
#![cfg_attr(coverage_nightly, coverage(off))] // This is all test code, no need to test it.

//! Private helpers for tests and examples in the work queue packages.

use std::env;
use std::panic;
use std::sync::mpsc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

/// How long [`assert_still_blocked()`] gives an operation to (wrongly) complete.
pub const BLOCKED_GRACE_PERIOD: Duration = Duration::from_millis(50);

/// Runs a test with a timeout to prevent infinite hangs.
///
/// If the test takes longer than the timeout, the calling thread panics instead of blocking
/// the test run forever. The timeout is 10 seconds under normal conditions and 60 seconds
/// under Miri, where thread synchronization is much slower.
///
/// When the `MUTATION_TESTING` environment variable is set to "1", the watchdog is disabled
/// and the test function is executed directly, so mutation testing can detect hanging
/// mutations.
///
/// # Panics
///
/// Panics if the test exceeds the timeout (when not in mutation testing mode) or if the test
/// itself panics.
///
/// # Example
///
/// ```rust
/// use testing::with_watchdog;
///
/// let answer = with_watchdog(|| 6 * 7);
/// assert_eq!(answer, 42);
/// ```
pub fn with_watchdog<F, R>(test_fn: F) -> R
where
    F: FnOnce() -> R + Send + 'static,
    R: Send + 'static,
{
    if env::var("MUTATION_TESTING").as_deref() == Ok("1") {
        return test_fn();
    }

    let (tx, rx) = mpsc::channel();

    let test_handle = thread::spawn(move || {
        let result = test_fn();
        // If this fails, the receiver has already timed out.
        drop(tx.send(result));
    });

    let timeout = if cfg!(miri) {
        Duration::from_secs(60)
    } else {
        Duration::from_secs(10)
    };

    match rx.recv_timeout(timeout) {
        Ok(result) => {
            test_handle.join().expect("test thread should not panic");
            result
        }
        Err(mpsc::RecvTimeoutError::Timeout) => {
            panic!("test exceeded {timeout:?} timeout");
        }
        Err(mpsc::RecvTimeoutError::Disconnected) => match test_handle.join() {
            Ok(()) => panic!("test thread disconnected unexpectedly"),
            Err(payload) => panic::resume_unwind(payload),
        },
    }
}

/// Asserts that the thread behind `handle` is still running a blocking operation.
///
/// Waits for [`BLOCKED_GRACE_PERIOD`] first, so an operation that should block but does not
/// has time to complete and fail the assertion.
///
/// # Panics
///
/// Panics if the thread has finished.
///
/// # Example
///
/// ```rust
/// use std::sync::mpsc;
/// use std::thread;
///
/// use testing::assert_still_blocked;
///
/// let (tx, rx) = mpsc::channel::<()>();
/// let waiter = thread::spawn(move || rx.recv().is_ok());
///
/// assert_still_blocked(&waiter);
///
/// tx.send(()).unwrap();
/// assert!(waiter.join().unwrap());
/// ```
pub fn assert_still_blocked<T>(handle: &JoinHandle<T>) {
    thread::sleep(BLOCKED_GRACE_PERIOD);

    assert!(
        !handle.is_finished(),
        "operation completed although it was expected to still be blocked"
    );
}
