use std::any::type_name;
use std::fmt;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};
use std::time::{Duration, Instant};

use crate::{ChannelError, ResultChannel};

/// Obtains the outcome delivered through a [`ResultChannel`].
///
/// Every read method can be called any number of times. The first read that finds the channel
/// resolved moves the outcome out; later reads return [`ChannelError::AlreadyConsumed`].
/// If the sender was dropped without resolving the channel, every read returns
/// [`ChannelError::SenderDropped`].
///
/// The receiver is also a [`Future`] that completes with the same result as
/// [`wait()`](Self::wait).
///
/// # Example
///
/// ```rust
/// use std::thread;
/// use std::time::Duration;
///
/// use result_channel::{ChannelError, ResultChannel};
///
/// let (sender, receiver) = ResultChannel::<u32, ()>::create();
///
/// assert_eq!(receiver.try_get(), None);
/// assert_eq!(
///     receiver.wait_timeout(Duration::from_millis(1)),
///     Err(ChannelError::TimedOut)
/// );
///
/// thread::spawn(move || sender.resolve(7).unwrap());
///
/// assert_eq!(receiver.wait(), Ok(7));
/// ```
pub struct Receiver<T, E> {
    channel: Arc<ResultChannel<T, E>>,
}

impl<T, E> Receiver<T, E> {
    pub(crate) fn new(channel: Arc<ResultChannel<T, E>>) -> Self {
        Self { channel }
    }

    /// Blocks the current thread until the channel is resolved or the sender is dropped.
    ///
    /// # Errors
    ///
    /// * [`ChannelError::Failed`] if the sender resolved the channel with an error.
    /// * [`ChannelError::SenderDropped`] if the sender was dropped without resolving.
    /// * [`ChannelError::AlreadyConsumed`] if an earlier read already took the outcome.
    pub fn wait(&self) -> Result<T, ChannelError<E>> {
        loop {
            // Only a passed deadline makes this come back empty and there is none.
            if let Some(result) = self.channel.take_blocking(None) {
                return result;
            }
        }
    }

    /// Blocks the current thread until the channel is resolved, the sender is dropped or
    /// `timeout` elapses.
    ///
    /// # Errors
    ///
    /// Same as [`wait()`](Self::wait), plus [`ChannelError::TimedOut`] if the timeout elapses
    /// first. A timed out read does not consume anything.
    pub fn wait_timeout(&self, timeout: Duration) -> Result<T, ChannelError<E>> {
        // A timeout too large to represent as a deadline is the same as no timeout.
        let deadline = Instant::now().checked_add(timeout);

        self.channel
            .take_blocking(deadline)
            .unwrap_or(Err(ChannelError::TimedOut))
    }

    /// Returns the outcome if the channel is no longer pending, without blocking.
    ///
    /// Returns `None` if the channel has not been resolved yet and the sender still exists.
    #[must_use]
    pub fn try_get(&self) -> Option<Result<T, ChannelError<E>>> {
        self.channel.take()
    }

    /// Whether a read would return without blocking.
    #[must_use]
    pub fn is_ready(&self) -> bool {
        self.channel.is_settled()
    }

    /// Blocks like [`wait()`](Self::wait) but returns a clone of the outcome, leaving it in the
    /// channel for further reads.
    ///
    /// # Errors
    ///
    /// Same as [`wait()`](Self::wait).
    ///
    /// # Example
    ///
    /// ```rust
    /// use result_channel::ResultChannel;
    ///
    /// let (sender, receiver) = ResultChannel::<String, ()>::create();
    /// sender.resolve("shared".to_string()).unwrap();
    ///
    /// assert_eq!(receiver.wait_cloned(), Ok("shared".to_string()));
    /// assert_eq!(receiver.wait_cloned(), Ok("shared".to_string()));
    /// assert_eq!(receiver.wait(), Ok("shared".to_string()));
    /// ```
    pub fn wait_cloned(&self) -> Result<T, ChannelError<E>>
    where
        T: Clone,
        E: Clone,
    {
        self.channel.peek_blocking()
    }
}

impl<T, E> Future for Receiver<T, E> {
    type Output = Result<T, ChannelError<E>>;

    fn poll(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        self.channel
            .take_or_register(cx.waker())
            .map_or(Poll::Pending, Poll::Ready)
    }
}

impl<T, E> fmt::Debug for Receiver<T, E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct(type_name::<Self>())
            .field("channel", &self.channel)
            .finish()
    }
}

#[cfg(test)]
#[cfg_attr(coverage_nightly, coverage(off))]
mod tests {
    use std::thread;

    use futures::executor::block_on;
    use static_assertions::{assert_impl_all, assert_not_impl_any};
    use testing::with_watchdog;

    use super::*;

    assert_impl_all!(Receiver<u32, String>: Send, Sync, Unpin);
    assert_not_impl_any!(Receiver<u32, String>: Clone);

    #[test]
    fn wait_returns_value_resolved_on_other_thread() {
        with_watchdog(|| {
            let (sender, receiver) = ResultChannel::<u32, ()>::create();

            let resolver = thread::spawn(move || sender.resolve(42).unwrap());

            assert_eq!(receiver.wait(), Ok(42));
            resolver.join().unwrap();
        });
    }

    #[test]
    fn wait_after_consumption_reports_already_consumed() {
        let (sender, receiver) = ResultChannel::<String, ()>::create();
        sender.resolve("once".to_string()).unwrap();

        assert_eq!(receiver.wait(), Ok("once".to_string()));
        assert_eq!(receiver.wait(), Err(ChannelError::AlreadyConsumed));
        assert_eq!(receiver.try_get(), Some(Err(ChannelError::AlreadyConsumed)));
    }

    #[test]
    fn wait_unblocks_when_sender_dropped_on_other_thread() {
        with_watchdog(|| {
            let (sender, receiver) = ResultChannel::<u32, ()>::create();

            let dropper = thread::spawn(move || {
                thread::sleep(Duration::from_millis(20));
                drop(sender);
            });

            assert_eq!(receiver.wait(), Err(ChannelError::SenderDropped));
            dropper.join().unwrap();
        });
    }

    #[test]
    fn wait_timeout_expires_without_consuming() {
        with_watchdog(|| {
            let (sender, receiver) = ResultChannel::<u32, ()>::create();

            assert_eq!(
                receiver.wait_timeout(Duration::from_millis(10)),
                Err(ChannelError::TimedOut)
            );

            sender.resolve(3).unwrap();
            assert_eq!(receiver.wait_timeout(Duration::from_secs(5)), Ok(3));
        });
    }

    #[test]
    fn wait_timeout_with_huge_timeout_still_completes() {
        with_watchdog(|| {
            let (sender, receiver) = ResultChannel::<u32, ()>::create();
            sender.resolve(1).unwrap();

            assert_eq!(receiver.wait_timeout(Duration::MAX), Ok(1));
        });
    }

    #[test]
    fn try_get_is_none_while_pending() {
        let (sender, receiver) = ResultChannel::<u32, ()>::create();

        assert!(!receiver.is_ready());
        assert_eq!(receiver.try_get(), None);

        sender.resolve(9).unwrap();

        assert!(receiver.is_ready());
        assert_eq!(receiver.try_get(), Some(Ok(9)));
    }

    #[test]
    fn wait_cloned_allows_repeated_reads_of_errors() {
        let (sender, receiver) = ResultChannel::<u32, String>::create();
        sender.resolve_error("bad input".to_string()).unwrap();

        for _ in 0..3 {
            assert_eq!(
                receiver.wait_cloned(),
                Err(ChannelError::Failed("bad input".to_string()))
            );
        }
    }

    #[test]
    fn await_receives_value() {
        with_watchdog(|| {
            let (sender, receiver) = ResultChannel::<u32, ()>::create();

            let resolver = thread::spawn(move || {
                thread::sleep(Duration::from_millis(10));
                sender.resolve(11).unwrap();
            });

            assert_eq!(block_on(receiver), Ok(11));
            resolver.join().unwrap();
        });
    }

    #[test]
    fn await_reports_sender_dropped() {
        with_watchdog(|| {
            let (sender, receiver) = ResultChannel::<u32, ()>::create();

            let dropper = thread::spawn(move || {
                thread::sleep(Duration::from_millis(10));
                drop(sender);
            });

            assert_eq!(block_on(receiver), Err(ChannelError::SenderDropped));
            dropper.join().unwrap();
        });
    }
}
