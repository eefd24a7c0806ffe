//! The queue itself and the state shared by all of its handles.

use std::any::type_name;
use std::collections::VecDeque;
use std::fmt;
use std::mem;
use std::num::NonZero;
use std::sync::Arc;
use std::time::{Duration, Instant};

use leak_tracker::{AllocationTracker, Tracked};
use parking_lot::{Condvar, Mutex, MutexGuard};
use result_channel::{Receiver, ResultChannel, Sender};
use tracing::{debug, trace};

use crate::{ConfigError, PopError, PushError, QueueBuilder};

/// One resident work item plus the sender that returns its outcome to the producer.
struct QueueNode<T, R, E> {
    item: T,
    sender: Sender<R, E>,
}

struct QueueState<T, R, E> {
    // Front is the oldest item. Never longer than the queue capacity.
    nodes: VecDeque<Tracked<QueueNode<T, R, E>>>,

    // Only ever goes from false to true.
    closed: bool,
}

pub(crate) struct QueueInner<T, R, E> {
    state: Mutex<QueueState<T, R, E>>,

    // Signalled when an item is added or the queue is closed.
    not_empty: Condvar,

    // Signalled when an item is removed or the queue is closed.
    not_full: Condvar,

    capacity: NonZero<usize>,
    tracker: Option<Arc<AllocationTracker>>,
}

impl<T, R, E> QueueInner<T, R, E> {
    pub(crate) fn new(capacity: NonZero<usize>, tracker: Option<Arc<AllocationTracker>>) -> Self {
        Self {
            state: Mutex::new(QueueState {
                nodes: VecDeque::with_capacity(capacity.get()),
                closed: false,
            }),
            not_empty: Condvar::new(),
            not_full: Condvar::new(),
            capacity,
            tracker,
        }
    }
}

/// Waits on `condvar` for as long as `blocked` holds or until `deadline` passes.
///
/// Returns `false` if the deadline passed while still blocked.
fn wait_while<S>(
    condvar: &Condvar,
    state: &mut MutexGuard<'_, S>,
    deadline: Option<Instant>,
    blocked: impl Fn(&S) -> bool,
) -> bool {
    while blocked(state) {
        match deadline {
            Some(deadline) => {
                if condvar.wait_until(state, deadline).timed_out() {
                    return !blocked(state);
                }
            }
            None => condvar.wait(state),
        }
    }

    true
}

/// Fixed-capacity FIFO queue of work items shared between any number of producers and
/// consumers.
///
/// Every pushed item is paired with a fresh single-use result channel. The producer gets the
/// [`Receiver`] back from [`push()`](Self::push) and the consumer that pops the item gets the
/// matching [`Sender`], which it uses to report the outcome of processing the item.
///
/// The queue applies backpressure: producers block while it is full and consumers block while
/// it is empty. [`close()`](Self::close) wakes everyone and makes further pushes fail, while
/// pops keep returning the remaining items until the queue is drained.
///
/// Handles are cheap to clone and all refer to the same queue. When the last handle is
/// dropped, items still in the queue are dropped with their senders, so their producers
/// observe [`ChannelError::SenderDropped`][result_channel::ChannelError::SenderDropped].
///
/// # Type parameters
///
/// * `T` - the work item.
/// * `R` - the value a consumer produces on success.
/// * `E` - the error a consumer produces on failure.
///
/// # Example
///
/// ```rust
/// use std::thread;
///
/// use bounded_queue::BoundedQueue;
///
/// let queue = BoundedQueue::<u64, u64, String>::new(4).unwrap();
///
/// let consumer = thread::spawn({
///     let queue = queue.clone();
///     move || queue.serve(|n| n.checked_mul(n).ok_or_else(|| format!("{n} is too big")))
/// });
///
/// let small = queue.push(12).unwrap();
/// let huge = queue.push(u64::MAX).unwrap();
///
/// assert_eq!(small.wait(), Ok(144));
/// assert!(huge.wait().is_err());
///
/// queue.close();
/// assert_eq!(consumer.join().unwrap(), 2);
/// ```
pub struct BoundedQueue<T, R, E> {
    inner: Arc<QueueInner<T, R, E>>,
}

impl<T, R, E> BoundedQueue<T, R, E> {
    /// Creates a queue that holds at most `capacity` items, without allocation tracking.
    ///
    /// Use [`builder()`](Self::builder) to configure allocation tracking.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::ZeroCapacity`] if `capacity` is zero.
    pub fn new(capacity: usize) -> Result<Self, ConfigError> {
        Self::builder().capacity(capacity).build()
    }

    /// Creates a builder for configuring a queue.
    #[must_use]
    pub fn builder() -> QueueBuilder<T, R, E> {
        QueueBuilder::new()
    }

    pub(crate) fn from_inner(inner: QueueInner<T, R, E>) -> Self {
        Self {
            inner: Arc::new(inner),
        }
    }

    /// Adds an item to the back of the queue, blocking while the queue is full.
    ///
    /// Returns the receiver through which the consumer that processes the item reports the
    /// outcome.
    ///
    /// # Errors
    ///
    /// Returns [`PushError::Closed`] with the item if the queue is closed before there is room
    /// for it. Nothing is added in that case.
    pub fn push(&self, item: T) -> Result<Receiver<R, E>, PushError<T>> {
        self.push_core(item, None)
    }

    /// Adds an item to the back of the queue, waiting at most `timeout` for room.
    ///
    /// # Errors
    ///
    /// Returns [`PushError::Closed`] with the item if the queue is closed before there is room
    /// for it, or [`PushError::TimedOut`] with the item if the timeout elapses first.
    pub fn try_push(&self, item: T, timeout: Duration) -> Result<Receiver<R, E>, PushError<T>> {
        // A timeout too large to represent as a deadline is the same as no timeout.
        self.push_core(item, Instant::now().checked_add(timeout))
    }

    fn push_core(
        &self,
        item: T,
        deadline: Option<Instant>,
    ) -> Result<Receiver<R, E>, PushError<T>> {
        // The channel and the node are allocated (and recorded in the tracker) before the queue
        // lock is taken, so the queue lock is never held together with another lock.
        let (sender, receiver) = match &self.inner.tracker {
            Some(tracker) => ResultChannel::create_tracked(tracker),
            None => ResultChannel::create(),
        };

        let node = Tracked::new(QueueNode { item, sender }, self.inner.tracker.as_ref());

        let capacity = self.inner.capacity.get();
        let mut state = self.inner.state.lock();

        let has_room = wait_while(&self.inner.not_full, &mut state, deadline, |state| {
            !state.closed && state.nodes.len() >= capacity
        });

        if state.closed || !has_room {
            let closed = state.closed;
            drop(state);

            let QueueNode { item, sender } = node.into_inner();
            drop(sender);

            return Err(if closed {
                PushError::Closed(item)
            } else {
                PushError::TimedOut(item)
            });
        }

        state.nodes.push_back(node);
        let len = state.nodes.len();
        drop(state);

        self.inner.not_empty.notify_one();

        trace!(len, capacity, "item pushed to bounded queue");

        Ok(receiver)
    }

    /// Removes the item at the front of the queue, blocking while the queue is empty.
    ///
    /// Returns the item together with the sender the caller uses to report the outcome of
    /// processing it. Dropping the sender without resolving it tells the producer that no
    /// outcome will arrive.
    ///
    /// # Errors
    ///
    /// Returns [`PopError::Closed`] if the queue is closed and empty. Items still in the queue
    /// when it is closed can be popped as usual.
    pub fn pop(&self) -> Result<(T, Sender<R, E>), PopError> {
        self.pop_core(None)
    }

    /// Removes the item at the front of the queue, waiting at most `timeout` for one to arrive.
    ///
    /// # Errors
    ///
    /// Returns [`PopError::Closed`] if the queue is closed and empty, or [`PopError::TimedOut`]
    /// if the timeout elapses first.
    pub fn try_pop(&self, timeout: Duration) -> Result<(T, Sender<R, E>), PopError> {
        self.pop_core(Instant::now().checked_add(timeout))
    }

    fn pop_core(&self, deadline: Option<Instant>) -> Result<(T, Sender<R, E>), PopError> {
        let (node, len) = {
            let mut state = self.inner.state.lock();

            let has_item = wait_while(&self.inner.not_empty, &mut state, deadline, |state| {
                !state.closed && state.nodes.is_empty()
            });

            if !has_item {
                return Err(PopError::TimedOut);
            }

            // Without a timeout we only get here with an item or with the queue closed.
            let Some(node) = state.nodes.pop_front() else {
                return Err(PopError::Closed);
            };

            (node, state.nodes.len())
        };

        self.inner.not_full.notify_one();

        trace!(
            len,
            capacity = self.inner.capacity.get(),
            "item popped from bounded queue"
        );

        // Releasing the node touches the tracker, so it happens after the queue lock is gone.
        let QueueNode { item, sender } = node.into_inner();

        Ok((item, sender))
    }

    /// Closes the queue, waking every blocked producer and consumer.
    ///
    /// Blocked and future pushes fail with [`PushError::Closed`]. Pops keep returning the items
    /// still in the queue and then fail with [`PopError::Closed`]. Closing an already closed
    /// queue has no effect.
    #[cfg_attr(test, mutants::skip)] // Critical primitive - causes test timeouts if tampered.
    pub fn close(&self) {
        let (was_closed, len) = {
            let mut state = self.inner.state.lock();
            (mem::replace(&mut state.closed, true), state.nodes.len())
        };

        if was_closed {
            return;
        }

        debug!(
            remaining = len,
            capacity = self.inner.capacity.get(),
            "bounded queue closed"
        );

        self.inner.not_empty.notify_all();
        self.inner.not_full.notify_all();
    }

    /// Number of items currently in the queue.
    #[must_use]
    pub fn len(&self) -> usize {
        self.inner.state.lock().nodes.len()
    }

    /// Whether the queue currently holds no items.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.inner.state.lock().nodes.is_empty()
    }

    /// Maximum number of items the queue holds.
    #[must_use]
    pub fn capacity(&self) -> usize {
        self.inner.capacity.get()
    }

    /// Whether [`close()`](Self::close) has been called.
    #[must_use]
    pub fn is_closed(&self) -> bool {
        self.inner.state.lock().closed
    }

    /// The tracker that records the allocations made by this queue, if any.
    #[must_use]
    pub fn tracker(&self) -> Option<&Arc<AllocationTracker>> {
        self.inner.tracker.as_ref()
    }
}

impl<T, R, E> Clone for BoundedQueue<T, R, E> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<T, R, E> fmt::Debug for BoundedQueue<T, R, E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let (len, closed) = {
            let state = self.inner.state.lock();
            (state.nodes.len(), state.closed)
        };

        f.debug_struct(type_name::<Self>())
            .field("len", &len)
            .field("capacity", &self.inner.capacity)
            .field("closed", &closed)
            .field("tracked", &self.inner.tracker.is_some())
            .finish()
    }
}

#[cfg(test)]
#[cfg_attr(coverage_nightly, coverage(off))]
mod tests {
    use std::thread;

    use result_channel::ChannelError;
    use static_assertions::{assert_impl_all, assert_not_impl_any};
    use testing::{assert_still_blocked, with_watchdog};

    use super::*;

    assert_impl_all!(BoundedQueue<u32, u32, String>: Send, Sync, Clone);
    assert_not_impl_any!(BoundedQueue<std::rc::Rc<u32>, u32, String>: Send, Sync);

    #[test]
    fn new_rejects_zero_capacity() {
        assert_eq!(
            BoundedQueue::<u32, u32, ()>::new(0).unwrap_err(),
            ConfigError::ZeroCapacity
        );
    }

    #[test]
    fn pop_order_matches_push_order() {
        let queue = BoundedQueue::<u32, (), ()>::new(8).unwrap();

        let _receivers: Vec<_> = (0..8).map(|i| queue.push(i).unwrap()).collect();

        let popped: Vec<_> = (0..8).map(|_| queue.pop().unwrap().0).collect();
        assert_eq!(popped, (0..8).collect::<Vec<_>>());
    }

    #[test]
    fn len_tracks_occupancy() {
        let queue = BoundedQueue::<&str, (), ()>::new(3).unwrap();
        assert!(queue.is_empty());
        assert_eq!(queue.capacity(), 3);

        let _a = queue.push("a").unwrap();
        let _b = queue.push("b").unwrap();
        assert_eq!(queue.len(), 2);

        _ = queue.pop().unwrap();
        assert_eq!(queue.len(), 1);
        assert!(!queue.is_empty());
    }

    #[test]
    fn try_push_times_out_when_full_and_returns_item() {
        with_watchdog(|| {
            let queue = BoundedQueue::<String, (), ()>::new(1).unwrap();
            let _first = queue.push("first".to_string()).unwrap();

            let error = queue
                .try_push("second".to_string(), Duration::from_millis(10))
                .unwrap_err();

            assert_eq!(error, PushError::TimedOut("second".to_string()));
            assert_eq!(queue.len(), 1);
        });
    }

    #[test]
    fn try_pop_times_out_when_empty() {
        with_watchdog(|| {
            let queue = BoundedQueue::<u32, (), ()>::new(1).unwrap();

            assert_eq!(
                queue.try_pop(Duration::from_millis(10)).unwrap_err(),
                PopError::TimedOut
            );
        });
    }

    #[test]
    fn push_after_close_fails_immediately() {
        let queue = BoundedQueue::<u32, (), ()>::new(2).unwrap();
        queue.close();

        assert_eq!(queue.push(5).unwrap_err(), PushError::Closed(5));
        assert_eq!(
            queue.try_push(6, Duration::from_secs(60)).unwrap_err(),
            PushError::Closed(6)
        );
        assert!(queue.is_empty());
    }

    #[test]
    fn pop_drains_remaining_items_after_close() {
        let queue = BoundedQueue::<u32, (), ()>::new(2).unwrap();
        let _receiver = queue.push(1).unwrap();

        queue.close();
        queue.close();
        assert!(queue.is_closed());

        assert_eq!(queue.pop().unwrap().0, 1);
        assert_eq!(queue.pop().unwrap_err(), PopError::Closed);
        assert_eq!(
            queue.try_pop(Duration::from_secs(60)).unwrap_err(),
            PopError::Closed
        );
    }

    #[test]
    fn close_wakes_blocked_pop() {
        with_watchdog(|| {
            let queue = BoundedQueue::<u32, (), ()>::new(1).unwrap();

            let consumer = thread::spawn({
                let queue = queue.clone();
                move || queue.pop().map(|(item, _)| item)
            });

            assert_still_blocked(&consumer);

            queue.close();
            assert_eq!(consumer.join().unwrap(), Err(PopError::Closed));
        });
    }

    #[test]
    fn close_wakes_blocked_push() {
        with_watchdog(|| {
            let queue = BoundedQueue::<u32, (), ()>::new(1).unwrap();
            let _first = queue.push(1).unwrap();

            let producer = thread::spawn({
                let queue = queue.clone();
                move || queue.push(2).map(drop)
            });

            assert_still_blocked(&producer);

            queue.close();
            assert_eq!(producer.join().unwrap(), Err(PushError::Closed(2)));
            assert_eq!(queue.len(), 1);
        });
    }

    #[test]
    fn dropping_queue_drops_resident_senders() {
        let queue = BoundedQueue::<u32, u32, ()>::new(2).unwrap();
        let receiver = queue.push(1).unwrap();

        drop(queue);

        assert_eq!(receiver.wait(), Err(ChannelError::SenderDropped));
    }

    #[test]
    fn rejected_push_releases_tracked_allocations() {
        let tracker = Arc::new(AllocationTracker::new());
        let queue = BoundedQueue::<u64, u64, ()>::builder()
            .capacity(1)
            .tracker(Arc::clone(&tracker))
            .build()
            .unwrap();

        let receiver = queue.push(1).unwrap();

        // One channel state plus one node.
        assert_eq!(tracker.outstanding_count(), 2);

        assert_eq!(
            queue.try_push(2, Duration::ZERO).unwrap_err(),
            PushError::TimedOut(2)
        );
        assert_eq!(tracker.outstanding_count(), 2);

        let (item, sender) = queue.pop().unwrap();
        assert_eq!(item, 1);

        // The node is released on pop, the channel state lives on with its endpoints.
        assert_eq!(tracker.outstanding_count(), 1);

        sender.resolve(10).unwrap();
        drop(sender);
        assert_eq!(receiver.wait(), Ok(10));
        drop(receiver);

        assert!(tracker.snapshot_leaks().is_empty());
        assert_eq!(tracker.anomaly_count(), 0);
    }

    #[test]
    fn debug_output_reports_occupancy() {
        let queue = BoundedQueue::<u32, (), ()>::new(4).unwrap();
        let _receiver = queue.push(1).unwrap();

        let debug = format!("{queue:?}");

        assert!(debug.contains("len: 1"));
        assert!(debug.contains("capacity: 4"));
        assert!(debug.contains("closed: false"));
    }
}
