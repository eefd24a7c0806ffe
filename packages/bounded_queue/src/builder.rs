use std::any::type_name;
use std::fmt;
use std::marker::PhantomData;
use std::num::NonZero;
use std::sync::Arc;

use leak_tracker::AllocationTracker;
use tracing::debug;

use crate::queue::QueueInner;
use crate::{BoundedQueue, ConfigError};

/// Capacity of a queue whose builder was not given one.
pub const DEFAULT_CAPACITY: usize = 64;

/// Builder for configuring a [`BoundedQueue`].
///
/// Obtained from [`BoundedQueue::builder()`].
///
/// # Example
///
/// ```rust
/// use std::sync::Arc;
///
/// use bounded_queue::BoundedQueue;
/// use leak_tracker::AllocationTracker;
///
/// let tracker = Arc::new(AllocationTracker::new());
///
/// let queue = BoundedQueue::<String, usize, ()>::builder()
///     .capacity(16)
///     .tracker(Arc::clone(&tracker))
///     .build()
///     .unwrap();
///
/// let receiver = queue.push("hello".to_string()).unwrap();
/// let (item, sender) = queue.pop().unwrap();
/// sender.resolve(item.len()).unwrap();
///
/// assert_eq!(receiver.wait(), Ok(5));
///
/// drop(sender);
/// drop(receiver);
/// assert!(tracker.leak_report().is_empty());
/// ```
pub struct QueueBuilder<T, R, E> {
    capacity: usize,
    tracker: Option<Arc<AllocationTracker>>,

    _types: PhantomData<fn() -> BoundedQueue<T, R, E>>,
}

impl<T, R, E> QueueBuilder<T, R, E> {
    pub(crate) fn new() -> Self {
        Self {
            capacity: DEFAULT_CAPACITY,
            tracker: None,
            _types: PhantomData,
        }
    }

    /// Sets the maximum number of items the queue holds.
    ///
    /// Default is [`DEFAULT_CAPACITY`]. Must be at least 1.
    #[must_use]
    pub fn capacity(mut self, capacity: usize) -> Self {
        self.capacity = capacity;
        self
    }

    /// Records every queue node and result channel state the queue allocates in `tracker`.
    ///
    /// By default nothing is tracked.
    #[must_use]
    pub fn tracker(mut self, tracker: Arc<AllocationTracker>) -> Self {
        self.tracker = Some(tracker);
        self
    }

    /// Builds the queue with the configured settings.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::ZeroCapacity`] if the capacity is zero.
    pub fn build(self) -> Result<BoundedQueue<T, R, E>, ConfigError> {
        let capacity = NonZero::new(self.capacity).ok_or(ConfigError::ZeroCapacity)?;

        debug!(
            capacity = capacity.get(),
            tracked = self.tracker.is_some(),
            "bounded queue created"
        );

        Ok(BoundedQueue::from_inner(QueueInner::new(
            capacity,
            self.tracker,
        )))
    }
}

impl<T, R, E> fmt::Debug for QueueBuilder<T, R, E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct(type_name::<Self>())
            .field("capacity", &self.capacity)
            .field("tracker", &self.tracker)
            .finish_non_exhaustive()
    }
}
