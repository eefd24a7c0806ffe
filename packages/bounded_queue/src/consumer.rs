//! Helpers for consumers that turn each item into an outcome with a plain function.

use tracing::debug;

use crate::{BoundedQueue, PopError};

impl<T, R, E> BoundedQueue<T, R, E> {
    /// Pops the next item, blocking while the queue is empty, and resolves its result channel
    /// with whatever `f` returns for it.
    ///
    /// If `f` panics, the panic propagates to the caller and the item's sender is dropped on
    /// the way out, so the producer observes
    /// [`ChannelError::SenderDropped`][result_channel::ChannelError::SenderDropped].
    ///
    /// # Errors
    ///
    /// Returns [`PopError::Closed`] if the queue is closed and empty.
    ///
    /// # Example
    ///
    /// ```rust
    /// use bounded_queue::BoundedQueue;
    /// use result_channel::ChannelError;
    ///
    /// let queue = BoundedQueue::<&str, u16, String>::new(2).unwrap();
    ///
    /// let good = queue.push("8080").unwrap();
    /// let bad = queue.push("http").unwrap();
    ///
    /// for _ in 0..2 {
    ///     queue
    ///         .process_next(|text| text.parse().map_err(|_| format!("not a port: {text}")))
    ///         .unwrap();
    /// }
    ///
    /// assert_eq!(good.wait(), Ok(8080));
    /// assert_eq!(
    ///     bad.wait(),
    ///     Err(ChannelError::Failed("not a port: http".to_string()))
    /// );
    /// ```
    pub fn process_next<F>(&self, f: F) -> Result<(), PopError>
    where
        F: FnOnce(T) -> Result<R, E>,
    {
        let (item, sender) = self.pop()?;

        let outcome = f(item);

        // We own the only sender of this channel, so it cannot already be resolved.
        _ = sender.resolve_with(outcome);

        Ok(())
    }

    /// Processes items with `f` until the queue is closed and drained, returning the number of
    /// items processed.
    ///
    /// Any number of threads can serve the same queue. A panic in `f` ends serving on this
    /// thread, with the same effect on the current item as in
    /// [`process_next()`](Self::process_next).
    pub fn serve<F>(&self, mut f: F) -> usize
    where
        F: FnMut(T) -> Result<R, E>,
    {
        let mut processed: usize = 0;

        while self.process_next(&mut f).is_ok() {
            processed = processed.saturating_add(1);
        }

        debug!(processed, "bounded queue consumer finished serving");

        processed
    }
}
