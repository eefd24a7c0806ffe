use std::any::type_name;
use std::fmt;
use std::sync::Arc;

use crate::{AlreadyResolved, ResultChannel};

/// Resolves a [`ResultChannel`] with the outcome of some work.
///
/// The channel can be resolved at most once. Dropping the sender without resolving the channel
/// tells the receiver that no outcome will ever arrive.
///
/// # Example
///
/// ```rust
/// use result_channel::{AlreadyResolved, ResultChannel};
///
/// let (sender, receiver) = ResultChannel::<&str, ()>::create();
///
/// sender.resolve("first").unwrap();
/// assert_eq!(sender.resolve("second"), Err(AlreadyResolved));
///
/// assert_eq!(receiver.wait(), Ok("first"));
/// ```
pub struct Sender<T, E> {
    channel: Arc<ResultChannel<T, E>>,
}

impl<T, E> Sender<T, E> {
    pub(crate) fn new(channel: Arc<ResultChannel<T, E>>) -> Self {
        Self { channel }
    }

    /// Resolves the channel with a value and wakes the receiver.
    ///
    /// # Errors
    ///
    /// Returns [`AlreadyResolved`] if the channel has already been resolved. The earlier outcome
    /// is kept and `value` is dropped.
    pub fn resolve(&self, value: T) -> Result<(), AlreadyResolved> {
        self.channel.settle(Ok(value))
    }

    /// Resolves the channel with an error and wakes the receiver.
    ///
    /// # Errors
    ///
    /// Returns [`AlreadyResolved`] if the channel has already been resolved. The earlier outcome
    /// is kept and `error` is dropped.
    pub fn resolve_error(&self, error: E) -> Result<(), AlreadyResolved> {
        self.channel.settle(Err(error))
    }

    /// Resolves the channel with either a value or an error.
    ///
    /// # Errors
    ///
    /// Returns [`AlreadyResolved`] if the channel has already been resolved.
    pub fn resolve_with(&self, result: Result<T, E>) -> Result<(), AlreadyResolved> {
        self.channel.settle(result)
    }

    /// Whether the channel has been resolved.
    #[must_use]
    pub fn is_resolved(&self) -> bool {
        self.channel.is_settled()
    }

    #[cfg(test)]
    pub(crate) fn channel(&self) -> &ResultChannel<T, E> {
        &self.channel
    }
}

impl<T, E> Drop for Sender<T, E> {
    fn drop(&mut self) {
        self.channel.sender_dropped();
    }
}

impl<T, E> fmt::Debug for Sender<T, E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct(type_name::<Self>())
            .field("channel", &self.channel)
            .finish()
    }
}
