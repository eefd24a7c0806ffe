use thiserror::Error;

/// A queue could not be created with the requested configuration.
#[derive(Clone, Copy, Debug, Eq, Error, PartialEq)]
#[non_exhaustive]
pub enum ConfigError {
    /// A queue must be able to hold at least one item.
    #[error("queue capacity must be at least 1")]
    ZeroCapacity,
}

/// An item could not be added to the queue.
///
/// The item is handed back to the caller, who still owns it.
#[derive(Clone, Debug, Eq, Error, PartialEq)]
#[non_exhaustive]
pub enum PushError<T> {
    /// The queue was closed before the item could be added.
    #[error("queue is closed")]
    Closed(T),

    /// No capacity became available before the timeout elapsed.
    #[error("timed out waiting for free queue capacity")]
    TimedOut(T),
}

impl<T> PushError<T> {
    /// Returns the item that could not be added.
    #[must_use]
    pub fn into_inner(self) -> T {
        match self {
            Self::Closed(item) | Self::TimedOut(item) => item,
        }
    }

    /// Whether the push failed because the queue is closed.
    #[must_use]
    pub fn is_closed(&self) -> bool {
        matches!(self, Self::Closed(_))
    }
}

/// No item could be taken from the queue.
#[derive(Clone, Copy, Debug, Eq, Error, PartialEq)]
#[non_exhaustive]
pub enum PopError {
    /// The queue is closed and every remaining item has already been taken.
    #[error("queue is closed and drained")]
    Closed,

    /// No item arrived before the timeout elapsed.
    #[error("timed out waiting for an item")]
    TimedOut,
}
