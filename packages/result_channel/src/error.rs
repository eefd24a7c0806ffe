use thiserror::Error;

/// The sender tried to resolve a channel that has already been resolved.
///
/// The first outcome stays in place; the rejected one is dropped.
#[derive(Clone, Copy, Debug, Eq, Error, PartialEq)]
#[error("result channel has already been resolved")]
#[expect(clippy::exhaustive_structs, reason = "intentionally an empty struct")]
pub struct AlreadyResolved;

/// The receiver could not obtain a value from the channel.
#[derive(Clone, Debug, Eq, Error, PartialEq)]
#[non_exhaustive]
pub enum ChannelError<E> {
    /// The sender resolved the channel with an error.
    #[error("work failed: {0}")]
    Failed(E),

    /// The sender was dropped without resolving the channel, so no outcome will ever arrive.
    #[error("sender dropped without resolving the channel")]
    SenderDropped,

    /// The outcome has already been moved out by an earlier read.
    #[error("outcome has already been consumed")]
    AlreadyConsumed,

    /// The channel was not resolved before the timeout elapsed.
    ///
    /// The channel is unaffected and can be read again later.
    #[error("timed out waiting for the channel to be resolved")]
    TimedOut,
}

impl<E> ChannelError<E> {
    /// Returns the error the sender resolved the channel with, if that is what happened.
    #[must_use]
    pub fn into_failure(self) -> Option<E> {
        match self {
            Self::Failed(error) => Some(error),
            _ => None,
        }
    }
}
