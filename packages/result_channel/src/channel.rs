//! Shared state of a result channel.

use std::any::type_name;
use std::fmt;
use std::mem::{self, size_of};
use std::sync::{Arc, OnceLock};
use std::task::Waker;
use std::time::Instant;

use leak_tracker::{AllocationTracker, TrackedAllocation};
use parking_lot::{Condvar, Mutex};
use tracing::{debug, trace};

use crate::{AlreadyResolved, ChannelError, Receiver, Sender};

/// Lifecycle of the outcome held by a channel.
///
/// `Pending` is the only state the sender can move out of, so the outcome is written at most
/// once. Every other state is terminal except `Resolved`, which becomes `Consumed` when read.
#[derive(Debug)]
enum Outcome<T, E> {
    /// Neither resolved nor abandoned yet.
    Pending,

    /// The sender resolved the channel and nobody has taken the outcome yet.
    Resolved(Result<T, E>),

    /// The outcome has been moved out to the receiver.
    Consumed,

    /// The sender was dropped while the outcome was still pending.
    SenderDropped,
}

impl<T, E> Outcome<T, E> {
    fn is_pending(&self) -> bool {
        matches!(self, Self::Pending)
    }

    /// Moves the outcome out, leaving `Consumed` behind.
    ///
    /// Returns `None` without changing anything if still pending.
    fn take(&mut self) -> Option<Result<T, ChannelError<E>>> {
        match self {
            Self::Pending => None,
            Self::SenderDropped => Some(Err(ChannelError::SenderDropped)),
            Self::Consumed => Some(Err(ChannelError::AlreadyConsumed)),
            Self::Resolved(_) => match mem::replace(self, Self::Consumed) {
                Self::Resolved(Ok(value)) => Some(Ok(value)),
                Self::Resolved(Err(error)) => Some(Err(ChannelError::Failed(error))),
                _ => unreachable!("we are re-matching an already matched pattern"),
            },
        }
    }
}

impl<T, E> Outcome<T, E>
where
    T: Clone,
    E: Clone,
{
    /// Clones the outcome, leaving it in place. Returns `None` if still pending.
    fn peek(&self) -> Option<Result<T, ChannelError<E>>> {
        match self {
            Self::Pending => None,
            Self::SenderDropped => Some(Err(ChannelError::SenderDropped)),
            Self::Consumed => Some(Err(ChannelError::AlreadyConsumed)),
            Self::Resolved(Ok(value)) => Some(Ok(value.clone())),
            Self::Resolved(Err(error)) => Some(Err(ChannelError::Failed(error.clone()))),
        }
    }
}

#[derive(Debug)]
struct ChannelState<T, E> {
    outcome: Outcome<T, E>,

    // Waker of whoever most recently polled the receiver as a future.
    awaiter: Option<Waker>,
}

/// The state shared by the [`Sender`] and [`Receiver`] of one channel.
///
/// Never exposed directly: create a connected pair of endpoints with
/// [`create()`](Self::create) or [`create_tracked()`](Self::create_tracked). The state lives on
/// the heap and is released when both endpoints have been dropped.
///
/// # Example
///
/// ```rust
/// use result_channel::{ChannelError, ResultChannel};
///
/// let (sender, receiver) = ResultChannel::<u32, &str>::create();
///
/// sender.resolve_error("no such user").unwrap();
///
/// assert_eq!(receiver.wait(), Err(ChannelError::Failed("no such user")));
/// ```
pub struct ResultChannel<T, E> {
    state: Mutex<ChannelState<T, E>>,

    // Signalled once, when the outcome leaves the `Pending` state.
    settled: Condvar,

    // Set right after the shared state is placed on the heap, if tracked.
    allocation: OnceLock<TrackedAllocation>,
}

impl<T, E> ResultChannel<T, E> {
    /// Creates a new channel, returning its connected endpoints.
    ///
    /// This is the only place the shared state is allocated.
    #[must_use]
    pub fn create() -> (Sender<T, E>, Receiver<T, E>) {
        Self::create_core(None)
    }

    /// Creates a new channel whose shared state allocation is recorded in `tracker` until both
    /// endpoints have been dropped.
    ///
    /// # Example
    ///
    /// ```rust
    /// use std::sync::Arc;
    ///
    /// use leak_tracker::AllocationTracker;
    /// use result_channel::ResultChannel;
    ///
    /// let tracker = Arc::new(AllocationTracker::new());
    ///
    /// let (sender, receiver) = ResultChannel::<u32, ()>::create_tracked(&tracker);
    /// assert_eq!(tracker.outstanding_count(), 1);
    ///
    /// drop(sender);
    /// drop(receiver);
    /// assert_eq!(tracker.outstanding_count(), 0);
    /// ```
    #[must_use]
    pub fn create_tracked(tracker: &Arc<AllocationTracker>) -> (Sender<T, E>, Receiver<T, E>) {
        Self::create_core(Some(tracker))
    }

    fn create_core(tracker: Option<&Arc<AllocationTracker>>) -> (Sender<T, E>, Receiver<T, E>) {
        let channel = Arc::new(Self {
            state: Mutex::new(ChannelState {
                outcome: Outcome::Pending,
                awaiter: None,
            }),
            settled: Condvar::new(),
            allocation: OnceLock::new(),
        });

        if let Some(tracker) = tracker {
            let address = Arc::as_ptr(&channel).addr();

            // The cell was created empty just above, so this always succeeds.
            _ = channel
                .allocation
                .set(TrackedAllocation::record(tracker, address, size_of::<Self>()));
        }

        (Sender::new(Arc::clone(&channel)), Receiver::new(channel))
    }

    /// Stores the outcome and wakes the receiver, unless an outcome is already stored.
    #[cfg_attr(test, mutants::skip)] // Critical primitive - causes test timeouts if tampered.
    pub(crate) fn settle(&self, result: Result<T, E>) -> Result<(), AlreadyResolved> {
        let is_error = result.is_err();

        let awaiter = {
            let mut state = self.state.lock();

            if !state.outcome.is_pending() {
                return Err(AlreadyResolved);
            }

            state.outcome = Outcome::Resolved(result);
            state.awaiter.take()
        };

        trace!(is_error, "result channel resolved");

        // We wake outside the lock so the receiver does not immediately contend with us.
        self.settled.notify_all();

        if let Some(awaiter) = awaiter {
            awaiter.wake();
        }

        Ok(())
    }

    pub(crate) fn sender_dropped(&self) {
        let awaiter = {
            let mut state = self.state.lock();

            if !state.outcome.is_pending() {
                return;
            }

            state.outcome = Outcome::SenderDropped;
            state.awaiter.take()
        };

        debug!(
            channel = type_name::<Self>(),
            "result channel sender dropped without resolving"
        );

        self.settled.notify_all();

        if let Some(awaiter) = awaiter {
            awaiter.wake();
        }
    }

    pub(crate) fn is_settled(&self) -> bool {
        !self.state.lock().outcome.is_pending()
    }

    pub(crate) fn take(&self) -> Option<Result<T, ChannelError<E>>> {
        self.state.lock().outcome.take()
    }

    /// Blocks until the outcome is no longer pending or `deadline` passes, then takes it.
    ///
    /// Returns `None` only if the deadline passed first.
    pub(crate) fn take_blocking(
        &self,
        deadline: Option<Instant>,
    ) -> Option<Result<T, ChannelError<E>>> {
        let mut state = self.state.lock();

        while state.outcome.is_pending() {
            match deadline {
                Some(deadline) => {
                    if self.settled.wait_until(&mut state, deadline).timed_out() {
                        // One last look, in case the outcome arrived just as we timed out.
                        return state.outcome.take();
                    }
                }
                None => self.settled.wait(&mut state),
            }
        }

        state.outcome.take()
    }

    /// Takes the outcome if present, otherwise registers `waker` to be woken when it arrives.
    pub(crate) fn take_or_register(&self, waker: &Waker) -> Option<Result<T, ChannelError<E>>> {
        let mut state = self.state.lock();

        let taken = state.outcome.take();

        if taken.is_none() {
            // Only the waker from the most recent poll is woken, per the `Future` contract.
            state.awaiter = Some(waker.clone());
        }

        taken
    }

    pub(crate) fn peek_blocking(&self) -> Result<T, ChannelError<E>>
    where
        T: Clone,
        E: Clone,
    {
        let mut state = self.state.lock();

        loop {
            if let Some(outcome) = state.outcome.peek() {
                return outcome;
            }

            self.settled.wait(&mut state);
        }
    }

    #[cfg(test)]
    pub(crate) fn tracked_address(&self) -> Option<usize> {
        self.allocation.get().map(TrackedAllocation::address)
    }
}

impl<T, E> fmt::Debug for ResultChannel<T, E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct(type_name::<Self>())
            .field("is_settled", &self.is_settled())
            .field("allocation", &self.allocation.get())
            .finish_non_exhaustive()
    }
}
