#![cfg_attr(coverage_nightly, feature(coverage_attribute))]

//! Single-use channel that delivers the outcome of some work, a value or an error, from the
//! thread doing the work to the thread waiting for it.
//!
//! A channel is created as a connected [`Sender`]/[`Receiver`] pair via
//! [`ResultChannel::create()`]. The sender resolves the channel at most once, with either
//! [`Sender::resolve()`] or [`Sender::resolve_error()`]. The receiver can block on the outcome
//! ([`Receiver::wait()`], [`Receiver::wait_timeout()`]), check for it without blocking
//! ([`Receiver::try_get()`]) or await it, as the receiver is also a [`Future`].
//!
//! If the sender is dropped without resolving the channel (including when the thread holding
//! it panics), the receiver observes [`ChannelError::SenderDropped`] instead of blocking forever.
//!
//! # Example
//!
//! ```rust
//! use std::thread;
//!
//! use result_channel::{ChannelError, ResultChannel};
//!
//! let (sender, receiver) = ResultChannel::<u32, String>::create();
//!
//! thread::spawn(move || {
//!     sender.resolve(42).unwrap();
//! });
//!
//! assert_eq!(receiver.wait(), Ok(42));
//!
//! // The value has been moved out by the first successful read.
//! assert_eq!(receiver.wait(), Err(ChannelError::AlreadyConsumed));
//! ```
//!
//! # Reading more than once
//!
//! Reads move the outcome out of the channel, so only the first successful read returns it.
//! For cloneable outcomes, [`Receiver::wait_cloned()`] returns a copy and leaves the outcome in
//! place for any number of further reads.
//!
//! # Allocation tracking
//!
//! The shared state of each channel is one heap allocation, made by
//! [`ResultChannel::create()`] and released when both endpoints are gone. Use
//! [`ResultChannel::create_tracked()`] to record it in a [`leak_tracker::AllocationTracker`].
//!
//! [`Future`]: std::future::Future

mod channel;
mod error;
mod receiver;
mod sender;

pub use channel::*;
pub use error::*;
pub use receiver::*;
pub use sender::*;
