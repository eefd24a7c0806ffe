#![cfg_attr(coverage_nightly, feature(coverage_attribute))]

//! Bounded work queue shared between producer and consumer threads, where every item carries
//! its own single-use channel for returning the outcome of processing it.
//!
//! A producer [pushes][BoundedQueue::push] an item and gets back a
//! [`Receiver`][result_channel::Receiver]. A consumer [pops][BoundedQueue::pop] the item
//! together with the matching [`Sender`][result_channel::Sender] and resolves it with a value
//! or an error once the work is done. The producer can wait for that outcome right away or
//! keep submitting and collect outcomes later.
//!
//! The queue has a fixed capacity. Producers block while it is full and consumers block while
//! it is empty, with timed variants of both ([`BoundedQueue::try_push()`],
//! [`BoundedQueue::try_pop()`]). [`BoundedQueue::close()`] is the shutdown signal: it wakes
//! all blocked callers and makes further pushes fail, while remaining items can still be
//! popped.
//!
//! A consumer that drops a sender without resolving it, for example because it panicked while
//! processing the item, does not leave the producer hanging: the producer observes
//! [`ChannelError::SenderDropped`][result_channel::ChannelError::SenderDropped].
//!
//! # Example
//!
//! ```rust
//! use std::thread;
//!
//! use bounded_queue::BoundedQueue;
//!
//! let queue = BoundedQueue::<String, usize, String>::new(8).unwrap();
//!
//! let consumer = thread::spawn({
//!     let queue = queue.clone();
//!     move || {
//!         while let Ok((word, sender)) = queue.pop() {
//!             let outcome = if word.is_empty() {
//!                 Err("empty word".to_string())
//!             } else {
//!                 Ok(word.len())
//!             };
//!
//!             sender.resolve_with(outcome).unwrap();
//!         }
//!     }
//! });
//!
//! let receiver = queue.push("backpressure".to_string()).unwrap();
//! assert_eq!(receiver.wait(), Ok(12));
//!
//! queue.close();
//! consumer.join().unwrap();
//! ```
//!
//! # Allocation tracking
//!
//! Each pushed item is stored in a heap-allocated queue node and gets a heap-allocated result
//! channel state. Give the queue a [`leak_tracker::AllocationTracker`] via
//! [`BoundedQueue::builder()`] to record both kinds of allocation, then check
//! [`AllocationTracker::snapshot_leaks()`][leak_tracker::AllocationTracker::snapshot_leaks]
//! once all queue handles and channel endpoints are gone.

mod builder;
mod consumer;
mod error;
mod queue;

pub use builder::*;
pub use error::*;
pub use queue::BoundedQueue;
