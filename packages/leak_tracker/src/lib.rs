#![cfg_attr(coverage_nightly, feature(coverage_attribute))]

//! Advisory registry of live allocations, used to detect leaks and double frees.
//!
//! Components opt into tracking by recording the address and size of every heap allocation
//! they own when it is acquired and again when it is released. At any point, the registry can
//! be asked which allocations are still outstanding.
//!
//! The core functionality includes:
//! - [`AllocationTracker`] - The registry itself, either process-wide or instantiated per test
//! - [`Tracked`] - A heap box that records its own allocation and release
//! - [`TrackedAllocation`] - A guard that releases a manually recorded allocation when dropped
//! - [`LeakReport`] - A snapshot of outstanding allocations that can be printed
//!
//! The tracker is advisory: anomalies such as freeing an address that was never recorded are
//! reported but never interfere with the allocation or release being observed.
//!
//! # Example
//!
//! ```
//! use std::sync::Arc;
//!
//! use leak_tracker::{AllocationTracker, Tracked};
//!
//! let tracker = Arc::new(AllocationTracker::new());
//!
//! let kept = Tracked::new(String::from("still here"), Some(&tracker));
//! let released = Tracked::new(42_u64, Some(&tracker));
//! drop(released);
//!
//! let leaks = tracker.snapshot_leaks();
//! assert_eq!(leaks.len(), 1);
//! assert_eq!(leaks[0].0, kept.address());
//! ```
//!
//! # Reporting anomalies
//!
//! Every anomaly is returned to the caller, counted, logged via `tracing` and forwarded to an
//! optional hook:
//!
//! ```
//! use std::sync::atomic::{AtomicUsize, Ordering};
//!
//! use leak_tracker::{AllocationTracker, TrackerAnomaly};
//!
//! static SEEN: AtomicUsize = AtomicUsize::new(0);
//!
//! let tracker = AllocationTracker::with_anomaly_hook(|anomaly| {
//!     if matches!(anomaly, TrackerAnomaly::DoubleFreeOrForeign { .. }) {
//!         SEEN.fetch_add(1, Ordering::Relaxed);
//!     }
//! });
//!
//! assert!(tracker.record_free(0x1000).is_err());
//! assert_eq!(SEEN.load(Ordering::Relaxed), 1);
//! assert_eq!(tracker.anomaly_count(), 1);
//! ```

mod anomaly;
mod report;
mod tracked;
mod tracker;

pub use anomaly::*;
pub use report::*;
pub use tracked::*;
pub use tracker::*;
