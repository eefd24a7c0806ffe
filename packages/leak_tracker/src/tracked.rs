//! Opt-in tracking for individual heap allocations.

use std::fmt;
use std::mem::size_of;
use std::ops::{Deref, DerefMut};
use std::ptr;
use std::sync::Arc;

use crate::AllocationTracker;

/// Keeps an allocation recorded in an [`AllocationTracker`] until dropped, at which point the
/// release is recorded.
///
/// Use this when the allocation itself is managed elsewhere (for example, the heap block behind
/// an `Arc`) and only the bookkeeping needs to follow its lifetime. Store the guard inside the
/// allocated value so both go away together.
///
/// # Examples
///
/// ```
/// use std::sync::Arc;
///
/// use leak_tracker::{AllocationTracker, TrackedAllocation};
///
/// let tracker = Arc::new(AllocationTracker::new());
///
/// let guard = TrackedAllocation::record(&tracker, 0x1000, 128);
/// assert_eq!(tracker.outstanding_count(), 1);
///
/// drop(guard);
/// assert_eq!(tracker.outstanding_count(), 0);
/// ```
pub struct TrackedAllocation {
    tracker: Arc<AllocationTracker>,
    address: usize,
    size: usize,
}

impl TrackedAllocation {
    /// Records an allocation of `size` bytes at `address` and returns the guard that will
    /// record its release.
    ///
    /// Anomalies are reported through the tracker's own channels (counter, log, hook).
    #[must_use]
    pub fn record(tracker: &Arc<AllocationTracker>, address: usize, size: usize) -> Self {
        // Reported by the tracker itself; the allocation proceeds regardless.
        _ = tracker.record_alloc(address, size);

        Self {
            tracker: Arc::clone(tracker),
            address,
            size,
        }
    }

    /// The recorded address.
    #[must_use]
    pub fn address(&self) -> usize {
        self.address
    }

    /// The recorded size in bytes.
    #[must_use]
    pub fn size(&self) -> usize {
        self.size
    }
}

impl Drop for TrackedAllocation {
    fn drop(&mut self) {
        // Reported by the tracker itself; the release proceeds regardless.
        _ = self.tracker.record_free(self.address);
    }
}

impl fmt::Debug for TrackedAllocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TrackedAllocation")
            .field("address", &format_args!("{:#x}", self.address))
            .field("size", &self.size)
            .finish()
    }
}

/// A heap-allocated value whose allocation is recorded in an [`AllocationTracker`].
///
/// The allocation is recorded on creation and its release is recorded when the value is
/// dropped or moved out via [`into_inner()`](Self::into_inner). Without a tracker, this is
/// just a box.
///
/// Zero-sized values do not occupy heap memory and are never recorded.
///
/// # Examples
///
/// ```
/// use std::sync::Arc;
///
/// use leak_tracker::{AllocationTracker, Tracked};
///
/// let tracker = Arc::new(AllocationTracker::new());
///
/// let node = Tracked::new([0_u8; 32], Some(&tracker));
/// assert_eq!(tracker.snapshot_leaks(), vec![(node.address(), 32)]);
///
/// let bytes = node.into_inner();
/// assert_eq!(bytes.len(), 32);
/// assert!(tracker.snapshot_leaks().is_empty());
/// ```
pub struct Tracked<T> {
    // `None` if untracked or zero-sized. Declared before `value` so the release is recorded
    // while the memory is still ours, before the address can be handed out again.
    allocation: Option<TrackedAllocation>,

    value: Box<T>,
}

impl<T> Tracked<T> {
    /// Moves `value` to the heap, recording the allocation if a tracker is given.
    #[must_use]
    pub fn new(value: T, tracker: Option<&Arc<AllocationTracker>>) -> Self {
        let value = Box::new(value);

        let allocation = tracker.filter(|_| size_of::<T>() != 0).map(|tracker| {
            TrackedAllocation::record(tracker, ptr::from_ref::<T>(&value).addr(), size_of::<T>())
        });

        Self { allocation, value }
    }

    /// Address of the heap allocation holding the value.
    #[must_use]
    pub fn address(&self) -> usize {
        ptr::from_ref::<T>(&self.value).addr()
    }

    /// Whether the allocation is recorded in a tracker.
    #[must_use]
    pub fn is_tracked(&self) -> bool {
        self.allocation.is_some()
    }

    /// Moves the value out of the heap, recording the release.
    #[must_use]
    pub fn into_inner(self) -> T {
        let Self { allocation, value } = self;
        drop(allocation);
        *value
    }
}

impl<T> Deref for Tracked<T> {
    type Target = T;

    fn deref(&self) -> &T {
        &self.value
    }
}

impl<T> DerefMut for Tracked<T> {
    fn deref_mut(&mut self) -> &mut T {
        &mut self.value
    }
}

impl<T> fmt::Debug for Tracked<T>
where
    T: fmt::Debug,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Tracked")
            .field("value", &self.value)
            .field("allocation", &self.allocation)
            .finish()
    }
}
