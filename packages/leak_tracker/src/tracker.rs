//! The allocation registry.

use std::collections::HashMap;
use std::fmt;
use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{self, AtomicU64};
use std::sync::{Arc, LazyLock};

use parking_lot::Mutex;
use tracing::warn;

use crate::{LeakReport, TrackerAnomaly};

type AnomalyHook = Box<dyn Fn(&TrackerAnomaly) + Send + Sync>;

// Never dropped, so records made through it stay valid for the whole process lifetime.
static GLOBAL: LazyLock<Arc<AllocationTracker>> =
    LazyLock::new(|| Arc::new(AllocationTracker::new()));

/// Registry mapping the addresses of live allocations to their sizes.
///
/// Every allocation a component wants to account for is recorded with
/// [`record_alloc()`](Self::record_alloc) when acquired and with
/// [`record_free()`](Self::record_free) when released. Whatever is still recorded after all
/// expected work has completed is a leak, visible via [`snapshot_leaks()`](Self::snapshot_leaks).
///
/// The tracker is advisory. Inconsistencies are reported as [`TrackerAnomaly`] values but the
/// tracker never panics or blocks the operation it observes beyond a short critical section.
///
/// # Examples
///
/// ```
/// use leak_tracker::AllocationTracker;
///
/// let tracker = AllocationTracker::new();
///
/// tracker.record_alloc(0x1000, 64).unwrap();
/// tracker.record_alloc(0x2000, 32).unwrap();
/// tracker.record_free(0x1000).unwrap();
///
/// assert_eq!(tracker.snapshot_leaks(), vec![(0x2000, 32)]);
/// ```
pub struct AllocationTracker {
    records: Mutex<HashMap<usize, usize>>,

    anomaly_count: AtomicU64,

    anomaly_hook: Option<AnomalyHook>,
}

impl AllocationTracker {
    /// Creates an empty tracker, independent of every other tracker.
    ///
    /// Independent trackers are useful in tests, where the process-wide
    /// [`global()`](Self::global) tracker would mix records from concurrently running tests.
    #[must_use]
    pub fn new() -> Self {
        Self {
            records: Mutex::new(HashMap::new()),
            anomaly_count: AtomicU64::new(0),
            anomaly_hook: None,
        }
    }

    /// Creates an empty tracker that forwards every anomaly to `hook`.
    ///
    /// The hook is called after the registry lock has been released. A panic inside the hook
    /// is caught and logged, so a faulty hook cannot disturb the observed code.
    #[must_use]
    pub fn with_anomaly_hook<F>(hook: F) -> Self
    where
        F: Fn(&TrackerAnomaly) + Send + Sync + 'static,
    {
        Self {
            anomaly_hook: Some(Box::new(hook)),
            ..Self::new()
        }
    }

    /// The process-wide tracker.
    ///
    /// It is created on first use and lives until the process exits.
    #[must_use]
    pub fn global() -> &'static Arc<Self> {
        &GLOBAL
    }

    /// Records that `size` bytes have been allocated at `address`.
    ///
    /// If `address` already has a live record, the record is overwritten with the new size and
    /// a [`TrackerAnomaly::DuplicateAllocation`] is reported.
    ///
    /// # Errors
    ///
    /// Returns the reported anomaly, if any. The registry is updated either way.
    pub fn record_alloc(&self, address: usize, size: usize) -> Result<(), TrackerAnomaly> {
        let previous = self.records.lock().insert(address, size);

        match previous {
            None => Ok(()),
            Some(previous_size) => Err(self.report(TrackerAnomaly::DuplicateAllocation {
                address,
                previous_size,
                size,
            })),
        }
    }

    /// Records that the allocation at `address` has been released, returning its recorded size.
    ///
    /// # Errors
    ///
    /// Returns [`TrackerAnomaly::DoubleFreeOrForeign`] if `address` has no live record. The
    /// caller is expected to proceed with the release regardless.
    pub fn record_free(&self, address: usize) -> Result<usize, TrackerAnomaly> {
        let removed = self.records.lock().remove(&address);

        removed.ok_or_else(|| self.report(TrackerAnomaly::DoubleFreeOrForeign { address }))
    }

    /// Returns every outstanding `(address, size)` record, ordered by address.
    ///
    /// An empty result means there were no leaks at the time of the call.
    #[must_use]
    pub fn snapshot_leaks(&self) -> Vec<(usize, usize)> {
        let mut leaks: Vec<_> = self
            .records
            .lock()
            .iter()
            .map(|(address, size)| (*address, *size))
            .collect();

        leaks.sort_unstable();
        leaks
    }

    /// Returns a printable snapshot of the outstanding records.
    #[must_use]
    pub fn leak_report(&self) -> LeakReport {
        LeakReport::new(self.snapshot_leaks())
    }

    /// Number of allocations currently recorded as live.
    #[must_use]
    pub fn outstanding_count(&self) -> usize {
        self.records.lock().len()
    }

    /// Total size of the allocations currently recorded as live.
    #[must_use]
    pub fn outstanding_bytes(&self) -> u64 {
        self.records
            .lock()
            .values()
            .fold(0_u64, |total, size| {
                total.saturating_add(u64::try_from(*size).unwrap_or(u64::MAX))
            })
    }

    /// Number of anomalies reported over the lifetime of this tracker.
    #[must_use]
    pub fn anomaly_count(&self) -> u64 {
        self.anomaly_count.load(atomic::Ordering::Relaxed)
    }

    fn report(&self, anomaly: TrackerAnomaly) -> TrackerAnomaly {
        // Relaxed is sufficient: the counter is purely diagnostic.
        self.anomaly_count.fetch_add(1, atomic::Ordering::Relaxed);

        warn!(address = anomaly.address(), %anomaly, "allocation tracker anomaly");

        if let Some(hook) = &self.anomaly_hook {
            if panic::catch_unwind(AssertUnwindSafe(|| hook(&anomaly))).is_err() {
                warn!(
                    address = anomaly.address(),
                    "allocation tracker anomaly hook panicked; panic discarded"
                );
            }
        }

        anomaly
    }
}

impl Default for AllocationTracker {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for AllocationTracker {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AllocationTracker")
            .field("outstanding_count", &self.outstanding_count())
            .field("anomaly_count", &self.anomaly_count())
            .field("has_anomaly_hook", &self.anomaly_hook.is_some())
            .finish()
    }
}
