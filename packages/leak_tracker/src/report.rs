//! Leak reports.

use std::fmt;

/// Snapshot of the allocations outstanding in an
/// [`AllocationTracker`][crate::AllocationTracker] at the time it was taken.
///
/// # Examples
///
/// ```
/// use leak_tracker::AllocationTracker;
///
/// let tracker = AllocationTracker::new();
/// tracker.record_alloc(0x1000, 64).unwrap();
///
/// let report = tracker.leak_report();
/// assert_eq!(report.len(), 1);
/// assert_eq!(report.total_bytes(), 64);
///
/// // Prints a table of outstanding allocations, or nothing if the report is empty.
/// report.print_to_stdout();
/// ```
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct LeakReport {
    // Ordered by address.
    leaks: Vec<(usize, usize)>,
}

impl LeakReport {
    pub(crate) fn new(leaks: Vec<(usize, usize)>) -> Self {
        Self { leaks }
    }

    /// Whether no allocations were outstanding.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.leaks.is_empty()
    }

    /// Number of outstanding allocations.
    #[must_use]
    pub fn len(&self) -> usize {
        self.leaks.len()
    }

    /// Sum of the sizes of all outstanding allocations.
    #[must_use]
    pub fn total_bytes(&self) -> u64 {
        self.leaks.iter().fold(0_u64, |total, (_, size)| {
            total.saturating_add(u64::try_from(*size).unwrap_or(u64::MAX))
        })
    }

    /// Iterates over the outstanding `(address, size)` pairs in address order.
    pub fn leaks(&self) -> impl Iterator<Item = (usize, usize)> + '_ {
        self.leaks.iter().copied()
    }

    /// Prints the report to stdout.
    ///
    /// Prints nothing if there are no outstanding allocations, so a clean run stays silent.
    #[cfg_attr(test, mutants::skip)] // Too difficult to test stdout output reliably - manually tested.
    pub fn print_to_stdout(&self) {
        if self.is_empty() {
            return;
        }
        println!("{self}");
    }
}

impl fmt::Display for LeakReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_empty() {
            return writeln!(f, "No outstanding allocations.");
        }

        writeln!(
            f,
            "{} outstanding allocations, {} bytes in total:",
            self.len(),
            self.total_bytes()
        )?;

        for (address, size) in self.leaks() {
            writeln!(f, "  {address:#018x}  {size:>10} bytes")?;
        }

        Ok(())
    }
}
