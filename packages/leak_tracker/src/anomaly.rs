use thiserror::Error;

/// An inconsistency observed by an [`AllocationTracker`][crate::AllocationTracker].
///
/// Anomalies are bug signals in the code being observed, not failures of the tracker. The
/// registry stays consistent after reporting one.
#[derive(Clone, Copy, Debug, Eq, Error, PartialEq)]
#[non_exhaustive]
pub enum TrackerAnomaly {
    /// An allocation was recorded for an address that already had a live record, meaning the
    /// previous allocation at that address was released without being recorded as released.
    ///
    /// The new record replaces the old one.
    #[error(
        "allocation at {address:#x} ({size} bytes) recorded while a previous allocation of \
         {previous_size} bytes at the same address is still live"
    )]
    DuplicateAllocation {
        /// The address that was recorded twice.
        address: usize,

        /// Size of the record that was replaced.
        previous_size: usize,

        /// Size of the new record.
        size: usize,
    },

    /// A release was recorded for an address with no live record: either the allocation was
    /// already released (double free) or it was never recorded by this tracker.
    #[error("release of {address:#x} does not match any live allocation (double free or foreign pointer)")]
    DoubleFreeOrForeign {
        /// The address that was released.
        address: usize,
    },
}

impl TrackerAnomaly {
    /// The address the anomaly refers to.
    #[must_use]
    pub fn address(&self) -> usize {
        match self {
            Self::DuplicateAllocation { address, .. } | Self::DoubleFreeOrForeign { address } => {
                *address
            }
        }
    }
}

#[cfg(test)]
#[cfg_attr(coverage_nightly, coverage(off))]
mod tests {
    use std::fmt::Debug;

    use static_assertions::assert_impl_all;

    use super::*;

    assert_impl_all!(TrackerAnomaly: Send, Sync, Debug, Copy);

    #[test]
    fn address_is_exposed_for_every_variant() {
        let duplicate = TrackerAnomaly::DuplicateAllocation {
            address: 0x10,
            previous_size: 8,
            size: 16,
        };
        let foreign = TrackerAnomaly::DoubleFreeOrForeign { address: 0x20 };

        assert_eq!(duplicate.address(), 0x10);
        assert_eq!(foreign.address(), 0x20);
    }

    #[test]
    fn display_mentions_address_in_hex() {
        let foreign = TrackerAnomaly::DoubleFreeOrForeign { address: 0xabc };

        assert!(foreign.to_string().contains("0xabc"));
    }
}
