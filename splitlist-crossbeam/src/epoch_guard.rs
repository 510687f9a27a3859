//! Epoch-based guard implementation using crossbeam-epoch.
//!
//! `EpochGuard` is a zero-sized type that schedules destruction using the
//! global epoch collector. A map parameterized with it frees unlinked nodes
//! once every thread pinned at unlink time has moved on, instead of holding
//! them until the map drops:
//!
//! ```text
//! BucketListMap<K, V, EpochGuard>
//!     │
//!     ├── every operation: epoch::pin() for its whole traversal
//!     └── unlink: defer_unchecked(dealloc) on the global collector
//! ```
//!
//! # Example
//!
//! ```rust,ignore
//! use splitlist_core::BucketListMap;
//! use splitlist_crossbeam::EpochGuard;
//!
//! let map: BucketListMap<u64, String, EpochGuard> = BucketListMap::new();
//! map.add(42, "answer".to_string());
//! map.remove(&42);
//! ```

use crossbeam_epoch::{self as epoch, Guard as CrossbeamGuard};
use splitlist_core::guard::Guard;

/// Epoch-based memory reclamation guard.
///
/// Nodes are not freed until all threads have advanced past the epoch in
/// which they were unlinked. Reclamation may therefore run after the owning
/// map is gone, on whichever thread happens to collect, so keys and values
/// of an epoch-guarded map should be `Send + 'static`.
///
/// # Performance
///
/// - **Pin overhead**: Very low (thread-local check)
/// - **Reclamation**: Batched, amortized O(1) per node
/// - **Memory**: May accumulate while some thread stays pinned
///
#[derive(Debug, Clone, Copy, Default)]
pub struct EpochGuard;

impl EpochGuard {
    pub fn new() -> Self {
        EpochGuard
    }
}

impl Guard for EpochGuard {
    /// A real crossbeam guard: the thread stays pinned while it is alive.
    type ReadGuard = CrossbeamGuard;

    fn pin() -> Self::ReadGuard {
        epoch::pin()
    }

    unsafe fn defer_destroy<N>(&self, node: *mut N, dealloc: unsafe fn(*mut N)) {
        // Usually nested inside the operation's own pin; re-pinning is cheap.
        let guard = epoch::pin();
        unsafe {
            guard.defer_unchecked(move || {
                dealloc(node);
            });
        }
    }
}
