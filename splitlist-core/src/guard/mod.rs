//! Guard trait for memory reclamation strategies.
//!
//! A lock-free chain cannot free a node the moment it is unlinked: another
//! thread may have loaded a pointer to it just before the unlink and still be
//! walking through it. The `Guard` trait abstracts over when it becomes safe
//! to free such a node:
//!
//! ```text
//! BucketListMap<K, V, G: Guard>
//!     │
//!     ├── BucketListMap<K, V, EpochGuard>      (production, splitlist-crossbeam)
//!     └── BucketListMap<K, V, DeferredGuard>   (testing, frees on drop)
//! ```
//!
//! # Example
//!
//! ```rust,ignore
//! use splitlist_core::{BucketListMap, DeferredGuard};
//! use splitlist_crossbeam::EpochGuard;
//!
//! // Production: epoch-based reclamation
//! let map: BucketListMap<u64, String, EpochGuard> = BucketListMap::new();
//!
//! // Testing: unlinked nodes are kept until the map drops
//! let test_map: BucketListMap<u64, String, DeferredGuard> = BucketListMap::new();
//! ```

mod deferred_guard;

pub use deferred_guard::DeferredGuard;

/// A memory reclamation guard that protects concurrent access to nodes.
///
/// # Safety Contract
///
/// Implementations must ensure that a node passed to `defer_destroy` is not
/// freed while any thread that pinned a `ReadGuard` before the call still
/// holds that `ReadGuard`.
///
/// # Design Note
///
/// The guard is stored in the collection and must be `Send + Sync`. It is
/// only used to schedule destruction; pinning happens per operation through
/// [`Guard::pin`].
///
pub trait Guard: Sized + Default + Send + Sync {
    /// An active guard that protects reads for its lifetime.
    ///
    /// For epoch-based guards this is a pinned `crossbeam_epoch::Guard`. For
    /// `DeferredGuard` it is `()`, since nothing is freed before the
    /// collection itself drops.
    ///
    type ReadGuard;

    /// Pin an active read guard for the duration of one operation.
    fn pin() -> Self::ReadGuard;

    /// Schedule a node for deferred destruction.
    ///
    /// # Safety
    ///
    /// - `node` must be a valid pointer allocated by the collection
    /// - `node` must be unreachable from the collection
    /// - `node` must be scheduled at most once
    /// - `dealloc` must be the correct deallocation function for `node`
    ///
    unsafe fn defer_destroy<N>(&self, node: *mut N, dealloc: unsafe fn(*mut N));
}
