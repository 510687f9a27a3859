//! Data structures for concurrent maps.
//!
//! # Organization
//!
//! - [`hash`] - The lock-free bucket list and the lock-based baselines
//! - [`internal`] - Internal implementation details (pub(crate))

pub mod hash;
pub(crate) mod internal;

pub use hash::{
    BucketListMap, BucketView, ConcurrentMap, DEFAULT_SEGMENTS, LockedHashMap, SegmentedHashMap,
};
