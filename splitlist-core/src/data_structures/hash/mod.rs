//! Hash-keyed concurrent maps.
//!
//! - [`BucketListMap`] - lock-free split-ordered bucket list
//! - [`LockedHashMap`] - single-lock baseline
//! - [`SegmentedHashMap`] - lock-per-segment baseline
//! - [`split_order`] - rank transform shared by keys and bucket sentinels

pub mod bucket_list_map;
pub mod concurrent_map;
pub mod locked_hash_map;
pub mod segmented_hash_map;
pub mod split_order;

pub use bucket_list_map::{BucketListMap, BucketView};
pub use concurrent_map::ConcurrentMap;
pub use locked_hash_map::LockedHashMap;
pub use segmented_hash_map::{DEFAULT_SEGMENTS, SegmentedHashMap};
