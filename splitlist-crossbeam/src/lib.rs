//! Crossbeam-based reclamation for splitlist maps.
//!
//! This crate provides `EpochGuard`, an implementation of the `Guard` trait
//! using crossbeam-epoch for memory reclamation.
//!
//! # Usage
//!
//! ```ignore
//! use splitlist_crossbeam::EpochBucketListMap;
//!
//! let map: EpochBucketListMap<u64, u64> = EpochBucketListMap::new();
//! map.add(42, 1);
//! ```

use std::collections::hash_map::RandomState;

use splitlist_core::BucketListMap;

pub mod epoch_guard;

pub use epoch_guard::EpochGuard;

/// A [`BucketListMap`] that frees unlinked nodes through the epoch collector.
pub type EpochBucketListMap<K, V, S = RandomState> = BucketListMap<K, V, EpochGuard, S>;
