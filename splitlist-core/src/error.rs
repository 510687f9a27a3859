//! Error types for map construction and bucket sentinel management.

use thiserror::Error;

use crate::data_structures::hash::split_order::MAX_BUCKET;

/// Errors reported by the fallible constructors and sentinel APIs.
///
/// Regular map operations never fail: contention is absorbed internally and
/// absence is reported as `false` or `None`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum MapError {
    /// `SegmentedHashMap` requires a non-zero power-of-two segment count so
    /// that segment selection can be a bit mask.
    #[error("segment count must be a non-zero power of two, got {0}")]
    InvalidSegmentCount(usize),

    /// The bucket index has no distinct sentinel rank.
    #[error("bucket index {0} exceeds the maximum bucket {max}", max = MAX_BUCKET)]
    BucketOutOfRange(usize),
}
