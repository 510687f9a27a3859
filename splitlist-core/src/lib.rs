pub mod common_tests;
pub mod data_structures;
pub mod error;
pub mod guard;
mod tracing_helpers;

pub use data_structures::hash::split_order::{MAX_BUCKET, WORD_SIZE};
pub use data_structures::{
    BucketListMap, BucketView, ConcurrentMap, DEFAULT_SEGMENTS, LockedHashMap, SegmentedHashMap,
};
pub use error::MapError;
pub use guard::{DeferredGuard, Guard};

/*

cargo llvm-cov --html

cargo test -p splitlist-core --features tracing -- --nocapture

RUST_LOG=splitlist_core=trace cargo test -p splitlist-core --features tracing bucket_list

*/
