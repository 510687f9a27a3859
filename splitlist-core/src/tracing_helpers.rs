//! Zero-cost logging macros.
//!
//! With the `tracing` feature enabled these forward to the `tracing` crate.
//! Without it (the default) they expand to nothing, so the lock-free paths
//! carry no logging cost.
//!
//! ```bash
//! RUST_LOG=splitlist_core=trace cargo test -p splitlist-core --features tracing
//! ```

#![allow(unused_macros, unused_imports)]

/// Trace-level logging. Used on CAS retry paths.
#[cfg(feature = "tracing")]
macro_rules! trace_log {
    ($($arg:tt)*) => {
        tracing::trace!($($arg)*)
    };
}

#[cfg(not(feature = "tracing"))]
macro_rules! trace_log {
    ($($arg:tt)*) => {};
}

/// Debug-level logging. Used for structural events (construction, sentinels).
#[cfg(feature = "tracing")]
macro_rules! debug_log {
    ($($arg:tt)*) => {
        tracing::debug!($($arg)*)
    };
}

#[cfg(not(feature = "tracing"))]
macro_rules! debug_log {
    ($($arg:tt)*) => {};
}

pub(crate) use debug_log;
pub(crate) use trace_log;
