//! Tracing setup for integration tests.
//!
//! Library events are only emitted with the `tracing` feature:
//!
//! ```bash
//! RUST_LOG=splitlist_core=debug cargo test -p splitlist-core --features tracing -- --nocapture
//! ```

#![allow(dead_code)]

use std::sync::Once;

use tracing::Level;
use tracing_subscriber::EnvFilter;

static INIT: Once = Once::new();

/// Install a console subscriber once per test binary.
pub fn init_tracing() {
    INIT.call_once(|| {
        let filter = EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| EnvFilter::new(Level::INFO.to_string()));

        // try_init: another test harness may already own the global subscriber
        let _ = tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_thread_ids(true)
            .with_target(true)
            .with_test_writer()
            .try_init();
    });
}
