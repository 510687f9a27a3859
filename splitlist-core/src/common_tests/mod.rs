//! Shared test suites, generic over [`ConcurrentMap`](crate::ConcurrentMap).
//!
//! Each map implementation (and each reclamation guard) runs the same suites
//! from its own integration tests.

pub mod map_stress_tests;
