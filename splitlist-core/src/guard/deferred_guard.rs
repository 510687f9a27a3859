//! Deferred guard implementation for testing.
//!
//! `DeferredGuard` keeps every retired node alive until the guard itself is
//! dropped, which happens when the owning collection drops. Destruction
//! timing is therefore fully predictable, at the price of unbounded growth
//! for long-running workloads.

#[cfg(debug_assertions)]
use std::collections::HashSet;

use parking_lot::Mutex;

use super::Guard;

/// A simple guard that defers all node destruction until it is dropped.
///
/// # Thread Safety
///
/// Retired nodes are collected from many threads behind a `Mutex`. In debug
/// builds every retired address is recorded, and retiring the same node twice
/// panics: a node must be unlinked (and thus retired) exactly once.
///
pub struct DeferredGuard {
    retired: Mutex<Vec<RetiredNode>>,
    #[cfg(debug_assertions)]
    seen: Mutex<HashSet<usize>>,
}

struct RetiredNode {
    ptr: *mut (),
    dealloc: unsafe fn(*mut ()),
}

// Safety: the pointer is only dereferenced by `dealloc` once, on drop, after
// every thread that could observe it has gone (the collection is being dropped).
unsafe impl Send for RetiredNode {}

impl DeferredGuard {
    pub fn new() -> Self {
        DeferredGuard {
            retired: Mutex::new(Vec::new()),
            #[cfg(debug_assertions)]
            seen: Mutex::new(HashSet::new()),
        }
    }

    /// Number of nodes waiting for destruction.
    pub fn retired_count(&self) -> usize {
        self.retired.lock().len()
    }
}

impl Default for DeferredGuard {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for DeferredGuard {
    fn drop(&mut self) {
        for node in self.retired.get_mut().drain(..) {
            unsafe {
                (node.dealloc)(node.ptr);
            }
        }
    }
}

impl Guard for DeferredGuard {
    /// Protection is provided by the stored guard, so pinning is a no-op.
    type ReadGuard = ();

    fn pin() -> Self::ReadGuard {}

    unsafe fn defer_destroy<N>(&self, node: *mut N, dealloc: unsafe fn(*mut N)) {
        #[cfg(debug_assertions)]
        {
            let addr = node as usize;
            if !self.seen.lock().insert(addr) {
                panic!("node {:#x} retired twice", addr);
            }
        }

        let node = RetiredNode {
            ptr: node as *mut (),
            dealloc: unsafe {
                std::mem::transmute::<unsafe fn(*mut N), unsafe fn(*mut ())>(dealloc)
            },
        };
        self.retired.lock().push(node);
    }
}
