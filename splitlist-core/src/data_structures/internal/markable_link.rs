// Markable link: a successor pointer and a deletion mark packed in one word.
//
// Bit layout of the stored pointer:
//   Bit 0: DELETE_MARK - the node OWNING this link is logically deleted
//
// Nodes are at least 8-byte aligned, so bit 0 of a real address is always
// zero. Every update goes through a compare-and-swap over the whole word,
// so reference and mark can never be observed out of sync.
//
use std::sync::atomic::{AtomicPtr, Ordering};

const DELETE_MARK: usize = 0b1;

/// A pointer that uses the least significant bit as the deletion mark.
pub(crate) struct MarkedPtr<T> {
    ptr: *mut T,
}

// Manual impls to avoid requiring T: Clone/Copy
impl<T> Copy for MarkedPtr<T> {}

impl<T> Clone for MarkedPtr<T> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<T> MarkedPtr<T> {
    /// Pack a clean pointer with a mark.
    #[inline]
    pub(crate) fn new(ptr: *mut T, mark: bool) -> Self {
        debug_assert_eq!(ptr as usize & DELETE_MARK, 0, "pointer is not aligned");

        let bits = if mark {
            ptr as usize | DELETE_MARK
        } else {
            ptr as usize
        };
        MarkedPtr {
            ptr: bits as *mut T,
        }
    }

    #[inline]
    fn from_raw(ptr: *mut T) -> Self {
        MarkedPtr { ptr }
    }

    /// Get the clean pointer without the mark (the one you dereference).
    #[inline]
    pub(crate) fn as_ptr(&self) -> *mut T {
        (self.ptr as usize & !DELETE_MARK) as *mut T
    }

    /// Get the raw word with the mark intact (for CAS operations).
    #[inline]
    pub(crate) fn as_raw(&self) -> *mut T {
        self.ptr
    }

    #[inline]
    pub(crate) fn is_marked(&self) -> bool {
        (self.ptr as usize & DELETE_MARK) != 0
    }
}

/// Atomic (reference, mark) cell.
///
/// The only synchronization primitive of the lock-free chain. It supports an
/// atomic read of the pair, a conditional swap of the pair and a conditional
/// mark update, all as a single compare-and-swap on one `AtomicPtr`.
///
pub(crate) struct MarkableLink<T> {
    word: AtomicPtr<T>,
}

impl<T> MarkableLink<T> {
    /// Create an unmarked link.
    pub(crate) fn new(ptr: *mut T) -> Self {
        MarkableLink {
            word: AtomicPtr::new(MarkedPtr::new(ptr, false).as_raw()),
        }
    }

    /// Load reference and mark together (Acquire ordering).
    #[inline]
    pub(crate) fn load(&self) -> MarkedPtr<T> {
        MarkedPtr::from_raw(self.word.load(Ordering::Acquire))
    }

    /// Load only the reference, dropping the mark.
    #[inline]
    pub(crate) fn reference(&self) -> *mut T {
        self.load().as_ptr()
    }

    #[inline]
    pub(crate) fn is_marked(&self) -> bool {
        self.load().is_marked()
    }

    /// Blind store of an unmarked reference.
    ///
    /// Only valid on a link that no other thread can see yet (a node that has
    /// not been published). Published links change through CAS only.
    #[inline]
    pub(crate) fn store_unpublished(&self, ptr: *mut T) {
        self.word
            .store(MarkedPtr::new(ptr, false).as_raw(), Ordering::Relaxed)
    }

    /// Swap (expected_ref, expected_mark) for (new_ref, new_mark).
    ///
    /// AcqRel on success so a freshly linked node's contents are published to
    /// any thread that later loads this link.
    #[inline]
    pub(crate) fn compare_and_set(
        &self,
        expected_ref: *mut T,
        new_ref: *mut T,
        expected_mark: bool,
        new_mark: bool,
    ) -> bool {
        let expected = MarkedPtr::new(expected_ref, expected_mark).as_raw();
        let new = MarkedPtr::new(new_ref, new_mark).as_raw();
        self.word
            .compare_exchange(expected, new, Ordering::AcqRel, Ordering::Acquire)
            .is_ok()
    }

    /// Set the mark if the link is unmarked and still points at `expected_ref`.
    ///
    /// Fails if the link was already marked, so exactly one caller wins the
    /// logical deletion of the owning node.
    #[inline]
    pub(crate) fn attempt_mark(&self, expected_ref: *mut T) -> bool {
        self.compare_and_set(expected_ref, expected_ref, false, true)
    }
}
