use std::collections::hash_map::RandomState;
use std::fmt;
use std::hash::{BuildHasher, Hash};
use std::marker::PhantomData;
use std::ptr::{self, NonNull};

use crate::data_structures::hash::ConcurrentMap;
use crate::data_structures::hash::split_order::{self, MAX_BUCKET, MAX_RANK, MIN_RANK};
use crate::data_structures::internal::MarkableLink;
use crate::error::MapError;
use crate::guard::Guard;
use crate::tracing_helpers::{debug_log, trace_log};

type NodePtr<K, V> = *mut ListNode<K, V>;

struct ListNode<K, V> {
    rank: u64,
    entry: Option<(K, V)>,
    next: MarkableLink<ListNode<K, V>>,
}

impl<K, V> ListNode<K, V> {
    fn new(rank: u64, key: K, value: V) -> Self {
        ListNode {
            rank,
            entry: Some((key, value)),
            next: MarkableLink::new(ptr::null_mut()),
        }
    }

    fn new_sentinel(rank: u64, next: NodePtr<K, V>) -> Self {
        ListNode {
            rank,
            entry: None,
            next: MarkableLink::new(next),
        }
    }

    fn is_sentinel(&self) -> bool {
        self.entry.is_none()
    }

    /// Key of an entry node. Only called on nodes created by `add`.
    fn entry_key(&self) -> &K {
        match &self.entry {
            Some((key, _)) => key,
            None => unreachable!("sentinel node has no key"),
        }
    }

    fn value(&self) -> Option<&V> {
        self.entry.as_ref().map(|(_, value)| value)
    }

    fn holds(&self, key: &K) -> bool
    where
        K: Eq,
    {
        matches!(&self.entry, Some((k, _)) if k == key)
    }

    /// # Safety
    /// `ptr` must come from `Box::into_raw` and must not be used afterwards.
    unsafe fn dealloc_ptr(ptr: *mut Self) {
        drop(unsafe { Box::from_raw(ptr) });
    }
}

/// (predecessor, current) pair returned by a search.
///
/// Only a hint: every mutation based on it is validated by a CAS against the
/// predecessor's exact (reference, mark) state.
struct Window<K, V> {
    pred: NodePtr<K, V>,
    curr: NodePtr<K, V>,
}

// Manual impls to avoid requiring K/V: Clone/Copy
impl<K, V> Copy for Window<K, V> {}

impl<K, V> Clone for Window<K, V> {
    fn clone(&self) -> Self {
        *self
    }
}

/// Lock-free split-ordered bucket list.
///
/// A single sorted, singly-linked list of key/value nodes bounded by two
/// immutable sentinels. Nodes are ordered by a bit-reversed hash ("rank", see
/// [`split_order`](super::split_order)), which lets an external controller carve
/// the list into buckets by inserting sentinel nodes, without ever moving or
/// re-ranking an existing key.
///
/// ```text
/// HEAD(0) → S4 → k(h=4) → S2 → k(h=2) → S1 → k(h=1) → k(h=5) → TAIL(MAX)
/// ```
///
/// # Algorithm
///
/// - **Search** walks from a start node; every logically deleted node it meets
///   is spliced out with a CAS on the predecessor's link. A failed splice
///   restarts the search from the start node.
/// - **Add** links a new node in front of the first node with rank ≥ its own,
///   with one CAS on the predecessor's link. On failure the whole search is
///   retried.
/// - **Remove** sets the deletion mark on the node's own link (the
///   linearization point), then makes a single best-effort attempt to unlink it.
///   If that attempt loses a race, the next search passing over the node
///   finishes the job.
///
/// A mark is never cleared. A node is handed to the guard `G` exactly once, by
/// the thread whose CAS physically unlinked it.
///
/// Distinct keys whose hashes agree on the low 62 bits share a rank. They form a
/// contiguous run and are told apart by `K: Eq`; a new key is always linked at
/// the head of its run, so the CAS on the run's predecessor also detects a
/// concurrent insert of the same key.
///
/// # Example
///
/// ```rust,ignore
/// use splitlist_core::{BucketListMap, DeferredGuard};
///
/// let map: BucketListMap<u64, &str, DeferredGuard> = BucketListMap::new();
/// assert!(map.add(1, "one"));
/// assert!(!map.add(1, "uno"));
/// assert_eq!(map.get(&1), Some("one"));
///
/// let bucket = map.add_sentinel(3)?;
/// assert!(bucket.add(7, "seven"));
/// ```
pub struct BucketListMap<K, V, G: Guard, S = RandomState> {
    /// Minimum sentinel, rank 0. Also the sentinel of bucket 0.
    head: NonNull<ListNode<K, V>>,
    /// Shared guard instance for deferred destruction of unlinked nodes.
    guard: G,
    hasher: S,
    _owns: PhantomData<Box<ListNode<K, V>>>,
}

// Safety: nodes are created on one thread and may be dropped on another
// (K, V: Send); keys and values are read through shared references from many
// threads at once (K, V: Sync).
unsafe impl<K: Send, V: Send, G: Guard, S: Send> Send for BucketListMap<K, V, G, S> {}
unsafe impl<K: Send + Sync, V: Send + Sync, G: Guard, S: Sync> Sync for BucketListMap<K, V, G, S> {}

impl<K, V, G: Guard> BucketListMap<K, V, G, RandomState> {
    pub fn new() -> Self {
        Self::with_hasher(RandomState::new())
    }
}

impl<K, V, G: Guard> Default for BucketListMap<K, V, G, RandomState> {
    fn default() -> Self {
        Self::new()
    }
}

impl<K, V, G: Guard, S> BucketListMap<K, V, G, S> {
    pub fn with_hasher(hasher: S) -> Self {
        let tail = Box::into_raw(Box::new(ListNode::new_sentinel(MAX_RANK, ptr::null_mut())));
        let head = Box::new(ListNode::new_sentinel(MIN_RANK, tail));

        debug_log!("bucket list created");

        BucketListMap {
            head: NonNull::from(Box::leak(head)),
            guard: G::default(),
            hasher,
            _owns: PhantomData,
        }
    }

    /// Get the shared guard instance for this collection.
    pub fn guard(&self) -> &G {
        &self.guard
    }

    pub fn hasher(&self) -> &S {
        &self.hasher
    }

    #[inline]
    fn head_ptr(&self) -> NodePtr<K, V> {
        self.head.as_ptr()
    }

    /// Number of key-bearing, unmarked nodes.
    ///
    /// Diagnostic only: the walk is not synchronized with concurrent
    /// mutators, so the result is advisory.
    pub fn count(&self) -> usize {
        let _pin = G::pin();
        let mut count = 0;
        unsafe {
            Self::walk(self.head_ptr(), |node, marked| {
                if !node.is_sentinel() && !marked {
                    count += 1;
                }
                true
            });
        }
        count
    }

    pub fn is_empty(&self) -> bool {
        self.count() == 0
    }

    /// Present (key, value) pairs in rank order.
    ///
    /// Intended for quiescent inspection; under concurrency it reflects no
    /// single point in time.
    pub fn to_vec(&self) -> Vec<(K, V)>
    where
        K: Clone,
        V: Clone,
    {
        let _pin = G::pin();
        let mut entries = Vec::new();
        unsafe {
            Self::walk(self.head_ptr(), |node, marked| {
                if let (Some((key, value)), false) = (&node.entry, marked) {
                    entries.push((key.clone(), value.clone()));
                }
                true
            });
        }
        entries
    }

    /// Visit nodes after `start` with their mark, without helping or CAS.
    /// Stops at the tail or when `visit` returns false.
    ///
    /// # Safety
    /// `start` must be a node of this chain and the caller must be pinned.
    unsafe fn walk(start: NodePtr<K, V>, mut visit: impl FnMut(&ListNode<K, V>, bool) -> bool) {
        let mut curr = unsafe { (*start).next.reference() };
        while !curr.is_null() {
            let node = unsafe { &*curr };
            let next = node.next.load();
            if !visit(node, next.is_marked()) {
                return;
            }
            curr = next.as_ptr();
        }
    }

    /// Retire a node this thread has just unlinked.
    ///
    /// # Safety
    /// `node` must be unreachable and must not have been retired before.
    unsafe fn retire(&self, node: NodePtr<K, V>) {
        unsafe { self.guard.defer_destroy(node, ListNode::<K, V>::dealloc_ptr) };
    }

    /// Find the window around `rank`: the first unmarked node with rank ≥
    /// `rank` and its predecessor. Marked nodes met on the way are spliced
    /// out; a failed splice restarts the search from `start`.
    ///
    /// # Safety
    /// `start` must be the head or a sentinel of this chain with a rank below
    /// `rank`, and the caller must be pinned.
    unsafe fn locate(&self, start: NodePtr<K, V>, rank: u64) -> Window<K, V> {
        debug_assert!(unsafe { (*start).rank } < rank);

        'retry: loop {
            let mut pred = start;
            let mut curr = unsafe { (*pred).next.reference() };

            loop {
                let mut succ = unsafe { (*curr).next.load() };

                while succ.is_marked() {
                    let snip = unsafe { (*pred).next.compare_and_set(curr, succ.as_ptr(), false, false) };
                    if !snip {
                        trace_log!(rank, "splice failed, restarting search");
                        continue 'retry;
                    }

                    unsafe { self.retire(curr) };
                    curr = succ.as_ptr();
                    succ = unsafe { (*curr).next.load() };
                }

                if unsafe { (*curr).rank } >= rank {
                    return Window { pred, curr };
                }

                pred = curr;
                curr = succ.as_ptr();
            }
        }
    }

    /// Scan the run of nodes sharing `rank`, starting at `window.curr`, for an
    /// unmarked node holding `key`. Marked nodes are skipped, not spliced.
    ///
    /// # Safety
    /// `window` must come from `locate(_, rank)` under the current pin.
    unsafe fn find_in_run(window: Window<K, V>, rank: u64, key: &K) -> Option<Window<K, V>>
    where
        K: Eq,
    {
        let Window { mut pred, mut curr } = window;

        while unsafe { (*curr).rank } == rank {
            let next = unsafe { (*curr).next.load() };
            if !next.is_marked() && unsafe { (*curr).holds(key) } {
                return Some(Window { pred, curr });
            }
            pred = curr;
            curr = next.as_ptr();
        }

        None
    }

    fn contains_from(&self, start: NodePtr<K, V>, rank: u64, key: &K) -> bool
    where
        K: Eq,
    {
        let _pin = G::pin();
        unsafe {
            let window = self.locate(start, rank);
            Self::find_in_run(window, rank, key).is_some()
        }
    }

    /// Read path: a plain walk with no CAS and no cleanup. It still checks
    /// the mark of every candidate, so a logically deleted node's value is
    /// never returned.
    fn get_from(&self, start: NodePtr<K, V>, rank: u64, key: &K) -> Option<V>
    where
        K: Eq,
        V: Clone,
    {
        let _pin = G::pin();
        unsafe {
            let mut curr = (*start).next.reference();
            while (*curr).rank < rank {
                curr = (*curr).next.reference();
            }

            while (*curr).rank == rank {
                let next = (*curr).next.load();
                if !next.is_marked() && (*curr).holds(key) {
                    return (*curr).value().cloned();
                }
                curr = next.as_ptr();
            }
        }

        None
    }

    fn add_from(&self, start: NodePtr<K, V>, rank: u64, key: K, value: V) -> bool
    where
        K: Eq,
    {
        let _pin = G::pin();

        // Private until the CAS below publishes it; reused across retries.
        let new_node = Box::into_raw(Box::new(ListNode::new(rank, key, value)));
        let key = unsafe { (*new_node).entry_key() };

        loop {
            unsafe {
                let window = self.locate(start, rank);

                if Self::find_in_run(window, rank, key).is_some() {
                    ListNode::dealloc_ptr(new_node);
                    return false;
                }

                (*new_node).next.store_unpublished(window.curr);
                if (*window.pred)
                    .next
                    .compare_and_set(window.curr, new_node, false, false)
                {
                    return true;
                }
            }

            trace_log!(rank, "insert CAS failed, retrying");
        }
    }

    fn remove_from(&self, start: NodePtr<K, V>, rank: u64, key: &K) -> bool
    where
        K: Eq,
    {
        let _pin = G::pin();

        loop {
            unsafe {
                let window = self.locate(start, rank);
                let Some(Window { pred, curr }) = Self::find_in_run(window, rank, key) else {
                    return false;
                };

                // Logical delete: mark curr's own link, keeping its successor.
                let succ = (*curr).next.reference();
                if !(*curr).next.attempt_mark(succ) {
                    trace_log!(rank, "mark CAS failed, retrying");
                    continue;
                }

                // Physical unlink: one attempt only, a later search finishes it.
                if (*pred).next.compare_and_set(curr, succ, false, false) {
                    self.retire(curr);
                } else {
                    trace_log!(rank, "unlink deferred to a later search");
                }
                return true;
            }
        }
    }

    /// Link the sentinel with `rank`, or return the one already present.
    fn insert_sentinel(&self, rank: u64) -> NodePtr<K, V> {
        if rank == MIN_RANK {
            return self.head_ptr();
        }

        let _pin = G::pin();
        let mut new_node: NodePtr<K, V> = ptr::null_mut();

        loop {
            unsafe {
                let window = self.locate(self.head_ptr(), rank);

                if (*window.curr).rank == rank {
                    if !new_node.is_null() {
                        ListNode::dealloc_ptr(new_node);
                    }
                    return window.curr;
                }

                if new_node.is_null() {
                    new_node = Box::into_raw(Box::new(ListNode::new_sentinel(rank, window.curr)));
                } else {
                    (*new_node).next.store_unpublished(window.curr);
                }

                if (*window.pred)
                    .next
                    .compare_and_set(window.curr, new_node, false, false)
                {
                    debug_log!(rank, "bucket sentinel inserted");
                    return new_node;
                }
            }

            trace_log!(rank, "sentinel CAS failed, retrying");
        }
    }

    /// Insert the sentinel for `bucket` if missing and return a view rooted
    /// at it.
    ///
    /// Idempotent: repeated calls for the same bucket return views of the same
    /// sentinel node. Existing key nodes are never moved or re-ranked. Bucket
    /// 0 is the minimum sentinel itself.
    pub fn add_sentinel(&self, bucket: usize) -> Result<BucketView<'_, K, V, G, S>, MapError> {
        if bucket > MAX_BUCKET {
            return Err(MapError::BucketOutOfRange(bucket));
        }

        let sentinel = self.insert_sentinel(split_order::bucket_rank(bucket));
        Ok(BucketView {
            map: self,
            sentinel,
            bucket,
        })
    }

    /// View of the chain rooted at `bucket`'s sentinel, creating the sentinel
    /// on first use. Same semantics as [`add_sentinel`](Self::add_sentinel).
    pub fn get_sentinel(&self, bucket: usize) -> Result<BucketView<'_, K, V, G, S>, MapError> {
        self.add_sentinel(bucket)
    }
}

impl<K, V, G, S> BucketListMap<K, V, G, S>
where
    K: Hash + Eq,
    G: Guard,
    S: BuildHasher,
{
    #[inline]
    fn rank_of(&self, key: &K) -> u64 {
        split_order::key_rank(self.hasher.hash_one(key))
    }

    /// Insert a key-value pair.
    /// Returns true if inserted, false if the key is already present.
    pub fn add(&self, key: K, value: V) -> bool {
        let rank = self.rank_of(&key);
        self.add_from(self.head_ptr(), rank, key, value)
    }

    /// Remove a key. Returns true if this call deleted it.
    pub fn remove(&self, key: &K) -> bool {
        self.remove_from(self.head_ptr(), self.rank_of(key), key)
    }

    pub fn contains(&self, key: &K) -> bool {
        self.contains_from(self.head_ptr(), self.rank_of(key), key)
    }

    /// Get a cloned value for a key.
    pub fn get(&self, key: &K) -> Option<V>
    where
        V: Clone,
    {
        self.get_from(self.head_ptr(), self.rank_of(key), key)
    }
}

impl<K, V, G, S> ConcurrentMap<K, V> for BucketListMap<K, V, G, S>
where
    K: Hash + Eq,
    V: Clone,
    G: Guard,
    S: BuildHasher,
{
    fn add(&self, key: K, value: V) -> bool {
        BucketListMap::add(self, key, value)
    }

    fn remove(&self, key: &K) -> bool {
        BucketListMap::remove(self, key)
    }

    fn contains(&self, key: &K) -> bool {
        BucketListMap::contains(self, key)
    }

    fn get(&self, key: &K) -> Option<V> {
        BucketListMap::get(self, key)
    }

    fn count(&self) -> usize {
        BucketListMap::count(self)
    }
}

impl<K, V, G: Guard, S> fmt::Debug for BucketListMap<K, V, G, S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BucketListMap")
            .field("count", &self.count())
            .finish()
    }
}

impl<K, V, G: Guard, S> Drop for BucketListMap<K, V, G, S> {
    fn drop(&mut self) {
        // Free everything still reachable, zombies included. Nodes that were
        // already unlinked belong to the guard, which drops after this.
        let mut curr = self.head_ptr();

        while !curr.is_null() {
            unsafe {
                let next = (*curr).next.load();
                if next.is_marked() {
                    trace_log!(rank = (*curr).rank, "freeing zombie node");
                }
                ListNode::dealloc_ptr(curr);
                curr = next.as_ptr();
            }
        }

        debug_log!("bucket list dropped");
    }
}

/// A view of a [`BucketListMap`] rooted at one bucket sentinel.
///
/// Searches start at the sentinel instead of the chain head, which is what a
/// bucket-indexed controller uses to skip straight to a bucket. A key whose
/// rank precedes the sentinel is searched from the head instead, so a view
/// never links a node out of order.
///
/// Two views are equal iff they are rooted at the same sentinel node.
pub struct BucketView<'a, K, V, G: Guard, S = RandomState> {
    map: &'a BucketListMap<K, V, G, S>,
    sentinel: NodePtr<K, V>,
    bucket: usize,
}

// Safety: a view is a shared borrow of the map plus a pointer to a sentinel
// that lives as long as the map.
unsafe impl<K, V, G: Guard, S> Send for BucketView<'_, K, V, G, S> where BucketListMap<K, V, G, S>: Sync {}
unsafe impl<K, V, G: Guard, S> Sync for BucketView<'_, K, V, G, S> where BucketListMap<K, V, G, S>: Sync {}

impl<K, V, G: Guard, S> Copy for BucketView<'_, K, V, G, S> {}

impl<K, V, G: Guard, S> Clone for BucketView<'_, K, V, G, S> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<K, V, G: Guard, S> PartialEq for BucketView<'_, K, V, G, S> {
    fn eq(&self, other: &Self) -> bool {
        ptr::eq(self.sentinel, other.sentinel)
    }
}

impl<K, V, G: Guard, S> Eq for BucketView<'_, K, V, G, S> {}

impl<K, V, G: Guard, S> fmt::Debug for BucketView<'_, K, V, G, S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BucketView")
            .field("bucket", &self.bucket)
            .field("rank", &format_args!("{:#x}", self.rank()))
            .finish()
    }
}

impl<K, V, G: Guard, S> BucketView<'_, K, V, G, S> {
    pub fn bucket(&self) -> usize {
        self.bucket
    }

    /// Rank of the sentinel this view is rooted at.
    pub fn rank(&self) -> u64 {
        // Sentinels are never removed while the map is alive.
        unsafe { (*self.sentinel).rank }
    }

    fn start_for(&self, rank: u64) -> NodePtr<K, V> {
        if self.rank() < rank {
            self.sentinel
        } else {
            self.map.head_ptr()
        }
    }

    /// Keys between this sentinel and the next sentinel in rank order.
    pub fn count(&self) -> usize {
        let _pin = G::pin();
        let mut count = 0;
        unsafe {
            BucketListMap::<K, V, G, S>::walk(self.sentinel, |node, marked| {
                if node.is_sentinel() {
                    return false;
                }
                if !marked {
                    count += 1;
                }
                true
            });
        }
        count
    }
}

impl<K, V, G, S> BucketView<'_, K, V, G, S>
where
    K: Hash + Eq,
    G: Guard,
    S: BuildHasher,
{
    pub fn add(&self, key: K, value: V) -> bool {
        let rank = self.map.rank_of(&key);
        self.map.add_from(self.start_for(rank), rank, key, value)
    }

    pub fn remove(&self, key: &K) -> bool {
        let rank = self.map.rank_of(key);
        self.map.remove_from(self.start_for(rank), rank, key)
    }

    pub fn contains(&self, key: &K) -> bool {
        let rank = self.map.rank_of(key);
        self.map.contains_from(self.start_for(rank), rank, key)
    }

    pub fn get(&self, key: &K) -> Option<V>
    where
        V: Clone,
    {
        let rank = self.map.rank_of(key);
        self.map.get_from(self.start_for(rank), rank, key)
    }
}
