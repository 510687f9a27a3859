/// The capability set shared by every concurrent map in this crate.
///
/// Three strategies implement it against the same contract:
///
/// ```text
/// ConcurrentMap (this trait)
///    ↓ implemented by
/// BucketListMap      ← lock-free split-ordered chain
/// LockedHashMap      ← one mutex around a HashMap
/// SegmentedHashMap   ← fixed array of mutex-protected HashMaps
/// ```
///
/// All operations take `&self`; share a map across threads with `Arc`.
/// Contention is never surfaced: failures are `false` or `None`.
///
pub trait ConcurrentMap<K, V> {
    /// Insert a key-value pair.
    /// Returns true if inserted, false if the key is already present.
    /// An existing value is never overwritten.
    ///
    fn add(&self, key: K, value: V) -> bool;

    /// Remove a key.
    /// Returns true if a present key was removed, false if it was absent.
    ///
    fn remove(&self, key: &K) -> bool;

    /// Check if a key is present.
    ///
    fn contains(&self, key: &K) -> bool;

    /// Get a cloned value for a key.
    ///
    fn get(&self, key: &K) -> Option<V>;

    /// Number of present keys.
    ///
    /// Diagnostic only: not synchronized with concurrent mutators.
    ///
    fn count(&self) -> usize;

    /// Check if the map is empty. Advisory under concurrency, like `count`.
    ///
    fn is_empty(&self) -> bool {
        self.count() == 0
    }
}
