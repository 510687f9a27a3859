use std::collections::HashMap;
use std::collections::hash_map::{Entry, RandomState};
use std::hash::{BuildHasher, Hash};

use parking_lot::Mutex;

use crate::data_structures::hash::ConcurrentMap;

/// Baseline map: one `HashMap` behind one mutex.
///
/// Every operation holds the lock for its whole duration, so the map is fully
/// serialized. Used as the contention baseline for [`BucketListMap`].
///
/// [`BucketListMap`]: crate::data_structures::hash::BucketListMap
pub struct LockedHashMap<K, V, S = RandomState> {
    map: Mutex<HashMap<K, V, S>>,
}

impl<K, V> LockedHashMap<K, V, RandomState> {
    pub fn new() -> Self {
        Self::with_capacity(0)
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self::with_capacity_and_hasher(capacity, RandomState::new())
    }
}

impl<K, V, S> LockedHashMap<K, V, S> {
    pub fn with_capacity_and_hasher(capacity: usize, hasher: S) -> Self {
        LockedHashMap {
            map: Mutex::new(HashMap::with_capacity_and_hasher(capacity, hasher)),
        }
    }
}

impl<K, V> Default for LockedHashMap<K, V, RandomState> {
    fn default() -> Self {
        Self::new()
    }
}

impl<K, V, S> ConcurrentMap<K, V> for LockedHashMap<K, V, S>
where
    K: Hash + Eq,
    V: Clone,
    S: BuildHasher,
{
    fn add(&self, key: K, value: V) -> bool {
        match self.map.lock().entry(key) {
            Entry::Vacant(entry) => {
                entry.insert(value);
                true
            }
            Entry::Occupied(_) => false,
        }
    }

    fn remove(&self, key: &K) -> bool {
        self.map.lock().remove(key).is_some()
    }

    fn contains(&self, key: &K) -> bool {
        self.map.lock().contains_key(key)
    }

    fn get(&self, key: &K) -> Option<V> {
        self.map.lock().get(key).cloned()
    }

    fn count(&self) -> usize {
        self.map.lock().len()
    }
}
