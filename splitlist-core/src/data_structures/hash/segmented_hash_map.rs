use std::collections::HashMap;
use std::collections::hash_map::{Entry, RandomState};
use std::hash::{BuildHasher, Hash};

use parking_lot::Mutex;

use crate::data_structures::hash::ConcurrentMap;
use crate::error::MapError;
use crate::tracing_helpers::debug_log;

/// Segment count used by `new()` and `Default`.
pub const DEFAULT_SEGMENTS: usize = 16;

/// Baseline map: the key space is split across a fixed number of
/// independently locked `HashMap` segments.
///
/// ```text
/// hash(key) & (segments - 1)
///        │
///        ▼
/// ┌───────────┬───────────┬───────────┬───────────┐
/// │ Mutex<HM> │ Mutex<HM> │ Mutex<HM> │ Mutex<HM> │
/// └───────────┴───────────┴───────────┴───────────┘
/// ```
///
/// Operations lock only their segment, so operations on different segments
/// proceed concurrently. Segment selection uses the map's own hasher and is a
/// pure function of the key, so an `add` and a later `remove` of the same key
/// always meet in the same segment.
pub struct SegmentedHashMap<K, V, S = RandomState> {
    segments: Box<[Mutex<HashMap<K, V>>]>,
    mask: usize,
    hasher: S,
}

impl<K, V> SegmentedHashMap<K, V, RandomState> {
    /// Creates a map with [`DEFAULT_SEGMENTS`] segments.
    pub fn new() -> Self {
        Self::build(DEFAULT_SEGMENTS, 0, RandomState::new())
    }

    /// Creates a map with `segments` segments.
    pub fn with_segments(segments: usize) -> Result<Self, MapError> {
        Self::with_capacity(segments, 0)
    }

    /// Creates a map with `segments` segments, reserving room for roughly
    /// `capacity` keys spread evenly across them.
    pub fn with_capacity(segments: usize, capacity: usize) -> Result<Self, MapError> {
        Self::with_capacity_and_hasher(segments, capacity, RandomState::new())
    }
}

impl<K, V, S> SegmentedHashMap<K, V, S> {
    pub fn with_capacity_and_hasher(
        segments: usize,
        capacity: usize,
        hasher: S,
    ) -> Result<Self, MapError> {
        if !segments.is_power_of_two() {
            return Err(MapError::InvalidSegmentCount(segments));
        }
        Ok(Self::build(segments, capacity, hasher))
    }

    fn build(segments: usize, capacity: usize, hasher: S) -> Self {
        debug_assert!(segments.is_power_of_two());

        let per_segment = capacity.div_ceil(segments);
        let segments: Box<[_]> = (0..segments)
            .map(|_| Mutex::new(HashMap::with_capacity(per_segment)))
            .collect();

        debug_log!(segments = segments.len(), per_segment, "segmented map created");

        SegmentedHashMap {
            mask: segments.len() - 1,
            segments,
            hasher,
        }
    }

    /// Number of segments (fixed at construction).
    pub fn segments(&self) -> usize {
        self.segments.len()
    }
}

impl<K, V, S> SegmentedHashMap<K, V, S>
where
    K: Hash,
    S: BuildHasher,
{
    fn segment_index(&self, key: &K) -> usize {
        self.hasher.hash_one(key) as usize & self.mask
    }

    fn segment(&self, key: &K) -> &Mutex<HashMap<K, V>> {
        &self.segments[self.segment_index(key)]
    }
}

impl<K, V> Default for SegmentedHashMap<K, V, RandomState> {
    fn default() -> Self {
        Self::new()
    }
}

impl<K, V, S> ConcurrentMap<K, V> for SegmentedHashMap<K, V, S>
where
    K: Hash + Eq,
    V: Clone,
    S: BuildHasher,
{
    fn add(&self, key: K, value: V) -> bool {
        match self.segment(&key).lock().entry(key) {
            Entry::Vacant(entry) => {
                entry.insert(value);
                true
            }
            Entry::Occupied(_) => false,
        }
    }

    fn remove(&self, key: &K) -> bool {
        self.segment(key).lock().remove(key).is_some()
    }

    fn contains(&self, key: &K) -> bool {
        self.segment(key).lock().contains_key(key)
    }

    fn get(&self, key: &K) -> Option<V> {
        self.segment(key).lock().get(key).cloned()
    }

    /// Sums the segment sizes, locking one segment at a time.
    fn count(&self) -> usize {
        self.segments.iter().map(|segment| segment.lock().len()).sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rejects_non_power_of_two() {
        for segments in [0, 3, 6, 12, 100] {
            let result = SegmentedHashMap::<u32, u32>::with_segments(segments);
            assert_eq!(result.err(), Some(MapError::InvalidSegmentCount(segments)));
        }
    }

    #[test]
    fn test_segment_count_is_the_shard_count() {
        let map = SegmentedHashMap::<u32, u32>::with_capacity(4, 1000).unwrap();
        assert_eq!(map.segments(), 4);

        let map = SegmentedHashMap::<u32, u32>::new();
        assert_eq!(map.segments(), DEFAULT_SEGMENTS);
    }

    #[test]
    fn test_segment_selection_is_stable() {
        let map = SegmentedHashMap::<u64, u64>::with_segments(8).unwrap();

        for key in 0..1000u64 {
            let index = map.segment_index(&key);
            assert!(index < 8);
            assert_eq!(index, map.segment_index(&key));
        }
    }

    #[test]
    fn test_keys_spread_across_segments() {
        let map = SegmentedHashMap::<u64, u64>::with_segments(8).unwrap();

        for key in 0..1000u64 {
            assert!(map.add(key, key));
        }

        let used = map
            .segments
            .iter()
            .filter(|segment| !segment.lock().is_empty())
            .count();
        assert!(used > 1, "all keys landed in one segment");
        assert_eq!(map.count(), 1000);
    }

    #[test]
    fn test_single_segment_behaves_like_locked_map() {
        let map = SegmentedHashMap::with_segments(1).unwrap();

        assert!(map.add("a", 1));
        assert!(!map.add("a", 2));
        assert_eq!(map.get(&"a"), Some(1));
        assert!(map.remove(&"a"));
        assert!(!map.contains(&"a"));
    }
}
