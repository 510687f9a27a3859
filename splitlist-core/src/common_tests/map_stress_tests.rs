//! Common stress tests for ConcurrentMap implementations.
//!
//! These tests verify concurrent correctness under high contention.

use std::sync::atomic::{AtomicBool, AtomicIsize, AtomicUsize, Ordering};
use std::sync::{Arc, Barrier};
use std::thread;
use std::time::Duration;

use crate::data_structures::ConcurrentMap;

/// Test randomized operations against per-key success counters.
///
/// For every key, successful adds minus successful removes must be 0 or 1
/// and must match the key's final presence.
pub fn test_randomized_against_counters<C>()
where
    C: ConcurrentMap<usize, usize> + Default + Send + Sync + 'static,
{
    let map = Arc::new(C::default());
    let num_threads = 8;
    let ops_per_thread = 20_000;
    let num_keys = 64;

    let balance: Arc<Vec<AtomicIsize>> = Arc::new((0..num_keys).map(|_| AtomicIsize::new(0)).collect());
    let barrier = Arc::new(Barrier::new(num_threads));

    let handles: Vec<_> = (0..num_threads)
        .map(|t| {
            let map = Arc::clone(&map);
            let balance = Arc::clone(&balance);
            let barrier = Arc::clone(&barrier);
            thread::spawn(move || {
                let mut rng = fastrand::Rng::with_seed(0x5eed + t as u64);
                barrier.wait();

                for _ in 0..ops_per_thread {
                    let key = rng.usize(..num_keys);
                    match rng.u8(..3) {
                        0 => {
                            if map.add(key, key * 2) {
                                balance[key].fetch_add(1, Ordering::Relaxed);
                            }
                        }
                        1 => {
                            if map.remove(&key) {
                                balance[key].fetch_sub(1, Ordering::Relaxed);
                            }
                        }
                        _ => {
                            if let Some(value) = map.get(&key) {
                                assert_eq!(value, key * 2, "foreign value for key {}", key);
                            }
                        }
                    }
                }
            })
        })
        .collect();

    for handle in handles {
        handle.join().unwrap();
    }

    for key in 0..num_keys {
        let net = balance[key].load(Ordering::Relaxed);
        assert!(net == 0 || net == 1, "key {} has net balance {}", key, net);
        assert_eq!(map.contains(&key), net == 1, "key {} presence mismatch", key);
    }

    let expected: isize = balance.iter().map(|b| b.load(Ordering::Relaxed)).sum();
    assert_eq!(map.count() as isize, expected);
}

/// Test linearizability - operations appear to take effect atomically
pub fn test_linearizability<C>()
where
    C: ConcurrentMap<usize, usize> + Default + Send + Sync + 'static,
{
    let map = Arc::new(C::default());
    let num_threads = thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(4);
    let num_ops = 10_000;

    let handles: Vec<_> = (0..num_threads)
        .map(|t| {
            let map = Arc::clone(&map);
            thread::spawn(move || {
                for i in 0..num_ops {
                    let key = t * num_ops + i;

                    // Add must return true for a new key
                    assert!(map.add(key, i), "Failed to add unique key {}", key);

                    // Immediately after add, must be visible
                    assert_eq!(map.get(&key), Some(i), "Key {} not found after add", key);

                    // Remove must succeed for an existing key
                    assert!(map.remove(&key), "Failed to remove existing key {}", key);

                    // After remove, must not be visible
                    assert!(!map.contains(&key), "Key {} found after remove", key);
                }
            })
        })
        .collect();

    for handle in handles {
        handle.join().unwrap();
    }

    assert!(map.is_empty());
}

/// Test concurrent remove of the same key - exactly one should succeed
pub fn test_concurrent_remove_same_key<C>()
where
    C: ConcurrentMap<usize, usize> + Default + Send + Sync + 'static,
{
    let map = Arc::new(C::default());
    let num_threads = 64;
    let the_key = 42;

    for _round in 0..20 {
        map.add(the_key, 0);

        let success_count = Arc::new(AtomicUsize::new(0));
        let barrier = Arc::new(Barrier::new(num_threads));

        let handles: Vec<_> = (0..num_threads)
            .map(|_| {
                let map = Arc::clone(&map);
                let success = Arc::clone(&success_count);
                let barrier = Arc::clone(&barrier);
                thread::spawn(move || {
                    barrier.wait();
                    if map.remove(&the_key) {
                        success.fetch_add(1, Ordering::Relaxed);
                    }
                })
            })
            .collect();

        for handle in handles {
            handle.join().unwrap();
        }

        assert_eq!(success_count.load(Ordering::Relaxed), 1);
        assert!(!map.contains(&the_key));
    }
}

/// Test extreme contention on a single key
pub fn test_extreme_contention_single_key<C>()
where
    C: ConcurrentMap<usize, usize> + Default + Send + Sync + 'static,
{
    let map = Arc::new(C::default());
    let num_threads = 32;
    let ops_per_thread = 2000;
    let the_key = 42;

    let successful_adds = Arc::new(AtomicUsize::new(0));
    let successful_removes = Arc::new(AtomicUsize::new(0));
    let barrier = Arc::new(Barrier::new(num_threads));

    let handles: Vec<_> = (0..num_threads)
        .map(|_| {
            let map = Arc::clone(&map);
            let adds = Arc::clone(&successful_adds);
            let removes = Arc::clone(&successful_removes);
            let barrier = Arc::clone(&barrier);

            thread::spawn(move || {
                barrier.wait();

                for i in 0..ops_per_thread {
                    if map.add(the_key, i) {
                        adds.fetch_add(1, Ordering::Relaxed);
                    }
                    if map.remove(&the_key) {
                        removes.fetch_add(1, Ordering::Relaxed);
                    }
                }
            })
        })
        .collect();

    for handle in handles {
        handle.join().unwrap();
    }

    let total_adds = successful_adds.load(Ordering::Relaxed);
    let total_removes = successful_removes.load(Ordering::Relaxed);

    println!(
        "Single key contention - Adds: {}, Removes: {}",
        total_adds, total_removes
    );

    assert_eq!(total_adds, total_removes + usize::from(map.contains(&the_key)));
}

/// Test readers while writers churn a disjoint key range
pub fn test_reads_during_modifications<C>()
where
    C: ConcurrentMap<usize, usize> + Default + Send + Sync + 'static,
{
    let map = Arc::new(C::default());
    let stop_flag = Arc::new(AtomicBool::new(false));

    // Stable keys below 1000, churned keys above
    for i in 0..1000 {
        map.add(i, i * 2);
    }

    let mut handles = vec![];

    for t in 0..4 {
        let map = Arc::clone(&map);
        let stop = Arc::clone(&stop_flag);
        handles.push(thread::spawn(move || {
            let mut i = 0;
            while !stop.load(Ordering::Relaxed) {
                let key = 1000 + t * 100_000 + (i % 500);
                if i % 2 == 0 {
                    map.add(key, key * 2);
                } else {
                    map.remove(&key);
                }
                i += 1;
            }
        }));
    }

    for _ in 0..4 {
        let map = Arc::clone(&map);
        let stop = Arc::clone(&stop_flag);
        handles.push(thread::spawn(move || {
            while !stop.load(Ordering::Relaxed) {
                for key in 0..1000 {
                    assert_eq!(map.get(&key), Some(key * 2), "stable key {} lost", key);
                }
            }
        }));
    }

    thread::sleep(Duration::from_secs(2));
    stop_flag.store(true, Ordering::Relaxed);

    for handle in handles {
        handle.join().unwrap();
    }
}

/// Test memory ordering between producer and consumer
pub fn test_memory_ordering<C>()
where
    C: ConcurrentMap<usize, usize> + Default + Send + Sync + 'static,
{
    let map = Arc::new(C::default());
    let flag = Arc::new(AtomicBool::new(false));

    let producer_map = Arc::clone(&map);
    let producer_flag = Arc::clone(&flag);
    let producer = thread::spawn(move || {
        producer_map.add(100, 4242);
        producer_flag.store(true, Ordering::Release);
    });

    let consumer = thread::spawn(move || {
        while !flag.load(Ordering::Acquire) {
            thread::yield_now();
        }
        assert_eq!(map.get(&100), Some(4242));
    });

    producer.join().unwrap();
    consumer.join().unwrap();
}

/// Test that threads keep making progress under contention
pub fn test_progress_guarantee<C>()
where
    C: ConcurrentMap<usize, usize> + Default + Send + Sync + 'static,
{
    let map = Arc::new(C::default());
    let num_threads = thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(4);

    let progress_counters: Vec<_> = (0..num_threads)
        .map(|_| Arc::new(AtomicUsize::new(0)))
        .collect();

    let stop = Arc::new(AtomicBool::new(false));

    let handles: Vec<_> = progress_counters
        .iter()
        .enumerate()
        .map(|(t, counter)| {
            let map = Arc::clone(&map);
            let counter = Arc::clone(counter);
            let stop = Arc::clone(&stop);
            thread::spawn(move || {
                let mut i = 0;
                while !stop.load(Ordering::Relaxed) {
                    let key = t * 1_000_000 + i % 1000;

                    if map.add(key, i) {
                        counter.fetch_add(1, Ordering::Relaxed);
                    }
                    if map.remove(&key) {
                        counter.fetch_add(1, Ordering::Relaxed);
                    }

                    i += 1;
                }
            })
        })
        .collect();

    thread::sleep(Duration::from_secs(2));
    stop.store(true, Ordering::Relaxed);

    for handle in handles {
        handle.join().unwrap();
    }

    let max_progress = progress_counters
        .iter()
        .map(|c| c.load(Ordering::Relaxed))
        .max()
        .unwrap_or(0);

    assert!(
        max_progress > 500,
        "No thread made sufficient progress (max: {})",
        max_progress
    );
}
