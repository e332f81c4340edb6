//! Hash partitioning for shuffles
//!
//! Uses `FxHasher`, which is seeded deterministically, so a record lands in
//! the same partition on every run and on every retry.

use rustc_hash::FxHasher;
use std::hash::{Hash, Hasher};

/// Routes keys to partitions by hash
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HashPartitioner {
    partitions: usize,
}

impl HashPartitioner {
    pub fn new(partitions: usize) -> Self {
        Self {
            partitions: partitions.max(1),
        }
    }

    pub fn partitions(&self) -> usize {
        self.partitions
    }

    /// Target partition for a key
    pub fn partition_for<K: Hash + ?Sized>(&self, key: &K) -> usize {
        let mut hasher = FxHasher::default();
        key.hash(&mut hasher);
        (hasher.finish() % self.partitions as u64) as usize
    }

    /// Split one partition's records into per-target buckets (map side of a shuffle)
    pub fn bucket<T, K, F>(&self, records: &[T], key_of: F) -> Vec<Vec<T>>
    where
        T: Clone,
        K: Hash + ?Sized,
        F: Fn(&T) -> &K,
    {
        let mut buckets: Vec<Vec<T>> = (0..self.partitions).map(|_| Vec::new()).collect();
        for record in records {
            buckets[self.partition_for(key_of(record))].push(record.clone());
        }
        buckets
    }
}

/// Regroup map-side buckets by target partition.
///
/// `per_source[i][p]` holds the records source partition `i` routed to `p`;
/// the result's entry `p` holds every such bucket.
pub fn transpose<T>(per_source: Vec<Vec<Vec<T>>>, partitions: usize) -> Vec<Vec<Vec<T>>> {
    let mut per_target: Vec<Vec<Vec<T>>> = (0..partitions)
        .map(|_| Vec::with_capacity(per_source.len()))
        .collect();
    for buckets in per_source {
        for (target, bucket) in buckets.into_iter().enumerate() {
            if !bucket.is_empty() {
                per_target[target].push(bucket);
            }
        }
    }
    per_target
}
