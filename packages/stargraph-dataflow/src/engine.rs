//! Dataflow engine capability interface
//!
//! Everything the contraction algorithm needs from a partitioned collection
//! library, and nothing more. Algorithms are written against [`Engine`] and
//! its associated [`Engine::Dataset`] type, never against a concrete
//! executor's collection.
//!
//! Closures handed to the engine must be pure: the engine is free to run
//! them more than once for the same partition (task retry), and the result
//! of an operation must not depend on how often that happened.

use crate::error::Result;
use crate::storage::{SaveMode, SaveSummary, TextRecord};
use serde::{Deserialize, Serialize};
use std::fmt::Display;
use std::hash::Hash;
use std::path::Path;

/// Anything that can live in a dataset
pub trait Data: Clone + Send + Sync + 'static {}

impl<T: Clone + Send + Sync + 'static> Data for T {}

/// Records usable as shuffle keys (grouping, distinct, set difference)
pub trait Key: Data + Eq + Hash {}

impl<T: Data + Eq + Hash> Key for T {}

/// Counters an engine exposes for reporting
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EngineStats {
    /// Partition task executions, including retries
    pub tasks_launched: u64,
    /// Task executions that panicked and were retried or abandoned
    pub task_failures: u64,
    /// Shuffle barriers executed
    pub shuffles: u64,
}

/// Partitioned, immutable collection operations
pub trait Engine {
    /// Immutable partitioned collection
    type Dataset<T: Data>: Clone + Send + Sync;

    /// Distribute an in-memory collection across partitions
    fn parallelize<T: Data>(&self, items: Vec<T>) -> Self::Dataset<T>;

    /// Gather every record (order unspecified)
    fn collect<T: Data>(&self, dataset: &Self::Dataset<T>) -> Vec<T>;

    /// Number of records
    fn count<T: Data>(&self, dataset: &Self::Dataset<T>) -> usize;

    /// Number of partitions a dataset is split into
    fn num_partitions<T: Data>(&self, dataset: &Self::Dataset<T>) -> usize;

    /// One output record per input record
    fn map<T, U, F>(&self, dataset: &Self::Dataset<T>, f: F) -> Result<Self::Dataset<U>>
    where
        T: Data,
        U: Data,
        F: Fn(&T) -> U + Send + Sync;

    /// Zero or more output records per input record
    fn flat_map<T, U, I, F>(&self, dataset: &Self::Dataset<T>, f: F) -> Result<Self::Dataset<U>>
    where
        T: Data,
        U: Data,
        I: IntoIterator<Item = U>,
        F: Fn(&T) -> I + Send + Sync;

    /// Shuffle by key and gather every value of a key into one group.
    ///
    /// Value order inside a group is unspecified.
    fn group_by_key<K, V>(&self, dataset: &Self::Dataset<(K, V)>) -> Result<Self::Dataset<(K, Vec<V>)>>
    where
        K: Key,
        V: Data;

    /// Remove duplicate records
    fn distinct<T: Key>(&self, dataset: &Self::Dataset<T>) -> Result<Self::Dataset<T>>;

    /// Distinct records of `left` that do not occur in `right`
    fn set_difference<T: Key>(
        &self,
        left: &Self::Dataset<T>,
        right: &Self::Dataset<T>,
    ) -> Result<Self::Dataset<T>>;

    /// Concatenation of both datasets (no deduplication)
    fn union<T: Data>(&self, left: &Self::Dataset<T>, right: &Self::Dataset<T>) -> Self::Dataset<T>;

    /// Read a text file, or every data file under a directory, one record per line
    fn read_text(&self, location: &Path) -> Result<Self::Dataset<TextRecord>>;

    /// Fail with an output conflict if `location` exists and `mode` forbids replacing it
    fn validate_output(&self, location: &Path, mode: SaveMode) -> Result<()>;

    /// Write one shard per partition, one record per line
    fn save_text<T: Data + Display>(
        &self,
        dataset: &Self::Dataset<T>,
        location: &Path,
        mode: SaveMode,
    ) -> Result<SaveSummary>;

    /// Snapshot of the engine's counters
    fn stats(&self) -> EngineStats;
}
