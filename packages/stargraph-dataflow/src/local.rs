//! Local executor: the engine interface over a dedicated rayon pool
//!
//! Datasets are vectors of `Arc`-shared partitions. Every operation runs one
//! task per partition on the pool; grouping operations shuffle through a
//! [`HashPartitioner`] and wait for every map-side task before any reducer
//! starts. A task that panics is re-run from its (immutable) input up to
//! `max_task_attempts` times.
//!
//! The engine value is the execution context: the pool lives exactly as long
//! as the `LocalEngine`, and dropping it (normal return, error or unwinding)
//! releases the workers.

use crate::config::EngineConfig;
use crate::engine::{Data, Engine, EngineStats, Key};
use crate::error::{DataflowError, Result};
use crate::partition::{transpose, HashPartitioner};
use crate::storage::{self, SaveMode, SaveSummary, TextRecord};
use rayon::prelude::*;
use rayon::{ThreadPool, ThreadPoolBuilder};
use rustc_hash::{FxHashMap, FxHashSet};
use std::any::Any;
use std::fmt::Display;
use std::panic::{self, AssertUnwindSafe};
use std::path::Path;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info, warn};
use uuid::Uuid;

/// Partitioned dataset of the local engine
#[derive(Debug)]
pub struct LocalDataset<T> {
    partitions: Vec<Arc<Vec<T>>>,
}

impl<T> Clone for LocalDataset<T> {
    fn clone(&self) -> Self {
        Self {
            partitions: self.partitions.clone(),
        }
    }
}

impl<T> LocalDataset<T> {
    fn from_partitions(partitions: Vec<Vec<T>>) -> Self {
        Self {
            partitions: partitions.into_iter().map(Arc::new).collect(),
        }
    }

    pub fn partitions(&self) -> &[Arc<Vec<T>>] {
        &self.partitions
    }

    pub fn len(&self) -> usize {
        self.partitions.iter().map(|p| p.len()).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[derive(Debug, Default)]
struct Counters {
    tasks_launched: AtomicU64,
    task_failures: AtomicU64,
    shuffles: AtomicU64,
}

/// In-process dataflow engine backed by a rayon thread pool
pub struct LocalEngine {
    id: Uuid,
    pool: ThreadPool,
    config: EngineConfig,
    partitioner: HashPartitioner,
    counters: Counters,
    started_at: Instant,
}

impl LocalEngine {
    /// Acquire the execution context (worker pool)
    pub fn start(config: EngineConfig) -> Result<Self> {
        config.validate()?;
        let workers = config.resolved_workers();
        let id = Uuid::new_v4();

        let pool = ThreadPoolBuilder::new()
            .num_threads(workers)
            .stack_size(config.stack_size)
            .thread_name(|i| format!("stargraph-worker-{}", i))
            .build()?;

        info!(
            "Engine {} started: {} workers, {} partitions, {} attempts per task",
            id, workers, config.partitions, config.max_task_attempts
        );

        Ok(Self {
            id,
            pool,
            partitioner: HashPartitioner::new(config.partitions),
            config,
            counters: Counters::default(),
            started_at: Instant::now(),
        })
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Run one task per input on the pool, retrying panicked tasks
    fn run_tasks<I, R, F>(&self, op: &'static str, inputs: &[I], task: F) -> Result<Vec<R>>
    where
        I: Sync,
        R: Send,
        F: Fn(&I) -> R + Send + Sync,
    {
        let results: Vec<Result<R>> = self.pool.install(|| {
            inputs
                .par_iter()
                .enumerate()
                .map(|(index, input)| self.attempt(op, index, || task(input)))
                .collect()
        });
        results.into_iter().collect()
    }

    fn attempt<R>(&self, op: &'static str, index: usize, task: impl Fn() -> R) -> Result<R> {
        let attempts = self.config.max_task_attempts;
        let mut last_failure = String::new();

        for attempt in 1..=attempts {
            self.counters.tasks_launched.fetch_add(1, Ordering::Relaxed);
            match panic::catch_unwind(AssertUnwindSafe(&task)) {
                Ok(output) => return Ok(output),
                Err(payload) => {
                    self.counters.task_failures.fetch_add(1, Ordering::Relaxed);
                    last_failure = panic_message(&*payload);
                    warn!(
                        "{} partition {} failed (attempt {}/{}): {}",
                        op, index, attempt, attempts, last_failure
                    );
                }
            }
        }

        Err(DataflowError::execution(format!(
            "{} partition {} failed after {} attempts: {}",
            op, index, attempts, last_failure
        )))
    }

    /// Map side of a shuffle: route every record to its target partition
    fn shuffle<T, K, F>(&self, op: &'static str, dataset: &LocalDataset<T>, key_of: F) -> Result<Vec<Vec<Vec<T>>>>
    where
        T: Data,
        K: std::hash::Hash + ?Sized,
        F: Fn(&T) -> &K + Send + Sync,
    {
        self.counters.shuffles.fetch_add(1, Ordering::Relaxed);
        let partitioner = self.partitioner;
        let per_source = self.run_tasks(op, dataset.partitions(), |records| {
            partitioner.bucket(records.as_slice(), &key_of)
        })?;
        debug!(
            "{}: shuffled {} partitions into {}",
            op,
            dataset.partitions().len(),
            partitioner.partitions()
        );
        Ok(transpose(per_source, partitioner.partitions()))
    }
}

impl Drop for LocalEngine {
    fn drop(&mut self) {
        let stats = self.stats();
        info!(
            "Engine {} stopped after {}ms: {} tasks, {} failed, {} shuffles",
            self.id,
            self.started_at.elapsed().as_millis(),
            stats.tasks_launched,
            stats.task_failures,
            stats.shuffles
        );
    }
}

/// Run `f` inside a freshly started engine; the engine is released on every exit path
pub fn with_engine<R, F>(config: EngineConfig, f: F) -> Result<R>
where
    F: FnOnce(&LocalEngine) -> R,
{
    let engine = LocalEngine::start(config)?;
    Ok(f(&engine))
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "task panicked".to_string()
    }
}

impl Engine for LocalEngine {
    type Dataset<T: Data> = LocalDataset<T>;

    fn parallelize<T: Data>(&self, items: Vec<T>) -> LocalDataset<T> {
        let partitions = self.config.partitions;
        let chunk = items.len().div_ceil(partitions).max(1);

        let mut split: Vec<Vec<T>> = Vec::with_capacity(partitions);
        let mut iter = items.into_iter();
        for _ in 0..partitions {
            split.push(iter.by_ref().take(chunk).collect());
        }
        LocalDataset::from_partitions(split)
    }

    fn collect<T: Data>(&self, dataset: &LocalDataset<T>) -> Vec<T> {
        dataset
            .partitions()
            .iter()
            .flat_map(|p| p.iter().cloned())
            .collect()
    }

    fn count<T: Data>(&self, dataset: &LocalDataset<T>) -> usize {
        dataset.len()
    }

    fn num_partitions<T: Data>(&self, dataset: &LocalDataset<T>) -> usize {
        dataset.partitions().len()
    }

    fn map<T, U, F>(&self, dataset: &LocalDataset<T>, f: F) -> Result<LocalDataset<U>>
    where
        T: Data,
        U: Data,
        F: Fn(&T) -> U + Send + Sync,
    {
        let out = self.run_tasks("map", dataset.partitions(), |records| {
            records.iter().map(&f).collect::<Vec<U>>()
        })?;
        Ok(LocalDataset::from_partitions(out))
    }

    fn flat_map<T, U, I, F>(&self, dataset: &LocalDataset<T>, f: F) -> Result<LocalDataset<U>>
    where
        T: Data,
        U: Data,
        I: IntoIterator<Item = U>,
        F: Fn(&T) -> I + Send + Sync,
    {
        let out = self.run_tasks("flat_map", dataset.partitions(), |records| {
            records.iter().flat_map(&f).collect::<Vec<U>>()
        })?;
        Ok(LocalDataset::from_partitions(out))
    }

    fn group_by_key<K, V>(&self, dataset: &LocalDataset<(K, V)>) -> Result<LocalDataset<(K, Vec<V>)>>
    where
        K: Key,
        V: Data,
    {
        let incoming = self.shuffle("group_by_key", dataset, |(k, _)| k)?;
        let out = self.run_tasks("group_by_key", &incoming, |buckets| {
            let mut groups: FxHashMap<K, Vec<V>> = FxHashMap::default();
            for (k, v) in buckets.iter().flatten() {
                groups.entry(k.clone()).or_default().push(v.clone());
            }
            groups.into_iter().collect::<Vec<_>>()
        })?;
        Ok(LocalDataset::from_partitions(out))
    }

    fn distinct<T: Key>(&self, dataset: &LocalDataset<T>) -> Result<LocalDataset<T>> {
        let incoming = self.shuffle("distinct", dataset, |record| record)?;
        let out = self.run_tasks("distinct", &incoming, |buckets| {
            let mut seen: FxHashSet<&T> = FxHashSet::default();
            buckets
                .iter()
                .flatten()
                .filter(|record| seen.insert(*record))
                .cloned()
                .collect::<Vec<T>>()
        })?;
        Ok(LocalDataset::from_partitions(out))
    }

    fn set_difference<T: Key>(
        &self,
        left: &LocalDataset<T>,
        right: &LocalDataset<T>,
    ) -> Result<LocalDataset<T>> {
        let left_in = self.shuffle("set_difference", left, |record| record)?;
        let right_in = self.shuffle("set_difference", right, |record| record)?;
        let paired: Vec<(Vec<Vec<T>>, Vec<Vec<T>>)> = left_in.into_iter().zip(right_in).collect();

        let out = self.run_tasks("set_difference", &paired, |(l, r)| {
            let exclude: FxHashSet<&T> = r.iter().flatten().collect();
            let mut seen: FxHashSet<&T> = FxHashSet::default();
            l.iter()
                .flatten()
                .filter(|record| !exclude.contains(*record) && seen.insert(*record))
                .cloned()
                .collect::<Vec<T>>()
        })?;
        Ok(LocalDataset::from_partitions(out))
    }

    fn union<T: Data>(&self, left: &LocalDataset<T>, right: &LocalDataset<T>) -> LocalDataset<T> {
        let mut partitions = left.partitions.clone();
        partitions.extend(right.partitions.iter().cloned());
        LocalDataset { partitions }
    }

    fn read_text(&self, location: &Path) -> Result<LocalDataset<TextRecord>> {
        let files = storage::list_input_files(location)?;
        info!(
            "Reading {} input file(s) from {}",
            files.len(),
            location.display()
        );

        let per_file = self.run_tasks("read_text", &files, |path| storage::read_lines(path))?;
        let mut records = Vec::new();
        for file_records in per_file {
            records.extend(file_records?);
        }
        Ok(self.parallelize(records))
    }

    fn validate_output(&self, location: &Path, mode: SaveMode) -> Result<()> {
        storage::check_destination(location, mode)
    }

    fn save_text<T: Data + Display>(
        &self,
        dataset: &LocalDataset<T>,
        location: &Path,
        mode: SaveMode,
    ) -> Result<SaveSummary> {
        storage::check_destination(location, mode)?;
        let staging = storage::staging_dir(location)?;

        let shards: Vec<(usize, &Arc<Vec<T>>)> = dataset.partitions().iter().enumerate().collect();
        let written = self.run_tasks("save_text", &shards, |(index, records)| {
            storage::write_shard(staging.path(), *index, records.as_slice())
        })?;
        let mut records = 0;
        for count in written {
            records += count?;
        }

        storage::commit_staged(staging, location, mode)?;
        info!(
            "Wrote {} records in {} shards to {}",
            records,
            shards.len(),
            location.display()
        );

        Ok(SaveSummary {
            location: location.to_path_buf(),
            shards: shards.len(),
            records,
        })
    }

    fn stats(&self) -> EngineStats {
        EngineStats {
            tasks_launched: self.counters.tasks_launched.load(Ordering::Relaxed),
            task_failures: self.counters.task_failures.load(Ordering::Relaxed),
            shuffles: self.counters.shuffles.load(Ordering::Relaxed),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicUsize;

    fn engine(partitions: usize) -> LocalEngine {
        LocalEngine::start(
            EngineConfig::default()
                .with_workers(2)
                .with_partitions(partitions),
        )
        .unwrap()
    }

    fn sorted<T: Ord>(mut v: Vec<T>) -> Vec<T> {
        v.sort();
        v
    }

    #[test]
    fn test_parallelize_spreads_records() {
        let engine = engine(4);
        let ds = engine.parallelize((0u64..10).collect());

        assert_eq!(engine.num_partitions(&ds), 4);
        assert_eq!(engine.count(&ds), 10);
        assert_eq!(sorted(engine.collect(&ds)), (0u64..10).collect::<Vec<_>>());
    }

    #[test]
    fn test_parallelize_empty() {
        let engine = engine(3);
        let ds = engine.parallelize(Vec::<u64>::new());
        assert_eq!(engine.count(&ds), 0);
        assert_eq!(engine.num_partitions(&ds), 3);
    }

    #[test]
    fn test_map_and_flat_map() {
        let engine = engine(3);
        let ds = engine.parallelize(vec![1u64, 2, 3]);

        let doubled = engine.map(&ds, |x| x * 2).unwrap();
        assert_eq!(sorted(engine.collect(&doubled)), vec![2, 4, 6]);

        let repeated = engine.flat_map(&ds, |&x| std::iter::repeat(x).take(x as usize)).unwrap();
        assert_eq!(sorted(engine.collect(&repeated)), vec![1, 2, 2, 3, 3, 3]);
    }

    #[test]
    fn test_group_by_key_gathers_across_partitions() {
        let engine = engine(4);
        let ds = engine.parallelize(vec![(1u64, 'a'), (2, 'b'), (1, 'c'), (3, 'd'), (1, 'e')]);

        let grouped = engine.group_by_key(&ds).unwrap();
        let mut groups: Vec<(u64, Vec<char>)> = engine
            .collect(&grouped)
            .into_iter()
            .map(|(k, v)| (k, sorted(v)))
            .collect();
        groups.sort();

        assert_eq!(
            groups,
            vec![(1, vec!['a', 'c', 'e']), (2, vec!['b']), (3, vec!['d'])]
        );
    }

    #[test]
    fn test_distinct() {
        let engine = engine(5);
        let ds = engine.parallelize(vec![(1u64, 2u64), (2, 1), (1, 2), (1, 2), (3, 3)]);

        let unique = engine.distinct(&ds).unwrap();
        assert_eq!(sorted(engine.collect(&unique)), vec![(1, 2), (2, 1), (3, 3)]);
    }

    #[test]
    fn test_set_difference_and_union() {
        let engine = engine(3);
        let a = engine.parallelize(vec![1u64, 2, 3, 4, 4]);
        let b = engine.parallelize(vec![3u64, 4, 5]);

        let a_minus_b = engine.set_difference(&a, &b).unwrap();
        assert_eq!(sorted(engine.collect(&a_minus_b)), vec![1, 2]);

        let both = engine.union(&a, &b);
        assert_eq!(engine.count(&both), 8);
        assert_eq!(engine.num_partitions(&both), 6);
    }

    #[test]
    fn test_task_retried_after_panic() {
        let engine = engine(1);
        let ds = engine.parallelize(vec![1u64, 2, 3]);
        let calls = AtomicUsize::new(0);

        let out = engine
            .map(&ds, |x| {
                if calls.fetch_add(1, Ordering::SeqCst) == 0 {
                    panic!("transient worker loss");
                }
                x + 1
            })
            .unwrap();

        assert_eq!(sorted(engine.collect(&out)), vec![2, 3, 4]);
        assert_eq!(engine.stats().task_failures, 1);
    }

    #[test]
    fn test_task_fails_after_retry_budget() {
        let engine = LocalEngine::start(
            EngineConfig::default()
                .with_workers(1)
                .with_partitions(2)
                .with_max_task_attempts(2),
        )
        .unwrap();
        let ds = engine.parallelize(vec![1u64, 2]);

        let err = engine
            .map(&ds, |_| -> u64 { panic!("always broken") })
            .unwrap_err();

        assert_eq!(err.kind, crate::error::ErrorKind::Execution);
        assert!(err.message.contains("after 2 attempts"));
        assert!(err.message.contains("always broken"));
    }

    #[test]
    fn test_with_engine_scopes_context() {
        let total = with_engine(EngineConfig::default().with_workers(1), |engine| {
            let ds = engine.parallelize(vec![1u64, 2, 3]);
            engine.count(&ds)
        })
        .unwrap();
        assert_eq!(total, 3);
    }

    #[test]
    fn test_invalid_config_rejected_at_start() {
        let result = LocalEngine::start(EngineConfig::default().with_partitions(0));
        assert!(result.is_err());
    }
}
