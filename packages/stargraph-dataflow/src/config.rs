//! Engine configuration
//!
//! Worker sizing follows the same rule the adaptive pool tuner uses: aim for
//! ~85% of the detected cores, never fewer than one worker.

use crate::error::{DataflowError, Result};
use serde::{Deserialize, Serialize};

/// Target share of CPU cores handed to the worker pool
const TARGET_UTILIZATION: f64 = 0.85;

/// Hard ceiling for partition counts (one task per partition per operation)
pub const MAX_PARTITIONS: usize = 65_536;

/// Local engine configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Worker threads (None = derived from CPU count)
    pub workers: Option<usize>,

    /// Number of partitions every dataset is split into
    pub partitions: usize,

    /// Attempts per partition task before the operation fails
    pub max_task_attempts: u32,

    /// Stack size per worker thread in bytes
    pub stack_size: usize,
}

impl Default for EngineConfig {
    fn default() -> Self {
        let workers = default_workers();
        Self {
            workers: None,
            partitions: (workers * 2).max(1),
            max_task_attempts: 3,
            stack_size: 8 * 1024 * 1024, // 8MB
        }
    }
}

impl EngineConfig {
    pub fn with_workers(mut self, workers: usize) -> Self {
        self.workers = Some(workers);
        self
    }

    pub fn with_partitions(mut self, partitions: usize) -> Self {
        self.partitions = partitions;
        self
    }

    pub fn with_max_task_attempts(mut self, attempts: u32) -> Self {
        self.max_task_attempts = attempts;
        self
    }

    /// Effective worker count
    pub fn resolved_workers(&self) -> usize {
        self.workers.unwrap_or_else(default_workers)
    }

    pub fn validate(&self) -> Result<()> {
        if let Some(0) = self.workers {
            return Err(DataflowError::config("workers must be at least 1"));
        }
        if self.partitions == 0 || self.partitions > MAX_PARTITIONS {
            return Err(DataflowError::config(format!(
                "partitions must be in 1..={}, got {}",
                MAX_PARTITIONS, self.partitions
            )));
        }
        if self.max_task_attempts == 0 {
            return Err(DataflowError::config("max_task_attempts must be at least 1"));
        }
        if self.stack_size < 64 * 1024 {
            return Err(DataflowError::config(format!(
                "stack_size must be at least 64KiB, got {}",
                self.stack_size
            )));
        }
        Ok(())
    }
}

fn default_workers() -> usize {
    let cpus = num_cpus::get().max(1);
    ((cpus as f64 * TARGET_UTILIZATION).ceil() as usize).clamp(1, cpus)
}
