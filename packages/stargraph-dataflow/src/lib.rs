/*
 * Stargraph Dataflow - partitioned collection engine
 *
 * Architecture:
 * - engine/    : capability interface (map, flat_map, group_by_key, distinct,
 *                set_difference, union, count, text read/write)
 * - local/     : in-process executor on a dedicated rayon pool
 * - partition/ : deterministic hash partitioning for shuffles
 * - storage/   : line-oriented sources, sharded sinks with atomic commit
 */

pub mod config;
pub mod engine;
pub mod error;
pub mod local;
pub mod partition;
pub mod storage;

// Re-exports
pub use config::EngineConfig;
pub use engine::{Data, Engine, EngineStats, Key};
pub use error::{DataflowError, ErrorKind, Result};
pub use local::{with_engine, LocalDataset, LocalEngine};
pub use partition::HashPartitioner;
pub use storage::{SaveMode, SaveSummary, TextRecord, SUCCESS_MARKER};
