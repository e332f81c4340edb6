/*
 * Stargraph Orchestration - connected-components jobs
 *
 * Architecture:
 * - Job configuration (YAML + command-line overrides)
 * - Job state machine (INIT → LARGE_STAR ⇄ SMALL_STAR → CONVERGED / FAILED)
 * - Orchestrator driving rounds to the fixed point over an engine
 * - Job report (per-round statistics, JSON)
 */

// Public modules
pub mod config;
pub mod error;
pub mod job;
pub mod orchestrator;
pub mod report;

// Re-exports
pub use config::{ConfigError, ConfigResult, JobConfig, DEFAULT_MAX_ROUNDS};
pub use error::{ErrorCategory, JobStage, OrchestratorError, Result};
pub use job::{Job, JobState, JobStateMachine};
pub use orchestrator::{count_input_records, Node, Orchestrator};
pub use report::{JobReport, RoundStats};
