//! Job report
//!
//! Collected by the orchestrator while a job runs and returned on success.

use crate::error::{OrchestratorError, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use stargraph_dataflow::{EngineStats, SaveSummary};
use std::path::{Path, PathBuf};
use uuid::Uuid;

/// Statistics of one contraction round
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoundStats {
    pub round: usize,
    /// Edges entering the round
    pub input_edges: usize,
    pub large_star_edges: usize,
    pub small_star_edges: usize,
    /// Symmetric difference between the large-star and small-star outputs
    pub delta: usize,
    pub elapsed_ms: u64,
}

/// Summary of a converged job
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JobReport {
    pub job_id: Uuid,
    pub input_location: PathBuf,
    pub output_location: PathBuf,
    /// Edge records read from the input
    pub records: usize,
    /// Nodes labelled in the output
    pub nodes: usize,
    pub components: usize,
    pub rounds: Vec<RoundStats>,
    pub output: SaveSummary,
    pub engine: EngineStats,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    pub duration_ms: u64,
}

impl JobReport {
    pub fn round_count(&self) -> usize {
        self.rounds.len()
    }

    /// Delta of the final round (0 for a converged job with at least one round)
    pub fn final_delta(&self) -> Option<usize> {
        self.rounds.last().map(|r| r.delta)
    }

    pub fn to_json(&self) -> Result<String> {
        serde_json::to_string_pretty(self).map_err(OrchestratorError::serialization)
    }

    pub fn write_json(&self, path: &Path) -> Result<()> {
        std::fs::write(path, self.to_json()?)?;
        Ok(())
    }
}
