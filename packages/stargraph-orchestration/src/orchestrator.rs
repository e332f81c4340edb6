use crate::config::JobConfig;
use crate::error::{OrchestratorError, Result};
use crate::job::{Job, JobStateMachine};
use crate::report::{JobReport, RoundStats};
use chrono::Utc;
use stargraph_core::{
    ingest, symmetric_difference_count, ComponentMapping, CoreError, EdgeSet, StarContractor,
};
use stargraph_dataflow::Engine;
use std::path::Path;
use std::time::Instant;
use tracing::{debug, error, info};

/// Node identifier type read from edge records
pub type Node = u64;

/// Runs connected-components jobs on an engine the caller owns.
///
/// The engine is borrowed for the orchestrator's lifetime; acquiring and
/// releasing it is the caller's business (see `stargraph_dataflow::with_engine`).
pub struct Orchestrator<'e, E: Engine> {
    engine: &'e E,
    config: JobConfig,
    contractor: StarContractor,
}

impl<'e, E: Engine> Orchestrator<'e, E> {
    pub fn new(engine: &'e E, config: JobConfig) -> Result<Self> {
        config.validate()?;
        let contractor = StarContractor::new().with_invariant_checks(config.check_invariants);
        Ok(Self {
            engine,
            config,
            contractor,
        })
    }

    pub fn config(&self) -> &JobConfig {
        &self.config
    }

    /// New job in INIT for the configured locations
    pub fn create_job(&self) -> Result<Job> {
        Ok(Job::new(self.config.input()?, self.config.output()?))
    }

    /// Create and run a job
    pub fn execute(&self) -> Result<JobReport> {
        let job = self.create_job()?;
        let (_, result) = self.execute_job(job);
        result
    }

    /// Run a job to CONVERGED or FAILED.
    ///
    /// The job is returned in its final state together with the outcome.
    pub fn execute_job(&self, job: Job) -> (Job, Result<JobReport>) {
        let job_id = job.id;
        info!(
            "Starting job {} ({} -> {})",
            job_id,
            job.input_location.display(),
            job.output_location.display()
        );

        let mut sm = JobStateMachine::new(job);
        let result = self.run(&mut sm);

        if let Err(e) = &result {
            error!("Job {} failed during {}: {}", job_id, e.stage(), e);
            if let Err(transition) = sm.fail(e.stage(), e.to_string(), e.category()) {
                error!("Job {} could not be marked failed: {}", job_id, transition);
            }
        }

        (sm.into_job(), result)
    }

    fn run(&self, sm: &mut JobStateMachine) -> Result<JobReport> {
        let started_at = Utc::now();
        let start_time = Instant::now();
        let engine = self.engine;
        let input = sm.job().input_location.clone();
        let output = sm.job().output_location.clone();
        let mode = self.config.save_mode();

        // Fail fast before reading anything
        engine
            .validate_output(&output, mode)
            .map_err(|e| OrchestratorError::write(&output, e))?;

        let lines = engine.read_text(&input).map_err(OrchestratorError::ingest)?;
        let ingested = ingest::<E, Node>(engine, &lines).map_err(OrchestratorError::Ingest)?;

        let (converged, rounds) = self.contract(sm, ingested.edges)?;

        let mapping = ComponentMapping::from_converged(converged);
        let write_error = |e: CoreError| OrchestratorError::write(&output, e);
        let assignments = mapping.assignments(engine).map_err(write_error)?;
        let components = mapping.component_count(engine).map_err(write_error)?;
        let summary = engine
            .save_text(&assignments, &output, mode)
            .map_err(|e| OrchestratorError::write(&output, e))?;

        let duration_ms = start_time.elapsed().as_millis() as u64;
        info!(
            "Job {} converged after {} rounds: {} nodes in {} components, {} shards written to {} in {}ms",
            sm.job().id,
            rounds.len(),
            summary.records,
            components,
            summary.shards,
            output.display(),
            duration_ms
        );

        Ok(JobReport {
            job_id: sm.job().id,
            input_location: input,
            output_location: output,
            records: ingested.records,
            nodes: summary.records,
            components,
            rounds,
            output: summary,
            engine: engine.stats(),
            started_at,
            finished_at: Utc::now(),
            duration_ms,
        })
    }

    /// Alternate large-star and small-star until both agree
    fn contract(
        &self,
        sm: &mut JobStateMachine,
        edges: EdgeSet<E, Node>,
    ) -> Result<(EdgeSet<E, Node>, Vec<RoundStats>)> {
        let engine = self.engine;
        let mut rounds = Vec::new();

        if edges.is_empty(engine) {
            info!("Input holds no edges; nothing to contract");
            sm.converge()?;
            return Ok((edges, rounds));
        }

        let mut current = edges;
        let mut last_delta = 0;
        for round in 1..=self.config.max_rounds {
            let round_start = Instant::now();
            let input_edges = current.len(engine);

            sm.start_large_star(round)?;
            let large_star = self
                .contractor
                .large_star(engine, &current)
                .map_err(OrchestratorError::contraction(round))?;

            sm.start_small_star()?;
            let small_star = self
                .contractor
                .small_star(engine, &large_star)
                .map_err(OrchestratorError::contraction(round))?;

            let delta = symmetric_difference_count(engine, &large_star, &small_star)
                .map_err(OrchestratorError::contraction(round))?;

            let stats = RoundStats {
                round,
                input_edges,
                large_star_edges: large_star.len(engine),
                small_star_edges: small_star.len(engine),
                delta,
                elapsed_ms: round_start.elapsed().as_millis() as u64,
            };
            info!(
                "Round {}: {} edges in, large-star {}, small-star {}, delta {} ({}ms)",
                stats.round,
                stats.input_edges,
                stats.large_star_edges,
                stats.small_star_edges,
                stats.delta,
                stats.elapsed_ms
            );
            rounds.push(stats);

            current = small_star;
            if delta == 0 {
                sm.converge()?;
                return Ok((current, rounds));
            }
            last_delta = delta;
        }

        Err(OrchestratorError::RoundLimitExceeded {
            max_rounds: self.config.max_rounds,
            last_delta,
        })
    }
}

/// Number of records (lines) under `location`
pub fn count_input_records<E: Engine>(engine: &E, location: &Path) -> Result<usize> {
    let lines = engine
        .read_text(location)
        .map_err(OrchestratorError::ingest)?;
    let count = engine.count(&lines);
    debug!("{} holds {} records", location.display(), count);
    Ok(count)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::job::JobState;
    use stargraph_dataflow::{EngineConfig, LocalEngine};
    use std::fs;

    fn engine() -> LocalEngine {
        LocalEngine::start(EngineConfig::default().with_workers(2).with_partitions(3)).unwrap()
    }

    #[test]
    fn test_invalid_config_rejected_up_front() {
        let engine = engine();
        let err = Orchestrator::new(&engine, JobConfig::default()).err().unwrap();
        assert_eq!(err.exit_code(), 2);
    }

    #[test]
    fn test_execute_job_reaches_converged() {
        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("edges.txt");
        fs::write(&input, "1 2\n2 3\n4 5\n").unwrap();
        let output = dir.path().join("out");

        let engine = engine();
        let orchestrator = Orchestrator::new(&engine, JobConfig::new(&input, &output)).unwrap();
        let (job, result) = orchestrator.execute_job(orchestrator.create_job().unwrap());

        let report = result.unwrap();
        assert!(matches!(job.state, JobState::Converged { rounds: 2, .. }));
        assert_eq!(report.records, 3);
        assert_eq!(report.nodes, 5);
        assert_eq!(report.components, 2);
        assert_eq!(report.final_delta(), Some(0));
    }

    #[test]
    fn test_execute_job_records_failure() {
        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("edges.txt");
        fs::write(&input, "1 2\nx y\n").unwrap();
        let output = dir.path().join("out");

        let engine = engine();
        let orchestrator = Orchestrator::new(&engine, JobConfig::new(&input, &output)).unwrap();
        let (job, result) = orchestrator.execute_job(orchestrator.create_job().unwrap());

        assert!(result.unwrap_err().is_parse());
        match job.state {
            JobState::Failed { stage, .. } => assert_eq!(stage, crate::JobStage::Ingest),
            other => panic!("Expected Failed state, got {:?}", other),
        }
        assert!(!output.exists());
    }

    #[test]
    fn test_count_input_records_counts_every_line() {
        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("edges.txt");
        fs::write(&input, "1 2\n\n3 4\n").unwrap();

        let engine = engine();
        assert_eq!(count_input_records(&engine, &input).unwrap(), 3);
    }
}
