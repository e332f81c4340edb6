use crate::error::{ErrorCategory, JobStage, OrchestratorError, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use uuid::Uuid;

/// Job state (INIT → LARGE_STAR ⇄ SMALL_STAR → CONVERGED, or FAILED)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum JobState {
    Init,
    LargeStar {
        round: usize,
    },
    SmallStar {
        round: usize,
    },
    Converged {
        rounds: usize,
        converged_at: DateTime<Utc>,
    },
    Failed {
        stage: JobStage,
        error: String,
        error_category: ErrorCategory,
        failed_at: DateTime<Utc>,
    },
}

impl JobState {
    pub fn state_name(&self) -> &'static str {
        match self {
            JobState::Init => "init",
            JobState::LargeStar { .. } => "large_star",
            JobState::SmallStar { .. } => "small_star",
            JobState::Converged { .. } => "converged",
            JobState::Failed { .. } => "failed",
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, JobState::Converged { .. } | JobState::Failed { .. })
    }

    /// Round in progress or last round completed (0 before the first round)
    pub fn round(&self) -> usize {
        match self {
            JobState::Init | JobState::Failed { .. } => 0,
            JobState::LargeStar { round } | JobState::SmallStar { round } => *round,
            JobState::Converged { rounds, .. } => *rounds,
        }
    }
}

/// Job model
#[derive(Debug, Clone)]
pub struct Job {
    pub id: Uuid,
    pub input_location: PathBuf,
    pub output_location: PathBuf,
    pub state: JobState,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Job {
    pub fn new(input_location: impl Into<PathBuf>, output_location: impl Into<PathBuf>) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            input_location: input_location.into(),
            output_location: output_location.into(),
            state: JobState::Init,
            created_at: now,
            updated_at: now,
        }
    }
}

/// Job state machine for transitions
pub struct JobStateMachine {
    job: Job,
}

impl JobStateMachine {
    pub fn new(job: Job) -> Self {
        Self { job }
    }

    pub fn job(&self) -> &Job {
        &self.job
    }

    pub fn into_job(self) -> Job {
        self.job
    }

    fn transition(&mut self, state: JobState) {
        self.job.state = state;
        self.job.updated_at = Utc::now();
    }

    fn invalid(&self, to: impl Into<String>) -> OrchestratorError {
        OrchestratorError::InvalidStateTransition {
            from: self.job.state.state_name().to_string(),
            to: to.into(),
        }
    }

    /// Transition: INIT → LARGE_STAR (round 1) or SMALL_STAR(n) → LARGE_STAR(n + 1)
    pub fn start_large_star(&mut self, round: usize) -> Result<()> {
        let expected = match &self.job.state {
            JobState::Init => 1,
            JobState::SmallStar { round: done } => done + 1,
            _ => return Err(self.invalid("large_star")),
        };
        if round != expected {
            return Err(self.invalid(format!("large_star (round {})", round)));
        }

        self.transition(JobState::LargeStar { round });
        Ok(())
    }

    /// Transition: LARGE_STAR → SMALL_STAR (same round)
    pub fn start_small_star(&mut self) -> Result<()> {
        match &self.job.state {
            JobState::LargeStar { round } => {
                let round = *round;
                self.transition(JobState::SmallStar { round });
                Ok(())
            }
            _ => Err(self.invalid("small_star")),
        }
    }

    /// Transition: SMALL_STAR → CONVERGED, or INIT → CONVERGED for an empty edge set
    pub fn converge(&mut self) -> Result<()> {
        let rounds = match &self.job.state {
            JobState::Init => 0,
            JobState::SmallStar { round } => *round,
            _ => return Err(self.invalid("converged")),
        };

        self.transition(JobState::Converged {
            rounds,
            converged_at: Utc::now(),
        });
        Ok(())
    }

    /// Transition: * → FAILED
    pub fn fail(
        &mut self,
        stage: JobStage,
        error: String,
        error_category: ErrorCategory,
    ) -> Result<()> {
        if self.job.state.is_terminal() {
            return Err(self.invalid("failed"));
        }

        self.transition(JobState::Failed {
            stage,
            error,
            error_category,
            failed_at: Utc::now(),
        });
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn machine() -> JobStateMachine {
        JobStateMachine::new(Job::new("in", "out"))
    }

    #[test]
    fn test_full_round_cycle() {
        let mut sm = machine();

        sm.start_large_star(1).unwrap();
        assert_eq!(sm.job().state, JobState::LargeStar { round: 1 });
        sm.start_small_star().unwrap();
        sm.start_large_star(2).unwrap();
        sm.start_small_star().unwrap();
        sm.converge().unwrap();

        match &sm.job().state {
            JobState::Converged { rounds, .. } => assert_eq!(*rounds, 2),
            other => panic!("Expected Converged state, got {:?}", other),
        }
        assert!(sm.job().state.is_terminal());
        assert!(sm.job().updated_at >= sm.job().created_at);
    }

    #[test]
    fn test_empty_input_converges_from_init() {
        let mut sm = machine();
        sm.converge().unwrap();
        assert_eq!(sm.job().state.round(), 0);
        assert_eq!(sm.job().state.state_name(), "converged");
    }

    #[test]
    fn test_rounds_must_be_consecutive() {
        let mut sm = machine();
        assert!(sm.start_large_star(2).is_err());

        sm.start_large_star(1).unwrap();
        sm.start_small_star().unwrap();
        let err = sm.start_large_star(3).unwrap_err();
        assert!(matches!(err, OrchestratorError::InvalidStateTransition { .. }));
    }

    #[test]
    fn test_converge_requires_small_star() {
        let mut sm = machine();
        sm.start_large_star(1).unwrap();

        let err = sm.converge().unwrap_err();
        assert_eq!(
            err.to_string(),
            "Invalid state transition: large_star -> converged"
        );
    }

    #[test]
    fn test_fail_records_stage() {
        let mut sm = machine();
        sm.start_large_star(1).unwrap();
        sm.fail(
            JobStage::Round(1),
            "boom".to_string(),
            ErrorCategory::Infrastructure,
        )
        .unwrap();

        match &sm.job().state {
            JobState::Failed {
                stage,
                error,
                error_category,
                ..
            } => {
                assert_eq!(*stage, JobStage::Round(1));
                assert_eq!(error, "boom");
                assert_eq!(*error_category, ErrorCategory::Infrastructure);
            }
            other => panic!("Expected Failed state, got {:?}", other),
        }

        assert!(sm
            .fail(JobStage::Write, "again".to_string(), ErrorCategory::Permanent)
            .is_err());
    }

    #[test]
    fn test_state_serialization() {
        let json = serde_json::to_string(&JobState::SmallStar { round: 3 }).unwrap();
        assert_eq!(json, r#"{"type":"small_star","round":3}"#);
    }
}
