use crate::config::ConfigError;
use stargraph_core::CoreError;
use stargraph_dataflow::DataflowError;
use std::path::PathBuf;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, OrchestratorError>;

#[derive(Error, Debug)]
pub enum OrchestratorError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Ingest failed: {0}")]
    Ingest(#[source] CoreError),

    #[error("Contraction round {round} failed: {source}")]
    Contraction {
        round: usize,
        #[source]
        source: CoreError,
    },

    #[error("Writing output to {} failed: {source}", location.display())]
    Output {
        location: PathBuf,
        #[source]
        source: CoreError,
    },

    #[error("Output location already exists: {} (enable overwrite to replace it)", location.display())]
    OutputConflict { location: PathBuf },

    #[error("No fixed point after {max_rounds} rounds (last delta: {last_delta} edges)")]
    RoundLimitExceeded { max_rounds: usize, last_delta: usize },

    #[error("Engine error: {0}")]
    Engine(#[from] DataflowError),

    #[error("Invalid state transition: {from} -> {to}")]
    InvalidStateTransition { from: String, to: String },

    #[error("Serialization error: {0}")]
    Serialization(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl OrchestratorError {
    pub fn serialization<E: std::fmt::Display>(e: E) -> Self {
        Self::Serialization(e.to_string())
    }

    pub fn ingest(source: impl Into<CoreError>) -> Self {
        Self::Ingest(source.into())
    }

    pub fn contraction(round: usize) -> impl FnOnce(CoreError) -> Self {
        move |source| Self::Contraction { round, source }
    }

    /// Storage failure while validating or writing `location`
    pub fn write(location: impl Into<PathBuf>, source: impl Into<CoreError>) -> Self {
        let location = location.into();
        match source.into() {
            CoreError::Engine(e) if e.is_output_conflict() => Self::OutputConflict { location },
            source => Self::Output { location, source },
        }
    }

    /// Stage the error is attributed to
    pub fn stage(&self) -> JobStage {
        match self {
            Self::Ingest(_) => JobStage::Ingest,
            Self::Contraction { round, .. } => JobStage::Round(*round),
            Self::RoundLimitExceeded { max_rounds, .. } => JobStage::Round(*max_rounds),
            Self::Output { .. } | Self::OutputConflict { .. } => JobStage::Write,
            Self::Serialization(_) | Self::Io(_) => JobStage::Write,
            Self::Config(_) | Self::Engine(_) | Self::InvalidStateTransition { .. } => {
                JobStage::Setup
            }
        }
    }

    pub fn category(&self) -> ErrorCategory {
        match self {
            Self::Engine(_) | Self::Io(_) => ErrorCategory::Infrastructure,
            Self::Ingest(CoreError::Engine(_))
            | Self::Contraction {
                source: CoreError::Engine(_),
                ..
            }
            | Self::Output {
                source: CoreError::Engine(_),
                ..
            } => ErrorCategory::Infrastructure,
            _ => ErrorCategory::Permanent,
        }
    }

    pub fn is_parse(&self) -> bool {
        matches!(self, Self::Ingest(e) if e.is_parse())
    }

    /// Process exit status for this failure
    pub fn exit_code(&self) -> u8 {
        match self {
            Self::Config(_) => 2,
            Self::Ingest(e) if e.is_parse() => 3,
            Self::OutputConflict { .. } => 4,
            Self::RoundLimitExceeded { .. } => 5,
            _ => 1,
        }
    }
}

/// Where in a job a failure happened
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobStage {
    Setup,
    Ingest,
    Round(usize),
    Write,
}

impl std::fmt::Display for JobStage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            JobStage::Setup => write!(f, "setup"),
            JobStage::Ingest => write!(f, "ingest"),
            JobStage::Round(round) => write!(f, "contraction round {}", round),
            JobStage::Write => write!(f, "output write"),
        }
    }
}

/// Error category for reporting
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorCategory {
    /// Bad input or configuration; rerunning the same job fails the same way
    Permanent,
    /// Executor or storage failure (e.g., exhausted task retries, disk full)
    Infrastructure,
}

impl ErrorCategory {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorCategory::Permanent => "permanent",
            ErrorCategory::Infrastructure => "infrastructure",
        }
    }
}

impl std::str::FromStr for ErrorCategory {
    type Err = OrchestratorError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "permanent" => Ok(ErrorCategory::Permanent),
            "infrastructure" => Ok(ErrorCategory::Infrastructure),
            _ => Err(OrchestratorError::serialization(format!(
                "Invalid error category: {}",
                s
            ))),
        }
    }
}

impl std::fmt::Display for ErrorCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}
