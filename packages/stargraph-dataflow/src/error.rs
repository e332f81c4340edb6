//! Error types for stargraph-dataflow

use std::fmt;
use thiserror::Error;

/// Dataflow error kinds
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// A partition task kept failing after the retry budget was spent
    Execution,
    /// Reading or writing storage failed
    Io,
    /// Output destination already exists and overwrite was not requested
    OutputConflict,
    /// Input/output location is unusable (missing, wrong type)
    InvalidLocation,
    /// Engine configuration errors
    Config,
}

impl ErrorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorKind::Execution => "execution",
            ErrorKind::Io => "io",
            ErrorKind::OutputConflict => "output_conflict",
            ErrorKind::InvalidLocation => "invalid_location",
            ErrorKind::Config => "config",
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Dataflow error type
#[derive(Debug, Error)]
#[error("[{kind}] {message}")]
pub struct DataflowError {
    #[source]
    pub source: Option<Box<dyn std::error::Error + Send + Sync>>,
    pub kind: ErrorKind,
    pub message: String,
}

impl DataflowError {
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
            source: None,
        }
    }

    pub fn with_source(mut self, source: impl std::error::Error + Send + Sync + 'static) -> Self {
        self.source = Some(Box::new(source));
        self
    }

    // Convenience constructors
    pub fn execution(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Execution, message)
    }

    pub fn io(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Io, message)
    }

    pub fn output_conflict(location: impl AsRef<std::path::Path>) -> Self {
        Self::new(
            ErrorKind::OutputConflict,
            format!(
                "Output location already exists: {}",
                location.as_ref().display()
            ),
        )
    }

    pub fn invalid_location(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::InvalidLocation, message)
    }

    pub fn config(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Config, message)
    }

    pub fn is_output_conflict(&self) -> bool {
        self.kind == ErrorKind::OutputConflict
    }
}

impl From<std::io::Error> for DataflowError {
    fn from(err: std::io::Error) -> Self {
        DataflowError::io(format!("I/O error: {}", err)).with_source(err)
    }
}

impl From<walkdir::Error> for DataflowError {
    fn from(err: walkdir::Error) -> Self {
        DataflowError::io(format!("Directory walk failed: {}", err)).with_source(err)
    }
}

impl From<rayon::ThreadPoolBuildError> for DataflowError {
    fn from(err: rayon::ThreadPoolBuildError) -> Self {
        DataflowError::config(format!("Failed to build worker pool: {}", err)).with_source(err)
    }
}

/// Result type alias
pub type Result<T> = std::result::Result<T, DataflowError>;
