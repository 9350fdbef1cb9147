//! Error types for the pipeline driver

use sluice_core::domain::run::RunState;
use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

/// Result type alias for driver operations
pub type Result<T> = std::result::Result<T, PipelineError>;

/// Errors raised by a single container engine invocation
#[derive(Debug, Error)]
pub enum RuntimeError {
    /// The engine binary could not be started at all
    #[error("Failed to execute '{program}': {source}")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },

    /// The invocation ran and returned a non-zero exit status
    #[error("'{command}' failed with exit code {exit_code}: {stderr}")]
    CommandFailed {
        command: String,
        exit_code: i32,
        stderr: String,
    },

    /// A host path handed to the engine could not be resolved
    #[error("Invalid local path {}: {source}", path.display())]
    LocalPath {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl RuntimeError {
    /// Exit code of the failed invocation, if it ran
    pub fn exit_code(&self) -> Option<i32> {
        match self {
            Self::CommandFailed { exit_code, .. } => Some(*exit_code),
            _ => None,
        }
    }
}

/// Fatal outcomes of a pipeline run
///
/// Every variant short-circuits the run; teardown still happens.
#[derive(Debug, Error)]
pub enum PipelineError {
    /// Empty URL list or a malformed URL; raised before any container work
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Building images or starting the stage containers failed
    #[error("Provisioning failed during {step}: {source}")]
    Provision {
        step: &'static str,
        #[source]
        source: RuntimeError,
    },

    /// The URL list could not be copied into the fetcher
    #[error("Failed to inject input into {container}: {source}")]
    Injection {
        container: String,
        #[source]
        source: RuntimeError,
    },

    /// The report did not appear within the budget
    #[error("Pipeline timed out after {}s without producing a report", budget.as_secs())]
    Timeout { budget: Duration, logs: String },

    /// Neither extraction path left the report in the output directory
    #[error("No output generated: {} is missing", expected.display())]
    Extraction { expected: PathBuf },

    /// Local scratch or output directory handling failed
    #[error("Local filesystem error: {0}")]
    Io(#[from] std::io::Error),
}

impl PipelineError {
    pub fn is_timeout(&self) -> bool {
        matches!(self, Self::Timeout { .. })
    }

    /// Terminal state a run ends in when it fails with this error
    pub fn run_state(&self) -> RunState {
        match self {
            Self::Timeout { .. } => RunState::TimedOut,
            _ => RunState::Failed,
        }
    }

    /// Container logs captured before teardown, if any
    pub fn captured_logs(&self) -> Option<&str> {
        match self {
            Self::Timeout { logs, .. } if !logs.is_empty() => Some(logs),
            _ => None,
        }
    }
}
