//! Container engine primitives
//!
//! The driver only ever talks to the engine through [`ContainerRuntime`].
//! [`ComposeRuntime`] shells out to a docker-compatible CLI; tests substitute
//! an in-memory implementation.

mod compose;

pub use compose::ComposeRuntime;

use async_trait::async_trait;
use std::path::Path;

use crate::error::RuntimeError;

/// Captured result of one engine invocation
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CommandOutput {
    pub exit_code: i32,
    pub stdout: String,
    pub stderr: String,
}

impl CommandOutput {
    pub fn ok() -> Self {
        Self::default()
    }

    pub fn failed(exit_code: i32, stderr: impl Into<String>) -> Self {
        Self {
            exit_code,
            stdout: String::new(),
            stderr: stderr.into(),
        }
    }

    pub fn success(&self) -> bool {
        self.exit_code == 0
    }

    /// Turns a non-zero exit status into [`RuntimeError::CommandFailed`]
    pub fn into_result(self, command: impl Into<String>) -> Result<Self, RuntimeError> {
        if self.success() {
            Ok(self)
        } else {
            Err(RuntimeError::CommandFailed {
                command: command.into(),
                exit_code: self.exit_code,
                stderr: self.stderr.trim().to_string(),
            })
        }
    }
}

/// A bind or volume mount for a helper container
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Mount {
    /// Volume name or absolute host path
    pub source: String,
    /// Mount point inside the helper
    pub target: String,
    pub read_only: bool,
}

impl Mount {
    pub fn new(source: impl Into<String>, target: impl Into<String>) -> Self {
        Self {
            source: source.into(),
            target: target.into(),
            read_only: false,
        }
    }

    pub fn read_only(mut self) -> Self {
        self.read_only = true;
        self
    }

    /// Renders the `-v` argument
    pub fn to_arg(&self) -> String {
        if self.read_only {
            format!("{}:{}:ro", self.source, self.target)
        } else {
            format!("{}:{}", self.source, self.target)
        }
    }
}

/// A disposable, auto-removed helper container invocation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HelperRun {
    pub image: String,
    pub mounts: Vec<Mount>,
    pub command: Vec<String>,
}

/// Container engine and composition tool primitives
///
/// Every method blocks the calling task until the invocation returns. An
/// `Err` means the engine could not be invoked; a non-zero exit status is
/// reported through [`CommandOutput`] and left for the caller to judge.
#[async_trait]
pub trait ContainerRuntime: Send + Sync {
    /// Stops and removes the composed environment, including its volumes
    async fn compose_down(&self) -> Result<CommandOutput, RuntimeError>;

    /// Builds the stage images
    async fn compose_build(&self) -> Result<CommandOutput, RuntimeError>;

    /// Starts all stage containers detached
    async fn compose_up(&self) -> Result<CommandOutput, RuntimeError>;

    /// Collects the logs of every stage container
    async fn compose_logs(&self) -> Result<CommandOutput, RuntimeError>;

    /// Whether the named container exists and is in the running state
    async fn is_running(&self, container: &str) -> Result<bool, RuntimeError>;

    /// Runs a command inside a running container
    async fn exec(&self, container: &str, command: &[String]) -> Result<CommandOutput, RuntimeError>;

    /// Copies a host path into a container
    async fn copy_to(
        &self,
        local: &Path,
        container: &str,
        remote: &str,
    ) -> Result<CommandOutput, RuntimeError>;

    /// Copies a container path to the host
    ///
    /// When `local` is an existing directory the source lands inside it under
    /// its own name.
    async fn copy_from(
        &self,
        container: &str,
        remote: &str,
        local: &Path,
    ) -> Result<CommandOutput, RuntimeError>;

    /// Runs a disposable helper container to completion
    async fn run_helper(&self, helper: &HelperRun) -> Result<CommandOutput, RuntimeError>;
}
