//! Docker-compatible CLI runtime
//!
//! Handles every engine invocation the driver needs:
//! - Checking the engine is available
//! - Bringing the composed environment down, building and starting it
//! - Inspecting, exec'ing into and copying to/from stage containers
//! - Running disposable helpers against the shared volume

use async_trait::async_trait;
use sluice_core::PipelineConfig;
use std::path::{Path, PathBuf};
use tokio::process::Command;
use tracing::{debug, error, info};

use super::{CommandOutput, ContainerRuntime, HelperRun};
use crate::error::RuntimeError;

/// Runtime backed by `<engine>` and `<engine> compose`
///
/// Works with docker and podman alike.
pub struct ComposeRuntime {
    engine: String,
    compose_file: PathBuf,
    project: String,
}

impl ComposeRuntime {
    pub fn new(config: &PipelineConfig) -> Self {
        Self {
            engine: config.engine.clone(),
            compose_file: config.compose_file.clone(),
            project: config.project_name.clone(),
        }
    }

    /// Checks the engine is installed and answers, returning its version line
    pub async fn check_available(&self) -> Result<String, RuntimeError> {
        let mut command = Command::new(&self.engine);
        command.arg("--version");

        let output = self.invoke(command, "--version").await?;
        let output = output.into_result(format!("{} --version", self.engine))?;

        let version = output.stdout.trim().to_string();
        info!("Container engine is available: {}", version);
        Ok(version)
    }

    fn compose(&self) -> Command {
        let mut command = Command::new(&self.engine);
        command
            .arg("compose")
            .arg("-f")
            .arg(&self.compose_file)
            .arg("-p")
            .arg(&self.project);
        command
    }

    /// Runs a prepared command and captures its output
    async fn invoke(&self, mut command: Command, what: &str) -> Result<CommandOutput, RuntimeError> {
        debug!("Running {} {}", self.engine, what);

        let output = command
            .kill_on_drop(true)
            .output()
            .await
            .map_err(|source| RuntimeError::Spawn {
                program: self.engine.clone(),
                source,
            })?;

        let stdout = String::from_utf8_lossy(&output.stdout).to_string();
        let stderr = String::from_utf8_lossy(&output.stderr).to_string();
        let exit_code = output.status.code().unwrap_or(-1);

        if !stdout.trim().is_empty() {
            debug!("{} {} stdout: {}", self.engine, what, stdout.trim());
        }
        if !stderr.trim().is_empty() {
            debug!("{} {} stderr: {}", self.engine, what, stderr.trim());
        }
        if exit_code != 0 {
            debug!("{} {} exited with code {}", self.engine, what, exit_code);
        }

        Ok(CommandOutput {
            exit_code,
            stdout,
            stderr,
        })
    }
}

#[async_trait]
impl ContainerRuntime for ComposeRuntime {
    async fn compose_down(&self) -> Result<CommandOutput, RuntimeError> {
        let mut command = self.compose();
        command.arg("down").arg("--volumes").arg("--remove-orphans");
        self.invoke(command, "compose down").await
    }

    async fn compose_build(&self) -> Result<CommandOutput, RuntimeError> {
        let mut command = self.compose();
        command.arg("build");
        let output = self.invoke(command, "compose build").await?;
        if !output.success() {
            error!(
                "Image build failed: exit_code={}, stderr='{}'",
                output.exit_code,
                output.stderr.trim()
            );
        }
        Ok(output)
    }

    async fn compose_up(&self) -> Result<CommandOutput, RuntimeError> {
        let mut command = self.compose();
        command.arg("up").arg("-d");
        let output = self.invoke(command, "compose up").await?;
        if !output.success() {
            error!(
                "Starting stage containers failed: exit_code={}, stderr='{}'",
                output.exit_code,
                output.stderr.trim()
            );
        }
        Ok(output)
    }

    async fn compose_logs(&self) -> Result<CommandOutput, RuntimeError> {
        let mut command = self.compose();
        command.arg("logs").arg("--no-color");
        self.invoke(command, "compose logs").await
    }

    async fn is_running(&self, container: &str) -> Result<bool, RuntimeError> {
        let mut command = Command::new(&self.engine);
        command
            .arg("inspect")
            .arg("-f")
            .arg("{{.State.Running}}")
            .arg(container);

        let output = self.invoke(command, "inspect").await?;

        // A missing container makes inspect fail; that is simply "not running"
        Ok(output.success() && output.stdout.trim() == "true")
    }

    async fn exec(&self, container: &str, argv: &[String]) -> Result<CommandOutput, RuntimeError> {
        let mut command = Command::new(&self.engine);
        command.arg("exec").arg(container).args(argv);
        self.invoke(command, "exec").await
    }

    async fn copy_to(
        &self,
        local: &Path,
        container: &str,
        remote: &str,
    ) -> Result<CommandOutput, RuntimeError> {
        let mut command = Command::new(&self.engine);
        command
            .arg("cp")
            .arg(local)
            .arg(format!("{}:{}", container, remote));
        self.invoke(command, "cp (to container)").await
    }

    async fn copy_from(
        &self,
        container: &str,
        remote: &str,
        local: &Path,
    ) -> Result<CommandOutput, RuntimeError> {
        let mut command = Command::new(&self.engine);
        command
            .arg("cp")
            .arg(format!("{}:{}", container, remote))
            .arg(local);
        self.invoke(command, "cp (from container)").await
    }

    async fn run_helper(&self, helper: &HelperRun) -> Result<CommandOutput, RuntimeError> {
        let mut command = Command::new(&self.engine);
        command.arg("run").arg("--rm");
        for mount in &helper.mounts {
            command.arg("-v").arg(mount.to_arg());
        }
        command.arg(&helper.image).args(&helper.command);
        self.invoke(command, "run (helper)").await
    }
}
