//! Stage container handle
//!
//! Named accessor to one stage container's liveness, exec and copy
//! operations. No retry happens here; pacing belongs to the caller.

use sluice_core::domain::stage::StageContainer;
use std::path::Path;
use std::sync::Arc;
use tracing::{debug, warn};

use crate::error::RuntimeError;
use crate::runtime::{CommandOutput, ContainerRuntime};

/// Handle over one stage container
#[derive(Clone)]
pub struct WorkerHandle {
    container: StageContainer,
    runtime: Arc<dyn ContainerRuntime>,
}

impl WorkerHandle {
    pub fn new(container: StageContainer, runtime: Arc<dyn ContainerRuntime>) -> Self {
        Self { container, runtime }
    }

    pub fn name(&self) -> &str {
        &self.container.name
    }

    pub fn container(&self) -> &StageContainer {
        &self.container
    }

    /// Whether the container is currently running
    ///
    /// Observed fresh on every call. An engine that cannot be invoked counts
    /// as "not running" so the caller falls back to the volume.
    pub async fn is_running(&self) -> bool {
        match self.runtime.is_running(self.name()).await {
            Ok(running) => {
                debug!("Container {} running: {}", self.name(), running);
                running
            }
            Err(e) => {
                warn!("Failed to inspect container {}: {}", self.name(), e);
                false
            }
        }
    }

    /// Tests for a regular file inside the container
    pub async fn probe_file(&self, path: &str) -> bool {
        let command = ["test", "-f", path].map(String::from);
        match self.runtime.exec(self.name(), &command).await {
            Ok(output) => output.success(),
            Err(e) => {
                warn!("Failed to probe {} in {}: {}", path, self.name(), e);
                false
            }
        }
    }

    /// Runs a command in the container and returns its raw output
    pub async fn exec(&self, command: &[String]) -> Result<CommandOutput, RuntimeError> {
        debug!("Executing in container {}: {:?}", self.name(), command);
        self.runtime.exec(self.name(), command).await
    }

    /// Copies a host file into the container
    pub async fn copy_in(&self, local: &Path, remote: &str) -> Result<(), RuntimeError> {
        debug!(
            "Copying {} into {}:{}",
            local.display(),
            self.name(),
            remote
        );
        self.runtime
            .copy_to(local, self.name(), remote)
            .await?
            .into_result(format!("cp {} {}:{}", local.display(), self.name(), remote))?;
        Ok(())
    }

    /// Copies a container path out to the host
    pub async fn copy_out(&self, remote: &str, local: &Path) -> Result<(), RuntimeError> {
        debug!(
            "Copying {}:{} to {}",
            self.name(),
            remote,
            local.display()
        );
        self.runtime
            .copy_from(self.name(), remote, local)
            .await?
            .into_result(format!("cp {}:{} {}", self.name(), remote, local.display()))?;
        Ok(())
    }
}
