//! Shared volume access through disposable helpers
//!
//! When the terminal stage container has exited (or been removed) the shared
//! volume is still there. These helpers mount it into a short-lived `--rm`
//! container to look at or copy out what the stages left behind.

use sluice_core::PipelineConfig;
use std::path::Path;
use std::sync::Arc;
use tracing::{debug, warn};

use crate::error::RuntimeError;
use crate::runtime::{ContainerRuntime, HelperRun, Mount};

/// Where the caller's output directory is mounted inside copy helpers
const HELPER_OUTPUT_MOUNT: &str = "/out";

/// Copies `$2` into directory `$1`, creating it first
const COPY_SCRIPT: &str = r#"mkdir -p "$1" && cp -R "$2" "$1"/"#;

/// Fallback view of the shared volume
#[derive(Clone)]
pub struct SharedVolumeProbe {
    volume: String,
    mount: String,
    image: String,
    runtime: Arc<dyn ContainerRuntime>,
}

impl SharedVolumeProbe {
    pub fn new(config: &PipelineConfig, runtime: Arc<dyn ContainerRuntime>) -> Self {
        Self {
            volume: config.volume.clone(),
            mount: config.layout.mount.clone(),
            image: config.helper_image.clone(),
            runtime,
        }
    }

    fn volume_mount(&self) -> Mount {
        Mount::new(&self.volume, &self.mount).read_only()
    }

    /// Tests for a regular file on the volume
    pub async fn file_exists(&self, path: &str) -> bool {
        let helper = HelperRun {
            image: self.image.clone(),
            mounts: vec![self.volume_mount()],
            command: ["test", "-f", path].map(String::from).to_vec(),
        };

        match self.runtime.run_helper(&helper).await {
            Ok(output) => {
                debug!("Volume probe for {}: exit_code={}", path, output.exit_code);
                output.success()
            }
            Err(e) => {
                warn!("Volume probe for {} could not run: {}", path, e);
                false
            }
        }
    }

    /// Copies a file or directory from the volume into `local_dir`
    ///
    /// The source keeps its name; `local_dir` is created if needed.
    pub async fn copy_out(&self, path: &str, local_dir: &Path) -> Result<(), RuntimeError> {
        std::fs::create_dir_all(local_dir).map_err(|source| RuntimeError::LocalPath {
            path: local_dir.to_path_buf(),
            source,
        })?;
        let host_dir = local_dir
            .canonicalize()
            .map_err(|source| RuntimeError::LocalPath {
                path: local_dir.to_path_buf(),
                source,
            })?;

        let helper = HelperRun {
            image: self.image.clone(),
            mounts: vec![
                self.volume_mount(),
                Mount::new(host_dir.to_string_lossy(), HELPER_OUTPUT_MOUNT),
            ],
            command: vec![
                "sh".to_string(),
                "-c".to_string(),
                COPY_SCRIPT.to_string(),
                "sh".to_string(),
                HELPER_OUTPUT_MOUNT.to_string(),
                path.to_string(),
            ],
        };

        debug!(
            "Copying {} from volume {} to {}",
            path,
            self.volume,
            host_dir.display()
        );
        self.runtime
            .run_helper(&helper)
            .await?
            .into_result(format!("helper copy of {}", path))?;
        Ok(())
    }
}
