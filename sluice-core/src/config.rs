//! Pipeline configuration
//!
//! Every container, volume and path name the driver touches lives here so
//! that nothing is hard-coded in the driver itself.

use std::path::PathBuf;
use std::time::Duration;

use crate::domain::artifact::ArtifactLayout;
use crate::domain::stage::{Stage, StageContainer};

/// Pipeline driver configuration
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    /// Container engine binary (e.g., "docker" or "podman")
    pub engine: String,

    /// Compose file describing the three stages and the shared volume
    pub compose_file: PathBuf,

    /// Compose project name
    pub project_name: String,

    /// Name of the shared volume as seen by the engine
    pub volume: String,

    /// Image used for disposable helper containers
    pub helper_image: String,

    pub fetcher_container: String,
    pub summarizer_container: String,
    pub aggregator_container: String,

    /// Input and artifact paths on the shared volume
    pub layout: ArtifactLayout,

    /// How long to wait for the report before giving up
    pub timeout: Duration,

    /// Delay between completion probes
    pub poll_interval: Duration,

    /// Base directory for per-run scratch directories
    pub scratch_base: PathBuf,

    /// Local directory the report and status documents are copied to
    pub output_dir: PathBuf,

    /// Number of report lines echoed after a successful run
    pub preview_lines: usize,
}

impl PipelineConfig {
    /// Container name for a stage
    pub fn container_name(&self, stage: Stage) -> &str {
        match stage {
            Stage::Fetcher => &self.fetcher_container,
            Stage::Summarizer => &self.summarizer_container,
            Stage::Aggregator => &self.aggregator_container,
        }
    }

    /// Stage container description including the artifact it produces
    pub fn stage_container(&self, stage: Stage) -> StageContainer {
        let container = StageContainer::new(stage, self.container_name(stage));
        match stage {
            Stage::Fetcher => container,
            Stage::Summarizer => container.with_artifact(self.layout.status_dir.clone()),
            Stage::Aggregator => container.with_artifact(self.layout.report_file.clone()),
        }
    }

    /// Creates configuration from environment variables
    ///
    /// Every variable is optional; unset or unparsable values keep the default.
    /// - SLUICE_ENGINE (default: docker)
    /// - SLUICE_COMPOSE_FILE (default: docker-compose.yml)
    /// - SLUICE_PROJECT (default: sluice)
    /// - SLUICE_VOLUME (default: sluice_shared)
    /// - SLUICE_HELPER_IMAGE (default: alpine:3)
    /// - SLUICE_TIMEOUT (seconds, default: 300)
    /// - SLUICE_POLL_INTERVAL (seconds, default: 5)
    /// - SLUICE_SCRATCH_DIR (default: system temp dir)
    /// - SLUICE_OUTPUT_DIR (default: ./output)
    pub fn from_env() -> Self {
        let mut config = Self::default();

        if let Some(engine) = env_string("SLUICE_ENGINE") {
            config.engine = engine;
        }
        if let Some(file) = env_string("SLUICE_COMPOSE_FILE") {
            config.compose_file = PathBuf::from(file);
        }
        if let Some(project) = env_string("SLUICE_PROJECT") {
            config.project_name = project;
        }
        if let Some(volume) = env_string("SLUICE_VOLUME") {
            config.volume = volume;
        }
        if let Some(image) = env_string("SLUICE_HELPER_IMAGE") {
            config.helper_image = image;
        }
        if let Some(secs) = env_string("SLUICE_TIMEOUT").and_then(|s| s.parse::<u64>().ok()) {
            config.timeout = Duration::from_secs(secs);
        }
        if let Some(secs) = env_string("SLUICE_POLL_INTERVAL").and_then(|s| s.parse::<u64>().ok()) {
            config.poll_interval = Duration::from_secs(secs);
        }
        if let Some(dir) = env_string("SLUICE_SCRATCH_DIR") {
            config.scratch_base = PathBuf::from(dir);
        }
        if let Some(dir) = env_string("SLUICE_OUTPUT_DIR") {
            config.output_dir = PathBuf::from(dir);
        }

        config
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval;
        self
    }

    pub fn with_output_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.output_dir = dir.into();
        self
    }

    pub fn with_scratch_base(mut self, dir: impl Into<PathBuf>) -> Self {
        self.scratch_base = dir.into();
        self
    }

    /// Validates the configuration
    pub fn validate(&self) -> anyhow::Result<()> {
        if self.engine.is_empty() {
            anyhow::bail!("engine cannot be empty");
        }

        if self.project_name.is_empty() {
            anyhow::bail!("project_name cannot be empty");
        }

        if self.volume.is_empty() {
            anyhow::bail!("volume cannot be empty");
        }

        if self.helper_image.is_empty() {
            anyhow::bail!("helper_image cannot be empty");
        }

        for stage in Stage::ALL {
            if self.container_name(stage).is_empty() {
                anyhow::bail!("container name for {} cannot be empty", stage);
            }
        }

        if !self.layout.mount.starts_with('/') {
            anyhow::bail!("volume mount must be an absolute path");
        }

        for (label, path) in [
            ("input_file", &self.layout.input_file),
            ("report_file", &self.layout.report_file),
            ("status_dir", &self.layout.status_dir),
        ] {
            if !self.layout.is_on_volume(path) || path == &self.layout.mount {
                anyhow::bail!("{} must lie under the volume mount {}", label, self.layout.mount);
            }
        }

        if self.poll_interval.is_zero() {
            anyhow::bail!("poll_interval must be greater than 0");
        }

        if self.timeout.is_zero() {
            anyhow::bail!("timeout must be greater than 0");
        }

        Ok(())
    }
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            engine: "docker".to_string(),
            compose_file: PathBuf::from("docker-compose.yml"),
            project_name: "sluice".to_string(),
            volume: "sluice_shared".to_string(),
            helper_image: "alpine:3".to_string(),
            fetcher_container: "sluice-fetcher".to_string(),
            summarizer_container: "sluice-summarizer".to_string(),
            aggregator_container: "sluice-aggregator".to_string(),
            layout: ArtifactLayout::default(),
            timeout: Duration::from_secs(300), // 5 minutes
            poll_interval: Duration::from_secs(5),
            scratch_base: std::env::temp_dir(),
            output_dir: PathBuf::from("output"),
            preview_lines: 20,
        }
    }
}

fn env_string(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|s| !s.trim().is_empty())
}
