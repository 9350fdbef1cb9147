//! Artifact channels
//!
//! There is no notification when the aggregator finishes. Its report file is
//! the only signal, and it can be seen two ways: through the live container
//! or, once that container has exited, through the shared volume. Both are
//! [`ArtifactChannel`]s; [`CompletionProbe`] picks one per tick by liveness.

use async_trait::async_trait;
use serde::Serialize;
use std::path::Path;

use crate::error::RuntimeError;
use crate::volume::SharedVolumeProbe;
use crate::worker::WorkerHandle;

/// Which channel observed or delivered the artifact
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ChannelKind {
    /// Exec/copy against the running terminal stage container
    Live,
    /// Disposable helper mounting the shared volume
    Volume,
}

impl std::fmt::Display for ChannelKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ChannelKind::Live => f.write_str("live container"),
            ChannelKind::Volume => f.write_str("shared volume"),
        }
    }
}

/// A way of checking for and retrieving artifacts
#[async_trait]
pub trait ArtifactChannel: Send + Sync {
    fn kind(&self) -> ChannelKind;

    /// Whether a regular file exists at `path`
    async fn artifact_exists(&self, path: &str) -> bool;

    /// Copies `path` (file or directory) into `local_dir`, keeping its name
    async fn fetch(&self, path: &str, local_dir: &Path) -> Result<(), RuntimeError>;
}

#[async_trait]
impl ArtifactChannel for WorkerHandle {
    fn kind(&self) -> ChannelKind {
        ChannelKind::Live
    }

    async fn artifact_exists(&self, path: &str) -> bool {
        self.probe_file(path).await
    }

    async fn fetch(&self, path: &str, local_dir: &Path) -> Result<(), RuntimeError> {
        std::fs::create_dir_all(local_dir).map_err(|source| RuntimeError::LocalPath {
            path: local_dir.to_path_buf(),
            source,
        })?;
        self.copy_out(path, local_dir).await
    }
}

#[async_trait]
impl ArtifactChannel for SharedVolumeProbe {
    fn kind(&self) -> ChannelKind {
        ChannelKind::Volume
    }

    async fn artifact_exists(&self, path: &str) -> bool {
        self.file_exists(path).await
    }

    async fn fetch(&self, path: &str, local_dir: &Path) -> Result<(), RuntimeError> {
        self.copy_out(path, local_dir).await
    }
}

/// Completion check over the terminal stage
pub struct CompletionProbe {
    live: WorkerHandle,
    volume: SharedVolumeProbe,
}

impl CompletionProbe {
    pub fn new(live: WorkerHandle, volume: SharedVolumeProbe) -> Self {
        Self { live, volume }
    }

    /// Picks the channel that can currently reach the artifact
    pub async fn select(&self) -> &dyn ArtifactChannel {
        if self.live.is_running().await {
            &self.live
        } else {
            &self.volume
        }
    }

    /// One completion check; returns the channel that saw the artifact
    pub async fn check(&self, path: &str) -> Option<ChannelKind> {
        let channel = self.select().await;
        channel
            .artifact_exists(path)
            .await
            .then(|| channel.kind())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{FakeRuntime, REPORT};
    use sluice_core::PipelineConfig;
    use sluice_core::domain::stage::Stage;
    use std::sync::Arc;

    fn probe(fake: &Arc<FakeRuntime>) -> CompletionProbe {
        let config = PipelineConfig::default();
        CompletionProbe::new(
            WorkerHandle::new(config.stage_container(Stage::Aggregator), fake.clone()),
            SharedVolumeProbe::new(&config, fake.clone()),
        )
    }

    #[tokio::test(start_paused = true)]
    async fn test_running_container_uses_live_channel() {
        let fake = FakeRuntime::new();
        fake.start();
        fake.put_file(REPORT, b"{}");

        assert_eq!(probe(&fake).check(REPORT).await, Some(ChannelKind::Live));
        assert_eq!(fake.count("helper"), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_exited_container_falls_back_to_volume() {
        let fake = FakeRuntime::new();
        fake.put_file(REPORT, b"{}");

        let probe = probe(&fake);
        assert_eq!(probe.select().await.kind(), ChannelKind::Volume);
        assert_eq!(probe.check(REPORT).await, Some(ChannelKind::Volume));
        assert_eq!(fake.count("exec"), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_missing_artifact_on_either_channel() {
        let fake = FakeRuntime::new();
        let probe = probe(&fake);
        assert_eq!(probe.check(REPORT).await, None);

        fake.start();
        assert_eq!(probe.check(REPORT).await, None);
    }
}
