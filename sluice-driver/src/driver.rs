//! Pipeline driver
//!
//! Runs the pipeline once, end to end:
//! - Provisioning: clean-slate teardown, image build, container start
//! - Input injection: URL list copied into the fetcher's input path
//! - Completion polling: report existence through the live or volume channel
//! - Extraction: report and status documents copied to the output directory
//! - Teardown: exactly once, on every exit path, with logs on timeout

use serde::Serialize;
use sluice_core::PipelineConfig;
use sluice_core::domain::run::{PipelineRun, RunState};
use sluice_core::domain::stage::Stage;
use sluice_core::input::{render_url_list, validate_urls};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tokio::time::{Instant, sleep};
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use crate::channel::{ArtifactChannel, ChannelKind, CompletionProbe};
use crate::error::{PipelineError, Result, RuntimeError};
use crate::runtime::ContainerRuntime;
use crate::scratch::ScratchDir;
use crate::volume::SharedVolumeProbe;
use crate::worker::WorkerHandle;

/// Name of the URL list inside the scratch directory
const INPUT_FILE_NAME: &str = "urls.txt";

/// Outcome of the completion wait
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Completion {
    /// The report was seen through the given channel
    Completed(ChannelKind),
    TimedOut,
}

/// Where extraction left the artifacts
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExtractedArtifact {
    pub report_path: PathBuf,
    /// Present when the status directory was copied too
    pub status_dir: Option<PathBuf>,
    pub via: ChannelKind,
}

/// Summary of a successful run
#[derive(Debug, Clone, Serialize)]
pub struct RunReport {
    pub run_id: Uuid,
    pub state: RunState,
    pub report_path: PathBuf,
    pub status_dir: Option<PathBuf>,
    /// Time from the start of polling until the report was seen
    pub waited: Duration,
    pub completed_via: ChannelKind,
    pub extracted_via: ChannelKind,
}

/// Drives one pipeline run at a time against the configured environment
pub struct PipelineDriver {
    config: PipelineConfig,
    runtime: Arc<dyn ContainerRuntime>,
    fetcher: WorkerHandle,
    aggregator: WorkerHandle,
    volume: SharedVolumeProbe,
    completion: CompletionProbe,
}

impl PipelineDriver {
    pub fn new(config: PipelineConfig, runtime: Arc<dyn ContainerRuntime>) -> Self {
        let fetcher = WorkerHandle::new(config.stage_container(Stage::Fetcher), runtime.clone());
        let aggregator =
            WorkerHandle::new(config.stage_container(Stage::terminal()), runtime.clone());
        let volume = SharedVolumeProbe::new(&config, runtime.clone());
        let completion = CompletionProbe::new(aggregator.clone(), volume.clone());

        Self {
            config,
            runtime,
            fetcher,
            aggregator,
            volume,
            completion,
        }
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    /// The terminal stage's artifact, the report the pipeline ends with
    fn report_artifact(&self) -> &str {
        self.aggregator
            .container()
            .artifact_path
            .as_deref()
            .unwrap_or(&self.config.layout.report_file)
    }

    /// Runs the whole pipeline for the given URLs
    ///
    /// Invalid input is rejected before any container is touched. From then
    /// on teardown runs exactly once and the scratch directory is removed,
    /// whichever step fails.
    pub async fn run(&self, urls: Vec<String>) -> Result<RunReport> {
        validate_urls(&urls).map_err(|e| PipelineError::InvalidInput(e.to_string()))?;

        let mut run = PipelineRun::new(urls, &self.config.scratch_base, self.config.timeout);
        let scratch = ScratchDir::create(&run.scratch_dir)?;
        let mut guard = TeardownGuard::arm(self.runtime.clone());
        info!("Starting run {} with {} URL(s)", run.id, run.urls.len());

        let outcome = self.execute(&mut run, &scratch).await;

        let timed_out = outcome.as_ref().is_err_and(|e| e.is_timeout());
        let logs = self.teardown(timed_out).await;
        guard.disarm();
        drop(scratch);

        match outcome {
            Ok(mut report) => {
                run.finish(RunState::Completed);
                report.state = run.state;
                info!(
                    "Run {} {} in {:?}; report at {}",
                    run.id,
                    run.state,
                    report.waited,
                    report.report_path.display()
                );
                Ok(report)
            }
            Err(mut err) => {
                run.finish(err.run_state());
                if let PipelineError::Timeout { logs: captured, .. } = &mut err {
                    *captured = logs.unwrap_or_default();
                }
                error!("Run {} {}: {}", run.id, run.state, err);
                Err(err)
            }
        }
    }

    /// The fallible body of a run; teardown is the caller's job
    async fn execute(&self, run: &mut PipelineRun, scratch: &ScratchDir) -> Result<RunReport> {
        self.provision().await?;
        self.inject_input(&run.urls, scratch).await?;

        run.begin_wait();
        let started = Instant::now();
        if let Some(at) = run.deadline() {
            info!("Run {} must complete by {}", run.id, at.to_rfc3339());
        }
        let completed_via = match self.await_completion(started + run.timeout).await {
            Completion::Completed(via) => via,
            Completion::TimedOut => {
                return Err(PipelineError::Timeout {
                    budget: run.timeout,
                    logs: String::new(),
                });
            }
        };
        let waited = started.elapsed();

        let extracted = self.extract_results(&self.config.output_dir).await?;

        Ok(RunReport {
            run_id: run.id,
            state: run.state,
            report_path: extracted.report_path,
            status_dir: extracted.status_dir,
            waited,
            completed_via,
            extracted_via: extracted.via,
        })
    }

    /// Brings up a fresh environment
    ///
    /// Any previous environment is torn down first; not having one is fine.
    pub async fn provision(&self) -> Result<()> {
        info!("Removing any previous environment");
        match self.runtime.compose_down().await {
            Ok(output) if output.success() => {}
            Ok(output) => debug!(
                "Nothing to remove (exit code {}): {}",
                output.exit_code,
                output.stderr.trim()
            ),
            Err(e) => warn!("Could not remove previous environment: {}", e),
        }

        info!("Building stage images");
        self.runtime
            .compose_build()
            .await
            .and_then(|output| output.into_result("compose build"))
            .map_err(|source| PipelineError::Provision {
                step: "build",
                source,
            })?;

        info!("Starting stage containers");
        self.runtime
            .compose_up()
            .await
            .and_then(|output| output.into_result("compose up"))
            .map_err(|source| PipelineError::Provision {
                step: "start",
                source,
            })?;

        Ok(())
    }

    /// Writes the URL list and copies it into the fetcher's input path
    pub async fn inject_input(&self, urls: &[String], scratch: &ScratchDir) -> Result<()> {
        let layout = &self.config.layout;
        let local = scratch.write(INPUT_FILE_NAME, &render_url_list(urls))?;

        // Best effort: the copy below is what decides success
        let mkdir = ["mkdir", "-p", layout.input_dir()].map(String::from);
        match self.fetcher.exec(&mkdir).await {
            Ok(output) if output.success() => {}
            Ok(output) => warn!(
                "Could not create {} in {} (exit code {}); continuing",
                layout.input_dir(),
                self.fetcher.name(),
                output.exit_code
            ),
            Err(e) => warn!(
                "Could not create {} in {}: {}; continuing",
                layout.input_dir(),
                self.fetcher.name(),
                e
            ),
        }

        self.fetcher
            .copy_in(&local, &layout.input_file)
            .await
            .map_err(|source| PipelineError::Injection {
                container: self.fetcher.name().to_string(),
                source,
            })?;

        info!(
            "Injected {} URL(s) into {}:{}",
            urls.len(),
            self.fetcher.name(),
            layout.input_file
        );
        Ok(())
    }

    /// Polls for the report until it shows up or `deadline` passes
    ///
    /// Each tick asks the aggregator if it is running; a running container
    /// is probed with exec, an exited one through the shared volume. The
    /// last check happens at the deadline itself.
    pub async fn await_completion(&self, deadline: Instant) -> Completion {
        let report = self.report_artifact();
        let started = Instant::now();
        info!(
            "Waiting for {} (budget {:?}, polling every {:?})",
            report,
            deadline.saturating_duration_since(started),
            self.config.poll_interval
        );

        loop {
            if let Some(via) = self.completion.check(report).await {
                info!("Report found via {} after {:?}", via, started.elapsed());
                return Completion::Completed(via);
            }

            let now = Instant::now();
            if now >= deadline {
                warn!("No report after {:?}", started.elapsed());
                return Completion::TimedOut;
            }

            debug!("Report not ready after {:?}", started.elapsed());
            sleep((deadline - now).min(self.config.poll_interval)).await;
        }
    }

    /// Copies the report and status directory into `output_dir`
    ///
    /// The aggregator container is tried first, then the shared volume
    /// whenever the live copy fails or leaves no report behind. Success means
    /// the report file is actually present afterwards.
    pub async fn extract_results(&self, output_dir: &Path) -> Result<ExtractedArtifact> {
        let layout = &self.config.layout;
        let report_path = output_dir.join(layout.report_file_name());
        let status_path = output_dir.join(layout.status_dir_name());

        std::fs::create_dir_all(output_dir)?;
        remove_stale(&report_path, &status_path)?;

        let mut via = ChannelKind::Live;
        let live = self.copy_artifacts(&self.aggregator, output_dir).await;
        if live.is_err() || !report_path.is_file() {
            match live {
                Err(e) => warn!(
                    "Copy from {} failed ({}); falling back to the shared volume",
                    self.aggregator.name(),
                    e
                ),
                Ok(()) => warn!(
                    "Copy from {} left no {}; falling back to the shared volume",
                    self.aggregator.name(),
                    report_path.display()
                ),
            }
            via = ChannelKind::Volume;
            if let Err(e) = self.copy_artifacts(&self.volume, output_dir).await {
                warn!("Copy from the shared volume failed: {}", e);
            }
        }

        if !report_path.is_file() {
            error!("No output generated: {} is missing", report_path.display());
            return Err(PipelineError::Extraction {
                expected: report_path,
            });
        }

        info!("Saved report to {} via {}", report_path.display(), via);
        Ok(ExtractedArtifact {
            report_path,
            status_dir: status_path.is_dir().then_some(status_path),
            via,
        })
    }

    async fn copy_artifacts(
        &self,
        channel: &dyn ArtifactChannel,
        output_dir: &Path,
    ) -> std::result::Result<(), RuntimeError> {
        channel.fetch(self.report_artifact(), output_dir).await?;

        if let Err(e) = channel.fetch(&self.config.layout.status_dir, output_dir).await {
            warn!("Status directory not copied via {}: {}", channel.kind(), e);
        }
        Ok(())
    }

    /// Stops and removes the environment, capturing logs first if asked
    ///
    /// Never fails; problems are logged. Returns the captured logs.
    pub async fn teardown(&self, capture_logs: bool) -> Option<String> {
        let logs = if capture_logs {
            self.capture_logs().await
        } else {
            None
        };

        info!("Tearing down environment");
        match self.runtime.compose_down().await {
            Ok(output) if output.success() => info!("Environment removed"),
            Ok(output) => warn!(
                "Teardown exited with code {}: {}",
                output.exit_code,
                output.stderr.trim()
            ),
            Err(e) => warn!("Teardown could not run: {}", e),
        }

        logs
    }

    async fn capture_logs(&self) -> Option<String> {
        match self.runtime.compose_logs().await {
            Ok(output) => {
                let mut logs = output.stdout;
                if !output.stderr.trim().is_empty() {
                    logs.push_str(&output.stderr);
                }
                Some(logs)
            }
            Err(e) => {
                warn!("Failed to capture container logs: {}", e);
                None
            }
        }
    }
}

/// Removes the environment if a run is dropped or unwinds before its own teardown
struct TeardownGuard {
    runtime: Option<Arc<dyn ContainerRuntime>>,
}

impl TeardownGuard {
    fn arm(runtime: Arc<dyn ContainerRuntime>) -> Self {
        Self {
            runtime: Some(runtime),
        }
    }

    fn disarm(&mut self) {
        self.runtime = None;
    }
}

impl Drop for TeardownGuard {
    fn drop(&mut self) {
        let Some(runtime) = self.runtime.take() else {
            return;
        };

        warn!("Run abandoned before teardown; removing environment");
        match tokio::runtime::Handle::try_current() {
            Ok(handle) => {
                handle.spawn(async move {
                    if let Err(e) = runtime.compose_down().await {
                        warn!("Teardown of abandoned run could not run: {}", e);
                    }
                });
            }
            Err(_) => warn!("No async runtime left; environment not removed"),
        }
    }
}

/// Clears artifacts of an earlier run so they cannot pass for this one
fn remove_stale(report_path: &Path, status_path: &Path) -> std::io::Result<()> {
    if report_path.is_file() {
        std::fs::remove_file(report_path)?;
    }
    if status_path.is_dir() {
        std::fs::remove_dir_all(status_path)?;
    }
    Ok(())
}
