//! Pipeline run domain types

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use uuid::Uuid;

/// One invocation of the pipeline, from provisioning to teardown.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineRun {
    pub id: Uuid,
    /// Input URLs in the order they were supplied
    pub urls: Vec<String>,
    /// Scratch directory owned exclusively by this run
    pub scratch_dir: PathBuf,
    pub started_at: DateTime<Utc>,
    /// When the completion wait began; the deadline counts from here
    pub wait_started_at: Option<DateTime<Utc>>,
    /// Budget for the completion wait
    pub timeout: Duration,
    pub state: RunState,
}

/// Lifecycle state of a run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RunState {
    Running,
    Completed,
    TimedOut,
    Failed,
}

impl PipelineRun {
    /// Creates a new running pipeline run
    ///
    /// # Arguments
    /// * `urls` - The input URLs
    /// * `scratch_base` - Directory under which the run's scratch directory lives
    /// * `timeout` - Completion budget
    pub fn new(urls: Vec<String>, scratch_base: &Path, timeout: Duration) -> Self {
        let id = Uuid::new_v4();
        Self {
            id,
            urls,
            scratch_dir: scratch_base.join(format!("sluice-{}", id)),
            started_at: Utc::now(),
            wait_started_at: None,
            timeout,
            state: RunState::Running,
        }
    }

    /// Marks the start of the completion wait
    pub fn begin_wait(&mut self) {
        self.wait_started_at = Some(Utc::now());
    }

    /// Wall-clock instant after which the run is considered timed out
    ///
    /// None until the completion wait has begun.
    pub fn deadline(&self) -> Option<DateTime<Utc>> {
        let budget = chrono::Duration::from_std(self.timeout).unwrap_or(chrono::Duration::MAX);
        self.wait_started_at.map(|start| {
            start
                .checked_add_signed(budget)
                .unwrap_or(DateTime::<Utc>::MAX_UTC)
        })
    }

    /// Moves the run into a terminal state
    ///
    /// A run that already left `Running` keeps its first terminal state.
    pub fn finish(&mut self, state: RunState) {
        if self.state == RunState::Running {
            self.state = state;
        }
    }
}

impl RunState {
    pub fn as_str(&self) -> &'static str {
        match self {
            RunState::Running => "running",
            RunState::Completed => "completed",
            RunState::TimedOut => "timed_out",
            RunState::Failed => "failed",
        }
    }
}

impl std::fmt::Display for RunState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}
