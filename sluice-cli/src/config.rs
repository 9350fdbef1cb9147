//! Command-line arguments
//!
//! Flags override the `SLUICE_*` environment, which overrides the defaults.

use clap::Parser;
use sluice_core::PipelineConfig;
use std::path::PathBuf;
use std::time::Duration;

#[derive(Parser, Debug)]
#[command(name = "sluice")]
#[command(about = "Run the fetch → summarize → aggregate container pipeline", long_about = None)]
pub struct Cli {
    /// URLs to fetch, one or more
    #[arg(required = true, num_args = 1.., value_name = "URL")]
    pub urls: Vec<String>,

    /// Container engine binary
    #[arg(long)]
    pub engine: Option<String>,

    /// Compose file describing the stages
    #[arg(short = 'f', long)]
    pub compose_file: Option<PathBuf>,

    /// Compose project name
    #[arg(short, long)]
    pub project: Option<String>,

    /// Shared volume name
    #[arg(long)]
    pub volume: Option<String>,

    /// Where the report and status documents are saved
    #[arg(short, long)]
    pub output_dir: Option<PathBuf>,

    /// Completion budget
    #[arg(long, value_name = "SECONDS")]
    pub timeout: Option<u64>,

    /// Delay between completion checks
    #[arg(long, value_name = "SECONDS")]
    pub poll_interval: Option<u64>,

    /// Report lines to preview after a successful run
    #[arg(long, value_name = "LINES")]
    pub preview_lines: Option<usize>,

    /// Print the run summary as JSON instead of the preview
    #[arg(long)]
    pub json: bool,
}

impl Cli {
    /// Builds the pipeline configuration from the environment and flags
    pub fn into_config(self) -> PipelineConfig {
        self.apply(PipelineConfig::from_env())
    }

    fn apply(self, mut config: PipelineConfig) -> PipelineConfig {
        if let Some(engine) = self.engine {
            config.engine = engine;
        }
        if let Some(file) = self.compose_file {
            config.compose_file = file;
        }
        if let Some(project) = self.project {
            config.project_name = project;
        }
        if let Some(volume) = self.volume {
            config.volume = volume;
        }
        if let Some(dir) = self.output_dir {
            config.output_dir = dir;
        }
        if let Some(secs) = self.timeout {
            config.timeout = Duration::from_secs(secs);
        }
        if let Some(secs) = self.poll_interval {
            config.poll_interval = Duration::from_secs(secs);
        }
        if let Some(lines) = self.preview_lines {
            config.preview_lines = lines;
        }
        config
    }
}
