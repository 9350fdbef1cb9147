//! Sluice CLI
//!
//! Runs the fetch → summarize → aggregate container pipeline for a list of
//! URLs and prints a preview of the resulting report.

mod config;
mod output;

use anyhow::{Context, Result};
use clap::Parser;
use colored::*;
use sluice_driver::{ComposeRuntime, PipelineDriver};
use std::process::ExitCode;
use std::sync::Arc;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use config::Cli;

#[tokio::main]
async fn main() -> ExitCode {
    // clap exits with 2 on usage errors; a missing URL list is a plain failure
    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(e) => {
            let _ = e.print();
            return if e.use_stderr() {
                ExitCode::FAILURE
            } else {
                ExitCode::SUCCESS
            };
        }
    };

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "sluice=info,sluice_driver=info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("{} {:#}", "Error:".red().bold(), e);
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> Result<()> {
    let json = cli.json;
    let urls = cli.urls.clone();
    let config = cli.into_config();
    config.validate().context("Invalid configuration")?;

    let runtime = Arc::new(ComposeRuntime::new(&config));
    runtime
        .check_available()
        .await
        .with_context(|| format!("Container engine '{}' is not available", config.engine))?;

    info!(
        "Running pipeline for {} URL(s) with project {}",
        urls.len(),
        config.project_name
    );

    let preview_lines = config.preview_lines;
    let driver = PipelineDriver::new(config, runtime);

    match driver.run(urls).await {
        Ok(report) => {
            if json {
                println!("{}", serde_json::to_string_pretty(&report)?);
            } else {
                output::print_run_report(&report, preview_lines)?;
            }
            Ok(())
        }
        Err(err) => {
            if let Some(logs) = err.captured_logs() {
                output::print_container_logs(logs);
            }
            Err(err.into())
        }
    }
}
