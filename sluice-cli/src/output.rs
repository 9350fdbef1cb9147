//! Console rendering of run results

use anyhow::{Context, Result};
use colored::*;
use sluice_core::domain::artifact::{ReportSummary, StageStatus};
use sluice_driver::RunReport;
use std::path::Path;
use tracing::warn;

/// Print the outcome of a successful run followed by a report preview
pub fn print_run_report(report: &RunReport, preview_lines: usize) -> Result<()> {
    let contents = std::fs::read_to_string(&report.report_path)
        .with_context(|| format!("Failed to read {}", report.report_path.display()))?;

    println!("{}", "Pipeline completed".green().bold());
    println!("  Run:       {}", report.run_id.to_string().cyan());
    println!("  Waited:    {}s", report.waited.as_secs());
    println!("  Detected:  via {}", report.completed_via);
    println!("  Copied:    via {}", report.extracted_via);
    println!("  Report:    {}", report.report_path.display());

    if let Ok(summary) = ReportSummary::from_json(&contents) {
        print_report_summary(&summary);
    }

    if let Some(dir) = &report.status_dir {
        let statuses = load_stage_statuses(dir);
        if !statuses.is_empty() {
            println!("\n{}", "Stages:".bold());
            for (name, status) in &statuses {
                print_stage_status(name, status);
            }
        }
    }

    let (lines, remaining) = preview(&contents, preview_lines);
    println!("\n{}", format!("First {} line(s) of the report:", lines.len()).bold());
    for line in lines {
        println!("{}", line);
    }
    if remaining > 0 {
        println!("{}", format!("... {} more line(s)", remaining).dimmed());
    }

    Ok(())
}

/// Print logs captured from the stage containers
pub fn print_container_logs(logs: &str) {
    eprintln!("{}", "Container logs:".yellow().bold());
    for line in logs.lines() {
        eprintln!("  {}", line.dimmed());
    }
}

fn print_report_summary(summary: &ReportSummary) {
    if let Some(docs) = summary.documents_processed {
        println!("  Documents: {}", docs);
    }
    if let Some(total) = summary.total_words {
        println!("  Words:     {}", total);
    }
    if let Some(unique) = summary.unique_words {
        println!("  Unique:    {}", unique);
    }
}

fn print_stage_status(name: &str, status: &StageStatus) {
    let marker = if status.is_failed() || status.failed > 0 {
        "✗".red()
    } else {
        "✓".green()
    };
    println!(
        "  {} {:<20} processed {}, ok {}, failed {}",
        marker,
        name.cyan(),
        status.processed(),
        status.successful,
        status.failed
    );
    if let Some(error) = &status.error {
        println!("      {}", error.red());
    }
}

/// First `n` lines of `contents` and how many were left out
pub fn preview(contents: &str, n: usize) -> (Vec<&str>, usize) {
    let lines: Vec<&str> = contents.lines().take(n).collect();
    let remaining = contents.lines().count() - lines.len();
    (lines, remaining)
}

/// Reads every `*.json` status document in `dir`, sorted by file name
///
/// Documents that cannot be read or parsed are skipped with a warning.
pub fn load_stage_statuses(dir: &Path) -> Vec<(String, StageStatus)> {
    let entries = match std::fs::read_dir(dir) {
        Ok(entries) => entries,
        Err(e) => {
            warn!("Failed to read status directory {}: {}", dir.display(), e);
            return Vec::new();
        }
    };

    let mut statuses: Vec<(String, StageStatus)> = entries
        .filter_map(|entry| entry.ok())
        .map(|entry| entry.path())
        .filter(|path| path.extension().is_some_and(|ext| ext == "json"))
        .filter_map(|path| {
            let name = path.file_stem()?.to_string_lossy().to_string();
            let raw = match std::fs::read_to_string(&path) {
                Ok(raw) => raw,
                Err(e) => {
                    warn!("Failed to read {}: {}", path.display(), e);
                    return None;
                }
            };
            match StageStatus::from_json(&raw) {
                Ok(status) => Some((name, status)),
                Err(e) => {
                    warn!("Skipping malformed status document {}: {}", path.display(), e);
                    None
                }
            }
        })
        .collect();

    statuses.sort_by(|a, b| a.0.cmp(&b.0));
    statuses
}
