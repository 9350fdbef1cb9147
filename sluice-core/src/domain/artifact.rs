//! Artifact layout and the documents stages leave on the shared volume
//!
//! The presence of the report file is the only completion signal. The status
//! documents are informational and may be missing or malformed.

use serde::{Deserialize, Serialize};

/// Where the pipeline's input and output live on the shared volume
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArtifactLayout {
    /// Mount point of the shared volume inside every container
    pub mount: String,
    /// URL list consumed by the fetcher
    pub input_file: String,
    /// Terminal report written by the aggregator
    pub report_file: String,
    /// Directory of per-stage status documents
    pub status_dir: String,
}

impl ArtifactLayout {
    /// Builds the stock layout under a mount point
    pub fn under(mount: &str) -> Self {
        let mount = mount.trim_end_matches('/');
        Self {
            mount: mount.to_string(),
            input_file: format!("{}/input/urls.txt", mount),
            report_file: format!("{}/analysis/final_report.json", mount),
            status_dir: format!("{}/status", mount),
        }
    }

    /// Directory holding the input file
    pub fn input_dir(&self) -> &str {
        parent_of(&self.input_file)
    }

    /// File name of the report, used for the local copy
    pub fn report_file_name(&self) -> &str {
        file_name_of(&self.report_file)
    }

    /// Directory name of the status directory, used for the local copy
    pub fn status_dir_name(&self) -> &str {
        file_name_of(self.status_dir.trim_end_matches('/'))
    }

    /// True if `path` is the mount point or lies beneath it
    pub fn is_on_volume(&self, path: &str) -> bool {
        path == self.mount
            || path
                .strip_prefix(&self.mount)
                .is_some_and(|rest| rest.starts_with('/'))
    }
}

impl Default for ArtifactLayout {
    fn default() -> Self {
        Self::under("/shared")
    }
}

fn parent_of(path: &str) -> &str {
    match path.rfind('/') {
        Some(0) => "/",
        Some(idx) => &path[..idx],
        None => ".",
    }
}

fn file_name_of(path: &str) -> &str {
    path.rsplit('/').next().unwrap_or(path)
}

/// Completion document a stage writes into the status directory
///
/// The fetcher reports `urls_processed`, the summarizer `files_processed`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StageStatus {
    #[serde(default)]
    pub timestamp: Option<String>,
    #[serde(default)]
    pub urls_processed: Option<u64>,
    #[serde(default)]
    pub files_processed: Option<u64>,
    #[serde(default)]
    pub successful: u64,
    #[serde(default)]
    pub failed: u64,
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub error: Option<String>,
}

impl StageStatus {
    pub fn from_json(raw: &str) -> serde_json::Result<Self> {
        serde_json::from_str(raw)
    }

    /// Number of items the stage looked at
    pub fn processed(&self) -> u64 {
        self.urls_processed
            .or(self.files_processed)
            .unwrap_or(self.successful + self.failed)
    }

    /// A stage failed outright when it says so or left an error message
    pub fn is_failed(&self) -> bool {
        self.status.as_deref() == Some("failed") || self.error.is_some()
    }
}

/// Headline numbers of the terminal report
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ReportSummary {
    #[serde(default)]
    pub processing_timestamp: Option<String>,
    #[serde(default)]
    pub documents_processed: Option<u64>,
    #[serde(default)]
    pub total_words: Option<u64>,
    #[serde(default)]
    pub unique_words: Option<u64>,
}

impl ReportSummary {
    pub fn from_json(raw: &str) -> serde_json::Result<Self> {
        serde_json::from_str(raw)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_layout() {
        let layout = ArtifactLayout::default();
        assert_eq!(layout.input_file, "/shared/input/urls.txt");
        assert_eq!(layout.input_dir(), "/shared/input");
        assert_eq!(layout.report_file, "/shared/analysis/final_report.json");
        assert_eq!(layout.report_file_name(), "final_report.json");
        assert_eq!(layout.status_dir_name(), "status");
    }

    #[test]
    fn test_under_trims_trailing_slash() {
        let layout = ArtifactLayout::under("/data/");
        assert_eq!(layout.mount, "/data");
        assert_eq!(layout.status_dir, "/data/status");
    }

    #[test]
    fn test_is_on_volume() {
        let layout = ArtifactLayout::default();
        assert!(layout.is_on_volume("/shared/analysis/final_report.json"));
        assert!(layout.is_on_volume("/shared"));
        assert!(!layout.is_on_volume("/shared-other/x"));
        assert!(!layout.is_on_volume("/tmp/x"));
    }

    #[test]
    fn test_fetcher_status_document() {
        let raw = r#"{
            "timestamp": "2024-01-01T00:00:00+00:00",
            "urls_processed": 3,
            "successful": 2,
            "failed": 1,
            "results": []
        }"#;
        let status = StageStatus::from_json(raw).unwrap();
        assert_eq!(status.processed(), 3);
        assert_eq!(status.successful, 2);
        assert!(!status.is_failed());
    }

    #[test]
    fn test_failed_summarizer_status_document() {
        let raw = r#"{"status": "failed", "error": "Missing raw dir /shared/raw", "files_processed": 0}"#;
        let status = StageStatus::from_json(raw).unwrap();
        assert_eq!(status.processed(), 0);
        assert!(status.is_failed());
    }

    #[test]
    fn test_report_summary_ignores_unknown_fields() {
        let raw = r#"{"documents_processed": 2, "total_words": 40, "top_100_words": []}"#;
        let summary = ReportSummary::from_json(raw).unwrap();
        assert_eq!(summary.documents_processed, Some(2));
        assert_eq!(summary.unique_words, None);
    }
}
