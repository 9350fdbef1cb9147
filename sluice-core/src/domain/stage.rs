//! Pipeline stage types

use serde::{Deserialize, Serialize};

/// The three fixed stages, in execution order
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Stage {
    Fetcher,
    Summarizer,
    Aggregator,
}

impl Stage {
    pub const ALL: [Stage; 3] = [Stage::Fetcher, Stage::Summarizer, Stage::Aggregator];

    pub fn as_str(&self) -> &'static str {
        match self {
            Stage::Fetcher => "fetcher",
            Stage::Summarizer => "summarizer",
            Stage::Aggregator => "aggregator",
        }
    }

    /// The stage whose output ends the pipeline
    pub fn terminal() -> Stage {
        Stage::Aggregator
    }
}

impl std::fmt::Display for Stage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A named container running one stage
///
/// The driver never creates or destroys these; it only observes and drives them.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StageContainer {
    pub stage: Stage,
    pub name: String,
    /// Path inside the container the stage is expected to produce, if any
    pub artifact_path: Option<String>,
}

impl StageContainer {
    pub fn new(stage: Stage, name: impl Into<String>) -> Self {
        Self {
            stage,
            name: name.into(),
            artifact_path: None,
        }
    }

    pub fn with_artifact(mut self, path: impl Into<String>) -> Self {
        self.artifact_path = Some(path.into());
        self
    }
}
