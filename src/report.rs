//! Step records collected over one export run.
//!
//! Every stage of the pipeline reports its outcome as a [`StepResult`]; the
//! records are appended to a [`ValidationLog`] which is dumped as JSON at the
//! end of the run (or when the run stops early).

use anyhow::{Context, Result};
use serde::Serialize;
use std::path::Path;

/// The stage a [`StepResult`] belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum StepCategory {
    RepoSync,
    PathCollection,
    ContentRead,
    DocumentAssembly,
}

/// Outcome of a single pipeline step.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StepResult {
    step: String,
    result: String,
    category: StepCategory,
    succeeded: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    file_path: Option<String>,
}

impl StepResult {
    pub fn new(
        category: StepCategory,
        step: impl Into<String>,
        succeeded: bool,
        result: impl Into<String>,
    ) -> Self {
        Self {
            step: step.into(),
            result: result.into(),
            category,
            succeeded,
            file_path: None,
        }
    }

    /// Attaches the file this record is about.
    pub fn for_file(mut self, path: &Path) -> Self {
        self.file_path = Some(path.display().to_string());
        self
    }

    pub fn step(&self) -> &str {
        &self.step
    }

    pub fn result(&self) -> &str {
        &self.result
    }

    pub fn category(&self) -> StepCategory {
        self.category
    }

    pub fn succeeded(&self) -> bool {
        self.succeeded
    }

    pub fn file_path(&self) -> Option<&str> {
        self.file_path.as_deref()
    }
}

/// Append-only, ordered list of step records.
#[derive(Debug, Default, Clone, Serialize)]
#[serde(transparent)]
pub struct ValidationLog {
    steps: Vec<StepResult>,
}

impl ValidationLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, step: StepResult) {
        self.steps.push(step);
    }

    pub fn steps(&self) -> &[StepResult] {
        &self.steps
    }

    /// Records of a given category, in insertion order.
    pub fn by_category(&self, category: StepCategory) -> impl Iterator<Item = &StepResult> {
        self.steps.iter().filter(move |s| s.category == category)
    }

    /// The records pushed before the first one of `category`; the whole log
    /// when there is none.
    pub fn before(&self, category: StepCategory) -> ValidationLog {
        let end = self
            .steps
            .iter()
            .position(|s| s.category == category)
            .unwrap_or(self.steps.len());

        ValidationLog {
            steps: self.steps[..end].to_vec(),
        }
    }

    /// Pretty-printed JSON array of all records.
    pub fn to_pretty_json(&self) -> Result<String> {
        serde_json::to_string_pretty(self).context("Failed to serialize validation log")
    }
}
