//! # tree2md Library
//!
//! Snapshots a source tree into a single Markdown document:
//!
//! 1. Sync the working copy with a remote branch (skipped outside git)
//! 2. Collect exportable files under a target directory
//! 3. Read each file as UTF-8 text
//! 4. Assemble one `## File: <path>` section per file and write it out
//!
//! Each stage records a [`StepResult`] in a [`ValidationLog`] instead of
//! failing the run.
//!
//! ## Usage
//!
//! ```rust,no_run
//! use tree2md::{Config, GitCli, run_export};
//! use std::path::PathBuf;
//!
//! #[tokio::main(flavor = "current_thread")]
//! async fn main() -> anyhow::Result<()> {
//!     let work_dir = std::env::current_dir()?;
//!     let config = Config {
//!         branch: "main".to_string(),
//!         target_dir: PathBuf::from("src"),
//!         output_path: work_dir.join("output.md"),
//!         work_dir: work_dir.clone(),
//!         verbosity: 0,
//!     };
//!
//!     let report = run_export(&config, &GitCli::new(&work_dir)).await?;
//!     print!("{}", report.render()?);
//!     Ok(())
//! }
//! ```

pub mod cli;
pub mod filewalker;
pub mod git;
pub mod reader;
pub mod report;
pub mod writer;

pub use cli::Config;
pub use filewalker::collect_files;
pub use git::{GitCli, GitRunner, sync_repository};
pub use reader::read_text;
pub use report::{StepCategory, StepResult, ValidationLog};
pub use writer::{FileEntry, MarkdownWriter, assemble_document};

use anyhow::Result;
use log::{info, warn};
use std::path::PathBuf;

/// How a run ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExportOutcome {
    /// Nothing matched under the target directory; no output was written.
    NoFiles { target_dir: PathBuf },
    /// The document was written. `content_errors` files were exported empty
    /// because they could not be read.
    Written {
        output_path: PathBuf,
        files: usize,
        content_errors: usize,
    },
}

#[derive(Debug)]
pub struct ExportReport {
    pub log: ValidationLog,
    pub outcome: ExportOutcome,
}

impl ExportReport {
    /// Console text: status lines followed by the JSON log. When reads failed,
    /// the log up to that point is also dumped right after the warning.
    pub fn render(&self) -> Result<String> {
        let mut text = String::new();

        match &self.outcome {
            ExportOutcome::NoFiles { target_dir } => {
                text.push_str(&format!(
                    "No exportable files found under `{}`. Check the directory you entered.\n",
                    target_dir.display()
                ));
            }
            ExportOutcome::Written {
                output_path,
                files,
                content_errors,
            } => {
                if *content_errors > 0 {
                    text.push_str(&format!(
                        "{content_errors} file(s) could not be read and were exported empty. Check the log for details.\n"
                    ));
                    let so_far = self.log.before(StepCategory::DocumentAssembly);
                    text.push_str(&so_far.to_pretty_json()?);
                    text.push('\n');
                }
                text.push_str(&format!(
                    "Markdown written to `{}` ({files} files).\n",
                    output_path.display()
                ));
            }
        }

        text.push_str(&self.log.to_pretty_json()?);
        text.push('\n');
        Ok(text)
    }
}

/// Runs the whole export described by `config`.
///
/// Stage failures end up in the returned log. Only I/O errors while writing
/// the output file are returned as `Err`.
pub async fn run_export<R: GitRunner>(config: &Config, runner: &R) -> Result<ExportReport> {
    let mut log = ValidationLog::new();

    let sync_step = format!("Git update for branch `{}`", config.branch);
    match sync_repository(runner, &config.work_dir, &config.branch).await {
        Ok(status) => log.push(StepResult::new(
            StepCategory::RepoSync,
            sync_step,
            true,
            status.to_string(),
        )),
        Err(err) => {
            warn!("Git update failed, continuing with local files: {err}");
            log.push(StepResult::new(
                StepCategory::RepoSync,
                sync_step,
                false,
                err.to_string(),
            ));
        }
    }

    let collection = collect_files(&config.target_dir);
    log.push(StepResult::new(
        StepCategory::PathCollection,
        "Collect exportable file paths",
        collection.succeeded(),
        collection.message(),
    ));

    if collection.paths.is_empty() {
        info!("Nothing to export under {}", config.target_dir.display());
        return Ok(ExportReport {
            log,
            outcome: ExportOutcome::NoFiles {
                target_dir: config.target_dir.clone(),
            },
        });
    }

    let mut entries = Vec::with_capacity(collection.paths.len());
    let mut content_errors = 0;

    for path in collection.paths {
        let (content, succeeded, message) = match read_text(&path) {
            Ok(text) => {
                let message = format!("Read {} bytes", text.len());
                (text, true, message)
            }
            Err(err) => {
                warn!("{err}");
                content_errors += 1;
                (String::new(), false, err.to_string())
            }
        };
        log.push(
            StepResult::new(StepCategory::ContentRead, "Read file content", succeeded, message)
                .for_file(&path),
        );
        entries.push(FileEntry::new(path, content));
    }

    let (markdown, message) = assemble_document(&entries);
    log.push(StepResult::new(
        StepCategory::DocumentAssembly,
        "Assemble markdown document",
        !markdown.is_empty(),
        message,
    ));

    writer::write_output(&config.output_path, &markdown).await?;
    info!(
        "Exported {} files to {}",
        entries.len(),
        config.output_path.display()
    );

    Ok(ExportReport {
        log,
        outcome: ExportOutcome::Written {
            output_path: config.output_path.clone(),
            files: entries.len(),
            content_errors,
        },
    })
}
