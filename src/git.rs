//! Working copy synchronisation.
//!
//! Before the tree is exported, the working directory is brought up to date
//! with the remote state of a branch:
//!
//! 1. `git fetch --all`
//! 2. `git branch -v`, to see whether the branch is already present locally
//! 3. `git checkout <branch>`, only when step 2 did not find it
//! 4. `git pull origin <branch>`
//!
//! Directories without a `.git` marker are left alone. Commands are spawned
//! with an argument vector, never through a shell, so a branch name is always
//! a single argument to git.
//!
//! # Example
//!
//! ```rust,ignore
//! use tree2md::git::{GitCli, sync_repository};
//!
//! let work_dir = std::env::current_dir()?;
//! let runner = GitCli::new(&work_dir);
//! let status = sync_repository(&runner, &work_dir, "main").await?;
//! println!("{status}");
//! ```

use log::{debug, info, warn};
use std::fmt;
use std::future::Future;
use std::io;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tokio::process::Command;

/// A git invocation that did not complete successfully.
#[derive(Debug, Error)]
pub enum CommandError {
    /// git ran and exited with a non-zero status.
    #[error("{context}: `git {args}` failed with {}: {output}", describe_exit(.code))]
    Failed {
        context: String,
        args: String,
        output: String,
        code: Option<i32>,
    },
    /// git could not be started at all.
    #[error("{context}: could not launch git: {source}")]
    Spawn {
        context: String,
        #[source]
        source: io::Error,
    },
}

impl CommandError {
    /// Exit code of the failed command, if it exited normally.
    pub fn exit_code(&self) -> Option<i32> {
        match self {
            CommandError::Failed { code, .. } => *code,
            CommandError::Spawn { .. } => None,
        }
    }
}

fn describe_exit(code: &Option<i32>) -> String {
    match code {
        Some(code) => format!("exit code {code}"),
        None => "no exit code (terminated by signal)".to_string(),
    }
}

/// Runs git subcommands on behalf of [`sync_repository`].
pub trait GitRunner {
    /// Runs `git <args>` to completion and returns its combined
    /// stdout/stderr. `context` describes the attempted action and is carried
    /// into the error on failure.
    fn run(
        &self,
        args: &[&str],
        context: &str,
    ) -> impl Future<Output = Result<String, CommandError>>;
}

/// Spawns the `git` executable inside a working directory.
#[derive(Debug, Clone)]
pub struct GitCli {
    work_dir: PathBuf,
}

impl GitCli {
    pub fn new(work_dir: impl Into<PathBuf>) -> Self {
        Self {
            work_dir: work_dir.into(),
        }
    }
}

impl GitRunner for GitCli {
    async fn run(&self, args: &[&str], context: &str) -> Result<String, CommandError> {
        debug!("Running git {:?} in {}", args, self.work_dir.display());

        let output = Command::new("git")
            .args(args)
            .current_dir(&self.work_dir)
            .output()
            .await
            .map_err(|source| CommandError::Spawn {
                context: context.to_string(),
                source,
            })?;

        let mut text = String::from_utf8_lossy(&output.stdout).into_owned();
        text.push_str(&String::from_utf8_lossy(&output.stderr));

        if output.status.success() {
            Ok(text)
        } else {
            Err(CommandError::Failed {
                context: context.to_string(),
                args: args.join(" "),
                output: text.trim_end().to_string(),
                code: output.status.code(),
            })
        }
    }
}

/// What [`sync_repository`] did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SyncStatus {
    /// The directory is not a git working copy; nothing was run.
    NotAWorkingCopy,
    /// The branch was pulled from origin. `checked_out` is true when a
    /// checkout was needed first.
    Updated { branch: String, checked_out: bool },
}

impl fmt::Display for SyncStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SyncStatus::NotAWorkingCopy => {
                write!(f, "Not a git repository, skipping git update")
            }
            SyncStatus::Updated {
                branch,
                checked_out: true,
            } => write!(f, "Checked out `{branch}` and pulled latest changes from origin"),
            SyncStatus::Updated {
                branch,
                checked_out: false,
            } => write!(f, "Branch `{branch}` already present locally, pulled latest changes from origin"),
        }
    }
}

/// The first sync step that failed.
#[derive(Debug, Error)]
pub enum SyncError {
    #[error("fetching remote updates failed: {0}")]
    Fetch(#[source] CommandError),
    #[error("switching to branch `{branch}` failed: {source}")]
    Checkout {
        branch: String,
        #[source]
        source: CommandError,
    },
    #[error("pulling `{branch}` from origin failed: {source}")]
    Pull {
        branch: String,
        #[source]
        source: CommandError,
    },
}

/// Returns true when `dir` contains a `.git` entry.
pub fn is_working_copy(dir: &Path) -> bool {
    dir.join(".git").exists()
}

/// Checks a `git branch -v` listing for `branch`.
///
/// This is plain substring containment over the whole listing, not a
/// comparison against individual branch names: `main` is reported present
/// when only `main-2` exists, and a commit subject mentioning the name also
/// matches. Kept as-is because callers rely on "present" meaning "skip the
/// checkout".
pub fn branch_listed(listing: &str, branch: &str) -> bool {
    listing.contains(branch)
}

/// Brings `work_dir` up to date with `origin/<branch>`.
///
/// No step is retried; the first failure is returned.
pub async fn sync_repository<R: GitRunner>(
    runner: &R,
    work_dir: &Path,
    branch: &str,
) -> Result<SyncStatus, SyncError> {
    if !is_working_copy(work_dir) {
        info!("{} is not a git working copy", work_dir.display());
        return Ok(SyncStatus::NotAWorkingCopy);
    }

    runner
        .run(&["fetch", "--all"], "Fetching remote updates")
        .await
        .map_err(SyncError::Fetch)?;

    let present = match runner.run(&["branch", "-v"], "Listing local branches").await {
        Ok(listing) => branch_listed(&listing, branch),
        Err(err) => {
            warn!("Could not list local branches, assuming `{branch}` is absent: {err}");
            false
        }
    };

    if !present {
        info!("Branch `{branch}` not found locally, checking it out");
        runner
            .run(&["checkout", branch], "Checking out branch")
            .await
            .map_err(|source| SyncError::Checkout {
                branch: branch.to_string(),
                source,
            })?;
    }

    runner
        .run(&["pull", "origin", branch], "Pulling branch from origin")
        .await
        .map_err(|source| SyncError::Pull {
            branch: branch.to_string(),
            source,
        })?;

    info!("Working copy synced with origin/{branch}");
    Ok(SyncStatus::Updated {
        branch: branch.to_string(),
        checked_out: !present,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;
    use std::collections::HashMap;
    use tempfile::tempdir;

    /// Answers git subcommands from a script and records every call.
    #[derive(Default)]
    struct ScriptedRunner {
        responses: HashMap<&'static str, Result<String, i32>>,
        calls: RefCell<Vec<Vec<String>>>,
    }

    impl ScriptedRunner {
        fn respond(mut self, subcommand: &'static str, response: Result<&str, i32>) -> Self {
            self.responses
                .insert(subcommand, response.map(str::to_string));
            self
        }

        fn calls(&self) -> Vec<Vec<String>> {
            self.calls.borrow().clone()
        }

        fn subcommands(&self) -> Vec<String> {
            self.calls().into_iter().map(|c| c[0].clone()).collect()
        }
    }

    impl GitRunner for ScriptedRunner {
        async fn run(&self, args: &[&str], context: &str) -> Result<String, CommandError> {
            self.calls
                .borrow_mut()
                .push(args.iter().map(|a| a.to_string()).collect());

            match self.responses.get(args[0]) {
                Some(Ok(out)) => Ok(out.clone()),
                Some(Err(code)) => Err(CommandError::Failed {
                    context: context.to_string(),
                    args: args.join(" "),
                    output: format!("fatal: {} broke", args[0]),
                    code: Some(*code),
                }),
                None => Ok(String::new()),
            }
        }
    }

    fn working_copy() -> tempfile::TempDir {
        let dir = tempdir().unwrap();
        std::fs::create_dir(dir.path().join(".git")).unwrap();
        dir
    }

    #[tokio::test]
    async fn test_skips_when_not_a_working_copy() {
        let dir = tempdir().unwrap();
        let runner = ScriptedRunner::default();

        let status = sync_repository(&runner, dir.path(), "anything").await.unwrap();

        assert_eq!(status, SyncStatus::NotAWorkingCopy);
        assert!(runner.calls().is_empty());
        assert!(status.to_string().contains("skipping"));
    }

    #[tokio::test]
    async fn test_existing_branch_skips_checkout() {
        let dir = working_copy();
        let runner = ScriptedRunner::default().respond("branch", Ok("* main 1a2b3c init\n"));

        let status = sync_repository(&runner, dir.path(), "main").await.unwrap();

        assert_eq!(runner.subcommands(), vec!["fetch", "branch", "pull"]);
        assert_eq!(
            status,
            SyncStatus::Updated {
                branch: "main".into(),
                checked_out: false
            }
        );
    }

    #[tokio::test]
    async fn test_prefix_of_listed_branch_counts_as_present() {
        let dir = working_copy();
        let runner = ScriptedRunner::default().respond("branch", Ok("* main-2 1a2b3c wip\n"));

        sync_repository(&runner, dir.path(), "main").await.unwrap();

        assert!(!runner.subcommands().contains(&"checkout".to_string()));
    }

    #[tokio::test]
    async fn test_missing_branch_is_checked_out() {
        let dir = working_copy();
        let runner = ScriptedRunner::default().respond("branch", Ok("* main 1a2b3c init\n"));

        let status = sync_repository(&runner, dir.path(), "feature/x").await.unwrap();

        assert_eq!(
            runner.calls(),
            vec![
                vec!["fetch", "--all"],
                vec!["branch", "-v"],
                vec!["checkout", "feature/x"],
                vec!["pull", "origin", "feature/x"],
            ]
        );
        assert!(matches!(status, SyncStatus::Updated { checked_out: true, .. }));
    }

    #[tokio::test]
    async fn test_failed_listing_falls_back_to_checkout() {
        let dir = working_copy();
        let runner = ScriptedRunner::default().respond("branch", Err(128));

        sync_repository(&runner, dir.path(), "main").await.unwrap();

        assert_eq!(runner.subcommands(), vec!["fetch", "branch", "checkout", "pull"]);
    }

    #[tokio::test]
    async fn test_fetch_failure_stops_sync() {
        let dir = working_copy();
        let runner = ScriptedRunner::default().respond("fetch", Err(1));

        let err = sync_repository(&runner, dir.path(), "main").await.unwrap_err();

        assert!(matches!(err, SyncError::Fetch(_)));
        assert_eq!(runner.subcommands(), vec!["fetch"]);
    }

    #[tokio::test]
    async fn test_checkout_failure_stops_before_pull() {
        let dir = working_copy();
        let runner = ScriptedRunner::default()
            .respond("branch", Ok(""))
            .respond("checkout", Err(1));

        let err = sync_repository(&runner, dir.path(), "nope").await.unwrap_err();

        assert!(matches!(err, SyncError::Checkout { ref branch, .. } if branch == "nope"));
        assert!(!runner.subcommands().contains(&"pull".to_string()));
    }

    #[tokio::test]
    async fn test_pull_failure_reports_exit_code() {
        let dir = working_copy();
        let runner = ScriptedRunner::default()
            .respond("branch", Ok("* main"))
            .respond("pull", Err(2));

        let err = sync_repository(&runner, dir.path(), "main").await.unwrap_err();

        match &err {
            SyncError::Pull { source, .. } => assert_eq!(source.exit_code(), Some(2)),
            other => panic!("unexpected error: {other}"),
        }
        let message = err.to_string();
        assert!(message.contains("exit code 2"));
        assert!(message.contains("Pulling branch from origin"));
        assert!(message.contains("fatal: pull broke"));
    }

    #[tokio::test]
    async fn test_branch_name_is_a_single_argument() {
        let dir = working_copy();
        let runner = ScriptedRunner::default().respond("branch", Ok(""));
        let hostile = "x\"; rm -rf / #";

        sync_repository(&runner, dir.path(), hostile).await.unwrap();

        let calls = runner.calls();
        assert_eq!(calls[2], vec!["checkout".to_string(), hostile.to_string()]);
        assert_eq!(calls[3].len(), 3);
        assert_eq!(calls[3][2], hostile);
    }

    #[test]
    fn test_branch_listed_is_substring_match() {
        let listing = "  develop 123 msg\n* main-2 456 msg\n";
        assert!(branch_listed(listing, "main"));
        assert!(branch_listed(listing, "develop"));
        assert!(branch_listed(listing, "msg"));
        assert!(!branch_listed(listing, "release"));
    }

    #[test]
    fn test_describe_exit() {
        assert_eq!(describe_exit(&Some(128)), "exit code 128");
        assert!(describe_exit(&None).contains("signal"));
    }
}
