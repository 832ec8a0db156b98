use std::cell::RefCell;
use std::path::{Path, PathBuf};
use std::process::Command;

use time::format_description::well_known::Rfc3339;
use time::OffsetDateTime;

use glsync_core::{Result, SyncError};

/// Version-control side of materialization.
pub trait VersionControl {
    /// Stage everything in the working tree and commit it with author and
    /// committer dates forced to `at`.
    fn commit_all(&self, message: &str, at: OffsetDateTime) -> Result<()>;
}

/// Drives the `git` binary in the target working tree.
pub struct GitCli {
    repo_dir: PathBuf,
    git_bin: PathBuf,
}

impl GitCli {
    pub fn new(repo_dir: impl Into<PathBuf>) -> Self {
        Self {
            repo_dir: repo_dir.into(),
            git_bin: PathBuf::from("git"),
        }
    }

    pub fn with_bin(mut self, git_bin: PathBuf) -> Self {
        self.git_bin = git_bin;
        self
    }

    pub fn repo_dir(&self) -> &Path {
        &self.repo_dir
    }

    fn run(&self, args: &[&str], envs: &[(&str, &str)]) -> Result<()> {
        tracing::debug!(?args, dir = %self.repo_dir.display(), "git");
        let output = Command::new(&self.git_bin)
            .args(args)
            .envs(envs.iter().copied())
            .current_dir(&self.repo_dir)
            .output()
            .map_err(|e| SyncError::Vcs(format!("git not available: {e}")))?;
        if output.status.success() {
            return Ok(());
        }
        let stderr = String::from_utf8_lossy(&output.stderr);
        let stdout = String::from_utf8_lossy(&output.stdout);
        let detail = if stderr.trim().is_empty() {
            stdout.trim().to_string()
        } else {
            stderr.trim().to_string()
        };
        Err(SyncError::Vcs(format!(
            "git {} failed ({}): {detail}",
            args.first().copied().unwrap_or_default(),
            output.status
        )))
    }
}

impl VersionControl for GitCli {
    fn commit_all(&self, message: &str, at: OffsetDateTime) -> Result<()> {
        let date = at
            .format(&Rfc3339)
            .map_err(|e| SyncError::Vcs(format!("cannot format commit date {at}: {e}")))?;
        self.run(&["add", "."], &[])?;
        self.run(
            &["commit", "--quiet", "-m", message],
            &[
                ("GIT_AUTHOR_DATE", date.as_str()),
                ("GIT_COMMITTER_DATE", date.as_str()),
            ],
        )
    }
}

/// Records commits in memory instead of running git (for testing).
#[derive(Default)]
pub struct RecordingVcs {
    commits: RefCell<Vec<(String, OffsetDateTime)>>,
    fail_after: Option<usize>,
}

impl RecordingVcs {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fail every commit once `n` commits have been recorded.
    pub fn failing_after(n: usize) -> Self {
        Self {
            commits: RefCell::new(Vec::new()),
            fail_after: Some(n),
        }
    }

    pub fn commits(&self) -> Vec<(String, OffsetDateTime)> {
        self.commits.borrow().clone()
    }
}

impl VersionControl for RecordingVcs {
    fn commit_all(&self, message: &str, at: OffsetDateTime) -> Result<()> {
        let mut commits = self.commits.borrow_mut();
        if self.fail_after.is_some_and(|n| commits.len() >= n) {
            return Err(SyncError::Vcs("simulated commit failure".into()));
        }
        commits.push((message.to_string(), at));
        Ok(())
    }
}
