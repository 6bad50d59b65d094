//! [`GitBackend`] backed by the system `git` binary.
//!
//! Every operation is a blocking `std::process::Command`, inheriting the
//! user's git config. Author/committer overrides are applied to the commit
//! process only.

use std::ffi::OsStr;
use std::path::{Path, PathBuf};
use std::process::{Command, Output};

use regex_lite::Regex;
use tracing::debug;

use super::status::{IgnoreStatus, StatusEntry, parse_porcelain};
use super::{CommitEnv, GitBackend};
use crate::error::GitError;

/// Check that a `git` executable is reachable.
pub fn check_git_installed() -> Result<(), GitError> {
    which::which("git").map(|_| ()).map_err(|_| GitError::NotInstalled)
}

/// Runs git inside a fixed repository root.
#[derive(Debug, Clone)]
pub struct GitCli {
    root: PathBuf,
}

impl GitCli {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    fn command<I, S>(&self, args: I) -> Command
    where
        I: IntoIterator<Item = S>,
        S: AsRef<OsStr>,
    {
        let mut cmd = Command::new("git");
        cmd.args(args).current_dir(&self.root);
        cmd
    }

    /// Whether the repository has at least one commit.
    fn has_head(&self) -> Result<bool, GitError> {
        let cmd = self.command(["rev-parse", "-q", "--verify", "HEAD"]);
        Ok(self.output(cmd, "rev-parse")?.status.success())
    }

    /// Run a prepared command, returning its output regardless of exit status.
    fn output(&self, mut cmd: Command, operation: &'static str) -> Result<Output, GitError> {
        debug!("git {}: {:?}", operation, cmd);
        cmd.output().map_err(|source| GitError::SpawnFailed { operation, source })
    }

    /// Run a prepared command and require success.
    fn run(&self, cmd: Command, operation: &'static str) -> Result<Output, GitError> {
        let output = self.output(cmd, operation)?;
        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            let stdout = String::from_utf8_lossy(&output.stdout);
            // `git commit` explains "nothing to commit" on stdout
            let detail = if stderr.trim().is_empty() { stdout } else { stderr };
            return Err(GitError::CommandFailed {
                operation,
                code: output.status.code(),
                stderr: detail.trim().to_string(),
            });
        }
        Ok(output)
    }
}

impl GitBackend for GitCli {
    fn stage(&self, path: &Path) -> Result<(), GitError> {
        let mut cmd = self.command(["add", "--"]);
        cmd.arg(path);
        self.run(cmd, "add")?;
        Ok(())
    }

    fn unstage(&self, paths: &[PathBuf]) -> Result<(), GitError> {
        // Before the first commit there is no HEAD to reset to
        let mut cmd = if self.has_head()? {
            self.command(["reset", "-q", "--"])
        } else {
            self.command(["rm", "--cached", "-q", "-r", "--ignore-unmatch", "--"])
        };
        cmd.args(paths);
        self.run(cmd, "unstage")?;
        Ok(())
    }

    fn commit(&self, message: &str, env: &CommitEnv) -> Result<String, GitError> {
        let mut cmd = self.command(["commit", "-m", message]);
        cmd.envs(env.vars());
        let output = self.run(cmd, "commit")?;
        parse_commit_id(&String::from_utf8_lossy(&output.stdout))
    }

    fn diff_cached(&self, paths: &[PathBuf]) -> Result<String, GitError> {
        let mut cmd = self.command(["diff", "--cached", "--no-color", "--"]);
        cmd.args(paths);
        let output = self.run(cmd, "diff")?;
        Ok(String::from_utf8_lossy(&output.stdout).to_string())
    }

    fn status_porcelain(&self, paths: &[PathBuf]) -> Result<Vec<StatusEntry>, GitError> {
        let mut cmd = self.command(["status", "--porcelain=v1", "--untracked-files=all", "--"]);
        cmd.args(paths);
        let output = self.run(cmd, "status")?;
        Ok(parse_porcelain(&String::from_utf8_lossy(&output.stdout)))
    }

    fn check_ignore(&self, path: &Path) -> Result<IgnoreStatus, GitError> {
        let mut cmd = self.command(["check-ignore", "-q", "--"]);
        cmd.arg(path);
        let output = self.output(cmd, "check-ignore")?;
        Ok(IgnoreStatus::from_exit_code(output.status.code()))
    }
}

/// Extract the commit id from `git commit` output.
///
/// The first line looks like `[main 1a2b3c4] message` or, for the first
/// commit, `[main (root-commit) 1a2b3c4] message`.
pub fn parse_commit_id(stdout: &str) -> Result<String, GitError> {
    let re = Regex::new(r"^\[[^\]]*\s([0-9a-f]{4,64})\]").expect("Invalid regex");
    let first_line = stdout.lines().next().unwrap_or("");
    re.captures(first_line)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str().to_string())
        .ok_or_else(|| GitError::UnparseableCommitOutput(first_line.to_string()))
}
