//! Git operations, reached only through the `git` executable.

pub mod cli;
pub mod status;

use std::path::{Path, PathBuf};

use chrono::{DateTime, Local};

use crate::config::Identity;
use crate::error::GitError;

pub use cli::{GitCli, check_git_installed, parse_commit_id};
pub use status::{FileState, IgnoreStatus, StatusEntry, is_ignored, is_new};

/// Format used for `GIT_AUTHOR_DATE` / `GIT_COMMITTER_DATE`.
pub const GIT_DATE_FORMAT: &str = "%Y-%m-%d %H:%M:%S %z";

/// The subset of git the backfill pipeline needs.
///
/// Implemented by [`GitCli`] by shelling out; tests substitute fakes.
#[cfg_attr(test, mockall::automock)]
pub trait GitBackend {
    /// `git add` a single path.
    fn stage(&self, path: &Path) -> Result<(), GitError>;

    /// Drop `paths` from the index again, leaving the working tree alone.
    fn unstage(&self, paths: &[PathBuf]) -> Result<(), GitError>;

    /// `git commit` whatever is staged, returning the new commit id.
    fn commit(&self, message: &str, env: &CommitEnv) -> Result<String, GitError>;

    /// Staged diff restricted to `paths`.
    fn diff_cached(&self, paths: &[PathBuf]) -> Result<String, GitError>;

    /// Porcelain status restricted to `paths`.
    fn status_porcelain(&self, paths: &[PathBuf]) -> Result<Vec<StatusEntry>, GitError>;

    /// Raw answer of `git check-ignore` for one path.
    fn check_ignore(&self, path: &Path) -> Result<IgnoreStatus, GitError>;
}

/// Environment overrides for one commit invocation.
///
/// Author and committer are the same person at the same (backfilled) date.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommitEnv {
    pub name: String,
    pub email: String,
    pub date: String,
}

impl CommitEnv {
    pub fn new(identity: &Identity, timestamp: DateTime<Local>) -> Self {
        Self {
            name: identity.name.clone(),
            email: identity.email.clone(),
            date: timestamp.format(GIT_DATE_FORMAT).to_string(),
        }
    }

    /// The variables git reads when recording authorship.
    pub fn vars(&self) -> [(&'static str, &str); 6] {
        [
            ("GIT_AUTHOR_NAME", self.name.as_str()),
            ("GIT_AUTHOR_EMAIL", self.email.as_str()),
            ("GIT_AUTHOR_DATE", self.date.as_str()),
            ("GIT_COMMITTER_NAME", self.name.as_str()),
            ("GIT_COMMITTER_EMAIL", self.email.as_str()),
            ("GIT_COMMITTER_DATE", self.date.as_str()),
        ]
    }
}
