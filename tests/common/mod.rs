//! Shared test utilities for integration tests.
//!
//! Not all functions are used by every test file, but they're shared across tests.
#![allow(dead_code)]

use std::cell::RefCell;
use std::collections::HashSet;
use std::fs::File;
use std::path::{Path, PathBuf};
use std::time::SystemTime;

use async_trait::async_trait;
use chrono::{DateTime, Local, TimeZone};
use git2::{Oid, Repository, Signature};

use git_backfill::error::{GitError, MessageError};
use git_backfill::git::{CommitEnv, GitBackend, IgnoreStatus, StatusEntry};
use git_backfill::message::CompletionClient;

/// Local noon on the given day of January 2023.
pub fn jan_2023(day: u32) -> DateTime<Local> {
    Local
        .with_ymd_and_hms(2023, 1, day, 12, 0, 0)
        .single()
        .expect("Ambiguous local time")
}

/// Set a file's modification time.
pub fn set_mtime(path: &Path, when: DateTime<Local>) {
    File::options()
        .write(true)
        .open(path)
        .expect("Failed to open file for mtime update")
        .set_modified(SystemTime::from(when))
        .expect("Failed to set mtime");
}

/// Write `content` to `dir/name`, creating parents, and date it `when`.
pub fn write_dated(dir: &Path, name: &str, content: &str, when: DateTime<Local>) -> PathBuf {
    let path = dir.join(name);
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).expect("Failed to create parent directory");
    }
    std::fs::write(&path, content).expect("Failed to write test file");
    set_mtime(&path, when);
    path
}

/// A test git repository builder for integration tests.
pub struct TestRepo {
    pub dir: tempfile::TempDir,
    pub repo: Repository,
}

impl TestRepo {
    /// Create a new empty git repository in a temp directory.
    pub fn new() -> Self {
        let dir = tempfile::tempdir().expect("Failed to create temp directory");
        let repo = Repository::init(dir.path()).expect("Failed to init git repo");
        Self { dir, repo }
    }

    /// Canonical repository root, matching what target resolution reports.
    pub fn root(&self) -> PathBuf {
        self.dir.path().canonicalize().expect("Failed to canonicalize repo root")
    }

    /// Get the test signature for commits.
    fn signature(&self) -> Signature<'_> {
        Signature::now("Test User", "test@example.com").expect("Failed to create signature")
    }

    /// Install a `pre-commit` hook that rejects any commit staging `name`.
    #[cfg(unix)]
    pub fn reject_commits_of(&self, name: &str) {
        use std::os::unix::fs::PermissionsExt;

        let hooks = self.repo.path().join("hooks");
        std::fs::create_dir_all(&hooks).expect("Failed to create hooks directory");
        let hook = hooks.join("pre-commit");
        let script = format!(
            "#!/bin/sh\n\
             if git diff --cached --name-only | grep -qx '{name}'; then\n\
             \x20 echo 'rejected {name}' >&2\n\
             \x20 exit 1\n\
             fi\n\
             exit 0\n"
        );
        std::fs::write(&hook, script).expect("Failed to write hook");
        std::fs::set_permissions(&hook, std::fs::Permissions::from_mode(0o755))
            .expect("Failed to make hook executable");
    }

    /// Add a pattern to `.git/info/exclude`.
    pub fn exclude(&self, pattern: &str) {
        let info = self.repo.path().join("info");
        std::fs::create_dir_all(&info).expect("Failed to create .git/info");
        let exclude = info.join("exclude");
        let mut content = std::fs::read_to_string(&exclude).unwrap_or_default();
        content.push_str(pattern);
        content.push('\n');
        std::fs::write(exclude, content).expect("Failed to write exclude file");
    }

    /// Commit the given repo-relative files as they are on disk. Returns the commit OID.
    pub fn commit_files(&self, names: &[&str], message: &str) -> Oid {
        let sig = self.signature();

        let mut index = self.repo.index().expect("Failed to get index");
        for name in names {
            index.add_path(Path::new(name)).expect("Failed to add file");
        }
        index.write().expect("Failed to write index");
        let tree_id = index.write_tree().expect("Failed to write tree");
        let tree = self.repo.find_tree(tree_id).expect("Failed to find tree");

        let parent = self.repo.head().ok().and_then(|h| h.peel_to_commit().ok());
        let parents: Vec<&git2::Commit> = parent.iter().collect();

        self.repo
            .commit(Some("HEAD"), &sig, &sig, message, &tree, &parents)
            .expect("Failed to create commit")
    }

    /// Commits reachable from HEAD, oldest first, as (author seconds, message, files).
    pub fn history(&self) -> Vec<(i64, String, Vec<String>)> {
        let mut walk = self.repo.revwalk().expect("Failed to create revwalk");
        walk.push_head().expect("Failed to push HEAD");
        walk.set_sorting(git2::Sort::TOPOLOGICAL | git2::Sort::REVERSE)
            .expect("Failed to sort revwalk");

        walk.map(|oid| {
            let commit = self
                .repo
                .find_commit(oid.expect("Bad oid"))
                .expect("Failed to find commit");
            let tree = commit.tree().expect("Failed to get tree");
            let parent_tree = commit.parent(0).ok().and_then(|p| p.tree().ok());
            let diff = self
                .repo
                .diff_tree_to_tree(parent_tree.as_ref(), Some(&tree), None)
                .expect("Failed to diff");
            let files = diff
                .deltas()
                .filter_map(|d| d.new_file().path().map(|p| p.to_string_lossy().to_string()))
                .collect();
            (
                commit.author().when().seconds(),
                commit.message().unwrap_or("").to_string(),
                files,
            )
        })
        .collect()
    }
}

/// One commit recorded by [`FakeGit`].
#[derive(Debug, Clone)]
pub struct RecordedCommit {
    pub message: String,
    pub env: CommitEnv,
    pub paths: Vec<PathBuf>,
}

/// In-memory [`GitBackend`] that records what would have been committed.
///
/// Every file is tracked and unchanged unless listed in `new_files`, so
/// timestamps come from modification times.
#[derive(Default)]
pub struct FakeGit {
    pub ignored: HashSet<String>,
    pub new_files: HashSet<String>,
    /// File names whose commits are rejected.
    pub reject: HashSet<String>,
    staged: RefCell<Vec<PathBuf>>,
    pub commits: RefCell<Vec<RecordedCommit>>,
    pub commit_attempts: RefCell<usize>,
}

impl FakeGit {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn ignoring(mut self, name: &str) -> Self {
        self.ignored.insert(name.to_string());
        self
    }

    pub fn rejecting(mut self, name: &str) -> Self {
        self.reject.insert(name.to_string());
        self
    }

    /// Paths currently in the fake index.
    pub fn staged_paths(&self) -> Vec<PathBuf> {
        self.staged.borrow().clone()
    }

    /// Committed file names, in commit order, one list per commit.
    pub fn committed_names(&self) -> Vec<Vec<String>> {
        self.commits
            .borrow()
            .iter()
            .map(|c| c.paths.iter().map(|p| file_name(p)).collect())
            .collect()
    }
}

fn file_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_default()
}

impl GitBackend for FakeGit {
    fn stage(&self, path: &Path) -> Result<(), GitError> {
        let mut staged = self.staged.borrow_mut();
        if !staged.iter().any(|p| p == path) {
            staged.push(path.to_path_buf());
        }
        Ok(())
    }

    fn unstage(&self, paths: &[PathBuf]) -> Result<(), GitError> {
        self.staged.borrow_mut().retain(|p| !paths.contains(p));
        Ok(())
    }

    /// Like git, a rejected commit leaves the index as it was.
    fn commit(&self, message: &str, env: &CommitEnv) -> Result<String, GitError> {
        *self.commit_attempts.borrow_mut() += 1;
        if self
            .staged
            .borrow()
            .iter()
            .any(|p| self.reject.contains(&file_name(p)))
        {
            return Err(GitError::CommandFailed {
                operation: "commit",
                code: Some(1),
                stderr: "pre-commit hook rejected the change".to_string(),
            });
        }
        let paths: Vec<PathBuf> = self.staged.borrow_mut().drain(..).collect();

        let mut commits = self.commits.borrow_mut();
        commits.push(RecordedCommit {
            message: message.to_string(),
            env: env.clone(),
            paths,
        });
        Ok(format!("{:07x}", commits.len()))
    }

    fn diff_cached(&self, paths: &[PathBuf]) -> Result<String, GitError> {
        Ok(paths
            .iter()
            .map(|p| format!("+++ b/{}\n+changed\n", file_name(p)))
            .collect())
    }

    fn status_porcelain(&self, paths: &[PathBuf]) -> Result<Vec<StatusEntry>, GitError> {
        Ok(paths
            .iter()
            .filter(|p| self.new_files.contains(&file_name(p)))
            .map(|p| StatusEntry {
                code: "??".to_string(),
                path: file_name(p),
            })
            .collect())
    }

    fn check_ignore(&self, path: &Path) -> Result<IgnoreStatus, GitError> {
        if self.ignored.contains(&file_name(path)) {
            Ok(IgnoreStatus::Ignored)
        } else {
            Ok(IgnoreStatus::NotIgnored)
        }
    }
}

/// Completion client with a canned answer, counting calls.
pub struct FakeCompletion {
    pub reply: Result<String, ()>,
    pub calls: std::sync::atomic::AtomicUsize,
}

impl FakeCompletion {
    pub fn answering(reply: &str) -> Self {
        Self {
            reply: Ok(reply.to_string()),
            calls: Default::default(),
        }
    }

    pub fn failing() -> Self {
        Self {
            reply: Err(()),
            calls: Default::default(),
        }
    }

    pub fn call_count(&self) -> usize {
        self.calls.load(std::sync::atomic::Ordering::SeqCst)
    }
}

#[async_trait]
impl CompletionClient for FakeCompletion {
    async fn complete(&self, _system: &str, _prompt: &str) -> Result<String, MessageError> {
        self.calls.fetch_add(1, std::sync::atomic::Ordering::SeqCst);
        match &self.reply {
            Ok(reply) => Ok(reply.clone()),
            Err(()) => Err(MessageError::HttpStatus {
                status: 503,
                body: "unavailable".to_string(),
            }),
        }
    }
}
