//! Run orchestration: resolve the target, discover files, order them, commit.

use std::collections::BTreeMap;
use std::fmt;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Local, NaiveDate, TimeZone};
use tracing::{debug, warn};
use walkdir::WalkDir;

use crate::config::Identity;
use crate::driver::{CommitDriver, CommitOutcome, CommitRequest};
use crate::error::BackfillError;
use crate::git::{GitBackend, is_ignored};
use crate::message::{CompletionClient, MessageGenerator, MessageMode};
use crate::timestamp::{read_file_times, resolve_timestamp};

/// Name of the version-control metadata entry.
const GIT_DIR: &str = ".git";

/// What the user pointed us at.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Target {
    File(PathBuf),
    Directory(PathBuf),
}

/// A validated target and the repository that contains it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedTarget {
    pub target: Target,
    pub repo_root: PathBuf,
}

/// Check the run preconditions and locate the repository root.
///
/// The path must be an existing file or directory, and it (or, for a file,
/// its parent) must sit at or below a directory containing `.git`.
pub fn resolve_target(path: &Path) -> Result<ResolvedTarget, BackfillError> {
    let absolute = path
        .canonicalize()
        .map_err(|_| BackfillError::TargetNotFound(path.to_path_buf()))?;

    let (target, start) = if absolute.is_file() {
        let parent = absolute
            .parent()
            .map(Path::to_path_buf)
            .unwrap_or_else(|| absolute.clone());
        (Target::File(absolute), parent)
    } else if absolute.is_dir() {
        (Target::Directory(absolute.clone()), absolute)
    } else {
        return Err(BackfillError::TargetNotFound(path.to_path_buf()));
    };

    let repo_root = find_repo_root(&start).ok_or(BackfillError::NotARepository(start))?;
    Ok(ResolvedTarget { target, repo_root })
}

/// Nearest ancestor (inclusive) holding a `.git` directory or worktree file.
pub fn find_repo_root(start: &Path) -> Option<PathBuf> {
    start
        .ancestors()
        .find(|dir| dir.join(GIT_DIR).exists())
        .map(Path::to_path_buf)
}

/// A discovered file after classification.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileEntry {
    pub path: PathBuf,
    pub timestamp: DateTime<Local>,
    pub ignored: bool,
}

/// Every regular file under `root`, skipping `.git` metadata entirely.
pub fn discover_files(root: &Path) -> Vec<PathBuf> {
    WalkDir::new(root)
        .sort_by_file_name()
        .into_iter()
        .filter_entry(|e| e.file_name() != GIT_DIR)
        .filter_map(|entry| match entry {
            Ok(e) => Some(e),
            Err(err) => {
                warn!("Skipping unreadable entry: {}", err);
                None
            }
        })
        .filter(|e| e.file_type().is_file())
        .map(|e| e.into_path())
        .collect()
}

/// Classify one file. Ignored files get no status query.
pub fn classify_file<G: GitBackend + ?Sized>(git: &G, path: &Path) -> FileEntry {
    if is_ignored(git, path) {
        return FileEntry {
            path: path.to_path_buf(),
            timestamp: read_file_times(path).modified,
            ignored: true,
        };
    }

    FileEntry {
        path: path.to_path_buf(),
        timestamp: resolve_timestamp(git, path),
        ignored: false,
    }
}

/// Drop ignored entries and sort the rest oldest first.
///
/// The sort is stable, so files sharing a timestamp keep discovery order.
pub fn order_entries(entries: Vec<FileEntry>) -> Vec<FileEntry> {
    let mut kept: Vec<FileEntry> = entries.into_iter().filter(|e| !e.ignored).collect();
    kept.sort_by_key(|e| e.timestamp);
    kept
}

/// One commit's worth of files in `--group-by-day` mode.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DayGroup {
    pub day: NaiveDate,
    pub timestamp: DateTime<Local>,
    pub paths: Vec<PathBuf>,
}

/// Bucket ordered entries by local calendar day, oldest day first.
///
/// Each group is dated at local midnight of its day.
pub fn group_by_day(entries: &[FileEntry]) -> Vec<DayGroup> {
    let mut days: BTreeMap<NaiveDate, Vec<&FileEntry>> = BTreeMap::new();
    for entry in entries {
        days.entry(entry.timestamp.date_naive()).or_default().push(entry);
    }

    days.into_iter()
        .map(|(day, members)| {
            let timestamp = day
                .and_hms_opt(0, 0, 0)
                .and_then(|midnight| Local.from_local_datetime(&midnight).earliest())
                .unwrap_or(members[0].timestamp);
            DayGroup {
                day,
                timestamp,
                paths: members.iter().map(|e| e.path.clone()).collect(),
            }
        })
        .collect()
}

/// Tally of a run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RunSummary {
    pub committed: usize,
    pub failed: usize,
    /// Files skipped by ignore rules; not part of the success/failure tally.
    pub ignored: usize,
}

impl fmt::Display for RunSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} committed, {} failed", self.committed, self.failed)?;
        if self.ignored > 0 {
            write!(f, ", {} ignored", self.ignored)?;
        }
        Ok(())
    }
}

/// Options fixed for the whole run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunOptions {
    pub author: Identity,
    pub use_ai: bool,
    pub group_by_day: bool,
}

impl RunOptions {
    fn mode(&self) -> MessageMode {
        if self.use_ai {
            MessageMode::Ai
        } else {
            MessageMode::Template
        }
    }
}

/// Drives the commit driver over a target, one commit at a time.
pub struct Backfill<'a, G: ?Sized, C> {
    git: &'a G,
    driver: CommitDriver<'a, G, C>,
    options: RunOptions,
}

impl<'a, G, C> Backfill<'a, G, C>
where
    G: GitBackend + ?Sized,
    C: CompletionClient,
{
    pub fn new(git: &'a G, messages: &'a MessageGenerator<C>, options: RunOptions) -> Self {
        Self {
            git,
            driver: CommitDriver::new(git, messages),
            options,
        }
    }

    pub async fn run(&self, target: &Target) -> RunSummary {
        match target {
            Target::File(path) => self.run_file(path).await,
            Target::Directory(dir) => self.run_directory(dir).await,
        }
    }

    /// Backfill a single file.
    pub async fn run_file(&self, path: &Path) -> RunSummary {
        let mut summary = RunSummary::default();
        let entry = classify_file(self.git, path);
        if entry.ignored {
            println!("Skipped (ignored): {}", path.display());
            summary.ignored += 1;
            return summary;
        }

        self.attempt(vec![entry.path], entry.timestamp, &mut summary).await;
        summary
    }

    /// Backfill every file under `dir`, oldest first, never stopping early.
    pub async fn run_directory(&self, dir: &Path) -> RunSummary {
        let mut summary = RunSummary::default();

        let files = discover_files(dir);
        debug!("Discovered {} files under {}", files.len(), dir.display());

        let mut entries = Vec::with_capacity(files.len());
        for path in files {
            let entry = classify_file(self.git, &path);
            if entry.ignored {
                println!("Skipped (ignored): {}", path.display());
                summary.ignored += 1;
            }
            entries.push(entry);
        }

        let ordered = order_entries(entries);

        if self.options.group_by_day {
            for group in group_by_day(&ordered) {
                self.attempt(group.paths, group.timestamp, &mut summary).await;
            }
        } else {
            for entry in ordered {
                self.attempt(vec![entry.path], entry.timestamp, &mut summary).await;
            }
        }

        println!("Done: {}", summary);
        summary
    }

    /// One commit (with fallback), reported and tallied. Never fails the run.
    async fn attempt(
        &self,
        paths: Vec<PathBuf>,
        timestamp: DateTime<Local>,
        summary: &mut RunSummary,
    ) {
        let label = paths
            .iter()
            .map(|p| p.display().to_string())
            .collect::<Vec<_>>()
            .join(", ");
        let request = CommitRequest {
            paths,
            timestamp,
            author: self.options.author.clone(),
            mode: self.options.mode(),
        };

        match self.driver.commit_with_fallback(&request).await {
            Ok(CommitOutcome::Committed { id, .. }) => {
                summary.committed += 1;
                println!(
                    "Commit: {}, Date: {}, File: {}",
                    id,
                    timestamp.format("%Y-%m-%d %H:%M:%S"),
                    label
                );
            }
            Ok(CommitOutcome::Failed(reason)) => {
                summary.failed += 1;
                println!("Failed: {} ({})", label, reason);
            }
            Err(e) => {
                summary.failed += 1;
                println!("Failed: {} ({})", label, e);
            }
        }
    }
}
