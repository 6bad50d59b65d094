//! Ignore and status classification.
//!
//! Both queries follow a conservative classification policy: when git gives
//! an answer we cannot interpret, a file is treated as *not ignored* (so it is
//! never silently dropped) and *not new* (so it is dated by modification time).

use std::path::{Path, PathBuf};

use tracing::warn;

use super::GitBackend;

/// Answer of `git check-ignore` for one path.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IgnoreStatus {
    Ignored,
    NotIgnored,
    /// Any exit code other than 0 or 1 (or none at all).
    Unknown(Option<i32>),
}

impl IgnoreStatus {
    /// Map a `git check-ignore` exit code.
    pub fn from_exit_code(code: Option<i32>) -> Self {
        match code {
            Some(0) => IgnoreStatus::Ignored,
            Some(1) => IgnoreStatus::NotIgnored,
            other => IgnoreStatus::Unknown(other),
        }
    }
}

/// State of a path as far as choosing its timestamp is concerned.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileState {
    /// `??`: present on disk, unknown to git.
    Untracked,
    /// `A?`: staged but never committed.
    Added,
    /// Anything else git reported (modified, renamed, deleted, ...).
    Changed,
}

impl FileState {
    pub fn is_new(self) -> bool {
        matches!(self, FileState::Untracked | FileState::Added)
    }
}

/// One line of `git status --porcelain=v1`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatusEntry {
    /// The two-character status code, e.g. `"??"`, `"A "`, `" M"`.
    pub code: String,
    pub path: String,
}

impl StatusEntry {
    pub fn state(&self) -> FileState {
        let mut chars = self.code.chars();
        match (chars.next(), chars.next()) {
            (Some('?'), Some('?')) => FileState::Untracked,
            (Some('A'), _) => FileState::Added,
            _ => FileState::Changed,
        }
    }
}

/// Parse porcelain v1 output into entries.
///
/// Renames (`R  old -> new`) report the new path. Lines too short to carry a
/// code and a path are skipped.
pub fn parse_porcelain(output: &str) -> Vec<StatusEntry> {
    output
        .lines()
        .filter(|line| line.len() >= 4 && line.is_char_boundary(2) && line.is_char_boundary(3))
        .map(|line| {
            let code = line[..2].to_string();
            let rest = line[3..].trim();
            let path = match rest.split_once(" -> ") {
                Some((_, new)) => new,
                None => rest,
            };
            StatusEntry {
                code,
                path: unquote_path(path),
            }
        })
        .collect()
}

/// Porcelain quotes paths with special characters; we only need the plain text.
fn unquote_path(path: &str) -> String {
    path.strip_prefix('"')
        .and_then(|p| p.strip_suffix('"'))
        .unwrap_or(path)
        .to_string()
}

/// Whether `path` should be skipped because git ignores it.
///
/// Only a definite "ignored" answer excludes the file.
pub fn is_ignored<G: GitBackend + ?Sized>(git: &G, path: &Path) -> bool {
    match git.check_ignore(path) {
        Ok(IgnoreStatus::Ignored) => true,
        Ok(IgnoreStatus::NotIgnored) => false,
        Ok(IgnoreStatus::Unknown(code)) => {
            warn!(
                "git check-ignore gave no clear answer for {} (exit {:?}); treating as not ignored",
                path.display(),
                code
            );
            false
        }
        Err(e) => {
            warn!(
                "git check-ignore failed for {}: {}; treating as not ignored",
                path.display(),
                e
            );
            false
        }
    }
}

/// Whether `path` is new to the repository (untracked or staged-but-uncommitted).
///
/// An empty status means the file is committed and unchanged: not new.
pub fn is_new<G: GitBackend + ?Sized>(git: &G, path: &Path) -> bool {
    let paths = [PathBuf::from(path)];
    match git.status_porcelain(&paths) {
        Ok(entries) => entries.first().is_some_and(|e| e.state().is_new()),
        Err(e) => {
            warn!(
                "git status failed for {}: {}; treating as not new",
                path.display(),
                e
            );
            false
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::GitError;
    use crate::git::MockGitBackend;

    #[test]
    fn test_ignore_exit_codes() {
        assert_eq!(IgnoreStatus::from_exit_code(Some(0)), IgnoreStatus::Ignored);
        assert_eq!(IgnoreStatus::from_exit_code(Some(1)), IgnoreStatus::NotIgnored);
        assert_eq!(
            IgnoreStatus::from_exit_code(Some(128)),
            IgnoreStatus::Unknown(Some(128))
        );
        assert_eq!(IgnoreStatus::from_exit_code(None), IgnoreStatus::Unknown(None));
    }

    #[test]
    fn test_parse_porcelain_codes() {
        let output = "?? notes.txt\nA  staged.rs\n M src/lib.rs\nR  old.md -> new.md\n";
        let entries = parse_porcelain(output);

        assert_eq!(entries.len(), 4);
        assert_eq!(entries[0].state(), FileState::Untracked);
        assert_eq!(entries[0].path, "notes.txt");
        assert_eq!(entries[1].state(), FileState::Added);
        assert_eq!(entries[2].state(), FileState::Changed);
        assert_eq!(entries[2].path, "src/lib.rs");
        assert_eq!(entries[3].path, "new.md");
    }

    #[test]
    fn test_parse_porcelain_added_then_modified_is_new() {
        let entries = parse_porcelain("AM draft.txt\n");
        assert!(entries[0].state().is_new());
    }

    #[test]
    fn test_parse_porcelain_quoted_path() {
        let entries = parse_porcelain("?? \"with space.txt\"\n");
        assert_eq!(entries[0].path, "with space.txt");
    }

    #[test]
    fn test_parse_porcelain_empty() {
        assert!(parse_porcelain("").is_empty());
    }

    #[test]
    fn test_is_ignored_only_on_definite_answer() {
        let mut git = MockGitBackend::new();
        git.expect_check_ignore()
            .returning(|p| match p.to_str() {
                Some("ignored.log") => Ok(IgnoreStatus::Ignored),
                Some("kept.txt") => Ok(IgnoreStatus::NotIgnored),
                Some("odd.txt") => Ok(IgnoreStatus::Unknown(Some(128))),
                _ => Err(GitError::NotInstalled),
            });

        assert!(is_ignored(&git, Path::new("ignored.log")));
        assert!(!is_ignored(&git, Path::new("kept.txt")));
        assert!(!is_ignored(&git, Path::new("odd.txt")));
        assert!(!is_ignored(&git, Path::new("broken.txt")));
    }

    #[test]
    fn test_is_new_for_untracked_and_added() {
        let mut git = MockGitBackend::new();
        git.expect_status_porcelain()
            .returning(|paths| {
                let path = paths[0].to_string_lossy().to_string();
                let code = match path.as_str() {
                    "untracked.txt" => "??",
                    "added.txt" => "A ",
                    "modified.txt" => " M",
                    _ => return Ok(Vec::new()),
                };
                Ok(vec![StatusEntry {
                    code: code.to_string(),
                    path,
                }])
            });

        assert!(is_new(&git, Path::new("untracked.txt")));
        assert!(is_new(&git, Path::new("added.txt")));
        assert!(!is_new(&git, Path::new("modified.txt")));
        assert!(!is_new(&git, Path::new("committed.txt")));
    }

    #[test]
    fn test_is_new_defaults_to_false_on_error() {
        let mut git = MockGitBackend::new();
        git.expect_status_porcelain().returning(|_| {
            Err(GitError::CommandFailed {
                operation: "status",
                code: Some(128),
                stderr: "fatal: not a git repository".to_string(),
            })
        });

        assert!(!is_new(&git, Path::new("anything.txt")));
    }
}
