//! git-backfill - A CLI tool that turns a directory of existing files into git history.
//!
//! # Overview
//!
//! git-backfill walks a file or directory inside a git repository, dates each
//! file from its filesystem timestamps, and commits the files one at a time in
//! chronological order with author and committer dates set to those timestamps.
//! Commit messages come from a fixed template or, when configured, from an
//! OpenAI-compatible text-generation endpoint, with a template fallback.

pub mod config;
pub mod driver;
pub mod error;
pub mod git;
pub mod message;
pub mod run;
pub mod timestamp;

// Re-export commonly used types
pub use config::{Config, Identity};
pub use driver::{CommitDriver, CommitFailure, CommitOutcome, CommitRequest};
pub use error::{BackfillError, GitError, MessageError};
pub use git::{CommitEnv, GitBackend, GitCli};
pub use message::{CompletionClient, HttpCompletionClient, MessageGenerator, MessageMode};
pub use run::{Backfill, RunOptions, RunSummary, Target, resolve_target};
