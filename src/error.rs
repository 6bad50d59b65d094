//! Error types for git-backfill modules using thiserror.

use std::path::PathBuf;

use thiserror::Error;

/// Errors from git subprocess invocations.
#[derive(Error, Debug)]
pub enum GitError {
    #[error("git executable not found on PATH")]
    NotInstalled,

    #[error("Failed to run git {operation}: {source}")]
    SpawnFailed {
        operation: &'static str,
        #[source]
        source: std::io::Error,
    },

    #[error("git {operation} failed with {}: {stderr}",
            code.map_or("no exit code".to_string(), |c| format!("exit code {c}")))]
    CommandFailed {
        operation: &'static str,
        code: Option<i32>,
        stderr: String,
    },

    #[error("Could not find a commit id in git output: {0}")]
    UnparseableCommitOutput(String),
}

/// Errors from the text-generation endpoint.
///
/// None of these are fatal: the message generator turns every one of them
/// into an absent message so the caller can fall back to the template.
#[derive(Error, Debug)]
pub enum MessageError {
    #[error("AI messages are not configured: {0} is not set")]
    NotConfigured(&'static str),

    #[error("Request to the text-generation endpoint failed: {0}")]
    Request(#[source] reqwest::Error),

    #[error("Text-generation endpoint returned HTTP {status}: {body}")]
    HttpStatus { status: u16, body: String },

    #[error("Text-generation endpoint returned a malformed response: {0}")]
    MalformedResponse(String),

    #[error("Text-generation endpoint returned an empty message")]
    EmptyResponse,

    #[error("Could not collect change context: {0}")]
    Context(#[source] GitError),
}

/// Fatal precondition failures, reported before any commit is attempted.
#[derive(Error, Debug)]
pub enum BackfillError {
    #[error("{0} is neither an existing file nor an existing directory")]
    TargetNotFound(PathBuf),

    #[error(
        "No .git directory found at or above {0}. Please initialize a Git repository first."
    )]
    NotARepository(PathBuf),

    #[error(
        "No commit {0} given. Pass --{0} or set BACKFILL_{upper} in the environment or .env file",
        upper = .0.to_uppercase()
    )]
    MissingIdentity(&'static str),

    #[error("git is required but was not found on PATH")]
    GitUnavailable,
}
