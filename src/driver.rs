//! Commit driver: stage, message, back-dated commit, template fallback.

use std::fmt;
use std::path::PathBuf;

use chrono::{DateTime, Local};
use tracing::{debug, warn};

use crate::config::Identity;
use crate::error::GitError;
use crate::git::{CommitEnv, GitBackend};
use crate::message::{CompletionClient, MessageGenerator, MessageMode};

/// One commit to make.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommitRequest {
    pub paths: Vec<PathBuf>,
    pub timestamp: DateTime<Local>,
    pub author: Identity,
    pub mode: MessageMode,
}

impl CommitRequest {
    /// The same request with the template message mode.
    pub fn with_template(&self) -> Self {
        Self {
            mode: MessageMode::Template,
            ..self.clone()
        }
    }
}

/// Why a commit attempt produced no commit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CommitFailure {
    /// The message generator gave no message.
    NoMessage,
    /// `git commit` failed or its output had no commit id.
    Rejected(String),
}

impl fmt::Display for CommitFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CommitFailure::NoMessage => f.write_str("no commit message available"),
            CommitFailure::Rejected(reason) => write!(f, "commit rejected: {reason}"),
        }
    }
}

/// Result of one commit attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CommitOutcome {
    Committed { id: String, message: String },
    Failed(CommitFailure),
}

impl CommitOutcome {
    pub fn is_success(&self) -> bool {
        matches!(self, CommitOutcome::Committed { .. })
    }

    pub fn id(&self) -> Option<&str> {
        match self {
            CommitOutcome::Committed { id, .. } => Some(id),
            CommitOutcome::Failed(_) => None,
        }
    }
}

/// Drives git through a commit for a set of paths.
pub struct CommitDriver<'a, G: ?Sized, C> {
    git: &'a G,
    messages: &'a MessageGenerator<C>,
}

impl<'a, G, C> CommitDriver<'a, G, C>
where
    G: GitBackend + ?Sized,
    C: CompletionClient,
{
    pub fn new(git: &'a G, messages: &'a MessageGenerator<C>) -> Self {
        Self { git, messages }
    }

    /// Stage every path. The first failure aborts.
    pub fn stage(&self, paths: &[PathBuf]) -> Result<(), GitError> {
        for path in paths {
            self.git.stage(path)?;
        }
        Ok(())
    }

    /// Make one commit attempt, without fallback.
    ///
    /// Staging errors are returned as `Err`; everything after staging is
    /// reported through [`CommitOutcome`]. A failed attempt leaves the index
    /// as it found it for `request.paths`.
    pub async fn commit(&self, request: &CommitRequest) -> Result<CommitOutcome, GitError> {
        if let Err(e) = self.stage(&request.paths) {
            self.restore_index(&request.paths);
            return Err(e);
        }

        let outcome = self.commit_staged(request).await;
        if !outcome.is_success() {
            self.restore_index(&request.paths);
        }
        Ok(outcome)
    }

    async fn commit_staged(&self, request: &CommitRequest) -> CommitOutcome {
        let Some(message) = self
            .messages
            .generate(self.git, &request.paths, request.timestamp, request.mode)
            .await
        else {
            return CommitOutcome::Failed(CommitFailure::NoMessage);
        };

        let env = CommitEnv::new(&request.author, request.timestamp);
        debug!("Committing {:?} as of {}: {}", request.paths, env.date, message);

        match self.git.commit(&message, &env) {
            Ok(id) => CommitOutcome::Committed { id, message },
            Err(e) => CommitOutcome::Failed(CommitFailure::Rejected(e.to_string())),
        }
    }

    /// Unstage after a failed attempt so the next commit only carries its own paths.
    fn restore_index(&self, paths: &[PathBuf]) {
        if let Err(e) = self.git.unstage(paths) {
            warn!("Could not unstage {:?} after a failed commit: {}", paths, e);
        }
    }

    /// Commit, retrying exactly once with the template if an AI attempt fails.
    pub async fn commit_with_fallback(
        &self,
        request: &CommitRequest,
    ) -> Result<CommitOutcome, GitError> {
        let outcome = self.commit(request).await?;
        if outcome.is_success() || request.mode == MessageMode::Template {
            return Ok(outcome);
        }

        if let CommitOutcome::Failed(reason) = &outcome {
            warn!("AI-mode commit failed ({}); retrying with template message", reason);
        }
        self.commit(&request.with_template()).await
    }
}
