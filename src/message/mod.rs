//! Commit message generation: fixed template or AI-drafted.

pub mod client;
pub mod prompt;
pub mod template;

use std::path::PathBuf;

use chrono::{DateTime, Local};
use tracing::{debug, warn};

use crate::error::MessageError;
use crate::git::{GitBackend, is_new};

pub use client::{CompletionClient, HttpCompletionClient};
pub use prompt::{
    ChangeContext, ContextKind, SYSTEM_INSTRUCTION, build_commit_prompt, clean_reply,
};
pub use template::template_message;

/// How a commit's message is produced.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MessageMode {
    Template,
    Ai,
}

/// Produces commit messages for staged changes.
pub struct MessageGenerator<C> {
    client: C,
    max_diff_chars: usize,
}

impl<C: CompletionClient> MessageGenerator<C> {
    pub fn new(client: C, max_diff_chars: usize) -> Self {
        Self {
            client,
            max_diff_chars,
        }
    }

    pub fn client(&self) -> &C {
        &self.client
    }

    /// Produce a message for `paths`, or `None` when AI drafting failed.
    ///
    /// Template mode always succeeds. AI mode never raises: every failure is
    /// logged and reported as `None` so the caller can fall back.
    pub async fn generate<G: GitBackend + ?Sized>(
        &self,
        git: &G,
        paths: &[PathBuf],
        timestamp: DateTime<Local>,
        mode: MessageMode,
    ) -> Option<String> {
        match mode {
            MessageMode::Template => Some(template_message(timestamp)),
            MessageMode::Ai => match self.draft(git, paths, timestamp).await {
                Ok(message) => Some(message),
                Err(e) => {
                    warn!("AI commit message unavailable: {}", e);
                    None
                }
            },
        }
    }

    async fn draft<G: GitBackend + ?Sized>(
        &self,
        git: &G,
        paths: &[PathBuf],
        timestamp: DateTime<Local>,
    ) -> Result<String, MessageError> {
        let context = self.collect_context(git, paths)?;
        let date = timestamp.format("%Y-%m-%d").to_string();
        let prompt = build_commit_prompt(paths, &date, &context, self.max_diff_chars);

        debug!(
            "Commit prompt: {} chars, context {:?}, truncated={}",
            prompt.len(),
            context.kind,
            context.truncated
        );

        let reply = self.client.complete(SYSTEM_INSTRUCTION, &prompt).await?;
        let message = clean_reply(&reply);
        if message.is_empty() {
            return Err(MessageError::EmptyResponse);
        }
        Ok(message)
    }

    /// Staged diff for `paths`, or a preview of the new files when the diff is empty.
    fn collect_context<G: GitBackend + ?Sized>(
        &self,
        git: &G,
        paths: &[PathBuf],
    ) -> Result<ChangeContext, MessageError> {
        let diff = git.diff_cached(paths).map_err(MessageError::Context)?;
        if !diff.trim().is_empty() {
            return Ok(ChangeContext::new(ContextKind::Diff, &diff, self.max_diff_chars));
        }

        let new_files: Vec<PathBuf> = paths
            .iter()
            .filter(|p| is_new(git, p.as_path()))
            .cloned()
            .collect();
        let preview = prompt::preview_files(&new_files, self.max_diff_chars);
        Ok(ChangeContext::new(ContextKind::Preview, &preview, self.max_diff_chars))
    }
}
