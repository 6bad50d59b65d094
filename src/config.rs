//! Run configuration read once from the environment.
//!
//! `main` loads an optional `.env` file into the process environment first,
//! then builds a [`Config`] and passes it by reference to whatever needs it.

use std::env;
use std::time::Duration;

use tracing::warn;

use crate::error::BackfillError;

pub const API_URL_ENV_VAR: &str = "BACKFILL_API_URL";
pub const API_KEY_ENV_VAR: &str = "BACKFILL_API_KEY";
pub const MODEL_ENV_VAR: &str = "BACKFILL_MODEL";
pub const MAX_DIFF_CHARS_ENV_VAR: &str = "BACKFILL_MAX_DIFF_CHARS";
pub const TIMEOUT_ENV_VAR: &str = "BACKFILL_TIMEOUT";
pub const AUTHOR_ENV_VAR: &str = "BACKFILL_AUTHOR";
pub const EMAIL_ENV_VAR: &str = "BACKFILL_EMAIL";

/// Default cap on diff/preview characters sent to the endpoint.
pub const DEFAULT_MAX_DIFF_CHARS: usize = 4000;

/// Default HTTP timeout for the text-generation request.
pub const DEFAULT_TIMEOUT_SECS: u64 = 30;

/// Everything the message generator and commit driver need to know.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    pub api_url: Option<String>,
    pub api_key: Option<String>,
    pub model: Option<String>,
    pub max_diff_chars: usize,
    pub timeout: Duration,
    pub default_author: Option<String>,
    pub default_email: Option<String>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            api_url: None,
            api_key: None,
            model: None,
            max_diff_chars: DEFAULT_MAX_DIFF_CHARS,
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
            default_author: None,
            default_email: None,
        }
    }
}

impl Config {
    /// Build the configuration from environment variables.
    ///
    /// Never fails: missing endpoint settings only disable AI messages, and
    /// invalid numbers fall back to their defaults with a warning.
    pub fn from_env() -> Self {
        Self {
            api_url: non_empty_var(API_URL_ENV_VAR),
            api_key: non_empty_var(API_KEY_ENV_VAR),
            model: non_empty_var(MODEL_ENV_VAR),
            max_diff_chars: parse_var(MAX_DIFF_CHARS_ENV_VAR, DEFAULT_MAX_DIFF_CHARS),
            timeout: Duration::from_secs(parse_var(TIMEOUT_ENV_VAR, DEFAULT_TIMEOUT_SECS)),
            default_author: non_empty_var(AUTHOR_ENV_VAR),
            default_email: non_empty_var(EMAIL_ENV_VAR),
        }
    }

    /// Whether endpoint, key and model are all present.
    pub fn ai_configured(&self) -> bool {
        self.api_url.is_some() && self.api_key.is_some() && self.model.is_some()
    }

    /// Resolve the commit identity: CLI values win, config defaults fill in.
    pub fn resolve_identity(
        &self,
        author: Option<String>,
        email: Option<String>,
    ) -> Result<Identity, BackfillError> {
        let name = author
            .filter(|s| !s.trim().is_empty())
            .or_else(|| self.default_author.clone())
            .ok_or(BackfillError::MissingIdentity("author"))?;
        let email = email
            .filter(|s| !s.trim().is_empty())
            .or_else(|| self.default_email.clone())
            .ok_or(BackfillError::MissingIdentity("email"))?;
        Ok(Identity { name, email })
    }
}

/// Author and committer identity recorded on every backfilled commit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Identity {
    pub name: String,
    pub email: String,
}

fn non_empty_var(name: &str) -> Option<String> {
    env::var(name)
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

fn parse_var<T>(name: &str, default: T) -> T
where
    T: std::str::FromStr + std::fmt::Display + Copy,
{
    match non_empty_var(name) {
        Some(v) => match v.parse::<T>() {
            Ok(parsed) => parsed,
            Err(_) => {
                warn!("Invalid {} value '{}', using default {}", name, v, default);
                default
            }
        },
        None => default,
    }
}
