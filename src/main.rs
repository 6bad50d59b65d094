//! git-backfill - CLI entry point.

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use tracing::{debug, info};
use tracing_subscriber::EnvFilter;

use git_backfill::config::Config;
use git_backfill::error::BackfillError;
use git_backfill::git::{GitCli, check_git_installed};
use git_backfill::message::{HttpCompletionClient, MessageGenerator};
use git_backfill::run::{Backfill, RunOptions, resolve_target};

/// Backfill git history from existing files, dated by their timestamps.
#[derive(Parser, Debug)]
#[command(name = "git-backfill")]
#[command(about = "Commit existing files one by one, dated by their filesystem timestamps")]
#[command(version)]
struct Cli {
    /// File or directory to backfill
    path: PathBuf,

    /// Author and committer name (falls back to BACKFILL_AUTHOR)
    #[arg(long)]
    author: Option<String>,

    /// Author and committer email (falls back to BACKFILL_EMAIL)
    #[arg(long)]
    email: Option<String>,

    /// Use the fixed template message instead of the text-generation endpoint
    #[arg(long)]
    no_ai: bool,

    /// Make one commit per calendar day instead of one per file
    #[arg(long)]
    group_by_day: bool,

    /// Verbose logging (debug level unless RUST_LOG says otherwise)
    #[arg(short, long)]
    verbose: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Step 1: Environment and logging
    dotenv::dotenv().ok();
    init_tracing(cli.verbose);

    // Step 2: Check prerequisites
    check_git_installed().map_err(|_| BackfillError::GitUnavailable)?;

    let config = Config::from_env();
    let identity = config
        .resolve_identity(cli.author, cli.email)
        .context("Commit identity is required")?;

    // Step 3: Validate target and locate the repository
    let resolved = resolve_target(&cli.path).context("Invalid backfill target")?;
    std::env::set_current_dir(&resolved.repo_root).with_context(|| {
        format!(
            "Failed to enter repository root {}",
            resolved.repo_root.display()
        )
    })?;
    debug!("Repository root: {}", resolved.repo_root.display());

    // Step 4: Wire up git and the message generator
    let use_ai = !cli.no_ai;
    if use_ai && !config.ai_configured() {
        info!(
            "Text-generation endpoint not fully configured; AI messages will fall back to the template"
        );
    }

    let client = HttpCompletionClient::new(&config)
        .context("Failed to build HTTP client for the text-generation endpoint")?;
    let messages = MessageGenerator::new(client, config.max_diff_chars);
    let git = GitCli::new(resolved.repo_root.clone());

    // Step 5: Backfill
    let backfill = Backfill::new(
        &git,
        &messages,
        RunOptions {
            author: identity,
            use_ai,
            group_by_day: cli.group_by_day,
        },
    );
    let summary = backfill.run(&resolved.target).await;
    debug!("Run finished: {}", summary);

    Ok(())
}

/// Log to stderr; stdout carries the per-file progress lines.
fn init_tracing(verbose: bool) {
    let default_level = if verbose { "debug" } else { "warn" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}
