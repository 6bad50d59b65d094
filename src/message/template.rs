//! Fixed commit messages that need no network.

use chrono::{DateTime, Local};

/// `Adding files from YYYY-MM-DD`.
pub fn template_message(timestamp: DateTime<Local>) -> String {
    format!("Adding files from {}", timestamp.format("%Y-%m-%d"))
}
