//! Prompt construction for AI-drafted commit messages.

use std::fs::{self, File};
use std::io::Read;
use std::path::{Path, PathBuf};

/// Instruction sent as the system message on every request.
pub const SYSTEM_INSTRUCTION: &str = "You write git commit messages. \
Reply with exactly one line: a Conventional Commits subject under 72 characters. \
No quotes, no body, no explanation.";

/// How many leading bytes are inspected when deciding if a file is binary.
const BINARY_SNIFF_LEN: usize = 8000;

/// Where the change context in a prompt came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContextKind {
    /// `git diff --cached` output.
    Diff,
    /// Raw content of new files, used when the staged diff is empty.
    Preview,
}

/// Change context ready to embed in a prompt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChangeContext {
    pub kind: ContextKind,
    pub text: String,
    pub truncated: bool,
}

impl ChangeContext {
    /// Wrap raw text, enforcing the character cap.
    pub fn new(kind: ContextKind, raw: &str, max_chars: usize) -> Self {
        let (text, truncated) = truncate_chars(raw, max_chars);
        Self {
            kind,
            text,
            truncated,
        }
    }
}

/// Cut `text` to at most `max_chars` characters.
///
/// Returns the (possibly shortened) text and whether anything was removed.
pub fn truncate_chars(text: &str, max_chars: usize) -> (String, bool) {
    match text.char_indices().nth(max_chars) {
        Some((end, _)) => (text[..end].to_string(), true),
        None => (text.to_string(), false),
    }
}

/// Notice prepended to truncated context.
pub fn truncation_notice(max_chars: usize) -> String {
    format!("[Truncated to {max_chars} characters; the full change is larger]")
}

/// Build a content preview of files that have no staged diff yet.
///
/// Text files are included verbatim; binary files are only described. At most
/// enough bytes for `max_chars` characters are read from each file.
pub fn preview_files(paths: &[PathBuf], max_chars: usize) -> String {
    paths
        .iter()
        .map(|p| format!("--- {} ---\n{}", p.display(), preview_file(p, max_chars)))
        .collect::<Vec<_>>()
        .join("\n")
}

fn preview_file(path: &Path, max_chars: usize) -> String {
    let size = match fs::metadata(path) {
        Ok(meta) => meta.len(),
        Err(e) => return format!("(unreadable: {e})"),
    };

    // A UTF-8 character is at most 4 bytes
    let limit = BINARY_SNIFF_LEN.max(max_chars.saturating_mul(4)) as u64;
    let mut prefix = Vec::new();
    if let Err(e) = File::open(path).and_then(|f| f.take(limit).read_to_end(&mut prefix)) {
        return format!("(unreadable: {e})");
    }

    let sniff = &prefix[..prefix.len().min(BINARY_SNIFF_LEN)];
    if sniff.contains(&0) {
        return format!("(binary file, {size} bytes)");
    }

    match std::str::from_utf8(&prefix) {
        Ok(text) => text.to_string(),
        // Only the read limit split a character; the rest is valid text
        Err(e) if e.error_len().is_none() && (prefix.len() as u64) < size => {
            String::from_utf8_lossy(&prefix[..e.valid_up_to()]).into_owned()
        }
        Err(_) => format!("(binary file, {size} bytes)"),
    }
}

/// Build the user prompt for one commit.
pub fn build_commit_prompt(
    paths: &[PathBuf],
    date: &str,
    context: &ChangeContext,
    max_chars: usize,
) -> String {
    let files_section = paths
        .iter()
        .map(|p| format!("- {}", p.display()))
        .collect::<Vec<_>>()
        .join("\n");

    let heading = match context.kind {
        ContextKind::Diff => "Staged diff",
        ContextKind::Preview => "New file contents",
    };

    let notice = if context.truncated {
        format!("{}\n", truncation_notice(max_chars))
    } else {
        String::new()
    };

    format!(
        r#"Write the commit message for a change recorded on {date}.

## Files
{files_section}

## {heading}
{notice}```
{text}
```

## Rules
- Start with a type tag: feat, fix, docs, style, refactor, perf, test, build, ci, or chore, e.g. `feat: add login form`
- If the change looks unfinished (stubs, TODOs, half-written code), use the tag `wip:` instead
- Imperative mood, lowercase after the colon, no period at the end
- The whole line must stay under 72 characters
- Reply with the single line only"#,
        text = context.text,
    )
}

/// Normalise a model reply into a one-line commit message.
///
/// Strips one layer of wrapping quotes or backticks and collapses line
/// breaks (and the whitespace around them) into single spaces.
pub fn clean_reply(reply: &str) -> String {
    let mut text = reply.trim();
    for quote in ['"', '\'', '`'] {
        if text.len() >= 2 && text.starts_with(quote) && text.ends_with(quote) {
            text = text[1..text.len() - 1].trim();
            break;
        }
    }

    text.lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .collect::<Vec<_>>()
        .join(" ")
}
