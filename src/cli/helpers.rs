//! Shared helper functions for CLI commands.

use std::time::Duration;

use console::{style, StyledObject, Term};
use indicatif::{ProgressBar, ProgressStyle};

/// Characters of raw text shown before asking to send it.
pub const PREVIEW_CHARS: usize = 500;

pub fn success_icon() -> StyledObject<&'static str> {
    style("✓").green()
}

pub fn error_icon() -> StyledObject<&'static str> {
    style("✗").red()
}

pub fn hint_icon() -> StyledObject<&'static str> {
    style("→").dim()
}

/// First `max_chars` characters of `text`, with `...` appended if cut.
pub fn preview(text: &str, max_chars: usize) -> String {
    match text.char_indices().nth(max_chars) {
        Some((idx, _)) => format!("{}...", &text[..idx]),
        None => text.to_string(),
    }
}

/// Spinner on stderr with a message.
pub fn spinner(message: impl Into<String>) -> anyhow::Result<ProgressBar> {
    let pb = ProgressBar::new_spinner();
    pb.set_style(ProgressStyle::default_spinner().template("{spinner:.green} {msg}")?);
    pb.set_message(message.into());
    pb.enable_steady_tick(Duration::from_millis(100));
    Ok(pb)
}

/// Ask a yes/no question on the terminal. Defaults to no.
///
/// Returns `None` when stderr is not a terminal.
pub fn confirm(question: &str) -> anyhow::Result<Option<bool>> {
    let term = Term::stderr();
    if !term.is_term() {
        return Ok(None);
    }

    term.write_str(&format!("{} [y/N] ", question))?;
    let answer = term.read_line()?;
    Ok(Some(is_yes(&answer)))
}

fn is_yes(answer: &str) -> bool {
    matches!(
        answer.trim().to_lowercase().as_str(),
        "y" | "yes" | "o" | "oui"
    )
}
