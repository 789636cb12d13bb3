//! Previews shown before a side effect: diffs, highlighted code, plain text.

use std::path::Path;

use once_cell::sync::Lazy;
use similar::TextDiff;
use syntect::easy::HighlightLines;
use syntect::highlighting::ThemeSet;
use syntect::parsing::SyntaxSet;
use syntect::util::{as_24_bit_terminal_escaped, LinesWithEndings};

use crate::core::style::{Style, Tone};

const SYNTAX_THEME: &str = "base16-ocean.dark";
const DIFF_CONTEXT: usize = 3;

static SYNTAXES: Lazy<SyntaxSet> = Lazy::new(SyntaxSet::load_defaults_newlines);
static THEMES: Lazy<ThemeSet> = Lazy::new(ThemeSet::load_defaults);

/// Payload rendered inside a confirmation panel.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Preview {
    Text(String),
    /// File content, highlighted by the extension of `path`.
    Code { path: String, content: String },
    /// Unified diff between two versions of `path`.
    Diff {
        path: String,
        before: String,
        after: String,
    },
    /// A shell command line.
    Command(String),
}

impl Preview {
    /// Renders the preview into terminal lines.
    #[must_use]
    pub fn render(&self, style: Style) -> Vec<String> {
        match self {
            Self::Text(text) => text.lines().map(str::to_string).collect(),
            Self::Code { path, content } => highlight(content, path, style),
            Self::Diff {
                path,
                before,
                after,
            } => colorize_diff(&unified_diff(before, after, path), style),
            Self::Command(command) => vec![style.paint(Tone::Command, command)],
        }
    }
}

/// Unified diff with three lines of context and `a/`/`b/` headers.
#[must_use]
pub fn unified_diff(before: &str, after: &str, path: &str) -> String {
    TextDiff::from_lines(before, after)
        .unified_diff()
        .context_radius(DIFF_CONTEXT)
        .header(&format!("a/{path}"), &format!("b/{path}"))
        .to_string()
}

fn colorize_diff(diff: &str, style: Style) -> Vec<String> {
    diff.lines()
        .map(|line| {
            let tone = if line.starts_with("+++") || line.starts_with("---") {
                Tone::Muted
            } else if line.starts_with("@@") {
                Tone::Info
            } else if line.starts_with('+') {
                Tone::Success
            } else if line.starts_with('-') {
                Tone::Error
            } else {
                Tone::Subtle
            };
            style.paint(tone, line)
        })
        .collect()
}

/// Syntax-highlights `content` using the extension of `path`.
///
/// Falls back to plain lines when color is disabled or highlighting fails.
#[must_use]
pub fn highlight(content: &str, path: &str, style: Style) -> Vec<String> {
    let plain = || content.lines().map(str::to_string).collect::<Vec<_>>();
    if !style.is_enabled() {
        return plain();
    }

    let syntax = Path::new(path)
        .extension()
        .and_then(|ext| ext.to_str())
        .and_then(|ext| SYNTAXES.find_syntax_by_extension(ext))
        .unwrap_or_else(|| SYNTAXES.find_syntax_plain_text());
    let Some(theme) = THEMES
        .themes
        .get(SYNTAX_THEME)
        .or_else(|| THEMES.themes.values().next())
    else {
        return plain();
    };

    let mut highlighter = HighlightLines::new(syntax, theme);
    let mut lines = Vec::new();
    for line in LinesWithEndings::from(content) {
        let Ok(ranges) = highlighter.highlight_line(line, &SYNTAXES) else {
            return plain();
        };
        let escaped = as_24_bit_terminal_escaped(&ranges[..], false);
        lines.push(format!("{}\x1b[0m", escaped.trim_end_matches(['\r', '\n'])));
    }
    lines
}
