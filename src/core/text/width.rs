//! Grapheme width, visible width and wrapping helpers.

use unicode_segmentation::UnicodeSegmentation;
use unicode_width::UnicodeWidthStr;

use super::ansi::{escape_len, strip_ansi};

const TAB_WIDTH: usize = 4;

pub fn grapheme_width(grapheme: &str) -> usize {
    if grapheme == "\t" {
        return TAB_WIDTH;
    }
    UnicodeWidthStr::width(grapheme)
}

/// Terminal cell width of `input`, ignoring ANSI control sequences.
pub fn visible_width(input: &str) -> usize {
    if input.is_empty() {
        return 0;
    }

    strip_ansi(input).graphemes(true).map(grapheme_width).sum()
}

/// Pads `input` with spaces up to `width` visible cells.
pub fn pad_to_width(input: &str, width: usize) -> String {
    let current = visible_width(input);
    if current >= width {
        return input.to_string();
    }
    let mut padded = String::with_capacity(input.len() + width - current);
    padded.push_str(input);
    padded.extend(std::iter::repeat(' ').take(width - current));
    padded
}

/// Hard-wraps one line into chunks of at most `width` visible cells.
///
/// Escape sequences are copied through without counting toward the width, and a
/// reset is appended to every chunk that carried styling so colors never bleed
/// into the panel border.
pub fn wrap_visible(line: &str, width: usize) -> Vec<String> {
    if width == 0 || visible_width(line) <= width {
        return vec![line.to_string()];
    }

    let mut chunks = Vec::new();
    let mut current = String::new();
    let mut current_width = 0;
    let mut styled = false;
    let mut idx = 0;

    while idx < line.len() {
        if let Some(len) = escape_len(line, idx) {
            current.push_str(&line[idx..idx + len]);
            styled = true;
            idx += len;
            continue;
        }

        let rest = &line[idx..];
        let next_escape = rest.find('\x1b').unwrap_or(rest.len()).max(1);
        let segment = &rest[..next_escape];
        for grapheme in segment.graphemes(true) {
            let grapheme_cells = grapheme_width(grapheme);
            if current_width + grapheme_cells > width && current_width > 0 {
                if styled {
                    current.push_str("\x1b[0m");
                }
                chunks.push(std::mem::take(&mut current));
                current_width = 0;
            }
            current.push_str(grapheme);
            current_width += grapheme_cells;
        }
        idx += segment.len();
    }

    if !current.is_empty() {
        chunks.push(current);
    }
    chunks
}
