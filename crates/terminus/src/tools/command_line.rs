//! Command names in a shell line, for the command allow-list.

use crate::session::CommandAllowList;

/// Names of the commands a shell line runs.
///
/// The line is split on `&&`, `||`, `;` and `|` outside quotes; each segment
/// contributes the basename of its first word.
#[must_use]
pub fn extract_commands(line: &str) -> Vec<String> {
    split_segments(line)
        .iter()
        .filter_map(|segment| first_word(segment))
        .map(|word| match word.rsplit('/').next() {
            Some(base) => base.to_string(),
            None => word,
        })
        .filter(|name| !name.is_empty())
        .collect()
}

/// True when the line runs at least one command and all of them are allowed.
#[must_use]
pub fn is_command_allowed(line: &str, allowed: &CommandAllowList) -> bool {
    allowed.allows_all(&extract_commands(line))
}

fn split_segments(line: &str) -> Vec<String> {
    let mut segments = Vec::new();
    let mut current = String::new();
    let mut in_single = false;
    let mut in_double = false;
    let mut chars = line.chars().peekable();

    while let Some(ch) = chars.next() {
        match ch {
            '\'' if !in_double => {
                in_single = !in_single;
                current.push(ch);
            }
            '"' if !in_single => {
                in_double = !in_double;
                current.push(ch);
            }
            '&' | '|' if !in_single && !in_double && chars.peek() == Some(&ch) => {
                chars.next();
                flush(&mut segments, &mut current);
            }
            ';' | '|' if !in_single && !in_double => flush(&mut segments, &mut current),
            _ => current.push(ch),
        }
    }
    flush(&mut segments, &mut current);
    segments
}

fn flush(segments: &mut Vec<String>, current: &mut String) {
    if !current.trim().is_empty() {
        segments.push(current.trim().to_string());
    }
    current.clear();
}

fn first_word(segment: &str) -> Option<String> {
    let mut word = String::new();
    let mut quote: Option<char> = None;

    for ch in segment.trim_start().chars() {
        match (quote, ch) {
            (Some(open), ch) if ch == open => quote = None,
            (Some(_), ch) => word.push(ch),
            (None, '\'' | '"') => quote = Some(ch),
            (None, ch) if ch.is_whitespace() => break,
            (None, ch) => word.push(ch),
        }
    }

    (!word.is_empty()).then_some(word)
}
