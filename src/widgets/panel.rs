//! Rounded box panels.

use crate::core::style::{Style, Tone};
use crate::core::text::width::{pad_to_width, visible_width, wrap_visible};

const MIN_PANEL_WIDTH: usize = 20;

/// Renders a titled box of exactly `width` visible cells per line.
///
/// Body lines wider than the interior are hard-wrapped; an optional footer is
/// separated from the body by a blank interior line.
pub fn render_panel(
    title: &str,
    body: &[String],
    footer: Option<&str>,
    width: usize,
    border: Tone,
    style: Style,
) -> Vec<String> {
    let width = width.max(MIN_PANEL_WIDTH);
    let inner = width - 4;
    let edge = |text: &str| style.paint(border, text);

    let title_width = visible_width(title);
    let fill = width.saturating_sub(title_width + 5);
    let mut lines = Vec::with_capacity(body.len() + 4);
    lines.push(format!(
        "{}{}{}",
        edge("╭─ "),
        style.bold(border, title),
        edge(&format!(" {}╮", "─".repeat(fill)))
    ));

    let row = |content: &str| format!("{} {} {}", edge("│"), pad_to_width(content, inner), edge("│"));

    for line in body {
        for chunk in wrap_visible(line, inner) {
            lines.push(row(&chunk));
        }
    }

    if let Some(footer) = footer {
        lines.push(row(""));
        for chunk in wrap_visible(footer, inner) {
            lines.push(row(&style.paint(Tone::Muted, &chunk)));
        }
    }

    lines.push(edge(&format!("╰{}╯", "─".repeat(width - 2))));
    lines
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::render_panel;
    use crate::core::style::{Style, Tone};
    use crate::core::text::width::visible_width;

    #[test]
    fn panel_lines_share_one_width() {
        let body = vec!["hello".to_string(), "a much longer line that wraps".to_string()];
        let lines = render_panel("terminus", &body, Some("File: a.rs"), 24, Tone::Primary, Style::plain());

        assert!(lines.iter().all(|line| visible_width(line) == 24), "{lines:#?}");
        assert_eq!(lines[0], "╭─ terminus ───────────╮");
        assert_eq!(lines[1], "│ hello                │");
        assert_eq!(lines.last().map(String::as_str), Some("╰──────────────────────╯"));
    }

    #[test]
    fn footer_is_separated_by_blank_row() {
        let lines = render_panel("t", &["x".to_string()], Some("foot"), 20, Tone::Border, Style::plain());
        assert_eq!(lines[2], format!("│ {} │", " ".repeat(16)));
        assert_eq!(lines[3], format!("│ foot{} │", " ".repeat(12)));
    }

    #[test]
    fn narrow_width_is_clamped() {
        let lines = render_panel("t", &[], None, 4, Tone::Border, Style::plain());
        assert_eq!(visible_width(&lines[0]), 20);
    }
}
