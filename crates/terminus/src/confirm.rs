//! Confirmation gate run before a tool performs a side effect.

use terminus_ui::{Console, Preview, Tone};
use tracing::debug;

use crate::runtime::InputLine;
use crate::session::Session;

pub const CONFIRM_PROMPT: &str = "  Continue? (y): ";

/// Shown before an answer that was not y, a or n; the prompt then repeats.
pub const UNRECOGNISED_ANSWER: &str = "Unrecognised answer: ";

const OPTIONS: [(&str, &str); 3] = [
    ("y", "Yes, execute this tool"),
    ("a", "Always allow this tool"),
    ("n", "No, cancel this execution"),
];

/// What a tool asks the user to approve.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConfirmRequest {
    /// Tool name, optionally followed by `:` and a qualifier.
    pub title: String,
    pub preview: Preview,
    pub footer: Option<String>,
}

impl ConfirmRequest {
    pub fn new(title: impl Into<String>, preview: Preview) -> Self {
        Self {
            title: title.into(),
            preview,
            footer: None,
        }
    }

    #[must_use]
    pub fn with_footer(mut self, footer: impl Into<String>) -> Self {
        self.footer = Some(footer.into());
        self
    }

    #[must_use]
    pub fn tool_name(&self) -> &str {
        tool_name_from_title(&self.title)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfirmDecision {
    Approve,
    ApproveAlways(String),
    Deny,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Choice {
    Yes,
    Always,
    No,
}

impl Choice {
    fn decision(self, tool_name: &str) -> ConfirmDecision {
        match self {
            Self::Yes => ConfirmDecision::Approve,
            Self::Always => ConfirmDecision::ApproveAlways(tool_name.to_string()),
            Self::No => ConfirmDecision::Deny,
        }
    }
}

/// Bare tool name: the title up to the first `:`, trimmed.
#[must_use]
pub fn tool_name_from_title(title: &str) -> &str {
    title.split(':').next().unwrap_or(title).trim()
}

/// Case-insensitive; an empty answer means yes.
#[must_use]
pub fn parse_choice(input: &str) -> Option<Choice> {
    match input.trim().to_lowercase().as_str() {
        "" | "y" | "yes" => Some(Choice::Yes),
        "a" | "always" => Some(Choice::Always),
        "n" | "no" => Some(Choice::No),
        _ => None,
    }
}

/// Returns true when the action may proceed.
///
/// Short-circuits without any I/O when confirmations are off or the tool is
/// exempt. Otherwise blocks on `read_line` until a recognised answer arrives;
/// end of input counts as a denial. Lines typed ahead while the request was
/// running are read first, as a cooked terminal would deliver them, and any
/// that are not an answer are echoed back before the prompt repeats.
pub fn confirm(
    session: &mut Session,
    console: &Console,
    request: &ConfirmRequest,
    read_line: &mut dyn FnMut() -> InputLine,
) -> bool {
    let tool_name = request.tool_name();
    if session.skips_confirmation(tool_name) {
        debug!(tool = tool_name, "confirmation skipped");
        return true;
    }

    let decision = prompt_decision(console, request, tool_name, read_line);
    debug!(tool = tool_name, ?decision, "confirmation resolved");
    apply_decision(session, decision)
}

fn prompt_decision(
    console: &Console,
    request: &ConfirmRequest,
    tool_name: &str,
    read_line: &mut dyn FnMut() -> InputLine,
) -> ConfirmDecision {
    let resume = console.pause_spinner();
    console.tool_panel(&request.title, &request.preview, request.footer.as_deref());
    console.line();
    let style = console.style();
    for (key, description) in OPTIONS {
        console.write_raw(&format!(
            "{}\n",
            style.paint(Tone::Warning, &format!("  {key}: {description}"))
        ));
    }

    let decision = loop {
        console.write_raw(CONFIRM_PROMPT);
        match read_line() {
            InputLine::Eof => {
                console.line();
                break ConfirmDecision::Deny;
            }
            InputLine::Line(answer) => {
                if let Some(choice) = parse_choice(&answer) {
                    break choice.decision(tool_name);
                }
                console.write_raw(&format!(
                    "{}\n",
                    style.paint(
                        Tone::Muted,
                        &format!("  {}{}", UNRECOGNISED_ANSWER, answer.trim())
                    )
                ));
            }
        }
    };

    if decision != ConfirmDecision::Deny {
        console.line();
    }
    console.reset_output_context();
    if resume {
        console.resume_spinner();
    }
    decision
}

/// Records an "always" answer and reports whether the action may proceed.
pub fn apply_decision(session: &mut Session, decision: ConfirmDecision) -> bool {
    match decision {
        ConfirmDecision::Approve => true,
        ConfirmDecision::ApproveAlways(tool_name) => {
            session.disable_confirmation(tool_name);
            true
        }
        ConfirmDecision::Deny => false,
    }
}
