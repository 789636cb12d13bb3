//! Console: the single output gate for the shell.
//!
//! Every write goes through [`Console`], which pauses the spinner while writing and
//! inserts blank lines between status messages and panels depending on what was
//! printed last.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use crate::core::style::{Style, Tone};
use crate::core::terminal::{lock_unpoisoned, SharedTerminal, Terminal};
use crate::widgets::panel::render_panel;
use crate::widgets::preview::Preview;
use crate::widgets::spinner::{Spinner, SpinnerState};

const DEFAULT_MAX_WIDTH: usize = 100;
const PANEL_INDENT: &str = " ";

/// Console construction options.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ConsoleOptions {
    pub color: bool,
    pub spinner: bool,
    pub max_width: usize,
}

impl Default for ConsoleOptions {
    fn default() -> Self {
        Self {
            color: false,
            spinner: false,
            max_width: DEFAULT_MAX_WIDTH,
        }
    }
}

/// Kind of the most recent output, used for spacing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputContext {
    Status,
    Panel,
    UserInput,
}

struct ConsoleState {
    last_output: Option<OutputContext>,
    spinner: Spinner,
}

struct ConsoleInner {
    terminal: SharedTerminal,
    style: Style,
    max_width: usize,
    state: Mutex<ConsoleState>,
}

/// Cloneable handle to the shared console.
#[derive(Clone)]
pub struct Console {
    inner: Arc<ConsoleInner>,
}

impl Console {
    pub fn new(terminal: impl Terminal + 'static, options: ConsoleOptions) -> Self {
        let terminal: SharedTerminal =
            Arc::new(Mutex::new(Box::new(terminal) as Box<dyn Terminal>));
        let style = Style::new(options.color);
        let spinner = Spinner::new(Arc::clone(&terminal), style, options.spinner);

        Self {
            inner: Arc::new(ConsoleInner {
                terminal,
                style,
                max_width: options.max_width.max(1),
                state: Mutex::new(ConsoleState {
                    last_output: None,
                    spinner,
                }),
            }),
        }
    }

    #[must_use]
    pub fn style(&self) -> Style {
        self.inner.style
    }

    #[must_use]
    pub fn last_output(&self) -> Option<OutputContext> {
        lock_unpoisoned(&self.inner.state).last_output
    }

    /// Marks the next output as following direct user input (no leading blank line).
    pub fn reset_output_context(&self) {
        lock_unpoisoned(&self.inner.state).last_output = Some(OutputContext::UserInput);
    }

    fn panel_width(&self) -> usize {
        let columns = usize::from(lock_unpoisoned(&self.inner.terminal).columns());
        columns.min(self.inner.max_width).saturating_sub(PANEL_INDENT.len() + 1)
    }

    /// Writes lines of the given context kind, applying spacing rules.
    fn emit(&self, kind: OutputContext, lines: &[String]) {
        let mut state = lock_unpoisoned(&self.inner.state);
        let resume = state.spinner.pause();

        let spacer = match (state.last_output, kind) {
            (None | Some(OutputContext::UserInput), _) => false,
            (Some(OutputContext::Panel), OutputContext::Status) => true,
            (Some(OutputContext::Status | OutputContext::Panel), OutputContext::Panel) => true,
            _ => false,
        };

        let mut out = String::new();
        if spacer {
            out.push('\n');
        }
        for line in lines {
            out.push_str(line);
            out.push('\n');
        }
        {
            let mut terminal = lock_unpoisoned(&self.inner.terminal);
            terminal.write(&out);
            terminal.flush();
        }

        state.last_output = Some(kind);
        if resume {
            state.spinner.resume();
        }
    }

    /// Writes raw text without a newline or spacing (used for prompts).
    pub fn write_raw(&self, text: &str) {
        let mut state = lock_unpoisoned(&self.inner.state);
        let resume = state.spinner.pause();
        {
            let mut terminal = lock_unpoisoned(&self.inner.terminal);
            terminal.write(text);
            terminal.flush();
        }
        if resume {
            state.spinner.resume();
        }
    }

    /// Clears the screen (interactive terminals only) and prints `art` with a
    /// tagline below it. Resets the output context.
    pub fn banner(&self, art: &str, tagline: &str) {
        let style = self.inner.style;
        let mut out = String::new();
        if lock_unpoisoned(&self.inner.terminal).is_interactive() {
            out.push_str("\x1b[2J\x1b[H");
        }
        for line in art.lines().filter(|line| !line.is_empty()) {
            out.push_str("  ");
            out.push_str(&style.paint(Tone::Primary, line));
            out.push('\n');
        }
        out.push_str("\n  ");
        out.push_str(&style.paint(Tone::Accent, tagline));
        out.push_str("\n\n");
        self.write_raw(&out);
        self.reset_output_context();
    }

    pub fn prompt(&self, symbol: &str) {
        self.write_raw(&self.inner.style.paint(Tone::Primary, symbol));
    }

    pub fn line(&self) {
        self.write_raw("\n");
    }

    pub fn info(&self, message: &str) {
        let line = self.inner.style.paint(Tone::Primary, &format!("• {message}"));
        self.emit(OutputContext::Status, &[line]);
    }

    pub fn success(&self, message: &str) {
        let line = self.inner.style.paint(Tone::Success, &format!("✓ {message}"));
        self.emit(OutputContext::Status, &[line]);
    }

    pub fn warning(&self, message: &str) {
        let line = self.inner.style.paint(Tone::Warning, &format!("⚠ {message}"));
        self.emit(OutputContext::Status, &[line]);
    }

    pub fn error(&self, message: &str, detail: Option<&str>) {
        let text = match detail {
            Some(detail) => format!("✗ {message}: {detail}"),
            None => format!("✗ {message}"),
        };
        let line = self.inner.style.paint(Tone::Error, &text);
        self.emit(OutputContext::Status, &[line]);
    }

    pub fn muted(&self, message: &str) {
        let line = self.inner.style.paint(Tone::Muted, message);
        self.emit(OutputContext::Status, &[line]);
    }

    pub fn bullet(&self, message: &str) {
        let line = self.inner.style.paint(Tone::Muted, &format!("  - {message}"));
        self.emit(OutputContext::Status, &[line]);
    }

    /// Agent aside printed between tool calls; continuation lines are indented.
    pub fn thinking(&self, message: &str) {
        let style = self.inner.style;
        let lines: Vec<String> = message
            .trim()
            .lines()
            .enumerate()
            .map(|(idx, line)| {
                let prefix = if idx == 0 { "› " } else { "  " };
                style.paint(Tone::Muted, &format!("{prefix}{line}"))
            })
            .collect();
        if !lines.is_empty() {
            self.emit(OutputContext::Status, &lines);
        }
    }

    fn panel(&self, title: &str, body: &[String], footer: Option<&str>, tone: Tone) {
        let lines: Vec<String> = render_panel(
            title,
            body,
            footer,
            self.panel_width(),
            tone,
            self.inner.style,
        )
        .into_iter()
        .map(|line| format!("{PANEL_INDENT}{line}"))
        .collect();
        self.emit(OutputContext::Panel, &lines);
    }

    /// Final agent output.
    pub fn agent(&self, content: &str) {
        let body: Vec<String> = content.lines().map(str::to_string).collect();
        self.panel("terminus", &body, None, Tone::Primary);
    }

    /// Preview of a pending tool action.
    pub fn tool_panel(&self, title: &str, preview: &Preview, footer: Option<&str>) {
        let body = preview.render(self.inner.style);
        self.panel(title, &body, footer, Tone::ToolData);
    }

    pub fn error_panel(&self, message: &str, detail: Option<&str>) {
        let mut body: Vec<String> = message.lines().map(str::to_string).collect();
        if let Some(detail) = detail {
            body.push(String::new());
            body.extend(detail.lines().map(str::to_string));
        }
        self.panel("Error", &body, None, Tone::Error);
    }

    pub fn info_panel(&self, title: &str, body: &[String]) {
        self.panel(title, body, None, Tone::Muted);
    }

    /// Pretty-printed data block (used by `/dump`).
    pub fn dump(&self, text: &str) {
        let lines: Vec<String> = text.lines().map(str::to_string).collect();
        self.emit(OutputContext::Status, &lines);
    }

    pub fn start_spinner(&self, message: &str) {
        lock_unpoisoned(&self.inner.state).spinner.start(message);
    }

    pub fn start_spinner_rotating(&self, messages: Vec<String>, period: Duration) {
        lock_unpoisoned(&self.inner.state)
            .spinner
            .start_rotating(messages, period);
    }

    pub fn stop_spinner(&self) {
        lock_unpoisoned(&self.inner.state).spinner.stop();
    }

    /// Pauses the spinner; returns true if it was running.
    pub fn pause_spinner(&self) -> bool {
        lock_unpoisoned(&self.inner.state).spinner.pause()
    }

    pub fn resume_spinner(&self) {
        lock_unpoisoned(&self.inner.state).spinner.resume();
    }

    #[must_use]
    pub fn spinner_state(&self) -> SpinnerState {
        lock_unpoisoned(&self.inner.state).spinner.state()
    }

    #[must_use]
    pub fn spinner_message(&self) -> String {
        lock_unpoisoned(&self.inner.state).spinner.message()
    }
}
