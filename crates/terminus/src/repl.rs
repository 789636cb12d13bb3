//! The read-eval-print loop.

use std::path::PathBuf;

use terminus_ui::Console;
use tracing::{debug, warn};

use crate::commands::{parse_slash_command, run_slash_command, CommandContext, SlashCommand};
use crate::controller::RequestController;
use crate::runtime::{Command, InputLine, Runtime};
use crate::session::Session;
use crate::signals::SignalBridge;

pub const PROMPT_SYMBOL: &str = "$ ";
pub const WELCOME_MESSAGE: &str = "Welcome to Terminus — clean, simple, and ready to go.";
pub const FAREWELL_MESSAGE: &str = "Thanks for all the fish.";

/// Why [`Repl::run`] returned.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReplExit {
    /// The user typed `exit` or `quit`.
    ExitCommand,
    EndOfInput,
    /// Interrupt while no request was running.
    Interrupted,
}

enum NextInput {
    Line(String),
    Eof,
    Interrupted,
}

pub struct Repl {
    session: Session,
    runtime: Runtime,
    console: Console,
    controller: RequestController,
    signals: Option<SignalBridge>,
    error_log_dir: PathBuf,
}

impl Repl {
    pub fn new(
        session: Session,
        runtime: Runtime,
        console: Console,
        controller: RequestController,
    ) -> Self {
        Self {
            session,
            runtime,
            console,
            controller,
            signals: None,
            error_log_dir: std::env::temp_dir(),
        }
    }

    #[must_use]
    pub fn with_signal_bridge(mut self, bridge: SignalBridge) -> Self {
        self.signals = Some(bridge);
        self
    }

    /// Where `/test error` writes its diagnostic log.
    #[must_use]
    pub fn with_error_log_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.error_log_dir = dir.into();
        self
    }

    #[must_use]
    pub fn session(&self) -> &Session {
        &self.session
    }

    #[must_use]
    pub fn controller(&self) -> &RequestController {
        &self.controller
    }

    pub fn run(&mut self) -> ReplExit {
        self.console
            .info(&format!("Using model {}", self.session.model_id()));
        self.console.success(WELCOME_MESSAGE);

        let exit = loop {
            self.console.line();
            self.console.prompt(PROMPT_SYMBOL);

            let line = match self.next_input() {
                NextInput::Line(line) => line,
                NextInput::Eof => break ReplExit::EndOfInput,
                NextInput::Interrupted => break ReplExit::Interrupted,
            };

            self.console.line();
            self.console.reset_output_context();

            let input = line.trim();
            if input.is_empty() {
                continue;
            }
            if should_exit(input) {
                break ReplExit::ExitCommand;
            }
            if let Some(command) = parse_slash_command(input, self.session.debug_enabled()) {
                self.run_command(&command);
                continue;
            }

            let outcome = self.controller.handle_user_request(
                input,
                &mut self.session,
                &mut self.runtime,
                &self.console,
            );
            debug!(?outcome, "request resolved");
            self.reinstall_interrupt_hook();
        };

        debug!(?exit, "repl finished");
        if let Some(bridge) = self.signals.take() {
            bridge.restore_default();
        }
        self.console.info(FAREWELL_MESSAGE);
        exit
    }

    fn next_input(&mut self) -> NextInput {
        if let Some(line) = self.runtime.pop_typeahead() {
            return NextInput::Line(line);
        }

        loop {
            if self.runtime.input_closed() {
                return NextInput::Eof;
            }
            match self.runtime.next_command() {
                Command::Input(InputLine::Line(line)) => return NextInput::Line(line),
                Command::Input(InputLine::Eof) => self.runtime.close_input(),
                Command::Interrupt => {
                    self.console.line();
                    return NextInput::Interrupted;
                }
                Command::Confirm { run_id, reply, .. } => {
                    debug!(run_id, "denying confirmation from a finished run");
                    let _ = reply.send(false);
                }
                stale => debug!(?stale, "ignoring command while idle"),
            }
        }
    }

    fn run_command(&mut self, command: &SlashCommand) {
        let tool_names = self.controller.tools().names();
        let runtime = &mut self.runtime;
        let mut read_line = || runtime.read_line_deferring();
        let mut ctx = CommandContext {
            session: &mut self.session,
            console: &self.console,
            tool_names: &tool_names,
            error_log_dir: &self.error_log_dir,
            read_line: &mut read_line,
        };
        run_slash_command(command, &mut ctx);
    }

    fn reinstall_interrupt_hook(&mut self) {
        if let Some(bridge) = self.signals.as_mut() {
            if let Err(error) = bridge.reinstall() {
                warn!(%error, "reinstalling interrupt hook failed");
            }
        }
    }
}

fn should_exit(input: &str) -> bool {
    input.eq_ignore_ascii_case("exit") || input.eq_ignore_ascii_case("quit")
}

#[cfg(test)]
mod tests {
    use super::should_exit;

    #[test]
    fn exit_words_ignore_case() {
        assert!(should_exit("exit"));
        assert!(should_exit("QUIT"));
        assert!(!should_exit("exit now"));
        assert!(!should_exit("/exit"));
    }
}
