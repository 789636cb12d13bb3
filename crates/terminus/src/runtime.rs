//! Scheduler inbox.
//!
//! The main thread owns [`Runtime`] and is the only consumer. Everything else
//! (stdin pump, signal bridge, request worker) talks to it through a cloned
//! [`RuntimeHandle`].

use std::collections::VecDeque;
use std::io::{self, BufRead};
use std::sync::mpsc::{self, Receiver, RecvTimeoutError, Sender};
use std::thread::{self, JoinHandle};
use std::time::Duration;

use agent_provider::{RunError, RunId, RunMessage};
use tracing::warn;

use crate::confirm::ConfirmRequest;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InputLine {
    Line(String),
    Eof,
}

#[derive(Debug)]
pub enum Command {
    Input(InputLine),
    Interrupt,
    Node {
        run_id: RunId,
        message: RunMessage,
    },
    ToolStatus {
        run_id: RunId,
        title: String,
        details: Vec<String>,
    },
    /// The worker blocks on `reply` until the scheduler has asked the user.
    Confirm {
        run_id: RunId,
        request: ConfirmRequest,
        reply: Sender<bool>,
    },
    RunFinished {
        run_id: RunId,
        outcome: Result<String, RunError>,
    },
}

#[derive(Debug, Clone)]
pub struct RuntimeHandle {
    tx: Sender<Command>,
}

impl RuntimeHandle {
    /// Posts a command to the scheduler. Returns false once the scheduler is gone.
    pub fn dispatch(&self, command: Command) -> bool {
        self.tx.send(command).is_ok()
    }
}

pub struct Runtime {
    rx: Receiver<Command>,
    handle: RuntimeHandle,
    deferred: VecDeque<Command>,
    typeahead: VecDeque<String>,
    input_closed: bool,
}

impl Default for Runtime {
    fn default() -> Self {
        Self::new()
    }
}

impl Runtime {
    pub fn new() -> Self {
        let (tx, rx) = mpsc::channel();
        Self {
            rx,
            handle: RuntimeHandle { tx },
            deferred: VecDeque::new(),
            typeahead: VecDeque::new(),
            input_closed: false,
        }
    }

    #[must_use]
    pub fn handle(&self) -> RuntimeHandle {
        self.handle.clone()
    }

    /// Blocks for the next command; deferred commands come first.
    pub fn next_command(&mut self) -> Command {
        if let Some(command) = self.deferred.pop_front() {
            return command;
        }
        // The runtime keeps a sender alive, so the channel cannot disconnect.
        self.rx.recv().unwrap_or(Command::Input(InputLine::Eof))
    }

    pub fn next_command_timeout(&mut self, timeout: Duration) -> Option<Command> {
        if let Some(command) = self.deferred.pop_front() {
            return Some(command);
        }
        match self.rx.recv_timeout(timeout) {
            Ok(command) => Some(command),
            Err(RecvTimeoutError::Timeout) => None,
            Err(RecvTimeoutError::Disconnected) => Some(Command::Input(InputLine::Eof)),
        }
    }

    /// Keeps a line typed while the prompt was not showing.
    pub fn push_typeahead(&mut self, line: String) {
        self.typeahead.push_back(line);
    }

    pub fn pop_typeahead(&mut self) -> Option<String> {
        self.typeahead.pop_front()
    }

    pub fn close_input(&mut self) {
        self.input_closed = true;
    }

    #[must_use]
    pub fn input_closed(&self) -> bool {
        self.input_closed
    }

    /// Blocking read of one line while another flow owns the prompt.
    ///
    /// Typeahead is consumed first, in the order it was typed. Anything that is
    /// not input is deferred and replayed afterwards, so an interrupt delivered
    /// here is only observed once the read returns.
    pub fn read_line_deferring(&mut self) -> InputLine {
        if let Some(line) = self.typeahead.pop_front() {
            return InputLine::Line(line);
        }
        if self.input_closed {
            return InputLine::Eof;
        }

        loop {
            let Ok(command) = self.rx.recv() else {
                return InputLine::Eof;
            };
            match command {
                Command::Input(InputLine::Line(line)) => return InputLine::Line(line),
                Command::Input(InputLine::Eof) => {
                    self.input_closed = true;
                    return InputLine::Eof;
                }
                other => self.deferred.push_back(other),
            }
        }
    }
}

/// Forwards lines from `reader` to the scheduler, then a final `Eof`.
pub fn spawn_input_pump<R>(reader: R, handle: RuntimeHandle) -> io::Result<JoinHandle<()>>
where
    R: BufRead + Send + 'static,
{
    thread::Builder::new()
        .name("terminus-input".to_string())
        .spawn(move || {
            for line in reader.lines() {
                match line {
                    Ok(line) => {
                        if !handle.dispatch(Command::Input(InputLine::Line(line))) {
                            return;
                        }
                    }
                    Err(error) => {
                        warn!(%error, "reading input failed");
                        break;
                    }
                }
            }
            handle.dispatch(Command::Input(InputLine::Eof));
        })
}
