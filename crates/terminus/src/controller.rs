//! Request lifecycle controller.
//!
//! Runs one request at a time: `Idle -> Dispatching -> Running -> {Completed,
//! Cancelled, Failed} -> Idle`. The engine runs on a worker thread; everything it
//! produces comes back through the scheduler inbox and is applied here, on the
//! thread that owns the [`Session`].

use std::env;
use std::io;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{mpsc, Arc};
use std::thread::{self, JoinHandle};
use std::time::Duration;

use agent_provider::{
    is_cancelled, CancelSignal, RequestPart, ResponsePart, RunError, RunId, RunMessage,
    RunProvider, RunRequest, ToolCallRequest,
};
use terminus_ui::Console;
use tracing::{debug, warn};

use crate::confirm::{confirm, ConfirmRequest};
use crate::error::ErrorContext;
use crate::history::{patch_history_on_error, repair_dangling_tool_calls, INTERRUPTED_TOOL_RESULT};
use crate::runtime::{Command, InputLine, Runtime, RuntimeHandle};
use crate::session::Session;
use crate::tools::{ToolDeps, ToolRegistry};

pub const THINKING_MESSAGES: &[&str] = &[
    "Compiling situational logic...",
    "Cross-referencing session memory...",
    "Interpolating command structure...",
    "Distilling semantic core...",
    "Assembling deterministic route...",
    "Indexing execution context...",
    "Resolving latent conditions...",
    "Reducing ambiguity space...",
    "Synthesizing intent vectors...",
    "Mapping command topology...",
    "Modeling procedural outcome...",
    "Validating scope constraints...",
    "Reconstructing directive chain...",
    "Identifying operative primitives...",
    "Initiating zero-state resolve...",
    "Projecting response envelope...",
    "Caching transient states...",
    "Detecting input variance...",
    "Stabilizing interface flux...",
];

pub const THINKING_ROTATION: Duration = Duration::from_secs(5);

pub const RETRY_FALLBACK: &str = "Trying a different approach";

pub const INTERRUPTED_NOTICE: &str = "Request interrupted";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RequestState {
    Idle,
    Dispatching,
    Running,
    Completed,
    Cancelled,
    Failed,
}

#[derive(Debug, Clone, PartialEq)]
pub enum RequestOutcome {
    Completed(String),
    /// `interrupted` is false when a confirmation denial stopped the request.
    Cancelled {
        interrupted: bool,
    },
    Failed {
        error: RunError,
        log_path: Option<PathBuf>,
    },
}

/// Handle to the in-flight request.
pub struct TaskHandle {
    run_id: RunId,
    cancel: CancelSignal,
    finished: Arc<AtomicBool>,
    join: Option<JoinHandle<()>>,
}

impl TaskHandle {
    #[must_use]
    pub fn is_finished(&self) -> bool {
        self.finished.load(Ordering::SeqCst)
    }

    #[must_use]
    pub fn is_cancel_requested(&self) -> bool {
        is_cancelled(&self.cancel)
    }

    /// Requests cooperative cancellation.
    ///
    /// Returns false (and does nothing) when the task already finished or a
    /// cancellation was already requested.
    pub fn cancel(&self) -> bool {
        if self.is_finished() {
            return false;
        }
        !self.cancel.swap(true, Ordering::SeqCst)
    }

    fn join(mut self) {
        if let Some(join) = self.join.take() {
            if join.join().is_err() {
                warn!(run_id = self.run_id, "request worker panicked");
            }
        }
    }
}

/// Worker-side tool dependencies: every call becomes a scheduler command.
struct WorkerDeps {
    run_id: RunId,
    handle: RuntimeHandle,
    cancel: CancelSignal,
}

impl ToolDeps for WorkerDeps {
    fn confirm_action(&mut self, request: ConfirmRequest) -> bool {
        if is_cancelled(&self.cancel) {
            return false;
        }
        let (reply, answer) = mpsc::channel();
        let posted = self.handle.dispatch(Command::Confirm {
            run_id: self.run_id,
            request,
            reply,
        });
        posted && answer.recv().unwrap_or(false)
    }

    fn display_tool_status(&mut self, title: &str, details: &[String]) {
        self.handle.dispatch(Command::ToolStatus {
            run_id: self.run_id,
            title: title.to_string(),
            details: details.to_vec(),
        });
    }
}

pub struct RequestController {
    provider: Arc<dyn RunProvider>,
    tools: Arc<ToolRegistry>,
    instructions: String,
    error_log_dir: PathBuf,
    next_run_id: RunId,
    state: RequestState,
}

impl RequestController {
    pub fn new(
        provider: Arc<dyn RunProvider>,
        tools: ToolRegistry,
        instructions: impl Into<String>,
    ) -> Self {
        Self {
            provider,
            tools: Arc::new(tools),
            instructions: instructions.into(),
            error_log_dir: env::temp_dir(),
            next_run_id: 1,
            state: RequestState::Idle,
        }
    }

    /// Directory that receives diagnostic logs for failed requests.
    #[must_use]
    pub fn with_error_log_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.error_log_dir = dir.into();
        self
    }

    #[must_use]
    pub fn state(&self) -> RequestState {
        self.state
    }

    #[must_use]
    pub fn tools(&self) -> &ToolRegistry {
        &self.tools
    }

    fn set_state(&mut self, state: RequestState) {
        debug!(from = ?self.state, to = ?state, "request state");
        self.state = state;
    }

    /// Runs `input` as a request and blocks the scheduler until it resolves.
    pub fn handle_user_request(
        &mut self,
        input: &str,
        session: &mut Session,
        runtime: &mut Runtime,
        console: &Console,
    ) -> RequestOutcome {
        debug_assert!(!session.is_busy(), "a request is already in flight");
        self.set_state(RequestState::Dispatching);
        session.clear_sigint();

        let repaired = repair_dangling_tool_calls(&mut session.messages, INTERRUPTED_TOOL_RESULT);
        if repaired > 0 {
            debug!(repaired, "answered tool calls left by a cancelled request");
        }

        let run_id = self.next_run_id;
        self.next_run_id += 1;
        console.start_spinner_rotating(thinking_messages(run_id), THINKING_ROTATION);

        let request = RunRequest {
            run_id,
            history: session.history_snapshot(),
            prompt: input.to_string(),
            instructions: self.instructions.clone(),
            tools: self.tools.definitions(),
        };
        match self.spawn_worker(request, runtime.handle()) {
            Ok(task) => session.set_current_task(task),
            Err(error) => {
                let error = RunError::Internal(format!("Failed to start request: {error}"));
                return self.resolve(Err(error), false, session, console);
            }
        }

        self.set_state(RequestState::Running);
        let (outcome, interrupted) = self.await_task(run_id, session, runtime, console);
        self.resolve(outcome, interrupted, session, console)
    }

    fn spawn_worker(&self, request: RunRequest, handle: RuntimeHandle) -> io::Result<TaskHandle> {
        let run_id = request.run_id;
        let cancel: CancelSignal = Arc::new(AtomicBool::new(false));
        let finished = Arc::new(AtomicBool::new(false));

        let provider = Arc::clone(&self.provider);
        let tools = Arc::clone(&self.tools);
        let worker_cancel = Arc::clone(&cancel);
        let worker_finished = Arc::clone(&finished);

        let join = thread::Builder::new()
            .name(format!("terminus-run-{run_id}"))
            .spawn(move || {
                let mut deps = WorkerDeps {
                    run_id,
                    handle: handle.clone(),
                    cancel: Arc::clone(&worker_cancel),
                };
                let node_handle = handle.clone();

                let outcome = catch_unwind(AssertUnwindSafe(|| {
                    provider.run(
                        request,
                        Arc::clone(&worker_cancel),
                        &mut |call: ToolCallRequest| tools.execute(call, &mut deps),
                        &mut |message: RunMessage| {
                            node_handle.dispatch(Command::Node { run_id, message });
                        },
                    )
                }))
                .unwrap_or_else(|_| Err(RunError::Internal("Request worker panicked".to_string())));

                worker_finished.store(true, Ordering::SeqCst);
                handle.dispatch(Command::RunFinished { run_id, outcome });
            })?;

        debug!(run_id, "request dispatched");
        Ok(TaskHandle {
            run_id,
            cancel,
            finished,
            join: Some(join),
        })
    }

    /// Drains the inbox until the worker reports back. Returns the engine outcome
    /// and whether an interrupt cancelled the task.
    fn await_task(
        &mut self,
        run_id: RunId,
        session: &mut Session,
        runtime: &mut Runtime,
        console: &Console,
    ) -> (Result<String, RunError>, bool) {
        let mut interrupted = false;

        loop {
            match runtime.next_command() {
                Command::RunFinished { run_id: id, outcome } if id == run_id => {
                    return (outcome, interrupted);
                }
                Command::Node { run_id: id, message } if id == run_id => {
                    process_node(message, session, console);
                }
                Command::ToolStatus {
                    run_id: id,
                    title,
                    details,
                } if id == run_id => show_tool_status(console, &title, &details),
                Command::Confirm {
                    run_id: id,
                    request,
                    reply,
                } if id == run_id => {
                    let cancelling = session
                        .current_task()
                        .map_or(true, TaskHandle::is_cancel_requested);
                    let approved = !cancelling
                        && confirm(session, console, &request, &mut || {
                            runtime.read_line_deferring()
                        });
                    if reply.send(approved).is_err() {
                        debug!(run_id, "worker stopped waiting for confirmation");
                    }
                }
                Command::Interrupt => {
                    if let Some(task) = session.current_task() {
                        if task.cancel() {
                            debug!(run_id, "cancellation requested");
                            interrupted = true;
                        }
                    }
                }
                Command::Input(InputLine::Line(line)) => runtime.push_typeahead(line),
                Command::Input(InputLine::Eof) => runtime.close_input(),
                Command::Confirm { run_id: id, reply, .. } => {
                    debug!(run_id = id, "denying confirmation from a finished run");
                    let _ = reply.send(false);
                }
                stale => debug!(?stale, "ignoring command from a finished run"),
            }
        }
    }

    fn resolve(
        &mut self,
        outcome: Result<String, RunError>,
        interrupted: bool,
        session: &mut Session,
        console: &Console,
    ) -> RequestOutcome {
        if let Some(task) = session.take_current_task() {
            task.join();
        }

        let resolved = match outcome {
            Ok(output) => {
                self.set_state(RequestState::Completed);
                console.stop_spinner();
                if !output.trim().is_empty() {
                    console.agent(&output);
                }
                RequestOutcome::Completed(output)
            }
            Err(error) if error.is_cancellation() && interrupted => {
                self.set_state(RequestState::Cancelled);
                console.stop_spinner();
                console.warning(INTERRUPTED_NOTICE);
                RequestOutcome::Cancelled { interrupted: true }
            }
            Err(error) if error.is_cancellation() => {
                self.set_state(RequestState::Cancelled);
                ErrorContext::new("request", console, &self.error_log_dir).handle(&error);
                RequestOutcome::Cancelled { interrupted: false }
            }
            Err(error) => {
                self.set_state(RequestState::Failed);
                let mut context = ErrorContext::new("request", console, &self.error_log_dir);
                let messages = &mut session.messages;
                context.add_cleanup(move |error| {
                    let message = error.to_string();
                    patch_history_on_error(messages, &message);
                    repair_dangling_tool_calls(messages, &message);
                });
                let log_path = context.handle(&error);
                RequestOutcome::Failed { error, log_path }
            }
        };

        self.set_state(RequestState::Idle);
        resolved
    }
}

fn thinking_messages(run_id: RunId) -> Vec<String> {
    let offset = usize::try_from(run_id).unwrap_or_default() % THINKING_MESSAGES.len();
    THINKING_MESSAGES
        .iter()
        .cycle()
        .skip(offset)
        .take(THINKING_MESSAGES.len())
        .map(|message| (*message).to_string())
        .collect()
}

fn with_spinner_paused(console: &Console, write: impl FnOnce()) {
    let resume = console.pause_spinner();
    write();
    if resume {
        console.resume_spinner();
    }
}

fn show_tool_status(console: &Console, title: &str, details: &[String]) {
    with_spinner_paused(console, || {
        console.info(&format!("{title}({})", details.join(", ")));
    });
}

/// Shows what a node carries, then appends it to history.
fn process_node(message: RunMessage, session: &mut Session, console: &Console) {
    match &message {
        RunMessage::Response { parts } => {
            for part in parts {
                match part {
                    ResponsePart::ToolCall {
                        call_id, tool_name, ..
                    } => debug!(%call_id, %tool_name, "tool call requested"),
                    // Text next to other parts is the model thinking out loud.
                    ResponsePart::Text { text } if parts.len() > 1 && !text.trim().is_empty() => {
                        with_spinner_paused(console, || console.thinking(text));
                    }
                    ResponsePart::Text { .. } => {}
                }
            }
        }
        RunMessage::Request { parts } => {
            for part in parts {
                if let RequestPart::RetryNotice { content, .. } = part {
                    let reason = content
                        .as_deref()
                        .filter(|reason| !reason.trim().is_empty())
                        .unwrap_or(RETRY_FALLBACK);
                    with_spinner_paused(console, || console.muted(reason));
                }
            }
        }
    }
    session.messages.push(message);
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::sync::Arc;

    use pretty_assertions::assert_eq;

    use super::{thinking_messages, TaskHandle, THINKING_MESSAGES};

    fn handle(finished: bool) -> TaskHandle {
        TaskHandle {
            run_id: 1,
            cancel: Arc::new(AtomicBool::new(false)),
            finished: Arc::new(AtomicBool::new(finished)),
            join: None,
        }
    }

    #[test]
    fn cancelling_a_finished_task_is_a_noop() {
        let task = handle(true);
        assert!(!task.cancel());
        assert!(!task.is_cancel_requested());
    }

    #[test]
    fn cancel_is_requested_once() {
        let task = handle(false);
        assert!(task.cancel());
        assert!(!task.cancel());
        assert!(task.is_cancel_requested());

        task.finished.store(true, Ordering::SeqCst);
        assert!(!task.cancel());
    }

    #[test]
    fn thinking_rotation_starts_per_run() {
        let first = thinking_messages(1);
        assert_eq!(first.len(), THINKING_MESSAGES.len());
        assert_eq!(first[0], THINKING_MESSAGES[1]);
        assert_eq!(first[first.len() - 1], THINKING_MESSAGES[0]);
        assert_eq!(thinking_messages(19)[0], THINKING_MESSAGES[0]);
    }
}
