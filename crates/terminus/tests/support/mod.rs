#![allow(dead_code)]

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use agent_provider::{
    is_cancelled, CancelSignal, ProviderProfile, ResponsePart, RunError, RunMessage, RunProvider,
    RunRequest, ToolCallRequest, ToolOutcome,
};
use agent_provider_mock::{MockProvider, MockStep};
use serde_json::json;
use tempfile::TempDir;
use terminus::tools::{ToolEnv, ToolRegistry};
use terminus::{
    Command, CommandAllowList, InputLine, Repl, RequestController, RequestOutcome, Runtime,
    Session, WorkingDirectory,
};
use terminus_ui::{Console, ConsoleOptions, Terminal};

pub const ALLOWED_COMMANDS: [&str; 3] = ["ls", "echo", "cat"];

#[derive(Clone, Default)]
pub struct Capture(Arc<Mutex<String>>);

impl Capture {
    pub fn text(&self) -> String {
        self.0.lock().expect("capture lock").clone()
    }
}

impl Terminal for Capture {
    fn write(&mut self, data: &str) {
        self.0.lock().expect("capture lock").push_str(data);
    }

    fn columns(&self) -> u16 {
        400
    }
}

/// Everything a request needs, wired over a scratch workspace.
pub struct Harness {
    pub workspace: TempDir,
    pub logs: TempDir,
    pub capture: Capture,
    pub console: Console,
    pub session: Session,
    pub runtime: Runtime,
    pub controller: RequestController,
}

impl Harness {
    pub fn scripted(script: Vec<MockStep>) -> Self {
        Self::with_provider(Arc::new(MockProvider::new(script).with_model_id("mock-test")))
    }

    pub fn with_provider(provider: Arc<dyn RunProvider>) -> Self {
        let workspace = tempfile::tempdir().expect("workspace");
        let logs = tempfile::tempdir().expect("log dir");
        let capture = Capture::default();
        let console = Console::new(
            capture.clone(),
            ConsoleOptions {
                max_width: 400,
                ..ConsoleOptions::default()
            },
        );

        let working_directory = WorkingDirectory::detached(workspace.path());
        let allowed_commands = CommandAllowList::new(ALLOWED_COMMANDS);
        let session = Session::new(working_directory.clone(), provider.profile().model_id)
            .with_allowed_commands(allowed_commands.clone());
        let tools = ToolRegistry::builtin(
            ToolEnv::new(working_directory, allowed_commands)
                .with_command_timeout(Duration::from_secs(5)),
        );
        let controller = RequestController::new(provider, tools, "test instructions")
            .with_error_log_dir(logs.path());

        Self {
            workspace,
            logs,
            capture,
            console,
            session,
            runtime: Runtime::new(),
            controller,
        }
    }

    /// Queues lines as if typed ahead of time.
    pub fn type_lines(&self, lines: &[&str]) {
        let handle = self.runtime.handle();
        for line in lines {
            handle.dispatch(Command::Input(InputLine::Line((*line).to_string())));
        }
    }

    pub fn close_input(&self) {
        self.runtime
            .handle()
            .dispatch(Command::Input(InputLine::Eof));
    }

    pub fn interrupt(&self) {
        self.runtime.handle().dispatch(Command::Interrupt);
    }

    pub fn request(&mut self, prompt: &str) -> RequestOutcome {
        self.controller.handle_user_request(
            prompt,
            &mut self.session,
            &mut self.runtime,
            &self.console,
        )
    }

    pub fn output(&self) -> String {
        self.capture.text()
    }

    pub fn log_files(&self) -> Vec<std::path::PathBuf> {
        std::fs::read_dir(self.logs.path())
            .expect("read log dir")
            .filter_map(Result::ok)
            .map(|entry| entry.path())
            .collect()
    }

    /// Hands the wiring to a REPL; the scratch directories stay with the caller.
    pub fn into_repl(self) -> (Repl, Capture, TempDir, TempDir) {
        let repl = Repl::new(self.session, self.runtime, self.console, self.controller)
            .with_error_log_dir(self.logs.path());
        (repl, self.capture, self.workspace, self.logs)
    }
}

pub fn write_file_call(path: &str, content: &str) -> MockStep {
    MockStep::Act {
        thought: None,
        calls: vec![agent_provider_mock::MockToolCall::new(
            "write_file",
            json!({ "filepath": path, "content": content }),
        )],
    }
}

/// How a [`RecordingProvider`] plays one run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Turn {
    /// Requests a tool call, then waits for cancellation without answering it.
    Dangle,
    /// Replies "done".
    Reply,
}

/// Provider that plays one [`Turn`] per run and records every request it saw.
pub struct RecordingProvider {
    turns: Mutex<VecDeque<Turn>>,
    requests: Arc<Mutex<Vec<RunRequest>>>,
}

impl RecordingProvider {
    pub fn new(turns: &[Turn]) -> (Arc<Self>, Arc<Mutex<Vec<RunRequest>>>) {
        let requests = Arc::new(Mutex::new(Vec::new()));
        let provider = Arc::new(Self {
            turns: Mutex::new(turns.iter().copied().collect()),
            requests: Arc::clone(&requests),
        });
        (provider, requests)
    }
}

impl RunProvider for RecordingProvider {
    fn profile(&self) -> ProviderProfile {
        ProviderProfile {
            provider_id: "recording".to_string(),
            model_id: "recording".to_string(),
        }
    }

    fn run(
        &self,
        req: RunRequest,
        cancel: CancelSignal,
        _execute_tool: &mut dyn FnMut(ToolCallRequest) -> ToolOutcome,
        emit: &mut dyn FnMut(RunMessage),
    ) -> Result<String, RunError> {
        self.requests.lock().expect("requests lock").push(req.clone());
        let turn = self
            .turns
            .lock()
            .expect("turns lock")
            .pop_front()
            .unwrap_or(Turn::Reply);

        emit(RunMessage::user_prompt(req.prompt.clone()));
        match turn {
            Turn::Dangle => {
                emit(RunMessage::Response {
                    parts: vec![ResponsePart::ToolCall {
                        call_id: format!("call-{}-1", req.run_id),
                        tool_name: "read_file".to_string(),
                        arguments: json!({ "filepath": "notes.txt" }),
                    }],
                });
                let deadline = Instant::now() + Duration::from_secs(10);
                while !is_cancelled(&cancel) {
                    if Instant::now() >= deadline {
                        return Err(RunError::Internal("never cancelled".to_string()));
                    }
                    std::thread::sleep(Duration::from_millis(5));
                }
                Err(RunError::Cancelled("Request cancelled".to_string()))
            }
            Turn::Reply => {
                emit(RunMessage::Response {
                    parts: vec![ResponsePart::Text {
                        text: "done".to_string(),
                    }],
                });
                Ok("done".to_string())
            }
        }
    }
}
