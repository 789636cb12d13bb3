//! Deterministic mock implementation of the shared `agent_provider` contract.
//!
//! The mock follows a fixed script of steps instead of calling a model. It still
//! behaves like a real engine at the boundary: it streams history entries, asks the
//! host to execute tool calls, turns retry conditions into retry notices, and
//! honours cooperative cancellation between steps.

use std::collections::BTreeMap;
use std::thread;
use std::time::{Duration, Instant};

use agent_provider::{
    is_cancelled, CancelSignal, ProviderProfile, RequestPart, ResponsePart, RunError, RunMessage,
    RunProvider, RunRequest, ToolCallRequest, ToolError, ToolOutcome,
};
use serde_json::{json, Value};
use tracing::debug;

/// Stable provider identifier used for explicit startup selection.
pub const MOCK_PROVIDER_ID: &str = "mock";

/// Placeholder replaced by the run prompt inside [`MockStep::Reply`] text.
pub const PROMPT_PLACEHOLDER: &str = "{prompt}";

const CANCEL_POLL: Duration = Duration::from_millis(10);

/// A tool call the scripted model will request.
#[derive(Debug, Clone, PartialEq)]
pub struct MockToolCall {
    pub tool_name: String,
    pub arguments: Value,
}

impl MockToolCall {
    #[must_use]
    pub fn new(tool_name: impl Into<String>, arguments: Value) -> Self {
        Self {
            tool_name: tool_name.into(),
            arguments,
        }
    }
}

/// One scripted model turn.
#[derive(Debug, Clone, PartialEq)]
pub enum MockStep {
    /// Final answer; ends the run successfully.
    Reply(String),
    /// A response carrying optional free text plus tool calls, followed by the
    /// request entry with their results.
    Act {
        thought: Option<String>,
        calls: Vec<MockToolCall>,
    },
    /// Ends the run with the given error.
    Fail(RunError),
    /// Waits while still observing cancellation.
    Pause(Duration),
}

/// Deterministic mock provider used by `terminus` tests and local runs.
#[derive(Debug, Clone)]
pub struct MockProvider {
    model_id: String,
    script: Vec<MockStep>,
    max_retries: u32,
    step_delay: Duration,
}

impl MockProvider {
    /// Creates a mock provider that plays `script` on every run.
    #[must_use]
    pub fn new(script: Vec<MockStep>) -> Self {
        Self {
            model_id: "mock".to_string(),
            script,
            max_retries: 1,
            step_delay: Duration::ZERO,
        }
    }

    #[must_use]
    pub fn with_model_id(mut self, model_id: impl Into<String>) -> Self {
        let model_id = model_id.into();
        let trimmed = model_id.trim();
        if !trimmed.is_empty() {
            self.model_id = trimmed.to_string();
        }
        self
    }

    /// Maximum retry notices tolerated per tool before the run fails.
    #[must_use]
    pub fn with_max_retries(mut self, max_retries: u32) -> Self {
        self.max_retries = max_retries;
        self
    }

    /// Simulated latency before every step.
    #[must_use]
    pub fn with_step_delay(mut self, step_delay: Duration) -> Self {
        self.step_delay = step_delay;
        self
    }

    fn pause(cancel: &CancelSignal, duration: Duration) -> Result<(), RunError> {
        let deadline = Instant::now() + duration;
        loop {
            ensure_not_cancelled(cancel)?;
            let now = Instant::now();
            if now >= deadline {
                return Ok(());
            }
            thread::sleep(CANCEL_POLL.min(deadline - now));
        }
    }
}

impl Default for MockProvider {
    fn default() -> Self {
        Self::new(vec![
            MockStep::Act {
                thought: Some("Let me look around the working directory first.".to_string()),
                calls: vec![
                    MockToolCall::new("get_current_directory", json!({})),
                    MockToolCall::new("list_directory", json!({ "path": "." })),
                ],
            },
            MockStep::Reply(format!(
                "I looked at the working directory. The mock engine cannot act on \"{PROMPT_PLACEHOLDER}\" any further; configure a real provider to go beyond this."
            )),
        ])
        .with_step_delay(Duration::from_millis(400))
    }
}

impl RunProvider for MockProvider {
    fn profile(&self) -> ProviderProfile {
        ProviderProfile {
            provider_id: MOCK_PROVIDER_ID.to_string(),
            model_id: self.model_id.clone(),
        }
    }

    fn run(
        &self,
        req: RunRequest,
        cancel: CancelSignal,
        execute_tool: &mut dyn FnMut(ToolCallRequest) -> ToolOutcome,
        emit: &mut dyn FnMut(RunMessage),
    ) -> Result<String, RunError> {
        let run_id = req.run_id;
        debug!(
            run_id,
            history = req.history.len(),
            tools = req.tools.len(),
            "mock run started"
        );

        ensure_not_cancelled(&cancel)?;
        emit(RunMessage::user_prompt(req.prompt.clone()));

        let mut retries: BTreeMap<String, u32> = BTreeMap::new();
        let mut call_seq = 0usize;

        for step in &self.script {
            Self::pause(&cancel, self.step_delay)?;

            match step {
                MockStep::Reply(text) => {
                    let text = text.replace(PROMPT_PLACEHOLDER, &req.prompt);
                    emit(RunMessage::Response {
                        parts: vec![ResponsePart::Text { text: text.clone() }],
                    });
                    debug!(run_id, "mock run finished");
                    return Ok(text);
                }
                MockStep::Act { thought, calls } => {
                    let calls: Vec<ToolCallRequest> = calls
                        .iter()
                        .map(|call| {
                            call_seq += 1;
                            ToolCallRequest {
                                call_id: format!("call-{run_id}-{call_seq}"),
                                tool_name: call.tool_name.clone(),
                                arguments: call.arguments.clone(),
                            }
                        })
                        .collect();

                    let mut parts = Vec::with_capacity(calls.len() + 1);
                    if let Some(thought) = thought {
                        parts.push(ResponsePart::Text {
                            text: thought.clone(),
                        });
                    }
                    parts.extend(calls.iter().map(|call| ResponsePart::ToolCall {
                        call_id: call.call_id.clone(),
                        tool_name: call.tool_name.clone(),
                        arguments: call.arguments.clone(),
                    }));
                    emit(RunMessage::Response { parts });

                    let mut results = Vec::with_capacity(calls.len());
                    let mut failure = None;
                    for call in calls {
                        if let Err(error) = ensure_not_cancelled(&cancel) {
                            failure = Some(error);
                            break;
                        }
                        let call_id = call.call_id.clone();
                        let tool_name = call.tool_name.clone();

                        match execute_tool(call) {
                            Ok(content) => results.push(RequestPart::ToolResult {
                                call_id,
                                tool_name,
                                content,
                            }),
                            Err(ToolError::Retry(message)) => {
                                let count = retries.entry(tool_name.clone()).or_insert(0);
                                *count += 1;
                                if *count > self.max_retries {
                                    failure = Some(RunError::RetriesExhausted {
                                        tool_name,
                                        max_retries: self.max_retries,
                                    });
                                    break;
                                }
                                debug!(run_id, tool = %tool_name, "tool asked for a retry");
                                results.push(RequestPart::RetryNotice {
                                    content: Some(message),
                                    call_id: Some(call_id),
                                    tool_name: Some(tool_name),
                                });
                            }
                            Err(ToolError::Cancelled(message)) => {
                                failure = Some(RunError::Cancelled(message));
                                break;
                            }
                            Err(ToolError::Failed(message)) => {
                                failure = Some(RunError::Tool { tool_name, message });
                                break;
                            }
                        }
                    }

                    // Calls that already ran keep their results even when a later
                    // call in the batch ends the run.
                    if !results.is_empty() {
                        emit(RunMessage::Request { parts: results });
                    }
                    if let Some(error) = failure {
                        return Err(error);
                    }
                }
                MockStep::Fail(error) => return Err(error.clone()),
                MockStep::Pause(duration) => Self::pause(&cancel, *duration)?,
            }
        }

        Err(RunError::MalformedResponse(
            "Mock script ended without a final reply".to_string(),
        ))
    }
}

fn ensure_not_cancelled(cancel: &CancelSignal) -> Result<(), RunError> {
    if is_cancelled(cancel) {
        Err(RunError::Cancelled("Request cancelled".to_string()))
    } else {
        Ok(())
    }
}
