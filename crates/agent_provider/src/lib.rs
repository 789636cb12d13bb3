//! Provider-agnostic contract between the shell and the request-processing engine.
//!
//! This crate defines the conversation history shape, the run request handed to an
//! engine, the host-mediated tool boundary, and the error taxonomy a run can end
//! with. It excludes transport details, rendering, and session bookkeeping.

use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

/// Identifier for one provider run.
pub type RunId = u64;

/// Shared cancellation flag for a run.
pub type CancelSignal = Arc<AtomicBool>;

/// Returns true when cancellation has been requested for the run.
#[must_use]
pub fn is_cancelled(cancel: &CancelSignal) -> bool {
    cancel.load(Ordering::SeqCst)
}

/// Error returned while constructing/configuring a provider before any run starts.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProviderInitError {
    message: String,
}

impl ProviderInitError {
    /// Creates a new provider initialization error.
    #[must_use]
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }

    /// Returns the underlying error message.
    #[must_use]
    pub fn message(&self) -> &str {
        &self.message
    }
}

impl fmt::Display for ProviderInitError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.message)
    }
}

impl std::error::Error for ProviderInitError {}

impl From<String> for ProviderInitError {
    fn from(message: String) -> Self {
        Self::new(message)
    }
}

impl From<&str> for ProviderInitError {
    fn from(message: &str) -> Self {
        Self::new(message)
    }
}

/// Part of a request entry: what the host sends to the model.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "part_kind", rename_all = "kebab-case")]
pub enum RequestPart {
    UserPrompt {
        text: String,
    },
    ToolResult {
        call_id: String,
        tool_name: String,
        content: String,
    },
    /// Engine-level notice that a tool call is being re-attempted.
    RetryNotice {
        content: Option<String>,
        call_id: Option<String>,
        tool_name: Option<String>,
    },
}

/// Part of a response entry: what the model produced.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "part_kind", rename_all = "kebab-case")]
pub enum ResponsePart {
    Text {
        text: String,
    },
    ToolCall {
        call_id: String,
        tool_name: String,
        arguments: Value,
    },
}

/// One conversation history entry.
///
/// Engines stream these to the host as they are produced; each emitted node is
/// exactly one entry and the host appends them in emission order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "kebab-case")]
pub enum RunMessage {
    Request { parts: Vec<RequestPart> },
    Response { parts: Vec<ResponsePart> },
}

impl RunMessage {
    /// Convenience constructor for a single user prompt entry.
    #[must_use]
    pub fn user_prompt(text: impl Into<String>) -> Self {
        Self::Request {
            parts: vec![RequestPart::UserPrompt { text: text.into() }],
        }
    }

    /// Convenience constructor for a single tool result entry.
    #[must_use]
    pub fn tool_result(
        call_id: impl Into<String>,
        tool_name: impl Into<String>,
        content: impl Into<String>,
    ) -> Self {
        Self::Request {
            parts: vec![RequestPart::ToolResult {
                call_id: call_id.into(),
                tool_name: tool_name.into(),
                content: content.into(),
            }],
        }
    }

    /// Number of parts carried by this entry.
    #[must_use]
    pub fn part_count(&self) -> usize {
        match self {
            Self::Request { parts } => parts.len(),
            Self::Response { parts } => parts.len(),
        }
    }
}

/// Input required to start a provider run.
#[derive(Debug, Clone, PartialEq)]
pub struct RunRequest {
    pub run_id: RunId,
    pub history: Vec<RunMessage>,
    pub prompt: String,
    pub instructions: String,
    pub tools: Vec<ToolDefinition>,
}

/// Generic host-mediated tool definition exposed to a provider.
#[derive(Debug, Clone, PartialEq)]
pub struct ToolDefinition {
    pub name: String,
    pub description: Option<String>,
    pub input_schema: Value,
}

/// Provider request envelope for one host tool call.
#[derive(Debug, Clone, PartialEq)]
pub struct ToolCallRequest {
    pub call_id: String,
    pub tool_name: String,
    pub arguments: Value,
}

/// Typed condition raised by a tool instead of a textual result.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ToolError {
    /// Recoverable; the engine reports it back to the model and re-asks.
    #[error("{0}")]
    Retry(String),
    /// The user declined the side effect; the run must stop as cancelled.
    #[error("{0}")]
    Cancelled(String),
    /// Anything else; the run fails.
    #[error("{0}")]
    Failed(String),
}

/// Outcome a host returns for a tool call.
pub type ToolOutcome = Result<String, ToolError>;

/// Terminal error of a run.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum RunError {
    #[error("{0}")]
    Cancelled(String),
    #[error("{message}")]
    Tool { tool_name: String, message: String },
    #[error("Tool '{tool_name}' exceeded max retries count of {max_retries}")]
    RetriesExhausted { tool_name: String, max_retries: u32 },
    #[error("status_code: {status}, model_name: {model}, body: {message}")]
    Provider {
        model: String,
        status: u16,
        message: String,
        body: Option<Value>,
    },
    #[error("{0}")]
    MalformedResponse(String),
    #[error("{0}")]
    Internal(String),
}

impl RunError {
    /// Short name of the error kind, used in diagnostics.
    #[must_use]
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Cancelled(_) => "Cancelled",
            Self::Tool { .. } => "ToolError",
            Self::RetriesExhausted { .. } => "RetriesExhausted",
            Self::Provider { .. } => "ProviderError",
            Self::MalformedResponse(_) => "MalformedResponse",
            Self::Internal(_) => "InternalError",
        }
    }

    /// Returns true when this error represents a cancellation rather than a failure.
    #[must_use]
    pub fn is_cancellation(&self) -> bool {
        matches!(self, Self::Cancelled(_))
    }
}

/// Immutable metadata describing a run provider.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProviderProfile {
    pub provider_id: String,
    pub model_id: String,
}

/// Provider interface for executing one run request.
pub trait RunProvider: Send + Sync + 'static {
    /// Returns provider/model identity metadata.
    fn profile(&self) -> ProviderProfile;

    /// Executes a run request, emitting each history entry in order.
    ///
    /// Providers synchronously request host tool execution through `execute_tool`.
    /// The returned sequence of emitted entries is finite and cannot be restarted.
    /// Providers check `cancel` between steps and return [`RunError::Cancelled`]
    /// once it is set.
    fn run(
        &self,
        req: RunRequest,
        cancel: CancelSignal,
        execute_tool: &mut dyn FnMut(ToolCallRequest) -> ToolOutcome,
        emit: &mut dyn FnMut(RunMessage),
    ) -> Result<String, RunError>;
}
