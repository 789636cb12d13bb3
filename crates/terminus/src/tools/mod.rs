//! Built-in tools exposed to the engine.
//!
//! Tools run on the request worker. They never touch the session directly: the
//! working directory and command allow-list come through [`ToolEnv`], and user
//! interaction goes through [`ToolDeps`].

pub mod command_line;
mod directory;
mod files;
mod git;
mod search;
mod shell;

use std::time::Duration;

use agent_provider::{ToolCallRequest, ToolDefinition, ToolError, ToolOutcome};
use serde::de::DeserializeOwned;
use serde_json::Value;
use tracing::debug;

use crate::confirm::ConfirmRequest;
use crate::session::{CommandAllowList, WorkingDirectory};

pub use directory::{ChangeDirectory, GetCurrentDirectory, ListDirectory};
pub use files::{ReadFile, UpdateFile, WriteFile};
pub use git::{GitAdd, GitCommit};
pub use search::{Find, Grep, NO_RESULTS};
pub use shell::{RunCommand, RunInDirectory};

pub const DEFAULT_COMMAND_TIMEOUT: Duration = Duration::from_secs(30);

/// Result message used when the user declines a side effect.
pub const DENIED_BY_USER: &str = "Tool execution cancelled by user";

const MAX_OUTPUT_BYTES: usize = 100 * 1024;

/// The two capabilities a tool may ask of the host.
pub trait ToolDeps {
    /// Blocks until the user approves (true) or denies (false) the action.
    fn confirm_action(&mut self, request: ConfirmRequest) -> bool;

    fn display_tool_status(&mut self, title: &str, details: &[String]);
}

/// Session state shared with tools.
#[derive(Debug, Clone)]
pub struct ToolEnv {
    pub working_directory: WorkingDirectory,
    pub allowed_commands: CommandAllowList,
    pub command_timeout: Duration,
}

impl ToolEnv {
    pub fn new(working_directory: WorkingDirectory, allowed_commands: CommandAllowList) -> Self {
        Self {
            working_directory,
            allowed_commands,
            command_timeout: DEFAULT_COMMAND_TIMEOUT,
        }
    }

    #[must_use]
    pub fn with_command_timeout(mut self, timeout: Duration) -> Self {
        self.command_timeout = timeout;
        self
    }
}

pub struct ToolContext<'a> {
    pub env: &'a ToolEnv,
    pub deps: &'a mut dyn ToolDeps,
}

impl ToolContext<'_> {
    /// Asks for confirmation and maps a denial to a cancellation.
    pub fn require_confirmation(&mut self, request: ConfirmRequest) -> Result<(), ToolError> {
        if self.deps.confirm_action(request) {
            Ok(())
        } else {
            Err(ToolError::Cancelled(DENIED_BY_USER.to_string()))
        }
    }

    pub fn status(&mut self, title: &str, details: &[String]) {
        self.deps.display_tool_status(title, details);
    }
}

pub trait Tool: Send + Sync {
    fn name(&self) -> &'static str;

    fn description(&self) -> &'static str;

    fn input_schema(&self) -> Value;

    fn call(&self, arguments: Value, ctx: &mut ToolContext<'_>) -> ToolOutcome;
}

pub struct ToolRegistry {
    tools: Vec<Box<dyn Tool>>,
    env: ToolEnv,
}

impl ToolRegistry {
    pub fn new(env: ToolEnv, tools: Vec<Box<dyn Tool>>) -> Self {
        Self { tools, env }
    }

    pub fn builtin(env: ToolEnv) -> Self {
        Self::new(
            env,
            vec![
                Box::new(ReadFile),
                Box::new(WriteFile),
                Box::new(UpdateFile),
                Box::new(RunCommand),
                Box::new(RunInDirectory),
                Box::new(ListDirectory),
                Box::new(ChangeDirectory),
                Box::new(GetCurrentDirectory),
                Box::new(Find),
                Box::new(Grep),
                Box::new(GitAdd),
                Box::new(GitCommit),
            ],
        )
    }

    #[must_use]
    pub fn env(&self) -> &ToolEnv {
        &self.env
    }

    #[must_use]
    pub fn names(&self) -> Vec<&'static str> {
        self.tools.iter().map(|tool| tool.name()).collect()
    }

    #[must_use]
    pub fn definitions(&self) -> Vec<ToolDefinition> {
        self.tools
            .iter()
            .map(|tool| ToolDefinition {
                name: tool.name().to_string(),
                description: Some(tool.description().to_string()),
                input_schema: tool.input_schema(),
            })
            .collect()
    }

    /// Unknown tools are reported back to the model as a retry.
    pub fn execute(&self, call: ToolCallRequest, deps: &mut dyn ToolDeps) -> ToolOutcome {
        let Some(tool) = self.tools.iter().find(|tool| tool.name() == call.tool_name) else {
            return Err(ToolError::Retry(format!(
                "Unknown tool name: {}. Available tools: {}",
                call.tool_name,
                self.names().join(", ")
            )));
        };

        debug!(tool = tool.name(), call_id = %call.call_id, "executing tool");
        let mut ctx = ToolContext {
            env: &self.env,
            deps,
        };
        tool.call(call.arguments, &mut ctx)
    }
}

/// Deserializes tool arguments; malformed input asks the model to try again.
pub(crate) fn parse_args<T: DeserializeOwned>(tool: &str, arguments: Value) -> Result<T, ToolError> {
    // Models sometimes send `null` for tools without parameters.
    let arguments = if arguments.is_null() {
        Value::Object(serde_json::Map::new())
    } else {
        arguments
    };
    serde_json::from_value(arguments)
        .map_err(|error| ToolError::Retry(format!("Invalid arguments for {tool}: {error}")))
}

pub(crate) fn truncate_to_byte_limit(content: String, max_bytes: usize) -> String {
    if content.len() <= max_bytes {
        return content;
    }

    let mut cutoff = max_bytes;
    while cutoff > 0 && !content.is_char_boundary(cutoff) {
        cutoff -= 1;
    }

    let mut truncated = content[..cutoff].to_string();
    truncated.push_str("\n[truncated]");
    truncated
}

pub(crate) fn limit_output(content: String) -> String {
    truncate_to_byte_limit(content, MAX_OUTPUT_BYTES)
}
