use std::io::{self, Read};
use std::path::Path;
use std::process::{Command, ExitStatus, Stdio};
use std::thread::{self, JoinHandle};
use std::time::Duration;

use agent_provider::{ToolError, ToolOutcome};
use serde::Deserialize;
use serde_json::{json, Value};
use terminus_ui::Preview;
use tracing::{debug, warn};
use wait_timeout::ChildExt;

use super::command_line::{extract_commands, is_command_allowed};
use super::{limit_output, parse_args, Tool, ToolContext};
use crate::confirm::ConfirmRequest;

pub(super) struct ProcessOutput {
    pub stdout: String,
    pub stderr: String,
    /// `None` when the process was killed after the timeout.
    pub status: Option<ExitStatus>,
}

fn run_shell(command: &str, cwd: &Path, timeout: Duration) -> io::Result<ProcessOutput> {
    let mut shell = Command::new("sh");
    shell.arg("-c").arg(command).current_dir(cwd);
    run_process(shell, timeout)
}

/// Runs `command` with captured output, killing it once `timeout` elapses.
pub(super) fn run_process(mut command: Command, timeout: Duration) -> io::Result<ProcessOutput> {
    let mut child = command
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .spawn()?;

    let stdout = spawn_reader(child.stdout.take());
    let stderr = spawn_reader(child.stderr.take());

    let Some(status) = child.wait_timeout(timeout)? else {
        let _ = child.kill();
        let _ = child.wait();
        // Background grandchildren may still hold the pipes; leave the readers be.
        debug!(program = ?command.get_program(), ?timeout, "process timed out");
        return Ok(ProcessOutput {
            stdout: String::new(),
            stderr: String::new(),
            status: None,
        });
    };

    Ok(ProcessOutput {
        stdout: join_reader(stdout),
        stderr: join_reader(stderr),
        status: Some(status),
    })
}

fn spawn_reader<R>(pipe: Option<R>) -> Option<JoinHandle<Vec<u8>>>
where
    R: Read + Send + 'static,
{
    let mut pipe = pipe?;
    Some(thread::spawn(move || {
        let mut bytes = Vec::new();
        if let Err(error) = pipe.read_to_end(&mut bytes) {
            warn!(%error, "reading command output failed");
        }
        bytes
    }))
}

fn join_reader(reader: Option<JoinHandle<Vec<u8>>>) -> String {
    reader
        .and_then(|handle| handle.join().ok())
        .map(|bytes| String::from_utf8_lossy(&bytes).into_owned())
        .unwrap_or_default()
}

/// Confirms a shell line unless every command in it is already allowed.
///
/// An approved line adds its commands to the allow-list.
fn gate_command(
    ctx: &mut ToolContext<'_>,
    title: String,
    command: &str,
    status_title: &str,
    status_detail: String,
) -> Result<(), ToolError> {
    if is_command_allowed(command, &ctx.env.allowed_commands) {
        ctx.status(status_title, &[status_detail]);
        return Ok(());
    }

    ctx.require_confirmation(ConfirmRequest::new(
        title,
        Preview::Command(command.to_string()),
    ))?;
    ctx.env.allowed_commands.extend(extract_commands(command));
    Ok(())
}

#[derive(Debug, Deserialize)]
struct RunCommandArgs {
    command: String,
}

pub struct RunCommand;

impl Tool for RunCommand {
    fn name(&self) -> &'static str {
        "run_command"
    }

    fn description(&self) -> &'static str {
        "Run a shell command in the current working directory and return its output."
    }

    fn input_schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": { "command": { "type": "string" } },
            "required": ["command"],
        })
    }

    fn call(&self, arguments: Value, ctx: &mut ToolContext<'_>) -> ToolOutcome {
        let args: RunCommandArgs = parse_args(self.name(), arguments)?;
        gate_command(
            ctx,
            self.name().to_string(),
            &args.command,
            "Run",
            args.command.clone(),
        )?;

        let cwd = ctx.env.working_directory.get();
        let timeout = ctx.env.command_timeout;
        let output = run_shell(&args.command, &cwd, timeout).map_err(|error| {
            ToolError::Failed(format!("Failed to launch command: {error}"))
        })?;
        if output.status.is_none() {
            return Err(ToolError::Failed(format!(
                "Command timed out after {} seconds",
                timeout.as_secs()
            )));
        }

        let combined = format!("{}{}", output.stdout, output.stderr);
        if combined.is_empty() {
            Ok("(no output)".to_string())
        } else {
            Ok(limit_output(combined))
        }
    }
}

#[derive(Debug, Deserialize)]
struct RunInDirectoryArgs {
    path: String,
    command: String,
}

pub struct RunInDirectory;

impl Tool for RunInDirectory {
    fn name(&self) -> &'static str {
        "run_in_directory"
    }

    fn description(&self) -> &'static str {
        "Run a shell command in a specific directory without changing the working directory."
    }

    fn input_schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "path": { "type": "string" },
                "command": { "type": "string" },
            },
            "required": ["path", "command"],
        })
    }

    fn call(&self, arguments: Value, ctx: &mut ToolContext<'_>) -> ToolOutcome {
        let args: RunInDirectoryArgs = parse_args(self.name(), arguments)?;
        let target = ctx.env.working_directory.resolve(&args.path);
        if !target.is_dir() {
            return Ok(format!("Error: Directory does not exist: {}", args.path));
        }

        gate_command(
            ctx,
            format!("{}: {}", self.name(), target.display()),
            &args.command,
            "Exec",
            format!("{} (in {})", args.command, args.path),
        )?;

        let timeout = ctx.env.command_timeout;
        let output = match run_shell(&args.command, &target, timeout) {
            Ok(output) => output,
            Err(error) => return Ok(format!("Error executing command: {error}")),
        };
        let Some(status) = output.status else {
            return Ok(format!(
                "Error: Command timed out after {} seconds",
                timeout.as_secs()
            ));
        };

        let mut sections = Vec::new();
        if !output.stdout.is_empty() {
            sections.push(format!("STDOUT:\n{}", output.stdout));
        }
        if !output.stderr.is_empty() {
            sections.push(format!("STDERR:\n{}", output.stderr));
        }
        if !status.success() {
            match status.code() {
                Some(code) => sections.push(format!("Exit code: {code}")),
                None => sections.push("Exit code: terminated by signal".to_string()),
            }
        }

        if sections.is_empty() {
            Ok("Command executed successfully (no output)".to_string())
        } else {
            Ok(limit_output(sections.join("\n")))
        }
    }
}
