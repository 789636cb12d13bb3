use std::process::Command;

use agent_provider::{ToolError, ToolOutcome};
use serde::Deserialize;
use serde_json::{json, Value};
use terminus_ui::Preview;

use super::shell::run_process;
use super::{parse_args, Tool, ToolContext};
use crate::confirm::ConfirmRequest;

const PREVIEW_FILES: usize = 20;

/// Runs `git <args>` in the working directory and returns stdout.
///
/// A non-zero exit is a retry carrying git's own complaint; a hung git is a
/// failure like any other timed-out command.
fn git(ctx: &ToolContext<'_>, action: &str, args: &[&str]) -> Result<String, ToolError> {
    let mut command = Command::new("git");
    command
        .args(args)
        .current_dir(ctx.env.working_directory.get());
    let timeout = ctx.env.command_timeout;

    let output = run_process(command, timeout)
        .map_err(|error| ToolError::Retry(format!("Error running {action}: {error}")))?;
    let Some(status) = output.status else {
        return Err(ToolError::Failed(format!(
            "Command timed out after {} seconds",
            timeout.as_secs()
        )));
    };
    if !status.success() {
        let reason = output.stderr.trim();
        let reason = if reason.is_empty() {
            status.to_string()
        } else {
            reason.to_string()
        };
        return Err(ToolError::Retry(format!("{} failed: {reason}", capitalize(action))));
    }
    Ok(output.stdout)
}

fn capitalize(text: &str) -> String {
    let mut chars = text.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

/// `git status --porcelain` lines, leading status columns intact.
fn porcelain(ctx: &ToolContext<'_>, action: &str) -> Result<Vec<String>, ToolError> {
    let stdout = git(ctx, action, &["status", "--porcelain"])?;
    Ok(stdout
        .lines()
        .filter(|line| !line.trim().is_empty())
        .map(str::to_string)
        .collect())
}

fn is_staged(line: &str) -> bool {
    matches!(line.chars().next(), Some('A' | 'M' | 'D' | 'R'))
}

fn preview_lines(lines: &[String]) -> String {
    let mut preview = lines
        .iter()
        .take(PREVIEW_FILES)
        .cloned()
        .collect::<Vec<_>>()
        .join("\n");
    if lines.len() > PREVIEW_FILES {
        preview.push_str(&format!("\n... and {} more files", lines.len() - PREVIEW_FILES));
    }
    preview
}

#[derive(Debug, Deserialize)]
struct GitAddArgs {
    files: String,
}

pub struct GitAdd;

impl Tool for GitAdd {
    fn name(&self) -> &'static str {
        "git_add"
    }

    fn description(&self) -> &'static str {
        "Stage files for commit. `files` is '.' for everything or space-separated paths."
    }

    fn input_schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": { "files": { "type": "string" } },
            "required": ["files"],
        })
    }

    fn call(&self, arguments: Value, ctx: &mut ToolContext<'_>) -> ToolOutcome {
        let args: GitAddArgs = parse_args(self.name(), arguments)?;
        let targets: Vec<&str> = args.files.split_whitespace().collect();
        let everything = targets.is_empty() || targets == ["."];

        let changes = porcelain(ctx, "git add")?;
        if changes.is_empty() {
            return Ok("No changes to stage".to_string());
        }

        let to_stage: Vec<String> = changes
            .into_iter()
            .filter(|line| {
                let file = line.get(3..).unwrap_or_default();
                everything || targets.iter().any(|target| file.contains(target))
            })
            .collect();
        if !to_stage.is_empty() {
            ctx.require_confirmation(ConfirmRequest::new(
                self.name(),
                Preview::Text(preview_lines(&to_stage)),
            ))?;
        }

        let mut add_args = vec!["add"];
        if everything {
            add_args.push(".");
        } else {
            add_args.push("--");
            add_args.extend(targets.iter().copied());
        }
        git(ctx, "git add", &add_args)?;

        let staged = porcelain(ctx, "git add")?
            .iter()
            .filter(|line| is_staged(line))
            .count();
        Ok(format!("Successfully staged {staged} file(s)"))
    }
}

#[derive(Debug, Deserialize)]
struct GitCommitArgs {
    message: String,
}

pub struct GitCommit;

impl Tool for GitCommit {
    fn name(&self) -> &'static str {
        "git_commit"
    }

    fn description(&self) -> &'static str {
        "Commit the staged changes with the given message."
    }

    fn input_schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": { "message": { "type": "string" } },
            "required": ["message"],
        })
    }

    fn call(&self, arguments: Value, ctx: &mut ToolContext<'_>) -> ToolOutcome {
        let args: GitCommitArgs = parse_args(self.name(), arguments)?;
        if args.message.trim().is_empty() {
            return Err(ToolError::Retry("Commit message cannot be empty".to_string()));
        }

        let staged: Vec<String> = porcelain(ctx, "git commit")?
            .into_iter()
            .filter(|line| is_staged(line))
            .collect();
        if staged.is_empty() {
            return Ok("No staged changes to commit".to_string());
        }

        ctx.require_confirmation(ConfirmRequest::new(
            self.name(),
            Preview::Text(format!(
                "Message: {}\n\nStaged changes:\n\n{}",
                args.message,
                preview_lines(&staged)
            )),
        ))?;

        let stdout = git(ctx, "git commit", &["commit", "-m", &args.message])?;
        let summary = stdout
            .lines()
            .next()
            .filter(|line| !line.trim().is_empty())
            .unwrap_or("Commit created");
        Ok(format!("Successfully created commit: {summary}"))
    }
}
