use std::fs;
use std::io;

use agent_provider::{ToolError, ToolOutcome};
use serde::Deserialize;
use serde_json::{json, Value};
use terminus_ui::Preview;

use super::{limit_output, parse_args, Tool, ToolContext};
use crate::confirm::ConfirmRequest;

const SEARCH_PREVIEW_CHARS: usize = 100;

#[derive(Debug, Deserialize)]
struct ReadFileArgs {
    filepath: String,
}

pub struct ReadFile;

impl Tool for ReadFile {
    fn name(&self) -> &'static str {
        "read_file"
    }

    fn description(&self) -> &'static str {
        "Read the contents of a file."
    }

    fn input_schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": { "filepath": { "type": "string" } },
            "required": ["filepath"],
        })
    }

    fn call(&self, arguments: Value, ctx: &mut ToolContext<'_>) -> ToolOutcome {
        let args: ReadFileArgs = parse_args(self.name(), arguments)?;
        let path = ctx.env.working_directory.resolve(&args.filepath);
        ctx.status("Read", &[path.display().to_string()]);

        // Read failures are answers for the model, not failures of the request.
        Ok(match fs::read_to_string(&path) {
            Ok(content) => limit_output(content),
            Err(error) if error.kind() == io::ErrorKind::NotFound => {
                format!("Error: File not found: {}", path.display())
            }
            Err(error) if error.kind() == io::ErrorKind::PermissionDenied => {
                format!("Error: Permission denied: {}", path.display())
            }
            Err(error) => format!("Error reading file {}: {error}", path.display()),
        })
    }
}

#[derive(Debug, Deserialize)]
struct WriteFileArgs {
    filepath: String,
    content: String,
}

pub struct WriteFile;

impl Tool for WriteFile {
    fn name(&self) -> &'static str {
        "write_file"
    }

    fn description(&self) -> &'static str {
        "Write content to a file, creating parent directories as needed."
    }

    fn input_schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "filepath": { "type": "string" },
                "content": { "type": "string" },
            },
            "required": ["filepath", "content"],
        })
    }

    fn call(&self, arguments: Value, ctx: &mut ToolContext<'_>) -> ToolOutcome {
        let args: WriteFileArgs = parse_args(self.name(), arguments)?;
        let path = ctx.env.working_directory.resolve(&args.filepath);
        let display = path.display().to_string();

        ctx.require_confirmation(
            ConfirmRequest::new(
                self.name(),
                Preview::Code {
                    path: display.clone(),
                    content: args.content.clone(),
                },
            )
            .with_footer(format!("File: {display}")),
        )?;

        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(|error| {
                ToolError::Failed(format!("Error creating directory {}: {error}", parent.display()))
            })?;
        }
        fs::write(&path, &args.content)
            .map_err(|error| ToolError::Failed(format!("Error writing file {display}: {error}")))?;

        Ok(format!("Successfully wrote to {display}"))
    }
}

#[derive(Debug, Deserialize)]
struct UpdateFileArgs {
    filepath: String,
    old_content: String,
    new_content: String,
}

pub struct UpdateFile;

impl Tool for UpdateFile {
    fn name(&self) -> &'static str {
        "update_file"
    }

    fn description(&self) -> &'static str {
        "Replace the first occurrence of old_content with new_content in a file."
    }

    fn input_schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "filepath": { "type": "string" },
                "old_content": { "type": "string" },
                "new_content": { "type": "string" },
            },
            "required": ["filepath", "old_content", "new_content"],
        })
    }

    fn call(&self, arguments: Value, ctx: &mut ToolContext<'_>) -> ToolOutcome {
        let args: UpdateFileArgs = parse_args(self.name(), arguments)?;
        let path = ctx.env.working_directory.resolve(&args.filepath);
        let display = path.display().to_string();

        if args.old_content == args.new_content {
            return Err(ToolError::Retry(
                "The old_content and new_content are identical. Please provide different content for the replacement."
                    .to_string(),
            ));
        }

        let content = fs::read_to_string(&path).map_err(|error| {
            if error.kind() == io::ErrorKind::NotFound {
                ToolError::Retry(format!(
                    "File not found: {display}. Please check the file path and try again."
                ))
            } else {
                ToolError::Retry(format!("Error reading file {display}: {error}"))
            }
        })?;

        if !content.contains(&args.old_content) {
            return Err(ToolError::Retry(format!(
                "Content to replace not found in {display}. Searched for: '{}'. Please re-read the file and ensure the exact content matches, including whitespace.",
                search_preview(&args.old_content)
            )));
        }

        let updated = content.replacen(&args.old_content, &args.new_content, 1);
        ctx.require_confirmation(
            ConfirmRequest::new(
                self.name(),
                Preview::Diff {
                    path: display.clone(),
                    before: content,
                    after: updated.clone(),
                },
            )
            .with_footer(format!("File: {display}")),
        )?;

        fs::write(&path, updated)
            .map_err(|error| ToolError::Retry(format!("Error writing to file {display}: {error}")))?;

        Ok(format!("Successfully updated {display}"))
    }
}

fn search_preview(text: &str) -> String {
    if text.chars().count() > SEARCH_PREVIEW_CHARS {
        let head: String = text.chars().take(SEARCH_PREVIEW_CHARS).collect();
        format!("{head}...")
    } else {
        text.to_string()
    }
}
