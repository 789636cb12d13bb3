use std::path::Path;
use std::thread;
use std::time::Duration;

use agent_provider::RunError;
use terminus_ui::{Console, Preview};
use tracing::debug;

use crate::banner::show_banner;
use crate::confirm::{confirm, ConfirmRequest};
use crate::error::report_error;
use crate::runtime::InputLine;
use crate::session::Session;

const SPINNER_TEST_DURATION: Duration = Duration::from_secs(2);

const HELP_COMMANDS: [(&str, &str); 5] = [
    ("/help", "Show this comprehensive help guide"),
    (
        "/yolo",
        "Toggle tool confirmation prompts (DANGEROUS: auto-approves all actions)",
    ),
    ("/clear", "Clear conversation history and start fresh"),
    ("/dump", "Show detailed message history for debugging"),
    ("exit", "Exit the application gracefully"),
];

const TEST_TRIGGERS: [&str; 6] = [
    "error - Trigger an error panel",
    "warning - Show a warning message",
    "success - Show a success message",
    "spinner - Test spinner behavior",
    "panel - Show various panel types",
    "confirm - Show confirmation dialog",
];

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SlashCommand {
    Help,
    Clear,
    Dump,
    Yolo,
    /// UI exercise trigger, only available in debug mode.
    Test(Option<String>),
    Unknown(String),
}

/// Parses a `/`-prefixed line. Returns `None` for anything else.
pub fn parse_slash_command(input: &str, debug_enabled: bool) -> Option<SlashCommand> {
    let trimmed = input.trim();
    if !trimmed.starts_with('/') {
        return None;
    }

    let mut words = trimmed.split_whitespace();
    let command = words.next().unwrap_or(trimmed).to_string();

    let parsed = match command.as_str() {
        "/help" => SlashCommand::Help,
        "/clear" => SlashCommand::Clear,
        "/dump" => SlashCommand::Dump,
        "/yolo" => SlashCommand::Yolo,
        "/test" if debug_enabled => SlashCommand::Test(words.next().map(str::to_lowercase)),
        _ => SlashCommand::Unknown(command),
    };

    Some(parsed)
}

/// What a slash command handler needs from the REPL.
pub struct CommandContext<'a> {
    pub session: &'a mut Session,
    pub console: &'a Console,
    pub tool_names: &'a [&'static str],
    pub error_log_dir: &'a Path,
    pub read_line: &'a mut dyn FnMut() -> InputLine,
}

pub fn run_slash_command(command: &SlashCommand, ctx: &mut CommandContext<'_>) {
    debug!(?command, "slash command");
    match command {
        SlashCommand::Help => show_help(ctx.console, ctx.tool_names),
        SlashCommand::Clear => {
            ctx.session.messages.clear();
            show_banner(ctx.console);
            ctx.console.success("Conversation history cleared");
        }
        SlashCommand::Dump => match serde_json::to_string_pretty(&ctx.session.messages) {
            Ok(json) => ctx.console.dump(&json),
            Err(error) => ctx
                .console
                .error("Failed to render history", Some(&error.to_string())),
        },
        SlashCommand::Yolo => {
            if ctx.session.toggle_confirmation() {
                ctx.console.info("Tool confirmations enabled");
            } else {
                ctx.console.info("Tool confirmations disabled (YOLO mode)");
            }
        }
        SlashCommand::Test(trigger) => run_test_trigger(trigger.as_deref(), ctx),
        SlashCommand::Unknown(name) => ctx.console.warning(&format!("Unknown command: {name}")),
    }
}

fn show_help(console: &Console, tool_names: &[&str]) {
    let width = HELP_COMMANDS
        .iter()
        .map(|(command, _)| command.len())
        .max()
        .unwrap_or(0);

    let mut body: Vec<String> = HELP_COMMANDS
        .iter()
        .map(|(command, description)| format!("{command:<width$}  {description}"))
        .collect();
    body.push(String::new());
    body.push("TOOLS  Ask the agent to use these naturally:".to_string());
    body.extend(tool_names.iter().map(|name| format!("  • {name}")));
    body.push(String::new());
    body.push("TIPS   Use /yolo to skip confirmations (careful!)".to_string());
    body.push("       Press Ctrl+C to interrupt a running request".to_string());

    console.info_panel("Terminus CLI - Help", &body);
}

fn run_test_trigger(trigger: Option<&str>, ctx: &mut CommandContext<'_>) {
    let console = ctx.console;
    let Some(trigger) = trigger else {
        console.info("Available test triggers:");
        for line in TEST_TRIGGERS {
            console.bullet(line);
        }
        return;
    };

    match trigger {
        "error" => {
            let error =
                RunError::Internal("This is a test error to demonstrate error handling".to_string());
            report_error(&error, console, ctx.error_log_dir);
        }
        "warning" => console.warning("This is a test warning message"),
        "success" => console.success("This is a test success message!"),
        "spinner" => {
            console.start_spinner("Testing spinner...");
            thread::sleep(SPINNER_TEST_DURATION);
            console.stop_spinner();
            console.info("Spinner test completed");
        }
        "panel" => {
            console.info_panel("Information", &["This is an info panel".to_string()]);
            console.tool_panel(
                "Test Tool",
                &Preview::Text("Tool output goes here".to_string()),
                Some("Footer text"),
            );
            console.tool_panel(
                "Confirm",
                &Preview::Text("Are you sure you want to proceed?".to_string()),
                None,
            );
        }
        "confirm" => {
            let request = ConfirmRequest::new(
                "Test Action: Delete File",
                Preview::Text("This would delete important.txt".to_string()),
            )
            .with_footer("File: important.txt");
            let result = confirm(ctx.session, console, &request, ctx.read_line);
            console.info(&format!("Confirmation result: {result}"));
        }
        other => console.warning(&format!("Unknown test type: {other}")),
    }
}
