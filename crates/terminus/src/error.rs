//! Reporting for requests that ended in an error.

use std::error::Error as _;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use agent_provider::RunError;
use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::Value;
use terminus_ui::Console;
use time::format_description::well_known::Rfc3339;
use time::OffsetDateTime;
use tracing::warn;

const MAX_MESSAGE_CHARS: usize = 150;

static MESSAGE_FIELD: Lazy<Option<Regex>> = Lazy::new(|| {
    Regex::new(r#"(?i)["']?message["']?:\s*["']([^"'\n]+)["']"#).ok()
});

/// Short, user-facing description of `error`.
#[must_use]
pub fn extract_error_message(error: &RunError) -> String {
    if let RunError::Provider { model, body, .. } = error {
        return format!("{model}: {}", api_message(body.as_ref(), error));
    }

    let text = error.to_string();
    if text.contains("MALFORMED_FUNCTION_CALL") {
        return "The AI model had trouble executing a function. Please try again.".to_string();
    }
    if text.contains("Content field missing") {
        return "The AI model returned an unexpected response format. This might be a temporary issue."
            .to_string();
    }

    format!("Unexpected error ({}): {}", error.kind(), shorten(&text))
}

fn api_message(body: Option<&Value>, error: &RunError) -> String {
    let from_body = body.and_then(|body| match body.get("error") {
        Some(Value::Object(inner)) => inner.get("message").and_then(Value::as_str),
        _ => body.get("message").and_then(Value::as_str),
    });
    from_body.map_or_else(|| error.to_string(), str::to_string)
}

fn shorten(text: &str) -> String {
    if text.chars().count() <= MAX_MESSAGE_CHARS {
        return text.to_string();
    }
    if let Some(captures) = MESSAGE_FIELD
        .as_ref()
        .and_then(|pattern| pattern.captures(text))
    {
        return captures[1].to_string();
    }
    let truncated: String = text.chars().take(MAX_MESSAGE_CHARS).collect();
    format!("{truncated}...")
}

/// Cancellations and provider errors are expected; everything else gets a log file.
#[must_use]
pub fn should_log_error(error: &RunError) -> bool {
    !matches!(error, RunError::Cancelled(_) | RunError::Provider { .. })
}

/// Writes a diagnostic file for `error` under `dir` and returns its path.
pub fn save_error_log(error: &RunError, dir: &Path) -> io::Result<PathBuf> {
    let now = OffsetDateTime::now_local().unwrap_or_else(|_| OffsetDateTime::now_utc());
    let stamp = format!(
        "{:04}{:02}{:02}_{:02}{:02}{:02}",
        now.year(),
        u8::from(now.month()),
        now.day(),
        now.hour(),
        now.minute(),
        now.second()
    );
    let path = dir.join(format!("terminus_error_{stamp}.log"));
    let timestamp = now.format(&Rfc3339).map_err(io::Error::other)?;

    let mut report = String::new();
    report.push_str("terminus Error Log\n");
    report.push_str("==================\n\n");
    report.push_str(&format!("Timestamp: {timestamp}\n"));
    report.push_str(&format!("Error Type: {}\n", error.kind()));
    report.push_str(&format!("Error Module: {}\n\n", module_path!()));
    report.push_str(&format!("Error Message:\n{error}\n\n"));

    let mut source = error.source();
    if source.is_some() {
        report.push_str("Caused by:\n");
    }
    while let Some(cause) = source {
        report.push_str(&format!("  {cause}\n"));
        source = cause.source();
    }
    report.push_str(&format!("Details:\n{error:#?}\n"));

    fs::write(&path, report)?;
    Ok(path)
}

/// Shows the error panel, with the diagnostic log path when one was written.
pub fn report_error(error: &RunError, console: &Console, log_dir: &Path) -> Option<PathBuf> {
    let message = extract_error_message(error);
    if !should_log_error(error) {
        console.error_panel(&message, None);
        return None;
    }

    match save_error_log(error, log_dir) {
        Ok(path) => {
            console.error_panel(&message, Some(&format!("Error log: {}", path.display())));
            Some(path)
        }
        Err(io_error) => {
            warn!(%io_error, "writing error log failed");
            console.error_panel(&message, None);
            None
        }
    }
}

type Cleanup<'a> = Box<dyn FnOnce(&RunError) + 'a>;

/// Error handling scope for one operation.
///
/// Cleanups run before anything is shown, in registration order.
pub struct ErrorContext<'a> {
    operation: &'static str,
    console: &'a Console,
    log_dir: &'a Path,
    cleanups: Vec<Cleanup<'a>>,
}

impl<'a> ErrorContext<'a> {
    pub fn new(operation: &'static str, console: &'a Console, log_dir: &'a Path) -> Self {
        Self {
            operation,
            console,
            log_dir,
            cleanups: Vec::new(),
        }
    }

    pub fn add_cleanup(&mut self, cleanup: impl FnOnce(&RunError) + 'a) {
        self.cleanups.push(Box::new(cleanup));
    }

    /// Returns the diagnostic log path, if one was written.
    pub fn handle(self, error: &RunError) -> Option<PathBuf> {
        self.console.stop_spinner();
        for cleanup in self.cleanups {
            cleanup(error);
        }

        if error.is_cancellation() {
            self.console.warning("Request cancelled");
            return None;
        }

        warn!(operation = self.operation, kind = error.kind(), %error, "operation failed");
        report_error(error, self.console, self.log_dir)
    }
}
