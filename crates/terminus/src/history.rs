//! History repair: keep every tool call paired with exactly one result.

use std::collections::BTreeSet;

use agent_provider::{RequestPart, ResponsePart, RunMessage};
use tracing::debug;

/// Result content used when a cancelled request left tool calls unanswered.
pub const INTERRUPTED_TOOL_RESULT: &str = "Tool execution was interrupted";

/// Answers the last tool call of a trailing response entry with `error_message`.
///
/// No-op (returns false) unless the newest entry is a response that carries a
/// tool call.
pub fn patch_history_on_error(messages: &mut Vec<RunMessage>, error_message: &str) -> bool {
    let Some(RunMessage::Response { parts }) = messages.last() else {
        return false;
    };

    let Some((call_id, tool_name)) = parts.iter().rev().find_map(|part| match part {
        ResponsePart::ToolCall {
            call_id, tool_name, ..
        } => Some((call_id.clone(), tool_name.clone())),
        ResponsePart::Text { .. } => None,
    }) else {
        return false;
    };

    debug!(%call_id, %tool_name, "patching history after error");
    messages.push(RunMessage::tool_result(call_id, tool_name, error_message));
    true
}

/// Tool calls (call id, tool name) with no result or retry notice, in order.
#[must_use]
pub fn unmatched_tool_calls(messages: &[RunMessage]) -> Vec<(String, String)> {
    let mut answered = BTreeSet::new();
    for message in messages {
        if let RunMessage::Request { parts } = message {
            for part in parts {
                match part {
                    RequestPart::ToolResult { call_id, .. } => {
                        answered.insert(call_id.as_str());
                    }
                    RequestPart::RetryNotice {
                        call_id: Some(call_id),
                        ..
                    } => {
                        answered.insert(call_id.as_str());
                    }
                    _ => {}
                }
            }
        }
    }

    messages
        .iter()
        .filter_map(|message| match message {
            RunMessage::Response { parts } => Some(parts),
            RunMessage::Request { .. } => None,
        })
        .flatten()
        .filter_map(|part| match part {
            ResponsePart::ToolCall {
                call_id, tool_name, ..
            } if !answered.contains(call_id.as_str()) => {
                Some((call_id.clone(), tool_name.clone()))
            }
            _ => None,
        })
        .collect()
}

/// Appends one request entry answering every unmatched tool call with `content`.
///
/// Returns how many calls were answered.
pub fn repair_dangling_tool_calls(messages: &mut Vec<RunMessage>, content: &str) -> usize {
    let dangling = unmatched_tool_calls(messages);
    if dangling.is_empty() {
        return 0;
    }

    let count = dangling.len();
    let parts = dangling
        .into_iter()
        .map(|(call_id, tool_name)| RequestPart::ToolResult {
            call_id,
            tool_name,
            content: content.to_string(),
        })
        .collect();
    messages.push(RunMessage::Request { parts });
    debug!(count, "answered dangling tool calls");
    count
}
