mod support;

use std::fs;
use std::thread;
use std::time::{Duration, Instant};

use agent_provider::{RequestPart, RunError, RunMessage};
use agent_provider_mock::{MockStep, MockToolCall};
use pretty_assertions::assert_eq;
use serde_json::json;
use terminus::confirm::{CONFIRM_PROMPT, UNRECOGNISED_ANSWER};
use terminus::history::{unmatched_tool_calls, INTERRUPTED_TOOL_RESULT};
use terminus::{Command, InputLine, RequestOutcome, RequestState};

use support::{write_file_call, Harness, RecordingProvider, Turn};

#[test]
fn completed_request_shows_the_answer_and_returns_to_idle() {
    let mut harness = Harness::scripted(vec![MockStep::Reply("Answer for {prompt}".to_string())]);

    let outcome = harness.request("hello");

    assert_eq!(outcome, RequestOutcome::Completed("Answer for hello".to_string()));
    assert!(harness.output().contains("Answer for hello"));
    assert_eq!(harness.session.messages.len(), 2);
    assert!(!harness.session.is_busy());
    assert_eq!(harness.controller.state(), RequestState::Idle);
}

#[test]
fn thinking_text_and_tool_status_are_shown() {
    let mut harness = Harness::scripted(vec![
        MockStep::Act {
            thought: Some("Checking where we are".to_string()),
            calls: vec![MockToolCall::new("get_current_directory", json!({}))],
        },
        MockStep::Reply("ok".to_string()),
    ]);

    let outcome = harness.request("where am I");

    assert_eq!(outcome, RequestOutcome::Completed("ok".to_string()));
    let output = harness.output();
    assert!(output.contains("› Checking where we are"), "{output}");
    assert!(output.contains("• PWD(Current Directory)"), "{output}");
    // prompt, tool call, tool result, reply
    assert_eq!(harness.session.messages.len(), 4);
    assert!(unmatched_tool_calls(&harness.session.messages).is_empty());
}

#[test]
fn denied_confirmation_cancels_without_a_fabricated_result() {
    let mut harness = Harness::scripted(vec![
        write_file_call("out.txt", "data"),
        MockStep::Reply("never".to_string()),
    ]);
    harness.type_lines(&["n"]);

    let outcome = harness.request("write it");

    assert_eq!(outcome, RequestOutcome::Cancelled { interrupted: false });
    let output = harness.output();
    assert!(output.contains(CONFIRM_PROMPT));
    assert!(output.contains("Request cancelled"));
    assert!(!harness.workspace.path().join("out.txt").exists());
    assert_eq!(harness.session.messages.len(), 2);
    assert_eq!(unmatched_tool_calls(&harness.session.messages).len(), 1);
    assert!(!harness.session.is_busy());
}

#[test]
fn unrecognised_answers_prompt_again() {
    let mut harness = Harness::scripted(vec![
        write_file_call("out.txt", "data"),
        MockStep::Reply("written".to_string()),
    ]);
    harness.type_lines(&["maybe", "y"]);

    let outcome = harness.request("write it");

    assert_eq!(outcome, RequestOutcome::Completed("written".to_string()));
    let output = harness.output();
    assert_eq!(output.matches(CONFIRM_PROMPT).count(), 2);
    // A line typed ahead is read as the answer and echoed when it is not one.
    assert!(output.contains(&format!("{UNRECOGNISED_ANSWER}maybe")), "{output}");
    assert_eq!(
        fs::read_to_string(harness.workspace.path().join("out.txt")).expect("written file"),
        "data"
    );
}

#[test]
fn always_allow_skips_later_prompts_for_the_tool() {
    let mut harness = Harness::scripted(vec![
        write_file_call("a.txt", "a"),
        write_file_call("b.txt", "b"),
        MockStep::Reply("both written".to_string()),
    ]);
    harness.type_lines(&["a"]);

    let outcome = harness.request("write two files");

    assert_eq!(outcome, RequestOutcome::Completed("both written".to_string()));
    assert_eq!(harness.output().matches(CONFIRM_PROMPT).count(), 1);
    assert!(harness.workspace.path().join("a.txt").exists());
    assert!(harness.workspace.path().join("b.txt").exists());
    assert!(harness.session.skips_confirmation("write_file"));
    assert!(!harness.session.skips_confirmation("update_file"));
}

#[test]
fn disabled_confirmations_never_prompt() {
    let mut harness = Harness::scripted(vec![
        write_file_call("out.txt", "data"),
        MockStep::Reply("written".to_string()),
    ]);
    harness.session.set_confirmation_enabled(false);

    let outcome = harness.request("write it");

    assert_eq!(outcome, RequestOutcome::Completed("written".to_string()));
    assert!(!harness.output().contains(CONFIRM_PROMPT));
}

#[test]
fn retry_notices_are_shown_muted() {
    let identical = MockStep::Act {
        thought: None,
        calls: vec![MockToolCall::new(
            "update_file",
            json!({ "filepath": "a.txt", "old_content": "x", "new_content": "x" }),
        )],
    };
    let mut harness = Harness::scripted(vec![identical, MockStep::Reply("gave up".to_string())]);

    let outcome = harness.request("edit");

    assert_eq!(outcome, RequestOutcome::Completed("gave up".to_string()));
    assert!(harness
        .output()
        .contains("The old_content and new_content are identical"));
    assert!(unmatched_tool_calls(&harness.session.messages).is_empty());
}

#[test]
fn exhausted_retries_fail_and_patch_the_trailing_call() {
    let identical = MockStep::Act {
        thought: None,
        calls: vec![MockToolCall::new(
            "update_file",
            json!({ "filepath": "a.txt", "old_content": "x", "new_content": "x" }),
        )],
    };
    let mut harness = Harness::scripted(vec![
        identical.clone(),
        identical,
        MockStep::Reply("unreachable".to_string()),
    ]);

    let outcome = harness.request("edit");

    let RequestOutcome::Failed { error, log_path } = outcome else {
        panic!("expected a failed request");
    };
    assert!(matches!(error, RunError::RetriesExhausted { .. }));
    let log_path = log_path.expect("retries exhausted is logged");
    assert!(log_path.starts_with(harness.logs.path()));
    assert_eq!(
        harness.session.messages.last(),
        Some(&RunMessage::tool_result(
            "call-1-2",
            "update_file",
            "Tool 'update_file' exceeded max retries count of 1"
        ))
    );
    assert!(harness.output().contains("Error log:"));
}

#[test]
fn failing_tool_reports_error_with_log_and_patches_history() {
    let mut harness = Harness::scripted(vec![
        write_file_call("blocker/inner.txt", "data"),
        MockStep::Reply("unreachable".to_string()),
    ]);
    fs::write(harness.workspace.path().join("blocker"), "a file").expect("write blocker");
    harness.session.set_confirmation_enabled(false);

    let outcome = harness.request("write it");

    let RequestOutcome::Failed { error, log_path } = outcome else {
        panic!("expected a failed request");
    };
    assert!(matches!(error, RunError::Tool { ref tool_name, .. } if tool_name == "write_file"));
    assert!(log_path.is_some());
    assert_eq!(harness.log_files().len(), 1);
    assert_eq!(harness.controller.state(), RequestState::Idle);

    let Some(RunMessage::Request { parts }) = harness.session.messages.last() else {
        panic!("history should end with the patched result");
    };
    assert!(matches!(
        &parts[..],
        [RequestPart::ToolResult { content, .. }] if content.starts_with("Error creating directory")
    ));
    assert!(unmatched_tool_calls(&harness.session.messages).is_empty());
}

#[test]
fn failure_midway_through_a_batch_keeps_earlier_results() {
    let mut harness = Harness::scripted(vec![
        MockStep::Act {
            thought: None,
            calls: vec![
                MockToolCall::new("get_current_directory", json!({})),
                MockToolCall::new(
                    "write_file",
                    json!({ "filepath": "blocker/inner.txt", "content": "data" }),
                ),
            ],
        },
        MockStep::Reply("unreachable".to_string()),
    ]);
    fs::write(harness.workspace.path().join("blocker"), "a file").expect("write blocker");
    harness.session.set_confirmation_enabled(false);

    let outcome = harness.request("go");

    assert!(matches!(outcome, RequestOutcome::Failed { .. }));
    assert!(unmatched_tool_calls(&harness.session.messages).is_empty());
    // prompt, calls, result of the call that ran, result of the failed call
    assert_eq!(harness.session.messages.len(), 4);

    let Some(RunMessage::Request { parts }) = harness.session.messages.get(2) else {
        panic!("the finished call should be answered");
    };
    assert!(matches!(
        &parts[..],
        [RequestPart::ToolResult { call_id, content, .. }]
            if call_id == "call-1-1" && content.starts_with("Current working directory: ")
    ));

    let Some(RunMessage::Request { parts }) = harness.session.messages.last() else {
        panic!("the failed call should be answered");
    };
    assert!(matches!(
        &parts[..],
        [RequestPart::ToolResult { call_id, content, .. }]
            if call_id == "call-1-2" && content.starts_with("Error creating directory")
    ));
}

#[test]
fn denial_midway_through_a_batch_keeps_earlier_results() {
    let mut harness = Harness::scripted(vec![
        MockStep::Act {
            thought: None,
            calls: vec![
                MockToolCall::new("get_current_directory", json!({})),
                MockToolCall::new(
                    "write_file",
                    json!({ "filepath": "out.txt", "content": "data" }),
                ),
            ],
        },
        MockStep::Reply("never".to_string()),
    ]);
    harness.type_lines(&["n"]);

    let outcome = harness.request("go");

    assert_eq!(outcome, RequestOutcome::Cancelled { interrupted: false });
    assert_eq!(
        unmatched_tool_calls(&harness.session.messages),
        vec![("call-1-2".to_string(), "write_file".to_string())]
    );
}

#[test]
fn provider_errors_are_not_logged() {
    let mut harness = Harness::scripted(vec![MockStep::Fail(RunError::Provider {
        model: "mock-test".to_string(),
        status: 503,
        message: "overloaded".to_string(),
        body: None,
    })]);

    let outcome = harness.request("hello");

    assert!(matches!(outcome, RequestOutcome::Failed { log_path: None, .. }));
    assert!(harness.log_files().is_empty());
    assert!(harness.output().contains("mock-test"));
}

#[test]
fn interrupt_cancels_the_run_and_the_next_dispatch_repairs_history() {
    let (provider, requests) = RecordingProvider::new(&[Turn::Dangle, Turn::Reply]);
    let mut harness = Harness::with_provider(provider);
    harness.interrupt();

    let outcome = harness.request("first");

    assert_eq!(outcome, RequestOutcome::Cancelled { interrupted: true });
    let output = harness.output();
    assert!(output.contains("Request interrupted"));
    assert!(!output.contains("Request cancelled"));
    assert_eq!(harness.session.messages.len(), 2);
    assert!(!harness.session.is_busy());

    let outcome = harness.request("second");

    assert_eq!(outcome, RequestOutcome::Completed("done".to_string()));
    let requests = requests.lock().expect("requests lock");
    assert_eq!(requests.len(), 2);
    assert_eq!(
        requests[1].history.last(),
        Some(&RunMessage::Request {
            parts: vec![RequestPart::ToolResult {
                call_id: "call-1-1".to_string(),
                tool_name: "read_file".to_string(),
                content: INTERRUPTED_TOOL_RESULT.to_string(),
            }],
        })
    );
    // first prompt, dangling call, repair, second prompt, reply
    assert_eq!(harness.session.messages.len(), 5);
    assert!(unmatched_tool_calls(&harness.session.messages).is_empty());
}

#[test]
fn interrupt_while_confirming_is_observed_after_the_answer() {
    let mut harness = Harness::scripted(vec![
        write_file_call("out.txt", "data"),
        MockStep::Pause(Duration::from_secs(10)),
        MockStep::Reply("too late".to_string()),
    ]);
    let capture = harness.capture.clone();
    let handle = harness.runtime.handle();
    let user = thread::spawn(move || {
        let deadline = Instant::now() + Duration::from_secs(10);
        while !capture.text().contains(CONFIRM_PROMPT) {
            assert!(Instant::now() < deadline, "confirmation was never shown");
            thread::sleep(Duration::from_millis(5));
        }
        handle.dispatch(Command::Interrupt);
        handle.dispatch(Command::Input(InputLine::Line("y".to_string())));
    });

    let outcome = harness.request("write it");
    user.join().expect("user thread");

    assert_eq!(outcome, RequestOutcome::Cancelled { interrupted: true });
    assert_eq!(
        fs::read_to_string(harness.workspace.path().join("out.txt")).expect("written file"),
        "data"
    );
    assert!(harness.output().contains("Request interrupted"));
    assert!(!harness.session.is_busy());
    assert_eq!(harness.controller.state(), RequestState::Idle);
    // prompt, tool call, its result
    assert_eq!(harness.session.messages.len(), 3);
    assert!(unmatched_tool_calls(&harness.session.messages).is_empty());
}

#[test]
fn lines_typed_during_a_request_are_kept_for_the_prompt() {
    let mut harness = Harness::scripted(vec![MockStep::Reply("ok".to_string())]);
    harness.type_lines(&["next question"]);

    harness.request("first");

    assert_eq!(
        harness.runtime.pop_typeahead().as_deref(),
        Some("next question")
    );
}
