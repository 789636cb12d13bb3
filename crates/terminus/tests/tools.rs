use std::fs;
use std::path::Path;
use std::time::Duration;

use agent_provider::{ToolCallRequest, ToolError, ToolOutcome};
use pretty_assertions::assert_eq;
use serde_json::{json, Value};
use tempfile::TempDir;
use terminus::confirm::ConfirmRequest;
use terminus::tools::{ToolDeps, ToolEnv, ToolRegistry, DENIED_BY_USER, NO_RESULTS};
use terminus::{CommandAllowList, WorkingDirectory};
use terminus_ui::Preview;

#[derive(Default)]
struct RecordingDeps {
    approve: bool,
    confirmations: Vec<ConfirmRequest>,
    statuses: Vec<String>,
}

impl ToolDeps for RecordingDeps {
    fn confirm_action(&mut self, request: ConfirmRequest) -> bool {
        self.confirmations.push(request);
        self.approve
    }

    fn display_tool_status(&mut self, title: &str, details: &[String]) {
        self.statuses.push(format!("{title}({})", details.join(", ")));
    }
}

struct Fixture {
    dir: TempDir,
    registry: ToolRegistry,
    allowed: CommandAllowList,
}

impl Fixture {
    fn new() -> Self {
        let dir = tempfile::tempdir().expect("tempdir");
        let allowed = CommandAllowList::new(["echo", "ls", "cat"]);
        let env = ToolEnv::new(WorkingDirectory::detached(dir.path()), allowed.clone())
            .with_command_timeout(Duration::from_secs(1));
        Self {
            dir,
            registry: ToolRegistry::builtin(env),
            allowed,
        }
    }

    fn call(&self, tool_name: &str, arguments: Value, deps: &mut RecordingDeps) -> ToolOutcome {
        self.registry.execute(
            ToolCallRequest {
                call_id: "call-1".to_string(),
                tool_name: tool_name.to_string(),
                arguments,
            },
            deps,
        )
    }
}

#[test]
fn allowed_commands_run_without_confirmation() {
    let fixture = Fixture::new();
    let mut deps = RecordingDeps::default();

    let output = fixture
        .call("run_command", json!({ "command": "echo hi | cat" }), &mut deps)
        .expect("command output");

    assert_eq!(output, "hi\n");
    assert!(deps.confirmations.is_empty());
    assert_eq!(deps.statuses, vec!["Run(echo hi | cat)".to_string()]);
}

#[test]
fn denied_command_is_a_cancellation() {
    let fixture = Fixture::new();
    let mut deps = RecordingDeps::default();

    let outcome = fixture.call("run_command", json!({ "command": "printf ok" }), &mut deps);

    assert_eq!(outcome, Err(ToolError::Cancelled(DENIED_BY_USER.to_string())));
    assert_eq!(deps.confirmations.len(), 1);
    assert_eq!(
        deps.confirmations[0].preview,
        Preview::Command("printf ok".to_string())
    );
    assert!(!fixture.allowed.snapshot().contains(&"printf".to_string()));
}

#[test]
fn approved_command_joins_the_allow_list() {
    let fixture = Fixture::new();
    let mut deps = RecordingDeps {
        approve: true,
        ..RecordingDeps::default()
    };

    let output = fixture
        .call("run_command", json!({ "command": "printf ok" }), &mut deps)
        .expect("command output");
    assert_eq!(output, "ok");

    fixture
        .call("run_command", json!({ "command": "printf again" }), &mut deps)
        .expect("command output");
    assert_eq!(deps.confirmations.len(), 1);
}

#[test]
fn command_timeout_is_a_failure() {
    let fixture = Fixture::new();
    let mut deps = RecordingDeps {
        approve: true,
        ..RecordingDeps::default()
    };

    let outcome = fixture.call("run_command", json!({ "command": "sleep 5" }), &mut deps);

    assert_eq!(
        outcome,
        Err(ToolError::Failed("Command timed out after 1 seconds".to_string()))
    );
}

#[test]
fn run_in_directory_reports_sections_and_exit_code() {
    let fixture = Fixture::new();
    fs::create_dir(fixture.dir.path().join("sub")).expect("mkdir");
    let mut deps = RecordingDeps::default();

    let output = fixture
        .call(
            "run_in_directory",
            json!({ "path": "sub", "command": "ls missing-file" }),
            &mut deps,
        )
        .expect("command output");

    assert!(output.starts_with("STDERR:\n"), "{output}");
    assert!(output.contains("Exit code: "), "{output}");
    assert_eq!(deps.statuses, vec!["Exec(ls missing-file (in sub))".to_string()]);

    let missing = fixture
        .call(
            "run_in_directory",
            json!({ "path": "nope", "command": "ls" }),
            &mut deps,
        )
        .expect("error text");
    assert_eq!(missing, "Error: Directory does not exist: nope");
}

#[test]
fn write_then_update_a_file() {
    let fixture = Fixture::new();
    let mut deps = RecordingDeps {
        approve: true,
        ..RecordingDeps::default()
    };

    fixture
        .call(
            "write_file",
            json!({ "filepath": "notes/todo.txt", "content": "one\ntwo\n" }),
            &mut deps,
        )
        .expect("write");
    fixture
        .call(
            "update_file",
            json!({ "filepath": "notes/todo.txt", "old_content": "two", "new_content": "three" }),
            &mut deps,
        )
        .expect("update");

    let path = fixture.dir.path().join("notes/todo.txt");
    assert_eq!(fs::read_to_string(&path).expect("read back"), "one\nthree\n");
    assert_eq!(deps.confirmations.len(), 2);
    assert_eq!(deps.confirmations[0].title, "write_file");
    assert!(matches!(deps.confirmations[1].preview, Preview::Diff { .. }));
    assert_eq!(
        deps.confirmations[1].footer,
        Some(format!("File: {}", path.display()))
    );
}

#[test]
fn update_asks_for_a_retry_when_content_is_missing() {
    let fixture = Fixture::new();
    fs::write(fixture.dir.path().join("a.txt"), "alpha").expect("write");
    let mut deps = RecordingDeps::default();

    let outcome = fixture.call(
        "update_file",
        json!({ "filepath": "a.txt", "old_content": "beta", "new_content": "gamma" }),
        &mut deps,
    );

    let Err(ToolError::Retry(message)) = outcome else {
        panic!("expected a retry");
    };
    assert!(message.contains("Searched for: 'beta'"), "{message}");
    assert!(deps.confirmations.is_empty());
}

#[test]
fn read_file_errors_are_answers() {
    let fixture = Fixture::new();
    let mut deps = RecordingDeps::default();

    let output = fixture
        .call("read_file", json!({ "filepath": "absent.txt" }), &mut deps)
        .expect("error text");

    assert!(output.starts_with("Error: File not found: "), "{output}");
    assert_eq!(deps.statuses.len(), 1);
}

#[test]
fn list_directory_renders_a_filtered_tree() {
    let fixture = Fixture::new();
    let root = fixture.dir.path();
    fs::create_dir_all(root.join("src")).expect("mkdir src");
    fs::create_dir_all(root.join("target/debug")).expect("mkdir target");
    fs::write(root.join("src/main.rs"), "fn main() {}").expect("write");
    fs::write(root.join("README.md"), "# readme").expect("write");
    fs::write(root.join(".hidden"), "").expect("write");
    let mut deps = RecordingDeps::default();

    let output = fixture
        .call("list_directory", json!({}), &mut deps)
        .expect("listing");

    let lines: Vec<&str> = output.lines().skip(1).collect();
    assert_eq!(
        lines,
        vec![
            "├── src/ (1 files)",
            "│   └── main.rs",
            "└── README.md",
            "",
            "Total: 2 files, 1 directories",
        ]
    );
}

#[test]
fn change_directory_moves_relative_resolution() {
    let fixture = Fixture::new();
    fs::create_dir(fixture.dir.path().join("inner")).expect("mkdir");
    fs::write(fixture.dir.path().join("inner/x.txt"), "inside").expect("write");
    let mut deps = RecordingDeps::default();

    let changed = fixture
        .call("change_directory", json!({ "path": "inner" }), &mut deps)
        .expect("changed");
    assert!(changed.starts_with("Changed directory to: "), "{changed}");

    let content = fixture
        .call("read_file", json!({ "filepath": "x.txt" }), &mut deps)
        .expect("read");
    assert_eq!(content, "inside");

    let failed = fixture
        .call("change_directory", json!({ "path": "x.txt" }), &mut deps)
        .expect("error text");
    assert!(failed.starts_with("Error: "), "{failed}");
}

#[test]
fn unknown_tools_and_bad_arguments_ask_for_a_retry() {
    let fixture = Fixture::new();
    let mut deps = RecordingDeps::default();

    assert!(matches!(
        fixture.call("delete_everything", json!({}), &mut deps),
        Err(ToolError::Retry(message)) if message.starts_with("Unknown tool name: delete_everything")
    ));
    assert!(matches!(
        fixture.call("read_file", json!({ "path": 3 }), &mut deps),
        Err(ToolError::Retry(message)) if message.starts_with("Invalid arguments for read_file")
    ));
}

#[test]
fn find_matches_names_and_skips_ignored_paths() {
    let fixture = Fixture::new();
    let root = fixture.dir.path();
    fs::create_dir_all(root.join("src")).expect("mkdir src");
    fs::create_dir_all(root.join("target/debug")).expect("mkdir target");
    fs::create_dir_all(root.join(".cache")).expect("mkdir hidden");
    fs::write(root.join("src/main.rs"), "fn main() {}").expect("write");
    fs::write(root.join("src/lib.rs"), "").expect("write");
    fs::write(root.join("target/debug/build.rs"), "").expect("write");
    fs::write(root.join(".cache/stale.rs"), "").expect("write");
    fs::write(root.join(".gitignore"), "generated.rs\n").expect("write");
    fs::write(root.join("generated.rs"), "").expect("write");
    fs::write(root.join("notes.txt"), "").expect("write");
    let mut deps = RecordingDeps::default();

    let files = fixture
        .call("find", json!({ "pattern": "*.rs" }), &mut deps)
        .expect("find files");
    assert_eq!(files, "src/lib.rs\nsrc/main.rs");
    assert_eq!(deps.statuses, vec!["Find(., pattern=*.rs)".to_string()]);

    let dirs = fixture
        .call("find", json!({ "pattern": "s*", "dirs": true }), &mut deps)
        .expect("find dirs");
    assert_eq!(dirs, "src");

    let shallow = fixture
        .call("find", json!({ "pattern": "*.rs", "max_depth": 1 }), &mut deps)
        .expect("find shallow");
    assert_eq!(shallow, NO_RESULTS);
    assert!(deps.confirmations.is_empty());
}

#[test]
fn grep_reports_path_line_and_text() {
    let fixture = Fixture::new();
    let root = fixture.dir.path();
    fs::create_dir_all(root.join("src")).expect("mkdir src");
    fs::write(root.join("src/main.rs"), "fn main() {\n    todo!()\n}\n").expect("write");
    fs::write(root.join("notes.txt"), "TODO: write\nnothing\n").expect("write");
    fs::write(root.join("logo.png"), "TODO").expect("write");
    let mut deps = RecordingDeps::default();

    let all = fixture
        .call("grep", json!({ "pattern": "todo", "case_sensitive": false }), &mut deps)
        .expect("grep");
    assert_eq!(all, "notes.txt:1:TODO: write\nsrc/main.rs:2:    todo!()");

    let exact = fixture
        .call("grep", json!({ "pattern": "TODO" }), &mut deps)
        .expect("grep");
    assert_eq!(exact, "notes.txt:1:TODO: write");

    let rust_only = fixture
        .call(
            "grep",
            json!({ "pattern": "todo", "case_sensitive": false, "include_pattern": "*.rs" }),
            &mut deps,
        )
        .expect("grep");
    assert_eq!(rust_only, "src/main.rs:2:    todo!()");

    let limited = fixture
        .call(
            "grep",
            json!({ "pattern": "todo", "case_sensitive": false, "max_results": 1 }),
            &mut deps,
        )
        .expect("grep");
    assert_eq!(limited, "notes.txt:1:TODO: write\n... (showing first 1 results)");

    let invalid = fixture
        .call("grep", json!({ "pattern": "(" }), &mut deps)
        .expect("error text");
    assert!(invalid.starts_with("Invalid regex pattern"), "{invalid}");

    let empty = fixture
        .call("grep", json!({ "pattern": "" }), &mut deps)
        .expect("error text");
    assert_eq!(empty, "Error: Pattern cannot be empty");
}

fn git_available() -> bool {
    std::process::Command::new("git")
        .arg("--version")
        .output()
        .map(|output| output.status.success())
        .unwrap_or(false)
}

fn git_in(dir: &Path, args: &[&str]) -> String {
    let output = std::process::Command::new("git")
        .args(args)
        .current_dir(dir)
        .output()
        .expect("run git");
    assert!(output.status.success(), "git {args:?} failed");
    String::from_utf8_lossy(&output.stdout).into_owned()
}

fn init_repo(dir: &Path) {
    git_in(dir, &["init", "-q"]);
    git_in(dir, &["config", "user.email", "dev@example.com"]);
    git_in(dir, &["config", "user.name", "Dev"]);
    git_in(dir, &["config", "commit.gpgsign", "false"]);
}

#[test]
fn git_add_and_commit_are_confirmed() {
    if !git_available() {
        return;
    }
    let fixture = Fixture::new();
    let root = fixture.dir.path();
    init_repo(root);
    let mut deps = RecordingDeps {
        approve: true,
        ..RecordingDeps::default()
    };

    let nothing = fixture
        .call("git_add", json!({ "files": "." }), &mut deps)
        .expect("git add");
    assert_eq!(nothing, "No changes to stage");

    fs::write(root.join("a.txt"), "a").expect("write");
    fs::write(root.join("b.txt"), "b").expect("write");
    let staged = fixture
        .call("git_add", json!({ "files": "a.txt" }), &mut deps)
        .expect("git add");
    assert_eq!(staged, "Successfully staged 1 file(s)");
    assert_eq!(deps.confirmations[0].title, "git_add");
    assert_eq!(
        deps.confirmations[0].preview,
        Preview::Text("?? a.txt".to_string())
    );

    let committed = fixture
        .call("git_commit", json!({ "message": "add a" }), &mut deps)
        .expect("git commit");
    assert!(committed.starts_with("Successfully created commit: "), "{committed}");
    assert!(committed.contains("add a"), "{committed}");
    assert_eq!(deps.confirmations[1].title, "git_commit");
    assert!(matches!(
        &deps.confirmations[1].preview,
        Preview::Text(text) if text.starts_with("Message: add a\n\nStaged changes:\n\nA  a.txt")
    ));

    let again = fixture
        .call("git_commit", json!({ "message": "empty" }), &mut deps)
        .expect("git commit");
    assert_eq!(again, "No staged changes to commit");
    assert_eq!(deps.confirmations.len(), 2);
    assert!(deps.statuses.is_empty());
}

#[test]
fn denied_git_add_stages_nothing() {
    if !git_available() {
        return;
    }
    let fixture = Fixture::new();
    let root = fixture.dir.path();
    init_repo(root);
    fs::write(root.join("a.txt"), "a").expect("write");
    let mut deps = RecordingDeps::default();

    let outcome = fixture.call("git_add", json!({ "files": "." }), &mut deps);

    assert_eq!(outcome, Err(ToolError::Cancelled(DENIED_BY_USER.to_string())));
    assert_eq!(git_in(root, &["status", "--porcelain"]), "?? a.txt\n");
}

#[test]
fn git_outside_a_repository_asks_for_a_retry() {
    if !git_available() {
        return;
    }
    let fixture = Fixture::new();
    let mut deps = RecordingDeps::default();

    let outcome = fixture.call("git_add", json!({ "files": "." }), &mut deps);

    assert!(
        matches!(&outcome, Err(ToolError::Retry(message)) if message.starts_with("Git add failed: ")),
        "{outcome:?}"
    );
}
