use std::fs;
use std::path::Path;

use agent_provider::ToolOutcome;
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::debug;

use super::{limit_output, parse_args, Tool, ToolContext};

const DEFAULT_MAX_DEPTH: usize = 3;

pub(super) const EXCLUDED_DIRS: &[&str] = &[
    ".git",
    ".hg",
    ".svn",
    "node_modules",
    "vendor",
    "target",
    "__pycache__",
    ".venv",
    "venv",
    "dist",
    "build",
];

const VISIBLE_DOTFILES: &[&str] = &[".gitignore", ".env.example"];

#[derive(Debug, Deserialize)]
struct ListDirectoryArgs {
    #[serde(default)]
    path: Option<String>,
    #[serde(default)]
    max_depth: Option<usize>,
}

pub struct ListDirectory;

impl Tool for ListDirectory {
    fn name(&self) -> &'static str {
        "list_directory"
    }

    fn description(&self) -> &'static str {
        "List directory contents as a tree, skipping hidden files and common build directories."
    }

    fn input_schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "path": { "type": "string" },
                "max_depth": { "type": "integer", "minimum": 1 },
            },
        })
    }

    fn call(&self, arguments: Value, ctx: &mut ToolContext<'_>) -> ToolOutcome {
        let args: ListDirectoryArgs = parse_args(self.name(), arguments)?;
        let max_depth = args.max_depth.unwrap_or(DEFAULT_MAX_DEPTH).max(1);
        let path = ctx
            .env
            .working_directory
            .resolve(args.path.as_deref().unwrap_or("."));
        let display = path.display().to_string();
        ctx.status("List", &[display.clone(), format!("depth={max_depth}")]);

        if !path.exists() {
            return Ok(format!("Error: Path does not exist: {display}"));
        }
        if !path.is_dir() {
            return Ok(format!("Error: Path is not a directory: {display}"));
        }

        let mut lines = vec![display];
        let mut totals = Totals::default();
        walk(&path, max_depth, 0, "", &mut lines, &mut totals);
        lines.push(String::new());
        lines.push(format!(
            "Total: {} files, {} directories",
            totals.files, totals.dirs
        ));
        Ok(limit_output(lines.join("\n")))
    }
}

#[derive(Debug, Default)]
struct Totals {
    files: usize,
    dirs: usize,
}

struct Entry {
    name: String,
    is_dir: bool,
    file_count: usize,
}

fn is_listed(name: &str) -> bool {
    if EXCLUDED_DIRS.contains(&name) {
        return false;
    }
    !name.starts_with('.') || VISIBLE_DOTFILES.contains(&name)
}

fn read_entries(dir: &Path) -> Result<Vec<Entry>, String> {
    let read = fs::read_dir(dir).map_err(|error| match error.kind() {
        std::io::ErrorKind::PermissionDenied => format!("Permission denied: {}", dir.display()),
        _ => format!("Error reading directory: {error}"),
    })?;

    let mut entries: Vec<Entry> = read
        .filter_map(Result::ok)
        .filter_map(|entry| {
            let name = entry.file_name().to_string_lossy().into_owned();
            if !is_listed(&name) {
                return None;
            }
            let is_dir = entry.file_type().map(|kind| kind.is_dir()).unwrap_or(false);
            let file_count = if is_dir {
                count_visible_files(&entry.path())
            } else {
                0
            };
            Some(Entry {
                name,
                is_dir,
                file_count,
            })
        })
        .collect();

    entries.sort_by(|a, b| {
        b.is_dir
            .cmp(&a.is_dir)
            .then_with(|| a.name.to_lowercase().cmp(&b.name.to_lowercase()))
    });
    Ok(entries)
}

fn count_visible_files(dir: &Path) -> usize {
    fs::read_dir(dir)
        .map(|read| {
            read.filter_map(Result::ok)
                .filter(|entry| {
                    !entry.file_name().to_string_lossy().starts_with('.')
                        && entry.file_type().map(|kind| !kind.is_dir()).unwrap_or(false)
                })
                .count()
        })
        .unwrap_or(0)
}

fn walk(
    dir: &Path,
    max_depth: usize,
    depth: usize,
    prefix: &str,
    lines: &mut Vec<String>,
    totals: &mut Totals,
) {
    if depth >= max_depth {
        return;
    }

    let entries = match read_entries(dir) {
        Ok(entries) => entries,
        Err(message) => {
            debug!(dir = %dir.display(), %message, "listing failed");
            lines.push(format!("{prefix}{message}"));
            return;
        }
    };

    let last_index = entries.len().saturating_sub(1);
    for (index, entry) in entries.iter().enumerate() {
        let is_last = index == last_index;
        let branch = if is_last { "└── " } else { "├── " };
        let label = match (entry.is_dir, entry.file_count) {
            (true, 0) => format!("{}/", entry.name),
            (true, count) => format!("{}/ ({count} files)", entry.name),
            (false, _) => entry.name.clone(),
        };
        lines.push(format!("{prefix}{branch}{label}"));

        if entry.is_dir {
            totals.dirs += 1;
            let child_prefix = format!("{prefix}{}", if is_last { "    " } else { "│   " });
            walk(
                &dir.join(&entry.name),
                max_depth,
                depth + 1,
                &child_prefix,
                lines,
                totals,
            );
        } else {
            totals.files += 1;
        }
    }
}

#[derive(Debug, Deserialize)]
struct ChangeDirectoryArgs {
    path: String,
}

pub struct ChangeDirectory;

impl Tool for ChangeDirectory {
    fn name(&self) -> &'static str {
        "change_directory"
    }

    fn description(&self) -> &'static str {
        "Change the working directory used for relative paths and commands."
    }

    fn input_schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": { "path": { "type": "string" } },
            "required": ["path"],
        })
    }

    fn call(&self, arguments: Value, ctx: &mut ToolContext<'_>) -> ToolOutcome {
        let args: ChangeDirectoryArgs = parse_args(self.name(), arguments)?;
        ctx.status("Navigate", &[args.path.clone()]);

        Ok(match ctx.env.working_directory.change(&args.path) {
            Ok(path) => format!("Changed directory to: {}", path.display()),
            Err(error) => format!("Error: {error}"),
        })
    }
}

pub struct GetCurrentDirectory;

impl Tool for GetCurrentDirectory {
    fn name(&self) -> &'static str {
        "get_current_directory"
    }

    fn description(&self) -> &'static str {
        "Return the current working directory."
    }

    fn input_schema(&self) -> Value {
        json!({ "type": "object", "properties": {} })
    }

    fn call(&self, _arguments: Value, ctx: &mut ToolContext<'_>) -> ToolOutcome {
        ctx.status("PWD", &["Current Directory".to_string()]);
        Ok(format!(
            "Current working directory: {}",
            ctx.env.working_directory.get().display()
        ))
    }
}
