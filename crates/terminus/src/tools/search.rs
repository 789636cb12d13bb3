use std::fs;
use std::path::Path;

use agent_provider::{ToolError, ToolOutcome};
use globset::{GlobBuilder, GlobMatcher};
use ignore::{DirEntry, Walk, WalkBuilder};
use regex::RegexBuilder;
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::debug;

use super::directory::EXCLUDED_DIRS;
use super::{limit_output, parse_args, Tool, ToolContext};

pub const NO_RESULTS: &str = "No results found.";

const BINARY_EXTENSIONS: &[&str] = &[
    "png", "jpg", "jpeg", "gif", "bmp", "ico", "webp", "pdf", "zip", "tar", "gz", "bz2", "7z",
    "rar", "jar", "mp3", "mp4", "mov", "wav", "exe", "dll", "so", "dylib", "db", "sqlite", "bin",
    "pyc", "class", "o", "a",
];

fn default_directory() -> String {
    ".".to_string()
}

fn default_pattern() -> String {
    "*".to_string()
}

fn default_case_sensitive() -> bool {
    true
}

/// Walks `root` in name order, honouring `.gitignore` and skipping hidden
/// entries and common build directories.
fn walk(root: &Path, max_depth: Option<usize>) -> Walk {
    let mut builder = WalkBuilder::new(root);
    builder
        .hidden(true)
        .git_ignore(true)
        .require_git(false)
        .max_depth(max_depth)
        .filter_entry(|entry| {
            let name = entry.file_name().to_string_lossy();
            entry.depth() == 0 || !EXCLUDED_DIRS.contains(&&*name)
        })
        .sort_by_file_name(|a, b| a.cmp(b));
    builder.build()
}

fn relative(entry: &DirEntry, root: &Path) -> String {
    let path = entry.path();
    path.strip_prefix(root).unwrap_or(path).display().to_string()
}

fn name_matcher(pattern: &str) -> Result<GlobMatcher, ToolError> {
    GlobBuilder::new(pattern)
        .literal_separator(true)
        .build()
        .map(|glob| glob.compile_matcher())
        .map_err(|error| ToolError::Retry(format!("Invalid pattern '{pattern}': {error}")))
}

fn is_binary_name(path: &Path) -> bool {
    path.extension()
        .and_then(|extension| extension.to_str())
        .is_some_and(|extension| BINARY_EXTENSIONS.contains(&extension.to_ascii_lowercase().as_str()))
}

#[derive(Debug, Deserialize)]
struct FindArgs {
    #[serde(default = "default_directory")]
    directory: String,
    #[serde(default = "default_pattern")]
    pattern: String,
    #[serde(default)]
    dirs: bool,
    #[serde(default)]
    max_depth: Option<usize>,
}

pub struct Find;

impl Tool for Find {
    fn name(&self) -> &'static str {
        "find"
    }

    fn description(&self) -> &'static str {
        "Find files (or directories with dirs=true) whose name matches a shell-style wildcard pattern."
    }

    fn input_schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "directory": { "type": "string" },
                "pattern": { "type": "string" },
                "dirs": { "type": "boolean" },
                "max_depth": { "type": "integer", "minimum": 1 },
            },
        })
    }

    fn call(&self, arguments: Value, ctx: &mut ToolContext<'_>) -> ToolOutcome {
        let args: FindArgs = parse_args(self.name(), arguments)?;
        let mut details = vec![args.directory.clone(), format!("pattern={}", args.pattern)];
        if args.dirs {
            details.push("dirs=true".to_string());
        }
        if let Some(depth) = args.max_depth {
            details.push(format!("depth={depth}"));
        }
        ctx.status("Find", &details);

        let root = ctx.env.working_directory.resolve(&args.directory);
        if !root.is_dir() {
            return Ok(format!("Error: Directory does not exist: {}", args.directory));
        }
        let matcher = name_matcher(&args.pattern)?;

        let mut results = Vec::new();
        for entry in walk(&root, args.max_depth).filter_map(Result::ok) {
            if entry.depth() == 0 {
                continue;
            }
            let Some(kind) = entry.file_type() else {
                continue;
            };
            let wanted = if args.dirs { kind.is_dir() } else { kind.is_file() };
            if wanted && matcher.is_match(entry.file_name()) {
                results.push(relative(&entry, &root));
            }
        }

        debug!(matches = results.len(), "find finished");
        if results.is_empty() {
            return Ok(NO_RESULTS.to_string());
        }
        Ok(limit_output(results.join("\n")))
    }
}

#[derive(Debug, Deserialize)]
struct GrepArgs {
    #[serde(default = "default_directory")]
    directory: String,
    pattern: String,
    #[serde(default = "default_case_sensitive")]
    case_sensitive: bool,
    #[serde(default)]
    max_results: Option<usize>,
    #[serde(default)]
    include_pattern: Option<String>,
}

pub struct Grep;

impl Tool for Grep {
    fn name(&self) -> &'static str {
        "grep"
    }

    fn description(&self) -> &'static str {
        "Search file contents for a regex; results are 'path:line:text'."
    }

    fn input_schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "directory": { "type": "string" },
                "pattern": { "type": "string" },
                "case_sensitive": { "type": "boolean" },
                "max_results": { "type": "integer", "minimum": 1 },
                "include_pattern": { "type": "string" },
            },
            "required": ["pattern"],
        })
    }

    fn call(&self, arguments: Value, ctx: &mut ToolContext<'_>) -> ToolOutcome {
        let args: GrepArgs = parse_args(self.name(), arguments)?;
        if args.pattern.is_empty() {
            return Ok("Error: Pattern cannot be empty".to_string());
        }
        ctx.status(
            "Grep",
            &[args.directory.clone(), format!("pattern={}", args.pattern)],
        );

        let root = ctx.env.working_directory.resolve(&args.directory);
        if !root.is_dir() {
            return Ok(format!("Error: Directory does not exist: {}", args.directory));
        }
        let regex = match RegexBuilder::new(&args.pattern)
            .case_insensitive(!args.case_sensitive)
            .build()
        {
            Ok(regex) => regex,
            Err(error) => return Ok(format!("Invalid regex pattern: {error}")),
        };
        let include = args.include_pattern.as_deref().map(name_matcher).transpose()?;
        let limit = args.max_results.filter(|limit| *limit > 0);

        let mut results = Vec::new();
        'files: for entry in walk(&root, None).filter_map(Result::ok) {
            if !entry.file_type().is_some_and(|kind| kind.is_file()) || is_binary_name(entry.path())
            {
                continue;
            }
            if include
                .as_ref()
                .is_some_and(|include| !include.is_match(entry.file_name()))
            {
                continue;
            }
            let Ok(bytes) = fs::read(entry.path()) else {
                continue;
            };
            if bytes.contains(&0) {
                continue;
            }

            let content = String::from_utf8_lossy(&bytes);
            let path = relative(&entry, &root);
            for (index, line) in content.lines().enumerate() {
                if !regex.is_match(line) {
                    continue;
                }
                if let Some(limit) = limit {
                    if results.len() >= limit {
                        results.push(format!("... (showing first {limit} results)"));
                        break 'files;
                    }
                }
                results.push(format!("{path}:{}:{}", index + 1, line.trim_end()));
            }
        }

        debug!(matches = results.len(), "grep finished");
        if results.is_empty() {
            return Ok(NO_RESULTS.to_string());
        }
        Ok(limit_output(results.join("\n")))
    }
}
