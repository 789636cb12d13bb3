//! Process-wide session state.
//!
//! The scheduler thread is the only mutator of [`Session`]. The two pieces tools
//! need from the request worker (working directory and command allow-list) are
//! shared cells handed out by clone.

use std::collections::BTreeSet;
use std::env;
use std::fs;
use std::io;
use std::path::{Component, Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, PoisonError, RwLock};

use agent_provider::RunMessage;
use thiserror::Error;

use crate::controller::TaskHandle;

#[derive(Debug, Error)]
pub enum SessionError {
    #[error("Directory does not exist: {0}")]
    NotFound(String),
    #[error("Not a directory: {0}")]
    NotADirectory(String),
    #[error("Error changing directory to {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: io::Error,
    },
}

/// Working directory used to resolve relative tool arguments.
#[derive(Debug, Clone)]
pub struct WorkingDirectory {
    path: Arc<RwLock<PathBuf>>,
    sync_process: bool,
}

impl WorkingDirectory {
    /// Tracks `path` and mirrors every change into the process working directory.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: Arc::new(RwLock::new(path.into())),
            sync_process: true,
        }
    }

    /// Tracks `path` without ever touching the process working directory.
    pub fn detached(path: impl Into<PathBuf>) -> Self {
        Self {
            path: Arc::new(RwLock::new(path.into())),
            sync_process: false,
        }
    }

    #[must_use]
    pub fn get(&self) -> PathBuf {
        self.path
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Absolute paths are kept; relative ones are joined onto the working directory.
    /// `.` and `..` components are folded lexically.
    #[must_use]
    pub fn resolve(&self, path: &str) -> PathBuf {
        let candidate = Path::new(path);
        if candidate.is_absolute() {
            normalize(candidate)
        } else {
            normalize(&self.get().join(candidate))
        }
    }

    /// Validates the target before mutating anything.
    pub fn change(&self, path: &str) -> Result<PathBuf, SessionError> {
        let target = self.resolve(path);
        let metadata = fs::metadata(&target).map_err(|source| {
            if source.kind() == io::ErrorKind::NotFound {
                SessionError::NotFound(path.to_string())
            } else {
                SessionError::Io {
                    path: path.to_string(),
                    source,
                }
            }
        })?;
        if !metadata.is_dir() {
            return Err(SessionError::NotADirectory(path.to_string()));
        }

        let canonical = target.canonicalize().map_err(|source| SessionError::Io {
            path: path.to_string(),
            source,
        })?;
        if self.sync_process {
            env::set_current_dir(&canonical).map_err(|source| SessionError::Io {
                path: path.to_string(),
                source,
            })?;
        }

        *self.path.write().unwrap_or_else(PoisonError::into_inner) = canonical.clone();
        Ok(canonical)
    }
}

fn normalize(path: &Path) -> PathBuf {
    let mut normalized = PathBuf::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                normalized.pop();
            }
            other => normalized.push(other.as_os_str()),
        }
    }
    normalized
}

/// Command names that run without confirmation.
#[derive(Debug, Clone, Default)]
pub struct CommandAllowList {
    commands: Arc<Mutex<BTreeSet<String>>>,
}

impl CommandAllowList {
    pub fn new<I, S>(commands: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let list = Self::default();
        list.extend(commands);
        list
    }

    /// True when every name is allowed. An empty slice is never allowed.
    #[must_use]
    pub fn allows_all(&self, names: &[String]) -> bool {
        if names.is_empty() {
            return false;
        }
        let commands = self.commands.lock().unwrap_or_else(PoisonError::into_inner);
        names.iter().all(|name| commands.contains(name))
    }

    pub fn extend<I, S>(&self, names: I)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.commands
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .extend(names.into_iter().map(Into::into));
    }

    #[must_use]
    pub fn snapshot(&self) -> Vec<String> {
        self.commands
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .cloned()
            .collect()
    }
}

pub struct Session {
    /// Conversation history, in the order entries were observed.
    pub messages: Vec<RunMessage>,
    current_task: Option<TaskHandle>,
    sigint_received: Arc<AtomicBool>,
    confirmation_enabled: bool,
    disabled_confirmations: BTreeSet<String>,
    allowed_commands: CommandAllowList,
    working_directory: WorkingDirectory,
    project_guide: Option<String>,
    model_id: String,
    debug: bool,
}

impl Session {
    pub fn new(working_directory: WorkingDirectory, model_id: impl Into<String>) -> Self {
        Self {
            messages: Vec::new(),
            current_task: None,
            sigint_received: Arc::new(AtomicBool::new(false)),
            confirmation_enabled: true,
            disabled_confirmations: BTreeSet::new(),
            allowed_commands: CommandAllowList::default(),
            working_directory,
            project_guide: None,
            model_id: model_id.into(),
            debug: false,
        }
    }

    #[must_use]
    pub fn with_allowed_commands(mut self, allowed_commands: CommandAllowList) -> Self {
        self.allowed_commands = allowed_commands;
        self
    }

    #[must_use]
    pub fn with_project_guide(mut self, guide: Option<String>) -> Self {
        self.project_guide = guide;
        self
    }

    #[must_use]
    pub fn with_debug(mut self, debug: bool) -> Self {
        self.debug = debug;
        self
    }

    #[must_use]
    pub fn model_id(&self) -> &str {
        &self.model_id
    }

    #[must_use]
    pub fn debug_enabled(&self) -> bool {
        self.debug
    }

    #[must_use]
    pub fn project_guide(&self) -> Option<&str> {
        self.project_guide.as_deref()
    }

    #[must_use]
    pub fn working_directory(&self) -> &WorkingDirectory {
        &self.working_directory
    }

    #[must_use]
    pub fn allowed_commands(&self) -> &CommandAllowList {
        &self.allowed_commands
    }

    #[must_use]
    pub fn resolve_path(&self, path: &str) -> PathBuf {
        self.working_directory.resolve(path)
    }

    pub fn change_directory(&self, path: &str) -> Result<PathBuf, SessionError> {
        self.working_directory.change(path)
    }

    /// History handed to the engine: the project guide (if any) followed by the
    /// conversation so far. The guide is never stored in `messages`.
    #[must_use]
    pub fn history_snapshot(&self) -> Vec<RunMessage> {
        let mut history = Vec::with_capacity(self.messages.len() + 1);
        if let Some(guide) = self.project_guide.as_deref() {
            history.push(RunMessage::user_prompt(guide));
        }
        history.extend(self.messages.iter().cloned());
        history
    }

    #[must_use]
    pub fn current_task(&self) -> Option<&TaskHandle> {
        self.current_task.as_ref()
    }

    #[must_use]
    pub fn is_busy(&self) -> bool {
        self.current_task.is_some()
    }

    pub(crate) fn set_current_task(&mut self, task: TaskHandle) {
        self.current_task = Some(task);
    }

    pub(crate) fn take_current_task(&mut self) -> Option<TaskHandle> {
        self.current_task.take()
    }

    /// Flag shared with the signal bridge.
    #[must_use]
    pub fn sigint_flag(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.sigint_received)
    }

    #[must_use]
    pub fn sigint_received(&self) -> bool {
        self.sigint_received.load(Ordering::SeqCst)
    }

    pub fn clear_sigint(&self) {
        self.sigint_received.store(false, Ordering::SeqCst);
    }

    #[must_use]
    pub fn confirmation_enabled(&self) -> bool {
        self.confirmation_enabled
    }

    /// Re-enabling confirmations forgets every per-tool exemption.
    pub fn set_confirmation_enabled(&mut self, enabled: bool) {
        if enabled && !self.confirmation_enabled {
            self.disabled_confirmations.clear();
        }
        self.confirmation_enabled = enabled;
    }

    /// Flips confirmation mode and returns the new value.
    pub fn toggle_confirmation(&mut self) -> bool {
        self.set_confirmation_enabled(!self.confirmation_enabled);
        self.confirmation_enabled
    }

    pub fn disable_confirmation(&mut self, tool_name: impl Into<String>) {
        self.disabled_confirmations.insert(tool_name.into());
    }

    #[must_use]
    pub fn disabled_confirmations(&self) -> &BTreeSet<String> {
        &self.disabled_confirmations
    }

    /// True when `tool_name` may run without asking.
    #[must_use]
    pub fn skips_confirmation(&self, tool_name: &str) -> bool {
        !self.confirmation_enabled || self.disabled_confirmations.contains(tool_name)
    }
}
