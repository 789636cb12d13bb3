//! User configuration: `~/.config/terminus.json`.

use std::collections::BTreeMap;
use std::env;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

use crate::tools::DEFAULT_COMMAND_TIMEOUT;

pub const CONFIG_PATH_ENV_VAR: &str = "TERMINUS_CONFIG";
pub const COMMAND_TIMEOUT_ENV_VAR: &str = "TERMINUS_COMMAND_TIMEOUT";
pub const DEFAULT_MODEL: &str = "mock";

const DEFAULT_ALLOWED_COMMANDS: [&str; 29] = [
    "ls", "cat", "grep", "rg", "find", "pwd", "echo", "which", "head", "tail", "wc", "sort",
    "uniq", "diff", "tree", "file", "stat", "du", "df", "ps", "top", "env", "date", "whoami",
    "hostname", "uname", "id", "groups", "history",
];

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Cannot read config file at {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("Invalid JSON in config file at {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
    #[error("'default_model' in {path} must not be empty")]
    EmptyModel { path: PathBuf },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct UserConfig {
    pub default_model: String,
    /// Exported into the process environment at startup.
    pub env: BTreeMap<String, String>,
    pub settings: Settings,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub allowed_commands: Vec<String>,
    pub command_timeout_secs: u64,
}

impl Default for UserConfig {
    fn default() -> Self {
        Self {
            default_model: DEFAULT_MODEL.to_string(),
            env: BTreeMap::new(),
            settings: Settings::default(),
        }
    }
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            allowed_commands: DEFAULT_ALLOWED_COMMANDS
                .iter()
                .map(|command| (*command).to_string())
                .collect(),
            command_timeout_secs: DEFAULT_COMMAND_TIMEOUT.as_secs(),
        }
    }
}

impl UserConfig {
    /// Loads the config from `$TERMINUS_CONFIG`, or `~/.config/terminus.json`.
    pub fn load() -> Result<Self, ConfigError> {
        match config_path() {
            Some(path) => Self::load_from(&path),
            None => Ok(Self::default()),
        }
    }

    /// Loads `path`; a missing file yields the defaults.
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        let content = match fs::read_to_string(path) {
            Ok(content) => content,
            Err(error) if error.kind() == io::ErrorKind::NotFound => {
                debug!(path = %path.display(), "no config file, using defaults");
                return Ok(Self::default());
            }
            Err(source) => {
                return Err(ConfigError::Read {
                    path: path.to_path_buf(),
                    source,
                })
            }
        };

        let config: Self = serde_json::from_str(&content).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })?;
        if config.default_model.trim().is_empty() {
            return Err(ConfigError::EmptyModel {
                path: path.to_path_buf(),
            });
        }
        debug!(path = %path.display(), model = %config.default_model, "config loaded");
        Ok(config)
    }

    /// Exports every `env` entry into the process environment.
    pub fn export_env(&self) {
        for (key, value) in &self.env {
            if key.is_empty() || key.contains('=') {
                debug!(%key, "skipping invalid environment key");
                continue;
            }
            env::set_var(key, value);
        }
    }

    /// Command timeout; `TERMINUS_COMMAND_TIMEOUT` (seconds) wins over the file.
    #[must_use]
    pub fn command_timeout(&self) -> Duration {
        let seconds = env::var(COMMAND_TIMEOUT_ENV_VAR)
            .ok()
            .and_then(|value| value.trim().parse::<u64>().ok())
            .unwrap_or(self.settings.command_timeout_secs);
        Duration::from_secs(seconds.max(1))
    }
}

fn config_path() -> Option<PathBuf> {
    if let Some(path) = env::var_os(CONFIG_PATH_ENV_VAR).filter(|path| !path.is_empty()) {
        return Some(PathBuf::from(path));
    }
    dirs::home_dir().map(|home| home.join(".config").join("terminus.json"))
}

#[cfg(test)]
mod tests {
    use std::fs;

    use pretty_assertions::assert_eq;

    use super::{ConfigError, UserConfig};

    #[test]
    fn missing_file_yields_defaults() {
        let dir = tempfile::tempdir().expect("tempdir");
        let config = UserConfig::load_from(&dir.path().join("terminus.json")).expect("defaults");
        assert_eq!(config, UserConfig::default());
        assert!(config.settings.allowed_commands.iter().any(|c| c == "ls"));
    }

    #[test]
    fn partial_file_keeps_default_settings() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("terminus.json");
        fs::write(&path, r#"{ "default_model": "mock-large", "env": { "A": "1" } }"#)
            .expect("write config");

        let config = UserConfig::load_from(&path).expect("config");
        assert_eq!(config.default_model, "mock-large");
        assert_eq!(config.env.get("A").map(String::as_str), Some("1"));
        assert_eq!(config.settings.command_timeout_secs, 30);
    }

    #[test]
    fn malformed_json_and_empty_model_are_errors() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("terminus.json");

        fs::write(&path, "{ not json").expect("write config");
        assert!(matches!(
            UserConfig::load_from(&path),
            Err(ConfigError::Parse { .. })
        ));

        fs::write(&path, r#"{ "default_model": "  " }"#).expect("write config");
        assert!(matches!(
            UserConfig::load_from(&path),
            Err(ConfigError::EmptyModel { .. })
        ));
    }
}
