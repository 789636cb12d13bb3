//! Environment configuration for terminal output.

use std::env;

#[derive(Debug, Clone)]
pub struct EnvConfig {
    pub no_spinner: bool,
    pub no_color: bool,
    pub debug: bool,
    pub log_file: Option<String>,
}

impl EnvConfig {
    pub fn from_env() -> Self {
        Self {
            no_spinner: env_flag("TERMINUS_NO_SPINNER"),
            no_color: env_flag("TERMINUS_NO_COLOR") || env_present("NO_COLOR"),
            debug: env_flag("TERMINUS_DEBUG"),
            log_file: env_string_opt("TERMINUS_LOG"),
        }
    }
}

fn env_flag(key: &str) -> bool {
    env::var(key).map(|value| value == "1").unwrap_or(false)
}

// https://no-color.org: any non-empty value disables color.
fn env_present(key: &str) -> bool {
    env::var(key).map(|value| !value.is_empty()).unwrap_or(false)
}

fn env_string_opt(key: &str) -> Option<String> {
    env::var(key).ok().and_then(|value| {
        if value.trim().is_empty() {
            None
        } else {
            Some(value)
        }
    })
}
