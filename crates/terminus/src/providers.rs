use std::sync::Arc;

use agent_provider::{ProviderInitError, RunProvider};
use agent_provider_mock::{MockProvider, MOCK_PROVIDER_ID};

use crate::config::UserConfig;

pub const PROVIDER_ENV_VAR: &str = "TERMINUS_PROVIDER";
pub const SYSTEM_INSTRUCTIONS_ENV_VAR: &str = "TERMINUS_SYSTEM_PROMPT";

pub const DEFAULT_SYSTEM_INSTRUCTIONS: &str = "You are terminus, an agent working in the user's terminal. \
Use the tools to inspect the working directory before changing anything. \
Prefer small, verifiable steps and explain what you did in plain language.";

pub fn provider_from_env(config: &UserConfig) -> Result<Arc<dyn RunProvider>, ProviderInitError> {
    let provider_id = std::env::var(PROVIDER_ENV_VAR)
        .ok()
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty());

    provider_for_id(
        provider_id.as_deref().unwrap_or(MOCK_PROVIDER_ID),
        &config.default_model,
    )
}

pub fn provider_for_id(
    provider_id: &str,
    model_id: &str,
) -> Result<Arc<dyn RunProvider>, ProviderInitError> {
    match provider_id {
        MOCK_PROVIDER_ID => Ok(Arc::new(MockProvider::default().with_model_id(model_id))),
        unknown => Err(ProviderInitError::new(format!(
            "Unsupported provider '{unknown}'. Available providers: {MOCK_PROVIDER_ID}"
        ))),
    }
}

pub fn system_instructions_from_env() -> String {
    sanitize_system_instructions(std::env::var(SYSTEM_INSTRUCTIONS_ENV_VAR).ok())
}

fn sanitize_system_instructions(raw: Option<String>) -> String {
    let Some(value) = raw else {
        return DEFAULT_SYSTEM_INSTRUCTIONS.to_string();
    };

    let trimmed = value.trim();
    if trimmed.is_empty() {
        DEFAULT_SYSTEM_INSTRUCTIONS.to_string()
    } else {
        trimmed.to_string()
    }
}
