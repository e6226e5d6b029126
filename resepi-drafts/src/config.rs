//! LLM configuration resolution
//!
//! **Priority:** Database → ENV → TOML for the API key; model and
//! rate limit come from database settings, base URL from ENV → TOML.

use resepi_common::config::TomlConfig;
use resepi_common::db::settings;
use sqlx::SqlitePool;
use tracing::{info, warn};

use crate::error::{DraftError, DraftResult};

pub const ENV_API_KEY: &str = "RESEPI_LLM_API_KEY";
pub const ENV_BASE_URL: &str = "RESEPI_LLM_BASE_URL";
pub const DEFAULT_BASE_URL: &str = "https://api.openai.com/v1";

/// Everything the client needs to talk to the completions endpoint
#[derive(Debug, Clone)]
pub struct LlmConfig {
    pub api_key: String,
    pub base_url: String,
    pub model: String,
    pub rate_limit_ms: u64,
}

/// Validate API key (non-empty, non-whitespace)
pub fn is_valid_key(key: &str) -> bool {
    !key.trim().is_empty()
}

/// Resolve the API key from the three sources
pub async fn resolve_api_key(db: &SqlitePool, toml_config: &TomlConfig) -> DraftResult<String> {
    let db_key = settings::get_llm_api_key(db).await?.filter(|k| is_valid_key(k));
    let env_key = std::env::var(ENV_API_KEY).ok().filter(|k| is_valid_key(k));
    let toml_key = toml_config.llm_api_key.clone().filter(|k| is_valid_key(k));

    let sources: Vec<&str> = [
        db_key.as_ref().map(|_| "database"),
        env_key.as_ref().map(|_| "environment"),
        toml_key.as_ref().map(|_| "TOML"),
    ]
    .into_iter()
    .flatten()
    .collect();

    if sources.len() > 1 {
        warn!(
            "LLM API key found in multiple sources: {}. Using {} (highest priority).",
            sources.join(", "),
            sources[0]
        );
    }

    if let Some(key) = db_key {
        info!("LLM API key loaded from database");
        return Ok(key.trim().to_string());
    }
    if let Some(key) = env_key {
        info!("LLM API key loaded from environment variable");
        return Ok(key.trim().to_string());
    }
    if let Some(key) = toml_key {
        info!("LLM API key loaded from TOML config");
        return Ok(key.trim().to_string());
    }

    Err(DraftError::MissingApiKey)
}

/// Resolve the full client configuration
pub async fn resolve_llm_config(db: &SqlitePool, toml_config: &TomlConfig) -> DraftResult<LlmConfig> {
    let api_key = resolve_api_key(db, toml_config).await?;

    let base_url = std::env::var(ENV_BASE_URL)
        .ok()
        .filter(|u| !u.trim().is_empty())
        .or_else(|| toml_config.llm_base_url.clone())
        .unwrap_or_else(|| DEFAULT_BASE_URL.to_string());

    let model = match settings::get_setting::<String>(db, settings::LLM_MODEL).await? {
        Some(model) if !model.trim().is_empty() => model,
        _ => toml_config
            .llm_model
            .clone()
            .unwrap_or_else(|| "gpt-4o-mini".to_string()),
    };

    let rate_limit_ms = settings::get_setting_or(db, settings::LLM_RATE_LIMIT_MS, 1000u64).await?;

    Ok(LlmConfig {
        api_key,
        base_url: base_url.trim_end_matches('/').to_string(),
        model,
        rate_limit_ms,
    })
}
