//! Configuration resolution for aipr-rank
//!
//! The OpenRouter API key is resolved with ENV → TOML priority.

use crate::services::{OpenRouterClient, QualitativeExtractor};
use aipr_common::config::{is_valid_key, TomlConfig};
use std::sync::Arc;
use tracing::{info, warn};

/// Environment variables holding the OpenRouter key, in priority order
pub const API_KEY_ENV_VARS: [&str; 2] = ["AIPR_OPENROUTER_API_KEY", "OPENROUTER_API_KEY"];

/// Resolve the OpenRouter API key
///
/// Returns `None` when no source holds a usable key; AI analysis is then
/// unavailable but everything else works.
pub fn resolve_openrouter_api_key(toml_config: &TomlConfig) -> Option<String> {
    let env_keys: Vec<(&str, String)> = API_KEY_ENV_VARS
        .iter()
        .filter_map(|var| {
            std::env::var(var)
                .ok()
                .filter(|k| is_valid_key(k))
                .map(|k| (*var, k))
        })
        .collect();
    let toml_key = toml_config
        .ai
        .api_key
        .as_ref()
        .filter(|k| is_valid_key(k));

    let mut sources: Vec<&str> = env_keys.iter().map(|(var, _)| *var).collect();
    if toml_key.is_some() {
        sources.push("TOML");
    }
    if sources.len() > 1 {
        warn!(
            "OpenRouter API key found in multiple sources: {}. Using {} (highest priority).",
            sources.join(", "),
            sources[0]
        );
    }

    if let Some((var, key)) = env_keys.into_iter().next() {
        info!("OpenRouter API key loaded from {}", var);
        return Some(key);
    }
    if let Some(key) = toml_key {
        info!("OpenRouter API key loaded from TOML config");
        return Some(key.clone());
    }
    None
}

/// Build the qualitative extractor when a key is configured
pub fn build_extractor(toml_config: &TomlConfig) -> Option<Arc<dyn QualitativeExtractor>> {
    let key = resolve_openrouter_api_key(toml_config)?;
    match OpenRouterClient::new(
        key,
        toml_config.ai.model.clone(),
        toml_config.ai.base_url.clone(),
    ) {
        Ok(client) => {
            info!(model = %client.model(), "AI qualitative analysis available");
            Some(Arc::new(client))
        }
        Err(e) => {
            warn!("AI qualitative analysis disabled: {}", e);
            None
        }
    }
}
