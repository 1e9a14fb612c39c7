//! The model/provider catalog.
//!
//! A static configuration table keyed by model identifier. Each model
//! resolves to a provider entry (base endpoint, credential env var) plus
//! feature flags such as "emits reasoning text". Resolution failures are
//! configuration errors: they are reported before any agent iteration is
//! consumed.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::ConfigError;

/// Configuration for one chat-completion backend.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProviderEntry {
    pub name: String,
    pub base_url: String,
    /// Environment variable holding the API key. Empty means none needed.
    pub api_key_env: String,
    /// Extra headers some gateways require (e.g. OpenRouter attribution).
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub extra_headers: Vec<(String, String)>,
}

/// Configuration for one model.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelEntry {
    pub id: String,
    /// Key into the provider table.
    pub provider: String,
    pub display_name: String,
    #[serde(default)]
    pub supports_reasoning: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_tokens: Option<u32>,
}

/// A model resolved against its provider, credential included.
#[derive(Debug, Clone)]
pub struct ResolvedModel {
    pub model: ModelEntry,
    pub provider: ProviderEntry,
    pub api_key: String,
}

pub const DEFAULT_MODEL: &str = "deepseek-reasoner";

/// The catalog of known models and providers.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Catalog {
    pub providers: HashMap<String, ProviderEntry>,
    pub models: HashMap<String, ModelEntry>,
}

impl Catalog {
    /// The built-in table: DeepSeek direct plus OpenRouter-routed models.
    pub fn builtin() -> Self {
        let mut providers = HashMap::new();
        providers.insert(
            "deepseek".to_string(),
            ProviderEntry {
                name: "DeepSeek".into(),
                base_url: "https://api.deepseek.com".into(),
                api_key_env: "DEEPSEEK_API_KEY".into(),
                extra_headers: Vec::new(),
            },
        );
        providers.insert(
            "openrouter".to_string(),
            ProviderEntry {
                name: "OpenRouter".into(),
                base_url: "https://openrouter.ai/api/v1".into(),
                api_key_env: "OPENROUTER_API_KEY".into(),
                extra_headers: Vec::new(),
            },
        );

        let mut models = HashMap::new();
        for (id, provider, display, reasoning) in [
            ("deepseek-reasoner", "deepseek", "DeepSeek Reasoner", true),
            ("deepseek-chat", "deepseek", "DeepSeek Chat", false),
            (
                "anthropic/claude-sonnet-4",
                "openrouter",
                "Anthropic Claude Sonnet 4",
                false,
            ),
            ("openai/gpt-4.1", "openrouter", "OpenAI GPT-4.1", false),
            (
                "openai/o3-mini-high",
                "openrouter",
                "OpenAI o3-mini-high",
                true,
            ),
            (
                "google/gemini-2.5-pro-preview",
                "openrouter",
                "Google Gemini 2.5 Pro Preview",
                true,
            ),
        ] {
            models.insert(
                id.to_string(),
                ModelEntry {
                    id: id.into(),
                    provider: provider.into(),
                    display_name: display.into(),
                    supports_reasoning: reasoning,
                    max_tokens: None,
                },
            );
        }

        Self { providers, models }
    }

    pub fn model(&self, id: &str) -> Option<&ModelEntry> {
        self.models.get(id)
    }

    /// All models, sorted by id for stable listings.
    pub fn all_models(&self) -> Vec<&ModelEntry> {
        let mut models: Vec<_> = self.models.values().collect();
        models.sort_by(|a, b| a.id.cmp(&b.id));
        models
    }

    /// Resolve a model id to its provider and credential.
    ///
    /// An unknown id or a missing API key is a configuration error, not a
    /// retryable one.
    pub fn resolve(&self, model_id: &str) -> Result<ResolvedModel, ConfigError> {
        let model = self
            .models
            .get(model_id)
            .ok_or_else(|| ConfigError::UnknownModel { model: model_id.into() })?
            .clone();

        let provider = self
            .providers
            .get(&model.provider)
            .ok_or_else(|| ConfigError::UnknownProvider { provider: model.provider.clone() })?
            .clone();

        let api_key = if provider.api_key_env.is_empty() {
            String::new()
        } else {
            std::env::var(&provider.api_key_env).map_err(|_| ConfigError::MissingApiKey {
                provider: provider.name.clone(),
                env_var: provider.api_key_env.clone(),
            })?
        };

        Ok(ResolvedModel { model, provider, api_key })
    }
}

impl Default for Catalog {
    fn default() -> Self {
        Self::builtin()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builtin_catalog_has_default_model() {
        let catalog = Catalog::builtin();
        let model = catalog.model(DEFAULT_MODEL).unwrap();
        assert!(model.supports_reasoning);
        assert_eq!(model.provider, "deepseek");
    }

    #[test]
    fn unknown_model_is_config_error() {
        let catalog = Catalog::builtin();
        let err = catalog.resolve("gpt-infinity").unwrap_err();
        assert!(matches!(err, ConfigError::UnknownModel { .. }));
    }

    #[test]
    fn missing_api_key_is_config_error() {
        let catalog = Catalog::builtin();
        // SAFETY: test-only env mutation
        unsafe { std::env::remove_var("DEEPSEEK_API_KEY") };
        let err = catalog.resolve("deepseek-reasoner").unwrap_err();
        match err {
            ConfigError::MissingApiKey { env_var, .. } => {
                assert_eq!(env_var, "DEEPSEEK_API_KEY");
            }
            other => panic!("expected MissingApiKey, got {other}"),
        }
    }

    #[test]
    fn all_models_sorted() {
        let catalog = Catalog::builtin();
        let models = catalog.all_models();
        assert!(models.len() >= 4);
        assert!(models.windows(2).all(|w| w[0].id <= w[1].id));
    }
}
