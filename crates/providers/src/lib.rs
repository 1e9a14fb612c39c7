//! # codewright Providers
//!
//! LLM provider adapters. Every configured backend speaks the
//! OpenAI-compatible chat-completion dialect, so a single adapter covers
//! the whole catalog; per-backend differences (endpoint, credential,
//! reasoning support, extra headers) come from the resolved catalog entry.

pub mod openai_compat;
pub mod sse;

pub use openai_compat::OpenAiCompatProvider;

use std::sync::Arc;

use codewright_config::ResolvedModel;
use codewright_core::Provider;

/// Build the provider for a resolved catalog entry.
pub fn build_provider(resolved: &ResolvedModel) -> Arc<dyn Provider> {
    let provider = OpenAiCompatProvider::new(
        resolved.provider.name.to_lowercase(),
        resolved.provider.base_url.clone(),
        resolved.api_key.clone(),
    )
    .with_extra_headers(resolved.provider.extra_headers.clone())
    .with_reasoning(resolved.model.supports_reasoning);

    Arc::new(provider)
}

#[cfg(test)]
mod tests {
    use super::*;
    use codewright_config::{ModelEntry, ProviderEntry};

    #[test]
    fn build_provider_carries_catalog_flags() {
        let resolved = ResolvedModel {
            model: ModelEntry {
                id: "deepseek-reasoner".into(),
                provider: "deepseek".into(),
                display_name: "DeepSeek Reasoner".into(),
                supports_reasoning: true,
                max_tokens: None,
            },
            provider: ProviderEntry {
                name: "DeepSeek".into(),
                base_url: "https://api.deepseek.com".into(),
                api_key_env: "DEEPSEEK_API_KEY".into(),
                extra_headers: Vec::new(),
            },
            api_key: "sk-test".into(),
        };

        let provider = build_provider(&resolved);
        assert_eq!(provider.name(), "deepseek");
        assert!(provider.supports_reasoning());
        assert!(provider.supports_streaming());
    }
}
