//! Provider construction from classifier configuration.

use std::sync::Arc;

use recall_config::ClassifierConfig;
use recall_core::provider::Provider;

use crate::openai_compat::OpenAiCompatProvider;

/// Build the provider the `llm` classifier backend talks to.
///
/// The HTTP timeout matches the classifier timeout so a hung backend is
/// abandoned at the same point the classifier gives up on it.
pub fn build_from_config(config: &ClassifierConfig) -> Arc<dyn Provider> {
    let base_url = config
        .api_url
        .clone()
        .unwrap_or_else(|| default_base_url(&config.provider));
    let api_key = config.api_key.clone().unwrap_or_default();

    Arc::new(OpenAiCompatProvider::with_timeout(
        config.provider.clone(),
        base_url,
        api_key,
        config.timeout(),
    ))
}

/// Get the default base URL for well-known providers.
pub fn default_base_url(provider_name: &str) -> String {
    match provider_name {
        "openrouter" => "https://openrouter.ai/api/v1".into(),
        "openai" => "https://api.openai.com/v1".into(),
        "ollama" => "http://localhost:11434/v1".into(),
        "groq" => "https://api.groq.com/openai/v1".into(),
        "together" => "https://api.together.xyz/v1".into(),
        "vllm" => "http://localhost:8000/v1".into(),
        "llamacpp" | "llama.cpp" => "http://localhost:8080/v1".into(),
        _ => format!("https://{provider_name}.api.example.com/v1"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_base_urls() {
        assert!(default_base_url("openrouter").contains("openrouter.ai"));
        assert!(default_base_url("openai").contains("api.openai.com"));
        assert!(default_base_url("ollama").contains("localhost:11434"));
    }

    #[test]
    fn build_from_default_config() {
        let config = ClassifierConfig::default();
        let provider = build_from_config(&config);
        assert_eq!(provider.name(), "ollama");
    }

    #[test]
    fn explicit_api_url_wins() {
        let config = ClassifierConfig {
            provider: "custom".into(),
            api_url: Some("http://10.0.0.5:9000/v1".into()),
            ..ClassifierConfig::default()
        };
        let provider = build_from_config(&config);
        assert_eq!(provider.name(), "custom");
    }
}
