//! LLM provider trait, provider identifiers and the client factory.
//!
//! Defines the interface every provider adapter implements, plus the
//! factory that builds the right adapter from a provider name and model.

use super::message::MultimodalMessage;
use crate::config::LlmConfig;
use crate::error::{ConfigError, LlmError};
use async_trait::async_trait;
use std::fmt;
use std::str::FromStr;

/// Output token ceiling applied to every provider.
pub const MAX_OUTPUT_TOKENS: u32 = 4096;

/// The closed set of supported providers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ProviderKind {
    OpenAi,
    Google,
    Bedrock,
}

impl ProviderKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::OpenAi => "openai",
            Self::Google => "google",
            Self::Bedrock => "bedrock",
        }
    }
}

impl fmt::Display for ProviderKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ProviderKind {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "openai" => Ok(Self::OpenAi),
            "google" => Ok(Self::Google),
            "bedrock" => Ok(Self::Bedrock),
            _ => Err(ConfigError::UnsupportedProvider(s.to_string())),
        }
    }
}

/// Normalized generation parameters shared by all providers.
///
/// Each adapter maps these onto its own wire names (`max_tokens`,
/// `maxOutputTokens`, `InferenceConfiguration`, ...).
#[derive(Debug, Clone, PartialEq)]
pub struct GenerationParams {
    pub model: String,
    pub temperature: f32,
    pub max_tokens: u32,
}

impl GenerationParams {
    /// Deterministic settings for table extraction: temperature 0, bounded output.
    pub fn for_model(model: &str) -> Self {
        Self {
            model: model.to_string(),
            temperature: 0.0,
            max_tokens: MAX_OUTPUT_TOKENS,
        }
    }
}

/// The raw response from a provider call.
#[derive(Debug, Clone)]
pub struct LlmResponse {
    /// Generated text
    pub text: String,
    /// Model identifier used
    pub model: String,
    /// Number of tokens used (input + output), if reported
    pub tokens_used: Option<u32>,
    /// Round-trip latency in milliseconds
    pub latency_ms: u64,
}

/// Trait that all LLM providers implement.
///
/// Uses `async_trait` because native async fn in trait is not object-safe
/// (we need `Box<dyn LlmProvider>` for dynamic dispatch).
#[async_trait]
pub trait LlmProvider: Send + Sync {
    /// Provider name for logging (e.g., "openai", "bedrock").
    fn name(&self) -> &str;

    /// Model identifier requests are sent to.
    fn model(&self) -> &str;

    /// Send the message and return the raw model output text.
    ///
    /// Adapters set no deadline of their own; the per-attempt limit is
    /// [`RetryPolicy::timeout`](super::retry::RetryPolicy::timeout).
    async fn generate(&self, message: &MultimodalMessage) -> Result<LlmResponse, LlmError>;
}

/// Resolve `${ENV_VAR}` references in config strings.
pub fn resolve_env_var(value: &str) -> Option<String> {
    if value.starts_with("${") && value.ends_with('}') {
        let var_name = &value[2..value.len() - 1];
        std::env::var(var_name).ok().filter(|v| !v.is_empty())
    } else if value.is_empty() {
        None
    } else {
        Some(value.to_string())
    }
}

/// Factory that creates the appropriate provider from a name and model.
pub struct LlmProviderFactory;

impl LlmProviderFactory {
    /// Create an LLM provider for `provider` (e.g. "openai") serving `model`.
    ///
    /// Unknown provider names fail with [`ConfigError::UnsupportedProvider`]
    /// before anything else is touched.
    pub async fn create(
        provider: &str,
        model: &str,
        config: &LlmConfig,
    ) -> Result<Box<dyn LlmProvider>, ConfigError> {
        let kind: ProviderKind = provider.parse()?;
        Self::create_kind(kind, model, config).await
    }

    /// Create a provider for an already-validated [`ProviderKind`].
    pub async fn create_kind(
        kind: ProviderKind,
        model: &str,
        config: &LlmConfig,
    ) -> Result<Box<dyn LlmProvider>, ConfigError> {
        let params = GenerationParams::for_model(model);
        tracing::debug!("Initializing LLM for provider '{kind}' with model '{model}'");

        match kind {
            ProviderKind::OpenAi => {
                let cfg = config.openai.clone().unwrap_or_default();
                let api_key =
                    resolve_env_var(&cfg.api_key).ok_or(ConfigError::MissingApiKey {
                        provider: "openai",
                        env_var: "OPENAI_API_KEY",
                    })?;
                Ok(Box::new(super::openai::OpenAiProvider::with_endpoint(
                    &api_key,
                    params,
                    &cfg.endpoint,
                )))
            }
            ProviderKind::Google => {
                let cfg = config.google.clone().unwrap_or_default();
                let api_key =
                    resolve_env_var(&cfg.api_key).ok_or(ConfigError::MissingApiKey {
                        provider: "google",
                        env_var: "GOOGLE_API_KEY",
                    })?;
                Ok(Box::new(super::google::GoogleProvider::with_endpoint(
                    &api_key,
                    params,
                    &cfg.endpoint,
                )))
            }
            ProviderKind::Bedrock => {
                let cfg = config.bedrock.clone().unwrap_or_default();
                Ok(Box::new(
                    super::bedrock::BedrockProvider::new(params, cfg.region.as_deref()).await,
                ))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{GoogleConfig, OpenAiConfig};

    #[test]
    fn test_provider_kind_parse() {
        assert_eq!("openai".parse::<ProviderKind>().unwrap(), ProviderKind::OpenAi);
        assert_eq!("Google".parse::<ProviderKind>().unwrap(), ProviderKind::Google);
        assert_eq!("BEDROCK".parse::<ProviderKind>().unwrap(), ProviderKind::Bedrock);
    }

    #[test]
    fn test_provider_kind_rejects_unknown() {
        for name in ["anthropic", "ollama", "", "open ai"] {
            let err = name.parse::<ProviderKind>().unwrap_err();
            assert!(matches!(err, ConfigError::UnsupportedProvider(_)), "{name}");
        }
    }

    #[test]
    fn test_provider_kind_display_roundtrip() {
        for kind in [ProviderKind::OpenAi, ProviderKind::Google, ProviderKind::Bedrock] {
            assert_eq!(kind.to_string().parse::<ProviderKind>().unwrap(), kind);
        }
    }

    #[test]
    fn test_generation_params_are_normalized() {
        let params = GenerationParams::for_model("gpt-4o");
        assert_eq!(params.model, "gpt-4o");
        assert_eq!(params.temperature, 0.0);
        assert_eq!(params.max_tokens, MAX_OUTPUT_TOKENS);
    }

    #[test]
    fn test_resolve_env_var() {
        // Non-env-var strings pass through
        assert_eq!(resolve_env_var("plain-key"), Some("plain-key".to_string()));
        // Empty returns None
        assert_eq!(resolve_env_var(""), None);
        // Unset env var returns None
        assert_eq!(resolve_env_var("${DEFINITELY_NOT_SET_XYZ_123}"), None);
    }

    #[tokio::test]
    async fn test_factory_rejects_unsupported_provider() {
        let result = LlmProviderFactory::create("anthropic", "claude", &LlmConfig::default()).await;
        assert!(matches!(
            result,
            Err(ConfigError::UnsupportedProvider(ref name)) if name == "anthropic"
        ));
    }

    #[tokio::test]
    async fn test_factory_requires_api_key() {
        let config = LlmConfig {
            openai: Some(OpenAiConfig {
                api_key: "${DEFINITELY_NOT_SET_XYZ_456}".to_string(),
                ..Default::default()
            }),
            ..Default::default()
        };
        let result = LlmProviderFactory::create("openai", "gpt-4o", &config).await;
        assert!(matches!(
            result,
            Err(ConfigError::MissingApiKey { provider: "openai", .. })
        ));
    }

    #[tokio::test]
    async fn test_factory_builds_http_providers() {
        let config = LlmConfig {
            openai: Some(OpenAiConfig {
                api_key: "sk-test".to_string(),
                ..Default::default()
            }),
            google: Some(GoogleConfig {
                api_key: "g-test".to_string(),
                ..Default::default()
            }),
            bedrock: None,
        };

        let openai = LlmProviderFactory::create("openai", "gpt-4o", &config)
            .await
            .unwrap();
        assert_eq!(openai.name(), "openai");
        assert_eq!(openai.model(), "gpt-4o");

        let google = LlmProviderFactory::create("google", "gemini-1.5-pro", &config)
            .await
            .unwrap();
        assert_eq!(google.name(), "google");
        assert_eq!(google.model(), "gemini-1.5-pro");
    }
}
