//! Sub-configuration structs with their defaults.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// General settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneralConfig {
    /// System prompt template sent with every extraction request
    pub system_prompt_path: PathBuf,

    /// Base directory for per-run audit logs and outputs
    pub log_dir: PathBuf,
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            system_prompt_path: PathBuf::from("prompts/table_extractor.txt"),
            log_dir: PathBuf::from("./logs"),
        }
    }
}

/// Image discovery settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DiscoveryConfig {
    /// File extensions treated as table screenshots
    pub supported_formats: Vec<String>,
}

impl Default for DiscoveryConfig {
    fn default() -> Self {
        Self {
            supported_formats: vec![
                "png".to_string(),
                "jpg".to_string(),
                "jpeg".to_string(),
                "bmp".to_string(),
                "gif".to_string(),
            ],
        }
    }
}

/// Retry settings for provider calls.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RetryConfig {
    /// Total attempts before a call is declared exhausted
    pub max_retries: u32,

    /// Backoff unit in milliseconds; attempt n waits `base * 2^n`
    pub base_delay_ms: u64,

    /// Per-attempt timeout in milliseconds
    pub timeout_ms: u64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_retries: 5,
            base_delay_ms: 1000,
            timeout_ms: 120_000,
        }
    }
}

/// Output settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct OutputConfig {
    /// Pretty-print persisted JSON
    pub pretty: bool,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self { pretty: true }
    }
}

/// Logging settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level: error, warn, info, debug, trace
    pub level: String,

    /// Log format: "pretty" or "json"
    pub format: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: "pretty".to_string(),
        }
    }
}

/// LLM provider configurations.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct LlmConfig {
    /// OpenAI configuration
    pub openai: Option<OpenAiConfig>,

    /// Google Gemini configuration
    pub google: Option<GoogleConfig>,

    /// AWS Bedrock configuration
    pub bedrock: Option<BedrockConfig>,
}

/// OpenAI configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OpenAiConfig {
    /// API key (supports ${ENV_VAR} syntax)
    pub api_key: String,

    /// Chat Completions endpoint
    pub endpoint: String,
}

impl Default for OpenAiConfig {
    fn default() -> Self {
        Self {
            api_key: "${OPENAI_API_KEY}".to_string(),
            endpoint: "https://api.openai.com/v1/chat/completions".to_string(),
        }
    }
}

/// Google Gemini configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GoogleConfig {
    /// API key (supports ${ENV_VAR} syntax)
    pub api_key: String,

    /// Generative Language API base URL
    pub endpoint: String,
}

impl Default for GoogleConfig {
    fn default() -> Self {
        Self {
            api_key: "${GOOGLE_API_KEY}".to_string(),
            endpoint: "https://generativelanguage.googleapis.com/v1beta".to_string(),
        }
    }
}

/// AWS Bedrock configuration.
///
/// Credentials come from the default AWS provider chain.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct BedrockConfig {
    /// Region override; the AWS default chain is used when unset
    pub region: Option<String>,
}
