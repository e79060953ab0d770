//! Error types for the Tabula extraction pipeline.
//!
//! Errors are split by concern so callers can tell a fatal misconfiguration
//! apart from a provider call that ran out of retries. Routine conditions
//! (unparsable model output, a single unreadable image, a comparison
//! mismatch) are not errors at all: they travel as data.

use std::path::PathBuf;
use thiserror::Error;

/// Top-level error type for Tabula operations.
#[derive(Error, Debug)]
pub enum TabulaError {
    /// Configuration-related errors
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Pipeline processing errors
    #[error("Pipeline error: {0}")]
    Pipeline(#[from] PipelineError),

    /// LLM provider errors
    #[error("LLM error: {0}")]
    Llm(#[from] LlmError),

    /// General I/O errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Configuration-specific errors. These are fatal and never retried.
#[derive(Error, Debug)]
pub enum ConfigError {
    /// Failed to read the config file from disk
    #[error("Failed to read config file: {0}")]
    ReadError(#[from] std::io::Error),

    /// Failed to parse TOML configuration
    #[error("Failed to parse config: {0}")]
    ParseError(#[from] toml::de::Error),

    /// Configuration values are invalid
    #[error("Invalid configuration: {0}")]
    ValidationError(String),

    /// Provider identifier outside the supported set
    #[error("Unsupported provider '{0}': must be one of 'openai', 'google', or 'bedrock'")]
    UnsupportedProvider(String),

    /// Provider needs an API key that is not configured
    #[error("{provider} API key not set. Set {env_var} or configure llm.{provider}.api_key")]
    MissingApiKey {
        provider: &'static str,
        env_var: &'static str,
    },

    /// System prompt template is missing or unreadable
    #[error("Failed to load system prompt from {path}: {source}")]
    PromptLoad {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Errors raised while talking to an LLM provider.
#[derive(Error, Debug)]
pub enum LlmError {
    /// A single provider call failed (network, HTTP status, malformed envelope)
    #[error("{message}")]
    Request {
        message: String,
        status_code: Option<u16>,
    },

    /// A single provider call exceeded its time budget
    #[error("{provider} call timed out after {timeout_ms}ms")]
    Timeout { provider: String, timeout_ms: u64 },

    /// Every attempt failed; carries the last underlying error
    #[error("API call failed after {attempts} attempts: {last}")]
    Exhausted {
        attempts: u32,
        #[source]
        last: Box<LlmError>,
    },
}

/// Pipeline processing errors.
#[derive(Error, Debug)]
pub enum PipelineError {
    /// Input folder does not exist or is not a directory
    #[error("Folder not found: {0}")]
    FolderNotFound(PathBuf),

    /// Image file could not be read for encoding
    #[error("Failed to read image {path}: {message}")]
    ImageRead { path: PathBuf, message: String },

    /// The external screenshot provider failed
    #[error("Screenshot capture failed for {url}: {message}")]
    Screenshot { url: String, message: String },

    /// Writing a result file failed
    #[error("Failed to write output {path}: {message}")]
    Output { path: PathBuf, message: String },
}

/// Convenience type alias for Tabula results.
pub type Result<T> = std::result::Result<T, TabulaError>;

/// Convenience type alias for pipeline-specific results.
pub type PipelineResult<T> = std::result::Result<T, PipelineError>;
