//! Tabula Core - screenshot-to-JSON table extraction with multimodal LLMs.
//!
//! Tabula turns folders of table screenshots into structured JSON by asking
//! multimodal LLM providers (OpenAI, Google Gemini, AWS Bedrock), then
//! cross-checks the outputs of several models for agreement.
//!
//! # Architecture
//!
//! ```text
//! Folder → Discover → Encode → Prompt → Provider (retry) → Parse → JSON file
//!                                                                     ↓
//!                                        Reconcile (order-insensitive diff)
//! ```
//!
//! # Usage
//!
//! ```rust,ignore
//! use tabula_core::{AgentConfig, BatchMode, BatchProcessor, Config, TableAgent};
//!
//! #[tokio::main]
//! async fn main() -> tabula_core::Result<()> {
//!     let config = Config::load()?;
//!     let agent_config = AgentConfig::new(
//!         "openai",
//!         "gpt-4o",
//!         config.system_prompt_path(),
//!         config.log_dir(),
//!     )?;
//!     let agent = TableAgent::new(agent_config, &config).await?;
//!     let processor = BatchProcessor::new(agent, &config);
//!
//!     let result = processor
//!         .process_folder("./shots".as_ref(), "./out.json".as_ref(), BatchMode::Sequential, "run1")
//!         .await?;
//!     println!("{} error entries", result.error_count());
//!     Ok(())
//! }
//! ```

// Module declarations
pub mod agent;
pub mod audit;
pub mod config;
pub mod context;
pub mod error;
pub mod image;
pub mod llm;
pub mod output;
pub mod pipeline;
pub mod reconcile;
pub mod screenshot;

// Re-exports for convenient access
pub use agent::{AgentConfig, TableAgent};
pub use config::Config;
pub use context::{random_prefix, RequestContext};
pub use error::{ConfigError, LlmError, PipelineError, PipelineResult, Result, TabulaError};
pub use image::ImageInput;
pub use llm::{ErrorKind, ErrorResult, InvocationResult, LlmProviderFactory, ProviderKind};
pub use pipeline::{extract_from_url, BatchEvent, BatchMode, BatchProcessor, BatchResult};
pub use reconcile::{compare_files, diff_unordered, ComparisonFailure, ComparisonOutcome, JsonDiff};
pub use screenshot::ScreenshotProvider;

/// Library version.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
