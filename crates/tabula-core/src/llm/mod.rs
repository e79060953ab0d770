//! LLM integration for table extraction.
//!
//! Provides a provider abstraction over the supported multimodal backends
//! (OpenAI, Google Gemini, AWS Bedrock), the prompt assembler, a bounded
//! retry loop and the tolerant response parser.

pub(crate) mod bedrock;
pub(crate) mod google;
pub mod message;
#[cfg(test)]
pub(crate) mod mock;
pub(crate) mod openai;
pub mod parse;
pub mod provider;
pub mod retry;

pub use message::{build_messages, HumanMessage, MultimodalMessage, PromptBundle};
pub use parse::{parse_table_response, ErrorKind, ErrorResult, InvocationResult};
pub use provider::{GenerationParams, LlmProvider, LlmProviderFactory, LlmResponse, ProviderKind};
pub use retry::{invoke_with_retry, RetryPolicy};
