//! The table-extraction agent: one provider, one prompt template, one audit directory.

use crate::audit::AuditLog;
use crate::config::Config;
use crate::context::RequestContext;
use crate::error::{ConfigError, Result};
use crate::image::ImageInput;
use crate::llm::{
    build_messages, invoke_with_retry, parse_table_response, InvocationResult, LlmProvider,
    LlmProviderFactory, ProviderKind, RetryPolicy,
};
use serde_json::Value;
use std::path::{Path, PathBuf};
use tracing::Instrument;

/// Immutable description of an agent, validated at construction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AgentConfig {
    provider: ProviderKind,
    model_name: String,
    system_prompt_path: PathBuf,
    log_base_path: PathBuf,
}

impl AgentConfig {
    /// Fails with [`ConfigError::UnsupportedProvider`] for an unknown provider name.
    pub fn new(
        provider: &str,
        model_name: impl Into<String>,
        system_prompt_path: impl Into<PathBuf>,
        log_base_path: impl Into<PathBuf>,
    ) -> std::result::Result<Self, ConfigError> {
        Ok(Self {
            provider: provider.parse()?,
            model_name: model_name.into(),
            system_prompt_path: system_prompt_path.into(),
            log_base_path: log_base_path.into(),
        })
    }

    pub fn provider(&self) -> ProviderKind {
        self.provider
    }

    pub fn model_name(&self) -> &str {
        &self.model_name
    }

    pub fn system_prompt_path(&self) -> &Path {
        &self.system_prompt_path
    }

    pub fn log_base_path(&self) -> &Path {
        &self.log_base_path
    }
}

/// Sends screenshots plus context to a provider and returns the parsed table.
pub struct TableAgent {
    config: AgentConfig,
    provider: Box<dyn LlmProvider>,
    policy: RetryPolicy,
    audit: AuditLog,
}

impl TableAgent {
    /// Build the provider through the factory and create the log directory.
    pub async fn new(config: AgentConfig, app_config: &Config) -> Result<Self> {
        let provider =
            LlmProviderFactory::create_kind(config.provider, &config.model_name, &app_config.llm)
                .await?;
        tokio::fs::create_dir_all(&config.log_base_path).await?;
        tracing::info!(
            "Agent ready: {}/{} (logs in {:?})",
            config.provider,
            config.model_name,
            config.log_base_path
        );
        Ok(Self::with_provider(
            config,
            provider,
            RetryPolicy::from(&app_config.retry),
        ))
    }

    /// Use an already constructed provider.
    pub fn with_provider(
        config: AgentConfig,
        provider: Box<dyn LlmProvider>,
        policy: RetryPolicy,
    ) -> Self {
        let audit = AuditLog::new(config.log_base_path.clone());
        Self {
            config,
            provider,
            policy,
            audit,
        }
    }

    pub fn config(&self) -> &AgentConfig {
        &self.config
    }

    /// Run one extraction.
    ///
    /// Parse failures come back as `Ok(InvocationResult::Error(..))`. Retry
    /// exhaustion and a missing prompt template are `Err`.
    pub async fn call(
        &self,
        ctx: &RequestContext,
        json_context: &Value,
        images: Vec<ImageInput>,
        auxiliary_text: Option<&str>,
    ) -> Result<InvocationResult> {
        self.call_inner(ctx, json_context, images, auxiliary_text)
            .instrument(ctx.span())
            .await
    }

    async fn call_inner(
        &self,
        ctx: &RequestContext,
        json_context: &Value,
        images: Vec<ImageInput>,
        auxiliary_text: Option<&str>,
    ) -> Result<InvocationResult> {
        let image_count = images.len();
        let bundle = build_messages(
            &self.config.system_prompt_path,
            json_context,
            images,
            auxiliary_text,
        )?;
        self.audit
            .write_input(ctx.request_id(), &bundle.audit_text)
            .await;

        tracing::info!(
            "Calling {}/{} with {image_count} image(s)",
            self.provider.name(),
            self.provider.model()
        );
        let response = invoke_with_retry(&*self.provider, &bundle.message, &self.policy)
            .await
            .inspect_err(|e| tracing::error!("Extraction failed: {e}"))?;

        let result = parse_table_response(&response.text);
        self.audit.write_output(ctx.request_id(), &result).await;
        Ok(result)
    }
}
