//! Bounded retry with exponential backoff for provider calls.
//!
//! Any failure is retried: network errors, provider errors and timeouts are
//! all treated as transient. Attempts are strictly sequential and each one
//! resends the full message.

use super::message::MultimodalMessage;
use super::provider::{LlmProvider, LlmResponse};
use crate::config::RetryConfig;
use crate::error::LlmError;
use std::time::Duration;

/// How many times to call, how long to wait between calls, and per-call time budget.
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    /// Total attempts, including the first
    pub max_retries: u32,
    /// Backoff unit: attempt n is followed by a `base * 2^n` wait
    pub base_delay: Duration,
    /// Time budget for one attempt
    pub timeout: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::from(&RetryConfig::default())
    }
}

impl From<&RetryConfig> for RetryPolicy {
    fn from(config: &RetryConfig) -> Self {
        Self {
            max_retries: config.max_retries,
            base_delay: Duration::from_millis(config.base_delay_ms),
            timeout: Duration::from_millis(config.timeout_ms),
        }
    }
}

/// Calculate exponential backoff duration for a given attempt.
///
/// Uses `base_delay * 2^attempt` with a cap at 30 seconds.
pub fn backoff_duration(attempt: u32, base_delay: Duration) -> Duration {
    let base_ms = base_delay.as_millis() as u64;
    let delay = base_ms.saturating_mul(2u64.saturating_pow(attempt));
    Duration::from_millis(delay.min(30_000))
}

/// Call `provider` until it succeeds or `policy.max_retries` attempts have failed.
///
/// Returns [`LlmError::Exhausted`] wrapping the last failure once the budget is spent.
pub async fn invoke_with_retry(
    provider: &dyn LlmProvider,
    message: &MultimodalMessage,
    policy: &RetryPolicy,
) -> Result<LlmResponse, LlmError> {
    let attempts = policy.max_retries.max(1);
    let mut last_error = None;

    for attempt in 0..attempts {
        if attempt > 0 {
            let delay = backoff_duration(attempt - 1, policy.base_delay);
            tracing::debug!(
                "Retry {attempt}/{} on {} after {delay:?}",
                attempts - 1,
                provider.name()
            );
            tokio::time::sleep(delay).await;
        }

        let error = match tokio::time::timeout(policy.timeout, provider.generate(message)).await {
            Ok(Ok(response)) => {
                tracing::debug!(
                    model = %response.model,
                    latency_ms = response.latency_ms,
                    tokens = ?response.tokens_used,
                    "LLM call succeeded on attempt {}",
                    attempt + 1
                );
                return Ok(response);
            }
            Ok(Err(e)) => e,
            Err(_) => LlmError::Timeout {
                provider: provider.name().to_string(),
                timeout_ms: policy.timeout.as_millis() as u64,
            },
        };

        tracing::warn!(
            "API call attempt {}/{attempts} to {} failed: {error}",
            attempt + 1,
            provider.name()
        );
        last_error = Some(error);
    }

    Err(LlmError::Exhausted {
        attempts,
        last: Box::new(last_error.unwrap_or_else(|| LlmError::Request {
            message: "no attempts were made".to_string(),
            status_code: None,
        })),
    })
}
