//! Configurable mock provider shared by the crate's tests.

use super::message::MultimodalMessage;
use super::provider::{LlmProvider, LlmResponse};
use crate::error::LlmError;
use async_trait::async_trait;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

type ResponseFn = dyn Fn(u32, &MultimodalMessage) -> Result<LlmResponse, LlmError> + Send + Sync;

/// Each call to `generate()` invokes the response factory with the current
/// call index and the message, so callers can vary results per attempt.
pub(crate) struct MockProvider {
    response_fn: Box<ResponseFn>,
    call_count: Arc<AtomicU32>,
    /// Base64 payloads of every message's images, one list per call.
    seen_images: Arc<Mutex<Vec<Vec<String>>>>,
    delay: Option<Duration>,
}

pub(crate) fn text_response(text: &str) -> LlmResponse {
    LlmResponse {
        text: text.to_string(),
        model: "mock-v1".to_string(),
        tokens_used: Some(42),
        latency_ms: 10,
    }
}

pub(crate) fn request_error(message: &str) -> LlmError {
    LlmError::Request {
        message: message.to_string(),
        status_code: Some(503),
    }
}

impl MockProvider {
    pub(crate) fn from_fn<F>(f: F) -> Self
    where
        F: Fn(u32, &MultimodalMessage) -> Result<LlmResponse, LlmError> + Send + Sync + 'static,
    {
        Self {
            response_fn: Box::new(f),
            call_count: Arc::new(AtomicU32::new(0)),
            seen_images: Arc::new(Mutex::new(Vec::new())),
            delay: None,
        }
    }

    pub(crate) fn success(text: &str) -> Self {
        let text = text.to_string();
        Self::from_fn(move |_, _| Ok(text_response(&text)))
    }

    pub(crate) fn failing(message: &str) -> Self {
        let message = message.to_string();
        Self::from_fn(move |_, _| Err(request_error(&message)))
    }

    /// The first `failures` calls fail, later calls succeed with `text`.
    pub(crate) fn fail_then_succeed(failures: u32, text: &str) -> Self {
        let text = text.to_string();
        Self::from_fn(move |idx, _| {
            if idx < failures {
                Err(request_error("transient failure"))
            } else {
                Ok(text_response(&text))
            }
        })
    }

    pub(crate) fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    /// Shared handle to the call counter (clone before moving the provider).
    pub(crate) fn call_count_handle(&self) -> Arc<AtomicU32> {
        self.call_count.clone()
    }

    pub(crate) fn seen_images_handle(&self) -> Arc<Mutex<Vec<Vec<String>>>> {
        self.seen_images.clone()
    }
}

#[async_trait]
impl LlmProvider for MockProvider {
    fn name(&self) -> &str {
        "mock"
    }

    fn model(&self) -> &str {
        "mock-v1"
    }

    async fn generate(&self, message: &MultimodalMessage) -> Result<LlmResponse, LlmError> {
        let idx = self.call_count.fetch_add(1, Ordering::SeqCst);
        self.seen_images
            .lock()
            .unwrap()
            .push(message.human.images.iter().map(|i| i.data.clone()).collect());
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        (self.response_fn)(idx, message)
    }
}
