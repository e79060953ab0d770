//! OpenAI LLM provider using the Chat Completions API.
//!
//! Sends the system instruction as a system message and each image as a
//! data URL block in the user message, followed by the text block.

use super::message::MultimodalMessage;
use super::provider::{GenerationParams, LlmProvider, LlmResponse};
use crate::error::LlmError;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::Instant;

/// OpenAI provider using Chat Completions API.
pub struct OpenAiProvider {
    api_key: String,
    params: GenerationParams,
    client: reqwest::Client,
    endpoint: String,
}

impl OpenAiProvider {
    pub fn new(api_key: &str, params: GenerationParams) -> Self {
        Self::with_endpoint(
            api_key,
            params,
            "https://api.openai.com/v1/chat/completions",
        )
    }

    /// Create with a custom endpoint (proxies, Azure-style gateways).
    pub fn with_endpoint(api_key: &str, params: GenerationParams, endpoint: &str) -> Self {
        Self {
            api_key: api_key.to_string(),
            params,
            client: reqwest::Client::new(),
            endpoint: endpoint.to_string(),
        }
    }

    fn build_request(&self, message: &MultimodalMessage) -> ChatRequest {
        let mut content: Vec<ChatContent> = message
            .human
            .images
            .iter()
            .map(|image| ChatContent::ImageUrl {
                image_url: ImageUrl {
                    url: image.data_url(),
                },
            })
            .collect();
        content.push(ChatContent::Text {
            text: message.human.text.clone(),
        });

        ChatRequest {
            model: self.params.model.clone(),
            max_tokens: self.params.max_tokens,
            temperature: self.params.temperature,
            messages: vec![
                ChatMessage {
                    role: "system".to_string(),
                    content: vec![ChatContent::Text {
                        text: message.system.clone(),
                    }],
                },
                ChatMessage {
                    role: "user".to_string(),
                    content,
                },
            ],
        }
    }

    fn http_request(&self, body: &ChatRequest) -> reqwest::RequestBuilder {
        self.client
            .post(&self.endpoint)
            .header("Authorization", format!("Bearer {}", self.api_key))
            .header("Content-Type", "application/json")
            .json(body)
    }
}

// --- Request types ---

#[derive(Serialize)]
struct ChatRequest {
    model: String,
    messages: Vec<ChatMessage>,
    max_tokens: u32,
    temperature: f32,
}

#[derive(Serialize)]
struct ChatMessage {
    role: String,
    content: Vec<ChatContent>,
}

#[derive(Serialize)]
#[serde(tag = "type")]
enum ChatContent {
    #[serde(rename = "text")]
    Text { text: String },
    #[serde(rename = "image_url")]
    ImageUrl { image_url: ImageUrl },
}

#[derive(Serialize)]
struct ImageUrl {
    url: String,
}

// --- Response types ---

#[derive(Deserialize)]
struct ChatResponse {
    choices: Vec<Choice>,
    model: String,
    usage: Option<ChatUsage>,
}

#[derive(Deserialize)]
struct Choice {
    message: ChoiceMessage,
}

#[derive(Deserialize)]
struct ChoiceMessage {
    content: Option<String>,
}

#[derive(Deserialize)]
struct ChatUsage {
    total_tokens: u32,
}

#[async_trait]
impl LlmProvider for OpenAiProvider {
    fn name(&self) -> &str {
        "openai"
    }

    fn model(&self) -> &str {
        &self.params.model
    }

    async fn generate(&self, message: &MultimodalMessage) -> Result<LlmResponse, LlmError> {
        let start = Instant::now();
        let body = self.build_request(message);

        let resp = self
            .http_request(&body)
            .send()
            .await
            .map_err(|e| LlmError::Request {
                message: format!("OpenAI request failed: {e}"),
                status_code: None,
            })?;

        let status = resp.status();
        if !status.is_success() {
            let text = resp.text().await.unwrap_or_default();
            return Err(LlmError::Request {
                message: format!("OpenAI HTTP {status}: {text}"),
                status_code: Some(status.as_u16()),
            });
        }

        let chat_resp: ChatResponse = resp.json().await.map_err(|e| LlmError::Request {
            message: format!("Failed to parse OpenAI response: {e}"),
            status_code: None,
        })?;

        let text = chat_resp
            .choices
            .first()
            .and_then(|c| c.message.content.clone())
            .ok_or_else(|| LlmError::Request {
                message: "OpenAI returned empty choices array, no content generated".to_string(),
                status_code: None,
            })?;

        Ok(LlmResponse {
            text,
            model: chat_resp.model,
            tokens_used: chat_resp.usage.map(|u| u.total_tokens),
            latency_ms: start.elapsed().as_millis() as u64,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::image::ImageInput;
    use crate::llm::message::HumanMessage;

    fn message() -> MultimodalMessage {
        MultimodalMessage {
            system: "Today's date - 2025-01-01\nExtract tables.".to_string(),
            human: HumanMessage {
                text: "{}".to_string(),
                images: vec![
                    ImageInput::from_bytes(&[1], "jpeg"),
                    ImageInput::from_bytes(&[2], "png"),
                ],
            },
        }
    }

    #[test]
    fn test_request_body_shape() {
        let provider = OpenAiProvider::new("sk-test", GenerationParams::for_model("gpt-4o"));
        let body = serde_json::to_value(provider.build_request(&message())).unwrap();

        assert_eq!(body["model"], "gpt-4o");
        assert_eq!(body["temperature"], 0.0);
        assert_eq!(body["max_tokens"], 4096);
        assert_eq!(body["messages"][0]["role"], "system");
        assert_eq!(
            body["messages"][0]["content"][0]["text"],
            "Today's date - 2025-01-01\nExtract tables."
        );

        let user = &body["messages"][1]["content"];
        assert_eq!(user.as_array().unwrap().len(), 3);
        assert_eq!(user[0]["type"], "image_url");
        assert_eq!(user[0]["image_url"]["url"], "data:image/jpeg;base64,AQ==");
        assert_eq!(user[1]["image_url"]["url"], "data:image/png;base64,Ag==");
        assert_eq!(user[2]["type"], "text");
        assert_eq!(user[2]["text"], "{}");
    }

    #[test]
    fn test_http_request_has_no_fixed_deadline() {
        let provider = OpenAiProvider::new("sk-test", GenerationParams::for_model("gpt-4o"));
        let request = provider
            .http_request(&provider.build_request(&message()))
            .build()
            .unwrap();
        assert!(request.timeout().is_none());
        assert_eq!(
            request.headers()["authorization"].to_str().unwrap(),
            "Bearer sk-test"
        );
    }

    #[test]
    fn test_response_parsing() {
        let raw = r#"{"choices":[{"message":{"content":"[]"}}],"model":"gpt-4o-2024","usage":{"total_tokens":12}}"#;
        let resp: ChatResponse = serde_json::from_str(raw).unwrap();
        assert_eq!(resp.choices[0].message.content.as_deref(), Some("[]"));
        assert_eq!(resp.usage.unwrap().total_tokens, 12);
    }
}
