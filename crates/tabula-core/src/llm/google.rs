//! Google Gemini provider using the `generateContent` REST API.
//!
//! Images go inline as base64 `inlineData` parts ahead of the text part;
//! the system instruction travels in `systemInstruction`.

use super::message::MultimodalMessage;
use super::provider::{GenerationParams, LlmProvider, LlmResponse};
use crate::error::LlmError;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::Instant;

/// Gemini provider.
pub struct GoogleProvider {
    api_key: String,
    params: GenerationParams,
    client: reqwest::Client,
    endpoint: String,
}

impl GoogleProvider {
    pub fn new(api_key: &str, params: GenerationParams) -> Self {
        Self::with_endpoint(
            api_key,
            params,
            "https://generativelanguage.googleapis.com/v1beta",
        )
    }

    pub fn with_endpoint(api_key: &str, params: GenerationParams, endpoint: &str) -> Self {
        Self {
            api_key: api_key.to_string(),
            params,
            client: reqwest::Client::new(),
            endpoint: endpoint.trim_end_matches('/').to_string(),
        }
    }

    fn url(&self) -> String {
        format!(
            "{}/models/{}:generateContent",
            self.endpoint, self.params.model
        )
    }

    fn build_request(&self, message: &MultimodalMessage) -> GenerateRequest {
        let mut parts: Vec<Part> = message
            .human
            .images
            .iter()
            .map(|image| Part::InlineData {
                inline_data: InlineData {
                    mime_type: image.media_type.clone(),
                    data: image.data.clone(),
                },
            })
            .collect();
        parts.push(Part::Text {
            text: message.human.text.clone(),
        });

        GenerateRequest {
            system_instruction: SystemInstruction {
                parts: vec![Part::Text {
                    text: message.system.clone(),
                }],
            },
            contents: vec![Content {
                role: "user".to_string(),
                parts,
            }],
            generation_config: GenerationConfig {
                temperature: self.params.temperature,
                max_output_tokens: self.params.max_tokens,
            },
        }
    }

    fn http_request(&self, body: &GenerateRequest) -> reqwest::RequestBuilder {
        self.client
            .post(self.url())
            .header("x-goog-api-key", &self.api_key)
            .header("Content-Type", "application/json")
            .json(body)
    }
}

// --- Request types ---

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerateRequest {
    system_instruction: SystemInstruction,
    contents: Vec<Content>,
    generation_config: GenerationConfig,
}

#[derive(Serialize)]
struct SystemInstruction {
    parts: Vec<Part>,
}

#[derive(Serialize)]
struct Content {
    role: String,
    parts: Vec<Part>,
}

#[derive(Serialize)]
#[serde(untagged)]
enum Part {
    Text {
        text: String,
    },
    InlineData {
        #[serde(rename = "inlineData")]
        inline_data: InlineData,
    },
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct InlineData {
    mime_type: String,
    data: String,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerationConfig {
    temperature: f32,
    max_output_tokens: u32,
}

// --- Response types ---

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct GenerateResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
    usage_metadata: Option<UsageMetadata>,
    model_version: Option<String>,
}

#[derive(Deserialize)]
struct Candidate {
    content: Option<CandidateContent>,
}

#[derive(Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<ResponsePart>,
}

#[derive(Deserialize)]
struct ResponsePart {
    text: Option<String>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct UsageMetadata {
    total_token_count: Option<u32>,
}

#[async_trait]
impl LlmProvider for GoogleProvider {
    fn name(&self) -> &str {
        "google"
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
                message: format!("Gemini request failed: {e}"),
                status_code: None,
            })?;

        let status = resp.status();
        if !status.is_success() {
            let text = resp.text().await.unwrap_or_default();
            return Err(LlmError::Request {
                message: format!("Gemini HTTP {status}: {text}"),
                status_code: Some(status.as_u16()),
            });
        }

        let gen_resp: GenerateResponse = resp.json().await.map_err(|e| LlmError::Request {
            message: format!("Failed to parse Gemini response: {e}"),
            status_code: None,
        })?;

        let text = gen_resp
            .candidates
            .into_iter()
            .next()
            .and_then(|c| c.content)
            .map(|c| {
                c.parts
                    .into_iter()
                    .filter_map(|p| p.text)
                    .collect::<Vec<_>>()
                    .join("")
            })
            .filter(|t| !t.trim().is_empty())
            .ok_or_else(|| LlmError::Request {
                message: "Gemini returned no candidate text".to_string(),
                status_code: None,
            })?;

        Ok(LlmResponse {
            text,
            model: gen_resp
                .model_version
                .unwrap_or_else(|| self.params.model.clone()),
            tokens_used: gen_resp.usage_metadata.and_then(|u| u.total_token_count),
            latency_ms: start.elapsed().as_millis() as u64,
        })
    }
}
