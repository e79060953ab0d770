//! AWS Bedrock provider using the Converse API.
//!
//! Credentials come from the default AWS chain (environment, shared
//! credentials file, instance role). Images are sent as raw bytes, so the
//! base64 payload is decoded before the call.

use super::message::MultimodalMessage;
use super::provider::{GenerationParams, LlmProvider, LlmResponse};
use crate::error::LlmError;
use crate::image::ImageInput;
use async_trait::async_trait;
use aws_sdk_bedrockruntime::{
    error::DisplayErrorContext,
    primitives::Blob,
    types::{
        ContentBlock, ConversationRole, ImageBlock, ImageFormat, ImageSource,
        InferenceConfiguration, Message, SystemContentBlock,
    },
    Client,
};
use std::time::Instant;

/// Bedrock provider for Converse-capable models (e.g. Claude on Bedrock).
pub struct BedrockProvider {
    client: Client,
    params: GenerationParams,
}

impl BedrockProvider {
    /// Build a client from the default AWS config, optionally pinned to `region`.
    pub async fn new(params: GenerationParams, region: Option<&str>) -> Self {
        let mut loader = aws_config::defaults(aws_config::BehaviorVersion::latest());
        if let Some(region) = region {
            loader = loader.region(aws_config::Region::new(region.to_string()));
        }
        let config = loader.load().await;
        Self {
            client: Client::new(&config),
            params,
        }
    }

    fn inference_config(&self) -> InferenceConfiguration {
        InferenceConfiguration::builder()
            .max_tokens(self.params.max_tokens as i32)
            .temperature(self.params.temperature)
            .build()
    }
}

/// Converse accepts png, jpeg, gif and webp only.
fn image_format(media_type: &str) -> Result<ImageFormat, LlmError> {
    match media_type {
        "image/png" => Ok(ImageFormat::Png),
        "image/jpeg" => Ok(ImageFormat::Jpeg),
        "image/gif" => Ok(ImageFormat::Gif),
        "image/webp" => Ok(ImageFormat::Webp),
        other => Err(LlmError::Request {
            message: format!("Bedrock does not accept {other} images"),
            status_code: None,
        }),
    }
}

fn image_block(image: &ImageInput) -> Result<ContentBlock, LlmError> {
    let format = image_format(&image.media_type)?;
    let bytes = image.decode().map_err(|e| LlmError::Request {
        message: format!("Invalid base64 image payload: {e}"),
        status_code: None,
    })?;
    let block = ImageBlock::builder()
        .format(format)
        .source(ImageSource::Bytes(Blob::new(bytes)))
        .build()
        .map_err(|e| LlmError::Request {
            message: format!("Failed to build Bedrock image block: {e}"),
            status_code: None,
        })?;
    Ok(ContentBlock::Image(block))
}

fn user_message(message: &MultimodalMessage) -> Result<Message, LlmError> {
    let mut builder = Message::builder().role(ConversationRole::User);
    for image in &message.human.images {
        builder = builder.content(image_block(image)?);
    }
    builder
        .content(ContentBlock::Text(message.human.text.clone()))
        .build()
        .map_err(|e| LlmError::Request {
            message: format!("Failed to build Bedrock message: {e}"),
            status_code: None,
        })
}

#[async_trait]
impl LlmProvider for BedrockProvider {
    fn name(&self) -> &str {
        "bedrock"
    }

    fn model(&self) -> &str {
        &self.params.model
    }

    async fn generate(&self, message: &MultimodalMessage) -> Result<LlmResponse, LlmError> {
        let start = Instant::now();

        let response = self
            .client
            .converse()
            .model_id(&self.params.model)
            .system(SystemContentBlock::Text(message.system.clone()))
            .messages(user_message(message)?)
            .inference_config(self.inference_config())
            .send()
            .await
            .map_err(|e| LlmError::Request {
                status_code: e.raw_response().map(|r| r.status().as_u16()),
                message: format!("Bedrock API error: {}", DisplayErrorContext(&e)),
            })?;

        let text = response
            .output()
            .and_then(|output| output.as_message().ok())
            .map(|msg| {
                msg.content()
                    .iter()
                    .filter_map(|block| match block {
                        ContentBlock::Text(text) => Some(text.as_str()),
                        _ => None,
                    })
                    .collect::<Vec<_>>()
                    .join("")
            })
            .filter(|t| !t.trim().is_empty())
            .ok_or_else(|| LlmError::Request {
                message: "Bedrock returned no text content".to_string(),
                status_code: None,
            })?;

        let tokens_used = response
            .usage()
            .map(|u| (u.input_tokens() + u.output_tokens()) as u32);

        Ok(LlmResponse {
            text,
            model: self.params.model.clone(),
            tokens_used,
            latency_ms: start.elapsed().as_millis() as u64,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::message::HumanMessage;

    #[test]
    fn test_image_format_mapping() {
        assert_eq!(image_format("image/png").unwrap(), ImageFormat::Png);
        assert_eq!(image_format("image/gif").unwrap(), ImageFormat::Gif);
        assert_eq!(image_format("image/jpeg").unwrap(), ImageFormat::Jpeg);
        assert_eq!(image_format("image/webp").unwrap(), ImageFormat::Webp);
    }

    #[test]
    fn test_bmp_is_refused_not_mislabeled() {
        let image = ImageInput::from_bytes(&[0x42, 0x4D], "bmp");
        match image_block(&image) {
            Err(LlmError::Request { message, .. }) => assert!(message.contains("image/bmp")),
            Err(other) => panic!("Expected Request error, got {other:?}"),
            Ok(_) => panic!("bmp must not be sent as another format"),
        }
    }

    #[test]
    fn test_user_message_orders_images_before_text() {
        let message = MultimodalMessage {
            system: "sys".to_string(),
            human: HumanMessage {
                text: "{}".to_string(),
                images: vec![
                    ImageInput::from_bytes(&[1, 2], "png"),
                    ImageInput::from_bytes(&[3, 4], "jpeg"),
                ],
            },
        };
        let msg = user_message(&message).unwrap();
        let content = msg.content();
        assert_eq!(content.len(), 3);
        assert!(matches!(content[0], ContentBlock::Image(_)));
        assert!(matches!(content[1], ContentBlock::Image(_)));
        assert!(matches!(&content[2], ContentBlock::Text(t) if t == "{}"));

        if let ContentBlock::Image(block) = &content[0] {
            assert_eq!(block.format(), &ImageFormat::Png);
            match block.source() {
                Some(ImageSource::Bytes(blob)) => {
                    assert_eq!(blob.clone().into_inner(), vec![1u8, 2])
                }
                other => panic!("Expected byte source, got {other:?}"),
            }
        }
    }

    #[test]
    fn test_corrupt_payload_is_a_request_error() {
        let image = ImageInput {
            data: "***not base64***".to_string(),
            media_type: "image/png".to_string(),
        };
        assert!(matches!(image_block(&image), Err(LlmError::Request { .. })));
    }
}
