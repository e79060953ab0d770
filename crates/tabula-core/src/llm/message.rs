//! Provider-agnostic multimodal message and the prompt assembler that builds it.

use crate::error::ConfigError;
use crate::image::ImageInput;
use chrono::NaiveDate;
use serde_json::Value;
use std::path::Path;

/// Placeholder sequence stripped from the human text before sending.
const ELLIPSIS: &str = "...";

/// The user turn: text plus zero or more images, in send order.
#[derive(Debug, Clone)]
pub struct HumanMessage {
    pub text: String,
    pub images: Vec<ImageInput>,
}

/// System instruction plus one human turn.
#[derive(Debug, Clone)]
pub struct MultimodalMessage {
    pub system: String,
    pub human: HumanMessage,
}

/// The message to send plus its image-free rendering for audit logs.
#[derive(Debug, Clone)]
pub struct PromptBundle {
    pub message: MultimodalMessage,
    pub audit_text: String,
}

/// Assemble a multimodal message dated today (local time).
pub fn build_messages(
    system_prompt_path: &Path,
    json_context: &Value,
    images: Vec<ImageInput>,
    auxiliary_text: Option<&str>,
) -> Result<PromptBundle, ConfigError> {
    let today = chrono::Local::now().date_naive();
    build_messages_on(system_prompt_path, json_context, images, auxiliary_text, today)
}

/// Assemble a multimodal message with an explicit date line.
///
/// The system text is `"Today's date - YYYY-MM-DD\n"` followed by the
/// template. The human text is the compact JSON context, then the auxiliary
/// text after a blank line, with every `...` removed.
pub fn build_messages_on(
    system_prompt_path: &Path,
    json_context: &Value,
    images: Vec<ImageInput>,
    auxiliary_text: Option<&str>,
    today: NaiveDate,
) -> Result<PromptBundle, ConfigError> {
    let template =
        std::fs::read_to_string(system_prompt_path).map_err(|source| ConfigError::PromptLoad {
            path: system_prompt_path.to_path_buf(),
            source,
        })?;

    let system = format!("Today's date - {}\n{}", today.format("%Y-%m-%d"), template);

    let mut text = json_context.to_string();
    if let Some(aux) = auxiliary_text {
        text.push_str("\n\n");
        text.push_str(aux);
    }
    let text = text.replace(ELLIPSIS, "");

    let audit_text = format!("System: {system}\n\nHuman: {text}");

    tracing::debug!(
        images = images.len(),
        text_len = text.len(),
        "Assembled prompt"
    );

    Ok(PromptBundle {
        message: MultimodalMessage {
            system,
            human: HumanMessage { text, images },
        },
        audit_text,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::path::PathBuf;

    fn prompt_file(dir: &tempfile::TempDir, content: &str) -> PathBuf {
        let path = dir.path().join("prompt.txt");
        std::fs::write(&path, content).unwrap();
        path
    }

    fn day() -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 3, 9).unwrap()
    }

    #[test]
    fn test_system_text_starts_with_date_line() {
        let dir = tempfile::tempdir().unwrap();
        let path = prompt_file(&dir, "Extract every table as JSON.");
        let bundle = build_messages_on(&path, &json!({}), vec![], None, day()).unwrap();
        assert_eq!(
            bundle.message.system,
            "Today's date - 2025-03-09\nExtract every table as JSON."
        );
    }

    #[test]
    fn test_human_text_is_compact_json_plus_auxiliary() {
        let dir = tempfile::tempdir().unwrap();
        let path = prompt_file(&dir, "p");
        let bundle = build_messages_on(
            &path,
            &json!({"page": "orders"}),
            vec![],
            Some("Header row is sticky"),
            day(),
        )
        .unwrap();
        assert_eq!(
            bundle.message.human.text,
            "{\"page\":\"orders\"}\n\nHeader row is sticky"
        );
    }

    #[test]
    fn test_ellipsis_is_stripped_everywhere() {
        let dir = tempfile::tempdir().unwrap();
        let path = prompt_file(&dir, "p");
        let bundle = build_messages_on(
            &path,
            &json!({"rows": "a...b"}),
            vec![],
            Some("more... and more..."),
            day(),
        )
        .unwrap();
        assert!(!bundle.message.human.text.contains("..."));
        assert!(bundle.message.human.text.contains("ab"));
        assert!(bundle.message.human.text.ends_with("more and more"));
    }

    #[test]
    fn test_images_keep_their_order_and_stay_out_of_audit_text() {
        let dir = tempfile::tempdir().unwrap();
        let path = prompt_file(&dir, "p");
        let images = vec![
            ImageInput::from_bytes(b"first-image", "jpg"),
            ImageInput::from_bytes(b"second-image", "png"),
        ];
        let bundle = build_messages_on(&path, &json!({}), images.clone(), None, day()).unwrap();

        assert_eq!(bundle.message.human.images, images);
        assert!(bundle.audit_text.starts_with("System: Today's date - 2025-03-09\n"));
        assert!(bundle.audit_text.contains("Human: {}"));
        for image in &images {
            assert!(!bundle.audit_text.contains(&image.data));
        }
    }

    #[test]
    fn test_missing_prompt_file_fails() {
        let err = build_messages_on(
            Path::new("/no/such/prompt.txt"),
            &json!({}),
            vec![],
            None,
            day(),
        )
        .unwrap_err();
        assert!(matches!(err, ConfigError::PromptLoad { .. }));
    }
}
