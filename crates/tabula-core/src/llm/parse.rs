//! Response parser: raw model text to a JSON value or an error record.
//!
//! Malformed model output is an expected operating condition, so nothing in
//! here returns `Err` or panics. Failures come back as [`ErrorResult`] data
//! that ends up inline in the batch output.

use serde::ser::SerializeMap;
use serde::{Serialize, Serializer};
use serde_json::Value;
use std::fmt;

const JSON_FENCE: &str = "```json";
const FENCE: &str = "```";

/// Why an entry holds no parsed table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Model output was not valid JSON
    ParseError,
    /// Provider call ran out of retries
    CallFailed,
    /// The screenshot file could not be read
    ImageUnreadable,
}

impl ErrorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::ParseError => "parse_error",
            Self::CallFailed => "call_failed",
            Self::ImageUnreadable => "image_unreadable",
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// An inline error entry.
#[derive(Debug, Clone, PartialEq)]
pub struct ErrorResult {
    pub kind: ErrorKind,
    pub message: String,
    /// Raw model output, kept for parse errors
    pub raw_content: Option<String>,
    /// Source image, set by the batch orchestrator
    pub file_name: Option<String>,
}

impl ErrorResult {
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
            raw_content: None,
            file_name: None,
        }
    }

    pub fn with_file_name(mut self, file_name: impl Into<String>) -> Self {
        self.file_name = Some(file_name.into());
        self
    }
}

impl Serialize for ErrorResult {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(None)?;
        map.serialize_entry("error", self.kind.as_str())?;
        map.serialize_entry("message", &self.message)?;
        if let Some(raw) = &self.raw_content {
            map.serialize_entry("raw_content", raw)?;
        }
        if let Some(name) = &self.file_name {
            map.serialize_entry("file_name", name)?;
        }
        map.end()
    }
}

/// Outcome of one invocation: exactly one of a parsed value or an error record.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum InvocationResult {
    Parsed(Value),
    Error(ErrorResult),
}

impl InvocationResult {
    pub fn is_error(&self) -> bool {
        matches!(self, Self::Error(_))
    }

    pub fn as_error(&self) -> Option<&ErrorResult> {
        match self {
            Self::Error(err) => Some(err),
            Self::Parsed(_) => None,
        }
    }
}

/// Strip a leading ```` ```json ```` (or bare ```` ``` ````) fence and its closing fence.
fn strip_code_fence(text: &str) -> &str {
    let body = if let Some(rest) = text.strip_prefix(JSON_FENCE) {
        rest
    } else if let Some(rest) = text.strip_prefix(FENCE) {
        rest
    } else {
        return text;
    };
    body.strip_suffix(FENCE).unwrap_or(body).trim()
}

/// Extract the JSON value from a raw model response.
///
/// Any JSON type is accepted as-is; no schema is imposed here.
pub fn parse_table_response(raw: &str) -> InvocationResult {
    let cleaned = strip_code_fence(raw.trim());
    match serde_json::from_str::<Value>(cleaned) {
        Ok(value) => InvocationResult::Parsed(value),
        Err(e) => {
            tracing::warn!("Failed to parse JSON from LLM response: {e}");
            InvocationResult::Error(ErrorResult {
                kind: ErrorKind::ParseError,
                message: format!("Failed to parse JSON response: {e}"),
                raw_content: Some(raw.to_string()),
                file_name: None,
            })
        }
    }
}
