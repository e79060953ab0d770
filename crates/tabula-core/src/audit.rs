//! Per-request audit files: the image-free prompt and the invocation result.
//!
//! Audit writes are best effort. A failure is logged and the request goes on.

use crate::llm::InvocationResult;
use std::path::{Path, PathBuf};

const INPUT_PREFIX: &str = "ai_input_table_extract_";
const OUTPUT_PREFIX: &str = "ai_output_table_extract_";

/// Writes audit files under a base directory, named by request id.
#[derive(Debug, Clone)]
pub struct AuditLog {
    base: PathBuf,
}

impl AuditLog {
    pub fn new(base: impl Into<PathBuf>) -> Self {
        Self { base: base.into() }
    }

    pub fn input_path(&self, request_id: &str) -> PathBuf {
        self.base.join(format!("{INPUT_PREFIX}{request_id}.txt"))
    }

    pub fn output_path(&self, request_id: &str) -> PathBuf {
        self.base.join(format!("{OUTPUT_PREFIX}{request_id}.json"))
    }

    /// Record the prompt as sent, minus the image payloads.
    pub async fn write_input(&self, request_id: &str, audit_text: &str) {
        let path = self.input_path(request_id);
        if let Err(e) = self.write(&path, audit_text.as_bytes()).await {
            tracing::warn!("Failed to write audit input {:?}: {e}", path);
        }
    }

    /// Record the parsed result, or the error entry with its raw content.
    pub async fn write_output(&self, request_id: &str, result: &InvocationResult) {
        let path = self.output_path(request_id);
        let body = match serde_json::to_vec_pretty(result) {
            Ok(body) => body,
            Err(e) => {
                tracing::warn!("Failed to serialize audit output for {request_id}: {e}");
                return;
            }
        };
        if let Err(e) = self.write(&path, &body).await {
            tracing::warn!("Failed to write audit output {:?}: {e}", path);
        }
    }

    async fn write(&self, path: &Path, contents: &[u8]) -> std::io::Result<()> {
        tokio::fs::create_dir_all(&self.base).await?;
        tokio::fs::write(path, contents).await
    }
}
