//! JSON file output for batch results and extracted data.

use crate::error::{PipelineError, PipelineResult};
use serde::Serialize;
use serde_json::Value;
use std::path::Path;

/// Serialize `item` to `path`, creating parent directories as needed.
pub async fn write_json_file<T: Serialize>(path: &Path, item: &T, pretty: bool) -> PipelineResult<()> {
    let output_err = |message: String| PipelineError::Output {
        path: path.to_path_buf(),
        message,
    };

    let mut body = if pretty {
        serde_json::to_vec_pretty(item)
    } else {
        serde_json::to_vec(item)
    }
    .map_err(|e| output_err(format!("Serialization failed: {e}")))?;
    body.push(b'\n');

    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        tokio::fs::create_dir_all(parent)
            .await
            .map_err(|e| output_err(format!("Failed to create directory: {e}")))?;
    }
    tokio::fs::write(path, body)
        .await
        .map_err(|e| output_err(e.to_string()))?;

    tracing::debug!("Wrote {:?}", path);
    Ok(())
}

/// Read and parse a JSON document.
pub async fn read_json_file(path: &Path) -> Result<Value, String> {
    let text = tokio::fs::read_to_string(path)
        .await
        .map_err(|e| e.to_string())?;
    serde_json::from_str(&text).map_err(|e| e.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use tempfile::tempdir;

    #[tokio::test]
    async fn test_write_creates_parents() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("a/b/out.json");
        write_json_file(&path, &json!([{"x": 1}]), true).await.unwrap();

        let text = std::fs::read_to_string(&path).unwrap();
        assert!(text.contains("\n  "));
        assert_eq!(read_json_file(&path).await.unwrap(), json!([{"x": 1}]));
    }

    #[tokio::test]
    async fn test_compact_output() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("out.json");
        write_json_file(&path, &json!({"a": [1, 2]}), false).await.unwrap();
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "{\"a\":[1,2]}\n");
    }

    #[tokio::test]
    async fn test_read_errors_are_messages() {
        let dir = tempdir().unwrap();
        let bad = dir.path().join("bad.json");
        std::fs::write(&bad, "{oops").unwrap();
        assert!(read_json_file(&bad).await.is_err());
        assert!(read_json_file(&dir.path().join("missing.json")).await.is_err());
    }
}
