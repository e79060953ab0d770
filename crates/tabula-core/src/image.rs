//! Image codec: screenshot files to base64 payloads for multimodal messages.

use crate::error::{PipelineError, PipelineResult};
use base64::Engine;
use std::path::Path;

/// Base64-encoded image ready to send to an LLM API.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageInput {
    /// Base64-encoded image bytes
    pub data: String,
    /// MIME type (e.g., "image/jpeg", "image/png")
    pub media_type: String,
}

impl ImageInput {
    /// Create an `ImageInput` from raw bytes and format string.
    ///
    /// The format is the image format identifier (e.g., "jpeg", "png", "gif").
    pub fn from_bytes(bytes: &[u8], format: &str) -> Self {
        let media_type = match format.to_lowercase().as_str() {
            "jpeg" | "jpg" => "image/jpeg",
            "png" => "image/png",
            "gif" => "image/gif",
            "bmp" => "image/bmp",
            "webp" => "image/webp",
            other => {
                tracing::warn!("Unknown image format '{other}', defaulting to image/jpeg");
                "image/jpeg"
            }
        };

        Self {
            data: base64::engine::general_purpose::STANDARD.encode(bytes),
            media_type: media_type.to_string(),
        }
    }

    /// Read and encode an image file. The format comes from the file extension.
    ///
    /// A missing or unreadable file is reported as [`PipelineError::ImageRead`].
    pub fn load(path: &Path) -> PipelineResult<Self> {
        let bytes = std::fs::read(path).map_err(|e| PipelineError::ImageRead {
            path: path.to_path_buf(),
            message: e.to_string(),
        })?;
        let format = path
            .extension()
            .and_then(|ext| ext.to_str())
            .unwrap_or("jpeg");
        Ok(Self::from_bytes(&bytes, format))
    }

    /// Decode the payload back to raw bytes (for APIs that take binary blobs).
    pub fn decode(&self) -> Result<Vec<u8>, base64::DecodeError> {
        base64::engine::general_purpose::STANDARD.decode(&self.data)
    }

    /// Return a data URL suitable for OpenAI-style APIs.
    pub fn data_url(&self) -> String {
        format!("data:{};base64,{}", self.media_type, self.data)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_image_input_from_bytes_jpeg() {
        let input = ImageInput::from_bytes(&[0xFF, 0xD8, 0xFF], "jpg");
        assert_eq!(input.media_type, "image/jpeg");
        assert_eq!(input.data, "/9j/");
    }

    #[test]
    fn test_image_input_from_bytes_png_uppercase() {
        let input = ImageInput::from_bytes(&[0x89, 0x50, 0x4E, 0x47], "PNG");
        assert_eq!(input.media_type, "image/png");
    }

    #[test]
    fn test_unknown_format_defaults_to_jpeg() {
        let input = ImageInput::from_bytes(&[1, 2, 3], "tiff");
        assert_eq!(input.media_type, "image/jpeg");
    }

    #[test]
    fn test_encode_decode_is_identity() {
        let samples: Vec<Vec<u8>> = vec![
            vec![],
            vec![0],
            vec![0xFF, 0xD8, 0xFF, 0xE0],
            (0..=255).collect(),
            vec![7; 1025],
        ];
        for bytes in samples {
            let input = ImageInput::from_bytes(&bytes, "png");
            assert_eq!(input.decode().unwrap(), bytes);
        }
    }

    #[test]
    fn test_image_input_data_url() {
        let input = ImageInput::from_bytes(&[1, 2, 3], "gif");
        assert_eq!(input.data_url(), "data:image/gif;base64,AQID");
    }

    #[test]
    fn test_load_reads_file_and_uses_extension() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("section_01.png");
        std::fs::write(&path, [0x89, 0x50, 0x4E, 0x47]).unwrap();

        let input = ImageInput::load(&path).unwrap();
        assert_eq!(input.media_type, "image/png");
        assert_eq!(input.decode().unwrap(), vec![0x89, 0x50, 0x4E, 0x47]);
    }

    #[test]
    fn test_load_missing_file_is_an_error_value() {
        let err = ImageInput::load(Path::new("/definitely/not/here.jpg")).unwrap_err();
        match err {
            PipelineError::ImageRead { path, .. } => {
                assert_eq!(path, Path::new("/definitely/not/here.jpg"));
            }
            other => panic!("Expected ImageRead, got {other:?}"),
        }
    }
}
