//! Screenshot capture seam.
//!
//! Browser automation lives outside this crate. A provider renders a page and
//! leaves one image per table-like section in the output folder, named
//! `section_01.jpg`, `section_02.jpg`, ..., plus the full-page capture
//! [`FULL_PAGE_FILE_NAME`]. The batch orchestrator only consumes that folder.

use crate::error::PipelineError;
use async_trait::async_trait;
use std::path::Path;

/// Name of the full-page capture written next to the section images.
pub const FULL_PAGE_FILE_NAME: &str = "original_screenshot.jpeg";

/// File name for the `index`-th section (1-based).
pub fn section_file_name(index: usize) -> String {
    format!("section_{index:02}.jpg")
}

/// Renders `url` and writes its section screenshots into `output_dir`.
#[async_trait]
pub trait ScreenshotProvider: Send + Sync {
    async fn capture(&self, url: &str, output_dir: &Path) -> Result<(), PipelineError>;
}
