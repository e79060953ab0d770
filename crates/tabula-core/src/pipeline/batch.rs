//! Batch orchestration: run the agent over every screenshot in a folder.
//!
//! Two modes:
//! - **joint**: one call carrying every image; the single result is the batch result.
//! - **sequential**: one call per image in natural filename order; the output
//!   list has exactly one entry per listed image, failures included inline.
//!
//! Images are processed one at a time. Nothing fans out across images.

use std::fmt;
use std::path::Path;
use std::str::FromStr;

use serde::Serialize;
use serde_json::Value;

use super::discovery::{DiscoveredFile, FileDiscovery};
use crate::agent::TableAgent;
use crate::config::Config;
use crate::context::RequestContext;
use crate::error::{ConfigError, PipelineError, Result, TabulaError};
use crate::image::ImageInput;
use crate::llm::{ErrorKind, ErrorResult, InvocationResult};
use crate::output::write_json_file;
use crate::screenshot::ScreenshotProvider;

/// How a folder is turned into model calls.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum BatchMode {
    Joint,
    #[default]
    Sequential,
}

impl BatchMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Joint => "joint",
            Self::Sequential => "sequential",
        }
    }
}

impl fmt::Display for BatchMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for BatchMode {
    type Err = ConfigError;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "joint" => Ok(Self::Joint),
            "sequential" => Ok(Self::Sequential),
            other => Err(ConfigError::ValidationError(format!(
                "Unknown batch mode '{other}': must be 'joint' or 'sequential'"
            ))),
        }
    }
}

/// Aggregate result of one folder. Serializes as the bare value (joint) or a
/// JSON array with one entry per image (sequential).
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum BatchResult {
    Joint(InvocationResult),
    Sequential(Vec<InvocationResult>),
}

impl BatchResult {
    /// Number of error entries in the result.
    pub fn error_count(&self) -> usize {
        match self {
            Self::Joint(result) => usize::from(result.is_error()),
            Self::Sequential(results) => results.iter().filter(|r| r.is_error()).count(),
        }
    }
}

/// Progress notifications emitted while a folder is processed.
#[derive(Debug, Clone, Copy)]
pub enum BatchEvent<'a> {
    /// Discovery finished; `total` images will be processed.
    Started { total: usize, mode: BatchMode },
    /// One image (sequential) or the whole folder (joint) is done.
    ItemDone {
        index: usize,
        file_name: &'a str,
        failed: bool,
    },
}

/// Drives a [`TableAgent`] over folders of screenshots.
pub struct BatchProcessor {
    agent: TableAgent,
    discovery: FileDiscovery,
    json_context: Value,
    pretty: bool,
}

impl BatchProcessor {
    pub fn new(agent: TableAgent, config: &Config) -> Self {
        Self {
            agent,
            discovery: FileDiscovery::new(config.discovery.clone()),
            json_context: Value::Object(Default::default()),
            pretty: config.output.pretty,
        }
    }

    /// JSON context sent with every call (defaults to `{}`).
    pub fn with_json_context(mut self, json_context: Value) -> Self {
        self.json_context = json_context;
        self
    }

    pub fn agent(&self) -> &TableAgent {
        &self.agent
    }

    /// Process every image in `folder` and persist the result to `output`.
    pub async fn process_folder(
        &self,
        folder: &Path,
        output: &Path,
        mode: BatchMode,
        run_id: &str,
    ) -> Result<BatchResult> {
        self.process_folder_with_progress(folder, output, mode, run_id, |_| {})
            .await
    }

    /// Like [`process_folder`](Self::process_folder), reporting progress through `on_event`.
    ///
    /// Per-image failures become inline entries. Only a missing folder, a
    /// configuration error (e.g. the prompt template vanished) or a failed
    /// output write abort the run.
    pub async fn process_folder_with_progress<F>(
        &self,
        folder: &Path,
        output: &Path,
        mode: BatchMode,
        run_id: &str,
        on_event: F,
    ) -> Result<BatchResult>
    where
        F: Fn(BatchEvent<'_>),
    {
        let files = self.discovery.discover(folder)?;
        tracing::info!(
            "Processing {} image(s) from {:?} in {mode} mode",
            files.len(),
            folder
        );
        on_event(BatchEvent::Started {
            total: files.len(),
            mode,
        });

        let result = match mode {
            BatchMode::Sequential => {
                BatchResult::Sequential(self.run_sequential(&files, run_id, &on_event).await?)
            }
            BatchMode::Joint => BatchResult::Joint(self.run_joint(&files, run_id, &on_event).await?),
        };

        write_json_file(output, &result, self.pretty).await?;
        tracing::info!(
            "Wrote results to {:?} ({} error entr{})",
            output,
            result.error_count(),
            if result.error_count() == 1 { "y" } else { "ies" }
        );
        Ok(result)
    }

    async fn run_sequential<F>(
        &self,
        files: &[DiscoveredFile],
        run_id: &str,
        on_event: &F,
    ) -> Result<Vec<InvocationResult>>
    where
        F: Fn(BatchEvent<'_>),
    {
        let mut results = Vec::with_capacity(files.len());

        for (index, file) in files.iter().enumerate() {
            tracing::debug!(
                "Processing image {}/{}: {}",
                index + 1,
                files.len(),
                file.file_name
            );
            let ctx = RequestContext::new(format!("{run_id}_{}", file.stem()));

            let result = match ImageInput::load(&file.path) {
                Ok(image) => {
                    let outcome = self
                        .agent
                        .call(&ctx, &self.json_context, vec![image], None)
                        .await;
                    recover(outcome, Some(&file.file_name))?
                }
                Err(e) => {
                    tracing::warn!("Skipping unreadable image {}: {e}", file.file_name);
                    InvocationResult::Error(
                        ErrorResult::new(ErrorKind::ImageUnreadable, e.to_string())
                            .with_file_name(&file.file_name),
                    )
                }
            };

            on_event(BatchEvent::ItemDone {
                index,
                file_name: &file.file_name,
                failed: result.is_error(),
            });
            results.push(result);
        }

        Ok(results)
    }

    async fn run_joint<F>(
        &self,
        files: &[DiscoveredFile],
        run_id: &str,
        on_event: &F,
    ) -> Result<InvocationResult>
    where
        F: Fn(BatchEvent<'_>),
    {
        let images: Vec<ImageInput> = files
            .iter()
            .filter_map(|file| {
                ImageInput::load(&file.path)
                    .inspect_err(|e| tracing::warn!("Skipping unreadable image: {e}"))
                    .ok()
            })
            .collect();

        let result = if images.is_empty() {
            tracing::warn!("No loadable images; skipping the model call");
            InvocationResult::Error(ErrorResult::new(
                ErrorKind::ImageUnreadable,
                "No supported images could be loaded",
            ))
        } else {
            let ctx = RequestContext::new(run_id);
            let outcome = self
                .agent
                .call(&ctx, &self.json_context, images, None)
                .await;
            recover(outcome, None)?
        };

        on_event(BatchEvent::ItemDone {
            index: 0,
            file_name: run_id,
            failed: result.is_error(),
        });
        Ok(result)
    }
}

/// Turn call exhaustion into an inline entry; everything else stays fatal.
fn recover(outcome: Result<InvocationResult>, file_name: Option<&str>) -> Result<InvocationResult> {
    let tag = |err: ErrorResult| match file_name {
        Some(name) => err.with_file_name(name),
        None => err,
    };
    match outcome {
        Ok(InvocationResult::Error(err)) => Ok(InvocationResult::Error(tag(err))),
        Ok(parsed) => Ok(parsed),
        Err(TabulaError::Llm(e)) => Ok(InvocationResult::Error(tag(ErrorResult::new(
            ErrorKind::CallFailed,
            e.to_string(),
        )))),
        Err(e) => Err(e),
    }
}

/// Capture `url` into `images_dir` through `screenshots`, then process that folder.
pub async fn extract_from_url(
    screenshots: &dyn ScreenshotProvider,
    url: &str,
    images_dir: &Path,
    processor: &BatchProcessor,
    output: &Path,
    mode: BatchMode,
    run_id: &str,
) -> Result<BatchResult> {
    tokio::fs::create_dir_all(images_dir)
        .await
        .map_err(|e| PipelineError::Screenshot {
            url: url.to_string(),
            message: format!("Failed to create {images_dir:?}: {e}"),
        })?;
    tracing::info!("Capturing {url} into {:?}", images_dir);
    screenshots.capture(url, images_dir).await?;
    processor
        .process_folder(images_dir, output, mode, run_id)
        .await
}
