//! Folder processing pipeline.
//!
//! - **discovery**: list screenshots in a folder in natural order
//! - **batch**: drive the agent over a folder and persist the result

pub mod batch;
pub mod discovery;

// Re-exports for convenient access
pub use batch::{extract_from_url, BatchEvent, BatchMode, BatchProcessor, BatchResult};
pub use discovery::{natural_cmp, DiscoveredFile, FileDiscovery};
