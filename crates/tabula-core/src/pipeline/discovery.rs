//! File discovery for finding screenshots in a folder.

use std::cmp::Ordering;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

use crate::config::DiscoveryConfig;
use crate::error::{PipelineError, PipelineResult};

/// Lists image files directly inside a folder, in natural filename order.
pub struct FileDiscovery {
    config: DiscoveryConfig,
}

/// Information about a discovered file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DiscoveredFile {
    /// Full path to the file
    pub path: PathBuf,
    /// File name, as listed
    pub file_name: String,
}

impl DiscoveredFile {
    /// File name without its extension.
    pub fn stem(&self) -> &str {
        Path::new(&self.file_name)
            .file_stem()
            .and_then(|s| s.to_str())
            .unwrap_or(&self.file_name)
    }
}

impl FileDiscovery {
    pub fn new(config: DiscoveryConfig) -> Self {
        Self { config }
    }

    /// Discover supported images in `folder` (not recursive).
    ///
    /// Entries are matched on extension alone, so an entry that later turns
    /// out to be unreadable still gets a slot in the batch.
    pub fn discover(&self, folder: &Path) -> PipelineResult<Vec<DiscoveredFile>> {
        if !folder.is_dir() {
            return Err(PipelineError::FolderNotFound(folder.to_path_buf()));
        }

        let mut files = Vec::new();
        for entry in WalkDir::new(folder)
            .min_depth(1)
            .max_depth(1)
            .follow_links(true)
        {
            let path = match entry {
                Ok(entry) => entry.into_path(),
                // Keep a listed image that cannot be stat'ed so it still gets
                // its own (failed) slot downstream.
                Err(e) => match e.path() {
                    Some(path) if self.is_supported(path) => {
                        tracing::warn!("Listing {:?} failed: {e}", path);
                        path.to_path_buf()
                    }
                    _ => {
                        tracing::warn!("Skipping entry in {:?}: {e}", folder);
                        continue;
                    }
                },
            };
            if !self.is_supported(&path) {
                continue;
            }
            let Some(name) = path.file_name() else {
                continue;
            };
            let file_name = name.to_string_lossy().into_owned();
            files.push(DiscoveredFile { path, file_name });
        }

        files.sort_by(|a, b| natural_cmp(&a.file_name, &b.file_name));
        tracing::debug!("Discovered {} image(s) in {:?}", files.len(), folder);
        Ok(files)
    }

    /// Check if a file has a supported extension.
    fn is_supported(&self, path: &Path) -> bool {
        path.extension()
            .and_then(|ext| ext.to_str())
            .map(|ext| {
                let ext_lower = ext.to_lowercase();
                self.config
                    .supported_formats
                    .iter()
                    .any(|fmt| fmt.to_lowercase() == ext_lower)
            })
            .unwrap_or(false)
    }
}

/// Compare strings so that embedded digit runs order numerically.
///
/// `section_2.jpg` sorts before `section_10.jpg`. Non-digit characters
/// compare by code point, so case matters (`B` < `a`). Equal numeric
/// values with different zero padding fall back to the raw strings.
pub fn natural_cmp(a: &str, b: &str) -> Ordering {
    let mut left = a.chars().peekable();
    let mut right = b.chars().peekable();

    loop {
        match (left.peek().copied(), right.peek().copied()) {
            (None, None) => return a.cmp(b),
            (None, Some(_)) => return Ordering::Less,
            (Some(_), None) => return Ordering::Greater,
            (Some(x), Some(y)) if x.is_ascii_digit() && y.is_ascii_digit() => {
                let lnum = take_digits(&mut left);
                let rnum = take_digits(&mut right);
                let ord = compare_digit_runs(&lnum, &rnum);
                if ord != Ordering::Equal {
                    return ord;
                }
            }
            (Some(x), Some(y)) => {
                let ord = x.cmp(&y);
                if ord != Ordering::Equal {
                    return ord;
                }
                left.next();
                right.next();
            }
        }
    }
}

fn take_digits(chars: &mut std::iter::Peekable<std::str::Chars<'_>>) -> String {
    let mut digits = String::new();
    while let Some(c) = chars.peek().copied().filter(char::is_ascii_digit) {
        digits.push(c);
        chars.next();
    }
    digits
}

/// Numeric comparison of two digit strings of any length.
fn compare_digit_runs(a: &str, b: &str) -> Ordering {
    let a = a.trim_start_matches('0');
    let b = b.trim_start_matches('0');
    a.len().cmp(&b.len()).then_with(|| a.cmp(b))
}
