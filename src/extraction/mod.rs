//! Result archive extraction and CSV previews
//!
//! The API delivers processed outputs as a single ZIP archive. This module
//! filters its entries through configurable glob patterns, extracts them with
//! path-traversal defenses, and builds bounded previews of the extracted CSV
//! files so callers can show results without re-reading the filesystem.

mod patterns;
mod previews;
mod zip;

#[cfg(test)]
mod tests;

pub use patterns::PatternSet;
pub use previews::{CsvPreview, preview_csv, preview_csvs};
pub use zip::{ArchiveEntry, archive_manifest, extract_archive, safe_member_name};

use crate::config::{ExtractionConfig, OutputDirStrategy};
use crate::error::Result;
use std::path::PathBuf;
use tracing::warn;

/// What came out of a result archive
#[derive(Debug, Default)]
pub struct ExtractReport {
    /// Directory the entries were extracted into
    pub output_dir: PathBuf,
    /// Extracted file paths, in archive order
    pub extracted: Vec<PathBuf>,
    /// Human-readable notes about entries that were skipped as unsafe
    pub skipped: Vec<String>,
}

/// Choose the directory results are downloaded and extracted into
///
/// With [`OutputDirStrategy::UseOutputDir`] the configured directory must be
/// absolute and creatable; anything else falls back to a fresh temp directory
/// with a warning rather than failing the whole workflow after a completed
/// (and billed) batch.
pub fn resolve_output_dir(config: &ExtractionConfig) -> Result<PathBuf> {
    if config.output_dir_strategy == OutputDirStrategy::UseOutputDir {
        match &config.output_dir {
            Some(dir) if dir.is_absolute() => match std::fs::create_dir_all(dir) {
                Ok(()) => return Ok(dir.clone()),
                Err(e) => {
                    warn!(dir = ?dir, error = %e, "output_dir not usable, falling back to temp");
                }
            },
            Some(dir) => {
                warn!(dir = ?dir, "output_dir must be absolute, falling back to temp");
            }
            None => {
                warn!("use_output_dir strategy without output_dir, falling back to temp");
            }
        }
    }

    let dir = tempfile::Builder::new()
        .prefix("rentroll-batch-")
        .tempdir()?
        .keep();
    Ok(dir)
}
