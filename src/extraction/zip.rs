//! Safe ZIP extraction

use super::{ExtractReport, PatternSet};
use crate::config::ExtractionConfig;
use crate::error::{ExtractError, Result};
use std::fs::File;
use std::path::Path;
use tracing::{debug, warn};
use zip::ZipArchive;

/// Normalize an archive entry name and refuse anything that could escape
/// the extraction directory
///
/// Backslashes are normalized to forward slashes (Windows-built archives),
/// then absolute paths, drive-letter paths and any `..` component are
/// rejected. `.` components and empty segments are dropped from the result.
pub fn safe_member_name(raw: &str) -> Option<String> {
    let normalized = raw.replace('\\', "/");

    if normalized.starts_with('/') {
        return None;
    }
    let bytes = normalized.as_bytes();
    if bytes.len() >= 2 && bytes[1] == b':' && bytes[0].is_ascii_alphabetic() {
        return None;
    }

    let mut components = Vec::new();
    for component in normalized.split('/') {
        match component {
            "" | "." => {}
            ".." => return None,
            other => components.push(other),
        }
    }

    if components.is_empty() {
        return None;
    }
    Some(components.join("/"))
}

/// One file entry in an archive manifest
#[derive(Clone, Debug)]
pub struct ArchiveEntry {
    /// Normalized entry name
    pub name: String,
    /// Uncompressed size in bytes
    pub size_bytes: u64,
    /// Whether the configured patterns would extract this entry
    pub matched: bool,
}

/// List the file entries of `archive` without extracting anything
///
/// Unsafe entry names are omitted, the same way [`extract_archive`] skips
/// them. Useful for showing what a result contains before deciding where to
/// extract it.
pub fn archive_manifest(archive: &Path, config: &ExtractionConfig) -> Result<Vec<ArchiveEntry>> {
    let patterns = PatternSet::compile(&config.patterns)?;

    let file = File::open(archive)?;
    let mut zip = ZipArchive::new(file).map_err(|e| ExtractError::InvalidArchive {
        archive: archive.to_path_buf(),
        reason: e.to_string(),
    })?;

    let mut entries = Vec::new();
    for index in 0..zip.len() {
        let entry = zip
            .by_index(index)
            .map_err(|e| ExtractError::InvalidArchive {
                archive: archive.to_path_buf(),
                reason: e.to_string(),
            })?;

        if entry.is_dir() {
            continue;
        }
        let Some(name) = safe_member_name(entry.name()) else {
            continue;
        };

        let matched = patterns.matches(&name);
        entries.push(ArchiveEntry {
            name,
            size_bytes: entry.size(),
            matched,
        });
    }

    Ok(entries)
}

/// Extract the entries of `archive` matching the configured patterns into `dest`
///
/// Unsafe entry names are skipped with a warning, never extracted and never
/// fatal; a result archive containing one hostile name still yields every
/// legitimate output.
pub fn extract_archive(
    archive: &Path,
    dest: &Path,
    config: &ExtractionConfig,
) -> Result<ExtractReport> {
    let patterns = PatternSet::compile(&config.patterns)?;

    let file = File::open(archive)?;
    let mut zip = ZipArchive::new(file).map_err(|e| ExtractError::InvalidArchive {
        archive: archive.to_path_buf(),
        reason: e.to_string(),
    })?;

    let mut report = ExtractReport {
        output_dir: dest.to_path_buf(),
        ..Default::default()
    };

    for index in 0..zip.len() {
        let mut entry = zip
            .by_index(index)
            .map_err(|e| ExtractError::InvalidArchive {
                archive: archive.to_path_buf(),
                reason: e.to_string(),
            })?;

        if entry.is_dir() {
            continue;
        }

        let raw_name = entry.name().to_string();
        let Some(name) = safe_member_name(&raw_name) else {
            warn!(entry = %raw_name, "skipping unsafe archive entry");
            report
                .skipped
                .push(format!("unsafe entry skipped: {raw_name}"));
            continue;
        };

        if !patterns.matches(&name) {
            continue;
        }

        let dest_path = dest.join(&name);
        if let Some(parent) = dest_path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| ExtractError::WriteFailed {
                path: dest_path.clone(),
                source: e,
            })?;
        }

        let mut out = File::create(&dest_path).map_err(|e| ExtractError::WriteFailed {
            path: dest_path.clone(),
            source: e,
        })?;
        std::io::copy(&mut entry, &mut out).map_err(|e| ExtractError::WriteFailed {
            path: dest_path.clone(),
            source: e,
        })?;

        debug!(path = ?dest_path, "extracted archive entry");
        report.extracted.push(dest_path);
    }

    Ok(report)
}
