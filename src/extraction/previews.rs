//! Bounded previews of extracted CSV outputs

use crate::config::ExtractionConfig;
use crate::error::Result;
use std::path::{Path, PathBuf};
use tracing::warn;

/// A bounded preview of one extracted CSV file
#[derive(Clone, Debug)]
pub struct CsvPreview {
    /// The previewed file
    pub path: PathBuf,
    /// Header row
    pub headers: Vec<String>,
    /// Data rows, capped at the configured preview limit
    pub rows: Vec<Vec<String>>,
    /// Whether the file held more rows than the preview shows
    pub truncated: bool,
    /// File size in bytes
    pub size_bytes: u64,
    /// Full file text, only for small UTF-8 files under the inline cap
    pub inline_text: Option<String>,
}

/// Preview a single CSV file
///
/// Reads at most `preview_rows` data rows. The full text is inlined only
/// when the file is valid UTF-8 and at or below `inline_max_bytes`; larger
/// files are represented by the preview alone so no caller accidentally
/// holds a huge spreadsheet in memory.
pub fn preview_csv(path: &Path, config: &ExtractionConfig) -> Result<CsvPreview> {
    let size_bytes = std::fs::metadata(path)?.len();

    let mut reader = csv::ReaderBuilder::new().flexible(true).from_path(path)?;
    let headers = reader
        .headers()?
        .iter()
        .map(str::to_string)
        .collect::<Vec<_>>();

    let mut rows = Vec::new();
    let mut truncated = false;
    for record in reader.records() {
        if rows.len() >= config.preview_rows {
            truncated = true;
            break;
        }
        let record = record?;
        rows.push(record.iter().map(str::to_string).collect());
    }

    let inline_text = if size_bytes <= config.inline_max_bytes {
        std::fs::read_to_string(path).ok()
    } else {
        None
    };

    Ok(CsvPreview {
        path: path.to_path_buf(),
        headers,
        rows,
        truncated,
        size_bytes,
        inline_text,
    })
}

/// Preview every `.csv` file in the extracted set
///
/// Files that fail to parse are skipped with a warning; a malformed output
/// never sinks the previews of its siblings.
pub fn preview_csvs(extracted: &[PathBuf], config: &ExtractionConfig) -> Vec<CsvPreview> {
    extracted
        .iter()
        .filter(|p| {
            p.extension()
                .map(|e| e.eq_ignore_ascii_case("csv"))
                .unwrap_or(false)
        })
        .filter_map(|path| match preview_csv(path, config) {
            Ok(preview) => Some(preview),
            Err(e) => {
                warn!(path = ?path, error = %e, "skipping unreadable CSV output");
                None
            }
        })
        .collect()
}
