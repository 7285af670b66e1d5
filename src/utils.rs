//! Utility functions for result downloads and path handling

use std::path::{Path, PathBuf};

/// Maximum number of rename attempts when resolving file collisions
const MAX_RENAME_ATTEMPTS: u32 = 9999;

/// Fallback name for a downloaded result archive
const DEFAULT_RESULT_NAME: &str = "batch-results.zip";

/// Whether a URL is a pre-signed S3 URL
///
/// Pre-signed URLs already carry auth in their query parameters; sending a
/// bearer Authorization header to S3 causes signature conflicts, so the
/// client must skip the header for these.
pub fn is_presigned_url(url: &str) -> bool {
    url.contains("X-Amz-") || url.contains("amazonaws.com")
}

/// Extract a filename for a downloaded result
///
/// Priority:
/// 1. `Content-Disposition` response header
/// 2. `response-content-disposition` query parameter (pre-signed S3 URLs)
/// 3. Last segment of the URL path
/// 4. Fallback default name
pub fn filename_from_response(response: &reqwest::Response, url: &str) -> String {
    // 1. Content-Disposition header
    if let Some(header) = response.headers().get("content-disposition")
        && let Ok(value) = header.to_str()
        && let Some(name) = filename_from_disposition(value)
    {
        return name;
    }

    // 2. Pre-signed S3 URL: the disposition rides in the query string
    if let Ok(parsed) = url::Url::parse(url)
        && let Some(query) = parsed.query()
    {
        let decoded = urlencoding::decode(query).unwrap_or_else(|_| query.into());
        if let Some(name) = filename_from_disposition(&decoded) {
            return name;
        }
    }

    // 3. URL path segment (must look like a filename)
    if let Ok(parsed) = url::Url::parse(url)
        && let Some(mut segments) = parsed.path_segments()
        && let Some(last) = segments.next_back()
        && !last.is_empty()
        && last.contains('.')
    {
        return last.to_string();
    }

    // 4. Fallback
    DEFAULT_RESULT_NAME.to_string()
}

/// Pull a `filename=...` value out of a Content-Disposition-style string
fn filename_from_disposition(value: &str) -> Option<String> {
    // Handles filename="x", filename=x and filename*=UTF-8''x forms
    static PATTERN: std::sync::OnceLock<Option<regex::Regex>> = std::sync::OnceLock::new();
    let re = PATTERN
        .get_or_init(|| regex::Regex::new(r#"filename\*?=(?:UTF-8'[^']*')?"?([^";&]+)"?"#).ok())
        .as_ref()?;

    let name = re.captures(value)?.get(1)?.as_str().trim();
    if name.is_empty() {
        return None;
    }
    let decoded = urlencoding::decode(name)
        .map(|c| c.into_owned())
        .unwrap_or_else(|_| name.to_string());
    Some(decoded)
}

/// Get a unique path by appending `_1`, `_2`, ... when the file exists
///
/// Used when saving downloaded results so a second run never overwrites an
/// earlier archive.
pub fn unique_path(path: &Path) -> PathBuf {
    if !path.exists() {
        return path.to_path_buf();
    }

    let stem = path
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or("download");
    let extension = path.extension().and_then(|e| e.to_str());
    let parent = path.parent().unwrap_or_else(|| Path::new("."));

    for i in 1..=MAX_RENAME_ATTEMPTS {
        let candidate = match extension {
            Some(ext) => parent.join(format!("{stem}_{i}.{ext}")),
            None => parent.join(format!("{stem}_{i}")),
        };
        if !candidate.exists() {
            return candidate;
        }
    }

    // All suffixes taken; last resort is the original path
    path.to_path_buf()
}
