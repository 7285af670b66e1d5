//! Result pointer resolution and archive fetch

use super::BatchWorkflow;
use crate::error::{Error, Result};
use crate::types::{BatchId, BatchSnapshot, Event};
use std::path::{Path, PathBuf};
use tracing::{info, warn};

/// Resolve the downloadable ZIP pointer from a terminal snapshot
///
/// The canonical `outputs.download_url` wins when present and non-empty.
/// Otherwise the legacy `batchDownloads` list is scanned for the first entry
/// that is either typed `"zip"` or whose URL path ends in `.zip`. Returns
/// `None` when neither source yields a pointer.
pub fn resolve_result_url(snapshot: &BatchSnapshot) -> Option<String> {
    if let Some(url) = snapshot.canonical_url() {
        return Some(url.to_string());
    }

    for download in &snapshot.batch_downloads {
        let url = download.download_url.trim();
        if url.is_empty() {
            continue;
        }
        if download.kind.eq_ignore_ascii_case("zip") {
            return Some(url.to_string());
        }
        if let Ok(parsed) = url::Url::parse(url)
            && parsed.path().to_lowercase().ends_with(".zip")
        {
            return Some(url.to_string());
        }
    }

    None
}

impl BatchWorkflow {
    /// Fetch the result archive for a finished batch into `dest_dir`
    ///
    /// Pre-signed URLs expire, so an HTTP 403 triggers exactly one refresh:
    /// the status endpoint is re-queried, the pointer re-resolved and the
    /// download retried. A second 403 is reported as an expired result
    /// rather than retried again.
    pub async fn fetch_result(
        &self,
        batch_id: &BatchId,
        snapshot: &BatchSnapshot,
        dest_dir: &Path,
    ) -> Result<PathBuf> {
        let url = resolve_result_url(snapshot).ok_or_else(|| Error::MissingResult {
            batch_id: batch_id.clone(),
        })?;

        match self.client.download_result(&url, dest_dir).await {
            Ok(path) => Ok(path),
            Err(Error::Api { status: 403, .. }) => {
                warn!(batch_id = %batch_id, "result URL rejected with 403, refreshing pointer");

                let fresh = self.client.status(batch_id).await?;
                let fresh_url =
                    resolve_result_url(&fresh).ok_or_else(|| Error::MissingResult {
                        batch_id: batch_id.clone(),
                    })?;
                self.emit(Event::ResultRefreshed {
                    batch_id: batch_id.clone(),
                });

                match self.client.download_result(&fresh_url, dest_dir).await {
                    Ok(path) => {
                        info!(batch_id = %batch_id, "refreshed result URL succeeded");
                        Ok(path)
                    }
                    Err(Error::Api { status: 403, .. }) => {
                        Err(Error::ResultExpired { url: fresh_url })
                    }
                    Err(e) => Err(e),
                }
            }
            Err(e) => Err(e),
        }
    }
}
