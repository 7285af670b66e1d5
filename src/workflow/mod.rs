//! End-to-end batch workflow: submit, poll, fetch, extract
//!
//! [`BatchWorkflow`] owns the client, the cancellation token and the event
//! channel. Each stage is callable on its own for callers that want to drive
//! the steps themselves (e.g. submit now, poll from a different process);
//! [`BatchWorkflow::run`] chains them for the common case.

mod poll;
mod resolve;

#[cfg(test)]
mod tests;

pub use resolve::resolve_result_url;

use crate::client::ApiClient;
use crate::config::Config;
use crate::error::{Error, Result};
use crate::extraction::{self, CsvPreview, ExtractReport};
use crate::types::{BatchSnapshot, BatchStatus, Event, UploadReceipt};
use crate::validation::{self, UploadRequest};
use std::path::PathBuf;
use tokio::sync::broadcast;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

/// Capacity of the event broadcast channel
const EVENT_CHANNEL_CAPACITY: usize = 256;

/// Everything produced by a completed workflow run
#[derive(Debug)]
pub struct BatchOutcome {
    /// The upload receipt from submission
    pub receipt: UploadReceipt,
    /// The terminal snapshot that ended polling
    pub snapshot: BatchSnapshot,
    /// Where the result archive was saved, when one was fetched
    pub archive: Option<PathBuf>,
    /// What was extracted from the archive, when extraction ran
    pub extraction: Option<ExtractReport>,
    /// Previews of extracted CSV outputs
    pub previews: Vec<CsvPreview>,
}

/// Orchestrates one batch from upload through extracted results
///
/// Cheap to clone is not a goal here; create one workflow per batch. The
/// cancellation token is honored between polls, never mid-request, so an
/// in-flight HTTP call always runs to completion.
pub struct BatchWorkflow {
    client: ApiClient,
    config: Config,
    cancel: CancellationToken,
    event_tx: broadcast::Sender<Event>,
}

impl BatchWorkflow {
    /// Create a workflow from a configuration, validating it first
    pub fn new(config: Config) -> Result<Self> {
        config.validate()?;
        let client = ApiClient::new(&config)?;
        let (event_tx, _) = broadcast::channel(EVENT_CHANNEL_CAPACITY);

        Ok(Self {
            client,
            config,
            cancel: CancellationToken::new(),
            event_tx,
        })
    }

    /// Create a workflow from the process environment
    pub fn from_env() -> Result<Self> {
        Self::new(Config::from_env()?)
    }

    /// Subscribe to workflow events
    ///
    /// Events are informational; a dropped or lagging receiver never blocks
    /// the workflow.
    pub fn subscribe(&self) -> broadcast::Receiver<Event> {
        self.event_tx.subscribe()
    }

    /// A token that cancels this workflow when triggered
    pub fn cancel_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    /// Request cancellation; takes effect between polls
    pub fn cancel(&self) {
        self.cancel.cancel();
    }

    /// The configuration this workflow was built with
    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Access the underlying API client
    pub fn client(&self) -> &ApiClient {
        &self.client
    }

    pub(crate) fn emit(&self, event: Event) {
        // Err here only means there are no subscribers
        let _ = self.event_tx.send(event);
    }

    /// Validate and submit an upload, returning the batch receipt
    ///
    /// Validation failures surface before any network traffic. The upload is
    /// never retried on failure since a duplicate submission would consume
    /// credits twice.
    pub async fn submit(&self, request: &UploadRequest) -> Result<UploadReceipt> {
        let notifications = validation::validate_request(
            request,
            self.config.default_notification_email.as_deref(),
        )?;

        let receipt = self.client.upload(&request.files, &notifications).await?;

        info!(
            batch_id = %receipt.batch_id,
            files = receipt.files_uploaded,
            "batch accepted"
        );
        self.emit(Event::UploadAccepted {
            batch_id: receipt.batch_id.clone(),
            files_uploaded: receipt.files_uploaded,
        });

        Ok(receipt)
    }

    /// Run the complete workflow: submit, poll, fetch, extract, preview
    pub async fn run(&self, request: &UploadRequest) -> Result<BatchOutcome> {
        let receipt = self.submit(request).await?;
        let snapshot = self.poll_until_terminal(&receipt.batch_id).await?;

        // A failed batch normally has nothing to download; only fetch when a
        // pointer actually exists
        if snapshot.status == BatchStatus::Failed && resolve_result_url(&snapshot).is_none() {
            warn!(
                batch_id = %receipt.batch_id,
                error = snapshot.error_message.as_deref().unwrap_or("unknown"),
                "batch failed with no result archive"
            );
            return Ok(BatchOutcome {
                receipt,
                snapshot,
                archive: None,
                extraction: None,
                previews: Vec::new(),
            });
        }

        let dest_dir = extraction::resolve_output_dir(&self.config.extraction)?;
        let archive = self
            .fetch_result(&receipt.batch_id, &snapshot, &dest_dir)
            .await?;

        let extraction_config = self.config.extraction.clone();
        let archive_for_task = archive.clone();
        let dest_for_task = dest_dir.clone();
        let report = tokio::task::spawn_blocking(move || {
            extraction::extract_archive(&archive_for_task, &dest_for_task, &extraction_config)
        })
        .await
        .map_err(|e| Error::Other(format!("extraction task panicked: {e}")))??;

        let previews = extraction::preview_csvs(&report.extracted, &self.config.extraction);

        Ok(BatchOutcome {
            receipt,
            snapshot,
            archive: Some(archive),
            extraction: Some(report),
            previews,
        })
    }
}
