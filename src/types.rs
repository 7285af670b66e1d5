//! Core types for rentroll-batch

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Unique identifier for a server-side batch
///
/// Opaque UUID assigned by the API at submission, immutable thereafter.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct BatchId(pub String);

impl BatchId {
    /// Create a new BatchId
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Get the inner string value
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<String> for BatchId {
    fn from(id: String) -> Self {
        Self(id)
    }
}

impl From<&str> for BatchId {
    fn from(id: &str) -> Self {
        Self(id.to_string())
    }
}

impl std::fmt::Display for BatchId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl std::str::FromStr for BatchId {
    type Err = std::convert::Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self(s.to_string()))
    }
}

/// Batch processing status
///
/// Closed enumeration of the server's status values. The endpoint naming is
/// not fully consistent (`complete` vs `completed`, `processing` vs
/// `in-progress`), so parsing normalizes the known aliases. Anything else
/// becomes `Unknown` and is treated as non-terminal rather than guessed at
/// from substrings.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum BatchStatus {
    /// Queued and waiting to start
    Queued,
    /// Currently processing (`processing` or `in-progress`)
    Processing,
    /// All files processed successfully (`complete` or `completed`)
    Complete,
    /// Batch failed
    Failed,
    /// Some files succeeded, some failed (`partial`, `partially complete(d)`)
    Partial,
    /// Unrecognized status value, kept verbatim
    Unknown(String),
}

impl BatchStatus {
    /// Parse a raw server status string into the closed enumeration
    pub fn parse(raw: &str) -> Self {
        let normalized = raw.trim().to_lowercase();
        match normalized.as_str() {
            "queued" => BatchStatus::Queued,
            "processing" | "in-progress" | "in progress" => BatchStatus::Processing,
            "complete" | "completed" => BatchStatus::Complete,
            "failed" => BatchStatus::Failed,
            "partial" | "partially complete" | "partially completed" => BatchStatus::Partial,
            _ => BatchStatus::Unknown(normalized),
        }
    }

    /// The normalized string form used for terminal-set membership checks
    pub fn as_normalized(&self) -> &str {
        match self {
            BatchStatus::Queued => "queued",
            BatchStatus::Processing => "processing",
            BatchStatus::Complete => "complete",
            BatchStatus::Failed => "failed",
            BatchStatus::Partial => "partial",
            BatchStatus::Unknown(raw) => raw,
        }
    }

    /// Whether this status is terminal according to a configured set
    ///
    /// The terminal set is configurable because the exact literals differ
    /// across API documentation fragments. `Unknown` statuses are only
    /// terminal when the caller explicitly added them to the set.
    pub fn is_terminal_in(&self, terminal_statuses: &[String]) -> bool {
        let s = self.as_normalized();
        terminal_statuses
            .iter()
            .any(|t| t.eq_ignore_ascii_case(s) || BatchStatus::parse(t).as_normalized() == s)
    }
}

impl Default for BatchStatus {
    fn default() -> Self {
        BatchStatus::Unknown(String::new())
    }
}

impl From<String> for BatchStatus {
    fn from(raw: String) -> Self {
        BatchStatus::parse(&raw)
    }
}

impl std::fmt::Display for BatchStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_normalized())
    }
}

impl Serialize for BatchStatus {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_normalized())
    }
}

impl<'de> Deserialize<'de> for BatchStatus {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        Ok(BatchStatus::parse(&raw))
    }
}

/// Per-file entry in a status response
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FileResult {
    /// Server-side file identifier, when present
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub file_id: Option<String>,

    /// Original file name as uploaded
    #[serde(default)]
    pub file_name: String,

    /// Per-file processing status (raw server value)
    #[serde(default)]
    pub status: String,

    /// Pre-signed per-file download URL (legacy/secondary path)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub download_url: Option<String>,

    /// Per-file failure message, if the file failed
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_message: Option<String>,
}

impl FileResult {
    /// Whether this individual file has finished (completed or failed)
    pub fn is_terminal(&self) -> bool {
        matches!(
            self.status.trim().to_lowercase().as_str(),
            "complete" | "completed" | "failed"
        )
    }
}

/// A batch-level download entry (legacy/secondary result path)
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BatchDownload {
    /// Artifact type (e.g. `"zip"`)
    #[serde(rename = "type", default)]
    pub kind: String,

    /// Pre-signed download URL for this artifact
    #[serde(default)]
    pub download_url: String,

    /// Expiry of the pre-signed URL, when reported
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expires_at: Option<String>,
}

/// Canonical batch output pointer
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct BatchOutputs {
    /// Pre-signed URL to the ZIP archive of all processed outputs
    #[serde(default)]
    pub download_url: Option<String>,
}

/// One observed status snapshot for a batch
///
/// The workflow never mutates a batch; it only observes snapshots like this
/// one and acts on the most recently fetched.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BatchSnapshot {
    /// The batch this snapshot describes
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub batch_id: Option<BatchId>,

    /// Current batch status
    #[serde(default)]
    pub status: BatchStatus,

    /// Overall progress percentage (0-100), monotonically non-decreasing
    #[serde(default)]
    pub percent_complete: f64,

    /// Number of files that have finished processing
    #[serde(default)]
    pub files_completed: u32,

    /// Total number of files in the batch
    #[serde(default)]
    pub file_count: u32,

    /// Per-file results
    #[serde(default)]
    pub files: Vec<FileResult>,

    /// Legacy batch-level download entries
    #[serde(default)]
    pub batch_downloads: Vec<BatchDownload>,

    /// Batch-level error message, if the batch failed
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_message: Option<String>,

    /// Canonical result pointer (preferred over `batch_downloads`)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub outputs: Option<BatchOutputs>,

    /// Expiry of the canonical pre-signed URL
    #[serde(
        default,
        rename = "presigned_url_expiry",
        skip_serializing_if = "Option::is_none"
    )]
    pub presigned_url_expiry: Option<DateTime<Utc>>,
}

impl BatchSnapshot {
    /// The canonical result URL, if present and non-empty
    pub fn canonical_url(&self) -> Option<&str> {
        self.outputs
            .as_ref()
            .and_then(|o| o.download_url.as_deref())
            .filter(|u| !u.trim().is_empty())
    }

    /// Whether every individual file is in a completed/failed state
    ///
    /// Some endpoint variants only report per-file statuses; when the batch
    /// status itself is non-terminal or unknown, an all-files-finished
    /// snapshot still counts as terminal.
    pub fn all_files_terminal(&self) -> bool {
        !self.files.is_empty() && self.files.iter().all(FileResult::is_terminal)
    }
}

/// Response to a successful upload (HTTP 202)
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UploadReceipt {
    /// The batch assigned by the API
    pub batch_id: BatchId,

    /// Browser-facing tracking URL
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tracking_url: Option<String>,

    /// Number of files accepted into the batch
    #[serde(default)]
    pub files_uploaded: u32,
}

/// A completion notification target, serialized as `{"type": ..., "entry": ...}`
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "entry", rename_all = "lowercase")]
pub enum NotificationMethod {
    /// Email address to notify on completion
    Email(String),
    /// HTTPS webhook URL to call on completion
    Webhook(String),
}

/// Events emitted by a [`BatchWorkflow`](crate::workflow::BatchWorkflow)
///
/// Consumers subscribe via `BatchWorkflow::subscribe()`; events are purely
/// informational and dropping the receiver never blocks the workflow.
#[derive(Clone, Debug)]
pub enum Event {
    /// The upload was accepted and a batch was created
    UploadAccepted {
        /// The new batch
        batch_id: BatchId,
        /// Files accepted into the batch
        files_uploaded: u32,
    },

    /// A fresh status snapshot was observed
    StatusUpdated {
        /// The polled batch
        batch_id: BatchId,
        /// Current status
        status: BatchStatus,
        /// Progress percentage after monotonic clamping
        percent_complete: f64,
        /// Files completed after monotonic clamping
        files_completed: u32,
        /// Total files in the batch
        file_count: u32,
    },

    /// The server reported a status value outside the known enumeration
    UnknownStatus {
        /// The polled batch
        batch_id: BatchId,
        /// The unrecognized raw value
        raw: String,
    },

    /// A transient poll failure occurred and the loop is backing off
    PollRetrying {
        /// Consecutive failures so far
        consecutive: u32,
        /// Display form of the failure
        error: String,
    },

    /// The batch reached a terminal state
    BatchFinished {
        /// The finished batch
        batch_id: BatchId,
        /// Terminal status observed
        status: BatchStatus,
    },

    /// The result pointer was re-fetched after an expired pre-signed URL
    ResultRefreshed {
        /// The batch whose pointer was refreshed
        batch_id: BatchId,
    },
}

/// Custom HTTP headers carried on inbound `batch.completed` webhook deliveries
pub mod webhook_headers {
    /// Batch identifier
    pub const BATCH_ID: &str = "X-Batch-ID";
    /// Terminal batch status
    pub const BATCH_STATUS: &str = "X-Batch-Status";
    /// Event type, always `batch.completed`
    pub const EVENT_TYPE: &str = "X-Event-Type";
    /// Delivery timestamp
    pub const TIMESTAMP: &str = "X-Timestamp";
}

/// Body of an inbound `batch.completed` webhook delivery
///
/// The API posts this to the caller-owned HTTPS endpoint registered at upload
/// time. The endpoint must answer 2xx within 10 seconds; the API retries up
/// to 3 times with exponential backoff on non-2xx or timeout.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct WebhookPayload {
    /// The finished batch
    pub batch_id: BatchId,

    /// Terminal status (`completed`, `partial`, or `failed`)
    pub status: BatchStatus,

    /// Aggregate processing counters
    pub summary: WebhookSummary,

    /// Canonical result pointer
    pub outputs: BatchOutputs,

    /// Expiry of the pre-signed result URL
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub presigned_url_expiry: Option<DateTime<Utc>>,

    /// When the batch was created
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,

    /// When the batch finished
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub completed_at: Option<DateTime<Utc>>,
}

/// Aggregate counters in a webhook delivery
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct WebhookSummary {
    /// Files originally uploaded
    #[serde(default)]
    pub files_uploaded: u32,
    /// Files that processed successfully
    #[serde(default)]
    pub files_succeeded: u32,
    /// Files that failed
    #[serde(default)]
    pub files_failed: u32,
    /// Files fully processed without manual review
    #[serde(default)]
    pub fully_processed: u32,
    /// Files needing validation
    #[serde(default)]
    pub validation_required: u32,
    /// Files the service could not process
    #[serde(default)]
    pub unprocessable: u32,
    /// Total rent roll units processed across the batch
    #[serde(default)]
    pub total_units_processed: u32,
    /// Credits consumed by the batch
    #[serde(default)]
    pub credits_used: u32,
}
