//! Error types for rentroll-batch
//!
//! This module provides comprehensive error handling for the library, including:
//! - A local validation taxonomy that distinguishes per-file failure causes
//! - API errors carrying the HTTP status and the server's error envelope message
//! - Workflow errors (poll timeout, missing/expired result pointer) with context
//!
//! The split matters for callers: validation errors are deterministic and never
//! involve the network, while `Api`/`Timeout`/`ResultExpired` describe remote
//! conditions a caller may want to handle differently (trim files and resubmit,
//! extend the poll budget, re-resolve the pointer).

use crate::types::{BatchId, BatchSnapshot};
use std::path::PathBuf;
use thiserror::Error;

/// Result type alias for rentroll-batch operations
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for rentroll-batch
///
/// This is the primary error type used throughout the library. Each variant includes
/// contextual information to help diagnose issues.
#[derive(Debug, Error)]
pub enum Error {
    /// Configuration error with context about which setting is invalid
    #[error("configuration error: {message}")]
    Config {
        /// Human-readable error message describing the configuration issue
        message: String,
        /// The configuration key that caused the error (e.g., "api_key")
        key: Option<String>,
    },

    /// Local input validation failed before any network call
    #[error("validation error: {0}")]
    Validation(#[from] ValidationError),

    /// The API returned a non-success HTTP status
    #[error("API error (HTTP {status}): {message}")]
    Api {
        /// HTTP status code returned by the API
        status: u16,
        /// Message extracted from the `{error:{message}}` envelope, or the raw body
        message: String,
    },

    /// The polling budget elapsed before the batch reached a terminal state
    ///
    /// Carries the last observed snapshot so the caller still receives the
    /// best-known progress rather than a bare timeout.
    #[error("polling timed out after {elapsed_secs:.0}s in status {}", last.status)]
    Timeout {
        /// Seconds elapsed since the poll loop started
        elapsed_secs: f64,
        /// The last non-terminal snapshot observed before the budget ran out
        last: Box<BatchSnapshot>,
    },

    /// Too many consecutive transient failures while polling
    #[error("polling failed {consecutive} consecutive times, last error: {last_error}")]
    PollFailed {
        /// Number of consecutive transient failures observed
        consecutive: u32,
        /// Display form of the final failure
        last_error: String,
    },

    /// The batch finished successfully but exposed no resolvable archive pointer
    #[error("batch {batch_id} finished with no downloadable result")]
    MissingResult {
        /// The batch whose result could not be resolved
        batch_id: BatchId,
    },

    /// The pre-signed result URL was refreshed once and still returned HTTP 403
    #[error("result URL expired and refresh did not help: {url}")]
    ResultExpired {
        /// The URL that returned 403 after the single refresh attempt
        url: String,
    },

    /// The workflow was cancelled between polls
    #[error("workflow cancelled")]
    Cancelled,

    /// Archive extraction error
    #[error("extraction error: {0}")]
    Extract(#[from] ExtractError),

    /// Multi-process collector queue error
    #[error("collector error: {0}")]
    Collector(#[from] CollectorError),

    /// Network error
    #[error("network error: {0}")]
    Network(#[from] reqwest::Error),

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization error
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// CSV parsing error while building previews
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    /// Other error
    #[error("{0}")]
    Other(String),
}

/// Local validation errors, one per rejected input
///
/// Each variant names the offending file so a caller can drop or fix specific
/// inputs and resubmit the rest rather than abort the whole batch.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    /// No files were supplied
    #[error("no files provided")]
    NoFiles,

    /// More files than the API accepts in one batch
    #[error("too many files ({count}), maximum is {max} per batch")]
    TooManyFiles {
        /// Number of files supplied
        count: usize,
        /// Maximum files per batch
        max: usize,
    },

    /// File does not exist or is not a regular file
    #[error("file not found: {path}")]
    FileNotFound {
        /// The missing path
        path: PathBuf,
    },

    /// File extension is not in the supported set
    #[error("unsupported extension '{extension}' for {path}")]
    UnsupportedExtension {
        /// The rejected path
        path: PathBuf,
        /// The extension that was rejected (lowercased, without leading dot)
        extension: String,
    },

    /// File exceeds the per-file size limit
    #[error("file too large: {path} is {size} bytes, maximum is {limit}")]
    FileTooLarge {
        /// The rejected path
        path: PathBuf,
        /// Actual size in bytes
        size: u64,
        /// Maximum allowed size in bytes
        limit: u64,
    },

    /// No notification method was supplied and no default is configured
    #[error("at least one notification method (email or webhook) is required")]
    NoNotificationMethod,

    /// Webhook notification URLs must use HTTPS
    #[error("webhook URL must be HTTPS: {url}")]
    InsecureWebhook {
        /// The rejected webhook URL
        url: String,
    },
}

/// Archive extraction errors
#[derive(Debug, Error)]
pub enum ExtractError {
    /// The downloaded archive could not be read as a ZIP file
    #[error("invalid ZIP archive {archive}: {reason}")]
    InvalidArchive {
        /// Path to the archive on disk
        archive: PathBuf,
        /// Why the archive could not be opened
        reason: String,
    },

    /// An inclusion pattern could not be compiled
    #[error("invalid extraction pattern '{pattern}': {reason}")]
    InvalidPattern {
        /// The offending glob pattern
        pattern: String,
        /// Parser error text
        reason: String,
    },

    /// Failed to write an extracted entry to disk
    #[error("failed to write {path}: {source}")]
    WriteFailed {
        /// Destination path that could not be written
        path: PathBuf,
        /// Underlying I/O error
        source: std::io::Error,
    },
}

/// Errors from the multi-process batch collector
#[derive(Debug, Error)]
pub enum CollectorError {
    /// Could not acquire the named lock within the acquisition budget
    #[error("could not acquire lock {lock_path} within {waited_ms}ms")]
    LockTimeout {
        /// Path of the lock file that stayed held
        lock_path: PathBuf,
        /// Total milliseconds spent waiting
        waited_ms: u64,
    },

    /// The queue file could not be read or written
    #[error("queue I/O error at {path}: {source}")]
    QueueIo {
        /// The queue file path
        path: PathBuf,
        /// Underlying I/O error
        source: std::io::Error,
    },
}
