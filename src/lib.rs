//! # rentroll-batch
//!
//! Async client library for batch rent roll processing: validate and upload
//! spreadsheet batches, poll until the batch finishes, download the result
//! archive and extract the processed CSV outputs.
//!
//! ## Quick start
//!
//! ```no_run
//! use rentroll_batch::{BatchWorkflow, UploadRequest};
//!
//! # async fn example() -> rentroll_batch::Result<()> {
//! // Reads RADIX_API_KEY (and friends) from the environment
//! let workflow = BatchWorkflow::from_env()?;
//!
//! let request = UploadRequest::new(vec!["north-tower.xlsx", "south-tower.xlsx"])
//!     .with_email("ops@example.com");
//!
//! let outcome = workflow.run(&request).await?;
//! println!(
//!     "batch {} finished as {} with {} extracted files",
//!     outcome.receipt.batch_id,
//!     outcome.snapshot.status,
//!     outcome.previews.len(),
//! );
//! # Ok(())
//! # }
//! ```
//!
//! ## Driving the stages yourself
//!
//! [`BatchWorkflow::run`] chains submit, poll, fetch and extract. Each stage
//! is also public ([`BatchWorkflow::submit`],
//! [`BatchWorkflow::poll_until_terminal`], [`BatchWorkflow::fetch_result`])
//! for callers that persist the batch id and resume later. Subscribe to
//! progress with [`BatchWorkflow::subscribe`] and cancel between polls via
//! [`BatchWorkflow::cancel_token`].
//!
//! ## Merging simultaneous invocations
//!
//! Tooling that spawns one process per file can pool uploads through
//! [`BatchCollector`] so twenty simultaneous single-file invocations submit
//! one twenty-file batch instead of twenty batches.

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::unwrap_used)]
#![warn(clippy::expect_used)]

pub mod client;
pub mod collector;
pub mod config;
pub mod error;
pub mod extraction;
pub mod retry;
pub mod types;
pub mod utils;
pub mod validation;
pub mod workflow;

pub use client::ApiClient;
pub use collector::{BatchCollector, ClaimOutcome, CollectorConfig};
pub use config::{Config, ExtractionConfig, OutputDirStrategy, PollConfig};
pub use error::{CollectorError, Error, ExtractError, Result, ValidationError};
pub use extraction::{CsvPreview, ExtractReport};
pub use types::{
    BatchId, BatchSnapshot, BatchStatus, Event, NotificationMethod, UploadReceipt, WebhookPayload,
};
pub use validation::{UploadRequest, ValidationReport, validate_files, validate_request};
pub use workflow::{BatchOutcome, BatchWorkflow};
