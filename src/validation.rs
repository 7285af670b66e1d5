//! Local input validation for batch uploads
//!
//! All checks here run against the local filesystem only. A request that
//! fails validation never reaches the network, and every rejection names
//! the specific file and cause so callers can trim the batch and resubmit
//! instead of aborting entirely.

use crate::error::{Result, ValidationError};
use crate::types::NotificationMethod;
use std::path::{Path, PathBuf};

/// File extensions the API accepts (lowercase, without leading dot)
pub const SUPPORTED_EXTENSIONS: [&str; 5] = ["xlsx", "xls", "xlsm", "csv", "ods"];

/// Maximum number of files in one batch
pub const MAX_FILES_PER_BATCH: usize = 20;

/// Maximum size of a single file in bytes (2 MiB)
pub const MAX_FILE_SIZE_BYTES: u64 = 2 * 1024 * 1024;

/// Map a file extension to the MIME type sent in its multipart part
pub fn content_type_for(extension: &str) -> &'static str {
    match extension.to_lowercase().as_str() {
        "xlsx" => "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet",
        "xls" => "application/vnd.ms-excel",
        "xlsm" => "application/vnd.ms-excel.sheet.macroEnabled.12",
        "csv" => "text/csv",
        "ods" => "application/vnd.oasis.opendocument.spreadsheet",
        _ => "application/octet-stream",
    }
}

/// A set of files plus notification preferences, ready for submission
#[derive(Clone, Debug)]
pub struct UploadRequest {
    /// Local paths to upload, in order
    pub files: Vec<PathBuf>,
    /// Completion notification targets
    pub notifications: Vec<NotificationMethod>,
}

impl UploadRequest {
    /// Create a request for the given files with no notification methods yet
    pub fn new(files: impl IntoIterator<Item = impl Into<PathBuf>>) -> Self {
        Self {
            files: files.into_iter().map(Into::into).collect(),
            notifications: Vec::new(),
        }
    }

    /// Add an email notification target
    pub fn with_email(mut self, email: impl Into<String>) -> Self {
        self.notifications
            .push(NotificationMethod::Email(email.into()));
        self
    }

    /// Add a webhook notification target (must be HTTPS)
    pub fn with_webhook(mut self, url: impl Into<String>) -> Self {
        self.notifications
            .push(NotificationMethod::Webhook(url.into()));
        self
    }
}

/// One rejected file with its cause
#[derive(Clone, Debug)]
pub struct RejectedFile {
    /// The rejected path
    pub path: PathBuf,
    /// Why it was rejected
    pub reason: ValidationError,
}

/// Partition of a file list into accepted and rejected entries
///
/// Validation is deterministic: running it twice over an unchanged
/// filesystem yields the identical partition.
#[derive(Clone, Debug, Default)]
pub struct ValidationReport {
    /// Files that passed every check, in input order
    pub accepted: Vec<PathBuf>,
    /// Files that failed a check, with per-file causes
    pub rejected: Vec<RejectedFile>,
}

impl ValidationReport {
    /// Whether every file passed
    pub fn all_accepted(&self) -> bool {
        self.rejected.is_empty()
    }
}

/// Validate a single file against existence, extension and size rules
pub fn validate_file(path: &Path) -> std::result::Result<(), ValidationError> {
    let metadata = match std::fs::metadata(path) {
        Ok(m) if m.is_file() => m,
        _ => {
            return Err(ValidationError::FileNotFound {
                path: path.to_path_buf(),
            });
        }
    };

    let extension = path
        .extension()
        .map(|e| e.to_string_lossy().to_lowercase())
        .unwrap_or_default();
    if !SUPPORTED_EXTENSIONS.contains(&extension.as_str()) {
        return Err(ValidationError::UnsupportedExtension {
            path: path.to_path_buf(),
            extension,
        });
    }

    if metadata.len() > MAX_FILE_SIZE_BYTES {
        return Err(ValidationError::FileTooLarge {
            path: path.to_path_buf(),
            size: metadata.len(),
            limit: MAX_FILE_SIZE_BYTES,
        });
    }

    Ok(())
}

/// Partition a file list into accepted and rejected entries
///
/// Performs no I/O beyond reading file metadata. Count limits are not
/// applied here; see [`validate_request`] for whole-batch rules.
pub fn validate_files(paths: &[PathBuf]) -> ValidationReport {
    let mut report = ValidationReport::default();

    for path in paths {
        match validate_file(path) {
            Ok(()) => report.accepted.push(path.clone()),
            Err(reason) => report.rejected.push(RejectedFile {
                path: path.clone(),
                reason,
            }),
        }
    }

    report
}

/// Validate a whole request, returning the effective notification list
///
/// Enforces batch cardinality (1..=20 files), per-file rules, at least one
/// notification method (falling back to `default_email` when the request
/// carries none), and HTTPS-only webhooks. Fails fast on the first
/// violation; callers wanting the full per-file partition should run
/// [`validate_files`] first and trim.
pub fn validate_request(
    request: &UploadRequest,
    default_email: Option<&str>,
) -> Result<Vec<NotificationMethod>> {
    if request.files.is_empty() {
        return Err(ValidationError::NoFiles.into());
    }

    if request.files.len() > MAX_FILES_PER_BATCH {
        return Err(ValidationError::TooManyFiles {
            count: request.files.len(),
            max: MAX_FILES_PER_BATCH,
        }
        .into());
    }

    for path in &request.files {
        validate_file(path)?;
    }

    let mut notifications = request.notifications.clone();
    if notifications.is_empty() {
        match default_email {
            Some(email) if !email.trim().is_empty() => {
                notifications.push(NotificationMethod::Email(email.trim().to_string()));
            }
            _ => return Err(ValidationError::NoNotificationMethod.into()),
        }
    }

    for method in &notifications {
        if let NotificationMethod::Webhook(url) = method
            && !url.starts_with("https://")
        {
            return Err(ValidationError::InsecureWebhook { url: url.clone() }.into());
        }
    }

    Ok(notifications)
}
