//! HTTP client for the upload, status and download endpoints
//!
//! Thin wrapper over `reqwest` that owns the bearer credential and the
//! envelope conventions: success bodies arrive as `{data: {...}}` (with a
//! flat fallback), failures as `{error: {message, details[]}}`.

use crate::config::Config;
use crate::error::{Error, Result};
use crate::types::{BatchId, BatchSnapshot, NotificationMethod, UploadReceipt};
use crate::utils;
use crate::validation::content_type_for;
use futures::StreamExt;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tokio::io::AsyncWriteExt;
use tracing::{debug, warn};

/// Client for the external batch-processing API
#[derive(Clone, Debug)]
pub struct ApiClient {
    http: reqwest::Client,
    base_url: String,
    api_key: String,
    upload_timeout: Duration,
    status_timeout: Duration,
    download_timeout: Duration,
}

impl ApiClient {
    /// Build a client from a validated configuration
    pub fn new(config: &Config) -> Result<Self> {
        let http = reqwest::Client::builder()
            .user_agent(config.http.user_agent.clone())
            .build()?;

        Ok(Self {
            http,
            base_url: config.base_url_trimmed().to_string(),
            api_key: config.api_key.clone(),
            upload_timeout: config.http.upload_timeout,
            status_timeout: config.http.status_timeout,
            download_timeout: config.http.download_timeout,
        })
    }

    fn upload_url(&self) -> String {
        format!("{}/api/external/v1/upload", self.base_url)
    }

    fn status_url(&self, batch_id: &BatchId) -> String {
        format!("{}/api/external/v1/job/{}/status", self.base_url, batch_id)
    }

    /// Submit a multipart upload and return the batch receipt
    ///
    /// One `files` part per file (with its extension's MIME type) plus a
    /// single `notificationMethod` part carrying the JSON-encoded method
    /// list. Success is HTTP 202. This call is never retried automatically:
    /// re-submitting could double-bill credits.
    pub async fn upload(
        &self,
        files: &[PathBuf],
        notifications: &[NotificationMethod],
    ) -> Result<UploadReceipt> {
        let mut form = reqwest::multipart::Form::new();

        for path in files {
            let bytes = tokio::fs::read(path).await?;
            let file_name = path
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_else(|| "upload".to_string());
            let extension = path
                .extension()
                .map(|e| e.to_string_lossy().to_lowercase())
                .unwrap_or_default();

            let part = reqwest::multipart::Part::bytes(bytes)
                .file_name(file_name)
                .mime_str(content_type_for(&extension))?;
            form = form.part("files", part);
        }

        form = form.text("notificationMethod", serde_json::to_string(notifications)?);

        debug!(url = %self.upload_url(), files = files.len(), "submitting upload");

        let response = self
            .http
            .post(self.upload_url())
            .bearer_auth(&self.api_key)
            .multipart(form)
            .timeout(self.upload_timeout)
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(error_from_response(response).await);
        }

        let body: serde_json::Value = response.json().await?;
        let receipt: UploadReceipt = serde_json::from_value(unwrap_payload(body))?;
        Ok(receipt)
    }

    /// Fetch the current status snapshot for a batch
    pub async fn status(&self, batch_id: &BatchId) -> Result<BatchSnapshot> {
        let response = self
            .http
            .get(self.status_url(batch_id))
            .bearer_auth(&self.api_key)
            .timeout(self.status_timeout)
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(error_from_response(response).await);
        }

        let body: serde_json::Value = response.json().await?;
        let mut snapshot: BatchSnapshot = serde_json::from_value(unwrap_payload(body))?;
        if snapshot.batch_id.is_none() {
            snapshot.batch_id = Some(batch_id.clone());
        }
        Ok(snapshot)
    }

    /// Download a result URL into `dest_dir`, returning the saved path
    ///
    /// Pre-signed S3 URLs carry auth in their query parameters, so the bearer
    /// header is omitted for them; if that guess was wrong and S3-looking
    /// storage answers 401, the request is retried once with the header.
    /// Streams to disk, never buffering the whole archive in memory.
    pub async fn download_result(&self, url: &str, dest_dir: &Path) -> Result<PathBuf> {
        let presigned = utils::is_presigned_url(url);

        let mut request = self.http.get(url).timeout(self.download_timeout);
        if !presigned {
            request = request.bearer_auth(&self.api_key);
        }
        let mut response = request.send().await?;

        if response.status() == reqwest::StatusCode::UNAUTHORIZED && presigned {
            warn!(url = %url, "pre-signed URL answered 401, retrying with bearer auth");
            response = self
                .http
                .get(url)
                .bearer_auth(&self.api_key)
                .timeout(self.download_timeout)
                .send()
                .await?;
        }

        if !response.status().is_success() {
            return Err(error_from_response(response).await);
        }

        tokio::fs::create_dir_all(dest_dir).await?;
        let file_name = utils::filename_from_response(&response, url);
        let dest = utils::unique_path(&dest_dir.join(file_name));

        let mut file = tokio::fs::File::create(&dest).await?;
        let mut stream = response.bytes_stream();
        while let Some(chunk) = stream.next().await {
            file.write_all(&chunk?).await?;
        }
        file.flush().await?;

        debug!(path = ?dest, "result archive saved");
        Ok(dest)
    }
}

/// Return the payload for either `{data: {...}}` or flat response shapes
fn unwrap_payload(body: serde_json::Value) -> serde_json::Value {
    match body {
        serde_json::Value::Object(mut map) => match map.remove("data") {
            Some(data @ serde_json::Value::Object(_)) => data,
            _ => serde_json::Value::Object(map),
        },
        other => other,
    }
}

/// Build an [`Error::Api`] from a non-success response
///
/// Extracts the message from the conventional `{error: {message, details[]}}`
/// envelope when present, otherwise uses the raw body.
async fn error_from_response(response: reqwest::Response) -> Error {
    let status = response.status().as_u16();
    let body = response.text().await.unwrap_or_default();

    let message = serde_json::from_str::<serde_json::Value>(&body)
        .ok()
        .and_then(|v| {
            let error = v.get("error")?;
            let mut message = error.get("message")?.as_str()?.to_string();
            if let Some(details) = error.get("details").and_then(|d| d.as_array()) {
                let parts: Vec<String> = details
                    .iter()
                    .filter_map(|d| d.as_str().map(str::to_string))
                    .collect();
                if !parts.is_empty() {
                    message = format!("{} ({})", message, parts.join("; "));
                }
            }
            Some(message)
        })
        .unwrap_or_else(|| {
            let trimmed = body.trim();
            if trimmed.is_empty() {
                "no response body".to_string()
            } else {
                trimmed.chars().take(1000).collect()
            }
        });

    Error::Api { status, message }
}
