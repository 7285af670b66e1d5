//! The status polling loop

use super::BatchWorkflow;
use crate::error::{Error, Result};
use crate::retry::{Backoff, IsRetryable};
use crate::types::{BatchId, BatchSnapshot, BatchStatus, Event};
use std::time::Duration;
use tokio::time::Instant;
use tracing::{debug, info, warn};

impl BatchWorkflow {
    /// Poll the batch until it reaches a terminal state
    ///
    /// The first query fires immediately; subsequent queries are spaced by
    /// the configured interval. Terminality is decided by the configured
    /// status set, with an all-files-finished snapshot also counting for
    /// endpoint variants that never flip the batch-level status.
    ///
    /// Progress counters are clamped to be monotonically non-decreasing so
    /// consumers never see progress move backwards on a flapping endpoint.
    /// A bounded run of transient failures is ridden out with exponential
    /// backoff; anything else surfaces immediately. If the budget expires
    /// before any snapshot was observed at all, the pending transient
    /// failure is reported rather than a timeout with an empty snapshot.
    /// Cancellation is honored between polls only.
    pub async fn poll_until_terminal(&self, batch_id: &BatchId) -> Result<BatchSnapshot> {
        let started = Instant::now();
        let mut backoff = Backoff::new(&self.config.poll.failure_backoff);
        let mut consecutive_failures = 0u32;
        let mut last: Option<BatchSnapshot> = None;
        let mut last_error: Option<String> = None;
        let mut max_percent = 0.0f64;
        let mut max_completed = 0u32;

        if self.cancel.is_cancelled() {
            return Err(Error::Cancelled);
        }

        loop {
            let delay = match self.client.status(batch_id).await {
                Ok(mut snapshot) => {
                    consecutive_failures = 0;
                    backoff.reset();

                    // Clamp progress so it never moves backwards
                    if snapshot.percent_complete < max_percent {
                        snapshot.percent_complete = max_percent;
                    } else {
                        max_percent = snapshot.percent_complete;
                    }
                    if snapshot.files_completed < max_completed {
                        snapshot.files_completed = max_completed;
                    } else {
                        max_completed = snapshot.files_completed;
                    }

                    if let BatchStatus::Unknown(raw) = &snapshot.status
                        && !raw.is_empty()
                    {
                        warn!(batch_id = %batch_id, status = %raw, "unrecognized batch status");
                        self.emit(Event::UnknownStatus {
                            batch_id: batch_id.clone(),
                            raw: raw.clone(),
                        });
                    }

                    debug!(
                        batch_id = %batch_id,
                        status = %snapshot.status,
                        percent = snapshot.percent_complete,
                        "status snapshot"
                    );
                    self.emit(Event::StatusUpdated {
                        batch_id: batch_id.clone(),
                        status: snapshot.status.clone(),
                        percent_complete: snapshot.percent_complete,
                        files_completed: snapshot.files_completed,
                        file_count: snapshot.file_count,
                    });

                    let terminal = snapshot
                        .status
                        .is_terminal_in(&self.config.terminal_statuses)
                        || snapshot.all_files_terminal();
                    if terminal {
                        info!(batch_id = %batch_id, status = %snapshot.status, "batch finished");
                        self.emit(Event::BatchFinished {
                            batch_id: batch_id.clone(),
                            status: snapshot.status.clone(),
                        });
                        return Ok(snapshot);
                    }

                    last = Some(snapshot);
                    self.config.poll.interval
                }
                Err(e) if e.is_retryable() => {
                    consecutive_failures += 1;
                    if consecutive_failures >= self.config.poll.max_consecutive_failures {
                        return Err(Error::PollFailed {
                            consecutive: consecutive_failures,
                            last_error: e.to_string(),
                        });
                    }

                    warn!(
                        batch_id = %batch_id,
                        consecutive = consecutive_failures,
                        error = %e,
                        "transient poll failure, backing off"
                    );
                    self.emit(Event::PollRetrying {
                        consecutive: consecutive_failures,
                        error: e.to_string(),
                    });
                    last_error = Some(e.to_string());
                    backoff.next_delay()
                }
                Err(e) => return Err(e),
            };

            if started.elapsed() >= self.config.poll.timeout {
                // With no snapshot ever observed, the timeout was spent
                // entirely on transient failures; report those instead of a
                // fabricated empty snapshot
                return Err(match last {
                    Some(snapshot) => Error::Timeout {
                        elapsed_secs: started.elapsed().as_secs_f64(),
                        last: Box::new(snapshot),
                    },
                    None => Error::PollFailed {
                        consecutive: consecutive_failures,
                        last_error: last_error
                            .unwrap_or_else(|| "no status response received".to_string()),
                    },
                });
            }

            self.sleep_or_cancel(delay).await?;
        }
    }

    async fn sleep_or_cancel(&self, delay: Duration) -> Result<()> {
        tokio::select! {
            _ = self.cancel.cancelled() => Err(Error::Cancelled),
            _ = tokio::time::sleep(delay) => Ok(()),
        }
    }
}
