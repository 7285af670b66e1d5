//! Transient-failure classification and backoff
//!
//! The polling loop tolerates a bounded run of transient network failures
//! before escalating, backing off exponentially (with optional jitter)
//! between attempts. Classification lives here so the loop never has to
//! inspect error internals.
//!
//! Note that the upload call itself is never retried automatically:
//! re-submitting a batch could double-bill credits. Only status queries use
//! this machinery, plus the single documented 403 refresh on result fetch.

use crate::config::BackoffConfig;
use crate::error::Error;
use rand::Rng;
use std::time::Duration;

/// Trait for errors that can be classified as retryable or not
///
/// Transient failures (network timeouts, connection reset) should return `true`.
/// Permanent failures (validation, API-level rejections) should return `false`.
pub trait IsRetryable {
    /// Returns true if the error is transient and the operation should be retried
    fn is_retryable(&self) -> bool;
}

impl IsRetryable for Error {
    fn is_retryable(&self) -> bool {
        match self {
            // Low-level network failures are the transient case the poll loop
            // is allowed to ride out
            Error::Network(e) => e.is_timeout() || e.is_connect() || e.is_request(),
            Error::Io(e) => matches!(
                e.kind(),
                std::io::ErrorKind::TimedOut
                    | std::io::ErrorKind::ConnectionRefused
                    | std::io::ErrorKind::ConnectionReset
                    | std::io::ErrorKind::ConnectionAborted
                    | std::io::ErrorKind::NotConnected
                    | std::io::ErrorKind::BrokenPipe
                    | std::io::ErrorKind::Interrupted
            ),
            // 5xx means the API itself is unhealthy; a later poll may succeed
            Error::Api { status, .. } => *status >= 500,
            // Everything else is deterministic from the caller's perspective
            Error::Validation(_)
            | Error::Config { .. }
            | Error::Timeout { .. }
            | Error::PollFailed { .. }
            | Error::MissingResult { .. }
            | Error::ResultExpired { .. }
            | Error::Cancelled
            | Error::Extract(_)
            | Error::Collector(_)
            | Error::Serialization(_)
            | Error::Csv(_)
            | Error::Other(_) => false,
        }
    }
}

/// Successive backoff delays for a run of transient failures
///
/// Exponential with a cap; jitter adds a uniform 0-100% on top of the base
/// delay to prevent thundering herd.
#[derive(Debug)]
pub struct Backoff {
    config: BackoffConfig,
    current: Duration,
}

impl Backoff {
    /// Start a fresh backoff sequence
    pub fn new(config: &BackoffConfig) -> Self {
        Self {
            config: config.clone(),
            current: config.initial_delay,
        }
    }

    /// The delay to sleep before the next attempt, advancing the sequence
    pub fn next_delay(&mut self) -> Duration {
        let base = self.current;

        let next = Duration::from_secs_f64(base.as_secs_f64() * self.config.backoff_multiplier);
        self.current = next.min(self.config.max_delay);

        if self.config.jitter { add_jitter(base) } else { base }
    }

    /// Reset to the initial delay after a success
    pub fn reset(&mut self) {
        self.current = self.config.initial_delay;
    }
}

/// Add random jitter to a delay
///
/// Jitter is uniformly distributed between 0% and 100% of the delay, so the
/// actual delay falls between `delay` and `2 * delay`.
fn add_jitter(delay: Duration) -> Duration {
    let mut rng = rand::thread_rng();
    let jitter_factor: f64 = rng.gen_range(0.0..=1.0);
    Duration::from_secs_f64(delay.as_secs_f64() * (1.0 + jitter_factor))
}

// unwrap/expect are acceptable in tests for concise failure-on-error assertions
#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ValidationError;

    fn backoff_config(jitter: bool) -> BackoffConfig {
        BackoffConfig {
            initial_delay: Duration::from_millis(100),
            max_delay: Duration::from_millis(400),
            backoff_multiplier: 2.0,
            jitter,
        }
    }

    #[test]
    fn backoff_doubles_until_cap_without_jitter() {
        let mut backoff = Backoff::new(&backoff_config(false));
        assert_eq!(backoff.next_delay(), Duration::from_millis(100));
        assert_eq!(backoff.next_delay(), Duration::from_millis(200));
        assert_eq!(backoff.next_delay(), Duration::from_millis(400));
        // Capped
        assert_eq!(backoff.next_delay(), Duration::from_millis(400));
    }

    #[test]
    fn backoff_reset_returns_to_initial_delay() {
        let mut backoff = Backoff::new(&backoff_config(false));
        backoff.next_delay();
        backoff.next_delay();
        backoff.reset();
        assert_eq!(backoff.next_delay(), Duration::from_millis(100));
    }

    #[test]
    fn jittered_delay_stays_within_double_the_base() {
        let mut backoff = Backoff::new(&backoff_config(true));
        for _ in 0..50 {
            let d = backoff.next_delay();
            assert!(d >= Duration::from_millis(100));
            assert!(d <= Duration::from_millis(800));
        }
    }

    #[test]
    fn validation_errors_are_never_retryable() {
        let err = Error::Validation(ValidationError::NoFiles);
        assert!(!err.is_retryable());
    }

    #[test]
    fn server_errors_are_retryable_but_client_errors_are_not() {
        assert!(
            Error::Api {
                status: 503,
                message: "unavailable".into()
            }
            .is_retryable()
        );
        assert!(
            !Error::Api {
                status: 404,
                message: "not found".into()
            }
            .is_retryable()
        );
        assert!(
            !Error::Api {
                status: 403,
                message: "expired".into()
            }
            .is_retryable()
        );
    }

    #[test]
    fn io_connection_errors_are_retryable() {
        let err = Error::Io(std::io::Error::new(
            std::io::ErrorKind::ConnectionReset,
            "reset",
        ));
        assert!(err.is_retryable());

        let err = Error::Io(std::io::Error::new(
            std::io::ErrorKind::PermissionDenied,
            "denied",
        ));
        assert!(!err.is_retryable());
    }
}
