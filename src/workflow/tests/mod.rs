// unwrap/expect are acceptable in tests for concise failure-on-error assertions
#![allow(clippy::unwrap_used, clippy::expect_used)]


use crate::config::{BackoffConfig, Config, PollConfig};
use crate::types::Event;
use crate::workflow::BatchWorkflow;
use std::collections::VecDeque;
use std::sync::Mutex;
use std::time::Duration;
use tokio::sync::broadcast;
use wiremock::{MockServer, Request, Respond, ResponseTemplate};

/// A `Respond` impl that replays a scripted sequence of responses, then
/// repeats the last one for any further requests.
pub(super) struct Script {
    responses: Mutex<VecDeque<ResponseTemplate>>,
    repeat: ResponseTemplate,
}

impl Script {
    pub(super) fn new(responses: Vec<ResponseTemplate>, repeat: ResponseTemplate) -> Self {
        Self {
            responses: Mutex::new(responses.into()),
            repeat,
        }
    }
}

impl Respond for Script {
    fn respond(&self, _request: &Request) -> ResponseTemplate {
        self.responses
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| self.repeat.clone())
    }
}

/// A status response body with the given raw status and progress counters.
pub(super) fn status_body(
    status: &str,
    percent: f64,
    files_completed: u32,
    file_count: u32,
) -> ResponseTemplate {
    ResponseTemplate::new(200).set_body_json(serde_json::json!({
        "data": {
            "status": status,
            "percentComplete": percent,
            "filesCompleted": files_completed,
            "fileCount": file_count
        }
    }))
}

/// A config with millisecond-scale timings pointed at the mock server.
pub(super) fn fast_config(server: &MockServer) -> Config {
    Config {
        base_url: server.uri(),
        api_key: "riq_live_test_key".to_string(),
        poll: PollConfig {
            interval: Duration::from_millis(10),
            timeout: Duration::from_secs(5),
            max_consecutive_failures: 3,
            failure_backoff: BackoffConfig {
                initial_delay: Duration::from_millis(5),
                max_delay: Duration::from_millis(20),
                backoff_multiplier: 2.0,
                jitter: false,
            },
        },
        ..Default::default()
    }
}

pub(super) fn workflow(server: &MockServer) -> BatchWorkflow {
    BatchWorkflow::new(fast_config(server)).unwrap()
}

/// Drain every event currently buffered in the receiver.
pub(super) fn drain_events(rx: &mut broadcast::Receiver<Event>) -> Vec<Event> {
    let mut events = Vec::new();
    while let Ok(event) = rx.try_recv() {
        events.push(event);
    }
    events
}
