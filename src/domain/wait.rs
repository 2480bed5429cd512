// Copyright 2025 JiangLong.
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! Polling a remote resource until it reaches a terminal state
//!
//! [`wait_for`] polls a [`WaitHandler`] with exponential backoff (2s doubling
//! up to 30s), honours server `Retry-After` hints, gives up after the overall
//! timeout (30 minutes by default) and stops as soon as the cancel token fires.
//! A spinner on stderr shows progress and is always stopped on exit.

use crate::cli::printer::Printer;
use crate::cli::spinner::Spinner;
use crate::domain::context::CancelToken;
use crate::infrastructure::api::{ApiClient, ApiRequest};
use crate::infrastructure::constants::{
    WAIT_INITIAL_DELAY_SECONDS, WAIT_MAX_INTERVAL_SECONDS, WAIT_MAX_TRANSIENT_FAILURES,
    WAIT_TIMEOUT_SECONDS,
};
use crate::shared::error::{CancelCause, CliError, Result};
use async_trait::async_trait;
use backon::{BackoffBuilder, ExponentialBuilder};
use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::Instant;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WaitSettings {
    pub initial_delay: Duration,
    pub max_interval: Duration,
    pub timeout: Duration,
    /// Consecutive transport/5xx/429 failures tolerated before giving up.
    pub max_transient_failures: u32,
}

impl Default for WaitSettings {
    fn default() -> Self {
        Self {
            initial_delay: Duration::from_secs(WAIT_INITIAL_DELAY_SECONDS),
            max_interval: Duration::from_secs(WAIT_MAX_INTERVAL_SECONDS),
            timeout: Duration::from_secs(WAIT_TIMEOUT_SECONDS),
            max_transient_failures: WAIT_MAX_TRANSIENT_FAILURES,
        }
    }
}

impl WaitSettings {
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }
}

#[derive(Debug)]
pub enum PollOutcome<T> {
    Pending {
        state: String,
        retry_after: Option<Duration>,
    },
    Done(T),
    Failed(CliError),
}

#[async_trait]
pub trait WaitHandler: Send {
    type Output: Send;

    /// Human description used in timeout errors, e.g. `creation of instance X`.
    fn operation(&self) -> String;

    async fn poll(&mut self) -> Result<PollOutcome<Self::Output>>;
}

pub async fn wait_for<H: WaitHandler>(
    handler: &mut H,
    settings: WaitSettings,
    cancel: &CancelToken,
    printer: &Printer,
    message: &str,
) -> Result<H::Output> {
    let spinner = Spinner::start(printer, message);
    let result = drive(handler, settings, cancel).await;
    match &result {
        Ok(_) => spinner.stop(),
        Err(_) => spinner.stop_with_error(),
    }
    result
}

async fn drive<H: WaitHandler>(
    handler: &mut H,
    settings: WaitSettings,
    cancel: &CancelToken,
) -> Result<H::Output> {
    let deadline = Instant::now() + settings.timeout;
    let mut backoff = ExponentialBuilder::default()
        .with_min_delay(settings.initial_delay)
        .with_max_delay(settings.max_interval)
        .with_factor(2.0)
        .with_max_times(usize::MAX)
        .build();
    let mut last_state = String::from("unknown");
    let mut transient_failures = 0u32;

    loop {
        if cancel.is_cancelled() {
            return Err(CliError::Canceled(CancelCause::Interrupted));
        }

        let polled = tokio::select! {
            polled = handler.poll() => polled,
            _ = cancel.cancelled() => return Err(CliError::Canceled(CancelCause::Interrupted)),
        };

        let hint = match polled {
            Ok(PollOutcome::Done(value)) => return Ok(value),
            Ok(PollOutcome::Failed(err)) => return Err(err),
            Ok(PollOutcome::Pending { state, retry_after }) => {
                transient_failures = 0;
                tracing::debug!("{}: state {}", handler.operation(), state);
                last_state = state;
                retry_after
            }
            Err(err) if is_transient(&err) => {
                transient_failures += 1;
                if transient_failures > settings.max_transient_failures {
                    return Err(err.context(format!("wait for {}", handler.operation())));
                }
                tracing::debug!(
                    "{}: transient failure {}/{}: {}",
                    handler.operation(),
                    transient_failures,
                    settings.max_transient_failures,
                    err
                );
                err.retry_after()
            }
            Err(err) => return Err(err),
        };

        let now = Instant::now();
        if now >= deadline {
            return Err(CliError::Timeout {
                operation: handler.operation(),
                last_state,
            });
        }

        let delay = hint
            .or_else(|| backoff.next())
            .unwrap_or(settings.max_interval)
            .min(deadline - now);

        tokio::select! {
            _ = tokio::time::sleep(delay) => {}
            _ = cancel.cancelled() => return Err(CliError::Canceled(CancelCause::Interrupted)),
        }
    }
}

/// Transport errors, 5xx and 429 are retried by the driver.
pub fn is_transient(err: &CliError) -> bool {
    match err.root() {
        CliError::Transport(_) => true,
        CliError::RemoteApi { status, .. } => *status >= 500 || *status == 429,
        _ => false,
    }
}

/// Classifies a resource body into a poll outcome.
pub type Classifier = fn(&Value) -> PollOutcome<Value>;

/// Polls one GET endpoint and classifies the body.
pub struct ResourceWait {
    client: Arc<dyn ApiClient>,
    request: ApiRequest,
    operation: String,
    classify: Classifier,
    /// A 404 means the resource is gone, which is what a deletion waits for.
    done_on_not_found: bool,
}

impl ResourceWait {
    pub fn new(
        client: Arc<dyn ApiClient>,
        request: ApiRequest,
        operation: impl Into<String>,
        classify: Classifier,
    ) -> Self {
        Self {
            client,
            request,
            operation: operation.into(),
            classify,
            done_on_not_found: false,
        }
    }

    pub fn until_deleted(
        client: Arc<dyn ApiClient>,
        request: ApiRequest,
        operation: impl Into<String>,
        classify: Classifier,
    ) -> Self {
        Self {
            done_on_not_found: true,
            ..Self::new(client, request, operation, classify)
        }
    }
}

#[async_trait]
impl WaitHandler for ResourceWait {
    type Output = Value;

    fn operation(&self) -> String {
        self.operation.clone()
    }

    async fn poll(&mut self) -> Result<PollOutcome<Value>> {
        match self.client.send(&self.request).await {
            Ok(response) => {
                let outcome = (self.classify)(&response.body);
                Ok(match outcome {
                    PollOutcome::Pending { state, retry_after } => PollOutcome::Pending {
                        state,
                        retry_after: retry_after.or(response.retry_after),
                    },
                    other => other,
                })
            }
            Err(err) if self.done_on_not_found && err.status() == Some(404) => {
                Ok(PollOutcome::Done(Value::Null))
            }
            Err(err) => Err(err),
        }
    }
}

/// Reads a state field and maps it onto an outcome.
pub fn classify_state(
    body: &Value,
    field: &str,
    done: &[&str],
    failed: &[&str],
    operation: &str,
) -> PollOutcome<Value> {
    let state = body
        .get(field)
        .and_then(Value::as_str)
        .unwrap_or("")
        .to_ascii_uppercase();

    if done.contains(&state.as_str()) {
        PollOutcome::Done(body.clone())
    } else if failed.contains(&state.as_str()) {
        PollOutcome::Failed(CliError::OperationFailed {
            operation: operation.to_string(),
            state,
        })
    } else {
        PollOutcome::Pending {
            state: if state.is_empty() {
                "unknown".to_string()
            } else {
                state
            },
            retry_after: None,
        }
    }
}
