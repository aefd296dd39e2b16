//! Submission coordinator: serial retry with exponential backoff.
//!
//! Delivery is attempted up to a fixed ceiling; after each failure the
//! coordinator waits `initial_delay * 2^attempt` before continuing. Attempts
//! are strictly serial, never concurrent. Whatever the outcome, an embedded
//! session also mirrors the payload to its host frame; that notification is
//! best-effort and independent of the retry loop's own result.

mod transport;

pub use transport::{JsonWriterTransport, SubmissionTransport, TransportError};

use std::sync::Arc;
use std::time::Duration;

use thiserror::Error;
use tokio::time::sleep;
use tracing::{info, warn};

use crate::host::HostFrame;
use crate::telemetry::audit;
use crate::wire::{HostMessage, SubmissionPayload};

/// Retry schedule. Defaults: 7 attempts, 1s base, so delays of
/// 1s, 2s, 4s, 8s, 16s, 32s, 64s across attempts 0-6.
#[derive(Debug, Clone, Copy)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub initial_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 7,
            initial_delay: Duration::from_secs(1),
        }
    }
}

impl RetryPolicy {
    fn delay_after(&self, attempt: u32) -> Duration {
        self.initial_delay.saturating_mul(1u32 << attempt.min(31))
    }
}

/// Successful delivery.
#[derive(Debug, Clone)]
pub struct SubmissionReceipt {
    /// 1-based count of attempts it took.
    pub attempts: u32,
    /// Proxy response body.
    pub response: serde_json::Value,
}

#[derive(Debug, Error)]
pub enum SubmitError {
    #[error("Submission failed after {attempts} attempts: {last}")]
    Exhausted {
        attempts: u32,
        #[source]
        last: TransportError,
    },
}

pub struct SubmissionCoordinator {
    transport: Arc<dyn SubmissionTransport>,
    host: Arc<dyn HostFrame>,
    policy: RetryPolicy,
}

impl SubmissionCoordinator {
    pub fn new(
        transport: Arc<dyn SubmissionTransport>,
        host: Arc<dyn HostFrame>,
        policy: RetryPolicy,
    ) -> Self {
        Self {
            transport,
            host,
            policy,
        }
    }

    /// Deliver the terminal payload, retrying per policy, then notify the
    /// host frame with the outcome.
    pub async fn submit(
        &self,
        payload: &SubmissionPayload,
    ) -> Result<SubmissionReceipt, SubmitError> {
        let mut last_error: Option<TransportError> = None;

        for attempt in 0..self.policy.max_attempts {
            match self.transport.deliver(payload).await {
                Ok(response) => {
                    let attempts = attempt + 1;
                    info!(attempts, "submission delivered");
                    audit::submission_delivered(payload, attempts);
                    self.notify_host(HostMessage::TestResults {
                        payload: payload.clone(),
                    });
                    return Ok(SubmissionReceipt { attempts, response });
                }
                Err(error) => {
                    let delay = self.policy.delay_after(attempt);
                    warn!(
                        attempt = attempt + 1,
                        max = self.policy.max_attempts,
                        delay_ms = delay.as_millis() as u64,
                        %error,
                        "submission attempt failed"
                    );
                    last_error = Some(error);
                    sleep(delay).await;
                }
            }
        }

        let attempts = self.policy.max_attempts;
        let last = last_error.unwrap_or(TransportError::Network("no attempts made".into()));
        audit::submission_failed(payload, attempts, &last);
        self.notify_host(HostMessage::TestSubmissionError {
            payload: payload.clone(),
            error: last.to_string(),
        });
        Err(SubmitError::Exhausted { attempts, last })
    }

    fn notify_host(&self, message: HostMessage) {
        if self.host.is_embedded() {
            self.host.post(&message);
        }
    }
}
