//! Delivery seam for the submission proxy.
//!
//! The engine never speaks HTTP itself; the embedding environment supplies a
//! transport that POSTs to the proxy endpoint (`/api/submit-assessment`
//! semantics: JSON body, success = 2xx with a JSON body). Anything else maps
//! to a [`TransportError`] and is retried by the coordinator.

use async_trait::async_trait;
use thiserror::Error;

use crate::wire::SubmissionPayload;

#[derive(Debug, Error)]
pub enum TransportError {
    #[error("Submission rejected with status {status}")]
    Rejected { status: u16 },

    #[error("Network failure: {0}")]
    Network(String),

    #[error("Unparseable response body: {0}")]
    BadResponse(String),
}

#[async_trait]
pub trait SubmissionTransport: Send + Sync {
    /// Attempt one delivery. `Ok` carries the proxy's JSON response body.
    async fn deliver(&self, payload: &SubmissionPayload)
        -> Result<serde_json::Value, TransportError>;
}

/// Standalone/CLI transport: serialize the payload to stdout and report
/// success. Stands in for the proxy POST when running headless.
pub struct JsonWriterTransport;

#[async_trait]
impl SubmissionTransport for JsonWriterTransport {
    async fn deliver(
        &self,
        payload: &SubmissionPayload,
    ) -> Result<serde_json::Value, TransportError> {
        let body = serde_json::to_string_pretty(payload)
            .map_err(|e| TransportError::BadResponse(e.to_string()))?;
        println!("{body}");
        Ok(serde_json::json!({ "ok": true }))
    }
}
