//! Structured audit events for session outcomes.
//!
//! Violations and submission outcomes are the auditable facts of an attempt;
//! they are logged with explicit UTC timestamps so downstream collectors do
//! not depend on subscriber clock formatting.

use chrono::Utc;
use tracing::{error, warn};

use crate::integrity::ViolationEvent;
use crate::submit::TransportError;
use crate::wire::SubmissionPayload;

/// Record a violation that terminated the session.
pub fn violation(event: &ViolationEvent, question_index: usize) {
    warn!(
        target: "testlock::audit",
        event = "violation",
        reason = event.reason.as_str(),
        observed_at = %event.observed_at.to_rfc3339(),
        question_index,
        "session penalized"
    );
}

/// Record a violation observed after the guard already fired.
pub fn violation_suppressed(event: &ViolationEvent) {
    warn!(
        target: "testlock::audit",
        event = "violation_suppressed",
        reason = event.reason.as_str(),
        observed_at = %event.observed_at.to_rfc3339(),
        "violation after terminal transition"
    );
}

/// Record a successful delivery.
pub fn submission_delivered(payload: &SubmissionPayload, attempts: u32) {
    warn!(
        target: "testlock::audit",
        event = "submission_delivered",
        test_id = %payload.test_id,
        answers = payload.answers.len(),
        attempts,
        at = %Utc::now().to_rfc3339(),
        "submission delivered"
    );
}

/// Record delivery giving up after exhausting retries.
pub fn submission_failed(payload: &SubmissionPayload, attempts: u32, last: &TransportError) {
    error!(
        target: "testlock::audit",
        event = "submission_failed",
        test_id = %payload.test_id,
        answers = payload.answers.len(),
        attempts,
        last_error = %last,
        at = %Utc::now().to_rfc3339(),
        "submission failed"
    );
}
