//! Session error taxonomy.
//!
//! Input and environment errors are recoverable: the session stays in its
//! pre-start states and the caller surfaces a retryable notice. None of these
//! tear the engine down.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum SessionError {
    #[error("No questions loaded")]
    NoQuestions,

    #[error("Invalid transition: {action} while {state}")]
    InvalidTransition {
        action: &'static str,
        state: &'static str,
    },

    #[error("Missing identity fields: {0}")]
    MissingIdentity(&'static str),

    #[error("Session is not in a terminal state")]
    NotTerminal,

    #[error("Engine stopped; command channel closed")]
    EngineStopped,
}
