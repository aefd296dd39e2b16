//! Exclusive fullscreen presentation capability.
//!
//! Entering may be rejected by the environment (permissions, unsupported);
//! that blocks only the start transition and is retryable. Exiting on
//! completion or penalty is best-effort and never blocks the terminal
//! transition.

use async_trait::async_trait;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum PresentationError {
    #[error("Fullscreen request denied: {0}")]
    Denied(String),

    #[error("Fullscreen not supported in this environment")]
    Unsupported,
}

#[async_trait]
pub trait PresentationMode: Send + Sync {
    /// Request exclusive fullscreen presentation.
    async fn enter(&self) -> Result<(), PresentationError>;

    /// Leave fullscreen presentation.
    async fn exit(&self) -> Result<(), PresentationError>;
}

/// Headless environments (CLI, tests) have nothing to present.
pub struct AlwaysGranted;

#[async_trait]
impl PresentationMode for AlwaysGranted {
    async fn enter(&self) -> Result<(), PresentationError> {
        Ok(())
    }

    async fn exit(&self) -> Result<(), PresentationError> {
        Ok(())
    }
}
