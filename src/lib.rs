//! TestLock CORE
//!
//! A single timed, proctored assessment attempt as a finite-state session
//! engine. The engine sequences questions, drives per-question countdowns,
//! classifies environment signals as benign or violating, records answers
//! idempotently, and delivers the terminal payload with serial retry.
//!
//! # Signal model
//!
//! Three independent, asynchronously-arriving sources feed one event loop:
//!
//! - wall-clock ticks from the [`clock::SessionClock`] (100ms cadence),
//! - environment signals (visibility, fullscreen, resize) behind the
//!   [`integrity::EnvironmentSignals`] capability,
//! - user commands (accept, draft, submit) via [`session::SessionHandle`].
//!
//! The [`session::SessionDriver`] applies each to the state machine within a
//! single event-loop turn, so transitions are atomic to observers and the
//! first violation is the only one that can end the attempt.
//!
//! # Boundaries
//!
//! Layout, the HTTP proxy, identity providers, and scheduling-window checks
//! live outside this crate; they plug in through the `EnvironmentSignals`,
//! `PresentationMode`, `HostFrame`, and `SubmissionTransport` traits.

pub mod clock;
pub mod config;
pub mod host;
pub mod integrity;
pub mod ledger;
pub mod presentation;
pub mod question;
pub mod session;
pub mod submit;
pub mod telemetry;
pub mod wire;

use std::sync::Arc;

use host::HostFrame;
use integrity::EnvironmentSignals;
use presentation::PresentationMode;
use session::{DriverConfig, SessionDriver, SessionHandle, UiEvent};
use submit::SubmissionTransport;
use tokio::sync::mpsc;

/// External capabilities an embedding supplies to the engine.
pub struct Capabilities {
    pub signals: Arc<dyn EnvironmentSignals>,
    pub presentation: Arc<dyn PresentationMode>,
    pub host: Arc<dyn HostFrame>,
    pub transport: Arc<dyn SubmissionTransport>,
}

/// A wired, ready-to-run session engine.
pub struct SessionRuntime {
    pub handle: SessionHandle,
    pub ui: mpsc::UnboundedReceiver<UiEvent>,
    pub driver: SessionDriver,
}

impl SessionRuntime {
    /// Assemble the engine from configuration and capabilities. The caller
    /// spawns (or awaits) `driver.run()` and keeps `handle`/`ui`.
    pub fn new(config: DriverConfig, capabilities: Capabilities) -> Self {
        let (handle, ui, driver) = SessionDriver::new(
            config,
            capabilities.signals,
            capabilities.presentation,
            capabilities.host,
            capabilities.transport,
        );
        Self { handle, ui, driver }
    }
}
