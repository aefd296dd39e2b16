//! Session state machine and its async driver.

mod driver;
mod error;
mod state;

pub use driver::{Command, DriverConfig, SessionDriver, SessionHandle, SessionReport, UiEvent};
pub use error::SessionError;
pub use state::{Advance, Identity, Outcome, Session, SessionState};
