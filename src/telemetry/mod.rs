//! Telemetry: structured logging and the integrity audit trail.

pub mod audit;
mod logging;

pub use logging::{init_logging, LogConfig, LogError, LogFormat};
