//! Host-embedding protocol.
//!
//! When the engine runs inside a host frame it announces readiness with a
//! literal token, receives questions as tagged messages, and mirrors the
//! terminal submission payload back to the parent. Standalone mode uses
//! [`NoHost`], which reports not-embedded and drops all posts.

use crate::wire::HostMessage;

/// Literal readiness token posted to the parent frame on startup.
pub const READY_TOKEN: &str = "TestLockReady";

pub trait HostFrame: Send + Sync {
    /// Whether the engine is embedded in a parent frame.
    fn is_embedded(&self) -> bool;

    /// Announce readiness to receive `questionsLoaded`.
    fn post_ready(&self);

    /// Deliver a tagged message to the parent. Best-effort; the embedding
    /// protocol has no acknowledgement.
    fn post(&self, message: &HostMessage);
}

/// Standalone mode: no parent frame.
pub struct NoHost;

impl HostFrame for NoHost {
    fn is_embedded(&self) -> bool {
        false
    }

    fn post_ready(&self) {}

    fn post(&self, _message: &HostMessage) {}
}

/// Line-oriented host for shim processes: the readiness token and each
/// message go to stdout as one line, where a parent-frame adapter relays
/// them. Unencodable messages are dropped, like any other failed post.
pub struct StdoutHost;

impl HostFrame for StdoutHost {
    fn is_embedded(&self) -> bool {
        true
    }

    fn post_ready(&self) {
        println!("{READY_TOKEN}");
    }

    fn post(&self, message: &HostMessage) {
        if let Ok(line) = serde_json::to_string(message) {
            println!("{line}");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn embedding_flags_match_mode() {
        assert!(!NoHost.is_embedded());
        assert!(StdoutHost.is_embedded());
    }

    #[test]
    fn ready_token_matches_the_embedding_contract() {
        assert_eq!(READY_TOKEN, "TestLockReady");
        StdoutHost.post_ready();
    }
}
