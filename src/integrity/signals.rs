//! Environment signal sources.
//!
//! Browser-native signals (visibility, fullscreen, resize) arrive through the
//! [`EnvironmentSignals`] capability so the monitor and state machine can be
//! exercised with synthetic injection instead of a real browser. `SignalHub`
//! is the in-process implementation used by tests, the CLI, and any embedding
//! shim that forwards real DOM events.

use parking_lot::Mutex;
use tokio::sync::mpsc;

/// Viewport and physical screen dimensions, in CSS pixels.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ViewportGeometry {
    pub width: u32,
    pub height: u32,
    pub screen_width: u32,
    pub screen_height: u32,
}

impl ViewportGeometry {
    pub fn is_landscape(&self) -> bool {
        self.width > self.height
    }
}

/// One observed environment change.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EnvSignal {
    /// Tab hidden or window minimized.
    VisibilityHidden,
    /// Exclusive fullscreen presentation was left.
    FullscreenExited,
    /// Viewport dimensions changed.
    Resized(ViewportGeometry),
}

/// Source of environment signals.
pub trait EnvironmentSignals: Send + Sync {
    /// Subscribe to future signals. Dropping or detaching the subscription
    /// stops delivery.
    fn subscribe(&self) -> EnvSubscription;

    /// Current viewport, if the source knows it. Used to establish the
    /// resize baseline when a session starts.
    fn viewport(&self) -> Option<ViewportGeometry>;
}

/// Receiving half of a signal subscription.
pub struct EnvSubscription {
    rx: mpsc::UnboundedReceiver<EnvSignal>,
}

impl EnvSubscription {
    pub async fn recv(&mut self) -> Option<EnvSignal> {
        self.rx.recv().await
    }

    /// Stop delivery. Signals emitted after this point are dropped.
    pub fn detach(&mut self) {
        self.rx.close();
    }
}

/// Fan-out hub with synthetic injection via [`SignalHub::emit`].
#[derive(Default)]
pub struct SignalHub {
    inner: Mutex<HubState>,
}

#[derive(Default)]
struct HubState {
    subscribers: Vec<mpsc::UnboundedSender<EnvSignal>>,
    viewport: Option<ViewportGeometry>,
}

impl SignalHub {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record the current viewport; resize emissions update it implicitly.
    pub fn set_viewport(&self, geometry: ViewportGeometry) {
        self.inner.lock().viewport = Some(geometry);
    }

    /// Deliver a signal to all live subscribers.
    pub fn emit(&self, signal: EnvSignal) {
        let mut state = self.inner.lock();
        if let EnvSignal::Resized(geometry) = signal {
            state.viewport = Some(geometry);
        }
        state.subscribers.retain(|tx| tx.send(signal).is_ok());
    }
}

impl EnvironmentSignals for SignalHub {
    fn subscribe(&self) -> EnvSubscription {
        let (tx, rx) = mpsc::unbounded_channel();
        self.inner.lock().subscribers.push(tx);
        EnvSubscription { rx }
    }

    fn viewport(&self) -> Option<ViewportGeometry> {
        self.inner.lock().viewport
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn emit_reaches_subscriber_and_updates_viewport() {
        let hub = SignalHub::new();
        let mut sub = hub.subscribe();
        let geometry = ViewportGeometry {
            width: 800,
            height: 600,
            screen_width: 800,
            screen_height: 600,
        };
        hub.emit(EnvSignal::Resized(geometry));
        assert_eq!(sub.recv().await, Some(EnvSignal::Resized(geometry)));
        assert_eq!(hub.viewport(), Some(geometry));
    }

    #[tokio::test]
    async fn detached_subscription_stops_delivery() {
        let hub = SignalHub::new();
        let mut sub = hub.subscribe();
        sub.detach();
        hub.emit(EnvSignal::VisibilityHidden);
        assert_eq!(sub.recv().await, None);
    }
}
