//! Integrity monitoring: classify environment signals as benign or violating.
//!
//! Tab hiding and fullscreen exit are always violations. Resizes are compared
//! against the physical screen, but two benign cases are excluded first:
//! orientation flips and the on-screen keyboard. Both are frequent on mobile
//! and would otherwise be indistinguishable from tampering by size deltas
//! alone. The thresholds are heuristic and deliberately tunable; see
//! [`IntegrityConfig`].

mod signals;

pub use signals::{EnvSignal, EnvSubscription, EnvironmentSignals, SignalHub, ViewportGeometry};

use chrono::{DateTime, Utc};

/// Why a signal was deemed a violation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ViolationReason {
    TabHidden,
    FullscreenExited,
    WindowResized,
}

impl ViolationReason {
    /// Human-readable reason carried in the `penalty_reason` payload field.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::TabHidden => "Tab switched or window minimized",
            Self::FullscreenExited => "Exited fullscreen mode",
            Self::WindowResized => "Window resized",
        }
    }
}

/// Why a signal was excused.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BenignReason {
    /// Landscape/portrait flip; baseline updated.
    OrientationChange,
    /// Height shrank against a stable width: soft keyboard.
    VirtualKeyboard,
    /// Delta within tolerance of the physical screen.
    WithinTolerance,
    /// First geometry seen; it passed the screen check and became the
    /// baseline.
    NoBaseline,
}

/// Result of classifying one signal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Classification {
    Benign(BenignReason),
    Violation(ViolationReason),
}

/// A classified violation, as handed to the state machine. Transient; not
/// retained beyond triggering a transition.
#[derive(Debug, Clone, Copy)]
pub struct ViolationEvent {
    pub reason: ViolationReason,
    pub observed_at: DateTime<Utc>,
}

impl ViolationEvent {
    pub fn now(reason: ViolationReason) -> Self {
        Self {
            reason,
            observed_at: Utc::now(),
        }
    }
}

/// Resize-classification tolerances, in CSS pixels.
///
/// The numeric values are heuristics tuned to avoid false positives on
/// mobile; there is no authoritative source for them, so they stay
/// configuration rather than constants.
#[derive(Debug, Clone, Copy)]
pub struct IntegrityConfig {
    /// Allowed |viewport height - screen height|.
    pub resize_height_tolerance: u32,
    /// Allowed |viewport width - screen width|.
    pub resize_width_tolerance: u32,
    /// Minimum height drop that reads as a soft keyboard.
    pub keyboard_height_margin: u32,
    /// Maximum width change still counting as "materially unchanged".
    pub keyboard_width_jitter: u32,
}

impl Default for IntegrityConfig {
    fn default() -> Self {
        Self {
            resize_height_tolerance: 200,
            resize_width_tolerance: 150,
            keyboard_height_margin: 100,
            keyboard_width_jitter: 16,
        }
    }
}

/// Stateful classifier for one session.
///
/// Holds the viewport baseline captured at session start and updated on
/// orientation changes. The keyboard exemption deliberately does not move
/// the baseline: the keyboard retracting must not look like a violation.
#[derive(Debug)]
pub struct IntegrityMonitor {
    config: IntegrityConfig,
    baseline: Option<ViewportGeometry>,
}

impl IntegrityMonitor {
    pub fn new(config: IntegrityConfig) -> Self {
        Self {
            config,
            baseline: None,
        }
    }

    /// Establish the resize baseline, normally right after entering
    /// fullscreen presentation.
    pub fn set_baseline(&mut self, geometry: ViewportGeometry) {
        self.baseline = Some(geometry);
    }

    pub fn baseline(&self) -> Option<ViewportGeometry> {
        self.baseline
    }

    /// Classify one signal. Violations are delivered to the state machine,
    /// which owns the once-per-session idempotency guard.
    pub fn observe(&mut self, signal: EnvSignal) -> Classification {
        match signal {
            EnvSignal::VisibilityHidden => {
                Classification::Violation(ViolationReason::TabHidden)
            }
            EnvSignal::FullscreenExited => {
                Classification::Violation(ViolationReason::FullscreenExited)
            }
            EnvSignal::Resized(current) => self.classify_resize(current),
        }
    }

    fn classify_resize(&mut self, current: ViewportGeometry) -> Classification {
        let Some(baseline) = self.baseline else {
            // No geometry was available at acceptance. The screen comparison
            // needs only the current dimensions, so it still applies; a
            // geometry that passes it becomes the baseline.
            if self.screen_mismatch(current) {
                return Classification::Violation(ViolationReason::WindowResized);
            }
            self.baseline = Some(current);
            return Classification::Benign(BenignReason::NoBaseline);
        };

        // Exemptions run before the generic size-mismatch check.
        if current.is_landscape() != baseline.is_landscape() {
            self.baseline = Some(current);
            return Classification::Benign(BenignReason::OrientationChange);
        }

        let width_delta = current.width.abs_diff(baseline.width);
        let height_dropped = current.height + self.config.keyboard_height_margin
            <= baseline.height;
        if height_dropped && width_delta <= self.config.keyboard_width_jitter {
            // Keyboard popped: do not move the baseline, so its retraction
            // is judged against the original geometry.
            return Classification::Benign(BenignReason::VirtualKeyboard);
        }

        if self.screen_mismatch(current) {
            return Classification::Violation(ViolationReason::WindowResized);
        }

        Classification::Benign(BenignReason::WithinTolerance)
    }

    fn screen_mismatch(&self, current: ViewportGeometry) -> bool {
        current.height.abs_diff(current.screen_height) > self.config.resize_height_tolerance
            || current.width.abs_diff(current.screen_width) > self.config.resize_width_tolerance
    }
}
