//! Per-question countdown clock.
//!
//! The clock samples wall-clock time at a fixed cadence (default 100ms)
//! rather than per frame; that cadence bounds auto-advance latency and event
//! churn. Untimed questions (no duration) emit one `Unbounded` tick and then
//! park until cancelled. Expiry fires exactly once. At most one clock is
//! active per session: `start` implicitly cancels any prior clock, and every
//! event carries the generation it belongs to so consumers can drop stragglers
//! that were already in flight when a clock was cancelled.

use std::time::Duration;

use tokio::sync::mpsc;
use tokio::time::{interval, Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;

/// Default sampling cadence.
pub const DEFAULT_TICK_INTERVAL: Duration = Duration::from_millis(100);

/// Remaining time for the active question.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimeLeft {
    Finite(Duration),
    /// Sentinel for untimed questions; never counts down.
    Unbounded,
}

/// Events emitted by an active clock.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClockEvent {
    Tick { generation: u64, remaining: TimeLeft },
    Expired { generation: u64 },
}

impl ClockEvent {
    pub fn generation(&self) -> u64 {
        match self {
            Self::Tick { generation, .. } | Self::Expired { generation } => *generation,
        }
    }
}

/// Drives the countdown for one question at a time.
pub struct SessionClock {
    tick_interval: Duration,
    events: mpsc::UnboundedSender<ClockEvent>,
    active: Option<CancellationToken>,
    generation: u64,
}

impl SessionClock {
    pub fn new(tick_interval: Duration, events: mpsc::UnboundedSender<ClockEvent>) -> Self {
        Self {
            tick_interval: tick_interval.max(Duration::from_millis(1)),
            events,
            active: None,
            generation: 0,
        }
    }

    /// Generation of the most recently started clock. Events from earlier
    /// generations are stale.
    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn is_active(&self) -> bool {
        self.active.is_some()
    }

    /// Start the countdown for a question, cancelling any prior clock.
    /// Returns the generation the new clock's events will carry.
    pub fn start(&mut self, duration: Option<Duration>) -> u64 {
        self.cancel();
        self.generation += 1;
        let generation = self.generation;

        let token = CancellationToken::new();
        self.active = Some(token.clone());

        let events = self.events.clone();
        let tick_interval = self.tick_interval;
        tokio::spawn(async move {
            match duration {
                None => run_untimed(generation, events, token).await,
                Some(duration) => {
                    run_countdown(generation, duration, tick_interval, events, token).await
                }
            }
        });
        generation
    }

    /// Cancel the active clock. Idempotent; a no-op when nothing is active.
    /// Safe to call from an expiry handler.
    pub fn cancel(&mut self) {
        if let Some(token) = self.active.take() {
            token.cancel();
        }
    }
}

async fn run_untimed(
    generation: u64,
    events: mpsc::UnboundedSender<ClockEvent>,
    token: CancellationToken,
) {
    let _ = events.send(ClockEvent::Tick {
        generation,
        remaining: TimeLeft::Unbounded,
    });
    token.cancelled().await;
}

async fn run_countdown(
    generation: u64,
    duration: Duration,
    tick_interval: Duration,
    events: mpsc::UnboundedSender<ClockEvent>,
    token: CancellationToken,
) {
    let started = Instant::now();
    let mut ticker = interval(tick_interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

    loop {
        tokio::select! {
            _ = token.cancelled() => return,
            _ = ticker.tick() => {}
        }

        let elapsed = started.elapsed();
        if elapsed >= duration {
            let _ = events.send(ClockEvent::Expired { generation });
            return;
        }
        let _ = events.send(ClockEvent::Tick {
            generation,
            remaining: TimeLeft::Finite(duration - elapsed),
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test(start_paused = true)]
    async fn expires_exactly_once_within_cadence_bound() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let mut clock = SessionClock::new(DEFAULT_TICK_INTERVAL, tx);
        let started = Instant::now();
        let generation = clock.start(Some(Duration::from_millis(500)));

        let mut expiries = 0;
        while let Some(event) = rx.recv().await {
            if let ClockEvent::Expired { generation: g } = event {
                assert_eq!(g, generation);
                expiries += 1;
                break;
            }
        }
        assert_eq!(expiries, 1);
        // 500ms duration, 100ms cadence: expiry within duration + one tick.
        assert!(started.elapsed() <= Duration::from_millis(600));
        // Sender side closed once the task returns; no second expiry queued.
        clock.cancel();
        tokio::time::sleep(Duration::from_secs(1)).await;
        assert!(rx.try_recv().is_err());
    }

    #[tokio::test(start_paused = true)]
    async fn untimed_question_never_expires() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let mut clock = SessionClock::new(DEFAULT_TICK_INTERVAL, tx);
        let generation = clock.start(None);

        let first = rx.recv().await.unwrap();
        assert_eq!(
            first,
            ClockEvent::Tick {
                generation,
                remaining: TimeLeft::Unbounded
            }
        );

        tokio::time::sleep(Duration::from_secs(3600)).await;
        assert!(rx.try_recv().is_err());
        clock.cancel();
    }

    #[tokio::test(start_paused = true)]
    async fn starting_a_new_clock_cancels_the_prior_one() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let mut clock = SessionClock::new(DEFAULT_TICK_INTERVAL, tx);
        let first = clock.start(Some(Duration::from_millis(300)));
        let second = clock.start(Some(Duration::from_millis(300)));
        assert!(second > first);

        let mut saw_first_expiry = false;
        while let Some(event) = rx.recv().await {
            match event {
                ClockEvent::Expired { generation } if generation == first => {
                    saw_first_expiry = true;
                }
                ClockEvent::Expired { generation } if generation == second => break,
                _ => {}
            }
        }
        assert!(!saw_first_expiry, "cancelled clock must not expire");
    }

    #[tokio::test(start_paused = true)]
    async fn cancel_is_idempotent() {
        let (tx, _rx) = mpsc::unbounded_channel();
        let mut clock = SessionClock::new(DEFAULT_TICK_INTERVAL, tx);
        clock.cancel();
        clock.start(Some(Duration::from_secs(1)));
        clock.cancel();
        clock.cancel();
        assert!(!clock.is_active());
    }
}
