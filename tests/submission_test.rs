//! Submission coordinator tests: retry schedule, ceiling, host mirroring.

use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;
use tokio::time::Instant;

use testlock_core::host::{HostFrame, NoHost};
use testlock_core::submit::{
    RetryPolicy, SubmissionCoordinator, SubmissionTransport, SubmitError, TransportError,
};
use testlock_core::wire::{HostMessage, SubmissionPayload, SubmissionStatus};

/// Fails the first `failures` deliveries, then succeeds.
struct FlakyTransport {
    failures: u32,
    attempts: AtomicU32,
}

impl FlakyTransport {
    fn new(failures: u32) -> Arc<Self> {
        Arc::new(Self {
            failures,
            attempts: AtomicU32::new(0),
        })
    }
}

#[async_trait]
impl SubmissionTransport for FlakyTransport {
    async fn deliver(
        &self,
        _payload: &SubmissionPayload,
    ) -> Result<serde_json::Value, TransportError> {
        let attempt = self.attempts.fetch_add(1, Ordering::SeqCst);
        if attempt < self.failures {
            Err(TransportError::Network("connection reset".into()))
        } else {
            Ok(serde_json::json!({"ok": true}))
        }
    }
}

#[derive(Default)]
struct RecordingHost {
    messages: Mutex<Vec<HostMessage>>,
}

impl HostFrame for RecordingHost {
    fn is_embedded(&self) -> bool {
        true
    }

    fn post_ready(&self) {}

    fn post(&self, message: &HostMessage) {
        self.messages.lock().push(message.clone());
    }
}

fn payload() -> SubmissionPayload {
    SubmissionPayload {
        owner: "owner-1".into(),
        matriculation_number: "MAT/19/0042".into(),
        student_email: "student@example.edu".into(),
        test_id: "test-1".into(),
        status: SubmissionStatus::Completed,
        answers: Vec::new(),
        penalty_reason: None,
    }
}

#[tokio::test(start_paused = true)]
async fn exhaustion_takes_seven_attempts_and_the_full_backoff() {
    let transport = FlakyTransport::new(u32::MAX);
    let host = Arc::new(RecordingHost::default());
    let coordinator =
        SubmissionCoordinator::new(transport.clone(), host.clone(), RetryPolicy::default());

    let started = Instant::now();
    let result = coordinator.submit(&payload()).await;

    assert!(matches!(
        result,
        Err(SubmitError::Exhausted { attempts: 7, .. })
    ));
    assert_eq!(transport.attempts.load(Ordering::SeqCst), 7);
    // Backoff runs after every failure, the last included:
    // 1+2+4+8+16+32+64 = 127s.
    let elapsed = started.elapsed();
    assert!(elapsed >= Duration::from_secs(127), "elapsed {elapsed:?}");
    assert!(elapsed < Duration::from_secs(128), "elapsed {elapsed:?}");

    // The host still hears about the failure.
    let messages = host.messages.lock();
    assert_eq!(messages.len(), 1);
    assert!(matches!(
        &messages[0],
        HostMessage::TestSubmissionError { .. }
    ));
}

#[tokio::test(start_paused = true)]
async fn success_midway_stops_the_retry_loop() {
    let transport = FlakyTransport::new(2);
    let host = Arc::new(RecordingHost::default());
    let coordinator =
        SubmissionCoordinator::new(transport.clone(), host.clone(), RetryPolicy::default());

    let started = Instant::now();
    let receipt = coordinator.submit(&payload()).await.unwrap();

    assert_eq!(receipt.attempts, 3);
    assert_eq!(transport.attempts.load(Ordering::SeqCst), 3);
    // Two failures: 1s + 2s of backoff, nothing more.
    let elapsed = started.elapsed();
    assert!(elapsed >= Duration::from_secs(3), "elapsed {elapsed:?}");
    assert!(elapsed < Duration::from_secs(4), "elapsed {elapsed:?}");

    let messages = host.messages.lock();
    assert_eq!(messages.len(), 1);
    assert!(matches!(&messages[0], HostMessage::TestResults { .. }));
}

#[tokio::test(start_paused = true)]
async fn first_attempt_success_sleeps_not_at_all() {
    let transport = FlakyTransport::new(0);
    let coordinator =
        SubmissionCoordinator::new(transport.clone(), Arc::new(NoHost), RetryPolicy::default());

    let started = Instant::now();
    let receipt = coordinator.submit(&payload()).await.unwrap();

    assert_eq!(receipt.attempts, 1);
    assert_eq!(receipt.response["ok"], true);
    assert!(started.elapsed() < Duration::from_secs(1));
}

#[tokio::test(start_paused = true)]
async fn standalone_mode_never_posts_to_a_host() {
    // NoHost panicking is impossible by construction; this pins the guard in
    // the coordinator instead: an unembedded RecordingHost stays silent.
    struct Unembedded(RecordingHost);
    impl HostFrame for Unembedded {
        fn is_embedded(&self) -> bool {
            false
        }
        fn post_ready(&self) {
            self.0.post_ready()
        }
        fn post(&self, message: &HostMessage) {
            self.0.post(message)
        }
    }

    let host = Arc::new(Unembedded(RecordingHost::default()));
    let transport = FlakyTransport::new(0);
    let coordinator =
        SubmissionCoordinator::new(transport, host.clone(), RetryPolicy::default());

    coordinator.submit(&payload()).await.unwrap();
    assert!(host.0.messages.lock().is_empty());
}

#[tokio::test(start_paused = true)]
async fn custom_policy_controls_attempts_and_base_delay() {
    let transport = FlakyTransport::new(u32::MAX);
    let policy = RetryPolicy {
        max_attempts: 3,
        initial_delay: Duration::from_millis(100),
    };
    let coordinator = SubmissionCoordinator::new(transport.clone(), Arc::new(NoHost), policy);

    let started = Instant::now();
    let result = coordinator.submit(&payload()).await;

    assert!(matches!(
        result,
        Err(SubmitError::Exhausted { attempts: 3, .. })
    ));
    // 100ms + 200ms + 400ms.
    let elapsed = started.elapsed();
    assert!(elapsed >= Duration::from_millis(700), "elapsed {elapsed:?}");
    assert!(elapsed < Duration::from_millis(800), "elapsed {elapsed:?}");
}
