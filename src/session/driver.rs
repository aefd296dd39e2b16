//! Async orchestration of one assessment attempt.
//!
//! `SessionDriver::run` is the single event loop that reconciles the three
//! signal sources — clock events, environment signals, and user commands —
//! against the state machine. Every handler runs to completion before the
//! loop yields, so a transition ("capture answer, advance index, start next
//! clock") can never interleave with another. Entering a terminal state
//! cancels the clock and detaches the environment subscription in the same
//! turn; stale clock events are additionally fenced by generation.

use std::sync::Arc;
use std::time::Duration;

use rand::rngs::StdRng;
use rand::SeedableRng;
use tokio::sync::mpsc;
use tokio::time::Instant;
use tracing::{debug, warn};

use crate::clock::{ClockEvent, SessionClock, TimeLeft, DEFAULT_TICK_INTERVAL};
use crate::host::HostFrame;
use crate::integrity::{
    BenignReason, Classification, EnvSubscription, EnvironmentSignals, IntegrityConfig,
    IntegrityMonitor, ViolationEvent,
};
use crate::presentation::PresentationMode;
use crate::question::sequence;
use crate::submit::{
    RetryPolicy, SubmissionCoordinator, SubmissionReceipt, SubmissionTransport, SubmitError,
};
use crate::telemetry::audit;
use crate::wire::{normalize_questions, HostMessage, WireQuestion};

use super::error::SessionError;
use super::state::{Advance, Identity, Outcome, Session, SessionState};

/// Commands from the embedding surface (UI, host frame shim, CLI).
#[derive(Debug)]
pub enum Command {
    /// Inbound question batch; sequenced once, before the session starts.
    LoadQuestions(Vec<WireQuestion>),
    /// Reserve questions appended after the primary sequence is exhausted.
    QueueSecondary(Vec<WireQuestion>),
    SetIdentity(Identity),
    /// User acceptance: enter fullscreen and start question 0.
    Accept,
    /// In-flight answer text for the current question.
    Draft(String),
    /// Manual "submit answer": capture and advance.
    SubmitAnswer,
}

/// Render-facing notifications. The engine never touches layout; a front end
/// subscribes to these instead of reading engine state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UiEvent {
    /// Questions are loaded; waiting for the user to accept.
    AwaitingAcceptance { total: usize },
    /// Empty or absent question list; non-fatal.
    NoQuestions,
    /// Inbound payload failed normalization; non-fatal.
    MalformedQuestions(String),
    /// A question became active.
    ActiveQuestion {
        index: usize,
        total: usize,
        prompt: String,
        choices: Vec<String>,
    },
    /// Countdown sample for the active question.
    Countdown(TimeLeft),
    /// Soft keyboard detected; bring the answer input back into view.
    ScrollAnswerIntoView,
    /// Fullscreen request denied; acceptance can be retried.
    FullscreenDenied(String),
    /// Identity fields incomplete; acceptance can be retried.
    MissingIdentity(&'static str),
    Finished(Outcome),
}

/// Cloneable command sender for a running driver.
#[derive(Clone)]
pub struct SessionHandle {
    commands: mpsc::UnboundedSender<Command>,
}

impl SessionHandle {
    pub fn send(&self, command: Command) -> Result<(), SessionError> {
        self.commands
            .send(command)
            .map_err(|_| SessionError::EngineStopped)
    }

    pub fn load_questions(&self, questions: Vec<WireQuestion>) -> Result<(), SessionError> {
        self.send(Command::LoadQuestions(questions))
    }

    pub fn queue_secondary(&self, questions: Vec<WireQuestion>) -> Result<(), SessionError> {
        self.send(Command::QueueSecondary(questions))
    }

    pub fn set_identity(&self, identity: Identity) -> Result<(), SessionError> {
        self.send(Command::SetIdentity(identity))
    }

    pub fn accept(&self) -> Result<(), SessionError> {
        self.send(Command::Accept)
    }

    pub fn draft(&self, text: impl Into<String>) -> Result<(), SessionError> {
        self.send(Command::Draft(text.into()))
    }

    pub fn submit_answer(&self) -> Result<(), SessionError> {
        self.send(Command::SubmitAnswer)
    }

    /// Feed one decoded host-frame message to the engine. Returns `true`
    /// when the message carried questions; the outbound-only tags
    /// (`testResults`, `testSubmissionError`) are ignored if a parent echoes
    /// them back.
    pub fn deliver_host_message(&self, message: HostMessage) -> Result<bool, SessionError> {
        match message {
            HostMessage::QuestionsLoaded { questions } => {
                self.load_questions(questions)?;
                Ok(true)
            }
            HostMessage::TestResults { .. } | HostMessage::TestSubmissionError { .. } => Ok(false),
        }
    }
}

/// Engine tunables.
#[derive(Debug, Clone, Copy)]
pub struct DriverConfig {
    pub tick_interval: Duration,
    pub integrity: IntegrityConfig,
    pub retry: RetryPolicy,
}

impl Default for DriverConfig {
    fn default() -> Self {
        Self {
            tick_interval: DEFAULT_TICK_INTERVAL,
            integrity: IntegrityConfig::default(),
            retry: RetryPolicy::default(),
        }
    }
}

/// Terminal result of a driven session.
#[derive(Debug)]
pub struct SessionReport {
    pub outcome: Outcome,
    pub payload: crate::wire::SubmissionPayload,
    pub delivery: Result<SubmissionReceipt, SubmitError>,
}

pub struct SessionDriver {
    session: Session,
    monitor: IntegrityMonitor,
    clock: SessionClock,
    clock_events: mpsc::UnboundedReceiver<ClockEvent>,
    commands: mpsc::UnboundedReceiver<Command>,
    env: EnvSubscription,
    signals: Arc<dyn EnvironmentSignals>,
    presentation: Arc<dyn PresentationMode>,
    coordinator: SubmissionCoordinator,
    ui: mpsc::UnboundedSender<UiEvent>,
    rng: StdRng,
}

impl SessionDriver {
    /// Wire up a driver and its control/notification channels.
    pub fn new(
        config: DriverConfig,
        signals: Arc<dyn EnvironmentSignals>,
        presentation: Arc<dyn PresentationMode>,
        host: Arc<dyn HostFrame>,
        transport: Arc<dyn SubmissionTransport>,
    ) -> (SessionHandle, mpsc::UnboundedReceiver<UiEvent>, Self) {
        let (command_tx, command_rx) = mpsc::unbounded_channel();
        let (ui_tx, ui_rx) = mpsc::unbounded_channel();
        let (clock_tx, clock_rx) = mpsc::unbounded_channel();
        let env = signals.subscribe();

        if host.is_embedded() {
            host.post_ready();
        }

        let driver = Self {
            session: Session::new(),
            monitor: IntegrityMonitor::new(config.integrity),
            clock: SessionClock::new(config.tick_interval, clock_tx),
            clock_events: clock_rx,
            commands: command_rx,
            env,
            signals,
            presentation,
            coordinator: SubmissionCoordinator::new(transport, host, config.retry),
            ui: ui_tx,
            rng: StdRng::from_entropy(),
        };
        (
            SessionHandle {
                commands: command_tx,
            },
            ui_rx,
            driver,
        )
    }

    /// Run the attempt to its terminal state, then deliver the submission.
    pub async fn run(mut self) -> Result<SessionReport, SessionError> {
        let mut commands_open = true;
        let mut env_open = true;

        while !self.session.state().is_terminal() {
            tokio::select! {
                command = self.commands.recv(), if commands_open => match command {
                    Some(command) => self.handle_command(command).await,
                    None => {
                        commands_open = false;
                        // With no control surface and no clock running the
                        // session can never progress again.
                        if !self.clock.is_active() {
                            return Err(SessionError::EngineStopped);
                        }
                    }
                },
                Some(event) = self.clock_events.recv() => self.handle_clock(event).await,
                signal = self.env.recv(), if env_open => match signal {
                    Some(signal) => self.handle_signal(signal).await,
                    None => env_open = false,
                },
            }
        }

        // Terminal: stop the clock and detach listeners in this same turn so
        // no post-terminal signal is delivered.
        self.clock.cancel();
        self.env.detach();

        let payload = self.session.submission()?;
        let delivery = self.coordinator.submit(&payload).await;
        let outcome = match self.session.state() {
            SessionState::Finished(outcome) => outcome,
            _ => unreachable!("loop exits only in a terminal state"),
        };
        Ok(SessionReport {
            outcome,
            payload,
            delivery,
        })
    }

    async fn handle_command(&mut self, command: Command) {
        match command {
            Command::LoadQuestions(batch) => self.load_questions(batch),
            Command::QueueSecondary(batch) => match normalize_questions(batch) {
                Ok(questions) => {
                    if let Err(error) = self.session.queue_secondary(questions) {
                        warn!(%error, "secondary questions rejected");
                    }
                }
                Err(error) => {
                    warn!(%error, "malformed secondary questions");
                    self.notify(UiEvent::MalformedQuestions(error.to_string()));
                }
            },
            Command::SetIdentity(identity) => self.session.set_identity(identity),
            Command::Accept => self.accept().await,
            Command::Draft(text) => self.session.set_draft(text),
            Command::SubmitAnswer => self.advance().await,
        }
    }

    fn load_questions(&mut self, batch: Vec<WireQuestion>) {
        let questions = match normalize_questions(batch) {
            Ok(questions) => questions,
            Err(error) => {
                warn!(%error, "malformed question payload");
                self.notify(UiEvent::MalformedQuestions(error.to_string()));
                return;
            }
        };
        let sequenced = sequence(questions, &mut self.rng);
        match self.session.load(sequenced) {
            Ok(()) => self.notify(UiEvent::AwaitingAcceptance {
                total: self.session.question_count(),
            }),
            Err(SessionError::NoQuestions) => {
                debug!("empty question list; session stays not started");
                self.notify(UiEvent::NoQuestions);
            }
            Err(error) => warn!(%error, "question load rejected"),
        }
    }

    async fn accept(&mut self) {
        if let Err(error) = self.session.can_begin() {
            match error {
                SessionError::MissingIdentity(field) => {
                    self.notify(UiEvent::MissingIdentity(field));
                }
                other => warn!(error = %other, "acceptance rejected"),
            }
            return;
        }

        // Fullscreen is requested before the session starts; denial blocks
        // the start transition but stays retryable.
        if let Err(error) = self.presentation.enter().await {
            warn!(%error, "fullscreen request denied");
            self.notify(UiEvent::FullscreenDenied(error.to_string()));
            return;
        }

        let now = Instant::now();
        let (duration, active) = match self.session.begin(now) {
            Ok(question) => (question.duration, self.active_question_event()),
            Err(error) => {
                warn!(%error, "begin rejected after acceptance checks");
                return;
            }
        };

        if let Some(geometry) = self.signals.viewport() {
            self.monitor.set_baseline(geometry);
        }
        self.clock.start(duration);
        if let Some(event) = active {
            self.notify(event);
        }
    }

    /// Clock expiry and manual submit share this path.
    async fn advance(&mut self) {
        let now = Instant::now();
        match self.session.advance(now) {
            Ok(Advance::Next(_)) => {
                let duration = self
                    .session
                    .current_question()
                    .and_then(|question| question.duration);
                self.clock.start(duration);
                if let Some(event) = self.active_question_event() {
                    self.notify(event);
                }
            }
            Ok(Advance::Finished) => {
                self.clock.cancel();
                self.exit_presentation_best_effort().await;
                self.notify(UiEvent::Finished(Outcome::Completed));
            }
            Err(error) => debug!(%error, "advance ignored"),
        }
    }

    async fn handle_clock(&mut self, event: ClockEvent) {
        // Events from a cancelled clock may still be queued; drop them.
        if event.generation() != self.clock.generation() {
            return;
        }
        match event {
            ClockEvent::Tick { remaining, .. } => self.notify(UiEvent::Countdown(remaining)),
            ClockEvent::Expired { .. } => self.advance().await,
        }
    }

    async fn handle_signal(&mut self, signal: crate::integrity::EnvSignal) {
        if self.session.state() != SessionState::InProgress {
            return;
        }
        match self.monitor.observe(signal) {
            Classification::Violation(reason) => {
                let event = ViolationEvent::now(reason);
                let index = self.session.current_index().unwrap_or(0);
                if self.session.report_violation(reason, Instant::now()) {
                    audit::violation(&event, index);
                    self.clock.cancel();
                    self.exit_presentation_best_effort().await;
                    self.notify(UiEvent::Finished(Outcome::Penalized));
                } else {
                    audit::violation_suppressed(&event);
                }
            }
            Classification::Benign(BenignReason::VirtualKeyboard) => {
                self.notify(UiEvent::ScrollAnswerIntoView);
            }
            Classification::Benign(reason) => {
                debug!(?reason, "benign environment signal");
            }
        }
    }

    /// Leaving fullscreen after a terminal transition must never block it.
    async fn exit_presentation_best_effort(&self) {
        if let Err(error) = self.presentation.exit().await {
            warn!(%error, "fullscreen exit failed; continuing");
        }
    }

    fn active_question_event(&self) -> Option<UiEvent> {
        let index = self.session.current_index()?;
        let question = self.session.current_question()?;
        Some(UiEvent::ActiveQuestion {
            index,
            total: self.session.question_count(),
            prompt: question.prompt.clone(),
            choices: question.choices.clone(),
        })
    }

    fn notify(&self, event: UiEvent) {
        // The UI side may have gone away; the engine does not care.
        let _ = self.ui.send(event);
    }
}
