//! The session state machine.
//!
//! `Session` is synchronous and owns every piece of per-attempt state: the
//! sequenced question list, the secondary queue, the current index, the
//! answer ledger, and the one-shot violation flag. The async driver calls
//! into it; each method runs to completion before the event loop yields, so
//! transitions are atomic from the perspective of any observer.
//!
//! Invariant: `current_index()` is `Some` iff the state is `InProgress`.
//! The violation flag is set at most once; the first violation wins.

use std::collections::VecDeque;

use tokio::time::Instant;
use tracing::{debug, info};

use crate::integrity::ViolationReason;
use crate::ledger::{Answer, AnswerLedger};
use crate::question::Question;
use crate::wire::{SubmissionPayload, SubmissionStatus};

use super::error::SessionError;

/// Lifecycle of one assessment attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    NotStarted,
    AwaitingAcceptance,
    InProgress,
    Finished(Outcome),
}

impl SessionState {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::NotStarted => "not_started",
            Self::AwaitingAcceptance => "awaiting_acceptance",
            Self::InProgress => "in_progress",
            Self::Finished(Outcome::Completed) => "finished_completed",
            Self::Finished(Outcome::Penalized) => "finished_penalized",
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Finished(_))
    }
}

/// How the attempt ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    Completed,
    Penalized,
}

/// Required student identity fields; acceptance is gated on all three.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Identity {
    pub owner: String,
    pub student_email: String,
    pub matriculation_number: String,
}

impl Identity {
    fn missing_field(&self) -> Option<&'static str> {
        if self.owner.trim().is_empty() {
            Some("owner")
        } else if self.student_email.trim().is_empty() {
            Some("student email")
        } else if self.matriculation_number.trim().is_empty() {
            Some("matriculation number")
        } else {
            None
        }
    }
}

/// Result of advancing past the current question.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Advance {
    /// Now on the question at this index; the caller starts its clock.
    Next(usize),
    /// Primary sequence and secondary queue both exhausted.
    Finished,
}

pub struct Session {
    state: SessionState,
    questions: Vec<Question>,
    secondary: VecDeque<Question>,
    current: usize,
    draft: String,
    question_started: Option<Instant>,
    ledger: AnswerLedger,
    identity: Identity,
    test_id: String,
    violation: Option<ViolationReason>,
}

impl Default for Session {
    fn default() -> Self {
        Self::new()
    }
}

impl Session {
    pub fn new() -> Self {
        Self {
            state: SessionState::NotStarted,
            questions: Vec::new(),
            secondary: VecDeque::new(),
            current: 0,
            draft: String::new(),
            question_started: None,
            ledger: AnswerLedger::new(),
            identity: Identity::default(),
            test_id: String::new(),
            violation: None,
        }
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    /// Valid index iff `InProgress`.
    pub fn current_index(&self) -> Option<usize> {
        matches!(self.state, SessionState::InProgress).then_some(self.current)
    }

    pub fn current_question(&self) -> Option<&Question> {
        self.current_index().and_then(|i| self.questions.get(i))
    }

    pub fn question_count(&self) -> usize {
        self.questions.len()
    }

    pub fn secondary_count(&self) -> usize {
        self.secondary.len()
    }

    pub fn violation_reason(&self) -> Option<ViolationReason> {
        self.violation
    }

    pub fn answers(&self) -> Vec<Answer> {
        self.ledger.snapshot()
    }

    /// `NotStarted -> AwaitingAcceptance` on a non-empty sequenced list.
    ///
    /// An empty list is reported as [`SessionError::NoQuestions`] and leaves
    /// the session in `NotStarted`; the caller surfaces a "no test" notice.
    pub fn load(&mut self, sequenced: Vec<Question>) -> Result<(), SessionError> {
        if self.state != SessionState::NotStarted {
            return Err(SessionError::InvalidTransition {
                action: "load",
                state: self.state.as_str(),
            });
        }
        if sequenced.is_empty() {
            return Err(SessionError::NoQuestions);
        }
        self.test_id = sequenced[0].test_id.clone();
        info!(count = sequenced.len(), test_id = %self.test_id, "questions loaded");
        self.questions = sequenced;
        self.state = SessionState::AwaitingAcceptance;
        Ok(())
    }

    /// Append reserve questions; consumed FIFO once the primary sequence is
    /// exhausted. Accepted any time before a terminal state.
    pub fn queue_secondary(&mut self, questions: Vec<Question>) -> Result<(), SessionError> {
        if self.state.is_terminal() {
            return Err(SessionError::InvalidTransition {
                action: "queue_secondary",
                state: self.state.as_str(),
            });
        }
        self.secondary.extend(questions);
        Ok(())
    }

    pub fn set_identity(&mut self, identity: Identity) {
        self.identity = identity;
    }

    /// Validate acceptance preconditions without mutating state. Checked
    /// before the fullscreen request so a denied request is never issued for
    /// an attempt that could not start anyway.
    pub fn can_begin(&self) -> Result<(), SessionError> {
        if self.state != SessionState::AwaitingAcceptance {
            return Err(SessionError::InvalidTransition {
                action: "begin",
                state: self.state.as_str(),
            });
        }
        if let Some(field) = self.identity.missing_field() {
            return Err(SessionError::MissingIdentity(field));
        }
        Ok(())
    }

    /// `AwaitingAcceptance -> InProgress(0)`. The caller has already entered
    /// fullscreen presentation; a denial never reaches this method.
    pub fn begin(&mut self, now: Instant) -> Result<&Question, SessionError> {
        self.can_begin()?;
        self.state = SessionState::InProgress;
        self.current = 0;
        self.draft.clear();
        self.question_started = Some(now);
        info!(test_id = %self.test_id, "session started");
        Ok(&self.questions[0])
    }

    /// Update the in-flight answer text for the current question.
    pub fn set_draft(&mut self, text: String) {
        if self.state == SessionState::InProgress {
            self.draft = text;
        }
    }

    /// Capture the current answer and move on, pulling from the secondary
    /// queue when the primary sequence runs out. Driven by clock expiry or a
    /// manual submit; both paths are identical from here.
    pub fn advance(&mut self, now: Instant) -> Result<Advance, SessionError> {
        if self.state != SessionState::InProgress {
            return Err(SessionError::InvalidTransition {
                action: "advance",
                state: self.state.as_str(),
            });
        }
        self.capture_current(now);

        let next = self.current + 1;
        if next >= self.questions.len() {
            match self.secondary.pop_front() {
                Some(extra) => {
                    debug!(question_id = %extra.id, "appending secondary question");
                    self.questions.push(extra);
                }
                None => {
                    self.state = SessionState::Finished(Outcome::Completed);
                    info!(answers = self.ledger.len(), "session completed");
                    return Ok(Advance::Finished);
                }
            }
        }
        self.current = next;
        self.draft.clear();
        self.question_started = Some(now);
        Ok(Advance::Next(next))
    }

    /// `InProgress -> Finished(Penalized)` on the first violation.
    ///
    /// Returns `true` when the transition happened. Later violations (or any
    /// outside `InProgress`) are observed but have no effect; this is the
    /// idempotency guard that keeps two signals landing in the same tick from
    /// both mutating terminal state.
    pub fn report_violation(&mut self, reason: ViolationReason, now: Instant) -> bool {
        if self.state != SessionState::InProgress || self.violation.is_some() {
            debug!(reason = reason.as_str(), "violation ignored");
            return false;
        }
        self.capture_current(now);
        self.violation = Some(reason);
        self.questions.clear();
        self.secondary.clear();
        self.state = SessionState::Finished(Outcome::Penalized);
        true
    }

    /// Assemble the outbound payload. Only valid in a terminal state.
    pub fn submission(&self) -> Result<SubmissionPayload, SessionError> {
        let SessionState::Finished(outcome) = self.state else {
            return Err(SessionError::NotTerminal);
        };
        Ok(SubmissionPayload {
            owner: self.identity.owner.clone(),
            matriculation_number: self.identity.matriculation_number.clone(),
            student_email: self.identity.student_email.clone(),
            test_id: self.test_id.clone(),
            status: match outcome {
                Outcome::Completed => SubmissionStatus::Completed,
                Outcome::Penalized => SubmissionStatus::Penalized,
            },
            answers: self.ledger.snapshot().iter().map(Answer::to_wire).collect(),
            penalty_reason: self.violation.map(|r| r.as_str().to_string()),
        })
    }

    /// Upsert the in-flight answer (even empty) with its time spent.
    fn capture_current(&mut self, now: Instant) {
        let Some(question) = self.questions.get(self.current) else {
            return;
        };
        let time_spent = self
            .question_started
            .map(|started| now.saturating_duration_since(started))
            .unwrap_or_default();
        self.ledger.upsert(Answer {
            question_id: question.id.clone(),
            kind: question.kind,
            value: std::mem::take(&mut self.draft),
            time_spent,
        });
    }
}
