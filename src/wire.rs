//! Wire formats for the host-embedding protocol and the submission proxy.
//!
//! Field names follow the external contract exactly (`_id`, `dur_millis`,
//! `questionId`, `timeTaken`, ...). Inbound questions are normalized before
//! they reach the sequencer: option objects collapse to plain strings and
//! unrecognized kind tags fall into the last category.

use serde::{Deserialize, Serialize};
use std::time::Duration;
use thiserror::Error;

use crate::question::{Question, QuestionKind};

#[derive(Debug, Error)]
pub enum WireError {
    #[error("Malformed question payload: {0}")]
    Malformed(#[from] serde_json::Error),

    #[error("Question {0} is missing its prompt text")]
    MissingPrompt(String),
}

/// Inbound question as delivered by the host frame or the question proxy.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WireQuestion {
    #[serde(rename = "_id")]
    pub id: String,
    pub query: String,
    pub test_id: String,
    #[serde(rename = "type")]
    pub kind: String,
    pub dur_millis: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub options: Option<Vec<WireOption>>,
}

/// MCQ options arrive either as plain strings or `{ text }` objects.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum WireOption {
    Text(String),
    Object { text: String },
}

impl WireOption {
    fn into_text(self) -> String {
        match self {
            Self::Text(text) | Self::Object { text } => text,
        }
    }
}

impl WireQuestion {
    /// Normalize into the engine's domain model.
    ///
    /// A non-positive `dur_millis` marks the question untimed rather than
    /// rejecting it.
    pub fn into_question(self) -> Result<Question, WireError> {
        if self.query.trim().is_empty() {
            return Err(WireError::MissingPrompt(self.id));
        }
        let duration = u64::try_from(self.dur_millis)
            .ok()
            .filter(|ms| *ms > 0)
            .map(Duration::from_millis);
        Ok(Question {
            id: self.id,
            prompt: self.query,
            test_id: self.test_id,
            kind: kind_from_wire(&self.kind),
            duration,
            choices: self
                .options
                .unwrap_or_default()
                .into_iter()
                .map(WireOption::into_text)
                .collect(),
        })
    }
}

/// Map a wire kind tag; unknown tags land in the last category.
pub fn kind_from_wire(tag: &str) -> QuestionKind {
    match tag {
        "MCQ" => QuestionKind::MultipleChoice,
        "G_OBJ" => QuestionKind::GeneralObjective,
        "SHORT" => QuestionKind::ShortText,
        _ => QuestionKind::LongForm,
    }
}

/// Normalize a whole inbound batch, rejecting the batch on the first
/// malformed entry.
pub fn normalize_questions(batch: Vec<WireQuestion>) -> Result<Vec<Question>, WireError> {
    batch.into_iter().map(WireQuestion::into_question).collect()
}

/// Parse a raw JSON array of questions (standalone mode / CLI input).
pub fn parse_questions(raw: &str) -> Result<Vec<WireQuestion>, WireError> {
    Ok(serde_json::from_str(raw)?)
}

/// Terminal submission status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SubmissionStatus {
    #[serde(rename = "completed")]
    Completed,
    #[serde(rename = "penalized")]
    Penalized,
}

/// One captured answer, in outbound field names.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WireAnswer {
    #[serde(rename = "questionId")]
    pub question_id: String,
    #[serde(rename = "questionType")]
    pub question_type: String,
    pub answer: String,
    #[serde(rename = "timeTaken")]
    pub time_taken: u64,
}

/// Final payload POSTed to the submission proxy and mirrored to the host.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SubmissionPayload {
    #[serde(rename = "_owner")]
    pub owner: String,
    #[serde(rename = "matriculationNumber")]
    pub matriculation_number: String,
    #[serde(rename = "studentEmail")]
    pub student_email: String,
    pub test_id: String,
    pub status: SubmissionStatus,
    pub answers: Vec<WireAnswer>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub penalty_reason: Option<String>,
}

/// Tagged messages exchanged with an embedding host frame.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum HostMessage {
    #[serde(rename = "questionsLoaded")]
    QuestionsLoaded { questions: Vec<WireQuestion> },
    #[serde(rename = "testResults")]
    TestResults {
        #[serde(flatten)]
        payload: SubmissionPayload,
    },
    #[serde(rename = "testSubmissionError")]
    TestSubmissionError {
        #[serde(flatten)]
        payload: SubmissionPayload,
        error: String,
    },
}
