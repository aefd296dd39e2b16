//! Answer ledger: one entry per question, last write wins.

use std::time::Duration;

use crate::question::QuestionKind;
use crate::wire::WireAnswer;

/// One captured answer. Mutated only through [`AnswerLedger::upsert`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Answer {
    pub question_id: String,
    pub kind: QuestionKind,
    pub value: String,
    pub time_spent: Duration,
}

impl Answer {
    /// Outbound representation, in the proxy contract's field names.
    pub fn to_wire(&self) -> WireAnswer {
        WireAnswer {
            question_id: self.question_id.clone(),
            question_type: self.kind.as_wire_str().to_string(),
            answer: self.value.clone(),
            time_taken: self.time_spent.as_millis() as u64,
        }
    }
}

/// Append-or-replace record of answers for one session.
#[derive(Debug, Default)]
pub struct AnswerLedger {
    entries: Vec<Answer>,
}

impl AnswerLedger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert the answer, replacing any prior entry for the same question.
    pub fn upsert(&mut self, answer: Answer) {
        match self
            .entries
            .iter_mut()
            .find(|a| a.question_id == answer.question_id)
        {
            Some(existing) => *existing = answer,
            None => self.entries.push(answer),
        }
    }

    /// Current contents, in insertion order. Does not mutate the ledger.
    pub fn snapshot(&self) -> Vec<Answer> {
        self.entries.clone()
    }

    pub fn get(&self, question_id: &str) -> Option<&Answer> {
        self.entries.iter().find(|a| a.question_id == question_id)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
