//! Question data model and deterministic sequencing.
//!
//! Questions are immutable once loaded; the sequencer produces the ordered
//! list a session walks through exactly once, before the session starts.

mod sequencer;

pub use sequencer::sequence;

use std::time::Duration;

/// Fixed category precedence for sequencing. Unrecognized kinds collapse
/// into the last category.
pub const KIND_PRECEDENCE: [QuestionKind; 4] = [
    QuestionKind::MultipleChoice,
    QuestionKind::GeneralObjective,
    QuestionKind::ShortText,
    QuestionKind::LongForm,
];

/// Question category, in wire terms: MCQ, G_OBJ, SHORT, PARAGRAPH.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum QuestionKind {
    MultipleChoice,
    GeneralObjective,
    ShortText,
    LongForm,
}

impl QuestionKind {
    /// Wire tag for outbound payloads (`questionType` field).
    pub fn as_wire_str(&self) -> &'static str {
        match self {
            Self::MultipleChoice => "MCQ",
            Self::GeneralObjective => "G_OBJ",
            Self::ShortText => "SHORT",
            Self::LongForm => "PARAGRAPH",
        }
    }

    /// Position in the fixed category precedence.
    pub fn precedence(&self) -> usize {
        KIND_PRECEDENCE
            .iter()
            .position(|k| k == self)
            .unwrap_or(KIND_PRECEDENCE.len() - 1)
    }
}

/// A single assessment question, normalized from the inbound payload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Question {
    pub id: String,
    pub prompt: String,
    pub test_id: String,
    pub kind: QuestionKind,
    /// `None` means untimed: the clock never auto-expires this question.
    pub duration: Option<Duration>,
    /// Choice texts, `MultipleChoice` only. Empty for other kinds.
    pub choices: Vec<String>,
}

impl Question {
    /// Whether this question has no countdown.
    pub fn is_untimed(&self) -> bool {
        self.duration.is_none()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn precedence_matches_fixed_order() {
        assert_eq!(QuestionKind::MultipleChoice.precedence(), 0);
        assert_eq!(QuestionKind::GeneralObjective.precedence(), 1);
        assert_eq!(QuestionKind::ShortText.precedence(), 2);
        assert_eq!(QuestionKind::LongForm.precedence(), 3);
    }

    #[test]
    fn wire_tags_round_trip_precedence() {
        for kind in KIND_PRECEDENCE {
            assert!(!kind.as_wire_str().is_empty());
        }
    }
}
