//! Per-user practice rounds over the question bank
//!
//! A practice round is a personal loop of exactly ten bank questions.
//! Each participant in a room carries their own [`Progress`]; the round
//! never repeats a question, and the tenth answer is folded into the
//! participant's room record elsewhere.

use std::collections::HashSet;

use serde::Serialize;

use crate::{
    bank::{QuestionEntry, QuestionId, QuestionKind},
    constants::practice::ROUND_SIZE,
};

/// Replies sent back to the practicing participant
#[derive(Debug, Serialize, Clone, PartialEq)]
#[serde(rename_all_fields = "camelCase")]
pub enum ReplyMessage {
    /// The next question to answer; the expected answer stays server-side
    Question {
        /// Bank id to echo back with the answer
        id: QuestionId,
        /// How to present the question
        kind: QuestionKind,
        /// The question text
        prompt: String,
    },
    /// The round already reached its ten answers
    Done,
    /// The bank has no unasked questions left for this round
    Exhausted {
        /// Answers still required to finish the round
        need: usize,
    },
    /// The submitted answer was blank
    MustAnswer,
    /// The referenced question no longer exists in the bank
    QuestionNotFound,
    /// Feedback for one answer mid-round
    Progress {
        /// Whether the answer matched
        correct: bool,
        /// The expected answer, revealed now that the user answered
        answer: String,
        /// Answers given so far this round
        answered: usize,
        /// Correct answers so far this round
        correct_count: usize,
    },
    /// The tenth answer closed the round
    RoundComplete {
        /// Answers given this round, always the round size
        answered: usize,
        /// Correct answers this round
        correct: usize,
        /// Fraction of correct answers in `0.0..=1.0`
        accuracy: f64,
        /// Points folded into the participant's room record
        points_added: u64,
    },
}

/// One participant's progress through their current practice round
#[derive(Debug, Default, Clone)]
pub struct Progress {
    /// Ids already served this round, never repeated
    asked: HashSet<QuestionId>,
    /// Answers given this round
    answered_count: usize,
    /// Correct answers this round
    correct_count: usize,
}

impl Progress {
    /// Picks a uniformly random question the participant has not seen
    /// this round
    ///
    /// Replies `Done` once the round is complete and `Exhausted` when
    /// the bank has no unasked entries left, carrying how many answers
    /// the round still needs.
    pub fn next_question(&mut self, bank: &[QuestionEntry]) -> ReplyMessage {
        if self.answered_count >= ROUND_SIZE {
            return ReplyMessage::Done;
        }

        let unasked: Vec<&QuestionEntry> = bank
            .iter()
            .filter(|entry| !self.asked.contains(&entry.id))
            .collect();

        if unasked.is_empty() {
            return ReplyMessage::Exhausted {
                need: ROUND_SIZE - self.answered_count,
            };
        }

        let entry = unasked[fastrand::usize(..unasked.len())];
        self.asked.insert(entry.id.clone());

        ReplyMessage::Question {
            id: entry.id.clone(),
            kind: entry.kind,
            prompt: entry.prompt.clone(),
        }
    }

    /// Records one answered question
    pub fn record_answer(&mut self, correct: bool) {
        self.answered_count += 1;
        if correct {
            self.correct_count += 1;
        }
    }

    /// Answers given so far this round
    pub fn answered_count(&self) -> usize {
        self.answered_count
    }

    /// Correct answers so far this round
    pub fn correct_count(&self) -> usize {
        self.correct_count
    }

    /// Whether the round has reached its ten answers
    pub fn is_complete(&self) -> bool {
        self.answered_count >= ROUND_SIZE
    }
}
