//! Per-room live session state
//!
//! A room accumulates participant records across many pushed questions.
//! Pushing a question starts a new generation: the per-question stats
//! and the dedup set reset while the records and the leaderboard carry
//! over. Practice progress is tracked here too, per username, but runs
//! against the shared question bank rather than the pushed question.

use std::{
    collections::{HashMap, HashSet},
    time::Duration,
};

use serde::Serialize;
use web_time::SystemTime;

use crate::{
    bank::{QuestionEntry, QuestionKind},
    constants::practice::ROUND_SIZE,
    leaderboard, practice, score,
};

/// Cross-question accumulation for one participant
#[derive(Debug, Default, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ParticipantRecord {
    /// Accumulated points across pushed questions and practice rounds
    pub score: u64,
    /// Correctly answered questions
    pub correct_count: u64,
    /// Whole seconds spent answering, summed over answers with a known
    /// elapsed time
    pub total_time_seconds: u64,
    /// Total recorded answers
    pub answers_count: u64,
}

/// The question currently pushed to a room, if any
#[derive(Debug, Default, Clone)]
pub enum CurrentQuestion {
    /// No question is live; answers still get recorded, scored zero
    #[default]
    Idle,
    /// A question is live
    Active(ActiveQuestion),
}

/// A live pushed question
///
/// The prompt itself is not kept here; it goes out in the broadcast and
/// the room only needs what scoring and comparison require.
#[derive(Debug, Clone)]
pub struct ActiveQuestion {
    /// Answer submissions are compared against this, case-sensitively
    pub expected_answer: String,
    /// How clients presented the question
    pub kind: QuestionKind,
    /// Zero means untimed; untimed answers earn no speed bonus
    pub time_limit: Duration,
    /// When the question was pushed, for elapsed-time measurement
    pub started_at: SystemTime,
    /// Optional position within a prepared set
    pub question_number: Option<u32>,
    /// Optional size of the prepared set
    pub question_total: Option<u32>,
}

/// Tallies for the current question generation
#[derive(Debug, Default, Clone)]
pub struct QuestionStats {
    /// Correct answers this generation
    pub correct_count: u64,
    /// Incorrect answers this generation
    pub incorrect_count: u64,
    /// Usernames that answered correctly, in first-answer order
    pub correct_usernames: Vec<String>,
    /// Usernames that answered incorrectly, in first-answer order
    pub incorrect_usernames: Vec<String>,
}

/// Outcome of one answer submission
#[derive(Debug, Clone, PartialEq)]
pub enum AnswerOutcome {
    /// The trimmed answer was empty; nothing was recorded
    Blank,
    /// This username already answered the current generation
    Duplicate,
    /// The answer was scored into the participant's record
    Scored {
        /// Whether the answer matched the expected one
        correct: bool,
        /// The expected answer, revealed to the answerer
        expected_answer: String,
        /// Points credited
        points: u64,
    },
}

/// Room-wide pushes emitted while a session runs
#[serde_with::skip_serializing_none]
#[derive(Debug, Serialize, Clone)]
#[serde(rename_all_fields = "camelCase")]
pub enum UpdateMessage {
    /// A new question went live
    Question {
        /// The question text
        question: String,
        /// Presentation kind
        kind: QuestionKind,
        /// Zero means untimed
        time_limit_seconds: u64,
        /// Position within a prepared set, when known
        question_number: Option<u32>,
        /// Size of the prepared set, when known
        question_total: Option<u32>,
    },
    /// Running tallies for the current question
    AnswerStats {
        /// All recorded answers this generation
        total_answers: u64,
        /// Correct answers this generation
        correct_answers: u64,
        /// Incorrect answers this generation
        incorrect_answers: u64,
        /// Usernames that answered correctly
        correct_users: Vec<String>,
        /// Usernames that answered incorrectly
        incorrect_users: Vec<String>,
        /// Share of correct answers in percent, 0 when nobody answered
        percentage: f64,
    },
    /// Up-to-date standings for the room
    Leaderboard {
        /// Ranked rows, best first
        entries: Vec<leaderboard::Entry>,
    },
}

/// Sender-only replies to an answer submission
#[derive(Debug, Serialize, Clone)]
#[serde(rename_all_fields = "camelCase")]
pub enum ReplyMessage {
    /// The submission was processed
    AnswerResult {
        /// Whether the answer matched
        correct: bool,
        /// Whether the submission was blank and therefore not recorded
        blank: bool,
        /// The expected answer, empty when no question was live
        answer: String,
        /// The username the result was recorded under
        username: String,
    },
    /// The username already answered the current question
    AlreadyAnswered {
        /// The rejected username
        username: String,
    },
}

/// All mutable state scoped to one room
#[derive(Debug, Default)]
pub struct RoomState {
    /// Cross-question accumulation, keyed by username
    records: HashMap<String, ParticipantRecord>,
    /// The question generation answers are judged against
    current: CurrentQuestion,
    /// Tallies for the current generation
    stats: QuestionStats,
    /// Usernames that already answered the current generation
    answered: HashSet<String>,
    /// Practice round progress, keyed by username
    practice: HashMap<String, practice::Progress>,
}

impl RoomState {
    /// Creates an empty room
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes a new question live, starting a fresh generation
    ///
    /// Records and the leaderboard carry over; stats and the dedup set
    /// reset.
    pub fn push_question(
        &mut self,
        expected_answer: String,
        kind: QuestionKind,
        time_limit: Duration,
        question_number: Option<u32>,
        question_total: Option<u32>,
        now: SystemTime,
    ) {
        self.current = CurrentQuestion::Active(ActiveQuestion {
            expected_answer,
            kind,
            time_limit,
            started_at: now,
            question_number,
            question_total,
        });
        self.stats = QuestionStats::default();
        self.answered.clear();
    }

    /// Returns the room to its idle state
    ///
    /// The only exit from an active question besides the next push;
    /// there is no timeout driven by the room itself.
    pub fn clear_question(&mut self) {
        self.current = CurrentQuestion::Idle;
        self.stats = QuestionStats::default();
        self.answered.clear();
    }

    /// Processes one live answer submission
    ///
    /// Blank answers are acknowledged but not recorded. Each username
    /// gets exactly one scored answer per question generation. A late
    /// answer is judged against whatever question is live at submission,
    /// and with no live question it is recorded as incorrect for zero
    /// points.
    pub fn submit_answer(
        &mut self,
        username: &str,
        raw_answer: &str,
        now: SystemTime,
    ) -> AnswerOutcome {
        let answer = raw_answer.trim();
        if answer.is_empty() {
            return AnswerOutcome::Blank;
        }

        if self.answered.contains(username) {
            return AnswerOutcome::Duplicate;
        }

        let (correct, expected_answer, elapsed, time_limit) = match &self.current {
            CurrentQuestion::Active(question) => (
                answer == question.expected_answer,
                question.expected_answer.clone(),
                now.duration_since(question.started_at).ok(),
                question.time_limit,
            ),
            CurrentQuestion::Idle => (false, String::new(), None, Duration::ZERO),
        };

        let points = score::score_timed_answer(correct, elapsed, time_limit);
        self.credit(username, correct, points, elapsed);
        self.answered.insert(username.to_owned());
        self.tally(username, correct);

        AnswerOutcome::Scored {
            correct,
            expected_answer,
            points,
        }
    }

    /// Records one answer gathered away from the live flow
    ///
    /// The caller vouches for correctness and the optional elapsed
    /// time; the dedup set does not apply. Scoring runs through the
    /// same policy as live answers, against the live question's limit
    /// when one is up, so a recorded time can still earn a speed bonus.
    pub fn record_offline_answer(
        &mut self,
        username: &str,
        correct: bool,
        time_taken: Option<Duration>,
    ) {
        let time_limit = match &self.current {
            CurrentQuestion::Active(question) => question.time_limit,
            CurrentQuestion::Idle => Duration::ZERO,
        };
        let points = score::score_timed_answer(correct, time_taken, time_limit);
        self.credit(username, correct, points, time_taken);
        self.tally(username, correct);
    }

    /// Serves the next practice question for a username
    pub fn practice_next(&mut self, username: &str, bank: &[QuestionEntry]) -> practice::ReplyMessage {
        self.practice
            .entry(username.to_owned())
            .or_default()
            .next_question(bank)
    }

    /// Judges one practice answer, closing the round on the tenth
    ///
    /// Closing is atomic: the round's points, correct count and answer
    /// count fold into the participant's record in the same call that
    /// resets the progress. Practice answers carry no elapsed time.
    pub fn submit_practice_answer(
        &mut self,
        username: &str,
        entry: Option<&QuestionEntry>,
        raw_answer: &str,
    ) -> practice::ReplyMessage {
        let answer = raw_answer.trim();
        if answer.is_empty() {
            return practice::ReplyMessage::MustAnswer;
        }

        let Some(entry) = entry else {
            return practice::ReplyMessage::QuestionNotFound;
        };

        let correct = answer == entry.answer;
        let progress = self.practice.entry(username.to_owned()).or_default();
        progress.record_answer(correct);

        if progress.is_complete() {
            let finished = std::mem::take(progress);
            let answered = finished.answered_count();
            let correct_total = finished.correct_count();
            let accuracy = correct_total as f64 / ROUND_SIZE as f64;
            let points_added = score::score_practice_round(accuracy);

            let record = self.records.entry(username.to_owned()).or_default();
            record.score += points_added;
            record.correct_count += correct_total as u64;
            record.answers_count += answered as u64;

            return practice::ReplyMessage::RoundComplete {
                answered,
                correct: correct_total,
                accuracy,
                points_added,
            };
        }

        practice::ReplyMessage::Progress {
            correct,
            answer: entry.answer.clone(),
            answered: progress.answered_count(),
            correct_count: progress.correct_count(),
        }
    }

    /// Builds the stats broadcast for the current generation
    pub fn stats_message(&self) -> UpdateMessage {
        let total = self.stats.correct_count + self.stats.incorrect_count;
        let percentage = if total == 0 {
            0.0
        } else {
            self.stats.correct_count as f64 / total as f64 * 100.0
        };

        UpdateMessage::AnswerStats {
            total_answers: total,
            correct_answers: self.stats.correct_count,
            incorrect_answers: self.stats.incorrect_count,
            correct_users: self.stats.correct_usernames.clone(),
            incorrect_users: self.stats.incorrect_usernames.clone(),
            percentage,
        }
    }

    /// Builds the leaderboard broadcast from the current records
    pub fn leaderboard_message(&self) -> UpdateMessage {
        UpdateMessage::Leaderboard {
            entries: leaderboard::build(&self.records),
        }
    }

    /// Returns the per-username records
    pub fn records(&self) -> &HashMap<String, ParticipantRecord> {
        &self.records
    }

    /// Returns the current question generation
    pub fn current(&self) -> &CurrentQuestion {
        &self.current
    }

    /// Returns the tallies for the current generation
    pub fn stats(&self) -> &QuestionStats {
        &self.stats
    }

    fn credit(&mut self, username: &str, correct: bool, points: u64, elapsed: Option<Duration>) {
        let record = self.records.entry(username.to_owned()).or_default();
        record.score += points;
        record.answers_count += 1;
        if correct {
            record.correct_count += 1;
        }
        if let Some(elapsed) = elapsed {
            record.total_time_seconds += elapsed.as_secs();
        }
    }

    fn tally(&mut self, username: &str, correct: bool) {
        let (count, usernames) = if correct {
            (&mut self.stats.correct_count, &mut self.stats.correct_usernames)
        } else {
            (
                &mut self.stats.incorrect_count,
                &mut self.stats.incorrect_usernames,
            )
        };

        *count += 1;
        if !usernames.iter().any(|existing| existing == username) {
            usernames.push(username.to_owned());
        }
    }
}
