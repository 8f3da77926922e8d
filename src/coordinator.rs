//! Inbound event validation and dispatch
//!
//! Everything a connected client can ask for enters through
//! [`SessionCoordinator::receive_message`]. Payloads are validated at
//! this boundary; invalid ones are dropped with a debug log and
//! everything else turns into room or bank mutations plus outbound
//! messages through the transport seam.

use std::{collections::HashSet, time::Duration};

use garde::Validate;
use serde::Deserialize;
use web_time::SystemTime;

use crate::{
    bank::{self, QuestionBank, QuestionId, QuestionKind, Store},
    constants::{
        bank::{MAX_ANSWER_LENGTH, MAX_PROMPT_LENGTH},
        room::{DEFAULT_USERNAME, MAX_TIME_LIMIT, MAX_USERNAME_LENGTH, OFFLINE_USERNAME},
    },
    registry::{RoomCode, RoomRegistry},
    room::{self, AnswerOutcome},
    session::{Audience, Tunnel},
    UpdateMessage,
};

/// One answer gathered away from the live flow
#[derive(Debug, Deserialize, Clone, Validate)]
#[serde(rename_all = "camelCase")]
pub struct OfflineResult {
    /// Who answered; empty falls back to the offline name
    #[garde(length(max = MAX_USERNAME_LENGTH))]
    pub username: String,
    /// Whether the presenter judged the answer correct
    #[garde(skip)]
    pub correct: bool,
    /// Whole seconds the answer took, when the presenter recorded it
    #[garde(skip)]
    pub time_taken_seconds: Option<u64>,
}

/// Every event a connected client can send
#[derive(Debug, Deserialize, Clone, Validate)]
#[serde(rename_all_fields = "camelCase")]
pub enum IncomingMessage {
    /// Enter a room and receive its current standings
    Join {
        /// Target room
        #[garde(skip)]
        room: RoomCode,
    },
    /// Push a live question to a room
    SubmitQuestion {
        /// Target room
        #[garde(skip)]
        room: RoomCode,
        /// The question text to broadcast
        #[garde(length(min = 1, max = MAX_PROMPT_LENGTH))]
        question: String,
        /// The expected answer; stays server-side
        #[garde(length(max = MAX_ANSWER_LENGTH))]
        answer: String,
        /// Presentation kind
        #[garde(skip)]
        kind: QuestionKind,
        /// Zero means untimed
        #[garde(range(max = MAX_TIME_LIMIT))]
        time_limit_seconds: u64,
        /// Optional position within a prepared set
        #[garde(skip)]
        #[serde(default)]
        question_number: Option<u32>,
        /// Optional size of the prepared set
        #[garde(skip)]
        #[serde(default)]
        question_total: Option<u32>,
    },
    /// Answer the room's live question
    AnswerQuestion {
        /// Target room
        #[garde(skip)]
        room: RoomCode,
        /// Who is answering; empty falls back to the anonymous name
        #[garde(length(max = MAX_USERNAME_LENGTH))]
        username: String,
        /// The submitted answer
        #[garde(length(max = MAX_ANSWER_LENGTH))]
        answer: String,
    },
    /// Record a batch of answers gathered offline
    SubmitOfflineAnswers {
        /// Target room
        #[garde(skip)]
        room: RoomCode,
        /// Presenter-judged results to fold into the records
        #[garde(dive)]
        results: Vec<OfflineResult>,
    },
    /// Request the next practice question
    PracticeNext {
        /// Target room
        #[garde(skip)]
        room: RoomCode,
        /// Who is practicing
        #[garde(length(max = MAX_USERNAME_LENGTH))]
        username: String,
    },
    /// Answer a practice question
    PracticeAnswer {
        /// Target room
        #[garde(skip)]
        room: RoomCode,
        /// Who is practicing
        #[garde(length(max = MAX_USERNAME_LENGTH))]
        username: String,
        /// The bank entry being answered
        #[garde(skip)]
        question_id: QuestionId,
        /// The submitted answer
        #[garde(length(max = MAX_ANSWER_LENGTH))]
        answer: String,
    },
    /// Request the room's current standings
    GetLeaderboard {
        /// Target room
        #[garde(skip)]
        room: RoomCode,
    },
    /// Add a question to the shared bank
    AddQuestion {
        /// Presentation kind
        #[garde(skip)]
        kind: QuestionKind,
        /// The question text
        #[garde(length(min = 1, max = MAX_PROMPT_LENGTH))]
        prompt: String,
        /// The expected answer
        #[garde(length(max = MAX_ANSWER_LENGTH))]
        answer: String,
    },
    /// Remove one question from the shared bank
    DeleteQuestion {
        /// Entry to remove
        #[garde(skip)]
        id: QuestionId,
    },
    /// Remove several questions from the shared bank
    DeleteQuestions {
        /// Entries to remove
        #[garde(skip)]
        ids: HashSet<QuestionId>,
    },
}

/// The top-level service object driving rooms and the bank
///
/// Owns the registry and the question bank; an embedder owns the
/// coordinator and feeds it one event at a time.
#[derive(Debug)]
pub struct SessionCoordinator<S> {
    registry: RoomRegistry,
    bank: QuestionBank<S>,
}

impl<S: Store> SessionCoordinator<S> {
    /// Creates a coordinator over a freshly opened bank
    pub fn new(store: S) -> Self {
        Self {
            registry: RoomRegistry::new(),
            bank: QuestionBank::open(store),
        }
    }

    /// Returns the room registry
    pub fn registry(&self) -> &RoomRegistry {
        &self.registry
    }

    /// Returns the question bank
    pub fn bank(&self) -> &QuestionBank<S> {
        &self.bank
    }

    /// Validates and dispatches one inbound event
    ///
    /// Replies go to `sender` only; `broadcast` receives every
    /// room-wide or global push. Invalid payloads are dropped with a
    /// debug log, every other failure becomes a reply on the sender's
    /// own channel.
    pub fn receive_message<T: Tunnel, B: Fn(Audience<'_>, &UpdateMessage)>(
        &mut self,
        sender: &T,
        message: IncomingMessage,
        broadcast: B,
    ) {
        if let Err(error) = message.validate() {
            tracing::debug!(%error, "dropping invalid inbound message");
            return;
        }

        match message {
            IncomingMessage::Join { room } => {
                let state = self.registry.get_or_create(&room);
                sender.send_message(&state.leaderboard_message().into());
                sender.send_message(
                    &bank::UpdateMessage::Updated {
                        count: self.bank.len(),
                    }
                    .into(),
                );
            }
            IncomingMessage::SubmitQuestion {
                room,
                question,
                answer,
                kind,
                time_limit_seconds,
                question_number,
                question_total,
            } => {
                self.registry.get_or_create(&room).push_question(
                    answer,
                    kind,
                    Duration::from_secs(time_limit_seconds),
                    question_number,
                    question_total,
                    SystemTime::now(),
                );
                broadcast(
                    Audience::Room(&room),
                    &room::UpdateMessage::Question {
                        question,
                        kind,
                        time_limit_seconds,
                        question_number,
                        question_total,
                    }
                    .into(),
                );
            }
            IncomingMessage::AnswerQuestion {
                room,
                username,
                answer,
            } => {
                let username = normalize_username(&username);
                let state = self.registry.get_or_create(&room);

                match state.submit_answer(&username, &answer, SystemTime::now()) {
                    AnswerOutcome::Blank => {
                        sender.send_reply(
                            &room::ReplyMessage::AnswerResult {
                                correct: false,
                                blank: true,
                                answer: String::new(),
                                username,
                            }
                            .into(),
                        );
                    }
                    AnswerOutcome::Duplicate => {
                        sender.send_reply(
                            &room::ReplyMessage::AlreadyAnswered { username }.into(),
                        );
                    }
                    AnswerOutcome::Scored {
                        correct,
                        expected_answer,
                        ..
                    } => {
                        let stats = state.stats_message();
                        let leaderboard = state.leaderboard_message();
                        broadcast(Audience::Room(&room), &stats.into());
                        sender.send_reply(
                            &room::ReplyMessage::AnswerResult {
                                correct,
                                blank: false,
                                answer: expected_answer,
                                username,
                            }
                            .into(),
                        );
                        broadcast(Audience::Room(&room), &leaderboard.into());
                    }
                }
            }
            IncomingMessage::SubmitOfflineAnswers { room, results } => {
                let state = self.registry.get_or_create(&room);
                for result in results {
                    let username = normalize_name(&result.username, OFFLINE_USERNAME);
                    state.record_offline_answer(
                        &username,
                        result.correct,
                        result.time_taken_seconds.map(Duration::from_secs),
                    );
                }
                broadcast(Audience::Room(&room), &state.stats_message().into());
                broadcast(Audience::Room(&room), &state.leaderboard_message().into());
            }
            IncomingMessage::PracticeNext { room, username } => {
                let username = normalize_username(&username);
                let reply = self
                    .registry
                    .get_or_create(&room)
                    .practice_next(&username, self.bank.entries());
                sender.send_reply(&reply.into());
            }
            IncomingMessage::PracticeAnswer {
                room,
                username,
                question_id,
                answer,
            } => {
                let username = normalize_username(&username);
                let entry = self.bank.get(&question_id);
                let state = self.registry.get_or_create(&room);
                let reply = state.submit_practice_answer(&username, entry, &answer);

                let completed =
                    matches!(reply, crate::practice::ReplyMessage::RoundComplete { .. });
                sender.send_reply(&reply.into());
                if completed {
                    broadcast(Audience::Room(&room), &state.leaderboard_message().into());
                }
            }
            IncomingMessage::GetLeaderboard { room } => {
                let state = self.registry.get_or_create(&room);
                sender.send_message(&state.leaderboard_message().into());
            }
            IncomingMessage::AddQuestion {
                kind,
                prompt,
                answer,
            } => match self.bank.add(kind, &prompt, &answer) {
                Ok(entry) => {
                    sender.send_reply(&bank::ReplyMessage::Added { id: entry.id }.into());
                    self.broadcast_bank_count(&broadcast);
                }
                Err(error) => {
                    tracing::warn!(%error, "failed to add question");
                    sender.send_reply(
                        &bank::ReplyMessage::Failed {
                            reason: error.to_string(),
                        }
                        .into(),
                    );
                }
            },
            IncomingMessage::DeleteQuestion { id } => match self.bank.remove_one(&id) {
                Ok(removed) => {
                    sender.send_reply(&bank::ReplyMessage::Removed { removed }.into());
                    if removed {
                        self.broadcast_bank_count(&broadcast);
                    }
                }
                Err(error) => {
                    tracing::warn!(%error, "failed to remove question");
                    sender.send_reply(
                        &bank::ReplyMessage::Failed {
                            reason: error.to_string(),
                        }
                        .into(),
                    );
                }
            },
            IncomingMessage::DeleteQuestions { ids } => match self.bank.remove_many(&ids) {
                Ok(count) => {
                    sender.send_reply(&bank::ReplyMessage::RemovedMany { count }.into());
                    if count > 0 {
                        self.broadcast_bank_count(&broadcast);
                    }
                }
                Err(error) => {
                    tracing::warn!(%error, "failed to remove questions");
                    sender.send_reply(
                        &bank::ReplyMessage::Failed {
                            reason: error.to_string(),
                        }
                        .into(),
                    );
                }
            },
        }
    }

    fn broadcast_bank_count<B: Fn(Audience<'_>, &UpdateMessage)>(&self, broadcast: &B) {
        broadcast(
            Audience::Everyone,
            &bank::UpdateMessage::Updated {
                count: self.bank.len(),
            }
            .into(),
        );
    }
}

/// Trims the username, falling back to the anonymous name when empty
fn normalize_username(raw: &str) -> String {
    normalize_name(raw, DEFAULT_USERNAME)
}

fn normalize_name(raw: &str, fallback: &str) -> String {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        fallback.to_owned()
    } else {
        trimmed.to_owned()
    }
}

#[cfg(test)]
#[cfg_attr(coverage_nightly, coverage(off))]
mod tests {
    use std::{cell::RefCell, str::FromStr};

    use crate::{
        bank::{Error, QuestionEntry},
        ReplyMessage,
    };

    use super::*;

    /// Store that accepts everything without persisting
    struct NullStore;

    impl Store for NullStore {
        fn load(&self) -> Result<Vec<QuestionEntry>, Error> {
            Ok(Vec::new())
        }

        fn save(&self, _entries: &[QuestionEntry]) -> Result<(), Error> {
            Ok(())
        }
    }

    #[derive(Default)]
    struct MockTunnel {
        messages: RefCell<Vec<String>>,
        replies: RefCell<Vec<String>>,
    }

    impl Tunnel for &MockTunnel {
        fn send_message(&self, message: &UpdateMessage) {
            self.messages.borrow_mut().push(message.to_message());
        }

        fn send_reply(&self, reply: &ReplyMessage) {
            self.replies.borrow_mut().push(reply.to_message());
        }

        fn close(self) {}
    }

    /// Captures broadcasts as (audience, json) pairs
    fn capturing<'a>(
        log: &'a RefCell<Vec<(String, String)>>,
    ) -> impl Fn(Audience<'_>, &UpdateMessage) + 'a {
        move |audience, message| {
            let audience = match audience {
                Audience::Room(code) => code.to_string(),
                Audience::Everyone => "*".to_owned(),
            };
            log.borrow_mut().push((audience, message.to_message()));
        }
    }

    fn room(code: &str) -> RoomCode {
        RoomCode::from_str(code).unwrap()
    }

    #[test]
    fn test_join_sends_leaderboard_and_bank_count() {
        let mut coordinator = SessionCoordinator::new(NullStore);
        let tunnel = MockTunnel::default();
        let log = RefCell::new(Vec::new());

        coordinator.receive_message(
            &&tunnel,
            IncomingMessage::Join { room: room("ABC123") },
            capturing(&log),
        );

        let messages = tunnel.messages.borrow();
        assert_eq!(messages.len(), 2);
        assert!(messages[0].contains("Leaderboard"));
        assert!(messages[1].contains("\"count\":0"));
        assert!(log.borrow().is_empty());
        assert_eq!(coordinator.registry().len(), 1);
    }

    #[test]
    fn test_question_broadcast_omits_the_answer() {
        let mut coordinator = SessionCoordinator::new(NullStore);
        let tunnel = MockTunnel::default();
        let log = RefCell::new(Vec::new());

        coordinator.receive_message(
            &&tunnel,
            IncomingMessage::SubmitQuestion {
                room: room("ABC123"),
                question: "Is water wet?".to_owned(),
                answer: "true".to_owned(),
                kind: QuestionKind::TrueFalse,
                time_limit_seconds: 20,
                question_number: Some(1),
                question_total: Some(5),
            },
            capturing(&log),
        );

        let log = log.borrow();
        assert_eq!(log.len(), 1);
        let (audience, json) = &log[0];
        assert_eq!(audience, "ABC123");
        assert!(json.contains("Is water wet?"));
        assert!(json.contains("\"timeLimitSeconds\":20"));
        assert!(json.contains("\"questionNumber\":1"));
        assert!(!json.contains("true\""));
    }

    #[test]
    fn test_answer_flow_broadcasts_stats_and_leaderboard() {
        let mut coordinator = SessionCoordinator::new(NullStore);
        let tunnel = MockTunnel::default();
        let log = RefCell::new(Vec::new());

        coordinator.receive_message(
            &&tunnel,
            IncomingMessage::SubmitQuestion {
                room: room("ABC123"),
                question: "2 + 2?".to_owned(),
                answer: "4".to_owned(),
                kind: QuestionKind::Short,
                time_limit_seconds: 0,
                question_number: None,
                question_total: None,
            },
            capturing(&log),
        );
        log.borrow_mut().clear();

        coordinator.receive_message(
            &&tunnel,
            IncomingMessage::AnswerQuestion {
                room: room("abc123"),
                username: "alice".to_owned(),
                answer: "4".to_owned(),
            },
            capturing(&log),
        );

        let log = log.borrow();
        assert_eq!(log.len(), 2);
        assert!(log[0].1.contains("AnswerStats"));
        assert!(log[1].1.contains("Leaderboard"));
        assert!(log[1].1.contains("\"score\":100"));

        let replies = tunnel.replies.borrow();
        assert_eq!(replies.len(), 1);
        assert!(replies[0].contains("\"correct\":true"));
        assert!(replies[0].contains("\"answer\":\"4\""));
    }

    #[test]
    fn test_duplicate_answer_gets_reply_without_broadcast() {
        let mut coordinator = SessionCoordinator::new(NullStore);
        let tunnel = MockTunnel::default();
        let log = RefCell::new(Vec::new());

        coordinator.receive_message(
            &&tunnel,
            IncomingMessage::SubmitQuestion {
                room: room("R"),
                question: "q".to_owned(),
                answer: "a".to_owned(),
                kind: QuestionKind::Short,
                time_limit_seconds: 0,
                question_number: None,
                question_total: None,
            },
            capturing(&log),
        );
        for _ in 0..2 {
            coordinator.receive_message(
                &&tunnel,
                IncomingMessage::AnswerQuestion {
                    room: room("R"),
                    username: "alice".to_owned(),
                    answer: "a".to_owned(),
                },
                capturing(&log),
            );
        }

        let replies = tunnel.replies.borrow();
        assert_eq!(replies.len(), 2);
        assert!(replies[1].contains("AlreadyAnswered"));
        // question push, then one stats + one leaderboard
        assert_eq!(log.borrow().len(), 3);
    }

    #[test]
    fn test_empty_username_falls_back_to_anonymous() {
        let mut coordinator = SessionCoordinator::new(NullStore);
        let tunnel = MockTunnel::default();
        let log = RefCell::new(Vec::new());

        coordinator.receive_message(
            &&tunnel,
            IncomingMessage::AnswerQuestion {
                room: room("R"),
                username: "   ".to_owned(),
                answer: "anything".to_owned(),
            },
            capturing(&log),
        );

        assert!(tunnel.replies.borrow()[0].contains(DEFAULT_USERNAME));
    }

    #[test]
    fn test_offline_batch_broadcasts_once() {
        let mut coordinator = SessionCoordinator::new(NullStore);
        let tunnel = MockTunnel::default();
        let log = RefCell::new(Vec::new());

        coordinator.receive_message(
            &&tunnel,
            IncomingMessage::SubmitOfflineAnswers {
                room: room("R"),
                results: vec![
                    OfflineResult {
                        username: "alice".to_owned(),
                        correct: true,
                        time_taken_seconds: Some(3),
                    },
                    OfflineResult {
                        username: "bob".to_owned(),
                        correct: false,
                        time_taken_seconds: None,
                    },
                ],
            },
            capturing(&log),
        );

        let log = log.borrow();
        assert_eq!(log.len(), 2);
        assert!(log[0].1.contains("\"totalAnswers\":2"));
        assert!(log[1].1.contains("Leaderboard"));
        assert!(tunnel.replies.borrow().is_empty());
    }

    #[test]
    fn test_add_question_replies_and_broadcasts_count() {
        let mut coordinator = SessionCoordinator::new(NullStore);
        let tunnel = MockTunnel::default();
        let log = RefCell::new(Vec::new());

        coordinator.receive_message(
            &&tunnel,
            IncomingMessage::AddQuestion {
                kind: QuestionKind::Short,
                prompt: "Capital of France?".to_owned(),
                answer: "Paris".to_owned(),
            },
            capturing(&log),
        );

        assert!(tunnel.replies.borrow()[0].contains("Added"));
        let log = log.borrow();
        assert_eq!(log.len(), 1);
        assert_eq!(log[0].0, "*");
        assert!(log[0].1.contains("\"count\":1"));
    }

    #[test]
    fn test_delete_unknown_question_does_not_broadcast() {
        let mut coordinator = SessionCoordinator::new(NullStore);
        let tunnel = MockTunnel::default();
        let log = RefCell::new(Vec::new());

        coordinator.receive_message(
            &&tunnel,
            IncomingMessage::DeleteQuestion {
                id: QuestionId::new(),
            },
            capturing(&log),
        );

        assert!(tunnel.replies.borrow()[0].contains("\"removed\":false"));
        assert!(log.borrow().is_empty());
    }

    #[test]
    fn test_practice_round_trip_through_coordinator() {
        let mut coordinator = SessionCoordinator::new(NullStore);
        let tunnel = MockTunnel::default();
        let log = RefCell::new(Vec::new());

        coordinator.receive_message(
            &&tunnel,
            IncomingMessage::AddQuestion {
                kind: QuestionKind::Short,
                prompt: "2 + 2?".to_owned(),
                answer: "4".to_owned(),
            },
            capturing(&log),
        );
        let id = coordinator.bank().entries()[0].id.clone();

        coordinator.receive_message(
            &&tunnel,
            IncomingMessage::PracticeNext {
                room: room("R"),
                username: "alice".to_owned(),
            },
            capturing(&log),
        );
        coordinator.receive_message(
            &&tunnel,
            IncomingMessage::PracticeAnswer {
                room: room("R"),
                username: "alice".to_owned(),
                question_id: id,
                answer: "4".to_owned(),
            },
            capturing(&log),
        );

        let replies = tunnel.replies.borrow();
        assert!(replies[1].contains("Question"));
        assert!(replies[2].contains("\"correct\":true"));
        assert!(replies[2].contains("\"answered\":1"));
    }

    #[test]
    fn test_invalid_payload_is_dropped() {
        let mut coordinator = SessionCoordinator::new(NullStore);
        let tunnel = MockTunnel::default();
        let log = RefCell::new(Vec::new());

        coordinator.receive_message(
            &&tunnel,
            IncomingMessage::SubmitQuestion {
                room: room("R"),
                question: String::new(),
                answer: "a".to_owned(),
                kind: QuestionKind::Short,
                time_limit_seconds: 10,
                question_number: None,
                question_total: None,
            },
            capturing(&log),
        );
        coordinator.receive_message(
            &&tunnel,
            IncomingMessage::SubmitQuestion {
                room: room("R"),
                question: "q".to_owned(),
                answer: "a".to_owned(),
                kind: QuestionKind::Short,
                time_limit_seconds: MAX_TIME_LIMIT + 1,
                question_number: None,
                question_total: None,
            },
            capturing(&log),
        );

        assert!(log.borrow().is_empty());
        assert!(tunnel.replies.borrow().is_empty());
    }

    #[test]
    fn test_message_deserializes_with_camel_case_keys() {
        let json = r#"{"AnswerQuestion":{"room":"abc","username":"alice","answer":"4"}}"#;
        let message: IncomingMessage = serde_json::from_str(json).unwrap();

        let IncomingMessage::AnswerQuestion { room, .. } = message else {
            panic!("wrong variant");
        };
        assert_eq!(room.as_str(), "ABC");
    }
}
