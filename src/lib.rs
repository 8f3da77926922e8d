//! # Quizroom
//!
//! Room-scoped live quiz sessions with cumulative scoring, leaderboards,
//! a persisted question bank and per-user practice rounds. The crate is
//! a synchronous state machine: an embedding server feeds inbound
//! events to the [`coordinator::SessionCoordinator`] and carries the
//! resulting messages over whatever transport it owns.

#![cfg_attr(all(coverage_nightly, test), feature(coverage_attribute))]
#![deny(missing_docs)]
#![deny(rustdoc::missing_crate_level_docs)]
#![warn(clippy::pedantic)]
#![allow(clippy::must_use_candidate)]
#![allow(clippy::cast_sign_loss)]
#![allow(clippy::cast_possible_truncation)]
#![allow(clippy::cast_precision_loss)]
#![allow(clippy::missing_errors_doc)]
use serde::Serialize;

pub mod bank;
pub mod constants;
pub mod coordinator;
pub mod leaderboard;
pub mod practice;
pub mod registry;
pub mod room;
pub mod score;
pub mod session;

/// Messages pushed to a room or to every connected client
///
/// The coordinator emits these through the broadcast closure; the
/// sending participant may additionally receive them on their own
/// tunnel, for example the leaderboard on join.
#[derive(Debug, Serialize, Clone, derive_more::From)]
pub enum UpdateMessage {
    /// Room session pushes: questions, stats, leaderboards
    Room(room::UpdateMessage),
    /// Question bank changes
    Bank(bank::UpdateMessage),
}

impl UpdateMessage {
    /// Converts the update message to a JSON string for transmission
    ///
    /// # Panics
    ///
    /// This method panics if serialization fails, which should never happen
    /// with the default JSON serializer for well-formed data.
    pub fn to_message(&self) -> String {
        serde_json::to_string(self).expect("default serializer cannot fail")
    }
}

/// Messages addressed only to the participant who sent an event
#[derive(Debug, Serialize, Clone, derive_more::From)]
pub enum ReplyMessage {
    /// Replies to live answer submissions
    Room(room::ReplyMessage),
    /// Replies within a practice round
    Practice(practice::ReplyMessage),
    /// Replies to question bank mutations
    Bank(bank::ReplyMessage),
}

impl ReplyMessage {
    /// Converts the reply message to a JSON string for transmission
    ///
    /// # Panics
    ///
    /// This method panics if serialization fails, which should never happen
    /// with the default JSON serializer for well-formed data.
    pub fn to_message(&self) -> String {
        serde_json::to_string(self).expect("default serializer cannot fail")
    }
}
