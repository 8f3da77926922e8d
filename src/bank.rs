//! Reusable question bank and its persistence seam
//!
//! This module manages the shared collection of question entries used by
//! practice mode and administrative tooling. The collection lives in
//! memory in insertion order; every mutation is written through the
//! external [`Store`] before it is considered committed, and a store
//! that cannot be read degrades to an empty bank rather than failing.

use std::{
    collections::HashSet,
    fmt::Display,
    str::FromStr,
};

use serde::{Deserialize, Serialize};
use serde_with::{DeserializeFromStr, SerializeDisplay};
use thiserror::Error;
use uuid::Uuid;

/// A unique identifier for a question entry
///
/// Ids are generated at creation time and are globally unique; beyond
/// that they are opaque strings to every other component.
#[derive(
    Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, DeserializeFromStr, SerializeDisplay,
)]
pub struct QuestionId(Uuid);

impl QuestionId {
    /// Creates a new random question id
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for QuestionId {
    /// Creates a new random question id (same as `new()`)
    fn default() -> Self {
        Self::new()
    }
}

impl Display for QuestionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        self.0.fmt(f)
    }
}

impl FromStr for QuestionId {
    type Err = uuid::Error;

    /// Parses a question id from its string form
    ///
    /// # Errors
    ///
    /// Returns a `uuid::Error` if the string is not a valid id.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self(Uuid::from_str(s)?))
    }
}

/// The kind of a question entry
///
/// Determines how clients render the answer input; the server treats
/// both kinds as free-text comparisons.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum QuestionKind {
    /// A short free-text question
    Short,
    /// A true/false question
    TrueFalse,
}

/// A single reusable question owned by the bank
///
/// Entries are immutable once created; there is no edit operation, only
/// add and remove.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QuestionEntry {
    /// Globally unique identifier, generated at creation time
    pub id: QuestionId,
    /// How clients should present the question
    pub kind: QuestionKind,
    /// The question text shown to participants
    pub prompt: String,
    /// The expected answer (never sent to participants before they answer)
    pub answer: String,
}

/// Errors produced by question bank operations
#[derive(Debug, Error)]
pub enum Error {
    /// An add was attempted with an empty prompt
    #[error("question prompt must not be empty")]
    EmptyPrompt,
    /// The external store failed to read or write the collection
    #[error("question bank store failed: {reason}")]
    Store {
        /// Description of the underlying store failure
        reason: String,
    },
}

/// External persistence for the question collection
///
/// The store is a bounded, retryable external call. It is never invoked
/// while any room state is borrowed, so a slow store cannot stall a
/// room's answer flow.
pub trait Store {
    /// Loads the full collection in insertion order
    ///
    /// # Errors
    ///
    /// Returns [`Error::Store`] when the underlying storage is
    /// unreadable or corrupt.
    fn load(&self) -> Result<Vec<QuestionEntry>, Error>;

    /// Replaces the persisted collection with the given entries
    ///
    /// # Errors
    ///
    /// Returns [`Error::Store`] when the write fails; the caller treats
    /// the mutation as uncommitted in that case.
    fn save(&self, entries: &[QuestionEntry]) -> Result<(), Error>;
}

/// Broadcast messages about the question bank
#[derive(Debug, Serialize, Clone, PartialEq)]
#[serde(rename_all_fields = "camelCase")]
pub enum UpdateMessage {
    /// The bank changed; carries the new entry count
    Updated {
        /// Number of entries now in the bank
        count: usize,
    },
}

/// Replies to the administrative action that mutated the bank
#[derive(Debug, Serialize, Clone, PartialEq)]
#[serde(rename_all_fields = "camelCase")]
pub enum ReplyMessage {
    /// A question was added
    Added {
        /// Id of the newly created entry
        id: QuestionId,
    },
    /// A single removal completed
    Removed {
        /// Whether an entry with the requested id existed
        removed: bool,
    },
    /// A batch removal completed
    RemovedMany {
        /// Number of entries removed
        count: usize,
    },
    /// The mutation could not be committed
    Failed {
        /// Human-readable failure description
        reason: String,
    },
}

/// The mutable collection of reusable question entries
///
/// Keeps entries in insertion order and writes the full collection
/// through the store on every mutation. A failed write rolls the
/// in-memory change back and surfaces the error, so the bank never
/// silently diverges from the store.
#[derive(Debug)]
pub struct QuestionBank<S> {
    /// Entries in insertion order
    entries: Vec<QuestionEntry>,
    /// External persistence
    store: S,
}

impl<S: Store> QuestionBank<S> {
    /// Opens the bank, loading any persisted entries
    ///
    /// A store that cannot be read is treated as an empty bank with a
    /// warning; reads never crash the process.
    pub fn open(store: S) -> Self {
        let entries = match store.load() {
            Ok(entries) => entries,
            Err(error) => {
                tracing::warn!(%error, "question bank store unreadable, starting empty");
                Vec::new()
            }
        };

        Self { entries, store }
    }

    /// Adds a new question, generating its id
    ///
    /// The prompt is trimmed and must be non-empty. The collection is
    /// persisted before the entry is committed; on a store failure the
    /// entry is removed again and the error returned.
    ///
    /// # Errors
    ///
    /// Returns [`Error::EmptyPrompt`] for a blank prompt, or
    /// [`Error::Store`] when the write fails.
    pub fn add(
        &mut self,
        kind: QuestionKind,
        prompt: &str,
        answer: &str,
    ) -> Result<QuestionEntry, Error> {
        let prompt = prompt.trim();
        if prompt.is_empty() {
            return Err(Error::EmptyPrompt);
        }

        let entry = QuestionEntry {
            id: QuestionId::new(),
            kind,
            prompt: prompt.to_owned(),
            answer: answer.to_owned(),
        };

        self.entries.push(entry.clone());

        if let Err(error) = self.store.save(&self.entries) {
            self.entries.pop();
            return Err(error);
        }

        Ok(entry)
    }

    /// Removes a single entry by id
    ///
    /// # Errors
    ///
    /// Returns [`Error::Store`] when the write fails; the entry is
    /// restored in that case.
    pub fn remove_one(&mut self, id: &QuestionId) -> Result<bool, Error> {
        let Some(position) = self.entries.iter().position(|entry| &entry.id == id) else {
            return Ok(false);
        };

        let removed = self.entries.remove(position);

        if let Err(error) = self.store.save(&self.entries) {
            self.entries.insert(position, removed);
            return Err(error);
        }

        Ok(true)
    }

    /// Removes every entry whose id is in the given set
    ///
    /// Returns the number of entries removed; an empty intersection is
    /// not an error and does not touch the store.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Store`] when the write fails; the collection is
    /// restored in that case.
    pub fn remove_many(&mut self, ids: &HashSet<QuestionId>) -> Result<usize, Error> {
        let kept: Vec<QuestionEntry> = self
            .entries
            .iter()
            .filter(|entry| !ids.contains(&entry.id))
            .cloned()
            .collect();

        let removed_count = self.entries.len() - kept.len();
        if removed_count == 0 {
            return Ok(0);
        }

        let previous = std::mem::replace(&mut self.entries, kept);

        if let Err(error) = self.store.save(&self.entries) {
            self.entries = previous;
            return Err(error);
        }

        Ok(removed_count)
    }

    /// Returns all entries in insertion order
    pub fn entries(&self) -> &[QuestionEntry] {
        &self.entries
    }

    /// Looks up an entry by id
    pub fn get(&self, id: &QuestionId) -> Option<&QuestionEntry> {
        self.entries.iter().find(|entry| &entry.id == id)
    }

    /// Returns the number of entries in the bank
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns `true` if the bank holds no entries
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
