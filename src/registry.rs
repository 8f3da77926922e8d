//! Room codes and the registry mapping them to live rooms

use std::{collections::HashMap, fmt::Display, str::FromStr};

use serde_with::{DeserializeFromStr, SerializeDisplay};
use thiserror::Error;

use crate::{constants::room::MAX_CODE_LENGTH, room::RoomState};

/// Errors produced when parsing a room code
#[derive(Debug, Error, PartialEq, Eq)]
pub enum Error {
    /// The code was empty after trimming
    #[error("room code must not be empty")]
    Empty,
    /// The code exceeded the maximum length
    #[error("room code must be at most {MAX_CODE_LENGTH} characters")]
    TooLong,
}

/// A normalized room code
///
/// Codes are trimmed and upper-cased on parse, so `" abc123 "` and
/// `"ABC123"` name the same room.
#[derive(Debug, Clone, PartialEq, Eq, Hash, DeserializeFromStr, SerializeDisplay)]
pub struct RoomCode(String);

impl RoomCode {
    /// Returns the normalized code
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Display for RoomCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        self.0.fmt(f)
    }
}

impl FromStr for RoomCode {
    type Err = Error;

    /// Normalizes and validates a raw room code
    ///
    /// # Errors
    ///
    /// Returns [`Error::Empty`] for a blank code and [`Error::TooLong`]
    /// for one past the length limit.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.trim().to_uppercase();
        if normalized.is_empty() {
            return Err(Error::Empty);
        }
        if normalized.len() > MAX_CODE_LENGTH {
            return Err(Error::TooLong);
        }
        Ok(Self(normalized))
    }
}

/// All live rooms, keyed by their normalized code
///
/// An explicit service object owned by the coordinator. Rooms are
/// created on first touch and never evicted; state is volatile and
/// lives only as long as the registry.
#[derive(Debug, Default)]
pub struct RoomRegistry {
    rooms: HashMap<RoomCode, RoomState>,
}

impl RoomRegistry {
    /// Creates an empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the room for a code, creating it if needed
    pub fn get_or_create(&mut self, code: &RoomCode) -> &mut RoomState {
        self.rooms.entry(code.clone()).or_default()
    }

    /// Looks up a room without creating it
    pub fn get(&self, code: &RoomCode) -> Option<&RoomState> {
        self.rooms.get(code)
    }

    /// Returns the number of live rooms
    pub fn len(&self) -> usize {
        self.rooms.len()
    }

    /// Returns `true` if no rooms exist
    pub fn is_empty(&self) -> bool {
        self.rooms.is_empty()
    }
}
