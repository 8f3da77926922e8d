//! Configuration constants for the quiz room system
//!
//! This module contains the scoring parameters and the limits enforced
//! at the protocol boundary, keeping all tunable numbers in one place.

/// Scoring parameters for timed questions and practice rounds
pub mod scoring {
    /// Points awarded for any correct answer before the speed bonus
    pub const BASE_POINTS: u64 = 100;
    /// Maximum speed bonus, scaled linearly by remaining time
    pub const MAX_SPEED_BONUS: u64 = 50;
}

/// Practice mode configuration
pub mod practice {
    /// Number of answered questions that make up one practice round
    pub const ROUND_SIZE: usize = 10;
}

/// Room and participant limits
pub mod room {
    /// Maximum length of a room code in characters
    pub const MAX_CODE_LENGTH: usize = 32;
    /// Maximum length of a participant username in characters
    pub const MAX_USERNAME_LENGTH: usize = 50;
    /// Maximum time limit in seconds for a pushed question (0 means untimed)
    pub const MAX_TIME_LIMIT: u64 = 600;
    /// Username recorded when a submission carries an empty one
    pub const DEFAULT_USERNAME: &str = "Anonymous";
    /// Username recorded for offline batch rows missing one
    pub const OFFLINE_USERNAME: &str = "Offline";
}

/// Question bank limits
pub mod bank {
    /// Maximum length of a question prompt in characters
    pub const MAX_PROMPT_LENGTH: usize = 500;
    /// Maximum length of an answer in characters
    pub const MAX_ANSWER_LENGTH: usize = 200;
}
