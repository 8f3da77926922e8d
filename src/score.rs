//! Scoring policy for timed answers and practice rounds
//!
//! Pure functions with no side effects: a correct timed answer earns a
//! base amount plus a speed bonus scaled by the time remaining, and a
//! completed practice round converts its accuracy into points. Invalid
//! inputs are clamped, never rejected.

use std::time::Duration;

use crate::constants::scoring::{BASE_POINTS, MAX_SPEED_BONUS};

/// Computes the points earned by a single timed answer
///
/// Incorrect answers always score 0. Correct answers earn
/// [`BASE_POINTS`]; when the question is timed and the elapsed time is
/// known, a bonus of up to [`MAX_SPEED_BONUS`] is added, scaled linearly
/// by the fraction of the time limit still remaining (floored, in
/// millisecond arithmetic). An untimed question or an unknown elapsed
/// time earns exactly the base amount, so offline entries never receive
/// a speed bonus.
///
/// The result is monotonically non-increasing in elapsed time and, for a
/// correct answer, always within `[BASE_POINTS, BASE_POINTS +
/// MAX_SPEED_BONUS]`.
///
/// # Arguments
///
/// * `is_correct` - Whether the submitted answer matched the expected one
/// * `elapsed` - Time between the question push and the submission, if known
/// * `time_limit` - The question's time limit; zero means untimed
pub fn score_timed_answer(is_correct: bool, elapsed: Option<Duration>, time_limit: Duration) -> u64 {
    if !is_correct {
        return 0;
    }

    let (Some(elapsed), false) = (elapsed, time_limit.is_zero()) else {
        return BASE_POINTS;
    };

    let total_ms = time_limit.as_millis().max(1);
    let left_ms = total_ms.saturating_sub(elapsed.as_millis());
    let bonus = (left_ms * u128::from(MAX_SPEED_BONUS) / total_ms) as u64;

    BASE_POINTS + bonus
}

/// Converts a completed practice round's accuracy into points
///
/// The accuracy is clamped to `[0, 1]` and scaled to 100, rounded to the
/// nearest integer.
pub fn score_practice_round(accuracy: f64) -> u64 {
    (accuracy.clamp(0.0, 1.0) * 100.0).round() as u64
}
