//! Leaderboard derivation from participant records

use std::{cmp::Reverse, collections::HashMap};

use itertools::Itertools;
use serde::Serialize;

use crate::room::ParticipantRecord;

/// One ranked row of a room leaderboard
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Entry {
    /// 1-based position after sorting; ties still get distinct ranks
    pub rank: usize,
    /// Participant the row describes
    pub username: String,
    /// Accumulated points
    pub score: u64,
    /// Number of correctly answered questions
    pub correct_count: u64,
    /// Average whole seconds per recorded answer, rounded half-up
    pub avg_time: u64,
}

/// Builds the ranked standings for a room's records
///
/// Rows are ordered by score descending, then correct count descending,
/// then average time ascending. Username breaks any remaining tie so
/// the output is deterministic for a given set of records.
pub fn build(records: &HashMap<String, ParticipantRecord>) -> Vec<Entry> {
    records
        .iter()
        .map(|(username, record)| {
            let avg_time = if record.answers_count == 0 {
                0
            } else {
                let average =
                    record.total_time_seconds as f64 / record.answers_count as f64;
                average.round() as u64
            };
            (username, record, avg_time)
        })
        .sorted_by_key(|(username, record, avg_time)| {
            (
                Reverse(record.score),
                Reverse(record.correct_count),
                *avg_time,
                (*username).clone(),
            )
        })
        .enumerate()
        .map(|(index, (username, record, avg_time))| Entry {
            rank: index + 1,
            username: username.clone(),
            score: record.score,
            correct_count: record.correct_count,
            avg_time,
        })
        .collect()
}
