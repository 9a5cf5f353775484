//! Error types for board-engine operations.
//!
//! Only the validation boundary produces errors. Conflict detection and
//! recurrence expansion are total over validated input.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum BoardError {
    #[error("Invalid time of day: {0:?} (expected HH:MM)")]
    InvalidTime(String),

    #[error("Invalid date: {0:?} (expected YYYY-MM-DD)")]
    InvalidDate(String),

    #[error("Block {block_id}: start {start} is not before end {end}")]
    InvalidInterval {
        block_id: String,
        start: String,
        end: String,
    },

    #[error("Duplicate block id: {0}")]
    DuplicateBlockId(String),

    #[error("Board JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, BoardError>;
