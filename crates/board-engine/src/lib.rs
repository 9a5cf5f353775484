//! # board-engine
//!
//! Conflict detection and recurrence expansion for a scheduling board that
//! places students and aides into time blocks across days.
//!
//! Both algorithms are pure functions over borrowed input and may be called
//! concurrently without coordination.
//!
//! ## Modules
//!
//! - [`conflict`] -- Blocks + roster → per-block conflict map (and raw overlapping pairs)
//! - [`recurrence`] -- Base date + rule → bounded, ascending list of dates
//! - [`block`] -- `TimeBlock`, `Person`, `Board` snapshot, validation, materialization
//! - [`time`] -- `HH:MM` times and half-open intervals
//! - [`error`] -- Error types

pub mod block;
pub mod conflict;
pub mod error;
pub mod recurrence;
pub mod time;

pub use block::{materialize, validate_blocks, Board, Person, TimeBlock};
pub use conflict::{
    check_candidate, conflict_pairs, detect_conflicts, BlockConflicts, ConflictKind, ConflictMap,
    ConflictPair, ConflictRecord,
};
pub use error::BoardError;
pub use recurrence::{
    display_text, expand, expand_default, matches, Bounds, RecurrenceRule, Weekdays,
    DEFAULT_MAX_DATES,
};
pub use time::{parse_date, Interval, TimeOfDay};
