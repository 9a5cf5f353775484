//! Schedule blocks, people, and the board snapshot handed to the detector.
//!
//! This module is the validation boundary: times and dates are parsed when a
//! block is deserialized, and [`Board::validate`] rejects inverted intervals
//! and duplicate ids before anything reaches [`crate::conflict`].

use std::collections::HashSet;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::conflict::{self, ConflictMap};
use crate::error::{BoardError, Result};
use crate::recurrence::{self, RecurrenceRule};
use crate::time::{Interval, TimeOfDay};

/// A single scheduled interval on one date.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TimeBlock {
    pub id: String,
    pub date: NaiveDate,
    pub start_time: TimeOfDay,
    pub end_time: TimeOfDay,
    #[serde(default)]
    pub student_ids: Vec<String>,
    #[serde(default)]
    pub aide_ids: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub activity_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
}

impl TimeBlock {
    pub fn new(
        id: impl Into<String>,
        date: NaiveDate,
        start_time: TimeOfDay,
        end_time: TimeOfDay,
    ) -> Self {
        Self {
            id: id.into(),
            date,
            start_time,
            end_time,
            student_ids: Vec::new(),
            aide_ids: Vec::new(),
            activity_id: None,
            notes: None,
        }
    }

    pub fn with_students<I, S>(mut self, ids: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.student_ids = ids.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_aides<I, S>(mut self, ids: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.aide_ids = ids.into_iter().map(Into::into).collect();
        self
    }

    pub fn interval(&self) -> Interval {
        Interval::new(self.start_time, self.end_time)
    }

    /// Reject a block whose start is not strictly before its end.
    pub fn validate(&self) -> Result<()> {
        if self.interval().is_empty() {
            return Err(BoardError::InvalidInterval {
                block_id: self.id.clone(),
                start: self.start_time.to_string(),
                end: self.end_time.to_string(),
            });
        }
        Ok(())
    }
}

/// A student or aide. Only the id matters for scheduling.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Person {
    pub id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
}

impl Person {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: None,
        }
    }
}

/// Everything the detector needs: the blocks of one or more days plus the roster.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Board {
    #[serde(default)]
    pub blocks: Vec<TimeBlock>,
    #[serde(default)]
    pub students: Vec<Person>,
    #[serde(default)]
    pub aides: Vec<Person>,
}

impl Board {
    /// Parse and validate a board snapshot.
    pub fn from_json(json: &str) -> Result<Self> {
        let board: Board = serde_json::from_str(json)?;
        board.validate()?;
        Ok(board)
    }

    /// Every block has `start < end` and block ids are unique.
    pub fn validate(&self) -> Result<()> {
        validate_blocks(&self.blocks)
    }

    pub fn detect_conflicts(&self) -> ConflictMap {
        conflict::detect_conflicts(&self.blocks, &self.students, &self.aides)
    }

    /// Blocks on `date`, in board order.
    pub fn blocks_on(&self, date: NaiveDate) -> impl Iterator<Item = &TimeBlock> {
        self.blocks.iter().filter(move |b| b.date == date)
    }
}

/// Validate a list of blocks: well-formed intervals and unique ids.
pub fn validate_blocks(blocks: &[TimeBlock]) -> Result<()> {
    let mut seen = HashSet::with_capacity(blocks.len());
    for block in blocks {
        block.validate()?;
        if !seen.insert(block.id.as_str()) {
            return Err(BoardError::DuplicateBlockId(block.id.clone()));
        }
    }
    Ok(())
}

/// Materialize one block per date produced by `rule`, starting at the template's date.
///
/// Every copy shares the template's people, times, activity and notes. Ids are
/// `<template id>-<YYYYMMDD>`, distinct because expanded dates are distinct.
/// A non-repeating rule yields a single copy that keeps the template id.
pub fn materialize(
    template: &TimeBlock,
    rule: &RecurrenceRule,
    max_dates: usize,
) -> Vec<TimeBlock> {
    let dates = recurrence::expand(template.date, rule, max_dates);
    if !rule.is_repeating() {
        return dates.into_iter().map(|_| template.clone()).collect();
    }

    dates
        .into_iter()
        .map(|date| TimeBlock {
            id: format!("{}-{}", template.id, date.format("%Y%m%d")),
            date,
            ..template.clone()
        })
        .collect()
}
