//! Detect people booked into overlapping blocks on the same date.
//!
//! Blocks are grouped by date; within a date, every block that references a
//! person (in the student or aide role) is compared pairwise against every other
//! block referencing the same person in the same role. Intervals are half-open,
//! so adjacent blocks (one ends exactly when another starts) are NOT conflicts.
//!
//! Roles are independent: a student in block A and an aide in block B only
//! conflict if the same id appears in the same role in both blocks.

use std::collections::{BTreeMap, BTreeSet, HashSet};

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::block::{Person, TimeBlock};

/// The role in which the shared person is attached to both blocks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ConflictKind {
    Student,
    Aide,
}

impl ConflictKind {
    pub const ALL: [ConflictKind; 2] = [ConflictKind::Student, ConflictKind::Aide];

    /// The ids a block lists for this role.
    pub fn ids_of(self, block: &TimeBlock) -> &[String] {
        match self {
            ConflictKind::Student => &block.student_ids,
            ConflictKind::Aide => &block.aide_ids,
        }
    }
}

/// One overlapping pair of blocks for one shared person.
///
/// `block_a` precedes `block_b` in the input list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConflictPair {
    pub kind: ConflictKind,
    pub person_id: String,
    pub date: NaiveDate,
    pub block_a: String,
    pub block_b: String,
    pub overlap_minutes: u32,
}

impl ConflictPair {
    pub fn involves(&self, block_id: &str) -> bool {
        self.block_a == block_id || self.block_b == block_id
    }

    /// The other block of the pair, if `block_id` is one of its two blocks.
    pub fn other(&self, block_id: &str) -> Option<&str> {
        if self.block_a == block_id {
            Some(self.block_b.as_str())
        } else if self.block_b == block_id {
            Some(self.block_a.as_str())
        } else {
            None
        }
    }
}

/// All conflicts of one role for one block.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConflictRecord {
    pub kind: ConflictKind,
    pub conflicting_block_ids: BTreeSet<String>,
    pub conflicting_person_ids: BTreeSet<String>,
}

impl ConflictRecord {
    fn new(kind: ConflictKind) -> Self {
        Self {
            kind,
            conflicting_block_ids: BTreeSet::new(),
            conflicting_person_ids: BTreeSet::new(),
        }
    }
}

/// Conflicts of one block, kept separately per role.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BlockConflicts {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub student: Option<ConflictRecord>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub aide: Option<ConflictRecord>,
}

impl BlockConflicts {
    pub fn get(&self, kind: ConflictKind) -> Option<&ConflictRecord> {
        match kind {
            ConflictKind::Student => self.student.as_ref(),
            ConflictKind::Aide => self.aide.as_ref(),
        }
    }

    fn entry(&mut self, kind: ConflictKind) -> &mut ConflictRecord {
        let slot = match kind {
            ConflictKind::Student => &mut self.student,
            ConflictKind::Aide => &mut self.aide,
        };
        slot.get_or_insert_with(|| ConflictRecord::new(kind))
    }

    /// Records present for this block, student first.
    pub fn records(&self) -> impl Iterator<Item = &ConflictRecord> {
        self.student.iter().chain(self.aide.iter())
    }

    /// Union of conflicting block ids across both roles.
    pub fn conflicting_block_ids(&self) -> BTreeSet<&str> {
        self.records()
            .flat_map(|r| r.conflicting_block_ids.iter().map(String::as_str))
            .collect()
    }

    /// Union of responsible person ids across both roles.
    pub fn conflicting_person_ids(&self) -> BTreeSet<&str> {
        self.records()
            .flat_map(|r| r.conflicting_person_ids.iter().map(String::as_str))
            .collect()
    }
}

/// Block id -> that block's conflicts. Blocks without conflicts are absent.
pub type ConflictMap = BTreeMap<String, BlockConflicts>;

/// Find every overlapping pair of blocks that share a person in the same role.
///
/// Only blocks on the same date are compared, and a block is never compared
/// with itself. People are taken from the rosters; ids that appear on blocks
/// but not in the matching roster are not checked. Pairs come out ordered by
/// date, then role (students first), then roster order, then list order.
///
/// Block ids are assumed unique and intervals well formed (see
/// [`crate::block::validate_blocks`]). An empty or inverted interval never
/// overlaps anything.
pub fn conflict_pairs(
    blocks: &[TimeBlock],
    students: &[Person],
    aides: &[Person],
) -> Vec<ConflictPair> {
    let mut by_date: BTreeMap<NaiveDate, Vec<&TimeBlock>> = BTreeMap::new();
    for block in blocks {
        by_date.entry(block.date).or_default().push(block);
    }

    let mut pairs = Vec::new();
    for (date, day) in &by_date {
        for (kind, roster) in [(ConflictKind::Student, students), (ConflictKind::Aide, aides)] {
            let mut checked: HashSet<&str> = HashSet::with_capacity(roster.len());
            for person in roster {
                if !checked.insert(person.id.as_str()) {
                    continue;
                }
                let booked: Vec<&TimeBlock> = day
                    .iter()
                    .copied()
                    .filter(|b| kind.ids_of(b).contains(&person.id))
                    .collect();
                push_overlaps(&mut pairs, kind, &person.id, *date, &booked);
            }
        }
    }

    pairs
}

fn push_overlaps(
    pairs: &mut Vec<ConflictPair>,
    kind: ConflictKind,
    person_id: &str,
    date: NaiveDate,
    booked: &[&TimeBlock],
) {
    for (i, a) in booked.iter().enumerate() {
        for b in &booked[i + 1..] {
            let (ia, ib) = (a.interval(), b.interval());
            if ia.overlaps(&ib) {
                pairs.push(ConflictPair {
                    kind,
                    person_id: person_id.to_string(),
                    date,
                    block_a: a.id.clone(),
                    block_b: b.id.clone(),
                    overlap_minutes: ia.overlap_minutes(&ib),
                });
            }
        }
    }
}

/// Compute the conflict map for a set of blocks.
///
/// Every overlapping pair is recorded on both blocks, tagged with the role it
/// was found in. A block accumulates block ids and person ids from every pair
/// it takes part in; nothing is overwritten. Returns an empty map when there
/// are no blocks or no overlaps.
pub fn detect_conflicts(
    blocks: &[TimeBlock],
    students: &[Person],
    aides: &[Person],
) -> ConflictMap {
    let pairs = conflict_pairs(blocks, students, aides);

    let mut map = ConflictMap::new();
    for pair in &pairs {
        for (this, other) in [(&pair.block_a, &pair.block_b), (&pair.block_b, &pair.block_a)] {
            let record = map.entry(this.clone()).or_default().entry(pair.kind);
            record.conflicting_block_ids.insert(other.clone());
            record.conflicting_person_ids.insert(pair.person_id.clone());
        }
    }

    debug!(
        blocks = blocks.len(),
        pairs = pairs.len(),
        conflicted_blocks = map.len(),
        "conflict detection complete"
    );
    map
}

/// Conflicts a new or edited block would introduce on its date.
///
/// An existing block with the candidate's id is treated as the candidate's
/// previous version and left out. Only pairs involving the candidate are returned.
pub fn check_candidate(
    candidate: &TimeBlock,
    existing: &[TimeBlock],
    students: &[Person],
    aides: &[Person],
) -> Vec<ConflictPair> {
    let mut day: Vec<TimeBlock> = existing
        .iter()
        .filter(|b| b.date == candidate.date && b.id != candidate.id)
        .cloned()
        .collect();
    day.push(candidate.clone());

    conflict_pairs(&day, students, aides)
        .into_iter()
        .filter(|p| p.involves(&candidate.id))
        .collect()
}
