//! Recurrence rules -- expand a base date and a rule into concrete calendar dates.
//!
//! Rules are stored at rest as a loose JSON object (`type`, `interval`,
//! `daysOfWeek`, `endDate`, `maxOccurrences`). [`RecurrenceRule::parse`] turns
//! that text into a typed rule once, at the boundary, and never fails: anything
//! it cannot read becomes [`RecurrenceRule::None`].
//!
//! Expansion is eager and bounded. [`expand`] never returns more than
//! `max_dates` entries, whatever the rule says.

use std::fmt;
use std::num::NonZeroU32;

use chrono::{Days, NaiveDate};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::time::weekday_index;

/// Safety cap on the number of dates a single expansion may produce.
pub const DEFAULT_MAX_DATES: usize = 365;

/// Bound used by [`matches`]; large enough to cover decades of daily occurrences.
pub const MATCH_HORIZON: usize = 36_600;

const WEEKDAY_LABELS: [&str; 7] = ["Sun", "Mon", "Tue", "Wed", "Thu", "Fri", "Sat"];

/// Optional limits shared by every repeating rule.
///
/// When both are set, expansion stops at whichever is reached first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Bounds {
    /// Inclusive last date.
    pub end_date: Option<NaiveDate>,
    /// Cap on the number of occurrences, counting the base date.
    pub max_occurrences: Option<NonZeroU32>,
}

impl Bounds {
    pub fn until(end_date: NaiveDate) -> Self {
        Self {
            end_date: Some(end_date),
            max_occurrences: None,
        }
    }

    pub fn count(max_occurrences: NonZeroU32) -> Self {
        Self {
            end_date: None,
            max_occurrences: Some(max_occurrences),
        }
    }
}

/// Set of weekdays, indexed 0 = Sunday through 6 = Saturday.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Hash)]
pub struct Weekdays(u8);

impl Weekdays {
    pub const EMPTY: Weekdays = Weekdays(0);

    /// Build a set from weekday indices. Indices outside `0..=6` are ignored.
    pub fn from_indices<I: IntoIterator<Item = u8>>(indices: I) -> Self {
        let mut set = Self::EMPTY;
        for index in indices {
            set.insert(index);
        }
        set
    }

    /// Add a weekday index. Returns false (and leaves the set alone) if out of range.
    pub fn insert(&mut self, index: u8) -> bool {
        if index > 6 {
            return false;
        }
        self.0 |= 1 << index;
        true
    }

    pub fn contains(&self, index: u8) -> bool {
        index <= 6 && self.0 & (1 << index) != 0
    }

    pub fn is_empty(&self) -> bool {
        self.0 == 0
    }

    /// Indices in ascending order (Sunday first).
    pub fn indices(&self) -> impl Iterator<Item = u8> + '_ {
        (0u8..7).filter(move |i| self.contains(*i))
    }
}

/// How a block repeats.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RecurrenceRule {
    /// Occurs only on the base date.
    #[default]
    None,
    /// Every `interval` days.
    Daily { interval: NonZeroU32, bounds: Bounds },
    /// Every `interval` weeks, on the base date's weekday.
    Weekly { interval: NonZeroU32, bounds: Bounds },
    /// Every listed weekday. An empty set repeats weekly.
    Custom { days: Weekdays, bounds: Bounds },
}

impl RecurrenceRule {
    pub fn daily(interval: NonZeroU32) -> Self {
        Self::Daily {
            interval,
            bounds: Bounds::default(),
        }
    }

    pub fn weekly(interval: NonZeroU32) -> Self {
        Self::Weekly {
            interval,
            bounds: Bounds::default(),
        }
    }

    pub fn custom(days: Weekdays) -> Self {
        Self::Custom {
            days,
            bounds: Bounds::default(),
        }
    }

    /// Replace the bounds of a repeating rule. `None` has no bounds and is returned as is.
    pub fn with_bounds(self, new_bounds: Bounds) -> Self {
        match self {
            Self::None => Self::None,
            Self::Daily { interval, .. } => Self::Daily {
                interval,
                bounds: new_bounds,
            },
            Self::Weekly { interval, .. } => Self::Weekly {
                interval,
                bounds: new_bounds,
            },
            Self::Custom { days, .. } => Self::Custom {
                days,
                bounds: new_bounds,
            },
        }
    }

    pub fn bounds(&self) -> Bounds {
        match self {
            Self::None => Bounds::default(),
            Self::Daily { bounds, .. }
            | Self::Weekly { bounds, .. }
            | Self::Custom { bounds, .. } => *bounds,
        }
    }

    pub fn is_repeating(&self) -> bool {
        !matches!(self, Self::None)
    }

    /// Read a stored rule. Never fails.
    ///
    /// Malformed JSON, a missing or unknown `type`, and the legacy plain-text
    /// value `none` all yield [`RecurrenceRule::None`]. Intervals and
    /// occurrence caps below 1 fall back to their defaults; weekday indices
    /// outside `0..=6` are dropped.
    pub fn parse(text: &str) -> Self {
        let trimmed = text.trim();
        if trimmed.is_empty() || trimmed.eq_ignore_ascii_case("none") {
            return Self::None;
        }

        match serde_json::from_str::<StoredRule>(trimmed) {
            Ok(stored) => stored.into_rule(),
            Err(e) => {
                debug!(error = %e, "unreadable recurrence rule, treating as none");
                Self::None
            }
        }
    }

    /// The stored JSON form. `parse(&rule.to_json()) == rule` for every rule.
    pub fn to_json(&self) -> String {
        // StoredRule holds only strings, integers and arrays; serialization cannot fail.
        serde_json::to_string(&StoredRule::from_rule(self))
            .unwrap_or_else(|_| r#"{"type":"none"}"#.to_string())
    }

    /// Human-readable label, e.g. `Every 2 weeks` or `Custom: Mon, Wed, Fri`.
    pub fn display_text(&self) -> String {
        self.to_string()
    }
}

impl fmt::Display for RecurrenceRule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::None => return f.write_str("Does not repeat"),
            Self::Daily { interval, .. } => match interval.get() {
                1 => f.write_str("Daily")?,
                n => write!(f, "Every {n} days")?,
            },
            Self::Weekly { interval, .. } => match interval.get() {
                1 => f.write_str("Weekly")?,
                n => write!(f, "Every {n} weeks")?,
            },
            // Mirrors the expansion fallback for an empty set.
            Self::Custom { days, .. } if days.is_empty() => f.write_str("Weekly")?,
            Self::Custom { days, .. } => {
                let labels: Vec<&str> = days
                    .indices()
                    .map(|i| WEEKDAY_LABELS[usize::from(i)])
                    .collect();
                write!(f, "Custom: {}", labels.join(", "))?;
            }
        }

        let bounds = self.bounds();
        if let Some(end) = bounds.end_date {
            write!(f, ", until {}", end.format("%Y-%m-%d"))?;
        }
        if let Some(n) = bounds.max_occurrences {
            match n.get() {
                1 => f.write_str(", 1 time")?,
                n => write!(f, ", {n} times")?,
            }
        }
        Ok(())
    }
}

/// Human-readable label for a rule. See [`RecurrenceRule::display_text`].
pub fn display_text(rule: &RecurrenceRule) -> String {
    rule.display_text()
}

// ---------------------------------------------------------------------------
// Stored (loose) form
// ---------------------------------------------------------------------------

#[derive(Debug, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct StoredRule {
    #[serde(rename = "type", default)]
    kind: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    interval: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    days_of_week: Option<Vec<i64>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    end_date: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    max_occurrences: Option<i64>,
}

impl StoredRule {
    fn from_rule(rule: &RecurrenceRule) -> Self {
        let bounds = rule.bounds();
        let mut stored = StoredRule {
            end_date: bounds.end_date.map(|d| d.format("%Y-%m-%d").to_string()),
            max_occurrences: bounds.max_occurrences.map(|n| i64::from(n.get())),
            ..Default::default()
        };
        match rule {
            RecurrenceRule::None => stored.kind = Some("none".into()),
            RecurrenceRule::Daily { interval, .. } => {
                stored.kind = Some("daily".into());
                stored.interval = Some(i64::from(interval.get()));
            }
            RecurrenceRule::Weekly { interval, .. } => {
                stored.kind = Some("weekly".into());
                stored.interval = Some(i64::from(interval.get()));
            }
            RecurrenceRule::Custom { days, .. } => {
                stored.kind = Some("custom".into());
                stored.days_of_week = Some(days.indices().map(i64::from).collect());
            }
        }
        stored
    }

    fn into_rule(self) -> RecurrenceRule {
        let bounds = Bounds {
            end_date: self.end_date.as_deref().and_then(|s| {
                let parsed = NaiveDate::parse_from_str(s, "%Y-%m-%d").ok();
                if parsed.is_none() {
                    warn!(end_date = s, "ignoring unreadable recurrence end date");
                }
                parsed
            }),
            max_occurrences: self.max_occurrences.and_then(positive),
        };
        let interval = self
            .interval
            .and_then(positive)
            .unwrap_or(NonZeroU32::MIN);

        match self.kind.as_deref() {
            Some("daily") => RecurrenceRule::Daily { interval, bounds },
            Some("weekly") => RecurrenceRule::Weekly { interval, bounds },
            Some("custom") => {
                let raw = self.days_of_week.unwrap_or_default();
                let mut days = Weekdays::EMPTY;
                let dropped: Vec<i64> = raw
                    .iter()
                    .copied()
                    .filter(|i| !u8::try_from(*i).is_ok_and(|i| days.insert(i)))
                    .collect();
                if !dropped.is_empty() {
                    warn!(?dropped, "dropping out-of-range weekday indices");
                }
                RecurrenceRule::Custom { days, bounds }
            }
            Some("none") | None => RecurrenceRule::None,
            Some(other) => {
                debug!(rule_type = other, "unknown recurrence type, treating as none");
                RecurrenceRule::None
            }
        }
    }
}

fn positive(n: i64) -> Option<NonZeroU32> {
    u32::try_from(n).ok().and_then(NonZeroU32::new)
}

// ---------------------------------------------------------------------------
// Expansion
// ---------------------------------------------------------------------------

/// Lazily walks the occurrences of a rule, honouring its own bounds.
///
/// The safety cap is applied by the callers, so this iterator may be long.
struct Occurrences {
    rule: RecurrenceRule,
    current: Option<NaiveDate>,
    emitted: u32,
    started: bool,
}

impl Occurrences {
    fn new(base: NaiveDate, rule: RecurrenceRule) -> Self {
        Self {
            rule,
            current: Some(base),
            emitted: 0,
            started: false,
        }
    }

    fn next_candidate(&self, current: NaiveDate) -> Option<NaiveDate> {
        match self.rule {
            RecurrenceRule::None => None,
            RecurrenceRule::Daily { interval, .. } => {
                current.checked_add_days(Days::new(u64::from(interval.get())))
            }
            RecurrenceRule::Weekly { interval, .. } => {
                current.checked_add_days(Days::new(7 * u64::from(interval.get())))
            }
            RecurrenceRule::Custom { days, .. } if days.is_empty() => {
                current.checked_add_days(Days::new(7))
            }
            RecurrenceRule::Custom { days, .. } => (1..=7u64)
                .filter_map(|offset| current.checked_add_days(Days::new(offset)))
                .find(|d| days.contains(weekday_index(*d))),
        }
    }
}

impl Iterator for Occurrences {
    type Item = NaiveDate;

    fn next(&mut self) -> Option<NaiveDate> {
        let current = self.current?;

        if !self.started {
            // The base date is always occurrence #1.
            self.started = true;
            self.emitted = 1;
            return Some(current);
        }

        let bounds = self.rule.bounds();
        let candidate = self.next_candidate(current).filter(|next| {
            let past_end = bounds.end_date.is_some_and(|end| *next > end);
            let over_count = bounds
                .max_occurrences
                .is_some_and(|max| self.emitted >= max.get());
            !past_end && !over_count
        });

        self.current = candidate;
        if candidate.is_some() {
            self.emitted += 1;
        }
        candidate
    }
}

/// Expand a rule into its ascending list of dates, starting with `base`.
///
/// Stops at the rule's `end_date` (inclusive), at its `max_occurrences`, or
/// when `max_dates` dates have been produced, whichever comes first. The base
/// date is always the first entry unless `max_dates` is 0.
pub fn expand(base: NaiveDate, rule: &RecurrenceRule, max_dates: usize) -> Vec<NaiveDate> {
    let mut dates: Vec<NaiveDate> = Occurrences::new(base, *rule)
        .take(max_dates.saturating_add(1))
        .collect();

    if dates.len() > max_dates {
        debug!(%base, rule = %rule, max_dates, "recurrence expansion truncated by safety cap");
        dates.truncate(max_dates);
    }
    dates
}

/// Expand with the [`DEFAULT_MAX_DATES`] safety cap.
pub fn expand_default(base: NaiveDate, rule: &RecurrenceRule) -> Vec<NaiveDate> {
    expand(base, rule, DEFAULT_MAX_DATES)
}

/// Does `rule`, anchored at `base`, produce `date`?
///
/// Equivalent to `expand(base, rule, MATCH_HORIZON).contains(&date)`, but
/// stops walking as soon as the occurrences pass `date`.
pub fn matches(date: NaiveDate, base: NaiveDate, rule: &RecurrenceRule) -> bool {
    if date < base {
        return false;
    }
    Occurrences::new(base, *rule)
        .take(MATCH_HORIZON)
        .take_while(|d| *d <= date)
        .any(|d| d == date)
}
