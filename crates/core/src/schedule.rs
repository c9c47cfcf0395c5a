//! # Operating hours
//!
//! A facility publishes up to eight windows: Monday through Sunday and a
//! holiday window. Each window is stored as a pair of `HHMM` strings in the
//! fields `dutyTime{k}s` (start) and `dutyTime{k}c` (close), where `k` is the
//! [`DayKey`].
//!
//! [`WeeklySchedule`] reads those sixteen fields once, when the record is
//! built, into a fixed array of [`WindowSlot`]s. Classification then indexes
//! the array by day key and never looks fields up by name again.
//!
//! Windows whose end is earlier than their start (overnight hours) are kept as
//! published. They classify as `finished` at every instant, because the
//! comparison is a plain `start <= now <= end`.

use moonlight_store::Document;
use moonlight_types::{ClockTime, DayKey};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Field holding the start of the window for `key`.
pub fn start_field(key: DayKey) -> String {
    format!("dutyTime{key}s")
}

/// Field holding the close of the window for `key`.
pub fn end_field(key: DayKey) -> String {
    format!("dutyTime{key}c")
}

// ============================================================================
// STATUS
// ============================================================================

/// Whether a facility is open at a given instant. Derived on every read.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum AvailabilityStatus {
    Open,
    Finished,
    NotScheduledToday,
    Unknown,
}

impl AvailabilityStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            AvailabilityStatus::Open => "open",
            AvailabilityStatus::Finished => "finished",
            AvailabilityStatus::NotScheduledToday => "notScheduledToday",
            AvailabilityStatus::Unknown => "unknown",
        }
    }
}

impl std::fmt::Display for AvailabilityStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

// ============================================================================
// WINDOWS
// ============================================================================

/// An inclusive `[start, end]` opening window.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimeWindow {
    pub start: ClockTime,
    pub end: ClockTime,
}

impl TimeWindow {
    pub fn contains(&self, now: ClockTime) -> bool {
        self.start <= now && now <= self.end
    }

    /// `HH:MM-HH:MM`, as shown in the app.
    pub fn display(&self) -> String {
        format!(
            "{}-{}",
            self.start.to_colon_string(),
            self.end.to_colon_string()
        )
    }
}

/// What a record holds for one day key.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum WindowSlot {
    /// Neither start nor close is published.
    #[default]
    Absent,
    Valid(TimeWindow),
    /// Something is published but it is not a pair of `HHMM` values.
    Malformed { start: String, end: String },
}

impl WindowSlot {
    /// Builds a slot from the raw field values. Only the empty string counts
    /// as missing; surrounding whitespace makes a value malformed.
    pub fn from_raw(start: Option<&str>, end: Option<&str>) -> Self {
        let start = start.filter(|s| !s.is_empty());
        let end = end.filter(|s| !s.is_empty());
        match (start, end) {
            (None, None) => WindowSlot::Absent,
            (Some(s), Some(e)) => match (ClockTime::parse(s), ClockTime::parse(e)) {
                (Ok(start), Ok(end)) => WindowSlot::Valid(TimeWindow { start, end }),
                _ => WindowSlot::Malformed {
                    start: s.to_owned(),
                    end: e.to_owned(),
                },
            },
            (s, e) => WindowSlot::Malformed {
                start: s.unwrap_or_default().to_owned(),
                end: e.unwrap_or_default().to_owned(),
            },
        }
    }
}

/// The eight windows of one facility, indexed by [`DayKey::index`].
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct WeeklySchedule {
    slots: [WindowSlot; 8],
}

impl WeeklySchedule {
    pub fn from_slots(slots: [WindowSlot; 8]) -> Self {
        Self { slots }
    }

    /// Reads the `dutyTime{k}s` / `dutyTime{k}c` fields of a stored record.
    ///
    /// Non-string values are treated like malformed text.
    pub fn from_document(doc: &Document) -> Self {
        let mut slots: [WindowSlot; 8] = Default::default();
        for key in DayKey::all() {
            let start = raw_field(doc, &start_field(key));
            let end = raw_field(doc, &end_field(key));
            slots[key.index()] = match (start, end) {
                (Ok(s), Ok(e)) => WindowSlot::from_raw(s, e),
                (s, e) => WindowSlot::Malformed {
                    start: shown(s),
                    end: shown(e),
                },
            };
        }
        Self { slots }
    }

    pub fn slot(&self, key: DayKey) -> &WindowSlot {
        &self.slots[key.index()]
    }

    /// True when nothing at all is published for any key.
    pub fn is_empty(&self) -> bool {
        self.slots.iter().all(|s| *s == WindowSlot::Absent)
    }

    pub fn valid_windows(&self) -> impl Iterator<Item = (DayKey, TimeWindow)> + '_ {
        DayKey::all().filter_map(|key| match self.slot(key) {
            WindowSlot::Valid(w) => Some((key, *w)),
            _ => None,
        })
    }

    /// Day key to `HH:MM-HH:MM` for every well-formed window.
    pub fn hours_map(&self) -> BTreeMap<u8, String> {
        self.valid_windows()
            .map(|(key, w)| (key.get(), w.display()))
            .collect()
    }

    /// Classifies the facility at `now` on the schedule slot `key`.
    pub fn classify(&self, key: DayKey, now: ClockTime) -> AvailabilityStatus {
        if self.is_empty() {
            return AvailabilityStatus::Unknown;
        }
        match self.slot(key) {
            WindowSlot::Absent => AvailabilityStatus::NotScheduledToday,
            WindowSlot::Valid(window) if window.contains(now) => AvailabilityStatus::Open,
            WindowSlot::Valid(_) => AvailabilityStatus::Finished,
            WindowSlot::Malformed { start, end } => {
                tracing::warn!("operating hours for key {key} malformed: start {start:?} close {end:?}");
                AvailabilityStatus::Unknown
            }
        }
    }
}

/// Window bounds are stored as text. Any other JSON value is kept as its
/// rendering in the `Err` arm so it can only ever be malformed.
fn raw_field<'a>(doc: &'a Document, field: &str) -> Result<Option<&'a str>, String> {
    match doc.get(field) {
        None | Some(serde_json::Value::Null) => Ok(None),
        Some(serde_json::Value::String(s)) => Ok(Some(s)),
        Some(other) => Err(other.to_string()),
    }
}

fn shown(raw: Result<Option<&str>, String>) -> String {
    match raw {
        Ok(s) => s.unwrap_or_default().to_owned(),
        Err(rendered) => rendered,
    }
}
