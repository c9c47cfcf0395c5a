//! # Moonlight Types
//!
//! Small validated primitives shared by the storage, core and API crates.
//!
//! - [`NonEmptyText`]: trimmed text that is guaranteed to carry content
//! - [`DayKey`]: the 1..=8 code that selects a weekday or the holiday schedule
//! - [`ClockTime`]: a fixed-width `HHMM` wall-clock reading

use chrono::{NaiveTime, Timelike, Weekday};

/// Errors raised when constructing a validated type.
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum TypesError {
    /// The input text was empty or contained only whitespace
    #[error("text cannot be empty")]
    Empty,
    #[error("day key must be between 1 and 8, got {0}")]
    DayKeyOutOfRange(u8),
    /// The input was not exactly four ASCII digits
    #[error("clock time must be four digits (HHMM), got {0:?}")]
    MalformedClockTime(String),
}

// ============================================================================
// NON-EMPTY TEXT
// ============================================================================

/// Text with at least one non-whitespace character.
///
/// Leading and trailing whitespace is removed on construction, so two inputs
/// that differ only in padding compare equal.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NonEmptyText(String);

impl NonEmptyText {
    pub fn new(input: impl AsRef<str>) -> Result<Self, TypesError> {
        let trimmed = input.as_ref().trim();
        if trimmed.is_empty() {
            return Err(TypesError::Empty);
        }
        Ok(Self(trimmed.to_owned()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn into_inner(self) -> String {
        self.0
    }
}

impl std::fmt::Display for NonEmptyText {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for NonEmptyText {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl serde::Serialize for NonEmptyText {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_str(&self.0)
    }
}

impl<'de> serde::Deserialize<'de> for NonEmptyText {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        NonEmptyText::new(&s).map_err(serde::de::Error::custom)
    }
}

// ============================================================================
// DAY KEY
// ============================================================================

/// Selects which operating window applies "today".
///
/// Keys 1 through 7 are Monday through Sunday; key 8 is the holiday schedule,
/// which replaces the weekday whenever the current date is a public holiday.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct DayKey(u8);

impl DayKey {
    pub const MONDAY: DayKey = DayKey(1);
    pub const SUNDAY: DayKey = DayKey(7);
    pub const HOLIDAY: DayKey = DayKey(8);

    pub fn new(value: u8) -> Result<Self, TypesError> {
        if (1..=8).contains(&value) {
            Ok(Self(value))
        } else {
            Err(TypesError::DayKeyOutOfRange(value))
        }
    }

    /// Maps a calendar weekday onto its key, Monday = 1 and Sunday = 7.
    pub fn from_weekday(weekday: Weekday) -> Self {
        // number_from_monday is 1..=7, so Sunday lands on 7 rather than 0.
        Self(weekday.number_from_monday() as u8)
    }

    /// Every key in slot order, weekdays first and the holiday key last.
    pub fn all() -> impl Iterator<Item = DayKey> {
        (1..=8).map(DayKey)
    }

    pub fn get(self) -> u8 {
        self.0
    }

    /// Zero-based slot index for fixed-size per-day tables.
    pub fn index(self) -> usize {
        usize::from(self.0 - 1)
    }

    pub fn is_holiday(self) -> bool {
        self == Self::HOLIDAY
    }
}

impl std::fmt::Display for DayKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl serde::Serialize for DayKey {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_u8(self.0)
    }
}

// ============================================================================
// CLOCK TIME
// ============================================================================

/// A zero-padded 24-hour `HHMM` reading.
///
/// Only the shape is validated: four ASCII digits. Source schedules use values
/// such as `2400` for "until midnight", so hours are not range-checked. Because
/// every value has the same width, ordering the digit strings is the same as
/// ordering the times numerically.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ClockTime([u8; 4]);

impl ClockTime {
    pub fn parse(input: &str) -> Result<Self, TypesError> {
        let bytes = input.as_bytes();
        if bytes.len() != 4 || !bytes.iter().all(u8::is_ascii_digit) {
            return Err(TypesError::MalformedClockTime(input.to_owned()));
        }
        Ok(Self([bytes[0], bytes[1], bytes[2], bytes[3]]))
    }

    pub fn from_time(time: NaiveTime) -> Self {
        let (h, m) = (time.hour(), time.minute());
        // hour < 24 and minute < 60, so each fits two digits.
        Self([
            b'0' + (h / 10) as u8,
            b'0' + (h % 10) as u8,
            b'0' + (m / 10) as u8,
            b'0' + (m % 10) as u8,
        ])
    }

    /// The raw `HHMM` digits.
    pub fn as_str(&self) -> &str {
        // Constructed only from ASCII digits.
        std::str::from_utf8(&self.0).unwrap_or("0000")
    }

    /// Human-facing `HH:MM` form.
    pub fn to_colon_string(&self) -> String {
        let s = self.as_str();
        format!("{}:{}", &s[..2], &s[2..])
    }
}

impl std::fmt::Display for ClockTime {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for ClockTime {
    type Err = TypesError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn non_empty_text_trims_and_rejects_blank() {
        assert_eq!(NonEmptyText::new("  A1100017 ").unwrap().as_str(), "A1100017");
        assert_eq!(NonEmptyText::new("   "), Err(TypesError::Empty));
    }

    #[test]
    fn non_empty_text_deserialize_rejects_empty() {
        let err = serde_json::from_str::<NonEmptyText>("\"\"");
        assert!(err.is_err());
    }

    #[test]
    fn day_key_maps_weekdays_with_sunday_last() {
        assert_eq!(DayKey::from_weekday(Weekday::Mon).get(), 1);
        assert_eq!(DayKey::from_weekday(Weekday::Wed).get(), 3);
        assert_eq!(DayKey::from_weekday(Weekday::Sat).get(), 6);
        assert_eq!(DayKey::from_weekday(Weekday::Sun), DayKey::SUNDAY);
    }

    #[test]
    fn day_key_rejects_out_of_range() {
        assert_eq!(DayKey::new(0), Err(TypesError::DayKeyOutOfRange(0)));
        assert_eq!(DayKey::new(9), Err(TypesError::DayKeyOutOfRange(9)));
        assert_eq!(DayKey::new(8).unwrap(), DayKey::HOLIDAY);
    }

    #[test]
    fn day_key_all_covers_eight_slots_in_order() {
        let keys: Vec<u8> = DayKey::all().map(DayKey::get).collect();
        assert_eq!(keys, vec![1, 2, 3, 4, 5, 6, 7, 8]);
        assert_eq!(DayKey::HOLIDAY.index(), 7);
    }

    #[test]
    fn clock_time_requires_four_digits() {
        assert!(ClockTime::parse("0900").is_ok());
        assert!(ClockTime::parse("2400").is_ok());
        for bad in ["900", "09:00", "09000", "ab00", ""] {
            assert_eq!(
                ClockTime::parse(bad),
                Err(TypesError::MalformedClockTime(bad.to_string()))
            );
        }
    }

    #[test]
    fn clock_time_orders_like_numbers() {
        let early = ClockTime::parse("0930").unwrap();
        let late = ClockTime::parse("1300").unwrap();
        assert!(early < late);
        assert_eq!(
            ClockTime::from_time(NaiveTime::from_hms_opt(14, 5, 59).unwrap()).as_str(),
            "1405"
        );
        assert_eq!(late.to_colon_string(), "13:00");
    }
}
