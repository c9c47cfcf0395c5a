//! # Day and holiday resolution
//!
//! Every availability computation is keyed by a [`DayKey`]: the weekday of
//! "now" in the operating timezone, unless today's date appears in the holiday
//! calendar, in which case the holiday schedule (key 8) applies.
//!
//! The calendar lives in the `holidays` collection as documents of the form
//! `{ "holidays": ["20240101", "20240209", ...] }`. A missing calendar is not an
//! error; it just means no day is a holiday.

use crate::constants::{HOLIDAY_COLLECTION, HOLIDAY_DATE_FORMAT};
use chrono::{DateTime, Datelike, FixedOffset, NaiveDate};
use moonlight_store::{DocumentStore, Predicate};
use moonlight_types::{ClockTime, DayKey};
use std::sync::Arc;

/// Field of a holiday document holding its `YYYYMMDD` dates.
pub const HOLIDAY_DATES_FIELD: &str = "holidays";

/// Picks the schedule slot for an instant: 8 on holidays, otherwise the
/// weekday with Monday = 1 and Sunday = 7.
pub fn resolve_day_key(now: &impl Datelike, is_holiday: bool) -> DayKey {
    if is_holiday {
        DayKey::HOLIDAY
    } else {
        DayKey::from_weekday(now.weekday())
    }
}

/// Formats a date the way the holiday calendar stores it.
pub fn holiday_date_string(date: NaiveDate) -> String {
    date.format(HOLIDAY_DATE_FORMAT).to_string()
}

/// The instant a request is judged against, fixed once per request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResolvedDay {
    pub day_key: DayKey,
    pub now: ClockTime,
    pub is_holiday: bool,
}

#[derive(Clone)]
pub struct HolidayCalendar {
    store: Arc<dyn DocumentStore>,
}

impl HolidayCalendar {
    pub fn new(store: Arc<dyn DocumentStore>) -> Self {
        Self { store }
    }

    /// Whether `date` is listed in the calendar.
    ///
    /// Storage failures are logged and read as "not a holiday".
    pub fn is_holiday(&self, date: NaiveDate) -> bool {
        let predicate = Predicate::eq(HOLIDAY_DATES_FIELD, holiday_date_string(date));
        match self.store.count(HOLIDAY_COLLECTION, &predicate) {
            Ok(n) => n > 0,
            Err(e) => {
                tracing::error!("holiday lookup for {date} failed: {e}");
                false
            }
        }
    }

    /// Resolves the day key and `HHMM` reading for `now`.
    pub fn resolve(&self, now: DateTime<FixedOffset>) -> ResolvedDay {
        let is_holiday = self.is_holiday(now.date_naive());
        ResolvedDay {
            day_key: resolve_day_key(&now, is_holiday),
            now: ClockTime::from_time(now.time()),
            is_holiday,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use moonlight_store::MemoryStore;
    use serde_json::json;

    fn at(rfc3339: &str) -> DateTime<FixedOffset> {
        DateTime::parse_from_rfc3339(rfc3339).unwrap()
    }

    fn calendar(dates: &[&str]) -> HolidayCalendar {
        let store = MemoryStore::new();
        let doc = json!({ "holidays": dates });
        store
            .insert_many(HOLIDAY_COLLECTION, vec![doc.as_object().unwrap().clone()])
            .unwrap();
        HolidayCalendar::new(Arc::new(store))
    }

    #[test]
    fn holiday_flag_always_wins() {
        // 2024-05-05 is a Sunday, 2024-05-06 a Monday.
        for day in 1..=7 {
            let now = at(&format!("2024-05-{:02}T12:00:00+09:00", day));
            assert_eq!(resolve_day_key(&now, true), DayKey::HOLIDAY);
        }
    }

    #[test]
    fn weekdays_map_monday_first_sunday_last() {
        let expected = [
            ("2024-05-06", 1),
            ("2024-05-07", 2),
            ("2024-05-08", 3),
            ("2024-05-09", 4),
            ("2024-05-10", 5),
            ("2024-05-11", 6),
            ("2024-05-12", 7),
        ];
        for (date, key) in expected {
            let now = at(&format!("{date}T08:30:00+09:00"));
            assert_eq!(resolve_day_key(&now, false).get(), key, "{date}");
        }
    }

    #[test]
    fn calendar_lookup_uses_local_date() {
        let cal = calendar(&["20240505", "20240506"]);
        assert!(cal.is_holiday(NaiveDate::from_ymd_opt(2024, 5, 6).unwrap()));
        assert!(!cal.is_holiday(NaiveDate::from_ymd_opt(2024, 5, 7).unwrap()));

        // 2024-05-05T16:00Z is already Monday the 6th in Seoul.
        let resolved = cal.resolve(at("2024-05-06T01:00:00+09:00"));
        assert_eq!(resolved.day_key, DayKey::HOLIDAY);
        assert!(resolved.is_holiday);
        assert_eq!(resolved.now.as_str(), "0100");
    }

    #[test]
    fn missing_calendar_means_no_holiday() {
        let cal = HolidayCalendar::new(Arc::new(MemoryStore::new()));
        let resolved = cal.resolve(at("2024-05-08T19:05:00+09:00"));
        assert_eq!(resolved.day_key.get(), 3);
        assert!(!resolved.is_holiday);
        assert_eq!(resolved.now.as_str(), "1905");
    }
}
