//! Hospital records as read from the `hospitals` and `moonlights` collections.

use crate::schedule::{AvailabilityStatus, WeeklySchedule};
use api_shared::HospitalRes;
use moonlight_store::{lookup, Document, ID_FIELD};
use moonlight_types::{ClockTime, DayKey};

/// Stored field names of a facility record.
pub mod fields {
    pub const NAME: &str = "dutyName";
    pub const ADDRESS: &str = "dutyAddr";
    pub const PHONE: &str = "dutyTel1";
    pub const CATEGORY_CODE: &str = "dutyDiv";
    pub const CATEGORY_LABEL: &str = "dutyDivNam";
    pub const DETAIL: &str = "dutyInf";
    pub const NOTE: &str = "dutyEtc";
    pub const SUBJECTS: &str = "dgidIdName";
    pub const LOCATION: &str = "location";
}

/// A facility, read-only from this crate's point of view.
#[derive(Debug, Clone, PartialEq)]
pub struct HospitalRecord {
    pub id: String,
    pub name: String,
    pub address: String,
    pub phone: String,
    pub category_code: String,
    pub category_label: String,
    /// Specialties, split from the comma-delimited source field.
    pub subjects: Vec<String>,
    /// `(lng, lat)`, absent when the stored location is unusable.
    pub location: Option<(f64, f64)>,
    pub details: Vec<String>,
    pub schedule: WeeklySchedule,
}

impl HospitalRecord {
    /// Builds a record from a stored document. Missing text fields read as
    /// empty; a missing or malformed location reads as absent.
    pub fn from_document(doc: &Document) -> Self {
        let text = |field: &str| {
            doc.get(field)
                .and_then(|v| v.as_str())
                .unwrap_or_default()
                .trim()
                .to_owned()
        };

        let id = match doc.get(ID_FIELD) {
            Some(serde_json::Value::String(s)) => s.clone(),
            Some(other) => other.to_string(),
            None => String::new(),
        };

        let subjects = text(fields::SUBJECTS)
            .split(',')
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(str::to_owned)
            .collect();

        let details = [text(fields::DETAIL), text(fields::NOTE)]
            .into_iter()
            .filter(|s| !s.is_empty())
            .collect();

        let location = lookup(doc, &format!("{}.coordinates", fields::LOCATION))
            .and_then(|v| v.as_array())
            .and_then(|coords| match coords.as_slice() {
                [lng, lat] => Some((lng.as_f64()?, lat.as_f64()?)),
                _ => None,
            });

        Self {
            id,
            name: text(fields::NAME),
            address: text(fields::ADDRESS),
            phone: text(fields::PHONE),
            category_code: text(fields::CATEGORY_CODE),
            category_label: text(fields::CATEGORY_LABEL),
            subjects,
            location,
            details,
            schedule: WeeklySchedule::from_document(doc),
        }
    }

    pub fn status(&self, key: DayKey, now: ClockTime) -> AvailabilityStatus {
        self.schedule.classify(key, now)
    }

    pub fn to_response(
        &self,
        status: AvailabilityStatus,
        survey_count: u64,
        like_count: u64,
    ) -> HospitalRes {
        HospitalRes {
            hpid: self.id.clone(),
            name: self.name.clone(),
            address: self.address.clone(),
            phone: self.phone.clone(),
            category: self.category_label.clone(),
            subjects: self.subjects.clone(),
            coordinates: self
                .location
                .map(|(lng, lat)| vec![lng, lat])
                .unwrap_or_default(),
            detail_info: self.details.clone(),
            operating_hours_map: self.schedule.hours_map(),
            operating_status: status.as_str().to_owned(),
            survey_count,
            like_count,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn record(value: serde_json::Value) -> HospitalRecord {
        HospitalRecord::from_document(value.as_object().unwrap())
    }

    #[test]
    fn reads_a_full_record() {
        let r = record(json!({
            "_id": "A1100010",
            "dutyName": "달빛소아과의원",
            "dutyAddr": "서울특별시 중구",
            "dutyTel1": "02-000-0000",
            "dutyDiv": "C",
            "dutyDivNam": "의원",
            "dutyInf": "야간진료",
            "dutyEtc": "",
            "dgidIdName": "소아청소년과, 내과,,",
            "location": { "type": "Point", "coordinates": [126.97, 37.56] },
            "dutyTime3s": "0900",
            "dutyTime3c": "1800",
        }));
        assert_eq!(r.id, "A1100010");
        assert_eq!(r.subjects, vec!["소아청소년과", "내과"]);
        assert_eq!(r.details, vec!["야간진료"]);
        assert_eq!(r.location, Some((126.97, 37.56)));

        let key = DayKey::new(3).unwrap();
        let status = r.status(key, ClockTime::parse("1000").unwrap());
        assert_eq!(status, AvailabilityStatus::Open);

        let res = r.to_response(status, 4, 2);
        assert_eq!(res.category, "의원");
        assert_eq!(res.coordinates, vec![126.97, 37.56]);
        assert_eq!(res.operating_hours_map[&3], "09:00-18:00");
        assert_eq!(res.operating_status, "open");
        assert_eq!((res.survey_count, res.like_count), (4, 2));
    }

    #[test]
    fn sparse_record_degrades_to_defaults() {
        let r = record(json!({ "_id": 17, "location": { "coordinates": [1.0] } }));
        assert_eq!(r.id, "17");
        assert!(r.name.is_empty());
        assert!(r.subjects.is_empty());
        assert_eq!(r.location, None);
        let res = r.to_response(AvailabilityStatus::Unknown, 0, 0);
        assert!(res.coordinates.is_empty());
        assert!(res.operating_hours_map.is_empty());
        assert_eq!(res.operating_status, "unknown");
    }
}
