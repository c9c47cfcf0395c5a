//! Hospital lookup, search and moonlight listing.
//!
//! Every request reads the clock and the holiday calendar exactly once. The
//! resulting [`ResolvedDay`] is shared by the storage filter and by the status
//! of every record on the page, so a page is judged against a single instant.

use crate::clock::Clock;
use crate::config::CoreConfig;
use crate::constants::{
    HOSPITAL_CATEGORY_CODES, HOSPITAL_COLLECTION, MOONLIGHT_COLLECTION, PEDIATRIC_SUBJECT,
};
use crate::holiday::{HolidayCalendar, ResolvedDay};
use crate::hospital::HospitalRecord;
use crate::pager::{page, sample_stage};
use crate::profiler::{ProfileKey, Profiler};
use crate::query::{build_filter, BoundingBox, StatusToken};
use crate::services::likes::LikeService;
use crate::services::required;
use crate::services::surveys::SurveyService;
use crate::{CoreError, CoreResult};
use api_shared::{HospitalListRes, HospitalRes};
use moonlight_store::{Document, DocumentStore, FindOptions, Predicate, Stage, ID_FIELD};
use std::sync::Arc;
use std::time::Instant;

/// Parameters of a hospital search.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct HospitalSearch {
    pub bbox: BoundingBox,
    pub status: Option<StatusToken>,
    pub pediatric_only: bool,
}

#[derive(Clone)]
pub struct HospitalService {
    cfg: Arc<CoreConfig>,
    store: Arc<dyn DocumentStore>,
    clock: Arc<dyn Clock>,
    profiler: Arc<Profiler>,
    holidays: HolidayCalendar,
    likes: LikeService,
    surveys: SurveyService,
}

impl HospitalService {
    pub fn new(
        cfg: Arc<CoreConfig>,
        store: Arc<dyn DocumentStore>,
        clock: Arc<dyn Clock>,
        profiler: Arc<Profiler>,
    ) -> Self {
        Self {
            holidays: HolidayCalendar::new(store.clone()),
            likes: LikeService::new(store.clone()),
            surveys: SurveyService::new(store.clone(), clock.clone(), profiler.clone()),
            cfg,
            store,
            clock,
            profiler,
        }
    }

    /// Day key, clock reading and holiday flag for this instant.
    pub fn resolve_day(&self) -> ResolvedDay {
        self.holidays.resolve(self.clock.now())
    }

    pub fn is_holiday_today(&self) -> bool {
        self.holidays.is_holiday(self.clock.now().date_naive())
    }

    /// One hospital as a single-element list.
    ///
    /// # Errors
    ///
    /// `InvalidInput` for a blank id, `NotFound` when no record has that id.
    pub fn get_hospital(&self, hospital_id: &str) -> CoreResult<HospitalListRes> {
        let hospital_id = required("hospitalId", hospital_id)?;
        let doc = self
            .store
            .find_one(
                HOSPITAL_COLLECTION,
                &Predicate::eq(ID_FIELD, hospital_id.as_str()),
                None,
            )?
            .ok_or_else(|| CoreError::NotFound(format!("hospital {hospital_id}")))?;

        let day = self.resolve_day();
        Ok(HospitalListRes {
            hospitals: vec![self.present(&doc, &day)],
            total_count: 1,
            pageable_count: 1,
        })
    }

    /// Samples pediatric-capable hospitals inside the box.
    ///
    /// At most one page is returned. `total_count` exceeds `pageable_count`
    /// when at least one more match exists.
    pub fn search_hospitals(&self, search: HospitalSearch) -> CoreResult<HospitalListRes> {
        let begin = Instant::now();
        let day = self.resolve_day();

        let filter = build_filter(
            search.bbox,
            &HOSPITAL_CATEGORY_CODES,
            Some(PEDIATRIC_SUBJECT),
            search.pediatric_only,
            search.status,
            day.day_key,
            day.now,
        );
        let page_size = self.cfg.page_size();
        let pipeline = [Stage::Match(filter.to_predicate()), sample_stage(page_size)];
        let candidates = self.store.aggregate(HOSPITAL_COLLECTION, &pipeline)?;

        let sampled = page(candidates, page_size);
        let res = HospitalListRes {
            hospitals: sampled
                .visible
                .iter()
                .map(|doc| self.present(doc, &day))
                .collect(),
            total_count: count_u32(sampled.total_count()),
            pageable_count: count_u32(sampled.pageable_count()),
        };

        self.profiler.record_since(ProfileKey::GetHospitals, begin);
        Ok(res)
    }

    /// Every moonlight clinic inside the box, unsampled.
    pub fn list_moonlights(
        &self,
        bbox: BoundingBox,
        status: Option<StatusToken>,
    ) -> CoreResult<HospitalListRes> {
        let begin = Instant::now();
        let day = self.resolve_day();

        let filter = build_filter(bbox, &[], None, false, status, day.day_key, day.now);
        let docs = self.store.find_many(
            MOONLIGHT_COLLECTION,
            &filter.to_predicate(),
            &FindOptions::default(),
        )?;

        let hospitals: Vec<HospitalRes> =
            docs.iter().map(|doc| self.present(doc, &day)).collect();
        let count = count_u32(hospitals.len());

        self.profiler.record_since(ProfileKey::GetMoonlights, begin);
        Ok(HospitalListRes {
            hospitals,
            total_count: count,
            pageable_count: count,
        })
    }

    fn present(&self, doc: &Document, day: &ResolvedDay) -> HospitalRes {
        let record = HospitalRecord::from_document(doc);
        let status = record.status(day.day_key, day.now);
        let survey_count = self.surveys.count_or_zero(&record.id);
        let like_count = self.likes.count_or_zero(&record.id);
        record.to_response(status, survey_count, like_count)
    }
}

fn count_u32(n: usize) -> u32 {
    u32::try_from(n).unwrap_or(u32::MAX)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::FixedClock;
    use crate::constants::{HOLIDAY_COLLECTION, LIKE_COLLECTION, SURVEY_COLLECTION};
    use crate::config::kst;
    use chrono::DateTime;
    use moonlight_store::MemoryStore;
    use serde_json::{json, Value};
    use std::path::PathBuf;

    fn docs(values: Vec<Value>) -> Vec<Document> {
        values
            .into_iter()
            .map(|v| v.as_object().unwrap().clone())
            .collect()
    }

    fn clinic(id: &str, lng: f64, extra: Value) -> Value {
        let mut doc = json!({
            "_id": id,
            "dutyName": format!("{id} 소아청소년과의원"),
            "dutyDiv": "C",
            "dutyDivNam": "의원",
            "dgidIdName": "소아청소년과",
            "location": { "type": "Point", "coordinates": [lng, 37.5] },
        });
        if let (Some(target), Some(fields)) = (doc.as_object_mut(), extra.as_object()) {
            target.extend(fields.clone());
        }
        doc
    }

    // 2024-05-08 is a Wednesday.
    fn service_at(now: &str, page_size: usize) -> (Arc<MemoryStore>, Arc<Profiler>, HospitalService) {
        let store = Arc::new(MemoryStore::new());
        let clock = FixedClock(DateTime::parse_from_rfc3339(now).unwrap());
        let cfg = Arc::new(CoreConfig::new(PathBuf::from("unused"), kst(), page_size).unwrap());
        let profiler = Arc::new(Profiler::new());
        let svc = HospitalService::new(cfg, store.clone(), Arc::new(clock), profiler.clone());
        (store, profiler, svc)
    }

    fn bbox() -> BoundingBox {
        BoundingBox {
            south_west: [126.0, 37.0],
            north_east: [128.0, 38.0],
        }
    }

    fn search(status: Option<StatusToken>) -> HospitalSearch {
        HospitalSearch {
            bbox: bbox(),
            status,
            pediatric_only: false,
        }
    }

    #[test]
    fn wednesday_window_is_open_at_ten_and_finished_at_seven() {
        let wed = json!({ "dutyTime3s": "0900", "dutyTime3c": "1800" });
        for (now, status) in [
            ("2024-05-08T10:00:00+09:00", "open"),
            ("2024-05-08T19:00:00+09:00", "finished"),
        ] {
            let (store, _, svc) = service_at(now, 15);
            store
                .insert_many(HOSPITAL_COLLECTION, docs(vec![clinic("h1", 127.0, wed.clone())]))
                .unwrap();
            let res = svc.get_hospital("h1").unwrap();
            assert_eq!(res.hospitals[0].operating_status, status, "{now}");
            assert_eq!((res.total_count, res.pageable_count), (1, 1));
        }
    }

    #[test]
    fn holiday_window_only_applies_on_holidays() {
        let extra = json!({ "dutyTime8s": "0900", "dutyTime8c": "1700" });
        let (store, _, svc) = service_at("2024-05-08T10:00:00+09:00", 15);
        store
            .insert_many(HOSPITAL_COLLECTION, docs(vec![clinic("h1", 127.0, extra)]))
            .unwrap();
        assert_eq!(
            svc.get_hospital("h1").unwrap().hospitals[0].operating_status,
            "notScheduledToday"
        );

        store
            .insert_many(HOLIDAY_COLLECTION, docs(vec![json!({ "holidays": ["20240508"] })]))
            .unwrap();
        assert!(svc.is_holiday_today());
        assert_eq!(
            svc.get_hospital("h1").unwrap().hospitals[0].operating_status,
            "open"
        );
    }

    #[test]
    fn unknown_hospital_is_not_found() {
        let (_, _, svc) = service_at("2024-05-08T10:00:00+09:00", 15);
        assert!(matches!(svc.get_hospital("nope"), Err(CoreError::NotFound(_))));
        assert!(svc.get_hospital("").unwrap_err().is_client_error());
    }

    #[test]
    fn search_samples_one_more_than_a_page() {
        let (store, profiler, svc) = service_at("2024-05-08T10:00:00+09:00", 3);
        let many: Vec<Value> = (0..5)
            .map(|i| clinic(&format!("h{i}"), 127.0, json!({})))
            .collect();
        store.insert_many(HOSPITAL_COLLECTION, docs(many)).unwrap();

        let res = svc.search_hospitals(search(None)).unwrap();
        assert_eq!(res.hospitals.len(), 3);
        assert_eq!((res.total_count, res.pageable_count), (4, 3));
        assert!(res.hospitals.iter().all(|h| h.operating_status == "unknown"));

        let snap = profiler.snapshot();
        let hospitals = snap.iter().find(|(k, _)| *k == ProfileKey::GetHospitals).unwrap();
        assert_eq!(hospitals.1.count, 1);
    }

    #[test]
    fn search_without_more_reports_equal_counts() {
        let (store, _, svc) = service_at("2024-05-08T10:00:00+09:00", 15);
        store
            .insert_many(
                HOSPITAL_COLLECTION,
                docs(vec![clinic("h1", 127.0, json!({})), clinic("far", 130.0, json!({}))]),
            )
            .unwrap();
        let res = svc.search_hospitals(search(None)).unwrap();
        assert_eq!((res.total_count, res.pageable_count), (1, 1));
        assert_eq!(res.hospitals[0].hpid, "h1");
    }

    #[test]
    fn open_now_search_drops_closed_candidates() {
        let (store, _, svc) = service_at("2024-05-08T14:00:00+09:00", 15);
        store
            .insert_many(
                HOSPITAL_COLLECTION,
                docs(vec![
                    clinic("morning", 127.0, json!({ "dutyTime3s": "0900", "dutyTime3c": "1300" })),
                    clinic("day", 127.0, json!({ "dutyTime3s": "0900", "dutyTime3c": "1800" })),
                ]),
            )
            .unwrap();
        let res = svc
            .search_hospitals(search(Some(StatusToken::OpenNow)))
            .unwrap();
        let ids: Vec<&str> = res.hospitals.iter().map(|h| h.hpid.as_str()).collect();
        assert_eq!(ids, vec!["day"]);
        assert_eq!(res.hospitals[0].operating_status, "open");
    }

    #[test]
    fn results_carry_like_and_survey_counts() {
        let (store, _, svc) = service_at("2024-05-08T10:00:00+09:00", 15);
        store
            .insert_many(HOSPITAL_COLLECTION, docs(vec![clinic("h1", 127.0, json!({}))]))
            .unwrap();
        store
            .insert_many(
                LIKE_COLLECTION,
                docs(vec![json!({ "hospitalId": "h1", "userIds": ["a", "b", "c"] })]),
            )
            .unwrap();
        store
            .insert_many(
                SURVEY_COLLECTION,
                docs(vec![
                    json!({ "hospitalId": "h1", "userId": "a" }),
                    json!({ "hospitalId": "h1", "userId": "b" }),
                ]),
            )
            .unwrap();
        let h = &svc.get_hospital("h1").unwrap().hospitals[0];
        assert_eq!((h.like_count, h.survey_count), (3, 2));
    }

    #[test]
    fn moonlights_are_listed_unsampled_without_category_filter() {
        let (store, profiler, svc) = service_at("2024-05-08T10:00:00+09:00", 1);
        let moonlights: Vec<Value> = (0..4)
            .map(|i| {
                clinic(
                    &format!("m{i}"),
                    127.0,
                    json!({ "dutyDiv": "H", "dgidIdName": "" }),
                )
            })
            .collect();
        store.insert_many(MOONLIGHT_COLLECTION, docs(moonlights)).unwrap();

        let res = svc.list_moonlights(bbox(), None).unwrap();
        assert_eq!(res.hospitals.len(), 4);
        assert_eq!((res.total_count, res.pageable_count), (4, 4));

        let snap = profiler.snapshot();
        let moon = snap.iter().find(|(k, _)| *k == ProfileKey::GetMoonlights).unwrap();
        assert_eq!(moon.1.count, 1);
    }
}
