//! Survey answers and per-hospital summaries.

use crate::clock::Clock;
use crate::constants::{SURVEY_COLLECTION, TIMESTAMP_FORMAT};
use crate::profiler::{ProfileKey, Profiler};
use crate::services::required;
use crate::services::users::UserActivityService;
use crate::survey::{build_summary_pipeline, reshape, SurveySchema, HOSPITAL_ID_FIELD, USER_ID_FIELD};
use crate::{CoreError, CoreResult};
use api_shared::{SurveyAnswerDocument, SurveyQuestionsRes, SurveySummaryRes};
use moonlight_store::{Document, DocumentStore, Mutation, Predicate, ID_FIELD};
use std::sync::Arc;
use std::time::Instant;

/// Whether a submission created a new answer document or replaced one.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubmitOutcome {
    Created,
    Updated,
}

#[derive(Clone)]
pub struct SurveyService {
    store: Arc<dyn DocumentStore>,
    clock: Arc<dyn Clock>,
    profiler: Arc<Profiler>,
    users: UserActivityService,
    schema: &'static SurveySchema,
}

impl SurveyService {
    pub fn new(
        store: Arc<dyn DocumentStore>,
        clock: Arc<dyn Clock>,
        profiler: Arc<Profiler>,
    ) -> Self {
        Self {
            users: UserActivityService::new(store.clone()),
            store,
            clock,
            profiler,
            schema: SurveySchema::standard(),
        }
    }

    pub fn questions(&self) -> SurveyQuestionsRes {
        self.schema.to_response()
    }

    /// Per-question option counts for one hospital.
    pub fn summary(&self, hospital_id: &str) -> CoreResult<SurveySummaryRes> {
        let begin = Instant::now();
        let hospital_id = required("hospitalId", hospital_id)?;

        let pipeline = build_summary_pipeline(self.schema, hospital_id.as_str());
        let rows = self.store.aggregate(SURVEY_COLLECTION, &pipeline)?;
        if rows.len() > 1 {
            tracing::warn!(
                "survey summary for {hospital_id} produced {} rows, using the first",
                rows.len()
            );
        }
        let res = reshape(hospital_id.as_str(), rows.first(), self.schema);

        self.profiler
            .record_since(ProfileKey::GetSurveySummary, begin);
        Ok(res)
    }

    /// Number of answer documents for a hospital. Failures read as zero.
    pub fn count_or_zero(&self, hospital_id: &str) -> u64 {
        self.store
            .count(SURVEY_COLLECTION, &by_hospital(hospital_id))
            .unwrap_or_else(|e| {
                tracing::warn!("survey count for {hospital_id} unavailable: {e}");
                0
            })
    }

    /// Stores a user's answers for a hospital, replacing earlier ones.
    pub fn submit(&self, mut answer: SurveyAnswerDocument) -> CoreResult<SubmitOutcome> {
        let hospital_id = required("hospitalId", &answer.hospital_id)?;
        let user_id = required("userId", &answer.user_id)?;
        self.schema.validate(&answer.answers)?;

        answer.hospital_id = hospital_id.into_inner();
        answer.user_id = user_id.into_inner();
        if answer.timestamp.trim().is_empty() {
            answer.timestamp = self.clock.now().format(TIMESTAMP_FORMAT).to_string();
        }

        let fields = match serde_json::to_value(&answer).map_err(CoreError::Serialization)? {
            serde_json::Value::Object(map) => map,
            other => {
                return Err(CoreError::InvalidInput(format!(
                    "survey answer did not serialise to an object: {other}"
                )))
            }
        };

        let predicate = by_answer(&answer.hospital_id, &answer.user_id);
        let result =
            self.store
                .update_one(SURVEY_COLLECTION, &predicate, &Mutation::Set(fields), true)?;

        self.users.record_survey(&answer.user_id, &answer.hospital_id);

        if result.upserted_count > 0 {
            tracing::info!(
                "survey created for hospital {} by user {}",
                answer.hospital_id,
                answer.user_id
            );
            Ok(SubmitOutcome::Created)
        } else {
            Ok(SubmitOutcome::Updated)
        }
    }

    /// The user's stored answers, or an empty document when there are none.
    pub fn answer(&self, hospital_id: &str, user_id: &str) -> CoreResult<SurveyAnswerDocument> {
        let hospital_id = required("hospitalId", hospital_id)?;
        let user_id = required("userId", user_id)?;
        let Some(mut doc) = self.store.find_one(
            SURVEY_COLLECTION,
            &by_answer(hospital_id.as_str(), user_id.as_str()),
            None,
        )?
        else {
            return Ok(SurveyAnswerDocument::default());
        };
        doc.remove(ID_FIELD);
        decode(doc)
    }
}

fn decode(doc: Document) -> CoreResult<SurveyAnswerDocument> {
    serde_json::from_value(serde_json::Value::Object(doc)).map_err(CoreError::Deserialization)
}

fn by_hospital(hospital_id: &str) -> Predicate {
    Predicate::eq(HOSPITAL_ID_FIELD, hospital_id)
}

fn by_answer(hospital_id: &str, user_id: &str) -> Predicate {
    Predicate::and([
        Predicate::eq(HOSPITAL_ID_FIELD, hospital_id),
        Predicate::eq(USER_ID_FIELD, user_id),
    ])
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::FixedClock;
    use crate::constants::USER_COLLECTION;
    use api_shared::SurveyAnswer;
    use chrono::DateTime;
    use moonlight_store::MemoryStore;
    use std::collections::BTreeMap;

    fn service() -> (Arc<MemoryStore>, Arc<Profiler>, SurveyService) {
        let store = Arc::new(MemoryStore::new());
        let clock = FixedClock(DateTime::parse_from_rfc3339("2024-05-08T10:00:00+09:00").unwrap());
        let profiler = Arc::new(Profiler::new());
        let svc = SurveyService::new(store.clone(), Arc::new(clock), profiler.clone());
        (store, profiler, svc)
    }

    fn submission(hospital: &str, user: &str, cleanliness: &str) -> SurveyAnswerDocument {
        SurveyAnswerDocument {
            hospital_id: hospital.into(),
            user_id: user.into(),
            timestamp: String::new(),
            answers: BTreeMap::from([(
                "cleanliness".to_string(),
                SurveyAnswer {
                    kind: "selection".into(),
                    option: cleanliness.into(),
                    text: String::new(),
                },
            )]),
        }
    }

    #[test]
    fn first_submit_creates_then_updates() {
        let (store, _, svc) = service();
        assert_eq!(svc.submit(submission("h1", "u1", "clean")).unwrap(), SubmitOutcome::Created);
        assert_eq!(svc.submit(submission("h1", "u1", "no")).unwrap(), SubmitOutcome::Updated);
        assert_eq!(store.count(SURVEY_COLLECTION, &Predicate::All).unwrap(), 1);

        let stored = svc.answer("h1", "u1").unwrap();
        assert_eq!(stored.answers["cleanliness"].option, "no");
        assert_eq!(stored.timestamp, "2024-05-08 10:00:00");

        let user = store
            .find_one(USER_COLLECTION, &Predicate::eq(ID_FIELD, "u1"), None)
            .unwrap()
            .unwrap();
        assert_eq!(user["surveys"], serde_json::json!(["h1"]));
    }

    #[test]
    fn missing_answer_is_empty_not_an_error() {
        let (_, _, svc) = service();
        assert_eq!(svc.answer("h1", "u1").unwrap(), SurveyAnswerDocument::default());
    }

    #[test]
    fn invalid_submission_is_rejected_before_storage() {
        let (store, _, svc) = service();
        let err = svc.submit(submission("h1", "u1", "sparkling")).unwrap_err();
        assert!(err.is_client_error());
        let err = svc.submit(submission("", "u1", "clean")).unwrap_err();
        assert!(err.is_client_error());
        assert_eq!(store.count(SURVEY_COLLECTION, &Predicate::All).unwrap(), 0);
    }

    #[test]
    fn summary_counts_submissions_and_is_profiled() {
        let (_, profiler, svc) = service();
        svc.submit(submission("h1", "u1", "clean")).unwrap();
        svc.submit(submission("h1", "u2", "clean")).unwrap();
        svc.submit(submission("h2", "u1", "no")).unwrap();

        let res = svc.summary("h1").unwrap();
        assert_eq!(res.hospital_id, "h1");
        assert_eq!(res.total_count, 2);
        assert_eq!(res.summaries["cleanliness"].option_counts, vec![2, 0, 0]);
        assert_eq!(res.summaries["kindness"].option_counts, vec![0, 0, 0]);
        assert_eq!(res.summaries.len(), 12);
        assert_eq!(svc.count_or_zero("h1"), 2);

        let empty = svc.summary("h3").unwrap();
        assert_eq!(empty.total_count, 0);
        assert!(empty.summaries.is_empty());

        let snap = profiler.snapshot();
        let summary = snap
            .iter()
            .find(|(k, _)| *k == ProfileKey::GetSurveySummary)
            .unwrap();
        assert_eq!(summary.1.count, 2);
    }
}
