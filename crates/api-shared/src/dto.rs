//! Request and response bodies.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use utoipa::ToSchema;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct HealthRes {
    pub ok: bool,
    pub message: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct ErrorRes {
    pub error: String,
}

// ============================================================================
// HOSPITALS
// ============================================================================

/// One facility as shown in the app, with its status for the current instant.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct HospitalRes {
    pub hpid: String,
    pub name: String,
    pub address: String,
    pub phone: String,
    /// Category label, e.g. "의원" or "병원".
    #[serde(rename = "type")]
    pub category: String,
    pub subjects: Vec<String>,
    /// `[lng, lat]`, empty when the record has no usable location.
    pub coordinates: Vec<f64>,
    pub detail_info: Vec<String>,
    /// Day key (1 = Monday .. 7 = Sunday, 8 = holiday) to `HH:MM-HH:MM`.
    pub operating_hours_map: BTreeMap<u8, String>,
    /// One of `open`, `finished`, `notScheduledToday`, `unknown`.
    pub operating_status: String,
    pub survey_count: u64,
    pub like_count: u64,
}

/// A page of facilities.
///
/// For sampled searches `total_count` is the number of records sampled, which
/// exceeds `pageable_count` exactly when more matches exist.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct HospitalListRes {
    pub hospitals: Vec<HospitalRes>,
    pub total_count: u32,
    pub pageable_count: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct HolidayTodayRes {
    /// 1 when today is a public holiday, 0 otherwise.
    pub response: u8,
}

// ============================================================================
// SURVEYS
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct SurveyQuestionRes {
    /// `selection` or `text`.
    #[serde(rename = "type")]
    pub kind: String,
    pub options: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_text_length: Option<u32>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct SurveyQuestionsRes {
    pub questions: BTreeMap<String, SurveyQuestionRes>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct SurveyAnswer {
    #[serde(rename = "type", default)]
    pub kind: String,
    #[serde(default)]
    pub option: String,
    #[serde(default)]
    pub text: String,
}

/// A user's answers for one hospital. Used both as the submission body and as
/// the stored document shape.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct SurveyAnswerDocument {
    #[serde(default)]
    pub hospital_id: String,
    #[serde(default)]
    pub user_id: String,
    #[serde(default)]
    pub timestamp: String,
    #[serde(default)]
    pub answers: BTreeMap<String, SurveyAnswer>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct SurveySummaryEntry {
    #[serde(rename = "type")]
    pub kind: String,
    pub options: Vec<String>,
    /// Same length and order as `options`.
    pub option_counts: Vec<u64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct SurveySummaryRes {
    pub hospital_id: String,
    pub total_count: u64,
    pub summaries: BTreeMap<String, SurveySummaryEntry>,
}

// ============================================================================
// LIKES & USERS
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct LikeReq {
    pub hospital_id: String,
    pub user_id: String,
    /// Non-zero to like, zero to unlike.
    pub like: i32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct CountRes {
    pub count: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct FoundRes {
    /// 1 when the user has liked the hospital, 0 otherwise.
    pub found: u8,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hospital_res_uses_client_field_names() {
        let res = HospitalRes {
            hpid: "A1".into(),
            name: "n".into(),
            address: "a".into(),
            phone: "p".into(),
            category: "의원".into(),
            subjects: vec![],
            coordinates: vec![127.0, 37.5],
            detail_info: vec![],
            operating_hours_map: BTreeMap::from([(3, "09:00-18:00".to_string())]),
            operating_status: "open".into(),
            survey_count: 0,
            like_count: 2,
        };
        let json = serde_json::to_value(&res).unwrap();
        assert_eq!(json["type"], "의원");
        assert_eq!(json["operatingHoursMap"]["3"], "09:00-18:00");
        assert_eq!(json["operatingStatus"], "open");
        assert_eq!(json["likeCount"], 2);
        assert!(json.get("detailInfo").is_some());
    }

    #[test]
    fn survey_answer_document_tolerates_missing_fields() {
        let doc: SurveyAnswerDocument =
            serde_json::from_str(r#"{"hospitalId": "h1", "answers": {"cleanliness": {"type": "selection", "option": "clean"}}}"#)
                .unwrap();
        assert_eq!(doc.user_id, "");
        assert_eq!(doc.answers["cleanliness"].option, "clean");
        assert_eq!(doc.answers["cleanliness"].text, "");
    }
}
