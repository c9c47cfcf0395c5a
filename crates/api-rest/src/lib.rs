//! # API REST
//!
//! REST API for the moonlight service.
//!
//! Handles:
//! - HTTP endpoints with axum
//! - OpenAPI/Swagger documentation
//! - mapping core errors onto status codes with a JSON `{ "error": ... }` body
//! - the periodic profiling flush (`profiling` module)
//!
//! Uses `api-shared` for wire types and `moonlight-core` for everything else.

#![warn(rust_2018_idioms)]

pub mod profiling;

use axum::{
    extract::{rejection::JsonRejection, Query, State},
    http::StatusCode,
    response::Json,
    routing::{get, post},
    Router,
};
use serde::Deserialize;
use tower_http::cors::CorsLayer;
use utoipa::{IntoParams, OpenApi};
use utoipa_swagger_ui::SwaggerUi;

use api_shared::{
    CountRes, ErrorRes, FoundRes, HealthRes, HealthService, HolidayTodayRes, HospitalListRes,
    HospitalRes, LikeReq, SurveyAnswer, SurveyAnswerDocument, SurveyQuestionRes,
    SurveyQuestionsRes, SurveySummaryEntry, SurveySummaryRes,
};
use moonlight_core::{
    BoundingBox, CoreError, HospitalSearch, Services, StatusToken, SubmitOutcome,
};

pub use profiling::ProfilerTask;

/// Application state shared by every handler.
#[derive(Clone)]
pub struct AppState {
    pub services: Services,
}

type ApiError = (StatusCode, Json<ErrorRes>);
type ApiResult<T> = Result<T, ApiError>;

#[derive(OpenApi)]
#[openapi(
    paths(
        health,
        get_hospital,
        search_hospitals,
        list_moonlights,
        holiday_today,
        survey_questions,
        survey_summary,
        survey_answer,
        submit_survey,
        post_like,
        like_count,
        like_found,
        user_survey_count,
    ),
    components(schemas(
        HealthRes,
        ErrorRes,
        HospitalRes,
        HospitalListRes,
        HolidayTodayRes,
        SurveyQuestionRes,
        SurveyQuestionsRes,
        SurveyAnswer,
        SurveyAnswerDocument,
        SurveySummaryEntry,
        SurveySummaryRes,
        LikeReq,
        CountRes,
        FoundRes,
    ))
)]
pub struct ApiDoc;

/// Builds the full router, Swagger UI included.
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/hospital", get(get_hospital))
        .route("/hospitals", get(search_hospitals))
        .route("/moonlights", get(list_moonlights))
        .route("/holiday/today", get(holiday_today))
        .route("/survey/questions", get(survey_questions))
        .route("/survey/summary", get(survey_summary))
        .route("/survey/answer", get(survey_answer))
        .route("/survey/submit", post(submit_survey))
        .route("/like", post(post_like))
        .route("/like/count", get(like_count))
        .route("/like/found", get(like_found))
        .route("/user/survey/count", get(user_survey_count))
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()))
        .layer(CorsLayer::permissive())
        .with_state(state)
}

/// Maps a core error onto a status code and logs it.
///
/// Caller mistakes become 400, a missing record 404, anything else 500.
fn error_response(context: &str, e: CoreError) -> ApiError {
    let status = match &e {
        CoreError::NotFound(_) => StatusCode::NOT_FOUND,
        e if e.is_client_error() => StatusCode::BAD_REQUEST,
        _ => StatusCode::INTERNAL_SERVER_ERROR,
    };
    if status.is_server_error() {
        tracing::error!("{context} error: {e}");
    } else {
        tracing::warn!("{context} rejected: {e}");
    }
    (status, Json(ErrorRes { error: e.to_string() }))
}

/// Unwraps a JSON body, turning every extractor rejection (bad syntax,
/// missing or mistyped fields, wrong content type) into a 400.
fn json_body<T>(context: &str, payload: Result<Json<T>, JsonRejection>) -> ApiResult<T> {
    payload.map(|Json(value)| value).map_err(|rejection| {
        error_response(context, CoreError::InvalidInput(rejection.body_text()))
    })
}

// ============================================================================
// QUERY PARAMETERS
// ============================================================================

#[derive(Debug, Default, Deserialize, IntoParams)]
#[serde(rename_all = "camelCase")]
#[into_params(parameter_in = Query)]
pub struct HospitalIdQuery {
    pub hospital_id: Option<String>,
}

#[derive(Debug, Default, Deserialize, IntoParams)]
#[serde(rename_all = "camelCase")]
#[into_params(parameter_in = Query)]
pub struct UserIdQuery {
    pub user_id: Option<String>,
}

#[derive(Debug, Default, Deserialize, IntoParams)]
#[serde(rename_all = "camelCase")]
#[into_params(parameter_in = Query)]
pub struct HospitalUserQuery {
    pub hospital_id: Option<String>,
    pub user_id: Option<String>,
}

/// Bounding box and filters of a list request.
#[derive(Debug, Default, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct BoxQuery {
    pub swlng: Option<String>,
    pub swlat: Option<String>,
    pub nelng: Option<String>,
    pub nelat: Option<String>,
    /// `openToday`, `openNow` or `openSunday`.
    pub status: Option<String>,
    /// Presence flag: restrict to pediatric-only facilities.
    pub pedonly: Option<String>,
}

impl BoxQuery {
    fn bbox(&self) -> Result<BoundingBox, CoreError> {
        BoundingBox::from_params(
            self.swlng.as_deref(),
            self.swlat.as_deref(),
            self.nelng.as_deref(),
            self.nelat.as_deref(),
        )
    }

    fn status(&self) -> Option<StatusToken> {
        StatusToken::parse(self.status.as_deref())
    }
}

fn param(value: &Option<String>) -> &str {
    value.as_deref().unwrap_or_default()
}

// ============================================================================
// HANDLERS
// ============================================================================

#[utoipa::path(
    get,
    path = "/health",
    responses(
        (status = 200, description = "Health check response", body = HealthRes)
    )
)]
/// Health check endpoint for load balancers and monitoring.
async fn health() -> Json<HealthRes> {
    Json(HealthService::check_health())
}

#[utoipa::path(
    get,
    path = "/hospital",
    params(HospitalIdQuery),
    responses(
        (status = 200, description = "The hospital as a one-element list", body = HospitalListRes),
        (status = 400, description = "hospitalId missing", body = ErrorRes),
        (status = 404, description = "No hospital with that id", body = ErrorRes),
        (status = 500, description = "Storage failure", body = ErrorRes)
    )
)]
/// Look up one hospital by id, with its current operating status.
async fn get_hospital(
    State(state): State<AppState>,
    Query(q): Query<HospitalIdQuery>,
) -> ApiResult<Json<HospitalListRes>> {
    state
        .services
        .hospitals
        .get_hospital(param(&q.hospital_id))
        .map(Json)
        .map_err(|e| error_response("Get hospital", e))
}

#[utoipa::path(
    get,
    path = "/hospitals",
    params(BoxQuery),
    responses(
        (status = 200, description = "A sampled page of hospitals", body = HospitalListRes),
        (status = 400, description = "Missing or malformed box parameters", body = ErrorRes),
        (status = 500, description = "Storage failure", body = ErrorRes)
    )
)]
/// Search pediatric-capable hospitals inside a bounding box.
///
/// Results are a random sample. `totalCount` greater than `pageableCount`
/// means more hospitals match than were returned.
async fn search_hospitals(
    State(state): State<AppState>,
    Query(q): Query<BoxQuery>,
) -> ApiResult<Json<HospitalListRes>> {
    let bbox = q.bbox().map_err(|e| error_response("Filtered hospitals", e))?;
    let search = HospitalSearch {
        bbox,
        status: q.status(),
        pediatric_only: q.pedonly.is_some(),
    };
    state
        .services
        .hospitals
        .search_hospitals(search)
        .map(Json)
        .map_err(|e| error_response("Filtered hospitals", e))
}

#[utoipa::path(
    get,
    path = "/moonlights",
    params(BoxQuery),
    responses(
        (status = 200, description = "Every moonlight clinic in the box", body = HospitalListRes),
        (status = 400, description = "Missing or malformed box parameters", body = ErrorRes),
        (status = 500, description = "Storage failure", body = ErrorRes)
    )
)]
/// List after-hours clinics inside a bounding box.
async fn list_moonlights(
    State(state): State<AppState>,
    Query(q): Query<BoxQuery>,
) -> ApiResult<Json<HospitalListRes>> {
    let bbox = q.bbox().map_err(|e| error_response("Moonlights", e))?;
    state
        .services
        .hospitals
        .list_moonlights(bbox, q.status())
        .map(Json)
        .map_err(|e| error_response("Moonlights", e))
}

#[utoipa::path(
    get,
    path = "/holiday/today",
    responses(
        (status = 200, description = "1 when today is a public holiday", body = HolidayTodayRes)
    )
)]
async fn holiday_today(State(state): State<AppState>) -> Json<HolidayTodayRes> {
    let holiday = state.services.hospitals.is_holiday_today();
    Json(HolidayTodayRes {
        response: u8::from(holiday),
    })
}

#[utoipa::path(
    get,
    path = "/survey/questions",
    responses(
        (status = 200, description = "The survey questionnaire", body = SurveyQuestionsRes)
    )
)]
async fn survey_questions(State(state): State<AppState>) -> Json<SurveyQuestionsRes> {
    Json(state.services.surveys.questions())
}

#[utoipa::path(
    get,
    path = "/survey/summary",
    params(HospitalIdQuery),
    responses(
        (status = 200, description = "Option counts per question", body = SurveySummaryRes),
        (status = 400, description = "hospitalId missing", body = ErrorRes),
        (status = 500, description = "Storage failure", body = ErrorRes)
    )
)]
/// Aggregate every survey submitted for a hospital.
async fn survey_summary(
    State(state): State<AppState>,
    Query(q): Query<HospitalIdQuery>,
) -> ApiResult<Json<SurveySummaryRes>> {
    state
        .services
        .surveys
        .summary(param(&q.hospital_id))
        .map(Json)
        .map_err(|e| error_response("Survey summary", e))
}

#[utoipa::path(
    get,
    path = "/survey/answer",
    params(HospitalUserQuery),
    responses(
        (status = 200, description = "The user's answers, empty when none", body = SurveyAnswerDocument),
        (status = 400, description = "hospitalId or userId missing", body = ErrorRes),
        (status = 500, description = "Storage failure", body = ErrorRes)
    )
)]
async fn survey_answer(
    State(state): State<AppState>,
    Query(q): Query<HospitalUserQuery>,
) -> ApiResult<Json<SurveyAnswerDocument>> {
    state
        .services
        .surveys
        .answer(param(&q.hospital_id), param(&q.user_id))
        .map(Json)
        .map_err(|e| error_response("Survey answer", e))
}

#[utoipa::path(
    post,
    path = "/survey/submit",
    request_body = SurveyAnswerDocument,
    responses(
        (status = 201, description = "Answers stored for the first time"),
        (status = 200, description = "Earlier answers replaced"),
        (status = 400, description = "Malformed body or answers that do not fit the questionnaire", body = ErrorRes),
        (status = 500, description = "Storage failure", body = ErrorRes)
    )
)]
/// Store a user's answers for a hospital.
async fn submit_survey(
    State(state): State<AppState>,
    payload: Result<Json<SurveyAnswerDocument>, JsonRejection>,
) -> ApiResult<(StatusCode, &'static str)> {
    let req = json_body("Submit survey", payload)?;
    match state.services.surveys.submit(req) {
        Ok(SubmitOutcome::Created) => Ok((StatusCode::CREATED, "Survey submitted")),
        Ok(SubmitOutcome::Updated) => Ok((StatusCode::OK, "Survey submitted")),
        Err(e) => Err(error_response("Submit survey", e)),
    }
}

#[utoipa::path(
    post,
    path = "/like",
    request_body = LikeReq,
    responses(
        (status = 200, description = "Like recorded"),
        (status = 400, description = "Malformed body or hospitalId/userId missing", body = ErrorRes),
        (status = 500, description = "Storage failure", body = ErrorRes)
    )
)]
/// Like (`like` non-zero) or unlike a hospital.
async fn post_like(
    State(state): State<AppState>,
    payload: Result<Json<LikeReq>, JsonRejection>,
) -> ApiResult<(StatusCode, &'static str)> {
    let req = json_body("Post like", payload)?;
    state
        .services
        .likes
        .set_like(&req.hospital_id, &req.user_id, req.like)
        .map(|()| (StatusCode::OK, "Like submitted"))
        .map_err(|e| error_response("Post like", e))
}

#[utoipa::path(
    get,
    path = "/like/count",
    params(HospitalIdQuery),
    responses(
        (status = 200, description = "Number of users who liked the hospital", body = CountRes),
        (status = 400, description = "hospitalId missing", body = ErrorRes),
        (status = 500, description = "Storage failure", body = ErrorRes)
    )
)]
async fn like_count(
    State(state): State<AppState>,
    Query(q): Query<HospitalIdQuery>,
) -> ApiResult<Json<CountRes>> {
    state
        .services
        .likes
        .count(param(&q.hospital_id))
        .map(|count| Json(CountRes { count }))
        .map_err(|e| error_response("Like count", e))
}

#[utoipa::path(
    get,
    path = "/like/found",
    params(HospitalUserQuery),
    responses(
        (status = 200, description = "1 when the user liked the hospital", body = FoundRes),
        (status = 400, description = "hospitalId or userId missing", body = ErrorRes),
        (status = 500, description = "Storage failure", body = ErrorRes)
    )
)]
async fn like_found(
    State(state): State<AppState>,
    Query(q): Query<HospitalUserQuery>,
) -> ApiResult<Json<FoundRes>> {
    state
        .services
        .likes
        .found(param(&q.hospital_id), param(&q.user_id))
        .map(|found| {
            Json(FoundRes {
                found: u8::from(found),
            })
        })
        .map_err(|e| error_response("Like found", e))
}

#[utoipa::path(
    get,
    path = "/user/survey/count",
    params(UserIdQuery),
    responses(
        (status = 200, description = "Number of hospitals the user reviewed", body = CountRes),
        (status = 400, description = "userId missing", body = ErrorRes),
        (status = 500, description = "Storage failure", body = ErrorRes)
    )
)]
async fn user_survey_count(
    State(state): State<AppState>,
    Query(q): Query<UserIdQuery>,
) -> ApiResult<Json<CountRes>> {
    state
        .services
        .users
        .survey_count(param(&q.user_id))
        .map(|count| Json(CountRes { count }))
        .map_err(|e| error_response("User survey count", e))
}
