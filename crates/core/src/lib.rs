//! # Moonlight Core
//!
//! Availability resolution and geo-filtering for hospitals and after-hours
//! ("moonlight") clinics, plus the community feedback around them.
//!
//! This crate contains the engine and the services built on it:
//! - day-key resolution with holiday override (`holiday`)
//! - operating-hours classification (`schedule`)
//! - bounding-box and openness filters for storage queries (`query`)
//! - sampled paging without exact counts (`pager`)
//! - the survey questionnaire and its aggregation pivot (`survey`)
//! - likes, user activity and request profiling
//!
//! **No API concerns**: HTTP routing and command-line parsing belong in `api-rest` and `cli`.
//! Storage is reached only through `moonlight_store::DocumentStore`.

pub mod clock;
pub mod config;
pub mod constants;
pub mod error;
pub mod holiday;
pub mod hospital;
pub mod pager;
pub mod profiler;
pub mod query;
pub mod schedule;
pub mod services;
pub mod survey;

pub use clock::{Clock, FixedClock, SystemClock};
pub use config::CoreConfig;
pub use error::{CoreError, CoreResult};
pub use holiday::{resolve_day_key, HolidayCalendar, ResolvedDay};
pub use hospital::HospitalRecord;
pub use pager::{page, SampledPage};
pub use profiler::{ProfileKey, Profiler};
pub use query::{build_filter, BoundingBox, GeoFilter, StatusToken};
pub use schedule::{AvailabilityStatus, TimeWindow, WeeklySchedule, WindowSlot};
pub use services::{
    HospitalSearch, HospitalService, LikeService, Services, SubmitOutcome, SurveyService,
    UserActivityService,
};
pub use survey::{build_summary_pipeline, reshape, SurveySchema};
