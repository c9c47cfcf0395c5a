//! Constants used throughout the moonlight core crate.
//!
//! Collection names, search limits and the markers used to recognise
//! pediatric facilities live here so the query builder, the services and the
//! tests agree on them.

/// Collection of emergency-capable hospitals and clinics.
pub const HOSPITAL_COLLECTION: &str = "hospitals";

/// Collection of after-hours ("moonlight") clinics. Same record shape as hospitals.
pub const MOONLIGHT_COLLECTION: &str = "moonlights";

/// Collection holding the public-holiday calendar.
pub const HOLIDAY_COLLECTION: &str = "holidays";

/// Collection of survey answer documents, one per (hospital, user).
pub const SURVEY_COLLECTION: &str = "surveys";

/// Collection of like documents, one per hospital.
pub const LIKE_COLLECTION: &str = "likes";

/// Collection of per-user activity documents.
pub const USER_COLLECTION: &str = "users";

/// Default directory for collection files when no explicit directory is configured.
pub const DEFAULT_DATA_DIR: &str = "hospital_data";

/// The fixed operating timezone (Korea Standard Time, no daylight saving).
pub const DEFAULT_UTC_OFFSET: &str = "+09:00";

/// Records shown per hospital search page.
pub const HOSPITAL_PAGEABLE_COUNT: usize = 15;

/// Interval between profiling summaries.
pub const DEFAULT_PROFILE_INTERVAL_SECS: u64 = 60 * 60;

/// Facility-type codes a hospital search is restricted to: general hospital,
/// hospital, clinic, public-health centre, central emergency centre and
/// emergency support centre.
pub const HOSPITAL_CATEGORY_CODES: [&str; 6] = ["A", "B", "C", "R", "Y", "Z"];

/// Subject every hospital search result must offer (pediatrics).
pub const PEDIATRIC_SUBJECT: &str = "소아청소년과";

/// Name fragment marking a facility as pediatric-only.
pub const PEDIATRIC_NAME_MARKER: &str = "소아";

/// Date format of entries in the holiday calendar.
pub const HOLIDAY_DATE_FORMAT: &str = "%Y%m%d";

/// Timestamp format stamped on survey submissions.
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";
