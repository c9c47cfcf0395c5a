//! Request-level services.
//!
//! Each service owns handles to the shared store, clock and profiler; cloning a
//! service clones those handles only.

pub mod hospitals;
pub mod likes;
pub mod surveys;
pub mod users;

use crate::clock::{Clock, SystemClock};
use crate::config::CoreConfig;
use crate::profiler::Profiler;
use crate::{CoreError, CoreResult};
use moonlight_store::{DocumentStore, MemoryStore};
use moonlight_types::NonEmptyText;
use std::sync::Arc;

pub use hospitals::{HospitalSearch, HospitalService};
pub use likes::LikeService;
pub use surveys::{SubmitOutcome, SurveyService};
pub use users::UserActivityService;

/// Every service wired to the same collaborators.
#[derive(Clone)]
pub struct Services {
    pub hospitals: HospitalService,
    pub surveys: SurveyService,
    pub likes: LikeService,
    pub users: UserActivityService,
}

impl Services {
    /// Opens the collection files under `cfg.data_dir()` and reads the clock in
    /// `cfg.utc_offset()`.
    ///
    /// # Errors
    ///
    /// Returns `CoreError::Store` if the data directory is missing or a
    /// collection file cannot be loaded.
    pub fn open(cfg: Arc<CoreConfig>, profiler: Arc<Profiler>) -> CoreResult<Self> {
        tracing::info!("++ Loading collections from {}", cfg.data_dir().display());
        let store = Arc::new(MemoryStore::open(cfg.data_dir())?);
        let clock = Arc::new(SystemClock::new(cfg.utc_offset()));
        Ok(Self::new(cfg, store, clock, profiler))
    }

    pub fn new(
        cfg: Arc<CoreConfig>,
        store: Arc<dyn DocumentStore>,
        clock: Arc<dyn Clock>,
        profiler: Arc<Profiler>,
    ) -> Self {
        Self {
            hospitals: HospitalService::new(cfg, store.clone(), clock.clone(), profiler.clone()),
            surveys: SurveyService::new(store.clone(), clock, profiler),
            likes: LikeService::new(store.clone()),
            users: UserActivityService::new(store),
        }
    }
}

/// Rejects blank identifiers with `"<name> is empty"`.
pub(crate) fn required(name: &str, value: &str) -> CoreResult<NonEmptyText> {
    NonEmptyText::new(value).map_err(|_| CoreError::InvalidInput(format!("{name} is empty")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::kst;
    use std::fs;

    #[test]
    fn open_reads_collections_from_configured_dir() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(
            dir.path().join("hospitals.json"),
            r#"[{"_id": "h1", "dutyName": "한빛의원", "dutyTime1s": "0900", "dutyTime1c": "1800"}]"#,
        )
        .unwrap();
        let cfg = Arc::new(CoreConfig::new(dir.path().to_path_buf(), kst(), 15).unwrap());

        let services = Services::open(cfg, Arc::new(Profiler::new())).unwrap();
        let res = services.hospitals.get_hospital("h1").unwrap();
        assert_eq!(res.hospitals[0].name, "한빛의원");
    }

    #[test]
    fn open_fails_for_missing_dir() {
        let dir = tempfile::tempdir().unwrap();
        let cfg = Arc::new(CoreConfig::new(dir.path().join("gone"), kst(), 15).unwrap());
        let err = Services::open(cfg, Arc::new(Profiler::new())).err().unwrap();
        assert!(matches!(err, CoreError::Store(_)));
    }

    #[test]
    fn required_rejects_blank_values() {
        assert_eq!(required("userId", " u1 ").unwrap().as_str(), "u1");
        let err = required("userId", "   ").unwrap_err();
        assert!(err.to_string().contains("userId is empty"));
        assert!(err.is_client_error());
    }
}
