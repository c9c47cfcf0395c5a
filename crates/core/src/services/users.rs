//! Per-user activity bookkeeping.
//!
//! A user document is `{ "_id": <userId>, "likes": [...], "surveys": [...] }`
//! holding the hospital ids the user liked or reviewed. Writes here follow a
//! like or a survey submission and are best effort: a failure is logged and
//! does not undo the primary write.

use crate::constants::USER_COLLECTION;
use crate::services::required;
use crate::CoreResult;
use moonlight_store::{DocumentStore, Mutation, Predicate, ID_FIELD};
use std::sync::Arc;

const LIKES_FIELD: &str = "likes";
const SURVEYS_FIELD: &str = "surveys";

#[derive(Clone)]
pub struct UserActivityService {
    store: Arc<dyn DocumentStore>,
}

impl UserActivityService {
    pub fn new(store: Arc<dyn DocumentStore>) -> Self {
        Self { store }
    }

    /// Adds or removes `hospital_id` from the user's likes. Returns whether the
    /// write went through.
    pub fn record_like(&self, user_id: &str, hospital_id: &str, liked: bool) -> bool {
        let (mutation, upsert) = if liked {
            (Mutation::add_to_set(LIKES_FIELD, hospital_id), true)
        } else {
            (Mutation::pull(LIKES_FIELD, hospital_id), false)
        };
        match self
            .store
            .update_one(USER_COLLECTION, &by_user(user_id), &mutation, upsert)
        {
            Ok(_) => true,
            Err(e) => {
                tracing::error!(
                    "failed to record like {liked} of {hospital_id} for user {user_id}: {e}"
                );
                false
            }
        }
    }

    pub fn record_survey(&self, user_id: &str, hospital_id: &str) -> bool {
        let mutation = Mutation::add_to_set(SURVEYS_FIELD, hospital_id);
        match self
            .store
            .update_one(USER_COLLECTION, &by_user(user_id), &mutation, true)
        {
            Ok(_) => true,
            Err(e) => {
                tracing::error!("failed to record survey of {hospital_id} for user {user_id}: {e}");
                false
            }
        }
    }

    /// Number of hospitals the user has reviewed. An unknown user has none.
    ///
    /// # Errors
    ///
    /// `InvalidInput` for a blank id.
    pub fn survey_count(&self, user_id: &str) -> CoreResult<u64> {
        let user_id = required("userId", user_id)?;
        let doc = self
            .store
            .find_one(USER_COLLECTION, &by_user(user_id.as_str()), None)?;
        Ok(doc
            .as_ref()
            .and_then(|d| d.get(SURVEYS_FIELD))
            .and_then(|v| v.as_array())
            .map_or(0, |items| items.len() as u64))
    }
}

fn by_user(user_id: &str) -> Predicate {
    Predicate::eq(ID_FIELD, user_id)
}

#[cfg(test)]
mod tests {
    use super::*;
    use moonlight_store::MemoryStore;

    fn service() -> (Arc<MemoryStore>, UserActivityService) {
        let store = Arc::new(MemoryStore::new());
        (store.clone(), UserActivityService::new(store))
    }

    #[test]
    fn surveys_are_counted_once_per_hospital() {
        let (_, users) = service();
        assert_eq!(users.survey_count("u1").unwrap(), 0);
        assert!(users.record_survey("u1", "h1"));
        assert!(users.record_survey("u1", "h1"));
        assert!(users.record_survey("u1", "h2"));
        assert_eq!(users.survey_count("u1").unwrap(), 2);
        assert_eq!(users.survey_count("u2").unwrap(), 0);
        assert!(users.survey_count("  ").unwrap_err().is_client_error());
    }

    #[test]
    fn likes_are_added_and_removed() {
        let (store, users) = service();
        assert!(users.record_like("u1", "h1", true));
        assert!(users.record_like("u1", "h2", true));
        assert!(users.record_like("u1", "h1", false));

        let doc = store
            .find_one(USER_COLLECTION, &by_user("u1"), None)
            .unwrap()
            .unwrap();
        assert_eq!(doc["likes"], serde_json::json!(["h2"]));
    }

    #[test]
    fn unlike_by_unknown_user_creates_nothing() {
        let (store, users) = service();
        assert!(users.record_like("ghost", "h1", false));
        assert_eq!(
            store.count(USER_COLLECTION, &Predicate::All).unwrap(),
            0
        );
    }
}
