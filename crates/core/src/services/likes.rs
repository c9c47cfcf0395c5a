//! Hospital likes.
//!
//! One document per hospital, `{ "hospitalId": ..., "userIds": [...] }`,
//! created by the first like and never deleted.

use crate::constants::LIKE_COLLECTION;
use crate::services::required;
use crate::services::users::UserActivityService;
use crate::CoreResult;
use moonlight_store::{Document, DocumentStore, Mutation, Predicate};
use std::sync::Arc;

const HOSPITAL_ID_FIELD: &str = "hospitalId";
const USER_IDS_FIELD: &str = "userIds";

#[derive(Clone)]
pub struct LikeService {
    store: Arc<dyn DocumentStore>,
    users: UserActivityService,
}

impl LikeService {
    pub fn new(store: Arc<dyn DocumentStore>) -> Self {
        Self {
            users: UserActivityService::new(store.clone()),
            store,
        }
    }

    /// Likes (`like != 0`) or unlikes a hospital on behalf of a user, then
    /// mirrors the change on the user's activity record.
    pub fn set_like(&self, hospital_id: &str, user_id: &str, like: i32) -> CoreResult<()> {
        let hospital_id = required("hospitalId", hospital_id)?;
        let user_id = required("userId", user_id)?;
        let liked = like != 0;

        let mutation = if liked {
            Mutation::add_to_set(USER_IDS_FIELD, user_id.as_str())
        } else {
            Mutation::pull(USER_IDS_FIELD, user_id.as_str())
        };
        self.store.update_one(
            LIKE_COLLECTION,
            &by_hospital(hospital_id.as_str()),
            &mutation,
            liked,
        )?;

        self.users
            .record_like(user_id.as_str(), hospital_id.as_str(), liked);
        Ok(())
    }

    pub fn count(&self, hospital_id: &str) -> CoreResult<u64> {
        let hospital_id = required("hospitalId", hospital_id)?;
        Ok(self
            .liked_by(hospital_id.as_str())?
            .map_or(0, |ids| ids.len() as u64))
    }

    /// Like count for decorating a search result. Failures read as zero.
    pub fn count_or_zero(&self, hospital_id: &str) -> u64 {
        self.count(hospital_id).unwrap_or_else(|e| {
            tracing::warn!("like count for {hospital_id} unavailable: {e}");
            0
        })
    }

    pub fn found(&self, hospital_id: &str, user_id: &str) -> CoreResult<bool> {
        let hospital_id = required("hospitalId", hospital_id)?;
        let user_id = required("userId", user_id)?;
        Ok(self
            .liked_by(hospital_id.as_str())?
            .is_some_and(|ids| ids.iter().any(|id| id.as_str() == Some(user_id.as_str()))))
    }

    fn liked_by(&self, hospital_id: &str) -> CoreResult<Option<Vec<serde_json::Value>>> {
        let doc: Option<Document> =
            self.store
                .find_one(LIKE_COLLECTION, &by_hospital(hospital_id), None)?;
        Ok(doc.and_then(|mut d| match d.remove(USER_IDS_FIELD) {
            Some(serde_json::Value::Array(ids)) => Some(ids),
            _ => None,
        }))
    }
}

fn by_hospital(hospital_id: &str) -> Predicate {
    Predicate::eq(HOSPITAL_ID_FIELD, hospital_id)
}
